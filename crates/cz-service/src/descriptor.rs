//! ---
//! cz_section: "02-service-lifecycle"
//! cz_subsection: "module"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "Immutable service identity."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
use std::fmt;
use std::sync::Arc;

use crate::interface::ServiceInterface;

/// Immutable identity and capability set of one service.
///
/// Descriptors are created once at process start. The name doubles as the key
/// under which the [`ServiceManager`](crate::ServiceManager) tracks state, so it
/// must be unique per process.
#[derive(Clone)]
pub struct ServiceDescriptor {
    name: String,
    description: String,
    interface: Option<Arc<dyn ServiceInterface>>,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            interface: None,
        }
    }

    pub fn with_interface(mut self, interface: Arc<dyn ServiceInterface>) -> Self {
        self.interface = Some(interface);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn interface(&self) -> Option<&dyn ServiceInterface> {
        self.interface.as_deref()
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("has_interface", &self.interface.is_some())
            .finish()
    }
}
