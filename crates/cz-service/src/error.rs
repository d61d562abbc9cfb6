//! ---
//! cz_section: "02-service-lifecycle"
//! cz_subsection: "module"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "Lifecycle guard violations."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
use thiserror::Error;

use crate::interface::Ordinal;

/// A lifecycle operation was attempted from the wrong phase, or a call named an
/// ordinal the service does not implement. State is never mutated when one of
/// these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("service {0} is already loaded")]
    AlreadyLoaded(String),
    #[error("service {0} is not loaded")]
    NotLoaded(String),
    #[error("service {0} is already started")]
    AlreadyStarted(String),
    #[error("service {0} is not started")]
    NotStarted(String),
    #[error("service {service} has no procedure for ordinal {ordinal}")]
    UnknownOrdinal { service: String, ordinal: Ordinal },
}
