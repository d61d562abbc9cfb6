//! ---
//! cz_section: "02-service-lifecycle"
//! cz_subsection: "module"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "Service lifecycle framework."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
//! Pluggable services, their lifecycle, and ordinal-indexed procedure dispatch.
//!
//! A [`ServiceDescriptor`] names a service and optionally carries a
//! [`ServiceInterface`]. The [`ServiceManager`] owns the mutable per-service
//! state and drives descriptors through
//! `Unloaded -> Loaded -> Started -> Loaded -> Unloaded`.

mod descriptor;
mod error;
mod interface;
mod lifecycle;
mod status;

pub use descriptor::ServiceDescriptor;
pub use error::LifecycleError;
pub use interface::{Ordinal, Procedure, ServiceInterface};
pub use lifecycle::{ServiceManager, ServicePhase};
pub use status::Status;
