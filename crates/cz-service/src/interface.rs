//! ---
//! cz_section: "02-service-lifecycle"
//! cz_subsection: "module"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "Service interface trait and procedure dispatch types."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
use std::any::Any;

use crate::status::Status;

/// Small dense integer selecting one procedure of a service.
///
/// Ordinals are private to each service.
pub type Ordinal = u32;

/// A resolved service procedure.
///
/// The first argument is immutable input, the second is mutable output. Both
/// are type-erased; a procedure that receives an argument of the wrong type
/// reports a nonzero [`Status`].
pub type Procedure<'a> = Box<dyn Fn(&dyn Any, &mut dyn Any) -> Status + 'a>;

/// Callbacks and procedure table of a pluggable service.
///
/// The lifecycle callbacks are invoked by the
/// [`ServiceManager`](crate::ServiceManager) only, one transition at a time.
pub trait ServiceInterface: Send + Sync {
    /// Called when the service first loads.
    fn on_load(&self) -> Status;

    /// Called when the service finally unloads.
    fn on_unload(&self) -> Status;

    /// Called when the service starts up.
    fn on_start(&self) -> Status;

    /// Called when the service shuts down.
    fn on_stop(&self) -> Status;

    /// Resolve an ordinal to a procedure. Must be pure: the same ordinal always
    /// resolves the same way for the life of the service.
    fn procedure(&self, ordinal: Ordinal) -> Option<Procedure<'_>>;
}
