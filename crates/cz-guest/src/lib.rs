//! ---
//! cz_section: "04-guest-runtime"
//! cz_subsection: "module"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "Guest scripting runtime hosted as a service."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
//! The guest service embeds a Rhai interpreter. Every native entry into guest
//! code goes through the [`ExecutionToken`], which owns the interpreter and
//! lets exactly one thread run it at a time.

mod error;
mod fault;
mod interpreter;
mod monitor;
pub mod operation;
mod output;
mod service;
mod token;

pub use error::GuestError;
pub use fault::GuestFault;
pub use interpreter::{GuestInterpreter, ARGS_VAR, ENGINE_VERSION, OP_VAR};
pub use monitor::{Monitor, MonitorRegistry};
pub use output::{LineBuffer, OutputSink};
pub use service::{GuestFn, GuestService, SERVICE_DESCRIPTION, SERVICE_NAME};
pub use token::{ExecutionToken, TokenError, TokenGuard};
