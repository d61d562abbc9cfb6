//! ---
//! cz_section: "05-console"
//! cz_subsection: "module"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "Interactive console service."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
//! A worker thread reads completed lines from a [`LineSource`] and turns them
//! into host commands. The host observes the console only through the
//! service's procedures.

mod error;
mod line_source;
mod service;
mod worker;

pub use error::ConsoleError;
pub use line_source::{ChannelLineSource, LineEvent, LineSource, TerminalLineSource};
pub use service::{ConsoleFn, ConsoleService, SERVICE_DESCRIPTION, SERVICE_NAME};
