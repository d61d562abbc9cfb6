//! ---
//! cz_section: "03-logging"
//! cz_subsection: "module"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "Tagged logging context and macros."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Every record the host emits carries a short `tag` naming the subsystem
//! (`service`, `guest`, `console`, `stdout`, ...) and, where one applies, the
//! name of the service it concerns. Rendering is left to whichever subscriber
//! the process installs.

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod capture;
pub mod macros;

pub use capture::{capture, CaptureLayer, CapturedEvent};

/// Initialize a baseline tracing subscriber suitable for development and tests.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer().with_test_writer())
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogContext<'a> {
    /// Subsystem tag attached to the record.
    pub tag: Option<&'a str>,
    /// Service the record concerns.
    pub service: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context carrying only a subsystem tag.
    pub fn tagged(tag: &'a str) -> Self {
        Self::new().with_tag(tag)
    }

    /// Attach a subsystem tag.
    pub fn with_tag(mut self, tag: &'a str) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Attach a service name.
    pub fn with_service(mut self, service: &'a str) -> Self {
        self.service = Some(service);
        self
    }
}
