//! ---
//! cz_section: "01-core-functionality"
//! cz_subsection: "module"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "Shared primitives and utilities for the service host."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
//! Core shared primitives for the Cozmonaut host workspace.
//! This crate exposes configuration loading, logging bootstrap, and
//! version metadata consumed across the workspace.

pub mod config;
pub mod logging;
pub mod version;

pub use config::{
    AppConfig, ConsoleConfig, GuestAction, GuestConfig, HostConfig, LoggingConfig, OperationKind,
    PollingConfig,
};
pub use logging::{init_tracing, LogFormat};
pub use version::VersionInfo;
