//! ---
//! cz_section: "05-console"
//! cz_subsection: "module"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "Console error type."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("standard input is not a terminal")]
    NoTerminal,
    #[error("console is not running")]
    NotRunning,
    #[error("console stopped before a line was entered")]
    Stopped,
    #[error("another prompt is already waiting for input")]
    SolicitationPending,
    #[error("console I/O failed: {0}")]
    Io(#[from] io::Error),
}
