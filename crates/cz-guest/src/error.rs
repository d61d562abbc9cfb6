//! ---
//! cz_section: "04-guest-runtime"
//! cz_subsection: "module"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "Guest service error type."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
use cz_common::OperationKind;
use thiserror::Error;

use crate::fault::GuestFault;
use crate::token::TokenError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GuestError {
    #[error("operation {0} is already selected")]
    OperationAlreadySelected(OperationKind),
    #[error("guest interpreter is not initialized")]
    NotInitialized,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("guest script failed: {0}")]
    Script(#[from] GuestFault),
    #[error("guest initialization failed: {0}")]
    Initialization(String),
}
