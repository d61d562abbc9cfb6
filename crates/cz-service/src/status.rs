//! ---
//! cz_section: "02-service-lifecycle"
//! cz_subsection: "module"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "Warn-only status codes returned by callbacks and procedures."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
use std::fmt;

/// Integer status returned by service callbacks and procedures.
///
/// Zero is success. Any other code is reported by the lifecycle manager as a
/// warning and otherwise does not change the outcome of the transition or call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Status(i32);

impl Status {
    pub const OK: Status = Status(0);
    pub const FAILURE: Status = Status(1);

    pub const fn from_code(code: i32) -> Self {
        Self(code)
    }

    pub const fn code(self) -> i32 {
        self.0
    }

    pub const fn is_ok(self) -> bool {
        self.0 == 0
    }
}

impl<E> From<Result<(), E>> for Status {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Status::OK,
            Err(_) => Status::FAILURE,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
