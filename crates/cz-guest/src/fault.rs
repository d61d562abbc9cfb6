//! ---
//! cz_section: "04-guest-runtime"
//! cz_subsection: "module"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "Rendering of guest script errors for the host log."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
use rhai::EvalAltResult;
use thiserror::Error;

/// A guest error rendered to plain strings.
///
/// `kind` names the error variant, `value` is the innermost message, and
/// `traceback` lists the call frames from outermost to the failing position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {value}")]
pub struct GuestFault {
    pub kind: String,
    pub value: String,
    pub traceback: Vec<String>,
}

impl GuestFault {
    pub fn from_eval(err: &EvalAltResult) -> Self {
        let mut traceback = Vec::new();
        let mut current = err;
        loop {
            match current {
                EvalAltResult::ErrorInFunctionCall(name, source, inner, pos) => {
                    traceback.push(if source.is_empty() {
                        format!("{pos}: in function {name}")
                    } else {
                        format!("{pos}: in function {name} ({source})")
                    });
                    current = inner.as_ref();
                }
                EvalAltResult::ErrorInModule(path, inner, pos) => {
                    traceback.push(format!("{pos}: in module {path}"));
                    current = inner.as_ref();
                }
                _ => break,
            }
        }

        let kind = variant_name(current);
        traceback.push(format!("{}: {kind}", current.position()));

        let value = match current {
            EvalAltResult::ErrorRuntime(thrown, _) => thrown.to_string(),
            other => other.to_string(),
        };

        Self {
            kind,
            value,
            traceback,
        }
    }

    /// Emit one error record carrying all three fields.
    pub fn report(&self) {
        tracing::error!(
            tag = "guest",
            service = "guest",
            kind = %self.kind,
            value = %self.value,
            traceback = %self.traceback.join(" <- "),
            "guest raised {}: {}",
            self.kind,
            self.value
        );
    }
}

impl From<Box<EvalAltResult>> for GuestFault {
    fn from(err: Box<EvalAltResult>) -> Self {
        Self::from_eval(&err)
    }
}

fn variant_name(err: &EvalAltResult) -> String {
    let debug = format!("{err:?}");
    debug
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}
