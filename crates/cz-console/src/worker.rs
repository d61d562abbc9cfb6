//! ---
//! cz_section: "05-console"
//! cz_subsection: "module"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "Console worker loop and the state it shares with the service."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::time::Duration;

use cz_logging::{cz_debug, cz_error, cz_info, cz_warn, LogContext};
use parking_lot::Mutex;

use crate::line_source::{LineEvent, LineSource};

const STOP_COMMAND: &str = "stop";

fn ctx() -> LogContext<'static> {
    LogContext::tagged("console").with_service("console")
}

/// A caller waiting for the next completed line.
pub(crate) struct Solicitation {
    pub(crate) prompt: String,
    pub(crate) reply: Sender<String>,
}

/// Flags shared between the worker thread and service procedures.
#[derive(Default)]
pub(crate) struct ConsoleShared {
    pub(crate) interrupted: AtomicBool,
    pub(crate) stop: AtomicBool,
    pub(crate) running: AtomicBool,
    pub(crate) solicitation: Mutex<Option<Solicitation>>,
}

impl ConsoleShared {
    pub(crate) fn raise_interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    pub(crate) fn take_interrupt(&self) -> bool {
        self.interrupted.swap(false, Ordering::SeqCst)
    }

    fn prompt(&self, default: &str) -> String {
        match self.solicitation.lock().as_ref() {
            Some(pending) => pending.prompt.clone(),
            None => default.to_owned(),
        }
    }

    fn handle_line(&self, line: String) {
        if let Some(pending) = self.solicitation.lock().take() {
            if pending.reply.send(line).is_err() {
                cz_debug!(context = ctx(), "solicited line dropped, caller gave up");
            }
            return;
        }

        if line.is_empty() {
            return;
        }
        if line == STOP_COMMAND {
            cz_info!(context = ctx(), "stop requested from console");
            self.raise_interrupt();
        } else {
            cz_warn!(context = ctx(), "unhandled command: {:?}", line);
        }
    }
}

/// Worker body. Returns the source so a later start can reuse it.
pub(crate) fn run(
    shared: &ConsoleShared,
    mut source: Box<dyn LineSource>,
    default_prompt: &str,
    poll_interval: Duration,
) -> Box<dyn LineSource> {
    cz_debug!(context = ctx(), "console worker running");
    let mut shown: Option<String> = None;

    while !shared.stop.load(Ordering::SeqCst) {
        let prompt = shared.prompt(default_prompt);
        if shown.as_deref() != Some(prompt.as_str()) {
            if let Err(err) = source.prompt(&prompt) {
                cz_warn!(context = ctx(), "failed to show prompt: {}", err);
            }
            shown = Some(prompt);
        }

        match source.poll_line(poll_interval) {
            Ok(None) => {}
            Ok(Some(LineEvent::Line(line))) => {
                shown = None;
                shared.handle_line(line);
            }
            Ok(Some(LineEvent::Interrupt)) => {
                shown = None;
                cz_info!(context = ctx(), "interrupt from console");
                shared.raise_interrupt();
            }
            Ok(Some(LineEvent::Eof)) => {
                cz_debug!(context = ctx(), "console input closed");
                break;
            }
            Err(err) => {
                cz_error!(context = ctx(), "console read failed: {}", err);
                break;
            }
        }
    }

    shared.running.store(false, Ordering::SeqCst);
    shared.solicitation.lock().take();
    cz_debug!(context = ctx(), "console worker exited");
    source
}
