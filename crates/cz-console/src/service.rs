//! ---
//! cz_section: "05-console"
//! cz_subsection: "module"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "Console service interface and procedures."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
use std::any::Any;
use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use cz_common::ConsoleConfig;
use cz_logging::{cz_debug, cz_error, cz_info, cz_warn, LogContext};
use cz_service::{Ordinal, Procedure, ServiceDescriptor, ServiceInterface, Status};
use parking_lot::Mutex;
use strum::FromRepr;

use crate::error::ConsoleError;
use crate::line_source::{LineSource, TerminalLineSource};
use crate::worker::{self, ConsoleShared, Solicitation};

pub const SERVICE_NAME: &str = "console";
pub const SERVICE_DESCRIPTION: &str = "Interactive operator console";

fn ctx() -> LogContext<'static> {
    LogContext::tagged("console").with_service(SERVICE_NAME)
}

/// Procedure ordinals of the console service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr)]
#[repr(u32)]
pub enum ConsoleFn {
    /// Output `bool`: whether an interrupt was raised since the last check.
    Interrupted = 0,
    /// Input `String` or `&str` prompt, output `Option<String>` line.
    Solicit = 1,
}

impl ConsoleFn {
    pub const fn ordinal(self) -> Ordinal {
        self as Ordinal
    }
}

/// Operator console running on its own thread between start and stop.
pub struct ConsoleService {
    config: ConsoleConfig,
    shared: Arc<ConsoleShared>,
    source: Mutex<Option<Box<dyn LineSource>>>,
    worker: Mutex<Option<JoinHandle<Box<dyn LineSource>>>>,
}

impl ConsoleService {
    /// Console reading from the controlling terminal.
    pub fn new(config: ConsoleConfig) -> Self {
        Self {
            config,
            shared: Arc::new(ConsoleShared::default()),
            source: Mutex::new(None),
            worker: Mutex::new(None),
        }
    }

    /// Console reading from `source` instead of the terminal.
    pub fn with_source(config: ConsoleConfig, source: impl LineSource + 'static) -> Self {
        let service = Self::new(config);
        *service.source.lock() = Some(Box::new(source));
        service
    }

    pub fn descriptor(self: &Arc<Self>) -> ServiceDescriptor {
        ServiceDescriptor::new(SERVICE_NAME, SERVICE_DESCRIPTION).with_interface(self.clone())
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Whether an interrupt was raised since the last check. Clears the flag.
    pub fn interrupted(&self) -> bool {
        self.shared.take_interrupt()
    }

    pub fn has_pending_solicitation(&self) -> bool {
        self.shared.solicitation.lock().is_some()
    }

    /// Show `prompt` and wait for the next completed line.
    ///
    /// Returns [`ConsoleError::Stopped`] if the worker exits first.
    pub fn solicit(&self, prompt: &str) -> Result<String, ConsoleError> {
        if !self.is_running() {
            return Err(ConsoleError::NotRunning);
        }

        let (reply, rx) = mpsc::channel();
        {
            let mut pending = self.shared.solicitation.lock();
            if pending.is_some() {
                return Err(ConsoleError::SolicitationPending);
            }
            *pending = Some(Solicitation {
                prompt: prompt.to_owned(),
                reply,
            });
        }

        loop {
            match rx.recv_timeout(self.config.poll_interval) {
                Ok(line) => return Ok(line),
                Err(RecvTimeoutError::Timeout) if self.is_running() => {}
                Err(_) => {
                    self.shared.solicitation.lock().take();
                    return Err(ConsoleError::Stopped);
                }
            }
        }
    }

    fn spawn_worker(&self) -> Result<(), ConsoleError> {
        let source: Box<dyn LineSource> = match self.source.lock().take() {
            Some(source) => source,
            None => Box::new(TerminalLineSource::open()?),
        };

        self.shared.stop.store(false, Ordering::SeqCst);
        self.shared.running.store(true, Ordering::SeqCst);

        let shared = self.shared.clone();
        let prompt = self.config.prompt.clone();
        let poll_interval = self.config.poll_interval;
        let spawned = thread::Builder::new()
            .name("console".into())
            .spawn(move || worker::run(&shared, source, &prompt, poll_interval));

        match spawned {
            Ok(handle) => {
                *self.worker.lock() = Some(handle);
                Ok(())
            }
            Err(err) => {
                self.shared.running.store(false, Ordering::SeqCst);
                Err(err.into())
            }
        }
    }

    fn solicit_procedure(&self, input: &dyn Any, output: &mut dyn Any) -> Status {
        let prompt = if let Some(prompt) = input.downcast_ref::<String>() {
            prompt.as_str()
        } else if let Some(prompt) = input.downcast_ref::<&'static str>() {
            *prompt
        } else {
            cz_error!(context = ctx(), "solicit expects a prompt string");
            return Status::FAILURE;
        };
        let Some(slot) = output.downcast_mut::<Option<String>>() else {
            cz_error!(context = ctx(), "solicit expects an Option<String> output");
            return Status::FAILURE;
        };

        match self.solicit(prompt) {
            Ok(line) => {
                *slot = Some(line);
                Status::OK
            }
            Err(err) => {
                cz_warn!(context = ctx(), "solicit failed: {}", err);
                *slot = None;
                Status::FAILURE
            }
        }
    }
}

impl ServiceInterface for ConsoleService {
    fn on_load(&self) -> Status {
        cz_debug!(context = ctx(), "console loaded");
        Status::OK
    }

    fn on_unload(&self) -> Status {
        self.source.lock().take();
        Status::OK
    }

    fn on_start(&self) -> Status {
        if !self.config.enabled {
            cz_info!(context = ctx(), "console disabled by configuration");
            return Status::OK;
        }
        match self.spawn_worker() {
            Ok(()) => Status::OK,
            Err(ConsoleError::NoTerminal) => {
                cz_warn!(context = ctx(), "no terminal attached, console unavailable");
                Status::FAILURE
            }
            Err(err) => {
                cz_error!(context = ctx(), "failed to start console worker: {}", err);
                Status::FAILURE
            }
        }
    }

    fn on_stop(&self) -> Status {
        self.shared.stop.store(true, Ordering::SeqCst);
        let Some(handle) = self.worker.lock().take() else {
            return Status::OK;
        };

        match handle.join() {
            Ok(source) => {
                *self.source.lock() = Some(source);
                Status::OK
            }
            Err(_) => {
                self.shared.running.store(false, Ordering::SeqCst);
                cz_error!(context = ctx(), "console worker panicked");
                Status::FAILURE
            }
        }
    }

    fn procedure(&self, ordinal: Ordinal) -> Option<Procedure<'_>> {
        let procedure: Procedure<'_> = match ConsoleFn::from_repr(ordinal)? {
            ConsoleFn::Interrupted => Box::new(move |_input: &dyn Any, output: &mut dyn Any| {
                let Some(flag) = output.downcast_mut::<bool>() else {
                    cz_error!(context = ctx(), "interrupted expects a bool output");
                    return Status::FAILURE;
                };
                *flag = self.interrupted();
                Status::OK
            }),
            ConsoleFn::Solicit => Box::new(move |input: &dyn Any, output: &mut dyn Any| {
                self.solicit_procedure(input, output)
            }),
        };
        Some(procedure)
    }
}
