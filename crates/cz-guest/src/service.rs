//! ---
//! cz_section: "04-guest-runtime"
//! cz_subsection: "module"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "Service interface hosting the guest runtime."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
use std::any::Any;
use std::sync::Arc;

use cz_common::{GuestAction, GuestConfig, OperationKind};
use cz_logging::{cz_debug, cz_error, cz_fatal, cz_info, LogContext};
use cz_service::{Ordinal, Procedure, ServiceDescriptor, ServiceInterface, Status};
use parking_lot::{Mutex, RwLock};
use strum::FromRepr;

use crate::error::GuestError;
use crate::interpreter::{GuestInterpreter, ENGINE_VERSION};
use crate::monitor::MonitorRegistry;
use crate::operation;
use crate::token::ExecutionToken;

pub const SERVICE_NAME: &str = "guest";
pub const SERVICE_DESCRIPTION: &str = "Embedded guest scripting runtime";

fn ctx() -> LogContext<'static> {
    LogContext::tagged("guest").with_service(SERVICE_NAME)
}

/// Procedure ordinals of the guest service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr)]
#[repr(u32)]
pub enum GuestFn {
    /// Select and start an operation. Input: `OperationKind`.
    OpExec = 0,
    AutoEnable,
    AutoDisable,
    TestLowBattery,
    ManualAdvance,
    ManualReturn,
    DiversionFaces,
    DiversionConverse,
    DiversionWander,
}

impl GuestFn {
    pub const fn ordinal(self) -> Ordinal {
        self as Ordinal
    }

    pub fn for_action(action: GuestAction) -> Self {
        match action {
            GuestAction::AutoEnable => GuestFn::AutoEnable,
            GuestAction::AutoDisable => GuestFn::AutoDisable,
            GuestAction::TestLowBattery => GuestFn::TestLowBattery,
            GuestAction::ManualAdvance => GuestFn::ManualAdvance,
            GuestAction::ManualReturn => GuestFn::ManualReturn,
            GuestAction::DiversionFaces => GuestFn::DiversionFaces,
            GuestAction::DiversionConverse => GuestFn::DiversionConverse,
            GuestAction::DiversionWander => GuestFn::DiversionWander,
        }
    }

    pub fn action(self) -> Option<GuestAction> {
        match self {
            GuestFn::OpExec => None,
            GuestFn::AutoEnable => Some(GuestAction::AutoEnable),
            GuestFn::AutoDisable => Some(GuestAction::AutoDisable),
            GuestFn::TestLowBattery => Some(GuestAction::TestLowBattery),
            GuestFn::ManualAdvance => Some(GuestAction::ManualAdvance),
            GuestFn::ManualReturn => Some(GuestAction::ManualReturn),
            GuestFn::DiversionFaces => Some(GuestAction::DiversionFaces),
            GuestFn::DiversionConverse => Some(GuestAction::DiversionConverse),
            GuestFn::DiversionWander => Some(GuestAction::DiversionWander),
        }
    }
}

/// Hosts the guest interpreter behind an [`ExecutionToken`].
///
/// The interpreter exists between `on_load` and `on_unload`. At most one
/// operation is selected at a time; `on_stop` runs its stop fragment and
/// clears the selection. Each interpreter gets its own monitor registry.
pub struct GuestService {
    config: GuestConfig,
    monitors: RwLock<MonitorRegistry>,
    bridge: RwLock<Option<Arc<ExecutionToken<GuestInterpreter>>>>,
    selection: Mutex<Option<OperationKind>>,
}

impl GuestService {
    pub fn new(config: GuestConfig) -> Self {
        Self {
            config,
            monitors: RwLock::new(MonitorRegistry::new()),
            bridge: RwLock::new(None),
            selection: Mutex::new(None),
        }
    }

    pub fn descriptor(self: &Arc<Self>) -> ServiceDescriptor {
        ServiceDescriptor::new(SERVICE_NAME, SERVICE_DESCRIPTION).with_interface(self.clone())
    }

    /// Monitors registered by the current interpreter.
    pub fn monitors(&self) -> MonitorRegistry {
        self.monitors.read().clone()
    }

    pub fn selected_operation(&self) -> Option<OperationKind> {
        *self.selection.lock()
    }

    /// Select `op` and run its start fragment.
    ///
    /// The selection stands even if the fragment fails, so a later stop still
    /// reaches the driver.
    pub fn op_exec(&self, op: OperationKind) -> Result<(), GuestError> {
        {
            let mut selection = self.selection.lock();
            if let Some(active) = *selection {
                cz_error!(
                    context = ctx(),
                    "cannot select {}: operation {} already selected",
                    op,
                    active
                );
                return Err(GuestError::OperationAlreadySelected(active));
            }
            *selection = Some(op);
        }

        cz_info!(context = ctx(), "starting operation {}", op);
        self.run(&operation::start_fragment(op))
    }

    /// Forward an auxiliary action to the active driver.
    pub fn run_action(&self, action: GuestAction) -> Result<(), GuestError> {
        cz_debug!(context = ctx(), "guest action {}", action);
        self.run(&operation::action_fragment(action))
    }

    /// Acquire the token, run `f` on the interpreter, release.
    pub fn with_interpreter<R>(
        &self,
        f: impl FnOnce(&mut GuestInterpreter) -> R,
    ) -> Result<R, GuestError> {
        let token = self.token()?;
        let mut guard = token.acquire().map_err(|err| {
            cz_error!(context = ctx(), "cannot enter guest: {}", err);
            GuestError::from(err)
        })?;
        Ok(f(&mut guard))
    }

    fn run(&self, fragment: &str) -> Result<(), GuestError> {
        self.with_interpreter(|interp| interp.run_fragment(fragment))?
            .map_err(GuestError::from)
    }

    fn token(&self) -> Result<Arc<ExecutionToken<GuestInterpreter>>, GuestError> {
        match self.bridge.read().as_ref() {
            Some(token) => Ok(token.clone()),
            None => {
                cz_error!(context = ctx(), "guest interpreter is not initialized");
                Err(GuestError::NotInitialized)
            }
        }
    }

    fn initialize(&self) -> Result<(), GuestError> {
        if self.config.script_paths.is_empty() {
            return Err(GuestError::Initialization(
                "no script search paths configured".into(),
            ));
        }
        self.config
            .polling
            .validate()
            .map_err(|err| GuestError::Initialization(err.to_string()))?;

        let monitors = MonitorRegistry::new();
        let interpreter = GuestInterpreter::initialize(&self.config, monitors.clone());
        *self.monitors.write() = monitors;
        *self.bridge.write() = Some(Arc::new(ExecutionToken::new(interpreter)));
        Ok(())
    }
}

impl ServiceInterface for GuestService {
    fn on_load(&self) -> Status {
        match self.initialize() {
            Ok(()) => Status::OK,
            Err(err) => {
                cz_fatal!(context = ctx(), "{}", err);
                Status::FAILURE
            }
        }
    }

    fn on_unload(&self) -> Status {
        let Some(token) = self.bridge.write().take() else {
            return Status::OK;
        };

        match token.finalize() {
            Ok(interpreter) => {
                interpreter.finalize();
                *self.monitors.write() = MonitorRegistry::new();
                Status::OK
            }
            Err(err) => {
                cz_error!(context = ctx(), "failed to finalize interpreter: {}", err);
                Status::FAILURE
            }
        }
    }

    fn on_start(&self) -> Status {
        let paths = &self.config.script_paths;
        let wired = self.with_interpreter(|interp| {
            interp.wire_output();
            interp.disable_input();
            interp.append_search_paths(paths);
        });
        match wired {
            Ok(()) => {
                cz_info!(
                    context = ctx(),
                    "guest runtime ready: rhai {}, {} search paths",
                    ENGINE_VERSION,
                    paths.len()
                );
                Status::OK
            }
            Err(err) => {
                cz_fatal!(context = ctx(), "failed to wire guest runtime: {}", err);
                Status::FAILURE
            }
        }
    }

    fn on_stop(&self) -> Status {
        let Some(op) = self.selected_operation() else {
            return Status::OK;
        };

        cz_info!(context = ctx(), "stopping operation {}", op);
        let result = self.run(&operation::stop_fragment(op));
        *self.selection.lock() = None;
        result.into()
    }

    fn procedure(&self, ordinal: Ordinal) -> Option<Procedure<'_>> {
        let function = GuestFn::from_repr(ordinal)?;
        let procedure: Procedure<'_> = match function.action() {
            None => Box::new(move |input: &dyn Any, _output: &mut dyn Any| {
                let Some(op) = input.downcast_ref::<OperationKind>() else {
                    cz_error!(context = ctx(), "op_exec expects an operation kind");
                    return Status::FAILURE;
                };
                self.op_exec(*op).into()
            }),
            Some(action) => Box::new(move |_input: &dyn Any, _output: &mut dyn Any| {
                self.run_action(action).into()
            }),
        };
        Some(procedure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_round_trip_through_actions() {
        assert_eq!(GuestFn::from_repr(0), Some(GuestFn::OpExec));
        assert_eq!(GuestFn::from_repr(9), None);
        for ordinal in 1..=8 {
            let function = GuestFn::from_repr(ordinal).unwrap();
            let action = function.action().unwrap();
            assert_eq!(GuestFn::for_action(action).ordinal(), ordinal);
        }
    }

    #[test]
    fn calls_before_load_report_not_initialized() {
        let service = GuestService::new(GuestConfig::default());
        assert_eq!(
            service.run_action(GuestAction::AutoEnable),
            Err(GuestError::NotInitialized)
        );
        assert!(!service.on_start().is_ok());
        assert!(service.on_unload().is_ok());
    }

    #[test]
    fn empty_search_path_fails_to_load() {
        let config = GuestConfig {
            script_paths: Vec::new(),
            ..GuestConfig::default()
        };
        let service = GuestService::new(config);
        let (status, events) = cz_logging::capture(|| service.on_load());
        assert_eq!(status, Status::FAILURE);
        let fatal: Vec<_> = events
            .iter()
            .filter(|e| e.field("severity") == Some("fatal"))
            .collect();
        assert_eq!(fatal.len(), 1);
        assert_eq!(fatal[0].level, tracing::Level::ERROR);
        assert!(fatal[0].message().contains("no script search paths"));
    }

    #[test]
    fn wiring_without_an_interpreter_is_fatal() {
        let service = GuestService::new(GuestConfig::default());
        let (status, events) = cz_logging::capture(|| service.on_start());
        assert_eq!(status, Status::FAILURE);
        assert!(events.iter().any(|e| e.field("severity") == Some("fatal")
            && e.message().starts_with("failed to wire guest runtime")));
    }
}
