//! ---
//! cz_section: "02-service-lifecycle"
//! cz_subsection: "module"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "Lifecycle state machine and procedure dispatch."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
use std::any::Any;
use std::collections::HashMap;

use cz_logging::{cz_error, cz_info, cz_trace, cz_warn, LogContext};

use crate::descriptor::ServiceDescriptor;
use crate::error::LifecycleError;
use crate::interface::{Ordinal, ServiceInterface};
use crate::status::Status;

const TAG: &str = "service";

/// Observable phase of one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServicePhase {
    Unloaded,
    Loaded,
    Started,
}

/// Mutable per-service record. Present exactly while the service is loaded.
#[derive(Debug, Default, Clone, Copy)]
struct ServiceState {
    started: bool,
}

/// Drives services through their lifecycle.
///
/// Transitions take `&mut self`, so two transitions can never overlap. Calls
/// take `&self` and may run concurrently with each other; services serialize
/// their own internals where needed.
#[derive(Debug, Default)]
pub struct ServiceManager {
    states: HashMap<String, ServiceState>,
}

impl ServiceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self, svc: &ServiceDescriptor) -> ServicePhase {
        match self.states.get(svc.name()) {
            None => ServicePhase::Unloaded,
            Some(state) if state.started => ServicePhase::Started,
            Some(_) => ServicePhase::Loaded,
        }
    }

    pub fn is_loaded(&self, svc: &ServiceDescriptor) -> bool {
        self.states.contains_key(svc.name())
    }

    pub fn is_started(&self, svc: &ServiceDescriptor) -> bool {
        self.states.get(svc.name()).is_some_and(|s| s.started)
    }

    /// Load a service and invoke its `on_load` callback.
    pub fn load(&mut self, svc: &ServiceDescriptor) -> Result<Status, LifecycleError> {
        let ctx = context(svc);
        cz_trace!(context = ctx, "loading service {}", svc.name());

        if self.states.contains_key(svc.name()) {
            cz_error!(context = ctx, "service {} already loaded", svc.name());
            return Err(LifecycleError::AlreadyLoaded(svc.name().to_owned()));
        }

        self.states
            .insert(svc.name().to_owned(), ServiceState::default());

        let status = invoke(svc, "on_load", |iface| iface.on_load());

        cz_info!(context = ctx, "loaded service {}", svc.name());
        Ok(status)
    }

    /// Invoke `on_unload` and release the service's state.
    pub fn unload(&mut self, svc: &ServiceDescriptor) -> Result<Status, LifecycleError> {
        let ctx = context(svc);
        cz_trace!(context = ctx, "unloading service {}", svc.name());

        if !self.states.contains_key(svc.name()) {
            cz_error!(context = ctx, "service {} not loaded", svc.name());
            return Err(LifecycleError::NotLoaded(svc.name().to_owned()));
        }

        let status = invoke(svc, "on_unload", |iface| iface.on_unload());
        self.states.remove(svc.name());

        cz_info!(context = ctx, "unloaded service {}", svc.name());
        Ok(status)
    }

    /// Mark a loaded service started and invoke `on_start`.
    ///
    /// The started flag is set before the callback runs, so `on_start` already
    /// observes the service as started.
    pub fn start(&mut self, svc: &ServiceDescriptor) -> Result<Status, LifecycleError> {
        let ctx = context(svc);
        cz_trace!(context = ctx, "starting service {}", svc.name());

        let state = self.loaded_state(svc)?;
        if state.started {
            cz_error!(context = ctx, "service {} already started", svc.name());
            return Err(LifecycleError::AlreadyStarted(svc.name().to_owned()));
        }
        state.started = true;

        let status = invoke(svc, "on_start", |iface| iface.on_start());

        cz_info!(
            context = ctx,
            "started service {}: {}",
            svc.name(),
            svc.description()
        );
        Ok(status)
    }

    /// Invoke `on_stop` on a started service, then clear its started flag.
    pub fn stop(&mut self, svc: &ServiceDescriptor) -> Result<Status, LifecycleError> {
        let ctx = context(svc);
        cz_trace!(context = ctx, "stopping service {}", svc.name());

        if !self.loaded_state(svc)?.started {
            cz_error!(context = ctx, "service {} not started", svc.name());
            return Err(LifecycleError::NotStarted(svc.name().to_owned()));
        }

        let status = invoke(svc, "on_stop", |iface| iface.on_stop());

        if let Some(state) = self.states.get_mut(svc.name()) {
            state.started = false;
        }

        cz_info!(context = ctx, "stopped service {}", svc.name());
        Ok(status)
    }

    /// Call one procedure of a started service.
    ///
    /// A nonzero procedure status is logged as a warning. An ordinal with no
    /// procedure, or a descriptor without an interface, is rejected.
    pub fn call(
        &self,
        svc: &ServiceDescriptor,
        ordinal: Ordinal,
        input: &dyn Any,
        output: &mut dyn Any,
    ) -> Result<(), LifecycleError> {
        let ctx = context(svc);
        cz_trace!(
            context = ctx,
            "calling procedure #{} on service {}",
            ordinal,
            svc.name()
        );

        match self.states.get(svc.name()) {
            None => {
                cz_error!(context = ctx, "service {} not loaded", svc.name());
                return Err(LifecycleError::NotLoaded(svc.name().to_owned()));
            }
            Some(state) if !state.started => {
                cz_error!(context = ctx, "service {} not started", svc.name());
                return Err(LifecycleError::NotStarted(svc.name().to_owned()));
            }
            Some(_) => {}
        }

        let Some(procedure) = svc.interface().and_then(|iface| iface.procedure(ordinal)) else {
            cz_error!(
                context = ctx,
                "service {} has no procedure #{}",
                svc.name(),
                ordinal
            );
            return Err(LifecycleError::UnknownOrdinal {
                service: svc.name().to_owned(),
                ordinal,
            });
        };

        let status = procedure(input, output);
        if !status.is_ok() {
            cz_warn!(
                context = ctx,
                "service {} procedure #{} returned code {}",
                svc.name(),
                ordinal,
                status
            );
        }

        Ok(())
    }

    fn loaded_state(
        &mut self,
        svc: &ServiceDescriptor,
    ) -> Result<&mut ServiceState, LifecycleError> {
        match self.states.get_mut(svc.name()) {
            Some(state) => Ok(state),
            None => {
                cz_error!(context = context(svc), "service {} not loaded", svc.name());
                Err(LifecycleError::NotLoaded(svc.name().to_owned()))
            }
        }
    }
}

fn context(svc: &ServiceDescriptor) -> LogContext<'_> {
    LogContext::tagged(TAG).with_service(svc.name())
}

fn invoke<F>(svc: &ServiceDescriptor, callback: &str, f: F) -> Status
where
    F: FnOnce(&dyn ServiceInterface) -> Status,
{
    let Some(iface) = svc.interface() else {
        return Status::OK;
    };

    let status = f(iface);
    if !status.is_ok() {
        cz_warn!(
            context = context(svc),
            "service {} {}() returned code {}",
            svc.name(),
            callback,
            status
        );
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interfaceless_service_walks_the_whole_lifecycle() {
        let svc = ServiceDescriptor::new("bare", "no callbacks");
        let mut mgr = ServiceManager::new();

        assert_eq!(mgr.phase(&svc), ServicePhase::Unloaded);
        assert_eq!(mgr.load(&svc), Ok(Status::OK));
        assert_eq!(mgr.phase(&svc), ServicePhase::Loaded);
        assert_eq!(mgr.start(&svc), Ok(Status::OK));
        assert_eq!(mgr.phase(&svc), ServicePhase::Started);
        assert_eq!(
            mgr.call(&svc, 0, &(), &mut ()),
            Err(LifecycleError::UnknownOrdinal {
                service: "bare".into(),
                ordinal: 0
            })
        );
        assert_eq!(mgr.stop(&svc), Ok(Status::OK));
        assert_eq!(mgr.unload(&svc), Ok(Status::OK));
        assert_eq!(mgr.phase(&svc), ServicePhase::Unloaded);
    }

    #[test]
    fn unload_of_a_started_service_is_permitted() {
        let svc = ServiceDescriptor::new("eager", "");
        let mut mgr = ServiceManager::new();
        mgr.load(&svc).unwrap();
        mgr.start(&svc).unwrap();
        assert!(mgr.unload(&svc).is_ok());
        assert!(!mgr.is_loaded(&svc));
    }
}
