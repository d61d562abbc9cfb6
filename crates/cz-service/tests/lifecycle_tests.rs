//! ---
//! cz_section: "02-service-lifecycle"
//! cz_subsection: "tests"
//! cz_type: "test"
//! cz_scope: "code"
//! cz_description: "Lifecycle guard and dispatch behaviour."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
use std::any::Any;
use std::sync::Arc;

use cz_service::{
    LifecycleError, Ordinal, Procedure, ServiceDescriptor, ServiceInterface, ServiceManager,
    ServicePhase, Status,
};
use parking_lot::Mutex;
use tracing::Level;

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
    start_status: Mutex<Status>,
}

impl Recorder {
    fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    fn record(&self, event: impl Into<String>) -> Status {
        self.events.lock().push(event.into());
        Status::OK
    }
}

impl ServiceInterface for Recorder {
    fn on_load(&self) -> Status {
        self.record("load")
    }

    fn on_unload(&self) -> Status {
        self.record("unload")
    }

    fn on_start(&self) -> Status {
        self.record("start");
        *self.start_status.lock()
    }

    fn on_stop(&self) -> Status {
        self.record("stop")
    }

    fn procedure(&self, ordinal: Ordinal) -> Option<Procedure<'_>> {
        match ordinal {
            0 => Some(Box::new(move |input: &dyn Any, output: &mut dyn Any| {
                let (Some(a), Some(out)) = (input.downcast_ref::<i32>(), output.downcast_mut::<i32>())
                else {
                    return Status::FAILURE;
                };
                *out = a * 2;
                self.record(format!("double {a}"))
            })),
            1 => Some(Box::new(move |_: &dyn Any, _: &mut dyn Any| {
                self.record("failing");
                Status::from_code(7)
            })),
            _ => None,
        }
    }
}

fn recorder_service(name: &str) -> (ServiceDescriptor, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let svc = ServiceDescriptor::new(name, "records every callback").with_interface(recorder.clone());
    (svc, recorder)
}

#[test]
fn full_cycle_leaves_no_state_behind() {
    cz_logging::init();
    let (svc, rec) = recorder_service("recorder");
    let mut mgr = ServiceManager::new();

    mgr.load(&svc).unwrap();
    mgr.start(&svc).unwrap();
    mgr.stop(&svc).unwrap();
    mgr.unload(&svc).unwrap();

    assert_eq!(rec.events(), vec!["load", "start", "stop", "unload"]);
    assert_eq!(
        mgr.unload(&svc),
        Err(LifecycleError::NotLoaded("recorder".into()))
    );
}

#[test]
fn guard_violations_do_not_invoke_callbacks_or_mutate_state() {
    let (svc, rec) = recorder_service("guarded");
    let mut mgr = ServiceManager::new();

    assert_eq!(mgr.start(&svc), Err(LifecycleError::NotLoaded("guarded".into())));
    assert_eq!(mgr.stop(&svc), Err(LifecycleError::NotLoaded("guarded".into())));

    mgr.load(&svc).unwrap();
    assert_eq!(mgr.load(&svc), Err(LifecycleError::AlreadyLoaded("guarded".into())));
    assert_eq!(mgr.stop(&svc), Err(LifecycleError::NotStarted("guarded".into())));
    assert_eq!(mgr.phase(&svc), ServicePhase::Loaded);

    mgr.start(&svc).unwrap();
    assert_eq!(mgr.start(&svc), Err(LifecycleError::AlreadyStarted("guarded".into())));
    assert_eq!(mgr.phase(&svc), ServicePhase::Started);

    assert_eq!(rec.events(), vec!["load", "start"]);
}

#[test]
fn call_before_start_is_rejected_without_invoking_the_procedure() {
    let (svc, rec) = recorder_service("early");
    let mut mgr = ServiceManager::new();
    let mut out = 0_i32;

    assert_eq!(
        mgr.call(&svc, 0, &21_i32, &mut out),
        Err(LifecycleError::NotLoaded("early".into()))
    );
    mgr.load(&svc).unwrap();
    assert_eq!(
        mgr.call(&svc, 0, &21_i32, &mut out),
        Err(LifecycleError::NotStarted("early".into()))
    );

    assert_eq!(out, 0);
    assert_eq!(rec.events(), vec!["load"]);
}

#[test]
fn call_dispatches_by_ordinal_and_swallows_nonzero_codes() {
    let (svc, rec) = recorder_service("dispatch");
    let mut mgr = ServiceManager::new();
    mgr.load(&svc).unwrap();
    mgr.start(&svc).unwrap();

    let mut out = 0_i32;
    mgr.call(&svc, 0, &21_i32, &mut out).unwrap();
    assert_eq!(out, 42);

    assert_eq!(mgr.call(&svc, 1, &(), &mut ()), Ok(()));
    assert_eq!(
        mgr.call(&svc, 9, &(), &mut ()),
        Err(LifecycleError::UnknownOrdinal {
            service: "dispatch".into(),
            ordinal: 9
        })
    );

    assert_eq!(rec.events(), vec!["load", "start", "double 21", "failing"]);
}

#[test]
fn nonzero_callback_status_is_reported_but_transition_completes() {
    let (svc, rec) = recorder_service("grumpy");
    *rec.start_status.lock() = Status::from_code(3);
    let mut mgr = ServiceManager::new();

    mgr.load(&svc).unwrap();
    assert_eq!(mgr.start(&svc), Ok(Status::from_code(3)));
    assert!(mgr.is_started(&svc));
}

#[test]
fn services_are_tracked_independently() {
    let (a, _) = recorder_service("alpha");
    let (b, _) = recorder_service("beta");
    let mut mgr = ServiceManager::new();

    mgr.load(&a).unwrap();
    mgr.start(&a).unwrap();
    mgr.load(&b).unwrap();

    assert_eq!(mgr.phase(&a), ServicePhase::Started);
    assert_eq!(mgr.phase(&b), ServicePhase::Loaded);
}

#[test]
fn guard_violations_are_logged_as_errors() {
    let (svc, _) = recorder_service("loud");
    let mut mgr = ServiceManager::new();

    let (result, events) = cz_logging::capture(|| mgr.start(&svc));
    assert_eq!(result, Err(LifecycleError::NotLoaded("loud".into())));
    let errors: Vec<_> = events.iter().filter(|e| e.level == Level::ERROR).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].tag(), "service");
    assert_eq!(errors[0].field("service"), Some("loud"));
    assert_eq!(errors[0].message(), "service loud not loaded");
    assert!(events.iter().all(|e| e.level != Level::WARN && e.level != Level::INFO));

    mgr.load(&svc).unwrap();
    let (result, events) = cz_logging::capture(|| mgr.load(&svc));
    assert!(result.is_err());
    let errors: Vec<_> = events.iter().filter(|e| e.level == Level::ERROR).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message(), "service loud already loaded");
}

#[test]
fn nonzero_codes_are_logged_as_warnings() {
    let (svc, rec) = recorder_service("grumbly");
    *rec.start_status.lock() = Status::from_code(3);
    let mut mgr = ServiceManager::new();
    mgr.load(&svc).unwrap();

    let (_, events) = cz_logging::capture(|| mgr.start(&svc));
    let warnings: Vec<_> = events.iter().filter(|e| e.level == Level::WARN).collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message().contains("on_start() returned code 3"));
    assert!(events.iter().all(|e| e.level != Level::ERROR));

    let (result, events) = cz_logging::capture(|| mgr.call(&svc, 1, &(), &mut ()));
    assert_eq!(result, Ok(()));
    let warnings: Vec<_> = events.iter().filter(|e| e.level == Level::WARN).collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].tag(), "service");
    assert!(warnings[0].message().contains("procedure #1 returned code 7"));
}
