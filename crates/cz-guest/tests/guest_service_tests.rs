//! ---
//! cz_section: "04-guest-runtime"
//! cz_subsection: "tests"
//! cz_type: "test"
//! cz_scope: "code"
//! cz_description: "Guest service lifecycle, selection and bridge behaviour."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier};
use std::thread;

use cz_common::{GuestAction, GuestConfig, OperationKind};
use cz_guest::{GuestError, GuestFn, GuestService, ENGINE_VERSION, OP_VAR};
use cz_service::{ServiceInterface, ServiceManager};
use rhai::Map;
use tempfile::TempDir;

const COUNTING_DRIVER: &str = r#"
fn start(args) {
    add_robot(7);
    #{ starts: 1, stops: 0, actions: [] }
}

fn stop(op) {
    op.stops += 1;
    op
}

fn auto_enable(op) {
    op.actions.push("auto_enable");
    op
}

fn manual_advance(op) {
    throw "wheels are stuck";
}
"#;

fn driver_dir(interact: &str) -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    let operation = dir.path().join("cozmonaut").join("operation");
    fs::create_dir_all(&operation).expect("operation dir");
    fs::write(operation.join("interact.rhai"), interact).expect("driver");
    dir
}

fn started_service(path: &Path) -> Arc<GuestService> {
    started_service_with(GuestConfig {
        script_paths: vec![path.to_path_buf()],
        ..GuestConfig::default()
    })
}

fn started_service_with(config: GuestConfig) -> Arc<GuestService> {
    cz_logging::init();
    let service = Arc::new(GuestService::new(config));
    assert!(service.on_load().is_ok());
    assert!(service.on_start().is_ok());
    service
}

fn op_map(service: &GuestService) -> Map {
    service
        .with_interpreter(|interp| interp.variable::<Map>(OP_VAR))
        .expect("interpreter")
        .expect("op is bound")
}

fn int_field(map: &Map, key: &str) -> i64 {
    map.get(key).and_then(|v| v.as_int().ok()).expect("int field")
}

#[test]
fn second_selection_fails_until_stopped() {
    let dir = driver_dir(COUNTING_DRIVER);
    let service = started_service(dir.path());

    service.op_exec(OperationKind::Interact).unwrap();
    assert_eq!(
        service.op_exec(OperationKind::Interact),
        Err(GuestError::OperationAlreadySelected(OperationKind::Interact))
    );
    assert_eq!(
        service.op_exec(OperationKind::FriendsList),
        Err(GuestError::OperationAlreadySelected(OperationKind::Interact))
    );

    assert!(service.on_stop().is_ok());
    assert_eq!(service.selected_operation(), None);
    assert_eq!(int_field(&op_map(&service), "stops"), 1);

    service.op_exec(OperationKind::Interact).unwrap();
    assert_eq!(service.selected_operation(), Some(OperationKind::Interact));
    assert!(service.on_unload().is_ok());
}

#[test]
fn stop_without_selection_runs_nothing() {
    let dir = driver_dir(COUNTING_DRIVER);
    let service = started_service(dir.path());

    assert!(service.on_stop().is_ok());
    let bound = service
        .with_interpreter(|interp| interp.has_variable(OP_VAR))
        .unwrap();
    assert!(!bound);
}

#[test]
fn actions_update_the_active_operation() {
    let dir = driver_dir(COUNTING_DRIVER);
    let service = started_service(dir.path());

    service.op_exec(OperationKind::Interact).unwrap();
    service.run_action(GuestAction::AutoEnable).unwrap();

    let op = op_map(&service);
    let actions = op.get("actions").cloned().unwrap().into_array().unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].clone().into_string().unwrap(), "auto_enable");
}

#[test]
fn guest_errors_are_reported_and_the_interpreter_survives() {
    let dir = driver_dir(COUNTING_DRIVER);
    let service = started_service(dir.path());
    service.op_exec(OperationKind::Interact).unwrap();

    match service.run_action(GuestAction::ManualAdvance) {
        Err(GuestError::Script(fault)) => {
            assert_eq!(fault.value, "wheels are stuck");
            assert!(fault.traceback[0].contains("manual_advance"));
        }
        other => panic!("expected a script fault, got {other:?}"),
    }

    // Missing driver function.
    assert!(matches!(
        service.run_action(GuestAction::DiversionWander),
        Err(GuestError::Script(_))
    ));

    service.run_action(GuestAction::AutoEnable).unwrap();
    assert_eq!(int_field(&op_map(&service), "starts"), 1);
}

#[test]
fn monitors_registered_by_drivers_are_visible_to_the_host() {
    let dir = driver_dir(COUNTING_DRIVER);
    let service = started_service(dir.path());
    service.op_exec(OperationKind::Interact).unwrap();

    let seven = service.monitors().get(7).expect("robot 7 registered");
    assert_eq!(seven.robot_id(), 7);
    assert!(service.monitors().get(8).is_none());

    let same = service
        .with_interpreter(|interp| {
            interp.run_fragment("let found = get_monitor(7);").unwrap();
            interp.variable::<cz_guest::Monitor>("found")
        })
        .unwrap()
        .unwrap();
    assert!(same.same_as(&seven));
}

#[test]
fn reloaded_interpreter_starts_without_monitors() {
    let dir = driver_dir(COUNTING_DRIVER);
    let service = started_service(dir.path());
    service.op_exec(OperationKind::Interact).unwrap();
    assert_eq!(service.monitors().len(), 1);

    assert!(service.on_stop().is_ok());
    assert!(service.on_unload().is_ok());
    assert!(service.monitors().is_empty());

    assert!(service.on_load().is_ok());
    assert!(service.on_start().is_ok());
    let found = service
        .with_interpreter(|interp| {
            interp.run_fragment("let found = type_of(get_monitor(7));").unwrap();
            interp.variable::<rhai::ImmutableString>("found")
        })
        .unwrap()
        .unwrap();
    assert_eq!(found.as_str(), "()");
    assert!(service.monitors().is_empty());
}

#[test]
fn start_reports_the_engine_version() {
    let dir = driver_dir(COUNTING_DRIVER);
    let config = GuestConfig {
        script_paths: vec![dir.path().to_path_buf()],
        ..GuestConfig::default()
    };
    let service = GuestService::new(config);
    assert!(service.on_load().is_ok());

    let (status, events) = cz_logging::capture(|| service.on_start());
    assert!(status.is_ok());
    let ready = events
        .iter()
        .find(|e| e.message().starts_with("guest runtime ready"))
        .expect("startup record");
    assert_eq!(ready.level, tracing::Level::INFO);
    assert!(ready.message().contains(&format!("rhai {ENGINE_VERSION}")));
    assert!(!ENGINE_VERSION.is_empty());
    assert!(service.on_unload().is_ok());
}

#[test]
fn missing_driver_module_leaves_the_selection_standing() {
    let dir = tempfile::tempdir().unwrap();
    let service = started_service(dir.path());

    assert!(matches!(
        service.op_exec(OperationKind::FriendsRemove),
        Err(GuestError::Script(_))
    ));
    assert_eq!(service.selected_operation(), Some(OperationKind::FriendsRemove));
    assert!(!service.on_stop().is_ok());
    assert_eq!(service.selected_operation(), None);
}

#[test]
fn concurrent_callers_take_turns() {
    let dir = driver_dir(COUNTING_DRIVER);
    let service = started_service(dir.path());
    service.op_exec(OperationKind::Interact).unwrap();

    let barrier = Arc::new(Barrier::new(4));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = service.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..10 {
                    service.run_action(GuestAction::AutoEnable).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let op = op_map(&service);
    let actions = op.get("actions").cloned().unwrap().into_array().unwrap();
    assert_eq!(actions.len(), 40);
}

#[test]
fn nothing_runs_after_unload() {
    let dir = driver_dir(COUNTING_DRIVER);
    let service = started_service(dir.path());
    assert!(service.on_unload().is_ok());
    assert_eq!(
        service.run_action(GuestAction::AutoEnable),
        Err(GuestError::NotInitialized)
    );
}

#[test]
fn procedures_dispatch_through_the_manager() {
    let dir = driver_dir(COUNTING_DRIVER);
    let config = GuestConfig {
        script_paths: vec![dir.path().to_path_buf()],
        ..GuestConfig::default()
    };
    let service = Arc::new(GuestService::new(config));
    let descriptor = service.descriptor();
    let mut manager = ServiceManager::new();

    manager.load(&descriptor).unwrap();
    manager.start(&descriptor).unwrap();
    manager
        .call(&descriptor, GuestFn::OpExec.ordinal(), &OperationKind::Interact, &mut ())
        .unwrap();
    manager
        .call(&descriptor, GuestFn::AutoEnable.ordinal(), &(), &mut ())
        .unwrap();
    assert_eq!(service.selected_operation(), Some(OperationKind::Interact));

    manager.stop(&descriptor).unwrap();
    assert_eq!(service.selected_operation(), None);
    manager.unload(&descriptor).unwrap();
}

#[test]
fn shipped_interact_driver_runs_every_action() {
    let scripts = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../scripts");
    let mut config = GuestConfig {
        script_paths: vec![scripts],
        ..GuestConfig::default()
    };
    config.driver_args.insert("robots".into(), "2".into());
    cz_logging::init();
    let service = Arc::new(GuestService::new(config));
    assert!(service.on_load().is_ok());
    assert!(service.on_start().is_ok());

    service.op_exec(OperationKind::Interact).unwrap();
    assert_eq!(service.monitors().len(), 2);
    for action in [
        GuestAction::AutoEnable,
        GuestAction::AutoDisable,
        GuestAction::ManualAdvance,
        GuestAction::ManualReturn,
        GuestAction::DiversionFaces,
        GuestAction::DiversionConverse,
        GuestAction::DiversionWander,
        GuestAction::TestLowBattery,
    ] {
        service.run_action(action).unwrap();
    }

    let op = op_map(&service);
    assert_eq!(
        op.get("diversion").cloned().unwrap().into_string().unwrap(),
        "wander"
    );
    assert!(op.get("low_battery").unwrap().as_bool().unwrap());

    assert!(service.on_stop().is_ok());
    assert!(op_map(&service).get("stopped").unwrap().as_bool().unwrap());
    assert!(service.on_unload().is_ok());
}

#[test]
fn shipped_interact_driver_reports_ignored_commands_on_stderr() {
    let scripts = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../scripts");
    let config = GuestConfig {
        script_paths: vec![scripts],
        ..GuestConfig::default()
    };
    let service = started_service_with(config);
    service.op_exec(OperationKind::Interact).unwrap();
    service.run_action(GuestAction::AutoEnable).unwrap();

    let (result, events) = cz_logging::capture(|| service.run_action(GuestAction::ManualAdvance));
    result.unwrap();
    let stderr: Vec<_> = events.iter().filter(|e| e.tag() == "stderr").collect();
    assert_eq!(stderr.len(), 1);
    assert_eq!(stderr[0].level, tracing::Level::ERROR);
    assert_eq!(
        stderr[0].message(),
        "interact: manual advance ignored in automatic mode"
    );
    assert!(service.on_unload().is_ok());
}
