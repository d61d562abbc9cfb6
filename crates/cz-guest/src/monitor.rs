//! ---
//! cz_section: "04-guest-runtime"
//! cz_subsection: "module"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "Per-robot telemetry monitors exposed to guest scripts."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use cz_common::PollingConfig;
use cz_logging::{cz_debug, cz_trace, LogContext};
use parking_lot::Mutex;
use rhai::{Dynamic, Engine, EvalAltResult, FLOAT, INT};

const TAG: &str = "monitor";

struct MonitorInner {
    robot_id: INT,
    polling: PollingConfig,
}

/// Telemetry sink for one robot. Clones share identity.
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<MonitorInner>,
}

impl Monitor {
    fn new(robot_id: INT, polling: PollingConfig) -> Self {
        Self {
            inner: Arc::new(MonitorInner { robot_id, polling }),
        }
    }

    pub fn robot_id(&self) -> INT {
        self.inner.robot_id
    }

    pub fn delay_battery(&self) -> FLOAT {
        self.inner.polling.battery_secs
    }

    pub fn delay_imu(&self) -> FLOAT {
        self.inner.polling.imu_secs
    }

    pub fn delay_wheel_speeds(&self) -> FLOAT {
        self.inner.polling.wheel_speeds_secs
    }

    /// Whether both handles refer to the same registered monitor.
    pub fn same_as(&self, other: &Monitor) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn ingest(&self, channel: &str, values: &[FLOAT]) {
        cz_trace!(
            context = LogContext::tagged(TAG),
            "robot {} {} {:?}",
            self.inner.robot_id,
            channel,
            values
        );
    }
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("robot_id", &self.inner.robot_id)
            .finish()
    }
}

/// Monitors keyed by robot id. Lives as long as the interpreter.
#[derive(Debug, Clone, Default)]
pub struct MonitorRegistry {
    monitors: Arc<Mutex<HashMap<INT, Monitor>>>,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh monitor for `robot_id`, replacing any previous one.
    pub fn add(&self, robot_id: INT, polling: PollingConfig) -> Monitor {
        let monitor = Monitor::new(robot_id, polling);
        self.monitors.lock().insert(robot_id, monitor.clone());
        cz_debug!(context = LogContext::tagged(TAG), "registered robot {}", robot_id);
        monitor
    }

    pub fn get(&self, robot_id: INT) -> Option<Monitor> {
        self.monitors.lock().get(&robot_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.monitors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.lock().is_empty()
    }
}

fn number(method: &str, value: &Dynamic) -> Result<FLOAT, Box<EvalAltResult>> {
    if let Ok(v) = value.as_int() {
        return Ok(v as FLOAT);
    }
    if let Ok(v) = value.as_float() {
        return Ok(v);
    }
    Err(format!("{method}() expects numbers, got {}", value.type_name()).into())
}

fn numbers<const N: usize>(
    method: &str,
    values: [&Dynamic; N],
) -> Result<[FLOAT; N], Box<EvalAltResult>> {
    let mut out = [0.0; N];
    for (slot, value) in out.iter_mut().zip(values) {
        *slot = number(method, value)?;
    }
    Ok(out)
}

/// Install `add_robot`, `get_monitor` and the `Monitor` type into `engine`.
pub(crate) fn register(engine: &mut Engine, registry: MonitorRegistry, polling: PollingConfig) {
    engine
        .register_type_with_name::<Monitor>("Monitor")
        .register_get("robot_id", |m: &mut Monitor| m.robot_id())
        .register_get("delay_battery", |m: &mut Monitor| m.delay_battery())
        .register_get("delay_imu", |m: &mut Monitor| m.delay_imu())
        .register_get("delay_wheel_speeds", |m: &mut Monitor| m.delay_wheel_speeds())
        .register_fn("to_string", |m: &mut Monitor| format!("Monitor({})", m.robot_id()))
        .register_fn("to_debug", |m: &mut Monitor| format!("{m:?}"));

    engine
        .register_fn(
            "push_battery",
            |m: &mut Monitor, v: Dynamic| -> Result<(), Box<EvalAltResult>> {
                m.ingest("battery", &numbers("push_battery", [&v])?);
                Ok(())
            },
        )
        .register_fn(
            "push_accelerometer",
            |m: &mut Monitor, x: Dynamic, y: Dynamic, z: Dynamic| -> Result<(), Box<EvalAltResult>> {
                m.ingest("accelerometer", &numbers("push_accelerometer", [&x, &y, &z])?);
                Ok(())
            },
        )
        .register_fn(
            "push_gyroscope",
            |m: &mut Monitor, x: Dynamic, y: Dynamic, z: Dynamic| -> Result<(), Box<EvalAltResult>> {
                m.ingest("gyroscope", &numbers("push_gyroscope", [&x, &y, &z])?);
                Ok(())
            },
        )
        .register_fn(
            "push_wheel_speeds",
            |m: &mut Monitor, l: Dynamic, r: Dynamic| -> Result<(), Box<EvalAltResult>> {
                m.ingest("wheel_speeds", &numbers("push_wheel_speeds", [&l, &r])?);
                Ok(())
            },
        );

    let adder = registry.clone();
    engine.register_fn("add_robot", move |robot_id: INT| {
        adder.add(robot_id, polling);
    });
    engine.register_fn("get_monitor", move |robot_id: INT| -> Dynamic {
        registry
            .get(robot_id)
            .map(Dynamic::from)
            .unwrap_or(Dynamic::UNIT)
    });
}
