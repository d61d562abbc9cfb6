//! ---
//! cz_section: "01-core-functionality"
//! cz_subsection: "module"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "Host configuration model and loader."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use tracing::debug;

use crate::logging::LogFormat;

fn default_script_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("scripts")]
}

fn default_interrupt_poll() -> Duration {
    Duration::from_millis(100)
}

fn default_console_enabled() -> bool {
    true
}

fn default_console_prompt() -> String {
    "> ".to_owned()
}

fn default_console_poll_interval() -> Duration {
    Duration::from_millis(50)
}

fn default_battery_secs() -> f64 {
    3.0
}

fn default_imu_secs() -> f64 {
    0.1
}

fn default_wheel_speeds_secs() -> f64 {
    0.1
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Primary configuration object for the host process.
///
/// This is the explicit context threaded through service construction; nothing
/// in the workspace reads process-wide mutable state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub guest: GuestConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "COZMONAUT_CONFIG";

    /// Load configuration from disk, respecting the `COZMONAUT_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<AppConfig>()
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.host.validate()?;
        self.guest.validate()?;
        self.console.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// One of the guest-script-driven high-level behaviours.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum OperationKind {
    FriendsList,
    FriendsRemove,
    #[default]
    Interact,
}

/// Auxiliary requests forwarded to an active interact operation.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum GuestAction {
    AutoEnable,
    AutoDisable,
    TestLowBattery,
    ManualAdvance,
    ManualReturn,
    DiversionFaces,
    DiversionConverse,
    DiversionWander,
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub operation: OperationKind,
    #[serde(default)]
    pub startup_actions: Vec<GuestAction>,
    #[serde(default = "default_interrupt_poll", rename = "interrupt_poll_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub interrupt_poll: Duration,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            operation: OperationKind::default(),
            startup_actions: Vec::new(),
            interrupt_poll: default_interrupt_poll(),
        }
    }
}

impl HostConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interrupt_poll.is_zero() {
            return Err(anyhow!("host.interrupt_poll_ms must be greater than zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestConfig {
    /// Directories searched, in order, when driver fragments import modules.
    #[serde(default = "default_script_paths")]
    pub script_paths: Vec<PathBuf>,
    /// Passed verbatim to drivers as the `args` map.
    #[serde(default)]
    pub driver_args: IndexMap<String, String>,
    #[serde(default)]
    pub polling: PollingConfig,
}

impl Default for GuestConfig {
    fn default() -> Self {
        Self {
            script_paths: default_script_paths(),
            driver_args: IndexMap::new(),
            polling: PollingConfig::default(),
        }
    }
}

impl GuestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.script_paths.is_empty() {
            return Err(anyhow!("guest.script_paths must list at least one directory"));
        }
        self.polling.validate()
    }
}

/// Delays, in seconds, that driver scripts read to pace telemetry polling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PollingConfig {
    #[serde(default = "default_battery_secs")]
    pub battery_secs: f64,
    #[serde(default = "default_imu_secs")]
    pub imu_secs: f64,
    #[serde(default = "default_wheel_speeds_secs")]
    pub wheel_speeds_secs: f64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            battery_secs: default_battery_secs(),
            imu_secs: default_imu_secs(),
            wheel_speeds_secs: default_wheel_speeds_secs(),
        }
    }
}

impl PollingConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("battery_secs", self.battery_secs),
            ("imu_secs", self.imu_secs),
            ("wheel_speeds_secs", self.wheel_speeds_secs),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(anyhow!(
                    "guest.polling.{} must be a positive number of seconds (got {})",
                    name,
                    value
                ));
            }
        }
        Ok(())
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default = "default_console_enabled")]
    pub enabled: bool,
    #[serde(default = "default_console_prompt")]
    pub prompt: String,
    #[serde(default = "default_console_poll_interval", rename = "poll_interval_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub poll_interval: Duration,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: default_console_enabled(),
            prompt: default_console_prompt(),
            poll_interval: default_console_poll_interval(),
        }
    }
}

impl ConsoleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(anyhow!(
                "console.poll_interval_ms must be greater than zero"
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}
