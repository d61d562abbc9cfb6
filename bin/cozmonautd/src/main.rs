//! ---
//! cz_section: "06-host"
//! cz_subsection: "binary"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "Binary entrypoint for the Cozmonaut host daemon."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use cz_common::config::{AppConfig, OperationKind};
use cz_common::logging::init_tracing;
use cz_common::version::VersionInfo;
use cz_console::{ConsoleFn, ConsoleService};
use cz_guest::{GuestFn, GuestService};
use cz_service::{ServiceDescriptor, ServiceManager};
use tokio::signal;
use tracing::{error, info, warn};

const DEFAULT_CONFIG: &str = "configs/cozmonaut.toml";

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    version = concat!("cozmonaut ", env!("CARGO_PKG_VERSION")),
    about = "Cozmonaut service host",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, value_enum, help = "Override the operation to run")]
    operation: Option<OperationKind>,

    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print extended version information and exit"
    )]
    version: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let version = VersionInfo::current();
    if cli.version {
        println!("{}", version.extended());
        return Ok(());
    }

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from(DEFAULT_CONFIG));

    let loaded = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded.config;
    if let Some(operation) = cli.operation {
        config.host.operation = operation;
    }
    init_tracing("cozmonautd", &config.logging)?;
    info!(
        config_path = %loaded.source.display(),
        version = %version,
        operation = %config.host.operation,
        "configuration loaded"
    );

    run_host(config).await
}

async fn run_host(config: AppConfig) -> Result<()> {
    let console = Arc::new(ConsoleService::new(config.console.clone()));
    let guest = Arc::new(GuestService::new(config.guest.clone()));
    let console_svc = console.descriptor();
    let guest_svc = guest.descriptor();
    let mut manager = ServiceManager::new();

    manager.load(&console_svc)?;
    if !manager.load(&guest_svc)?.is_ok() {
        error!("guest runtime failed to initialize; aborting startup");
        manager.unload(&guest_svc)?;
        manager.unload(&console_svc)?;
        bail!("guest service failed to initialize");
    }

    if !manager.start(&console_svc)?.is_ok() {
        warn!("console unavailable; use ctrl-c to stop the host");
    }
    manager.start(&guest_svc)?;

    manager
        .call(
            &guest_svc,
            GuestFn::OpExec.ordinal(),
            &config.host.operation,
            &mut (),
        )
        .context("failed to select operation")?;
    for action in &config.host.startup_actions {
        info!(action = %action, "running startup action");
        manager.call(&guest_svc, GuestFn::for_action(*action).ordinal(), &(), &mut ())?;
    }

    info!("host running; waiting for stop request");
    let waited = wait_for_shutdown(&manager, &console_svc, config.host.interrupt_poll).await;

    manager.stop(&guest_svc)?;
    manager.stop(&console_svc)?;
    manager.unload(&guest_svc)?;
    manager.unload(&console_svc)?;
    waited
}

async fn wait_for_shutdown(
    manager: &ServiceManager,
    console: &ServiceDescriptor,
    poll: Duration,
) -> Result<()> {
    let mut ticker = tokio::time::interval(poll);
    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            received = &mut ctrl_c => {
                received.context("failed to listen for ctrl-c")?;
                info!("ctrl-c received; shutting down");
                return Ok(());
            }
            _ = ticker.tick() => {
                let mut interrupted = false;
                manager.call(console, ConsoleFn::Interrupted.ordinal(), &(), &mut interrupted)?;
                if interrupted {
                    info!("stop requested from console; shutting down");
                    return Ok(());
                }
            }
        }
    }
}
