//! upmon Daemon Binary
//!
//! Watches for staged systemd offline updates, reports transitions through
//! tracing, and cancels a staged update when the power saver turns on. The
//! host power-profile signal and UI are out of scope here; SIGUSR1 toggles
//! the power-saver flag and SIGUSR2 requests a cancellation, as the boundary
//! stand-ins.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};

use upmon_lib::backends::default_backends;
use upmon_lib::config::Settings;
use upmon_lib::controller::{UpdateController, bind_to_monitor};
use upmon_lib::core::format_error_with_suggestion;
use upmon_lib::monitor::UpdateMonitor;
use upmon_lib::power::spawn_auto_cancel;

/// upmon daemon - watch and control staged offline updates
#[derive(Parser, Debug)]
#[command(name = "upmond")]
#[command(version)]
#[command(about = "Monitor staged systemd offline updates")]
struct Args {
    /// Config file (default: ~/.config/upmon/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run one detection pass, print the result, and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false)
        .init();

    let settings = match &args.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let settings = settings.map_err(|e| anyhow::anyhow!(format_error_with_suggestion(&e)))?;

    tracing::info!(
        "Starting upmon daemon (upmond) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let monitor = UpdateMonitor::start(&settings, default_backends()).await?;

    if args.check {
        return check_once(&monitor).await;
    }

    let controller = Arc::new(UpdateController::new());
    let _binding = bind_to_monitor(Arc::clone(&controller), monitor.subscribe());

    let (power_tx, power_rx) = tokio::sync::watch::channel(false);
    spawn_power_saver_toggle(power_tx)?;
    spawn_cancel_request(Arc::clone(&controller))?;

    if settings.auto_cancel_on_power_saver {
        spawn_auto_cancel(
            Arc::clone(&controller),
            power_rx,
            monitor.subscribe(),
            settings.backend_settle_delay(),
        );
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    monitor.shutdown().await;

    Ok(())
}

/// Print the current detection result for scripting and diagnostics.
async fn check_once(monitor: &UpdateMonitor) -> Result<()> {
    let state = monitor.state();
    if !state.pending {
        println!("none");
        return Ok(());
    }
    match &state.backend {
        None => println!("pending (unclaimed)"),
        Some(backend) => {
            println!("pending ({})", backend.name());
            match backend.packages().await {
                Ok(packages) => {
                    for pkg in packages {
                        let mark = if pkg.important { " !" } else { "" };
                        println!(
                            "  {} {} -> {}{mark}",
                            pkg.name, pkg.old_version, pkg.new_version
                        );
                    }
                }
                Err(error) => {
                    eprintln!("{}", format_error_with_suggestion(&error));
                }
            }
        }
    }
    Ok(())
}

/// SIGUSR1 toggles the power-saver flag fed to the auto-cancel policy.
fn spawn_power_saver_toggle(power_tx: tokio::sync::watch::Sender<bool>) -> Result<()> {
    let mut usr1 = signal(SignalKind::user_defined1())?;
    tokio::spawn(async move {
        while usr1.recv().await.is_some() {
            let enabled = !*power_tx.borrow();
            tracing::info!(enabled, "Power saver toggled");
            if power_tx.send(enabled).is_err() {
                break;
            }
        }
    });
    Ok(())
}

/// SIGUSR2 requests cancellation of the pending update.
fn spawn_cancel_request(controller: Arc<UpdateController>) -> Result<()> {
    let mut usr2 = signal(SignalKind::user_defined2())?;
    tokio::spawn(async move {
        while usr2.recv().await.is_some() {
            match controller.cancel_pending_update().await {
                Ok(outcome) => tracing::info!(?outcome, "Cancellation requested"),
                Err(error) => {
                    tracing::error!("{}", format_error_with_suggestion(&error));
                }
            }
        }
    });
    Ok(())
}
