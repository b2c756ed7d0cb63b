#![warn(missing_docs)]

//! Entry point for the `imewatch` binary.

mod cli;
mod error;
mod settings;

use std::process;

use clap::Parser;
use ime_engine::{EngineConfig, MonitorEvent, MonitorHandle};
use tokio::{runtime::Builder, signal, sync::broadcast::error::RecvError};
use tracing::{debug, error, info, warn};

use crate::{cli::Cli, error::Result};

fn main() {
    if let Err(err) = run() {
        error!("{err}");
        eprintln!("error: {err}");
        process::exit(1);
    }
}

/// Parse CLI arguments, install logging, and watch until Ctrl-C.
fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log);
    let cfg = settings::resolve(&cli)?;
    let rt = Builder::new_current_thread().enable_all().build()?;
    rt.block_on(watch(cfg, cli.cursor))
}

/// Start the monitor with the real OS backends.
#[cfg(windows)]
fn start(cfg: EngineConfig) -> Result<MonitorHandle> {
    use std::sync::Arc;

    use ime_engine::{Monitor, RealHookApi};
    use win_ime::RealImeOps;

    Ok(Monitor::start(
        Arc::new(RealImeOps),
        Arc::new(RealHookApi::new()),
        cfg,
    )?)
}

/// IME detection needs Win32.
#[cfg(not(windows))]
fn start(_cfg: EngineConfig) -> Result<MonitorHandle> {
    use ime_engine::Error;

    Err(Error::Msg("imewatch only runs on Windows".into()).into())
}

/// Log monitor events until Ctrl-C.
async fn watch(cfg: EngineConfig, cursor: bool) -> Result<()> {
    let monitor = start(cfg)?;
    let mut events = monitor.subscribe();
    info!("watching; press Ctrl-C to stop");
    loop {
        tokio::select! {
            r = signal::ctrl_c() => {
                if let Err(e) = r {
                    warn!(error = %e, "ctrl_c_listener_failed");
                }
                break;
            }
            ev = events.recv() => match ev {
                Ok(MonitorEvent::StateChanged(state)) => {
                    info!(language = %state.language, on = state.is_on, "ime_state");
                }
                Ok(MonitorEvent::CursorMoved { x, y }) => {
                    if cursor {
                        debug!(x, y, "cursor");
                    }
                }
                Err(RecvError::Lagged(n)) => debug!(skipped = n, "events_lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }
    monitor.stop().await;
    Ok(())
}
