//! The reconciliation loop.
//!
//! A single task owns the [`Engine`] and multiplexes the interval tick, hook
//! signals, handle commands and the delayed post-switch layout re-read.
//! Snapshots leave through a broadcast channel; nothing else observes the
//! detection state.

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
    time::Duration,
};

use parking_lot::Mutex;
use tokio::{
    runtime::{Handle, RuntimeFlavor},
    sync::{broadcast, mpsc, oneshot},
    task::{self, JoinHandle},
    time::{self, Instant, Interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use win_hook::HookSignal;
use win_ime::{ImeOps, WindowId};

use crate::{Engine, EngineConfig, HookApi, LanguageInfo, Result, engine::SignalEffect};

/// Broadcast buffer; slow subscribers lag rather than block the loop.
const EVENT_BUFFER: usize = 256;

/// Published by the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorEvent {
    /// The published IME state changed, or a forced pass re-published it.
    StateChanged(LanguageInfo),
    /// Cursor position sampled on a tick.
    CursorMoved {
        /// Screen x.
        x: i32,
        /// Screen y.
        y: i32,
    },
}

/// Requests from handles to the loop.
enum Command {
    /// New tick period in milliseconds.
    SetPollingInterval(u64),
    /// New pixel verification period in milliseconds.
    SetPixelVerificationInterval(u64),
    /// Drop per-window and indicator caches.
    ClearWindowCache,
    /// Report the last published snapshot.
    CurrentState {
        /// Reply channel.
        respond: oneshot::Sender<LanguageInfo>,
    },
}

/// Loop task and the hook feeding it.
struct Running {
    /// Loop task.
    task: JoinHandle<()>,
    /// Signal source.
    hook: Arc<dyn HookApi>,
}

/// Cheap, clonable handle to a running monitor.
#[derive(Clone)]
pub struct MonitorHandle {
    /// Command queue into the loop.
    tx: mpsc::UnboundedSender<Command>,
    /// Event stream source.
    events: broadcast::Sender<MonitorEvent>,
    /// Stops the loop.
    cancel: CancellationToken,
    /// Present until stopped.
    running: Arc<Mutex<Option<Running>>>,
}

impl MonitorHandle {
    /// Subscribe to state and cursor events.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    /// Re-arm the tick period; values below 1 ms are raised to 1 ms.
    pub fn set_polling_interval(&self, ms: u64) {
        let _ = self.tx.send(Command::SetPollingInterval(ms));
    }

    /// Change the periodic pixel verification period; 0 disables it.
    pub fn set_pixel_verification_interval(&self, ms: u64) {
        let _ = self.tx.send(Command::SetPixelVerificationInterval(ms));
    }

    /// Forget per-window state and cached indicator reads.
    pub fn clear_window_cache(&self) {
        let _ = self.tx.send(Command::ClearWindowCache);
    }

    /// Last published snapshot; the default state once stopped.
    pub async fn current_state(&self) -> LanguageInfo {
        let (tx, rx) = oneshot::channel();
        let _ = self.tx.send(Command::CurrentState { respond: tx });
        rx.await.unwrap_or_default()
    }

    /// True until `stop` has run.
    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Stop the loop and remove the hook. Idempotent.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let Some(running) = self.running.lock().take() else {
            return;
        };
        running.hook.stop();
        if let Err(e) = running.task.await {
            warn!(error = %e, "monitor_task_join_failed");
        }
        info!("monitor_stopped");
    }
}

/// Monitor constructor.
pub struct Monitor;

impl Monitor {
    /// Install the hook and spawn the loop. Must run inside a tokio runtime.
    ///
    /// Each detection pass makes synchronous OS calls. On a multi-thread
    /// runtime they run under `block_in_place`; on a current-thread runtime
    /// they stall other tasks on that thread for the length of the pass.
    pub fn start(
        ops: Arc<dyn ImeOps>,
        hook: Arc<dyn HookApi>,
        config: EngineConfig,
    ) -> Result<MonitorHandle> {
        let (sig_tx, sig_rx) = mpsc::channel(config.signal_queue.max(1));
        hook.start(sig_tx)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let (evt_tx, _evt_rx) = broadcast::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();
        info!(
            poll_ms = config.polling_interval_ms,
            pixel_ms = config.pixel_verification_interval_ms,
            "monitor_start"
        );

        let actor = Actor {
            engine: Engine::new(ops, config),
            events: evt_tx.clone(),
            reread: None,
        };
        let task = tokio::spawn(actor.run(sig_rx, rx, cancel.clone()));

        Ok(MonitorHandle {
            tx,
            events: evt_tx,
            cancel,
            running: Arc::new(Mutex::new(Some(Running { task, hook }))),
        })
    }
}

/// Interval that skips missed ticks instead of bursting.
fn ticker(period: Duration) -> Interval {
    let mut tick = time::interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tick
}

/// Loop state.
struct Actor {
    /// Detection engine.
    engine: Engine,
    /// Event stream.
    events: broadcast::Sender<MonitorEvent>,
    /// Pending post-switch layout re-read.
    reread: Option<(Instant, WindowId)>,
}

impl Actor {
    async fn run(
        mut self,
        mut signals: mpsc::Receiver<HookSignal>,
        mut commands: mpsc::UnboundedReceiver<Command>,
        cancel: CancellationToken,
    ) {
        let mut tick = ticker(self.engine.config().polling_interval());
        loop {
            let reread_at = self.reread.map(|(at, _)| at);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.command(cmd, &mut tick),
                    None => break,
                },
                Some(sig) = signals.recv() => {
                    let mut force = self.signal(sig);
                    while let Ok(sig) = signals.try_recv() {
                        force |= self.signal(sig);
                    }
                    if force {
                        self.pass(true);
                    }
                }
                _ = time::sleep_until(reread_at.unwrap_or_else(Instant::now)), if reread_at.is_some() => {
                    if let Some((_, window)) = self.reread.take() {
                        self.engine.reread_layout(window);
                        self.pass(true);
                    }
                }
                _ = tick.tick() => {
                    self.pass(false);
                    if let Some((x, y)) = self.engine.cursor_pos() {
                        let _ = self.events.send(MonitorEvent::CursorMoved { x, y });
                    }
                }
            }
        }
        debug!("monitor_loop_exit");
    }

    /// Apply one signal; true when a forced pass is due now.
    fn signal(&mut self, sig: HookSignal) -> bool {
        trace!(?sig, "hook_signal");
        match self.engine.apply_signal(sig) {
            SignalEffect::None => false,
            SignalEffect::Recheck => true,
            SignalEffect::RereadLayout(window) => {
                let at = Instant::now() + self.engine.config().layout_reread_delay();
                self.reread = Some((at, window));
                false
            }
        }
    }

    fn command(&mut self, cmd: Command, tick: &mut Interval) {
        match cmd {
            Command::SetPollingInterval(ms) => {
                self.engine.set_polling_interval(ms);
                *tick = ticker(self.engine.config().polling_interval());
                debug!(ms = self.engine.config().polling_interval_ms, "polling_interval_set");
            }
            Command::SetPixelVerificationInterval(ms) => {
                self.engine.set_pixel_verification_interval(ms);
                debug!(ms, "pixel_verification_interval_set");
            }
            Command::ClearWindowCache => {
                self.engine.clear_window_cache();
                debug!("window_cache_cleared");
            }
            Command::CurrentState { respond } => {
                let _ = respond.send(self.engine.current());
            }
        }
    }

    /// One guarded pass; failures leave the published state untouched.
    fn pass(&mut self, force: bool) {
        let now = Instant::now().into_std();
        let mut check = || catch_unwind(AssertUnwindSafe(|| self.engine.check(force, now)));
        let multi_thread = Handle::try_current()
            .is_ok_and(|h| h.runtime_flavor() == RuntimeFlavor::MultiThread);
        let outcome = if multi_thread {
            task::block_in_place(check)
        } else {
            check()
        };
        match outcome {
            Ok(Ok(Some(info))) => {
                let _ = self.events.send(MonitorEvent::StateChanged(info));
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => warn!(error = %e, "ime_check_failed"),
            Err(_) => warn!("ime_check_panicked"),
        }
    }
}
