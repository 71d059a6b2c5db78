/// TunerCore: single-owner event loop around the tuner engine.
///
/// Runs in-process next to the TUI.  Every input (front-end command, timer
/// expiry, clock tick) arrives as a `CoreEvent` and is processed to
/// completion before the next one, so the engine needs no locks.
///
/// Deferred work is armed as spawned timer tasks that post events back into
/// this loop: the transition window for an animated switch, the scan
/// interval, the playback clock and the narrative signal flicker.  A late
/// transition event is harmless; the engine drops stale generations.
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use tuner_core::config::Config;
use tuner_core::media::MediaBackend;
use tuner_core::protocol::{Broadcast, Command};
use tuner_core::TunerEngine;

const CLOCK_TICK: Duration = Duration::from_millis(250);

// ── CoreEvent ─────────────────────────────────────────────────────────────────

/// All inputs into the TunerCore loop.
#[derive(Debug)]
pub enum CoreEvent {
    /// A command from the TUI.
    ClientCommand(Command),
    /// The transition window for `generation` closed.
    TransitionElapsed { generation: u64 },
    /// One scan interval elapsed.
    ScanTick,
    /// Playback clock: positions and end-of-media.
    ClockTick,
    /// Narrative signal meter may flicker.
    SignalTick,
    /// Shutdown requested.
    Shutdown,
}

// ── TunerCore ─────────────────────────────────────────────────────────────────

pub struct TunerCore<B: MediaBackend> {
    engine: TunerEngine<B>,
    event_tx: mpsc::Sender<CoreEvent>,
    broadcast_tx: broadcast::Sender<Broadcast>,
    /// Handle for the scan ticker task while scanning.
    scan_task: Option<tokio::task::AbortHandle>,
    scan_interval: Duration,
    signal_interval: Duration,
    /// Last revision published (to avoid redundant broadcasts).
    last_rev: Option<u64>,
}

impl<B: MediaBackend> TunerCore<B> {
    pub fn new(
        engine: TunerEngine<B>,
        config: &Config,
        broadcast_tx: broadcast::Sender<Broadcast>,
        event_tx: mpsc::Sender<CoreEvent>,
    ) -> Self {
        Self {
            engine,
            event_tx,
            broadcast_tx,
            scan_task: None,
            scan_interval: config.transition.scan_interval(),
            signal_interval: config.transition.signal_interval(),
            last_rev: None,
        }
    }

    /// Run the core event loop.  Returns when a `Shutdown` event is received
    /// or the event channel is closed (TUI exited).
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<CoreEvent>) -> anyhow::Result<()> {
        info!("TunerCore: starting event loop");

        spawn_ticker(self.event_tx.clone(), CLOCK_TICK, || CoreEvent::ClockTick);
        spawn_ticker(self.event_tx.clone(), self.signal_interval, || {
            CoreEvent::SignalTick
        });

        self.publish(true);

        loop {
            match event_rx.recv().await {
                None => {
                    info!("TunerCore: event channel closed, shutting down");
                    break;
                }

                Some(CoreEvent::Shutdown) => {
                    info!("TunerCore: shutdown requested");
                    break;
                }

                Some(CoreEvent::ClientCommand(cmd)) => {
                    debug!("TunerCore: command {:?}", cmd);
                    // Failed commands are no-ops; the WARN reaches the UI as a log.
                    if let Err(e) = self.engine.apply(cmd).await {
                        warn!("TunerCore: {}", e);
                    }
                    self.arm_timers();
                    self.publish(true);
                }

                Some(CoreEvent::TransitionElapsed { generation }) => {
                    match self.engine.complete_transition(generation).await {
                        Ok(Some(outcome)) => debug!("transition {} -> {:?}", generation, outcome),
                        Ok(None) => {}
                        Err(e) => warn!("TunerCore: transition {}: {}", generation, e),
                    }
                    self.publish(true);
                }

                Some(CoreEvent::ScanTick) => {
                    if let Err(e) = self.engine.scan_step().await {
                        warn!("TunerCore: scan step: {}", e);
                    }
                    self.arm_timers();
                    self.publish(true);
                }

                Some(CoreEvent::ClockTick) => {
                    let ended = self.engine.poll();
                    // Positions move every tick while anything plays.
                    let moving = self.engine.playing_count() > 0;
                    self.publish(ended || moving);
                }

                Some(CoreEvent::SignalTick) => {
                    if self.engine.signal_tick() {
                        self.publish(false);
                    }
                }
            }
        }

        self.cleanup().await;
        Ok(())
    }

    /// Start timers the last engine operation asked for, and keep the scan
    /// ticker in step with the scanner.
    fn arm_timers(&mut self) {
        if let Some((generation, delay)) = self.engine.take_scheduled() {
            let tx = self.event_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = tx.send(CoreEvent::TransitionElapsed { generation }).await;
            });
        }

        match (self.engine.is_scanning(), self.scan_task.is_some()) {
            (true, false) => {
                let tx = self.event_tx.clone();
                let period = self.scan_interval;
                let task = tokio::spawn(async move {
                    let mut ticker =
                        tokio::time::interval_at(tokio::time::Instant::now() + period, period);
                    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                    loop {
                        ticker.tick().await;
                        if tx.send(CoreEvent::ScanTick).await.is_err() {
                            break;
                        }
                    }
                });
                self.scan_task = Some(task.abort_handle());
                debug!("scan ticker armed ({:?})", period);
            }
            (false, true) => {
                if let Some(task) = self.scan_task.take() {
                    task.abort();
                }
                debug!("scan ticker stopped");
            }
            _ => {}
        }
    }

    /// Broadcast a fresh snapshot.  `force` publishes even when the revision
    /// did not move (clock-driven fields such as play position).
    fn publish(&mut self, force: bool) {
        let snapshot = self.engine.snapshot();
        if !force && self.last_rev == Some(snapshot.rev) {
            return;
        }
        self.last_rev = Some(snapshot.rev);
        let _ = self.broadcast_tx.send(Broadcast::State { data: snapshot });
    }

    async fn cleanup(&mut self) {
        if let Some(task) = self.scan_task.take() {
            task.abort();
        }
        self.engine.stop_all_audio().await;
        info!("TunerCore: stopped");
    }
}

fn spawn_ticker(
    tx: mpsc::Sender<CoreEvent>,
    period: Duration,
    make: impl Fn() -> CoreEvent + Send + 'static,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if tx.send(make()).await.is_err() {
                break;
            }
        }
    });
}
