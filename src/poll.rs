//! Background refresh scheduling.
//!
//! One spawned task owns the refresh cadence.  Each cycle requests the
//! service status and the trending payload concurrently, waits for both to
//! settle, and then either publishes a fresh snapshot to the
//! [`RefreshStore`] or records a failure while keeping the old one.
//!
//! ## Timing rules
//!
//! * The interval timer re-arms only after a cycle **completes**, so a
//!   slow service delays the next cycle instead of overlapping it.
//! * A manual refresh while waiting starts a cycle at once; the next
//!   automatic cycle is then a full interval after that one completes.
//! * A manual refresh while a cycle is in flight is dropped, not queued.
//! * The first cycle runs as soon as the task starts.
//!
//! Lifecycle events go out on a [`broadcast`] channel for anyone who
//! wants them (the UI uses them for its status line).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::normalize::Normalizer;
use crate::source::TrendSource;
use crate::store::{CycleState, RefreshStore};

/// Error text shown when a cycle fails.  Per-endpoint detail goes to the log.
pub const CONNECTIVITY_ERROR: &str = "Failed to fetch data from API";

const EVENT_CAPACITY: usize = 64;

/// What started a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOrigin {
    Startup,
    Timer,
    Manual,
}

/// Cycle lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleEvent {
    Started { cycle: u64, origin: TriggerOrigin },
    Succeeded { cycle: u64, items: usize },
    Failed { cycle: u64, message: String },
}

enum Command {
    Refresh,
    Stop,
}

/// Owns the source and the cadence until [`spawn`](Self::spawn)ed.
pub struct PollScheduler<S> {
    source: S,
    normalizer: Normalizer,
    interval: Duration,
    store: Arc<RefreshStore>,
    events: broadcast::Sender<CycleEvent>,
    cycles: u64,
}

impl<S: TrendSource> PollScheduler<S> {
    pub fn new(source: S, normalizer: Normalizer, interval: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            source,
            normalizer,
            interval,
            store: Arc::new(RefreshStore::new()),
            events,
            cycles: 0,
        }
    }

    /// Subscribe before spawning to also see the startup cycle's events.
    pub fn subscribe(&self) -> broadcast::Receiver<CycleEvent> {
        self.events.subscribe()
    }

    /// Start the refresh task on the current tokio runtime.
    pub fn spawn(self) -> SchedulerHandle {
        let (commands, rx) = mpsc::unbounded_channel();
        let store = Arc::clone(&self.store);
        let task = tokio::spawn(self.run(rx));
        SchedulerHandle {
            commands,
            store,
            task,
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut origin = TriggerOrigin::Startup;
        loop {
            if self.guarded_cycle(origin, &mut commands).await {
                break;
            }

            let deadline = Instant::now() + self.interval;
            self.store.set_next_refresh(deadline);

            origin = tokio::select! {
                () = tokio::time::sleep_until(deadline) => TriggerOrigin::Timer,
                cmd = commands.recv() => match cmd {
                    Some(Command::Refresh) => TriggerOrigin::Manual,
                    Some(Command::Stop) | None => break,
                },
            };
        }
        info!(cycles = self.cycles, "refresh scheduler stopped");
    }

    /// Run one cycle while draining commands.  Refresh requests that arrive
    /// mid-cycle are dropped.  Returns `true` if a stop was requested.
    ///
    /// Commands are polled before the cycle so that one queued in the same
    /// wakeup as the cycle's completion is still seen as mid-cycle.
    async fn guarded_cycle(
        &mut self,
        origin: TriggerOrigin,
        commands: &mut mpsc::UnboundedReceiver<Command>,
    ) -> bool {
        let cycle = self.run_cycle(origin);
        tokio::pin!(cycle);

        let mut stop_requested = false;
        loop {
            tokio::select! {
                biased;
                cmd = commands.recv(), if !stop_requested => match cmd {
                    Some(Command::Refresh) => {
                        debug!("manual refresh ignored: cycle already in flight");
                    }
                    Some(Command::Stop) | None => stop_requested = true,
                },
                () = &mut cycle => return stop_requested,
            }
        }
    }

    async fn run_cycle(&mut self, origin: TriggerOrigin) {
        if !self.store.begin_cycle() {
            return;
        }
        self.cycles += 1;
        let cycle = self.cycles;
        let started = Instant::now();
        info!(cycle, ?origin, "refresh cycle started");
        let _ = self.events.send(CycleEvent::Started { cycle, origin });

        let (status, trending) = tokio::join!(
            self.source.fetch_status(),
            self.source.fetch_trending()
        );

        match (status, trending) {
            (Ok(status), Ok(payload)) => {
                let snapshot = self.normalizer.snapshot(status, payload);
                let items = snapshot.items.len();
                self.store.complete_success(snapshot, Utc::now());
                info!(
                    cycle,
                    items,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "refresh cycle succeeded"
                );
                let _ = self.events.send(CycleEvent::Succeeded { cycle, items });
            }
            (status, trending) => {
                for err in [status.err(), trending.err()].into_iter().flatten() {
                    warn!(
                        cycle,
                        endpoint = %err.endpoint(),
                        kind = ?err.kind(),
                        error = %err,
                        "fetch failed"
                    );
                }
                self.store.complete_failure(CONNECTIVITY_ERROR);
                let _ = self.events.send(CycleEvent::Failed {
                    cycle,
                    message: CONNECTIVITY_ERROR.to_string(),
                });
            }
        }
    }
}

/// Control surface of a running scheduler.
///
/// Dropping the handle stops the scheduler after any in-flight cycle.
pub struct SchedulerHandle {
    commands: mpsc::UnboundedSender<Command>,
    store: Arc<RefreshStore>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Ask for an immediate cycle.
    ///
    /// Returns `false`, and sends nothing, while a cycle is in flight or the
    /// startup cycle has not begun yet.  A request accepted just as the timer
    /// fires is absorbed by that timer cycle.
    pub fn refresh_now(&self) -> bool {
        match self.store.cycle_state() {
            CycleState::Idle | CycleState::InFlight => false,
            CycleState::Succeeded | CycleState::Failed => {
                self.commands.send(Command::Refresh).is_ok()
            }
        }
    }

    pub fn store(&self) -> &Arc<RefreshStore> {
        &self.store
    }

    /// Stop polling.  An in-flight cycle is allowed to settle first.
    pub async fn stop(self) {
        let _ = self.commands.send(Command::Stop);
        if let Err(e) = self.task.await {
            warn!(error = %e, "refresh scheduler task ended abnormally");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
