//! The refresh state the UI reads.
//!
//! [`RefreshStore`] wraps a [`watch`] channel holding one [`StoreView`].
//! The scheduler is the only writer; every update replaces the view in a
//! single `send_modify`, and snapshots are shared behind [`Arc`] and never
//! mutated, so a reader can never see items from one cycle next to
//! aggregates from another.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::normalize::RefreshSnapshot;

/// Where the scheduler is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// No cycle has run yet.
    Idle,
    InFlight,
    Succeeded,
    Failed,
}

/// Everything the display needs, as of one moment.
#[derive(Debug, Clone)]
pub struct StoreView {
    /// Latest successful snapshot; kept across failed cycles.
    pub snapshot: Option<Arc<RefreshSnapshot>>,
    pub cycle: CycleState,
    /// Set only while `cycle` is [`CycleState::Failed`].
    pub error: Option<String>,
    /// Local time the current snapshot was fetched.
    pub last_updated: Option<DateTime<Utc>>,
    /// When the next automatic cycle fires; `None` while a cycle runs.
    pub next_refresh_at: Option<Instant>,
}

impl StoreView {
    fn initial() -> Self {
        Self {
            snapshot: None,
            cycle: CycleState::Idle,
            error: None,
            last_updated: None,
            next_refresh_at: None,
        }
    }
}

/// Single-writer, many-reader holder of the latest [`StoreView`].
#[derive(Debug)]
pub struct RefreshStore {
    tx: watch::Sender<StoreView>,
}

impl Default for RefreshStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(StoreView::initial());
        Self { tx }
    }

    /// A receiver that is notified on every update.
    pub fn subscribe(&self) -> watch::Receiver<StoreView> {
        self.tx.subscribe()
    }

    /// A copy of the current view.
    pub fn view(&self) -> StoreView {
        self.tx.borrow().clone()
    }

    pub fn cycle_state(&self) -> CycleState {
        self.tx.borrow().cycle
    }

    /// Mark a cycle in flight.  Returns `false` (and changes nothing) if one
    /// already is.
    pub(crate) fn begin_cycle(&self) -> bool {
        self.tx.send_if_modified(|view| {
            if view.cycle == CycleState::InFlight {
                return false;
            }
            view.cycle = CycleState::InFlight;
            view.error = None;
            view.next_refresh_at = None;
            true
        })
    }

    /// Replace the snapshot wholesale.
    pub(crate) fn complete_success(&self, snapshot: RefreshSnapshot, fetched_at: DateTime<Utc>) {
        let snapshot = Arc::new(snapshot);
        self.tx.send_modify(|view| {
            view.snapshot = Some(snapshot);
            view.cycle = CycleState::Succeeded;
            view.error = None;
            view.last_updated = Some(fetched_at);
        });
    }

    /// Record a failed cycle.  The previous snapshot stays visible.
    pub(crate) fn complete_failure(&self, message: impl Into<String>) {
        let message = message.into();
        self.tx.send_modify(|view| {
            view.cycle = CycleState::Failed;
            view.error = Some(message);
        });
    }

    pub(crate) fn set_next_refresh(&self, at: Instant) {
        self.tx.send_modify(|view| view.next_refresh_at = Some(at));
    }
}
