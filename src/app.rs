//! Application state for the terminal dashboard.
//!
//! [`App`] holds a copy of the latest [`StoreView`] plus purely local UI
//! state (which bucket has focus, scroll position, the status line).  It
//! never talks to the scheduler directly: a refresh request is recorded as
//! a flag that the main loop forwards.

use ratatui::widgets::ListState;

use crate::poll::{CycleEvent, TriggerOrigin};
use crate::source::Bucket;
use crate::store::{CycleState, StoreView};

pub struct App {
    /// Latest state published by the scheduler.
    pub view: StoreView,
    /// Bucket whose list receives scroll keys.
    pub focus: Bucket,
    /// Selection within the focused bucket.
    pub list_state: ListState,
    /// Whether the user has requested to quit.
    pub quit: bool,
    /// Last cycle status message.
    pub status: String,
    refresh_requested: bool,
}

impl App {
    pub fn new(view: StoreView) -> Self {
        Self {
            view,
            focus: Bucket::GitHub,
            list_state: ListState::default(),
            quit: false,
            status: "Starting…".into(),
            refresh_requested: false,
        }
    }

    /// Swap in a newer view, clamping the selection to the new list length.
    pub fn apply_view(&mut self, view: StoreView) {
        self.view = view;
        let len = self.focused_len();
        match self.list_state.selected() {
            Some(_) if len == 0 => self.list_state.select(None),
            Some(i) if i >= len => self.list_state.select(Some(len - 1)),
            _ => {}
        }
    }

    pub fn apply_event(&mut self, event: &CycleEvent) {
        self.status = match event {
            CycleEvent::Started { origin: TriggerOrigin::Manual, .. } => "Refreshing (manual)…".into(),
            CycleEvent::Started { .. } => "Refreshing…".into(),
            CycleEvent::Succeeded { items, .. } => format!("Fetched {items} items"),
            CycleEvent::Failed { message, .. } => format!("Error: {message}"),
        };
    }

    // -- refresh -------------------------------------------------------------

    pub fn request_refresh(&mut self) {
        if self.view.cycle != CycleState::InFlight {
            self.refresh_requested = true;
        }
    }

    /// Take the pending refresh request, if any.
    pub fn take_refresh_request(&mut self) -> bool {
        std::mem::take(&mut self.refresh_requested)
    }

    // -- focus ---------------------------------------------------------------

    /// Buckets that currently get a panel.  Unclassified only appears when
    /// it has items.
    pub fn visible_buckets(&self) -> Vec<Bucket> {
        let has_unclassified = self
            .view
            .snapshot
            .as_ref()
            .is_some_and(|s| s.bucket_len(Bucket::Unclassified) > 0);
        Bucket::ALL
            .into_iter()
            .filter(|&b| b != Bucket::Unclassified || has_unclassified)
            .collect()
    }

    pub fn focus_next(&mut self) {
        self.shift_focus(1);
    }

    pub fn focus_previous(&mut self) {
        let n = self.visible_buckets().len();
        self.shift_focus(n.saturating_sub(1));
    }

    fn shift_focus(&mut self, by: usize) {
        let visible = self.visible_buckets();
        let current = visible.iter().position(|&b| b == self.focus).unwrap_or(0);
        self.focus = visible[(current + by) % visible.len()];
        self.list_state.select(None);
    }

    fn focused_len(&self) -> usize {
        self.view
            .snapshot
            .as_ref()
            .map_or(0, |s| s.displayed_len(self.focus))
    }

    // -- navigation ----------------------------------------------------------

    pub fn select_next(&mut self) {
        let len = self.focused_len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(len - 1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_previous(&mut self) {
        if self.focused_len() == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_first(&mut self) {
        if self.focused_len() > 0 {
            self.list_state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        let len = self.focused_len();
        if len > 0 {
            self.list_state.select(Some(len - 1));
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use serde_json::{json, Value};

    use super::*;
    use crate::normalize::{Normalizer, RefreshSnapshot};
    use crate::source::{ServiceStatus, TrendingPayload};
    use crate::store::RefreshStore;

    pub(crate) fn snapshot(topics: Vec<Value>) -> RefreshSnapshot {
        let payload = TrendingPayload {
            trending_topics: topics,
            ..TrendingPayload::default()
        };
        Normalizer::new(8, 6).snapshot(ServiceStatus::default(), payload)
    }

    pub(crate) fn view_with(snapshot: RefreshSnapshot) -> StoreView {
        let mut view = RefreshStore::new().view();
        view.snapshot = Some(Arc::new(snapshot));
        view.cycle = CycleState::Succeeded;
        view.last_updated = Some(Utc::now());
        view
    }

    fn three_repos() -> StoreView {
        view_with(snapshot(vec![
            json!({ "id": 1, "platform": "github", "stars": 100 }),
            json!({ "id": 2, "platform": "github", "stars": 50 }),
            json!({ "id": 3, "platform": "github", "stars": 10 }),
            json!({ "id": 4, "platform": "reddit", "score": 40 }),
        ]))
    }

    // -- construction --------------------------------------------------------

    #[test]
    fn new_app_starts_empty() {
        let app = App::new(RefreshStore::new().view());
        assert!(app.view.snapshot.is_none());
        assert!(!app.quit);
        assert_eq!(app.focus, Bucket::GitHub);
        assert!(app.list_state.selected().is_none());
    }

    // -- events --------------------------------------------------------------

    #[test]
    fn events_update_status_line() {
        let mut app = App::new(RefreshStore::new().view());
        app.apply_event(&CycleEvent::Succeeded { cycle: 1, items: 5 });
        assert_eq!(app.status, "Fetched 5 items");
        app.apply_event(&CycleEvent::Failed { cycle: 2, message: "down".into() });
        assert_eq!(app.status, "Error: down");
    }

    // -- refresh -------------------------------------------------------------

    #[test]
    fn refresh_request_is_taken_once() {
        let mut app = App::new(three_repos());
        app.request_refresh();
        assert!(app.take_refresh_request());
        assert!(!app.take_refresh_request());
    }

    #[test]
    fn refresh_request_ignored_while_in_flight() {
        let mut view = three_repos();
        view.cycle = CycleState::InFlight;
        let mut app = App::new(view);
        app.request_refresh();
        assert!(!app.take_refresh_request());
    }

    // -- focus ---------------------------------------------------------------

    #[test]
    fn unclassified_panel_hidden_when_empty() {
        let app = App::new(three_repos());
        assert!(!app.visible_buckets().contains(&Bucket::Unclassified));

        let app = App::new(view_with(snapshot(vec![json!({ "id": "?" })])));
        assert!(app.visible_buckets().contains(&Bucket::Unclassified));
    }

    #[test]
    fn focus_cycles_through_visible_buckets() {
        let mut app = App::new(three_repos());
        app.focus_next();
        assert_eq!(app.focus, Bucket::Reddit);
        app.focus_previous();
        app.focus_previous();
        assert_eq!(app.focus, Bucket::StackOverflow);
        app.focus_next();
        assert_eq!(app.focus, Bucket::GitHub);
    }

    #[test]
    fn focus_change_resets_selection() {
        let mut app = App::new(three_repos());
        app.select_last();
        app.focus_next();
        assert!(app.list_state.selected().is_none());
    }

    // -- navigation ----------------------------------------------------------

    #[test]
    fn select_next_on_empty_is_noop() {
        let mut app = App::new(RefreshStore::new().view());
        app.select_next();
        app.select_previous();
        app.select_first();
        app.select_last();
        assert!(app.list_state.selected().is_none());
    }

    #[test]
    fn select_next_starts_at_zero_then_clamps() {
        let mut app = App::new(three_repos());
        app.select_next();
        assert_eq!(app.list_state.selected(), Some(0));
        app.select_next();
        app.select_next();
        app.select_next();
        assert_eq!(app.list_state.selected(), Some(2));
    }

    #[test]
    fn select_previous_clamps_at_zero() {
        let mut app = App::new(three_repos());
        app.select_last();
        app.select_previous();
        assert_eq!(app.list_state.selected(), Some(1));
        app.select_first();
        app.select_previous();
        assert_eq!(app.list_state.selected(), Some(0));
    }

    #[test]
    fn apply_view_clamps_selection_to_shorter_list() {
        let mut app = App::new(three_repos());
        app.select_last();
        app.apply_view(view_with(snapshot(vec![
            json!({ "platform": "github" }),
        ])));
        assert_eq!(app.list_state.selected(), Some(0));

        app.apply_view(RefreshStore::new().view());
        assert!(app.list_state.selected().is_none());
    }
}
