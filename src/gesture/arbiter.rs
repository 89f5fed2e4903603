//! # Navigation/Refresh Arbiter
//!
//! Keeps page navigation and pull-to-refresh from running at the same time
//! and drives the pull affordance.
//!
//! Time is passed in as milliseconds from the host's clock. Refresh
//! completion arrives through a `RefreshTicket`; nothing here awaits.

use super::config::GestureConfig;
use super::recognizer::GestureIntent;
use crate::observability::{Event, Logger};

/// Host page or view container
pub trait NavigationTarget {
    fn on_next(&mut self);
    fn on_prev(&mut self);
}

/// Handle for one in-flight refresh. Settle it exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct RefreshTicket {
    id: u64,
}

impl RefreshTicket {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// What happened to a settled refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// Failure absorbed; the user can pull again
    Failed,
    /// Arrived after unmount, or for a refresh that is no longer current
    Discarded,
}

#[derive(Debug, Clone)]
pub struct NavigationArbiter {
    threshold_px: f64,
    hide_delay_ms: u64,
    overlay_open: bool,
    pull_distance: f64,
    refreshing: Option<u64>,
    next_ticket: u64,
    affordance_visible: bool,
    hide_at_ms: Option<u64>,
    mounted: bool,
}

impl NavigationArbiter {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            threshold_px: config.refresh_threshold_px,
            hide_delay_ms: config.affordance_hide_delay_ms,
            overlay_open: false,
            pull_distance: 0.0,
            refreshing: None,
            next_ticket: 1,
            affordance_visible: false,
            hide_at_ms: None,
            mounted: true,
        }
    }

    pub fn set_overlay_open(&mut self, open: bool) {
        self.overlay_open = open;
    }

    pub fn is_overlay_open(&self) -> bool {
        self.overlay_open
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.is_some()
    }

    pub fn pull_distance(&self) -> f64 {
        self.pull_distance
    }

    pub fn is_threshold_reached(&self) -> bool {
        self.pull_distance >= self.threshold_px
    }

    /// Held true while a pull or a refresh owns the vertical gesture.
    /// Passed to the recognizer at session start.
    pub fn is_ptr_active(&self) -> bool {
        self.is_refreshing() || self.pull_distance > 0.0
    }

    pub fn is_affordance_visible(&self) -> bool {
        self.affordance_visible
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Fire `intent` on `target` unless an overlay or refresh owns the view
    /// right now. Returns whether it fired.
    pub fn on_navigate_intent(&mut self, intent: GestureIntent, target: &mut dyn NavigationTarget) -> bool {
        if !self.mounted || self.overlay_open || self.is_refreshing() {
            Logger::trace(
                Event::NavigationSuppressed.as_str(),
                &[
                    ("overlay_open", bool_str(self.overlay_open)),
                    ("refreshing", bool_str(self.is_refreshing())),
                ],
            );
            return false;
        }

        match intent {
            GestureIntent::NavigateNext => target.on_next(),
            GestureIntent::NavigatePrevious => target.on_prev(),
        }
        true
    }

    /// Track the pull. Only downward drags at scroll-top count; anything
    /// else resets the pull to 0.
    pub fn update_pull(&mut self, scroll_top: f64, dy: f64, now_ms: u64) {
        let distance = if scroll_top <= 0.0 && dy > 0.0 { dy } else { 0.0 };
        self.set_pull(distance, now_ms);
    }

    fn set_pull(&mut self, distance: f64, now_ms: u64) {
        let was_pulling = self.pull_distance > 0.0;
        self.pull_distance = distance;

        if distance > 0.0 {
            self.affordance_visible = true;
            self.hide_at_ms = None;
        } else if was_pulling {
            self.hide_at_ms = Some(now_ms + self.hide_delay_ms);
        }
    }

    /// Pointer released. Starts a refresh when the threshold is reached and
    /// none is running.
    pub fn release_pull(&mut self, now_ms: u64) -> Option<RefreshTicket> {
        let armed = self.is_threshold_reached() && self.refreshing.is_none() && self.mounted;
        self.set_pull(0.0, now_ms);

        if !armed {
            return None;
        }

        let id = self.next_ticket;
        self.next_ticket += 1;
        self.refreshing = Some(id);
        self.affordance_visible = true;
        Logger::trace(Event::RefreshStarted.as_str(), &[("ticket", &id.to_string())]);
        Some(RefreshTicket { id })
    }

    /// Apply the result of a refresh. Both success and failure clear the
    /// refreshing flag; nothing is retried.
    pub fn settle_refresh(
        &mut self,
        ticket: RefreshTicket,
        result: Result<(), String>,
        now_ms: u64,
    ) -> RefreshOutcome {
        let id = ticket.id.to_string();
        if !self.mounted || self.refreshing != Some(ticket.id) {
            Logger::trace(Event::RefreshDiscarded.as_str(), &[("ticket", &id)]);
            return RefreshOutcome::Discarded;
        }

        self.refreshing = None;
        if let Some(deadline) = self.hide_at_ms {
            if now_ms >= deadline {
                self.hide_affordance();
            }
        }

        match result {
            Ok(()) => RefreshOutcome::Applied,
            Err(reason) => {
                Logger::warn(
                    Event::RefreshFailed.as_str(),
                    &[("ticket", &id), ("reason", &reason)],
                );
                RefreshOutcome::Failed
            }
        }
    }

    /// Advance the affordance timer
    pub fn tick(&mut self, now_ms: u64) {
        if self.is_refreshing() {
            return;
        }
        if let Some(deadline) = self.hide_at_ms {
            if now_ms >= deadline {
                self.hide_affordance();
            }
        }
    }

    fn hide_affordance(&mut self) {
        self.affordance_visible = false;
        self.hide_at_ms = None;
    }

    /// The view is gone; later refresh results are dropped
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.hide_at_ms = None;
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
