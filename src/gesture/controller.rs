//! # Gesture Controller
//!
//! Wires a recognizer to an arbiter for one view. The busy flags are read
//! from the arbiter when a session starts and checked again when an intent
//! commits.

use super::arbiter::{NavigationArbiter, NavigationTarget, RefreshOutcome, RefreshTicket};
use super::config::GestureConfig;
use super::errors::GestureResult;
use super::recognizer::{GestureRecognizer, PointerEvent, ScrollPolicy, SessionContext};

pub struct GestureController<T: NavigationTarget> {
    recognizer: GestureRecognizer,
    arbiter: NavigationArbiter,
    target: T,
    enabled: bool,
}

impl<T: NavigationTarget> GestureController<T> {
    pub fn new(config: &GestureConfig, target: T) -> GestureResult<Self> {
        config.validate()?;
        Ok(Self {
            recognizer: GestureRecognizer::new(config),
            arbiter: NavigationArbiter::new(config),
            target,
            enabled: true,
        })
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_overlay_open(&mut self, open: bool) {
        self.arbiter.set_overlay_open(open);
    }

    /// Flags a new session would start with
    pub fn session_context(&self) -> SessionContext {
        SessionContext {
            enabled: self.enabled,
            overlay_open: self.arbiter.is_overlay_open(),
            ptr_active: self.arbiter.is_ptr_active(),
        }
    }

    /// Feed a pointer event; the returned policy tells the host whether to
    /// run its native scroll
    pub fn handle_pointer(&mut self, event: PointerEvent) -> ScrollPolicy {
        let context = self.session_context();
        let output = self.recognizer.handle(event, &context);
        if let Some(intent) = output.intent {
            self.arbiter.on_navigate_intent(intent, &mut self.target);
        }
        output.scroll
    }

    pub fn update_pull(&mut self, scroll_top: f64, dy: f64, now_ms: u64) {
        self.arbiter.update_pull(scroll_top, dy, now_ms);
    }

    pub fn release_pull(&mut self, now_ms: u64) -> Option<RefreshTicket> {
        self.arbiter.release_pull(now_ms)
    }

    pub fn settle_refresh(
        &mut self,
        ticket: RefreshTicket,
        result: Result<(), String>,
        now_ms: u64,
    ) -> RefreshOutcome {
        self.arbiter.settle_refresh(ticket, result, now_ms)
    }

    pub fn tick(&mut self, now_ms: u64) {
        self.arbiter.tick(now_ms);
    }

    pub fn unmount(&mut self) {
        self.arbiter.unmount();
    }

    pub fn recognizer(&self) -> &GestureRecognizer {
        &self.recognizer
    }

    pub fn arbiter(&self) -> &NavigationArbiter {
        &self.arbiter
    }

    pub fn target(&self) -> &T {
        &self.target
    }
}
