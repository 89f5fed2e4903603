//! # Gesture Recognizer
//!
//! Classifies one pointer session as a horizontal swipe, a vertical scroll,
//! or nothing.
//!
//! States:
//! - `Idle`
//! - `Tracking` with axis `Unclassified`, `Horizontal` or `Vertical`
//! - `Rejected`
//!
//! Rules:
//! - Rejection is decided once, at pointer-down, and holds for the session
//! - An axis, once committed, is never revisited
//! - Horizontal blocks native scroll; every other state allows it
//! - A second pointer aborts the session with no intent

use super::config::GestureConfig;
use crate::observability::{Event, Logger};

/// Pointer position with a millisecond timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub t_ms: u64,
}

impl Point {
    pub fn new(x: f64, y: f64, t_ms: u64) -> Self {
        Self { x, y, t_ms }
    }
}

/// Raw pointer input from the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { pointer_id: u32, point: Point },
    Move { pointer_id: u32, point: Point },
    Up { pointer_id: u32, point: Point },
    Cancel { pointer_id: u32 },
}

/// Classified axis of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Unclassified,
    Horizontal,
    Vertical,
    Rejected,
}

impl Axis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::Unclassified => "unclassified",
            Axis::Horizontal => "horizontal",
            Axis::Vertical => "vertical",
            Axis::Rejected => "rejected",
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, Axis::Horizontal | Axis::Vertical)
    }
}

/// Navigation intent produced by a completed horizontal swipe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureIntent {
    /// Leftward swipe
    NavigateNext,
    /// Rightward swipe
    NavigatePrevious,
}

/// Whether the host may run its native scroll for this event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollPolicy {
    Allow,
    Block,
}

/// Busy flags sampled at pointer-down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionContext {
    pub enabled: bool,
    pub overlay_open: bool,
    pub ptr_active: bool,
}

impl SessionContext {
    /// Nothing blocks a swipe
    pub fn idle() -> Self {
        Self {
            enabled: true,
            overlay_open: false,
            ptr_active: false,
        }
    }

    pub fn rejects(&self) -> bool {
        !self.enabled || self.overlay_open || self.ptr_active
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::idle()
    }
}

/// One pointer contact, from down to up or cancel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureSession {
    pub pointer_id: u32,
    pub start: Point,
    pub dx: f64,
    pub dy: f64,
    pub axis: Axis,
}

impl GestureSession {
    fn new(pointer_id: u32, start: Point, axis: Axis) -> Self {
        Self {
            pointer_id,
            start,
            dx: 0.0,
            dy: 0.0,
            axis,
        }
    }

    fn track(&mut self, point: Point) {
        self.dx = point.x - self.start.x;
        self.dy = point.y - self.start.y;
    }

    pub fn displacement(&self) -> f64 {
        self.dx.hypot(self.dy)
    }

    /// Angle from horizontal in degrees, 0..=90
    pub fn angle_deg(&self) -> f64 {
        self.dy.abs().atan2(self.dx.abs()).to_degrees()
    }
}

/// What one event produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureOutput {
    pub intent: Option<GestureIntent>,
    pub scroll: ScrollPolicy,
}

impl GestureOutput {
    fn allow() -> Self {
        Self {
            intent: None,
            scroll: ScrollPolicy::Allow,
        }
    }

    fn block() -> Self {
        Self {
            intent: None,
            scroll: ScrollPolicy::Block,
        }
    }

    fn emit(intent: Option<GestureIntent>) -> Self {
        Self {
            intent,
            scroll: ScrollPolicy::Allow,
        }
    }
}

/// Swipe recognizer for a single view
#[derive(Debug, Clone)]
pub struct GestureRecognizer {
    min_delta_px: f64,
    max_angle_deg: f64,
    session: Option<GestureSession>,
}

impl GestureRecognizer {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            min_delta_px: config.min_delta_px,
            max_angle_deg: config.max_angle_deg,
            session: None,
        }
    }

    pub fn state_name(&self) -> &'static str {
        match self.session.map(|s| s.axis) {
            None => "idle",
            Some(Axis::Unclassified) => "tracking_unclassified",
            Some(Axis::Horizontal) => "tracking_horizontal",
            Some(Axis::Vertical) => "tracking_vertical",
            Some(Axis::Rejected) => "rejected",
        }
    }

    pub fn is_idle(&self) -> bool {
        self.session.is_none()
    }

    pub fn session(&self) -> Option<&GestureSession> {
        self.session.as_ref()
    }

    /// Current axis, `None` when idle
    pub fn axis(&self) -> Option<Axis> {
        self.session.map(|s| s.axis)
    }

    /// Feed one event. `context` is only read on pointer-down.
    pub fn handle(&mut self, event: PointerEvent, context: &SessionContext) -> GestureOutput {
        match event {
            PointerEvent::Down { pointer_id, point } => self.on_down(pointer_id, point, context),
            PointerEvent::Move { pointer_id, point } => self.on_move(pointer_id, point),
            PointerEvent::Up { pointer_id, point } => self.on_up(pointer_id, point),
            PointerEvent::Cancel { pointer_id } => {
                if self.owns(pointer_id) {
                    self.session = None;
                }
                GestureOutput::allow()
            }
        }
    }

    fn owns(&self, pointer_id: u32) -> bool {
        self.session.map(|s| s.pointer_id == pointer_id).unwrap_or(false)
    }

    fn on_down(&mut self, pointer_id: u32, point: Point, context: &SessionContext) -> GestureOutput {
        if let Some(active) = self.session.take() {
            let first = active.pointer_id.to_string();
            let second = pointer_id.to_string();
            Logger::trace(
                Event::GestureMultiTouchAbort.as_str(),
                &[("pointer_id", &first), ("second_pointer_id", &second)],
            );
            return GestureOutput::allow();
        }

        let axis = if context.rejects() {
            Axis::Rejected
        } else {
            Axis::Unclassified
        };
        self.session = Some(GestureSession::new(pointer_id, point, axis));
        GestureOutput::allow()
    }

    fn on_move(&mut self, pointer_id: u32, point: Point) -> GestureOutput {
        let (min_delta, max_angle) = (self.min_delta_px, self.max_angle_deg);
        let session = match self.session.as_mut() {
            Some(s) if s.pointer_id == pointer_id => s,
            _ => return GestureOutput::allow(),
        };

        session.track(point);
        if session.axis == Axis::Unclassified && session.displacement() >= min_delta {
            session.axis = if session.angle_deg() <= max_angle {
                Axis::Horizontal
            } else {
                Axis::Vertical
            };
        }

        match session.axis {
            Axis::Horizontal => GestureOutput::block(),
            _ => GestureOutput::allow(),
        }
    }

    fn on_up(&mut self, pointer_id: u32, point: Point) -> GestureOutput {
        if !self.owns(pointer_id) {
            return GestureOutput::allow();
        }
        let mut session = match self.session.take() {
            Some(s) => s,
            None => return GestureOutput::allow(),
        };
        if session.axis != Axis::Horizontal {
            return GestureOutput::allow();
        }

        session.track(point);
        let intent = if session.dx < 0.0 {
            Some(GestureIntent::NavigateNext)
        } else if session.dx > 0.0 {
            Some(GestureIntent::NavigatePrevious)
        } else {
            None
        };
        GestureOutput::emit(intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recognizer() -> GestureRecognizer {
        GestureRecognizer::new(&GestureConfig::default())
    }

    fn down(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Down {
            pointer_id: 1,
            point: Point::new(x, y, 0),
        }
    }

    fn mv(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Move {
            pointer_id: 1,
            point: Point::new(x, y, 16),
        }
    }

    fn up(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Up {
            pointer_id: 1,
            point: Point::new(x, y, 32),
        }
    }

    #[test]
    fn test_below_min_delta_stays_unclassified() {
        let mut r = recognizer();
        let ctx = SessionContext::idle();

        r.handle(down(200.0, 200.0), &ctx);
        let out = r.handle(mv(160.0, 200.0), &ctx);

        assert_eq!(r.state_name(), "tracking_unclassified");
        assert_eq!(out.scroll, ScrollPolicy::Allow);
    }

    #[test]
    fn test_displacement_is_euclidean() {
        let mut r = recognizer();
        let ctx = SessionContext::idle();

        // 45 x 35 is 57 px away but neither leg reaches 56
        r.handle(down(0.0, 0.0), &ctx);
        r.handle(mv(45.0, 35.0), &ctx);

        assert_eq!(r.axis(), Some(Axis::Vertical));
    }

    #[test]
    fn test_exact_angle_limit_is_horizontal() {
        let mut r = recognizer();
        let ctx = SessionContext::idle();
        let rad = 30f64.to_radians();

        r.handle(down(0.0, 0.0), &ctx);
        r.handle(mv(-100.0 * rad.cos(), 100.0 * rad.sin() - 1e-9), &ctx);

        assert_eq!(r.axis(), Some(Axis::Horizontal));
    }

    #[test]
    fn test_horizontal_blocks_scroll_and_emits_on_up() {
        let mut r = recognizer();
        let ctx = SessionContext::idle();

        r.handle(down(200.0, 100.0), &ctx);
        let out = r.handle(mv(120.0, 110.0), &ctx);
        assert_eq!(out.scroll, ScrollPolicy::Block);

        let out = r.handle(up(120.0, 110.0), &ctx);
        assert_eq!(out.intent, Some(GestureIntent::NavigateNext));
        assert!(r.is_idle());
    }

    #[test]
    fn test_rightward_swipe_is_previous() {
        let mut r = recognizer();
        let ctx = SessionContext::idle();

        r.handle(down(0.0, 0.0), &ctx);
        r.handle(mv(90.0, 5.0), &ctx);

        assert_eq!(
            r.handle(up(90.0, 5.0), &ctx).intent,
            Some(GestureIntent::NavigatePrevious)
        );
    }

    #[test]
    fn test_vertical_never_emits() {
        let mut r = recognizer();
        let ctx = SessionContext::idle();

        r.handle(down(0.0, 0.0), &ctx);
        r.handle(mv(5.0, 120.0), &ctx);
        r.handle(mv(-200.0, 125.0), &ctx);

        assert_eq!(r.axis(), Some(Axis::Vertical));
        assert_eq!(r.handle(up(-200.0, 125.0), &ctx).intent, None);
    }

    #[test]
    fn test_rejection_locked_at_start() {
        let mut r = recognizer();
        let busy = SessionContext {
            ptr_active: true,
            ..SessionContext::idle()
        };

        r.handle(down(0.0, 0.0), &busy);
        // Flags clearing mid-session do not matter
        r.handle(mv(-100.0, 0.0), &SessionContext::idle());

        assert_eq!(r.state_name(), "rejected");
        assert_eq!(r.handle(up(-100.0, 0.0), &SessionContext::idle()).intent, None);
    }

    #[test]
    fn test_disabled_rejects() {
        let mut r = recognizer();
        let disabled = SessionContext {
            enabled: false,
            ..SessionContext::idle()
        };

        r.handle(down(0.0, 0.0), &disabled);
        assert_eq!(r.axis(), Some(Axis::Rejected));
    }

    #[test]
    fn test_cancel_discards_session() {
        let mut r = recognizer();
        let ctx = SessionContext::idle();

        r.handle(down(0.0, 0.0), &ctx);
        r.handle(mv(-100.0, 0.0), &ctx);
        r.handle(PointerEvent::Cancel { pointer_id: 1 }, &ctx);

        assert!(r.is_idle());
        assert_eq!(r.handle(up(-100.0, 0.0), &ctx).intent, None);
    }

    #[test]
    fn test_second_pointer_aborts() {
        let mut r = recognizer();
        let ctx = SessionContext::idle();

        r.handle(down(0.0, 0.0), &ctx);
        r.handle(mv(-100.0, 0.0), &ctx);
        r.handle(
            PointerEvent::Down {
                pointer_id: 2,
                point: Point::new(50.0, 50.0, 20),
            },
            &ctx,
        );

        assert!(r.is_idle());
        assert_eq!(r.handle(up(-100.0, 0.0), &ctx).intent, None);
    }
}
