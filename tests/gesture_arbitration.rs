//! Gesture Arbitration Tests
//!
//! Drives the recognizer and the arbiter through full pointer sequences:
//! - Axis commitment never changes within a session
//! - Busy flags at pointer-down suppress navigation for the whole session
//! - Pull-to-refresh threshold is inclusive
//! - Late refresh results after unmount are dropped

use petport::gesture::{
    Axis, GestureConfig, GestureController, GestureIntent, GestureRecognizer, NavigationArbiter,
    NavigationTarget, Point, PointerEvent, RefreshOutcome, ScrollPolicy, SessionContext,
};

// =============================================================================
// Helper Functions
// =============================================================================

#[derive(Debug, Default)]
struct Pager {
    next: usize,
    prev: usize,
}

impl NavigationTarget for Pager {
    fn on_next(&mut self) {
        self.next += 1;
    }

    fn on_prev(&mut self) {
        self.prev += 1;
    }
}

fn down(id: u32, x: f64, y: f64) -> PointerEvent {
    PointerEvent::Down {
        pointer_id: id,
        point: Point::new(x, y, 0),
    }
}

fn mv(id: u32, x: f64, y: f64, t_ms: u64) -> PointerEvent {
    PointerEvent::Move {
        pointer_id: id,
        point: Point::new(x, y, t_ms),
    }
}

fn up(id: u32, x: f64, y: f64, t_ms: u64) -> PointerEvent {
    PointerEvent::Up {
        pointer_id: id,
        point: Point::new(x, y, t_ms),
    }
}

fn controller() -> GestureController<Pager> {
    GestureController::new(&GestureConfig::default(), Pager::default()).unwrap()
}

/// Leftward swipe from (200, 300): total dx = -80, dy = 10
fn swipe_left(c: &mut GestureController<Pager>) {
    c.handle_pointer(down(1, 200.0, 300.0));
    c.handle_pointer(mv(1, 160.0, 305.0, 16));
    c.handle_pointer(mv(1, 120.0, 310.0, 32));
    c.handle_pointer(up(1, 120.0, 310.0, 48));
}

// =============================================================================
// Swipe Classification
// =============================================================================

#[test]
fn test_shallow_swipe_commits_horizontal_and_navigates_next() {
    let mut recognizer = GestureRecognizer::new(&GestureConfig::default());
    let context = SessionContext::idle();

    recognizer.handle(down(1, 200.0, 300.0), &context);
    let out = recognizer.handle(mv(1, 120.0, 310.0, 16), &context);

    assert_eq!(recognizer.axis(), Some(Axis::Horizontal));
    assert_eq!(out.scroll, ScrollPolicy::Block);

    let out = recognizer.handle(up(1, 120.0, 310.0, 32), &context);
    assert_eq!(out.intent, Some(GestureIntent::NavigateNext));
    assert!(recognizer.is_idle());
}

#[test]
fn test_rightward_swipe_navigates_previous() {
    let mut c = controller();

    c.handle_pointer(down(1, 100.0, 300.0));
    c.handle_pointer(mv(1, 180.0, 290.0, 16));
    c.handle_pointer(up(1, 180.0, 290.0, 32));

    assert_eq!(c.target().prev, 1);
    assert_eq!(c.target().next, 0);
}

#[test]
fn test_steep_drag_is_vertical_and_scrolls() {
    let mut c = controller();

    c.handle_pointer(down(1, 100.0, 300.0));
    let policy = c.handle_pointer(mv(1, 120.0, 200.0, 16));
    c.handle_pointer(up(1, 40.0, 200.0, 32));

    assert_eq!(policy, ScrollPolicy::Allow);
    assert_eq!(c.target().next + c.target().prev, 0);
}

/// Once committed, no later move changes the axis.
#[test]
fn test_axis_commitment_is_monotonic() {
    let paths: [&[(f64, f64)]; 4] = [
        &[(-60.0, 5.0), (-60.0, 200.0), (0.0, 400.0), (10.0, -300.0)],
        &[(5.0, 70.0), (300.0, 70.0), (-400.0, 0.0), (-500.0, 1.0)],
        &[(-20.0, 20.0), (-57.0, 0.0), (0.0, 0.0), (3.0, 500.0)],
        &[(30.0, 30.0), (40.0, 40.0), (400.0, 41.0), (-400.0, 40.0)],
    ];

    for path in paths {
        let mut recognizer = GestureRecognizer::new(&GestureConfig::default());
        let context = SessionContext::idle();
        recognizer.handle(down(1, 0.0, 0.0), &context);

        let mut committed: Option<Axis> = None;
        for (i, (x, y)) in path.iter().enumerate() {
            recognizer.handle(mv(1, *x, *y, i as u64 * 16), &context);
            let axis = recognizer.axis().unwrap();

            match committed {
                Some(first) => assert_eq!(axis, first, "axis changed along {:?}", path),
                None if axis.is_committed() => committed = Some(axis),
                None => {}
            }
        }
        assert!(committed.is_some(), "path never committed: {:?}", path);
    }
}

// =============================================================================
// Mutual Exclusion
// =============================================================================

#[test]
fn test_overlay_open_at_start_emits_no_intent() {
    let mut c = controller();
    c.set_overlay_open(true);

    swipe_left(&mut c);

    assert_eq!(c.target().next, 0);
    assert_eq!(c.recognizer().axis(), None);
}

#[test]
fn test_overlay_closing_mid_session_still_rejects() {
    let mut c = controller();
    c.set_overlay_open(true);

    c.handle_pointer(down(1, 200.0, 300.0));
    c.set_overlay_open(false);
    c.handle_pointer(mv(1, 120.0, 310.0, 16));
    c.handle_pointer(up(1, 120.0, 310.0, 32));

    assert_eq!(c.target().next, 0);
}

#[test]
fn test_ptr_active_at_start_emits_no_intent_for_any_motion() {
    let motions = [(-80.0, 10.0), (80.0, -10.0), (-300.0, 0.0), (0.0, 300.0)];

    for (dx, dy) in motions {
        let mut recognizer = GestureRecognizer::new(&GestureConfig::default());
        let context = SessionContext {
            ptr_active: true,
            ..SessionContext::idle()
        };

        recognizer.handle(down(1, 200.0, 300.0), &context);
        recognizer.handle(mv(1, 200.0 + dx, 300.0 + dy, 16), &context);
        let out = recognizer.handle(up(1, 200.0 + dx, 300.0 + dy, 32), &context);

        assert_eq!(out.intent, None);
    }
}

#[test]
fn test_pull_in_progress_blocks_swipe() {
    let mut c = controller();
    c.update_pull(0.0, 30.0, 0);
    assert!(c.arbiter().is_ptr_active());

    swipe_left(&mut c);

    assert_eq!(c.target().next, 0);
}

#[test]
fn test_refresh_in_flight_suppresses_committed_intent() {
    let mut c = controller();

    c.handle_pointer(down(1, 200.0, 300.0));
    c.handle_pointer(mv(1, 120.0, 310.0, 16));

    c.update_pull(0.0, 90.0, 20);
    let ticket = c.release_pull(24);
    assert!(ticket.is_some());

    c.handle_pointer(up(1, 120.0, 310.0, 32));
    assert_eq!(c.target().next, 0);
}

#[test]
fn test_second_pointer_aborts_session() {
    let mut c = controller();

    c.handle_pointer(down(1, 200.0, 300.0));
    c.handle_pointer(mv(1, 160.0, 305.0, 16));
    c.handle_pointer(down(2, 50.0, 50.0));
    c.handle_pointer(mv(1, 120.0, 310.0, 32));
    c.handle_pointer(up(1, 120.0, 310.0, 48));

    assert!(c.recognizer().is_idle());
    assert_eq!(c.target().next, 0);
}

#[test]
fn test_cancel_discards_uncommitted_session() {
    let mut c = controller();

    c.handle_pointer(down(1, 200.0, 300.0));
    c.handle_pointer(mv(1, 190.0, 300.0, 16));
    c.handle_pointer(PointerEvent::Cancel { pointer_id: 1 });
    c.handle_pointer(up(1, 100.0, 300.0, 32));

    assert!(c.recognizer().is_idle());
    assert_eq!(c.target().next, 0);
}

// =============================================================================
// Pull To Refresh
// =============================================================================

#[test]
fn test_threshold_boundary_is_inclusive() {
    let config = GestureConfig::default();
    let mut arbiter = NavigationArbiter::new(&config);

    arbiter.update_pull(0.0, config.refresh_threshold_px, 0);
    assert!(arbiter.is_threshold_reached());

    arbiter.update_pull(0.0, config.refresh_threshold_px - 1.0, 0);
    assert!(!arbiter.is_threshold_reached());
}

#[test]
fn test_pull_below_scroll_top_does_not_count() {
    let mut arbiter = NavigationArbiter::new(&GestureConfig::default());

    arbiter.update_pull(12.0, 120.0, 0);

    assert_eq!(arbiter.pull_distance(), 0.0);
    assert!(!arbiter.is_ptr_active());
}

#[test]
fn test_release_below_threshold_starts_nothing() {
    let mut arbiter = NavigationArbiter::new(&GestureConfig::default());

    arbiter.update_pull(0.0, 40.0, 0);
    assert!(arbiter.release_pull(10).is_none());
    assert!(!arbiter.is_refreshing());
}

#[test]
fn test_failed_refresh_clears_flag_without_retry() {
    let mut arbiter = NavigationArbiter::new(&GestureConfig::default());

    arbiter.update_pull(0.0, 100.0, 0);
    let ticket = arbiter.release_pull(10).unwrap();

    let outcome = arbiter.settle_refresh(ticket, Err("offline".into()), 500);

    assert_eq!(outcome, RefreshOutcome::Failed);
    assert!(!arbiter.is_refreshing());
    assert!(!arbiter.is_ptr_active());
}

#[test]
fn test_late_refresh_after_unmount_is_discarded() {
    let mut c = controller();

    c.update_pull(0.0, 100.0, 0);
    let ticket = c.release_pull(10).unwrap();
    c.unmount();

    let outcome = c.settle_refresh(ticket, Ok(()), 2_000);
    assert_eq!(outcome, RefreshOutcome::Discarded);
}

#[test]
fn test_affordance_hides_after_delay() {
    let config = GestureConfig::default();
    let mut arbiter = NavigationArbiter::new(&config);

    arbiter.update_pull(0.0, 30.0, 0);
    arbiter.update_pull(0.0, 0.0, 100);
    assert!(arbiter.is_affordance_visible());

    arbiter.tick(100 + config.affordance_hide_delay_ms - 1);
    assert!(arbiter.is_affordance_visible());

    arbiter.tick(100 + config.affordance_hide_delay_ms);
    assert!(!arbiter.is_affordance_visible());
}

#[test]
fn test_navigation_resumes_after_refresh_settles() {
    let mut c = controller();

    c.update_pull(0.0, 100.0, 0);
    let ticket = c.release_pull(10).unwrap();
    assert_eq!(c.settle_refresh(ticket, Ok(()), 400), RefreshOutcome::Applied);

    swipe_left(&mut c);
    assert_eq!(c.target().next, 1);
}
