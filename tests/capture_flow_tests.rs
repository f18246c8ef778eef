mod common;

use common::{count_events, harness, FRAME};
use cubeviz::controller::{CaptureChange, FocusTarget, InputEvent, MotionOutcome, MouseButton};
use cubeviz::view::headless::MoveCall;
use cubeviz::EngineEvent;

#[test]
fn test_first_click_captures_without_firing() {
    let mut h = harness(&["1"]);

    h.click();

    assert!(h.engine.input().is_captured());
    assert_eq!(h.engine.active_probes(), 0);
    assert_eq!(h.engine.drain_events(), vec![EngineEvent::CaptureAcquired]);
}

#[test]
fn test_click_while_captured_fires_probe() {
    let mut h = harness(&["1"]);
    h.click();
    h.engine.drain_events();

    h.click();
    h.engine.handle_event(InputEvent::PointerDown { button: MouseButton::Right });

    assert_eq!(h.engine.active_probes(), 1);
    let events = h.engine.drain_events();
    assert_eq!(count_events(&events, |e| matches!(e, EngineEvent::ProbeSpawned { .. })), 1);
}

#[test]
fn test_denied_capture_is_journaled_and_motion_stays_idle() {
    let mut h = harness(&["1"]);
    h.controls.deny_lock("blocked by user agent");

    h.click();
    assert!(h.engine.request_capture().is_err());
    h.key_down("w");
    let report = h.step();

    assert!(!h.engine.input().is_captured());
    assert_eq!(report.motion, MotionOutcome::Skipped);
    assert!(h.controls.move_calls().is_empty());

    let events = h.engine.drain_events();
    assert_eq!(count_events(&events, |e| matches!(e, EngineEvent::CaptureDenied { .. })), 2);
    assert!(matches!(
        &events[0],
        EngineEvent::CaptureDenied { reason } if reason.contains("blocked by user agent")
    ));
}

#[test]
fn test_forward_key_moves_through_capture_controls() {
    let mut h = harness(&["1"]);
    h.click();
    h.key_down("w");

    let report = h.engine.update(0.1);

    assert!(report.motion.is_moving());
    assert_eq!(h.controls.move_calls(), vec![MoveCall::Forward(0.5)]);
}

#[test]
fn test_escape_releases_capture_and_clears_keys() {
    let mut h = harness(&["1"]);
    h.click();
    h.key_down("w");
    h.key_down("d");
    h.engine.drain_events();

    h.key_down("Escape");

    assert!(!h.engine.input().is_captured());
    assert!(!h.engine.input().any_pressed());
    assert_eq!(h.engine.drain_events(), vec![EngineEvent::CaptureReleased { cleared_keys: 2 }]);
    assert_eq!(h.step().motion, MotionOutcome::Skipped);
}

#[test]
fn test_capture_lost_externally_clears_keys() {
    let mut h = harness(&["1"]);
    h.click();
    h.key_down("a");
    h.engine.drain_events();

    h.engine.handle_event(InputEvent::CaptureChanged { active: false });

    assert!(!h.engine.input().any_pressed());
    assert_eq!(h.engine.drain_events(), vec![EngineEvent::CaptureReleased { cleared_keys: 1 }]);
}

#[test]
fn test_keys_typed_into_text_entry_are_ignored() {
    let mut h = harness(&["1"]);
    h.click();

    h.engine.handle_event(InputEvent::KeyDown { key: "w".into(), focus: FocusTarget::TextEntry });
    let report = h.step();

    assert!(!h.engine.input().any_pressed());
    assert!(!report.motion.is_moving());
    assert!(h.controls.move_calls().is_empty());
}

#[test]
fn test_escape_typed_into_text_entry_keeps_capture() {
    let mut h = harness(&["1"]);
    h.click();
    h.key_down("w");
    h.engine.drain_events();

    h.engine.handle_event(InputEvent::KeyDown { key: "Escape".into(), focus: FocusTarget::TextEntry });

    assert!(h.engine.input().is_captured());
    assert!(h.engine.input().any_pressed());
    assert!(h.engine.drain_events().is_empty());
    assert!(h.step().motion.is_moving());
}

#[test]
fn test_refused_capture_never_reports_a_release() {
    let mut h = harness(&["1"]);
    h.controls.deny_lock("blocked by user agent");
    h.click();
    h.key_down("w");

    h.engine.handle_event(InputEvent::CaptureChanged { active: false });
    h.key_down("Escape");

    assert!(!h.engine.input().any_pressed());
    let events = h.engine.drain_events();
    assert_eq!(count_events(&events, |e| matches!(e, EngineEvent::CaptureReleased { .. })), 0);
    assert_eq!(count_events(&events, |e| matches!(e, EngineEvent::CaptureDenied { .. })), 1);
}

#[test]
fn test_capture_calls_after_dispose_are_inert() {
    let mut h = harness(&["1"]);
    h.click();
    h.engine.dispose();
    h.engine.drain_events();

    h.engine.release_capture();
    assert_eq!(h.engine.on_capture_change(true), CaptureChange::Unchanged);
    assert_eq!(h.engine.on_capture_change(false), CaptureChange::Unchanged);

    assert!(!h.engine.input().is_captured());
    assert!(h.engine.drain_events().is_empty());
}

#[test]
fn test_focus_loss_releases_held_keys() {
    let mut h = harness(&["1"]);
    h.click();
    h.key_down("w");

    h.engine.handle_event(InputEvent::FocusLost);

    assert!(!h.engine.input().any_pressed());
    assert!(h.engine.input().is_captured());
}

#[test]
fn test_pointer_motion_turns_view_only_while_captured() {
    let mut h = harness(&["1"]);
    let initial = h.engine.viewpoint_direction();

    h.engine.handle_event(InputEvent::PointerMove { dx: 200.0, dy: 0.0 });
    h.step();
    assert_eq!(h.engine.viewpoint_direction(), initial);

    h.click();
    h.engine.handle_event(InputEvent::PointerMove { dx: 200.0, dy: 0.0 });
    h.engine.update(FRAME);
    assert!(h.engine.viewpoint_direction().angle_between(initial) > 0.1);
}

#[test]
fn test_walking_ahead_cancels_camera_follow() {
    let mut h = harness(&["1", "2"]);
    h.click();
    h.engine.toggle_selection(&common::id("2"), true);
    assert!(h.step().following);

    h.key_down("w");
    let report = h.step();

    assert!(report.motion.is_moving());
    assert!(!report.following);
}

#[test]
fn test_viewpoint_never_sinks_below_eye_height() {
    let mut h = harness(&["1"]);
    h.click();
    h.key_down("Shift");

    for _ in 0..120 {
        h.step();
    }

    let floor = h.engine.config().min_height;
    assert!(h.engine.viewpoint_position().y >= floor - f32::EPSILON);
}
