use super::*;
use shared::scene::Script;

fn kick() -> Frame {
    Frame {
        duration: 2,
        enabled: false,
        name: Some("kick".into()),
        script: Script::new("d1 bd", "bali"),
        repetitions: 3,
    }
}

fn target(line: usize, insert: usize) -> DropTarget {
    DropTarget {
        line_index: LineId(line),
        insert_index: FrameId(insert),
    }
}

fn dragging(planner: &mut DragPlanner, line: usize, frame: usize) {
    planner.press(
        LineId(line),
        FrameId(frame),
        kick(),
        PointerPosition::new(10.0, 10.0),
    );
    assert!(planner.pointer_moved(PointerPosition::new(40.0, 10.0)));
}

#[test]
fn small_movements_do_not_start_a_drag() {
    let mut planner = DragPlanner::new(5.0);
    planner.press(LineId(0), FrameId(0), kick(), PointerPosition::new(0.0, 0.0));
    assert_eq!(planner.phase(), DragPhase::Pending);
    assert!(!planner.pointer_moved(PointerPosition::new(3.0, 4.0)));
    assert!(planner.state().drag_preview.is_none());

    planner.enter_drop_zone(target(1, 0));
    assert_eq!(planner.state().drop_target, Some(target(1, 0)));

    assert_eq!(
        planner.release(),
        DragOutcome::Cancelled(CancelReason::BelowThreshold)
    );
    assert_eq!(planner.state(), &DragState::idle(5.0));
}

#[test]
fn commit_across_lines_plans_remove_then_add_on_next_beat() {
    let mut planner = DragPlanner::new(5.0);
    dragging(&mut planner, 0, 2);
    assert_eq!(planner.phase(), DragPhase::Dragging);
    planner.enter_drop_zone(target(1, 0));

    let DragOutcome::Committed(planned) = planner.release() else {
        panic!("expected a committed move");
    };
    assert_eq!(
        planned.commands(),
        [
            ClientMessage::RemoveFrame {
                line_id: LineId(0),
                frame_id: FrameId(2),
                timing: ActionTiming::AtNextBeat,
            },
            ClientMessage::AddFrame {
                line_id: LineId(1),
                frame_id: FrameId(0),
                frame: kick(),
                timing: ActionTiming::AtNextBeat,
            },
        ]
    );
    assert_eq!(planner.state(), &DragState::idle(5.0));
}

#[test]
fn moving_later_within_a_line_accounts_for_the_removed_slot() {
    let mut planner = DragPlanner::new(5.0);
    dragging(&mut planner, 0, 1);
    planner.enter_drop_zone(target(0, 4));

    let DragOutcome::Committed(planned) = planner.release() else {
        panic!("expected a committed move");
    };
    assert_eq!(planned.insert_index, FrameId(3));
    assert_eq!(planned.target_line, LineId(0));
}

#[test]
fn dropping_onto_its_own_position_cancels() {
    for insert in [2, 3] {
        let mut planner = DragPlanner::new(5.0);
        dragging(&mut planner, 0, 2);
        planner.enter_drop_zone(target(0, insert));
        assert_eq!(
            planner.release(),
            DragOutcome::Cancelled(CancelReason::SourcePosition)
        );
        assert_eq!(planner.state(), &DragState::idle(5.0));
    }
}

#[test]
fn stale_leave_does_not_clear_newer_target() {
    let mut planner = DragPlanner::new(5.0);
    dragging(&mut planner, 0, 0);

    planner.enter_drop_zone(target(1, 0));
    planner.enter_drop_zone(target(2, 1));
    planner.leave_drop_zone(target(1, 0));
    assert_eq!(planner.state().drop_target, Some(target(2, 1)));

    planner.leave_drop_zone(target(2, 1));
    assert_eq!(planner.state().drop_target, None);
    assert_eq!(
        planner.release(),
        DragOutcome::Cancelled(CancelReason::NoDropTarget)
    );
}

#[test]
fn abort_resets_every_field() {
    let mut planner = DragPlanner::new(8.0);
    dragging(&mut planner, 3, 1);
    planner.enter_drop_zone(target(0, 0));
    assert!(planner.state().drag_preview.is_some());

    assert_eq!(planner.cancel(), DragOutcome::Cancelled(CancelReason::Aborted));
    assert_eq!(planner.state(), &DragState::idle(8.0));
    assert_eq!(planner.phase(), DragPhase::Idle);
}

#[test]
fn preview_follows_the_pointer() {
    let mut planner = DragPlanner::new(5.0);
    dragging(&mut planner, 0, 0);
    planner.pointer_moved(PointerPosition::new(90.0, 12.0));
    let preview = planner.state().drag_preview.clone().expect("preview");
    assert_eq!(preview.position, PointerPosition::new(90.0, 12.0));
    assert_eq!(preview.label.as_deref(), Some("kick"));
    assert_eq!(preview.duration, 2);
}

#[test]
fn release_without_press_is_a_noop() {
    let mut planner = DragPlanner::default();
    assert!(!planner.pointer_moved(PointerPosition::new(100.0, 100.0)));
    assert_eq!(
        planner.release(),
        DragOutcome::Cancelled(CancelReason::NothingPressed)
    );
    assert_eq!(planner.state(), &DragState::default());
}

#[test]
fn zone_entered_before_threshold_is_kept_once_dragging() {
    let mut planner = DragPlanner::new(5.0);
    planner.press(LineId(0), FrameId(0), kick(), PointerPosition::new(0.0, 0.0));
    planner.enter_drop_zone(target(1, 0));
    assert!(planner.pointer_moved(PointerPosition::new(40.0, 0.0)));

    let DragOutcome::Committed(planned) = planner.release() else {
        panic!("expected a committed move");
    };
    assert_eq!(planned.target_line, LineId(1));
    assert_eq!(planned.insert_index, FrameId(0));
}

#[test]
fn zone_entered_without_a_press_is_ignored() {
    let mut planner = DragPlanner::default();
    planner.enter_drop_zone(target(1, 0));
    assert_eq!(planner.state(), &DragState::default());
}
