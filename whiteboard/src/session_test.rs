use super::*;

use crate::model::Stroke;

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn session() -> DrawingSession {
    DrawingSession::new(Tool::Pen, "#ffffff")
}

// =============================================================================
// STATE MACHINE
// =============================================================================

#[test]
fn down_move_up_produces_one_stroke_with_exact_points() {
    let mut model = BoardModel::new();
    let mut session = session();

    session.pointer_down(&mut model, pt(1.0, 1.0));
    assert_eq!(session.state(), SessionState::Drawing);
    session.pointer_move(&mut model, pt(2.0, 2.0));
    session.pointer_move(&mut model, pt(3.0, 3.0));
    let event = session.pointer_up(&mut model);

    assert_eq!(event, SessionEvent::GestureEnded);
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(model.lines().len(), 1);
    assert_eq!(model.lines()[0].points, vec![pt(1.0, 1.0), pt(2.0, 2.0), pt(3.0, 3.0)]);
}

#[test]
fn pointer_leave_closes_the_stroke_like_pointer_up() {
    let mut model = BoardModel::new();
    let mut session = session();

    session.pointer_down(&mut model, pt(4.0, 4.0));
    session.pointer_move(&mut model, pt(5.0, 5.0));
    session.pointer_move(&mut model, pt(6.0, 6.0));
    let event = session.pointer_leave(&mut model);

    assert_eq!(event, SessionEvent::GestureEnded);
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(model.lines().len(), 1);
    assert_eq!(model.lines()[0].points.len(), 3);

    // A subsequent down starts a new stroke, not an extension of the old one.
    session.pointer_down(&mut model, pt(7.0, 7.0));
    assert_eq!(model.lines().len(), 2);
    assert_eq!(model.lines()[1].points, vec![pt(7.0, 7.0)]);
}

#[test]
fn move_while_idle_draws_nothing() {
    let mut model = BoardModel::new();
    let mut session = session();

    session.pointer_move(&mut model, pt(1.0, 1.0));
    assert!(model.lines().is_empty());
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn up_while_idle_is_not_a_gesture_end() {
    let mut model = BoardModel::new();
    let mut session = session();

    assert_eq!(session.pointer_up(&mut model), SessionEvent::None);
    assert_eq!(session.pointer_leave(&mut model), SessionEvent::None);
}

#[test]
fn stray_down_while_drawing_is_ignored() {
    let mut model = BoardModel::new();
    let mut session = session();

    session.pointer_down(&mut model, pt(1.0, 1.0));
    session.pointer_down(&mut model, pt(9.0, 9.0));

    assert_eq!(model.lines().len(), 1, "no second stroke from a stray down");
    session.pointer_move(&mut model, pt(2.0, 2.0));
    assert_eq!(model.lines()[0].points, vec![pt(1.0, 1.0), pt(2.0, 2.0)]);
}

#[test]
fn up_after_remote_replacement_does_not_request_sync() {
    let mut model = BoardModel::new();
    let mut session = session();

    session.pointer_down(&mut model, pt(1.0, 1.0));
    // Remote update lands mid-stroke; the in-progress gesture is lost.
    model.replace_all(vec![Stroke::new(Tool::Pen, "#abc", pt(5.0, 5.0))]);

    session.pointer_move(&mut model, pt(2.0, 2.0));
    let event = session.pointer_up(&mut model);

    assert_eq!(event, SessionEvent::None, "nothing local left to push");
    assert_eq!(model.lines().len(), 1);
    assert_eq!(model.lines()[0].points, vec![pt(5.0, 5.0)]);
}

// =============================================================================
// TOOL / COLOR SELECTION
// =============================================================================

#[test]
fn tool_and_color_apply_to_the_next_stroke() {
    let mut model = BoardModel::new();
    let mut session = session();

    session.set_tool(Tool::Eraser);
    session.set_color("#123456");
    session.pointer_down(&mut model, pt(0.0, 0.0));
    session.pointer_up(&mut model);

    assert_eq!(model.lines()[0].tool, Tool::Eraser);
    assert_eq!(model.lines()[0].color, "#123456");
}

#[test]
fn selection_changes_mid_gesture_are_ignored() {
    let mut model = BoardModel::new();
    let mut session = session();

    session.pointer_down(&mut model, pt(0.0, 0.0));
    session.set_tool(Tool::Eraser);
    session.set_color("#000000");
    session.pointer_up(&mut model);

    assert_eq!(model.lines()[0].tool, Tool::Pen);
    assert_eq!(model.lines()[0].color, "#ffffff");
    assert_eq!(session.tool(), Tool::Pen);
}
