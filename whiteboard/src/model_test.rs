use super::*;

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

// =============================================================================
// GESTURE PRIMITIVES
// =============================================================================

#[test]
fn begin_extend_end_records_points_in_order() {
    let mut model = BoardModel::new();
    model
        .begin_stroke(Tool::Pen, "#ffffff", pt(1.0, 2.0))
        .expect("no gesture active");
    model.extend_stroke(pt(3.0, 4.0));
    model.extend_stroke(pt(5.0, 6.0));
    assert!(model.end_stroke());

    assert_eq!(model.lines().len(), 1);
    let stroke = &model.lines()[0];
    assert_eq!(stroke.tool, Tool::Pen);
    assert_eq!(stroke.color, "#ffffff");
    assert_eq!(stroke.points, vec![pt(1.0, 2.0), pt(3.0, 4.0), pt(5.0, 6.0)]);
}

#[test]
fn begin_while_active_errors_and_leaves_state_intact() {
    let mut model = BoardModel::new();
    model
        .begin_stroke(Tool::Pen, "#fff", pt(0.0, 0.0))
        .expect("first begin");

    let err = model.begin_stroke(Tool::Eraser, "#000", pt(9.0, 9.0));
    assert!(matches!(err, Err(ModelError::GestureAlreadyActive)));
    assert_eq!(model.lines().len(), 1);
    assert_eq!(model.lines()[0].points, vec![pt(0.0, 0.0)]);
    assert!(model.is_drawing());
}

#[test]
fn extend_without_active_gesture_is_a_noop() {
    let mut model = BoardModel::new();
    model.extend_stroke(pt(1.0, 1.0));
    assert!(model.lines().is_empty());

    model
        .begin_stroke(Tool::Pen, "#fff", pt(0.0, 0.0))
        .expect("begin");
    model.end_stroke();
    model.extend_stroke(pt(2.0, 2.0));
    assert_eq!(model.lines()[0].points.len(), 1, "closed stroke must not grow");
}

#[test]
fn end_stroke_reports_whether_a_gesture_closed() {
    let mut model = BoardModel::new();
    assert!(!model.end_stroke(), "nothing to close while idle");

    model
        .begin_stroke(Tool::Pen, "#fff", pt(0.0, 0.0))
        .expect("begin");
    assert!(model.end_stroke());
    assert!(!model.end_stroke(), "second end is a no-op");
}

#[test]
fn clear_empties_board_and_aborts_active_gesture() {
    let mut model = BoardModel::new();
    model
        .begin_stroke(Tool::Pen, "#fff", pt(0.0, 0.0))
        .expect("begin");
    model.end_stroke();
    model
        .begin_stroke(Tool::Pen, "#fff", pt(1.0, 1.0))
        .expect("begin second");

    model.clear();
    assert!(model.lines().is_empty());
    assert!(!model.is_drawing());
    assert!(!model.end_stroke(), "cleared gesture must not request a sync");
}

// =============================================================================
// REMOTE REPLACEMENT (LWW)
// =============================================================================

#[test]
fn replace_all_mid_gesture_discards_in_progress_stroke() {
    let mut model = BoardModel::new();
    model
        .begin_stroke(Tool::Pen, "#fff", pt(0.0, 0.0))
        .expect("begin");
    model.extend_stroke(pt(1.0, 1.0));

    let remote = vec![Stroke::new(Tool::Eraser, "#000", pt(7.0, 7.0))];
    model.replace_all(remote.clone());

    assert_eq!(model.lines(), remote.as_slice(), "remote state adopted verbatim");
    assert!(!model.is_drawing());

    // Trailing events from the aborted gesture are harmless.
    model.extend_stroke(pt(2.0, 2.0));
    assert_eq!(model.lines(), remote.as_slice());
}

#[test]
fn replaying_the_same_snapshot_twice_is_idempotent() {
    let mut model = BoardModel::new();
    let remote = vec![
        Stroke::new(Tool::Pen, "#abc", pt(1.0, 1.0)),
        Stroke::new(Tool::Pen, "#def", pt(2.0, 2.0)),
    ];

    model.replace_all(remote.clone());
    let once = model.snapshot();
    model.replace_all(remote);
    assert_eq!(model.snapshot(), once);
}

// =============================================================================
// WIRE FORMAT
// =============================================================================

#[test]
fn snapshot_serializes_under_the_lines_field() {
    let snapshot = BoardSnapshot {
        lines: vec![Stroke::new(Tool::Eraser, "#1e293b", pt(3.0, 4.0))],
    };
    let json = serde_json::to_value(&snapshot).expect("serialize");
    assert_eq!(json["lines"][0]["tool"], "eraser");
    assert_eq!(json["lines"][0]["color"], "#1e293b");
    assert!((json["lines"][0]["points"][0]["x"].as_f64().expect("x") - 3.0).abs() < f64::EPSILON);
}

#[test]
fn snapshot_round_trips() {
    let original = BoardSnapshot {
        lines: vec![
            Stroke::new(Tool::Pen, "#ffffff", pt(0.5, 0.5)),
            Stroke {
                tool: Tool::Eraser,
                color: "#000000".into(),
                points: vec![pt(1.0, 2.0), pt(3.0, 4.0)],
            },
        ],
    };
    let json = serde_json::to_string(&original).expect("serialize");
    let restored: BoardSnapshot = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(restored, original);
}

#[test]
fn missing_document_is_an_empty_board() {
    assert!(BoardSnapshot::default().lines.is_empty());
}
