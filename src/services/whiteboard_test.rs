use super::*;
use crate::state::test_helpers::{dummy_stroke, seed_group, seed_group_with_lines, test_app_state};

#[tokio::test]
async fn update_replaces_the_document_wholesale() {
    let state = test_app_state();
    let group_id = seed_group_with_lines(&state, vec![dummy_stroke(), dummy_stroke()]).await;

    let incoming = BoardSnapshot { lines: vec![dummy_stroke()] };
    let stored = update_lines(&state, group_id, incoming).await.expect("group is live");

    assert_eq!(stored.lines.len(), 1);
    let groups = state.groups.read().await;
    let gs = groups.get(&group_id).expect("live");
    assert_eq!(gs.whiteboard.lines.len(), 1);
    assert!(gs.dirty);
}

#[tokio::test]
async fn clear_stores_an_empty_document_and_marks_dirty() {
    let state = test_app_state();
    let group_id = seed_group_with_lines(&state, vec![dummy_stroke()]).await;

    let stored = clear(&state, group_id).await.expect("group is live");
    assert!(stored.lines.is_empty());

    let groups = state.groups.read().await;
    assert!(groups.get(&group_id).expect("live").dirty);
}

#[tokio::test]
async fn update_on_an_unloaded_group_fails() {
    let state = test_app_state();
    let result = update_lines(&state, Uuid::new_v4(), BoardSnapshot::default()).await;
    assert!(matches!(result, Err(WhiteboardError::GroupNotLoaded(_))));
}

#[tokio::test]
async fn snapshot_reflects_the_live_document() {
    let state = test_app_state();
    let group_id = seed_group(&state).await;

    assert!(snapshot(&state, group_id).await.expect("live").lines.is_empty());
    assert!(snapshot(&state, Uuid::new_v4()).await.is_none());
}
