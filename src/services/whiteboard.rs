//! Whiteboard document updates for live groups.
//!
//! DESIGN
//! ======
//! Every update replaces the in-memory document wholesale (last write wins)
//! and marks the group dirty for the persistence worker. The caller gets the
//! stored snapshot back so it can be echoed to every client, including the
//! sender, which keeps all replicas converged on the server's copy.

use uuid::Uuid;
use whiteboard::BoardSnapshot;

use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum WhiteboardError {
    #[error("group not loaded: {0}")]
    GroupNotLoaded(Uuid),
}

impl crate::frame::ErrorCode for WhiteboardError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::GroupNotLoaded(_) => "E_GROUP_NOT_LOADED",
        }
    }
}

/// Replace a live group's whiteboard document. Returns the stored snapshot
/// for echo fan-out.
///
/// # Errors
///
/// `GroupNotLoaded` if no client has the group open.
pub async fn update_lines(
    state: &AppState,
    group_id: Uuid,
    snapshot: BoardSnapshot,
) -> Result<BoardSnapshot, WhiteboardError> {
    let mut groups = state.groups.write().await;
    let group_state = groups
        .get_mut(&group_id)
        .ok_or(WhiteboardError::GroupNotLoaded(group_id))?;

    group_state.whiteboard = snapshot;
    group_state.dirty = true;
    Ok(group_state.whiteboard.clone())
}

/// Clear a live group's whiteboard. Returns the (empty) stored snapshot.
///
/// # Errors
///
/// `GroupNotLoaded` if no client has the group open.
pub async fn clear(state: &AppState, group_id: Uuid) -> Result<BoardSnapshot, WhiteboardError> {
    update_lines(state, group_id, BoardSnapshot::default()).await
}

/// Current in-memory snapshot, if the group is live.
pub async fn snapshot(state: &AppState, group_id: Uuid) -> Option<BoardSnapshot> {
    let groups = state.groups.read().await;
    groups.get(&group_id).map(|gs| gs.whiteboard.clone())
}

#[cfg(test)]
#[path = "whiteboard_test.rs"]
mod tests;
