//! Background persistence of dirty whiteboards.
//!
//! DESIGN
//! ======
//! A single task wakes every second, snapshots every dirty whiteboard under
//! the write lock, clears the dirty flags, then writes outside the lock so
//! slow database writes never block live traffic. A failed write re-marks
//! the group dirty so the next sweep retries it.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::error;
use uuid::Uuid;
use whiteboard::BoardSnapshot;

use crate::services::group;
use crate::state::AppState;

const FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Spawn the persistence task. Runs until the process exits.
pub fn spawn_persistence_task(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(FLUSH_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            flush_all_dirty(&state).await;
        }
    })
}

/// One sweep: flush every dirty whiteboard to Postgres.
pub(crate) async fn flush_all_dirty(state: &AppState) {
    let dirty: Vec<(Uuid, BoardSnapshot)> = {
        let mut groups = state.groups.write().await;
        groups
            .iter_mut()
            .filter(|(_, gs)| gs.dirty)
            .map(|(id, gs)| {
                gs.dirty = false;
                (*id, gs.whiteboard.clone())
            })
            .collect()
    };

    for (group_id, snapshot) in dirty {
        if let Err(e) = group::flush_whiteboard(&state.pool, group_id, &snapshot).await {
            error!(error = %e, %group_id, "whiteboard flush failed; will retry next sweep");
            let mut groups = state.groups.write().await;
            if let Some(gs) = groups.get_mut(&group_id) {
                gs.dirty = true;
            }
        }
    }
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
