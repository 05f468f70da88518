//! Group service — create/list/join-by-code, live membership, and fan-out.
//!
//! DESIGN
//! ======
//! Groups are created with a six-character join code shared out of band.
//! Joining by code adds a membership row; joining *live* (over the websocket)
//! hydrates the group's whiteboard from Postgres on the first connected
//! client and keeps it in memory while any client remains.
//!
//! ERROR HANDLING
//! ==============
//! On last-client part, a dirty whiteboard is flushed before eviction. If the
//! flush fails, the group is intentionally kept in memory with its dirty flag
//! intact so the persistence worker can retry instead of losing strokes.

use rand::Rng;
use sqlx::{PgPool, Row};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;
use whiteboard::BoardSnapshot;

use crate::frame::Frame;
use crate::state::{AppState, ConnectedClient, GroupState};

const CODE_LEN: usize = 6;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    #[error("group not found: {0}")]
    NotFound(Uuid),
    #[error("no group found with this code")]
    CodeNotFound,
    #[error("already a member of this group")]
    AlreadyMember,
    #[error("not a member of this group")]
    NotMember,
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl crate::frame::ErrorCode for GroupError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_GROUP_NOT_FOUND",
            Self::CodeNotFound => "E_CODE_NOT_FOUND",
            Self::AlreadyMember => "E_ALREADY_MEMBER",
            Self::NotMember => "E_NOT_MEMBER",
            Self::Serialize(_) => "E_SERIALIZE",
            Self::Database(_) => "E_DATABASE",
        }
    }
}

/// Row returned from group queries.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GroupRow {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub creator_id: Option<Uuid>,
}

/// Listing entry with the member count shown on the dashboard.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GroupSummary {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub member_count: i64,
}

// =============================================================================
// JOIN CODES
// =============================================================================

/// Generate a six-character join code from an unambiguous alphabet.
#[must_use]
pub fn generate_join_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..CODE_ALPHABET.len());
            CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Normalize a user-entered join code. `None` if it cannot be a valid code.
#[must_use]
pub fn normalize_join_code(code: &str) -> Option<String> {
    let normalized = code.trim().to_ascii_uppercase();
    if normalized.len() != CODE_LEN
        || !normalized
            .chars()
            .all(|c| CODE_ALPHABET.contains(&(c as u8)))
    {
        return None;
    }
    Some(normalized)
}

// =============================================================================
// CRUD
// =============================================================================

/// Create a new group. The creator becomes its first member.
///
/// # Errors
///
/// Returns a database error if the inserts fail.
pub async fn create_group(pool: &PgPool, name: &str, creator_id: Uuid) -> Result<GroupRow, GroupError> {
    let id = Uuid::new_v4();
    let code = generate_join_code();

    let mut tx = pool.begin().await?;
    sqlx::query("INSERT INTO groups (id, name, code, creator_id) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(name)
        .bind(&code)
        .bind(creator_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("INSERT INTO group_members (group_id, user_id) VALUES ($1, $2)")
        .bind(id)
        .bind(creator_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(group_id = %id, %code, "group created");
    Ok(GroupRow { id, name: name.to_string(), code, creator_id: Some(creator_id) })
}

/// List all groups with member counts (the dashboard shows every group).
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_groups(pool: &PgPool) -> Result<Vec<GroupSummary>, GroupError> {
    let rows = sqlx::query_as::<_, (Uuid, String, String, i64)>(
        "SELECT g.id, g.name, g.code, COUNT(m.user_id) AS member_count
         FROM groups g
         LEFT JOIN group_members m ON m.group_id = g.id
         GROUP BY g.id
         ORDER BY g.created_at DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, name, code, member_count)| GroupSummary { id, name, code, member_count })
        .collect())
}

/// List the groups a user is enrolled in (shown on the profile page).
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_groups_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<GroupSummary>, GroupError> {
    let rows = sqlx::query_as::<_, (Uuid, String, String, i64)>(
        "SELECT g.id, g.name, g.code, COUNT(all_m.user_id) AS member_count
         FROM groups g
         JOIN group_members m ON m.group_id = g.id AND m.user_id = $1
         LEFT JOIN group_members all_m ON all_m.group_id = g.id
         GROUP BY g.id
         ORDER BY g.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, name, code, member_count)| GroupSummary { id, name, code, member_count })
        .collect())
}

/// Join a group by its shared code.
///
/// # Errors
///
/// `CodeNotFound` if the code is malformed or matches no group;
/// `AlreadyMember` if the user already belongs to the group.
pub async fn join_by_code(pool: &PgPool, code: &str, user_id: Uuid) -> Result<GroupRow, GroupError> {
    let code = normalize_join_code(code).ok_or(GroupError::CodeNotFound)?;

    let row = sqlx::query("SELECT id, name, code, creator_id FROM groups WHERE code = $1")
        .bind(&code)
        .fetch_optional(pool)
        .await?
        .ok_or(GroupError::CodeNotFound)?;
    let group = GroupRow {
        id: row.get("id"),
        name: row.get("name"),
        code: row.get("code"),
        creator_id: row.get("creator_id"),
    };

    let inserted = sqlx::query(
        "INSERT INTO group_members (group_id, user_id) VALUES ($1, $2)
         ON CONFLICT (group_id, user_id) DO NOTHING",
    )
    .bind(group.id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if inserted.rows_affected() == 0 {
        return Err(GroupError::AlreadyMember);
    }

    info!(group_id = %group.id, %user_id, "user joined group by code");
    Ok(group)
}

/// Whether the user is enrolled in the group.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn is_member(pool: &PgPool, group_id: Uuid, user_id: Uuid) -> Result<bool, GroupError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM group_members WHERE group_id = $1 AND user_id = $2)",
    )
    .bind(group_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

// =============================================================================
// LIVE JOIN / PART
// =============================================================================

/// Join a group live. Hydrates the whiteboard from Postgres if this is the
/// first connected client. Returns the current whiteboard snapshot.
///
/// # Errors
///
/// `NotMember` if the user is not enrolled; database errors from hydration.
pub async fn join_group(
    state: &AppState,
    group_id: Uuid,
    user: &ConnectedClient,
    client_id: Uuid,
    tx: mpsc::Sender<Frame>,
) -> Result<BoardSnapshot, GroupError> {
    if !is_member(&state.pool, group_id, user.user_id).await? {
        return Err(GroupError::NotMember);
    }

    // Fetch the document outside locks; adopted only when the live state has
    // nothing newer.
    let hydration_snapshot = hydrate_whiteboard(&state.pool, group_id).await?;

    let mut groups = state.groups.write().await;
    let group_state = groups.entry(group_id).or_insert_with(GroupState::new);

    if adopt_hydration(group_state, hydration_snapshot) {
        info!(%group_id, strokes = group_state.whiteboard.lines.len(), "hydrated whiteboard from database");
    }

    group_state.clients.insert(client_id, tx);
    group_state.users.insert(client_id, user.clone());
    let snapshot = group_state.whiteboard.clone();

    info!(%group_id, %client_id, clients = group_state.clients.len(), "client joined group");
    Ok(snapshot)
}

/// Adopt a freshly fetched document into the live state.
///
/// Skipped when other clients are connected (their in-memory copy is
/// authoritative) or when the group holds unflushed edits: a board retained
/// after a failed final flush, or one mid-flush in `part_group`, is newer
/// than anything the fetch could have read.
fn adopt_hydration(group_state: &mut GroupState, snapshot: BoardSnapshot) -> bool {
    if !group_state.clients.is_empty() || group_state.dirty {
        return false;
    }
    group_state.whiteboard = snapshot;
    true
}

/// Leave a group. Removes the client sender. If last client, flushes a dirty
/// whiteboard and evicts the group state from memory.
pub async fn part_group(state: &AppState, group_id: Uuid, client_id: Uuid) {
    let mut groups = state.groups.write().await;
    let Some(group_state) = groups.get_mut(&group_id) else {
        return;
    };

    group_state.clients.remove(&client_id);
    group_state.users.remove(&client_id);
    info!(%group_id, %client_id, remaining = group_state.clients.len(), "client left group");

    if !group_state.clients.is_empty() {
        return;
    }

    if !group_state.dirty {
        groups.remove(&group_id);
        info!(%group_id, "evicted group from memory");
        return;
    }

    // Snapshot the document, release the lock, then write. The dirty flag is
    // cleared only when the write succeeded and no newer edit landed.
    let flushed = group_state.whiteboard.clone();
    drop(groups);
    let flush_result = flush_whiteboard(&state.pool, group_id, &flushed).await;

    let mut groups = state.groups.write().await;
    let Some(gs) = groups.get_mut(&group_id) else {
        return;
    };
    if !gs.clients.is_empty() {
        return;
    }

    match flush_result {
        Ok(()) => {
            if gs.whiteboard == flushed {
                groups.remove(&group_id);
                info!(%group_id, "evicted group from memory");
            } else {
                tracing::warn!(%group_id, "retaining group after final flush because a newer whiteboard edit exists");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, %group_id, "final flush failed; group retained for retry");
        }
    }
}

// =============================================================================
// BROADCAST
// =============================================================================

/// Broadcast a frame to all clients in a group, optionally excluding one.
pub async fn broadcast(state: &AppState, group_id: Uuid, frame: &Frame, exclude: Option<Uuid>) {
    let groups = state.groups.read().await;
    let Some(group_state) = groups.get(&group_id) else {
        return;
    };

    for (client_id, tx) in &group_state.clients {
        if exclude == Some(*client_id) {
            continue;
        }
        // Best-effort: if a client's channel is full, skip it.
        let _ = tx.try_send(frame.clone());
    }
}

// =============================================================================
// WHITEBOARD DOCUMENT I/O
// =============================================================================

/// Load a group's whiteboard document. A missing row is an empty board.
async fn hydrate_whiteboard(pool: &PgPool, group_id: Uuid) -> Result<BoardSnapshot, GroupError> {
    let row = sqlx::query("SELECT lines FROM whiteboards WHERE group_id = $1")
        .bind(group_id)
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Ok(BoardSnapshot::default());
    };

    let value: serde_json::Value = row.get("lines");
    let lines = serde_json::from_value(value).unwrap_or_else(|e| {
        tracing::warn!(error = %e, %group_id, "malformed stored whiteboard; treating as empty");
        Vec::new()
    });
    Ok(BoardSnapshot { lines })
}

/// Overwrite a group's whiteboard document in Postgres.
///
/// # Errors
///
/// Returns a serialization or database error if the upsert fails.
pub async fn flush_whiteboard(pool: &PgPool, group_id: Uuid, snapshot: &BoardSnapshot) -> Result<(), GroupError> {
    let lines = serde_json::to_value(&snapshot.lines)?;
    sqlx::query(
        "INSERT INTO whiteboards (group_id, lines, updated_at) VALUES ($1, $2, now())
         ON CONFLICT (group_id) DO UPDATE SET lines = EXCLUDED.lines, updated_at = now()",
    )
    .bind(group_id)
    .bind(lines)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
#[path = "group_test.rs"]
mod tests;
