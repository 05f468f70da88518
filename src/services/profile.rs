//! Profile stats — daily streaks and accumulated study time.
//!
//! DESIGN
//! ======
//! The streak rule is calendar based: a visit on the same day keeps the
//! streak, a visit the day after the last one extends it by one, and any
//! longer gap (or a first visit) resets it to one. Study time accumulates
//! in whole seconds from client heartbeats.

use sqlx::{PgPool, Row};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Heartbeats shorter than this are ignored as noise.
const MIN_RECORDED_SECS: i64 = 5;
/// Cap a single heartbeat at one day to bound clock-skew damage.
const MAX_RECORDED_SECS: i64 = 86_400;

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("user not found: {0}")]
    UserNotFound(Uuid),
    #[error("duration out of range")]
    InvalidDuration,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Stats shown on the profile page.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProfileStats {
    pub time_spent_secs: i64,
    pub streak: i32,
    pub last_active_on: Option<Date>,
}

// =============================================================================
// STREAK RULE
// =============================================================================

/// Compute the streak value for a visit on `today`.
#[must_use]
pub fn next_streak(current: i32, last_active: Option<Date>, today: Date) -> i32 {
    let Some(last) = last_active else {
        return 1;
    };
    match (today - last).whole_days() {
        0 => current,
        1 => current + 1,
        _ => 1,
    }
}

fn today_utc() -> Date {
    OffsetDateTime::now_utc().date()
}

// =============================================================================
// DATABASE OPERATIONS
// =============================================================================

/// Apply the streak rule for a visit today and persist the result.
///
/// # Errors
///
/// `UserNotFound` if the user row is missing; database errors otherwise.
pub async fn touch_streak(pool: &PgPool, user_id: Uuid) -> Result<i32, ProfileError> {
    let today = today_utc();

    let row = sqlx::query("SELECT streak, last_active_on FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ProfileError::UserNotFound(user_id))?;
    let current: i32 = row.get("streak");
    let last_active: Option<Date> = row.get("last_active_on");

    let streak = next_streak(current, last_active, today);
    sqlx::query("UPDATE users SET streak = $2, last_active_on = $3 WHERE id = $1")
        .bind(user_id)
        .bind(streak)
        .bind(today)
        .execute(pool)
        .await?;

    Ok(streak)
}

/// Record a study-time heartbeat, returning the new total.
///
/// # Errors
///
/// `InvalidDuration` for out-of-range heartbeats; `UserNotFound` if the user
/// row is missing; database errors otherwise.
pub async fn record_time(pool: &PgPool, user_id: Uuid, seconds: i64) -> Result<i64, ProfileError> {
    if !(MIN_RECORDED_SECS..=MAX_RECORDED_SECS).contains(&seconds) {
        return Err(ProfileError::InvalidDuration);
    }

    let row = sqlx::query(
        "UPDATE users SET time_spent_secs = time_spent_secs + $2, last_active_on = $3
         WHERE id = $1
         RETURNING time_spent_secs",
    )
    .bind(user_id)
    .bind(seconds)
    .bind(today_utc())
    .fetch_optional(pool)
    .await?
    .ok_or(ProfileError::UserNotFound(user_id))?;

    Ok(row.get("time_spent_secs"))
}

/// Load a user's profile stats.
///
/// # Errors
///
/// `UserNotFound` if the user row is missing; database errors otherwise.
pub async fn load_stats(pool: &PgPool, user_id: Uuid) -> Result<ProfileStats, ProfileError> {
    let row = sqlx::query("SELECT time_spent_secs, streak, last_active_on FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ProfileError::UserNotFound(user_id))?;

    Ok(ProfileStats {
        time_spent_secs: row.get("time_spent_secs"),
        streak: row.get("streak"),
        last_active_on: row.get("last_active_on"),
    })
}

#[cfg(test)]
#[path = "profile_test.rs"]
mod tests;
