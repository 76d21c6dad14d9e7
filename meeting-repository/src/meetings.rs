//! Meeting table queries.
//!
//! Meetings are stored as a JSONB document (the full `Meeting` struct,
//! mirroring how the teacher's `attendees` column carries a nested JSON
//! blob in `models/meeting_attendee.rs`) next to a handful of queryable
//! top-level columns, plus an optimistic-concurrency `version` counter so
//! `update_atomic` can do a safe read-modify-write without holding a
//! database-level row lock across the caller's closure (spec §4.D
//! `updateAtomic`).

use chrono::Utc;
use meeting_types::{Meeting, MeetingStatus};
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use crate::error::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct MeetingRow {
    document: JsonValue,
    version: i64,
}

fn row_to_meeting(row: MeetingRow) -> Result<(Meeting, i64), RepositoryError> {
    let meeting: Meeting = serde_json::from_value(row.document)?;
    Ok((meeting, row.version))
}

fn status_str(status: MeetingStatus) -> &'static str {
    match status {
        MeetingStatus::Scheduled => "scheduled",
        MeetingStatus::Ongoing => "ongoing",
        MeetingStatus::Ended => "ended",
        MeetingStatus::Cancelled => "cancelled",
    }
}

/// Insert a brand new meeting. Fails with `Duplicate` if `meetingId` collides
/// with an existing row (spec §4.D `insert`: "rejects on duplicate meetingId").
pub async fn insert(pool: &PgPool, meeting: &Meeting) -> Result<(), RepositoryError> {
    let document = serde_json::to_value(meeting)?;
    let result = sqlx::query(
        r#"
        INSERT INTO meetings
            (meeting_id, host_user_id, status, scheduled_for, document, version, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, 1, NOW(), NOW())
        "#,
    )
    .bind(meeting.meeting_id.as_str())
    .bind(&meeting.host_user_id)
    .bind(status_str(meeting.status))
    .bind(meeting.scheduled_for)
    .bind(&document)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(RepositoryError::Duplicate(meeting.meeting_id.as_str().to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn find_by_meeting_id(
    pool: &PgPool,
    meeting_id: &str,
) -> Result<Option<Meeting>, RepositoryError> {
    let row: Option<MeetingRow> =
        sqlx::query_as("SELECT document, version FROM meetings WHERE meeting_id = $1")
            .bind(meeting_id)
            .fetch_optional(pool)
            .await?;
    row.map(row_to_meeting).transpose().map(|o| o.map(|(m, _)| m))
}

pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Meeting>, RepositoryError> {
    let row: Option<MeetingRow> =
        sqlx::query_as("SELECT document, version FROM meetings WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    row.map(row_to_meeting).transpose().map(|o| o.map(|(m, _)| m))
}

/// Paged meetings where the user is host or a participant, newest first,
/// plus the total matching count for pagination (spec §4.D `listForUser`:
/// "selector: host = user OR user ∈ participants").
pub async fn list_for_user(
    pool: &PgPool,
    user_id: &str,
    status: Option<MeetingStatus>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Meeting>, i64), RepositoryError> {
    let status_filter = status.map(status_str);

    let rows: Vec<MeetingRow> = sqlx::query_as(
        r#"
        SELECT document, version FROM meetings
        WHERE (host_user_id = $1
           OR document -> 'participants' @> jsonb_build_array(jsonb_build_object('userId', $1::text)))
          AND ($2::text IS NULL OR status = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(user_id)
    .bind(&status_filter)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM meetings
        WHERE (host_user_id = $1
           OR document -> 'participants' @> jsonb_build_array(jsonb_build_object('userId', $1::text)))
          AND ($2::text IS NULL OR status = $2)
        "#,
    )
    .bind(user_id)
    .bind(&status_filter)
    .fetch_one(pool)
    .await?;

    let meetings = rows
        .into_iter()
        .map(row_to_meeting)
        .map(|r| r.map(|(m, _)| m))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((meetings, total))
}

/// Read-modify-write a meeting under optimistic concurrency control. Retries
/// up to `max_retries` times if another writer wins the race between the
/// read and the `WHERE version = $n` update, matching the per-meeting lock
/// the spec calls for without taking a long-held database lock.
pub async fn update_atomic<F, E>(
    pool: &PgPool,
    meeting_id: &str,
    max_retries: u32,
    mut mutate: F,
) -> Result<Meeting, RepositoryError>
where
    F: FnMut(&mut Meeting) -> Result<(), E>,
    RepositoryError: From<E>,
{
    for _ in 0..=max_retries {
        let row: Option<MeetingRow> =
            sqlx::query_as("SELECT document, version FROM meetings WHERE meeting_id = $1")
                .bind(meeting_id)
                .fetch_optional(pool)
                .await?;
        let Some(row) = row else {
            return Err(RepositoryError::NotFound("meeting"));
        };
        let (mut meeting, version) = row_to_meeting(row)?;

        mutate(&mut meeting)?;
        meeting.updated_at = Utc::now();

        let document = serde_json::to_value(&meeting)?;
        let result = sqlx::query(
            r#"
            UPDATE meetings
            SET document = $1, status = $2, version = version + 1, updated_at = NOW()
            WHERE meeting_id = $3 AND version = $4
            "#,
        )
        .bind(&document)
        .bind(status_str(meeting.status))
        .bind(meeting_id)
        .bind(version)
        .execute(pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(meeting);
        }
        // Lost the race, another writer incremented version first. Retry.
    }
    Err(RepositoryError::VersionConflict(max_retries))
}

/// Append a chat message and bump `statistics.chatMessages` in one atomic
/// statement, avoiding a full read-modify-write for the hottest write path
/// (spec §4.D `pushChat`).
pub async fn push_chat(
    pool: &PgPool,
    meeting_id: &str,
    message: &meeting_types::ChatMessage,
) -> Result<(), RepositoryError> {
    let message_json = serde_json::to_value(message)?;
    let result = sqlx::query(
        r#"
        UPDATE meetings
        SET document = jsonb_set(
                jsonb_set(
                    document,
                    '{chat}',
                    (document -> 'chat') || $1::jsonb
                ),
                '{statistics,chatMessages}',
                to_jsonb(COALESCE((document -> 'statistics' ->> 'chatMessages')::bigint, 0) + 1)
            ),
            version = version + 1,
            updated_at = NOW()
        WHERE meeting_id = $2
        "#,
    )
    .bind(&message_json)
    .bind(meeting_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound("meeting"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_str_matches_wire_values() {
        assert_eq!(status_str(MeetingStatus::Scheduled), "scheduled");
        assert_eq!(status_str(MeetingStatus::Ongoing), "ongoing");
        assert_eq!(status_str(MeetingStatus::Ended), "ended");
        assert_eq!(status_str(MeetingStatus::Cancelled), "cancelled");
    }
}
