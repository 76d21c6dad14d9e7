//! Meeting minutes table queries (spec §4.D, §4.I).

use meeting_types::MeetingMinutes;
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use crate::error::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct MinutesRow {
    document: JsonValue,
}

fn row_to_minutes(row: MinutesRow) -> Result<MeetingMinutes, RepositoryError> {
    Ok(serde_json::from_value(row.document)?)
}

/// Insert or replace the minutes document for a meeting. `meetingMinutes` is
/// at most one per meeting, so this is an upsert keyed on `meeting_id`.
pub async fn upsert(pool: &PgPool, minutes: &MeetingMinutes) -> Result<(), RepositoryError> {
    let document = serde_json::to_value(minutes)?;
    sqlx::query(
        r#"
        INSERT INTO meeting_minutes (meeting_id, document, created_at, updated_at)
        VALUES ($1, $2, NOW(), NOW())
        ON CONFLICT (meeting_id)
        DO UPDATE SET document = EXCLUDED.document, updated_at = NOW()
        "#,
    )
    .bind(&minutes.meeting_id)
    .bind(&document)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_by_meeting_id(
    pool: &PgPool,
    meeting_id: &str,
) -> Result<Option<MeetingMinutes>, RepositoryError> {
    let row: Option<MinutesRow> =
        sqlx::query_as("SELECT document FROM meeting_minutes WHERE meeting_id = $1")
            .bind(meeting_id)
            .fetch_optional(pool)
            .await?;
    row.map(row_to_minutes).transpose()
}

/// List all minutes for meetings the user hosted or attended, newest first.
pub async fn list_for_user(
    pool: &PgPool,
    user_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<MeetingMinutes>, RepositoryError> {
    let rows: Vec<MinutesRow> = sqlx::query_as(
        r#"
        SELECT mm.document FROM meeting_minutes mm
        JOIN meetings m ON m.meeting_id = mm.meeting_id
        WHERE m.host_user_id = $1
           OR m.document -> 'participants' @> jsonb_build_array(jsonb_build_object('userId', $1::text))
        ORDER BY mm.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(row_to_minutes).collect()
}
