//! User table queries. Grounded on the teacher's flat-row query style
//! (`db/meetings.rs`) but for the `users` table (spec §3 User).

use chrono::{DateTime, Utc};
use meeting_types::User;
use sqlx::PgPool;

use crate::error::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    document: serde_json::Value,
}

fn row_to_user(row: UserRow) -> Result<User, RepositoryError> {
    Ok(serde_json::from_value(row.document)?)
}

/// Insert a brand new user. Fails with `Duplicate` if the username or email
/// (for non-guests) is already taken.
pub async fn insert(pool: &PgPool, user: &User) -> Result<(), RepositoryError> {
    let document = serde_json::to_value(user)?;
    let result = sqlx::query(
        r#"
        INSERT INTO users (id, username, email, is_guest, document, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
        "#,
    )
    .bind(&user.id)
    .bind(&user.username)
    .bind(&user.email)
    .bind(user.is_guest)
    .bind(&document)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(RepositoryError::Duplicate(user.username.clone()))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, RepositoryError> {
    let row: Option<UserRow> = sqlx::query_as("SELECT document FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(row_to_user).transpose()
}

pub async fn find_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<User>, RepositoryError> {
    let row: Option<UserRow> = sqlx::query_as("SELECT document FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    row.map(row_to_user).transpose()
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, RepositoryError> {
    let row: Option<UserRow> = sqlx::query_as("SELECT document FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    row.map(row_to_user).transpose()
}

/// Overwrite the whole document, used for profile/preference updates and for
/// statistics rollups at meeting-end (spec §4.E, SPEC_FULL §C).
pub async fn replace(pool: &PgPool, user: &User) -> Result<(), RepositoryError> {
    let document = serde_json::to_value(user)?;
    let result = sqlx::query(
        "UPDATE users SET document = $1, email = $2, updated_at = NOW() WHERE id = $3",
    )
    .bind(&document)
    .bind(&user.email)
    .bind(&user.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound("user"));
    }
    Ok(())
}

pub async fn touch_last_seen(
    pool: &PgPool,
    id: &str,
    at: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE users SET document = jsonb_set(document, '{lastSeenAt}', to_jsonb($1::timestamptz)), updated_at = NOW() WHERE id = $2")
        .bind(at)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
