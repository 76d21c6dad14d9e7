//! Postgres persistence for the coordination plane (spec §4.D).
//!
//! Each aggregate (`User`, `Meeting`, `MeetingMinutes`) is stored as a JSONB
//! document next to a few queryable top-level columns, the same shape the
//! teacher uses for `meetings.attendees`. `meetings` additionally carries a
//! `version` counter so concurrent writers (two participants joining at
//! once, a host ending a meeting while a reminder job fires) can't silently
//! clobber each other.

pub mod error;
pub mod meetings;
pub mod minutes;
pub mod users;

pub use error::RepositoryError;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Open a connection pool. Mirrors the teacher's pool setup in `main.rs`.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Schema bootstrap for local/dev environments. Production deployments
/// should use a real migration tool; this exists so the binaries can start
/// against a bare Postgres instance without one.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    is_guest BOOLEAN NOT NULL DEFAULT FALSE,
    document JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS meetings (
    id BIGSERIAL PRIMARY KEY,
    meeting_id TEXT NOT NULL UNIQUE,
    host_user_id TEXT NOT NULL,
    status TEXT NOT NULL,
    scheduled_for TIMESTAMPTZ NOT NULL,
    document JSONB NOT NULL,
    version BIGINT NOT NULL DEFAULT 1,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_meetings_host ON meetings (host_user_id);
CREATE INDEX IF NOT EXISTS idx_meetings_participants ON meetings USING GIN ((document -> 'participants'));

CREATE TABLE IF NOT EXISTS meeting_minutes (
    meeting_id TEXT PRIMARY KEY REFERENCES meetings (meeting_id),
    document JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#;
