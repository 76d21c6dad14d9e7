//! Shared domain types and wire contract for the meeting coordination plane.
//!
//! This crate defines the API contract and persisted-document shapes shared
//! by the `meeting-api` (REST) and `signaling-server` (WebSocket) binaries,
//! plus every library crate in between. It is intentionally framework- and
//! storage-agnostic: no axum, no actix, no sqlx.

pub mod claims;
pub mod domain;
pub mod error;
pub mod job;
pub mod minutes;
pub mod response;

pub use claims::AccessTokenClaims;
pub use domain::{Meeting, MeetingId, MeetingStatus, Participant, Settings, User};
pub use error::{ApiError, ErrorKind};
pub use job::{Job, JobPayload, QueueName};
pub use minutes::MeetingMinutes;
pub use response::ApiResponse;
