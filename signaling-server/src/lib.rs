//! WebSocket signaling router and room event bus for the meeting
//! coordination plane (spec §4.F, §4.G).
//!
//! Mounted into `meeting-api`'s single axum server alongside the HTTP
//! surface, the way the original coordination plane runs one process with
//! both an Express app and a socket.io server attached to the same HTTP
//! listener.

pub mod events;
pub mod handler;
pub mod room;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

pub use handler::SignalingState;
pub use room::RoomRegistry;

/// `GET /ws`, carrying the handshake token as `?token=`. Merge this into
/// the HTTP router sharing the same `SignalingState`.
pub fn router() -> Router<SignalingState> {
    Router::new().route("/ws", get(handler::upgrade))
}

impl SignalingState {
    pub fn new(
        tokens: Arc<token_verifier::TokenVerifier>,
        cache: Option<presence_cache::PresenceCache>,
        db: sqlx::PgPool,
    ) -> Self {
        Self {
            rooms: Arc::new(RoomRegistry::default()),
            tokens,
            cache,
            db,
        }
    }
}
