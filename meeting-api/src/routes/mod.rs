/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Axum router configuration for the Meeting Backend API (spec §6).

pub mod auth;
pub mod chat;
pub mod meetings;
pub mod minutes;
pub mod recordings;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;

/// Build the full application router. `/ws` (signaling) is mounted
/// separately by `main.rs` against the same `AppState`-derived
/// `SignalingState`.
pub fn router() -> Router<AppState> {
    Router::new()
        // Auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/guest", post(auth::guest))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/profile", put(auth::update_profile))
        .route("/api/auth/logout", post(auth::logout))
        // Meetings
        .route("/api/meetings", post(meetings::create).get(meetings::list))
        .route("/api/meetings/schedule", post(meetings::schedule))
        .route("/api/meetings/ice-servers", get(meetings::ice_servers))
        .route("/api/meetings/{meeting_id}", get(meetings::get))
        .route("/api/meetings/{meeting_id}/join", post(meetings::join))
        .route("/api/meetings/{meeting_id}/leave", post(meetings::leave))
        .route(
            "/api/meetings/{meeting_id}/settings",
            put(meetings::update_settings),
        )
        .route("/api/meetings/{meeting_id}/end", post(meetings::end))
        .route("/api/meetings/{meeting_id}/cancel", post(meetings::cancel))
        .route(
            "/api/meetings/{meeting_id}/transcripts",
            post(meetings::append_transcripts).get(meetings::get_transcripts),
        )
        // Chat
        .route("/api/chat/message", post(chat::send_message))
        .route("/api/chat/upload", post(chat::upload))
        .route("/api/chat/{meeting_id}", get(chat::history))
        // Recordings
        .route("/api/recordings/{meeting_id}/start", post(recordings::start))
        .route("/api/recordings/{meeting_id}/stop", post(recordings::stop))
        .route("/api/recordings/upload", post(recordings::upload))
        .route(
            "/api/recordings/my-recordings",
            get(recordings::my_recordings),
        )
        // Meeting minutes
        .route(
            "/api/meeting-minutes/{meeting_id}/generate",
            post(minutes::generate),
        )
        .route("/api/meeting-minutes/{meeting_id}", get(minutes::get))
        .route("/api/meeting-minutes", get(minutes::list))
        .route(
            "/api/meeting-minutes/{meeting_id}/resend-email",
            post(minutes::resend_email),
        )
}
