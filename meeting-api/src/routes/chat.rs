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

//! `/api/chat/*` — the REST-side counterpart to the socket chat path (spec
//! §4.G, §6). Posting here lands the same `ChatMessage` document the socket
//! handler writes via `meeting_repository::meetings::push_chat`.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use chrono::Utc;
use meeting_types::domain::{ChatFile, ChatMessage};
use meeting_types::ApiResponse;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub meeting_id: String,
    pub message: String,
}

/// `POST /api/chat/message` (spec §6). The socket path is the primary
/// channel; this exists for clients that can't hold a live connection.
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<ApiResponse<ChatMessage>>, AppError> {
    let meeting = meeting_repository::meetings::find_by_meeting_id(&state.db, &req.meeting_id)
        .await?
        .ok_or_else(|| AppError::not_found("meeting not found"))?;
    if !meeting_state::can_chat(&meeting, &auth.user_id) {
        return Err(AppError::forbidden("chat is disabled for this meeting"));
    }

    let doc = ChatMessage {
        id: Uuid::new_v4().to_string(),
        sender_id: auth.user_id.clone(),
        sender_username: auth.username.clone(),
        sender_avatar: None,
        message: req.message,
        kind: "text".to_string(),
        timestamp: Utc::now(),
        file: None,
    };
    meeting_repository::meetings::push_chat(&state.db, &req.meeting_id, &doc).await?;

    Ok(Json(ApiResponse::ok("sent", doc)))
}

/// `POST /api/chat/upload` (spec §6: chat file attachments, SPEC_FULL §C).
/// Multipart body carrying `meetingId` and `file` fields, capped at 10MB.
pub async fn upload(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<ChatMessage>>, AppError> {
    let mut meeting_id: Option<String> = None;
    let mut file: Option<ChatFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "meetingId" => {
                meeting_id = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::bad_request(e.to_string()))?,
                );
            }
            "file" => {
                let file_name = field.file_name().unwrap_or("attachment").to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::bad_request(e.to_string()))?;
                if bytes.len() > MAX_UPLOAD_BYTES {
                    return Err(AppError::bad_request("attachment exceeds the 10MB limit"));
                }
                file = Some(ChatFile {
                    url: format!("/uploads/chat/{}-{}", Uuid::new_v4(), file_name),
                    name: file_name,
                    mime_type,
                    size_bytes: bytes.len() as i64,
                });
            }
            _ => {}
        }
    }

    let meeting_id = meeting_id.ok_or_else(|| AppError::bad_request("meetingId is required"))?;
    let file = file.ok_or_else(|| AppError::bad_request("file is required"))?;

    let meeting = meeting_repository::meetings::find_by_meeting_id(&state.db, &meeting_id)
        .await?
        .ok_or_else(|| AppError::not_found("meeting not found"))?;
    if !meeting_state::can_chat(&meeting, &auth.user_id) {
        return Err(AppError::forbidden("chat is disabled for this meeting"));
    }

    let doc = ChatMessage {
        id: Uuid::new_v4().to_string(),
        sender_id: auth.user_id.clone(),
        sender_username: auth.username.clone(),
        sender_avatar: None,
        message: file.name.clone(),
        kind: "file".to_string(),
        timestamp: Utc::now(),
        file: Some(file),
    };
    meeting_repository::meetings::push_chat(&state.db, &meeting_id, &doc).await?;

    Ok(Json(ApiResponse::ok("uploaded", doc)))
}

/// `GET /api/chat/:meetingId` — the append-only chat log (spec §1 Non-goals:
/// "no pagination beyond this single append-only list").
pub async fn history(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(meeting_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<ChatMessage>>>, AppError> {
    let meeting = meeting_repository::meetings::find_by_meeting_id(&state.db, &meeting_id)
        .await?
        .ok_or_else(|| AppError::not_found("meeting not found"))?;
    Ok(Json(ApiResponse::ok("ok", meeting.chat)))
}
