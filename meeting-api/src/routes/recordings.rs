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

//! `/api/recordings/*` (spec §6, SPEC_FULL §C recording metadata lifecycle).
//! The server never transcodes or stores the media itself (spec §1
//! Non-goals); it only tracks the `Recording` metadata on the meeting
//! document and accepts the final artifact's storage URL.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use chrono::Utc;
use meeting_types::{ApiResponse, JobPayload, Meeting};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

const MAX_UPLOAD_BYTES: usize = 500 * 1024 * 1024;
const ALLOWED_MIME_TYPES: &[&str] = &["video/webm", "video/mp4", "audio/webm", "audio/ogg"];

/// `POST /api/recordings/start` — host-only, requires `settings.enableRecording`.
pub async fn start(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(meeting_id): Path<String>,
) -> Result<Json<ApiResponse<Meeting>>, AppError> {
    let caller_id = auth.user_id.clone();
    let meeting = meeting_repository::meetings::update_atomic(&state.db, &meeting_id, 5, move |meeting| {
        if !meeting_state::can_record(meeting, &caller_id) {
            return Err(meeting_types::ApiError::forbidden(
                "recording is not permitted for this participant",
            ));
        }
        if !meeting.settings.enable_recording {
            return Err(meeting_types::ApiError::failed_precondition(
                "recording is disabled for this meeting",
            ));
        }
        if meeting.recording.is_recording {
            return Err(meeting_types::ApiError::conflict("recording already in progress"));
        }
        meeting.recording.is_recording = true;
        meeting.recording.started_at = Some(Utc::now());
        meeting.recording.stopped_at = None;
        Ok(())
    })
    .await?;

    Ok(Json(ApiResponse::ok("recording started", meeting)))
}

/// `POST /api/recordings/stop` — enqueues post-processing once stopped.
pub async fn stop(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(meeting_id): Path<String>,
) -> Result<Json<ApiResponse<Meeting>>, AppError> {
    let caller_id = auth.user_id.clone();
    let meeting = meeting_repository::meetings::update_atomic(&state.db, &meeting_id, 5, move |meeting| {
        if !meeting_state::can_record(meeting, &caller_id) {
            return Err(meeting_types::ApiError::forbidden(
                "recording is not permitted for this participant",
            ));
        }
        if !meeting.recording.is_recording {
            return Err(meeting_types::ApiError::failed_precondition(
                "no recording in progress",
            ));
        }
        meeting.recording.is_recording = false;
        meeting.recording.stopped_at = Some(Utc::now());
        Ok(())
    })
    .await?;

    if let Some(url) = &meeting.recording.recording_url {
        let payload = JobPayload::RecordingPostProcess {
            meeting_id: meeting.meeting_id.clone(),
            recording_url: url.clone(),
        };
        let job = meeting_types::Job::immediate(uuid::Uuid::new_v4().to_string(), payload);
        if let Err(e) = state.queue.enqueue(job).await {
            tracing::warn!(meeting_id = %meeting.meeting_id, error = %e, "failed to enqueue recording post-process job");
        }
    }

    Ok(Json(ApiResponse::ok("recording stopped", meeting)))
}

/// `POST /api/recordings/upload` — multipart upload of the finished
/// recording, capped at 500MB with a MIME whitelist (SPEC_FULL §C).
pub async fn upload(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<Meeting>>, AppError> {
    let mut meeting_id: Option<String> = None;
    let mut url: Option<String> = None;
    let mut size_bytes: i64 = 0;

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
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                if !ALLOWED_MIME_TYPES.contains(&mime_type.as_str()) {
                    return Err(AppError::bad_request(format!(
                        "unsupported recording MIME type: {mime_type}"
                    )));
                }
                let file_name = field.file_name().unwrap_or("recording").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::bad_request(e.to_string()))?;
                if bytes.len() > MAX_UPLOAD_BYTES {
                    return Err(AppError::bad_request("recording exceeds the 500MB limit"));
                }
                size_bytes = bytes.len() as i64;
                url = Some(format!("/uploads/recordings/{}-{}", uuid::Uuid::new_v4(), file_name));
            }
            _ => {}
        }
    }

    let meeting_id = meeting_id.ok_or_else(|| AppError::bad_request("meetingId is required"))?;
    let url = url.ok_or_else(|| AppError::bad_request("file is required"))?;

    let caller_id = auth.user_id.clone();
    let meeting = meeting_repository::meetings::update_atomic(&state.db, &meeting_id, 5, move |meeting| {
        if !meeting_state::can_record(meeting, &caller_id) {
            return Err(meeting_types::ApiError::forbidden(
                "recording is not permitted for this participant",
            ));
        }
        meeting.recording.recording_url = Some(url.clone());
        meeting.recording.size_bytes = Some(size_bytes);
        Ok(())
    })
    .await?;

    Ok(Json(ApiResponse::ok("recording uploaded", meeting)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSummary {
    pub meeting_id: String,
    pub title: String,
    pub recording_url: Option<String>,
    pub size_bytes: Option<i64>,
}

/// `GET /api/recordings/my-recordings` — meetings the caller hosted or
/// attended that carry a finished recording.
pub async fn my_recordings(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<RecordingSummary>>>, AppError> {
    let (meetings, _total) =
        meeting_repository::meetings::list_for_user(&state.db, &auth.user_id, None, 100, 0).await?;

    let recordings = meetings
        .into_iter()
        .filter(|m| m.recording.recording_url.is_some())
        .map(|m| RecordingSummary {
            meeting_id: m.meeting_id,
            title: m.title,
            recording_url: m.recording.recording_url,
            size_bytes: m.recording.size_bytes,
        })
        .collect();

    Ok(Json(ApiResponse::ok("ok", recordings)))
}
