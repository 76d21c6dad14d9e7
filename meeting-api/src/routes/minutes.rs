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

//! `/api/meeting-minutes/*` (spec §4.I Minutes Pipeline, §6).

use axum::extract::{Path, Query, State};
use axum::Json;
use meeting_types::minutes::{Attendee, MinutesStatus, RecipientStatus};
use meeting_types::{ApiResponse, JobPayload, MeetingMinutes};
use minutes_pipeline::GenerateMinutesInput;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

async fn build_attendees(state: &AppState, meeting: &meeting_types::Meeting) -> Vec<Attendee> {
    let mut attendees = Vec::with_capacity(meeting.participants.len());
    for participant in &meeting.participants {
        let user = meeting_repository::users::find_by_id(&state.db, &participant.user_id)
            .await
            .ok()
            .flatten();
        let (name, email) = match user {
            Some(u) => (u.username, u.email),
            None => (participant.user_id.clone(), String::new()),
        };
        attendees.push(Attendee {
            user_id: participant.user_id.clone(),
            name,
            email,
            role: format!("{:?}", participant.role).to_lowercase(),
            joined_at: participant.joined_at,
            left_at: participant.left_at,
        });
    }
    attendees
}

/// `POST /api/meeting-minutes/:meetingId/generate` (spec §4.I): runs the
/// pipeline synchronously with a longer request timeout rather than via the
/// job queue, since the caller is waiting on the result.
pub async fn generate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(meeting_id): Path<String>,
) -> Result<Json<ApiResponse<MeetingMinutes>>, AppError> {
    let meeting = meeting_repository::meetings::find_by_meeting_id(&state.db, &meeting_id)
        .await?
        .ok_or_else(|| AppError::not_found("meeting not found"))?;

    if !meeting_state::is_host(&meeting, &auth.user_id) {
        return Err(AppError::forbidden(
            "only the host can generate meeting minutes",
        ));
    }

    if let Some(existing) = meeting_repository::minutes::find_by_meeting_id(&state.db, &meeting_id).await? {
        if existing.status == MinutesStatus::Completed {
            return Err(AppError::from(meeting_types::ApiError::conflict(
                "meeting minutes have already been generated for this meeting",
            )));
        }
    }

    let llm = state
        .llm
        .as_ref()
        .ok_or_else(|| AppError::from(meeting_types::ApiError::unavailable(
            "minutes generation is not configured",
        )))?;

    let attendees = build_attendees(&state, &meeting).await;
    let input = GenerateMinutesInput {
        meeting_id: meeting.meeting_id.clone(),
        title: meeting.title.clone(),
        start_time: meeting.created_at,
        end_time: meeting.updated_at.into(),
        duration_minutes: meeting.statistics.total_duration.unwrap_or(meeting.duration_minutes as i64),
        attendees,
        transcripts: &meeting.transcripts,
    };

    let minutes = minutes_pipeline::generate(llm, input).await;
    meeting_repository::minutes::upsert(&state.db, &minutes).await?;

    if minutes.status == MinutesStatus::Completed {
        for attendee in &minutes.attendees {
            if attendee.email.is_empty() {
                continue;
            }
            let payload = JobPayload::EmailMeetingMinutes {
                meeting_id: minutes.meeting_id.clone(),
                recipient_email: attendee.email.clone(),
                recipient_name: attendee.name.clone(),
            };
            let job = meeting_types::Job::immediate(uuid::Uuid::new_v4().to_string(), payload);
            if let Err(e) = state.queue.enqueue(job).await {
                tracing::warn!(meeting_id = %minutes.meeting_id, error = %e, "failed to enqueue meeting-minutes email job");
            }
        }
    }

    Ok(Json(ApiResponse::ok("minutes generated", minutes)))
}

/// `GET /api/meeting-minutes/:meetingId`.
pub async fn get(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(meeting_id): Path<String>,
) -> Result<Json<ApiResponse<MeetingMinutes>>, AppError> {
    let minutes = meeting_repository::minutes::find_by_meeting_id(&state.db, &meeting_id)
        .await?
        .ok_or_else(|| AppError::not_found("minutes not found for this meeting"))?;
    Ok(Json(ApiResponse::ok("ok", minutes)))
}

#[derive(Debug, Deserialize)]
pub struct ListMinutesQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

/// `GET /api/meeting-minutes` — minutes for meetings the caller hosted or
/// attended.
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListMinutesQuery>,
) -> Result<Json<ApiResponse<Vec<MeetingMinutes>>>, AppError> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);
    let offset = (page - 1) * limit;

    let minutes =
        meeting_repository::minutes::list_for_user(&state.db, &auth.user_id, limit, offset).await?;
    Ok(Json(ApiResponse::ok("ok", minutes)))
}

/// `POST /api/meeting-minutes/:meetingId/resend-email` (spec §4.J): re-sends
/// the minutes email to every attendee with a known address.
pub async fn resend_email(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(meeting_id): Path<String>,
) -> Result<Json<ApiResponse<MeetingMinutes>>, AppError> {
    let meeting = meeting_repository::meetings::find_by_meeting_id(&state.db, &meeting_id)
        .await?
        .ok_or_else(|| AppError::not_found("meeting not found"))?;
    if !meeting_state::is_host(&meeting, &auth.user_id) {
        return Err(AppError::forbidden(
            "only the host can resend meeting minutes",
        ));
    }

    let mut minutes = meeting_repository::minutes::find_by_meeting_id(&state.db, &meeting_id)
        .await?
        .ok_or_else(|| AppError::not_found("minutes not found for this meeting"))?;

    let email = state
        .email
        .as_ref()
        .ok_or_else(|| AppError::from(meeting_types::ApiError::unavailable(
            "email delivery is not configured",
        )))?;

    let mut recipients = Vec::new();
    for attendee in &minutes.attendees {
        if attendee.email.is_empty() {
            continue;
        }
        let delivery = email
            .send_meeting_minutes(&attendee.email, &attendee.name, &minutes.title, &minutes.summary, &meeting_id)
            .await;
        recipients.push(delivery);
    }

    let all_sent = !recipients.is_empty()
        && recipients
            .iter()
            .all(|r| r.status == RecipientStatus::Sent);
    minutes.email_delivery.sent = all_sent;
    minutes.email_delivery.sent_at = Some(chrono::Utc::now());
    minutes.email_delivery.recipients = recipients;

    meeting_repository::minutes::upsert(&state.db, &minutes).await?;

    Ok(Json(ApiResponse::ok("minutes email resent", minutes)))
}
