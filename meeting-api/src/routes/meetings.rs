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

//! `/api/meetings/*` (spec §6, §4.D, §4.E).

use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use meeting_state::SettingsPatch;
use meeting_types::domain::{Settings, TranscriptSegment};
use meeting_types::{ApiResponse, Meeting, MeetingStatus};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

async fn load_meeting(state: &AppState, meeting_id: &str) -> Result<Meeting, AppError> {
    meeting_repository::meetings::find_by_meeting_id(&state.db, meeting_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("meeting {meeting_id} not found")))
}

#[derive(Debug, Deserialize)]
pub struct CreateMeetingRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_duration")]
    pub duration_minutes: i32,
    #[serde(default)]
    pub settings: Option<Settings>,
}

fn default_duration() -> i32 {
    60
}

/// `POST /api/meetings` — instant meeting, host joined immediately.
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateMeetingRequest>,
) -> Result<Json<ApiResponse<Meeting>>, AppError> {
    let meeting = meeting_state::create_meeting(
        &auth.user_id,
        req.title,
        req.description,
        req.duration_minutes,
        req.settings.unwrap_or_default(),
    );
    meeting_repository::meetings::insert(&state.db, &meeting).await?;
    bump_host_stats(&state, &auth.user_id).await;
    Ok(Json(ApiResponse::ok("meeting created", meeting)))
}

/// Increments `totalMeetings` + `meetingsHosted` for the host (spec §4.E
/// `createMeeting` "increments host stats"). Not called from `schedule`: the
/// host there is seeded as `invited`, not `joined`, and is credited when
/// they actually join.
async fn bump_host_stats(state: &AppState, host_user_id: &str) {
    if let Ok(Some(mut user)) = meeting_repository::users::find_by_id(&state.db, host_user_id).await {
        user.statistics.total_meetings += 1;
        user.statistics.meetings_hosted += 1;
        let _ = meeting_repository::users::replace(&state.db, &user).await;
    }
}

#[derive(Debug, Deserialize)]
pub struct ScheduleMeetingRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub scheduled_for: DateTime<Utc>,
    #[serde(default = "default_duration")]
    pub duration_minutes: i32,
    #[serde(default)]
    pub settings: Option<Settings>,
}

/// `POST /api/meetings/schedule` — future meeting, reminders enqueued on the
/// `{60, 30, 15, 5}` minute ladder (spec §4.H).
pub async fn schedule(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ScheduleMeetingRequest>,
) -> Result<Json<ApiResponse<Meeting>>, AppError> {
    let meeting = meeting_state::schedule_meeting(
        &auth.user_id,
        req.title,
        req.description,
        req.scheduled_for,
        req.duration_minutes,
        req.settings.unwrap_or_default(),
    )
    .map_err(AppError::from)?;
    meeting_repository::meetings::insert(&state.db, &meeting).await?;

    let scheduled = job_queue::schedule_reminders(&state.queue, &meeting, &auth.user_id)
        .await
        .map_err(|e| AppError::from(meeting_types::ApiError::internal(e.to_string())))?;
    tracing::info!(meeting_id = %meeting.meeting_id, scheduled, "reminder jobs scheduled");

    Ok(Json(ApiResponse::ok("meeting scheduled", meeting)))
}

#[derive(Debug, Deserialize)]
pub struct ListMeetingsQuery {
    pub status: Option<MeetingStatus>,
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

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingListResponse {
    pub meetings: Vec<Meeting>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

/// `GET /api/meetings` — meetings where the caller is host or participant.
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListMeetingsQuery>,
) -> Result<Json<ApiResponse<MeetingListResponse>>, AppError> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);
    let offset = (page - 1) * limit;

    let (meetings, total) = meeting_repository::meetings::list_for_user(
        &state.db,
        &auth.user_id,
        query.status,
        limit,
        offset,
    )
    .await?;

    Ok(Json(ApiResponse::ok(
        "ok",
        MeetingListResponse {
            meetings,
            total,
            page,
            limit,
        },
    )))
}

/// `GET /api/meetings/:meetingId`.
pub async fn get(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(meeting_id): Path<String>,
) -> Result<Json<ApiResponse<Meeting>>, AppError> {
    let meeting = load_meeting(&state, &meeting_id).await?;
    Ok(Json(ApiResponse::ok("ok", meeting)))
}

#[derive(Debug, Deserialize, Default)]
pub struct JoinMeetingRequest {
    #[serde(default)]
    pub password: Option<String>,
}

/// `POST /api/meetings/:meetingId/join` (spec §4.E `joinMeeting`, §8
/// idempotence scenarios). `meetingsAttended`/`totalMeetings` increment
/// exactly once per (user, meeting) pair, on the join call where
/// `JoinOutcome.first_join` is true (spec §8 invariant).
pub async fn join(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(meeting_id): Path<String>,
    Json(req): Json<JoinMeetingRequest>,
) -> Result<Json<ApiResponse<Meeting>>, AppError> {
    let password = req.password;
    let user_id = auth.user_id.clone();
    let first_join = AtomicBool::new(false);
    let meeting = meeting_repository::meetings::update_atomic(&state.db, &meeting_id, 5, |meeting| {
        meeting_state::join_meeting(meeting, &user_id, password.as_deref()).map(|outcome| {
            first_join.store(outcome.first_join, Ordering::SeqCst);
        })
    })
    .await?;

    if first_join.load(Ordering::SeqCst) {
        if let Ok(Some(mut user)) = meeting_repository::users::find_by_id(&state.db, &auth.user_id).await
        {
            user.statistics.total_meetings += 1;
            user.statistics.meetings_attended += 1;
            let _ = meeting_repository::users::replace(&state.db, &user).await;
        }
    }

    Ok(Json(ApiResponse::ok("joined", meeting)))
}

/// `POST /api/meetings/:meetingId/leave` (spec §4.E `leaveMeeting`, host
/// succession).
pub async fn leave(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(meeting_id): Path<String>,
) -> Result<Json<ApiResponse<Meeting>>, AppError> {
    let user_id = auth.user_id.clone();
    let meeting = meeting_repository::meetings::update_atomic(
        &state.db,
        &meeting_id,
        5,
        move |meeting| meeting_state::leave_meeting(meeting, &user_id).map(|_| ()),
    )
    .await?;

    Ok(Json(ApiResponse::ok("left", meeting)))
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub allow_guests: Option<bool>,
    pub require_password: Option<bool>,
    pub enable_recording: Option<bool>,
    pub enable_chat: Option<bool>,
    pub enable_screen_share: Option<bool>,
    pub enable_raise_hand: Option<bool>,
    pub enable_reactions: Option<bool>,
    pub max_participants: Option<i32>,
    pub waiting_room: Option<bool>,
    pub mute_on_entry: Option<bool>,
    pub video_on_entry: Option<bool>,
}

impl From<UpdateSettingsRequest> for SettingsPatch {
    fn from(req: UpdateSettingsRequest) -> Self {
        SettingsPatch {
            allow_guests: req.allow_guests,
            require_password: req.require_password,
            enable_recording: req.enable_recording,
            enable_chat: req.enable_chat,
            enable_screen_share: req.enable_screen_share,
            enable_raise_hand: req.enable_raise_hand,
            enable_reactions: req.enable_reactions,
            max_participants: req.max_participants,
            waiting_room: req.waiting_room,
            mute_on_entry: req.mute_on_entry,
            video_on_entry: req.video_on_entry,
        }
    }
}

/// `PUT /api/meetings/:meetingId/settings` — host-only shallow merge.
pub async fn update_settings(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(meeting_id): Path<String>,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<Json<ApiResponse<Meeting>>, AppError> {
    let patch: SettingsPatch = req.into();
    let caller_id = auth.user_id.clone();
    let meeting = meeting_repository::meetings::update_atomic(&state.db, &meeting_id, 5, move |meeting| {
        meeting_state::update_settings(meeting, &caller_id, patch.clone())
    })
    .await?;

    Ok(Json(ApiResponse::ok("settings updated", meeting)))
}

/// `POST /api/meetings/:meetingId/end` — host-only.
pub async fn end(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(meeting_id): Path<String>,
) -> Result<Json<ApiResponse<Meeting>>, AppError> {
    let caller_id = auth.user_id.clone();
    let meeting = meeting_repository::meetings::update_atomic(&state.db, &meeting_id, 5, move |meeting| {
        meeting_state::end_meeting(meeting, &caller_id)
    })
    .await?;

    // `totalMeetings`/`meetingsHosted`/`meetingsAttended` are already
    // incremented once per (user, meeting) pair at `create`/`join` time
    // (first_join-gated); only the duration rollup belongs here.
    if let Some(minutes) = meeting.statistics.total_duration {
        for participant in meeting.joined_participants() {
            if let Ok(Some(mut user)) =
                meeting_repository::users::find_by_id(&state.db, &participant.user_id).await
            {
                user.statistics.total_meeting_time_minutes += minutes;
                let _ = meeting_repository::users::replace(&state.db, &user).await;
            }
        }
    }

    Ok(Json(ApiResponse::ok("meeting ended", meeting)))
}

/// `POST /api/meetings/:meetingId/cancel` — host-only, `scheduled` only.
pub async fn cancel(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(meeting_id): Path<String>,
) -> Result<Json<ApiResponse<Meeting>>, AppError> {
    let caller_id = auth.user_id.clone();
    let meeting = meeting_repository::meetings::update_atomic(&state.db, &meeting_id, 5, move |meeting| {
        meeting_state::cancel_meeting(meeting, &caller_id)
    })
    .await?;

    if let Err(e) = job_queue::cancel_reminders(&state.queue, &meeting_id).await {
        tracing::warn!(meeting_id = %meeting_id, error = %e, "failed to cancel reminder jobs");
    }

    Ok(Json(ApiResponse::ok("meeting cancelled", meeting)))
}

#[derive(Debug, Deserialize)]
pub struct AppendTranscriptRequest {
    pub segments: Vec<TranscriptSegment>,
}

/// `POST /api/meetings/:meetingId/transcripts` — append transcript segments,
/// de-duplicated on `(speakerId, startTimeMs)` (Open Question resolution,
/// SPEC_FULL §E).
pub async fn append_transcripts(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(meeting_id): Path<String>,
    Json(req): Json<AppendTranscriptRequest>,
) -> Result<Json<ApiResponse<Meeting>>, AppError> {
    let meeting = meeting_repository::meetings::update_atomic(&state.db, &meeting_id, 5, move |meeting| {
        for segment in req.segments.clone() {
            let duplicate = meeting.transcripts.iter().any(|existing| {
                existing.speaker_id == segment.speaker_id
                    && existing.start_time_ms == segment.start_time_ms
            });
            if !duplicate {
                meeting.transcripts.push(segment);
            }
        }
        Ok::<(), meeting_types::ApiError>(())
    })
    .await?;

    Ok(Json(ApiResponse::ok("transcripts appended", meeting)))
}

/// `GET /api/meetings/:meetingId/transcripts`.
pub async fn get_transcripts(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(meeting_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<TranscriptSegment>>>, AppError> {
    let meeting = load_meeting(&state, &meeting_id).await?;
    Ok(Json(ApiResponse::ok("ok", meeting.transcripts)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IceServer {
    pub urls: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

/// `GET /api/meetings/ice-servers` — public STUN plus configured TURN, if
/// any (spec §1 Non-goals: the server configures but never relays media).
pub async fn ice_servers(State(state): State<AppState>, _auth: AuthUser) -> Json<ApiResponse<Vec<IceServer>>> {
    let mut servers = vec![IceServer {
        urls: "stun:stun.l.google.com:19302".to_string(),
        username: None,
        credential: None,
    }];
    if let Some(turn) = &state.turn {
        servers.push(IceServer {
            urls: turn.url.clone(),
            username: Some(turn.username.clone()),
            credential: Some(turn.credential.clone()),
        });
    }
    Json(ApiResponse::ok("ok", servers))
}
