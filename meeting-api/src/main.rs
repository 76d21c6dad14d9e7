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

//! Meeting Backend API server entry point.
//!
//! A single Axum process that serves the HTTP coordination surface, the
//! `/ws` signaling endpoint, and the job-queue worker pools (spec §4.A
//! "Concurrency & resource model": one process, cooperative tokio tasks, no
//! separate worker fleet).

use std::sync::Arc;
use std::time::Duration;

use axum::http;
use job_queue::{Backend, HandlerError, JobQueue, RedisBackend};
use meeting_api::config::Config;
use meeting_api::routes;
use meeting_api::state::AppState;
use meeting_types::{JobPayload, QueueName};
use presence_cache::PresenceCache;
use signaling_server::SignalingState;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::EnvFilter;

const SHUTDOWN_DRAIN: Duration = Duration::from_secs(20);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env().expect("failed to load configuration");

    let pool = meeting_repository::connect(&config.database_url)
        .await
        .expect("failed to connect to PostgreSQL");
    sqlx::raw_sql(meeting_repository::SCHEMA_SQL)
        .execute(&pool)
        .await
        .expect("failed to apply schema");
    tracing::info!("connected to PostgreSQL");

    let cache = match PresenceCache::connect(&config.redis_url).await {
        Ok(cache) => {
            tracing::info!("connected to Redis presence cache");
            Some(cache)
        }
        Err(err) => {
            tracing::warn!(error = %err, "Redis unreachable at startup, presence cache degraded to unavailable");
            None
        }
    };

    let queue = match RedisBackend::connect(&config.redis_url).await {
        Ok(backend) => JobQueue::new(Arc::new(backend)),
        Err(err) => {
            tracing::warn!(error = %err, "Redis job queue backend unavailable, falling back to in-memory");
            JobQueue::in_memory()
        }
    };

    let state = AppState::new(pool.clone(), &config, cache.clone(), queue.clone())
        .expect("failed to build application state");

    register_job_handlers(&queue, &state).await;
    let workers = queue.start().await;
    tracing::info!(worker_count = workers.len(), "job queue workers started");

    let cors = CorsLayer::new()
        .allow_origin(if config.client_url == "*" {
            AllowOrigin::mirror_request()
        } else {
            let hv: http::HeaderValue = config
                .client_url
                .parse()
                .expect("invalid CLIENT_URL for CORS");
            AllowOrigin::exact(hv)
        })
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::DELETE,
            http::Method::OPTIONS,
        ])
        .allow_headers([
            http::header::CONTENT_TYPE,
            http::header::AUTHORIZATION,
            http::header::ACCEPT,
        ])
        .allow_credentials(true);

    let signaling_state = SignalingState::new(Arc::clone(&state.tokens), cache, pool);
    let app = routes::router()
        .with_state(state.clone())
        .merge(signaling_server::router().with_state(signaling_state))
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind listener");
    tracing::info!("meeting API listening on {}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("draining in-flight jobs before exit");
    queue.shutdown(SHUTDOWN_DRAIN).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

/// Register the four queue handlers (spec §4.C, §4.H, §4.I, §4.J). Each
/// handler is intentionally thin: reload current state, act, and classify
/// failures as retryable or permanent.
async fn register_job_handlers(queue: &JobQueue, state: &AppState) {
    let reminder_state = state.clone();
    queue
        .register(QueueName::Reminder, move |job| {
            let state = reminder_state.clone();
            async move { run_reminder_job(state, job).await }
        })
        .await;

    let email_state = state.clone();
    queue
        .register(QueueName::Email, move |job| {
            let state = email_state.clone();
            async move { run_email_job(state, job).await }
        })
        .await;

    let mom_state = state.clone();
    queue
        .register(QueueName::MomGeneration, move |job| {
            let state = mom_state.clone();
            async move { run_mom_job(state, job).await }
        })
        .await;

    let recording_state = state.clone();
    queue
        .register(QueueName::Recording, move |job| {
            let state = recording_state.clone();
            async move { run_recording_job(state, job).await }
        })
        .await;
}

/// `reminder` queue (spec §4.H): look up the meeting fresh, no-op if it's
/// been cancelled or ended since the reminder was scheduled, otherwise
/// enqueue the actual email send.
async fn run_reminder_job(state: AppState, job: meeting_types::Job) -> Result<(), HandlerError> {
    let JobPayload::MeetingReminder {
        meeting_id,
        user_id,
        time_label,
    } = job.payload
    else {
        return Err(HandlerError::permanent("reminder job carried the wrong payload kind"));
    };

    let meeting = meeting_repository::meetings::find_by_meeting_id(&state.db, &meeting_id)
        .await
        .map_err(|e| HandlerError::retryable(e.to_string()))?;
    let Some(meeting) = meeting else {
        return Ok(());
    };
    if meeting.status.is_terminal() {
        return Ok(());
    }

    let user = meeting_repository::users::find_by_id(&state.db, &user_id)
        .await
        .map_err(|e| HandlerError::retryable(e.to_string()))?;
    let Some(user) = user else {
        return Ok(());
    };

    let payload = JobPayload::EmailMeetingReminder {
        meeting_id: meeting.meeting_id.clone(),
        recipient_email: user.email,
        recipient_name: user.username,
        meeting_title: meeting.title,
        scheduled_for: meeting.scheduled_for,
        time_label,
    };
    let email_job = meeting_types::Job::immediate(uuid::Uuid::new_v4().to_string(), payload);
    state
        .queue
        .enqueue(email_job)
        .await
        .map_err(|e| HandlerError::retryable(e.to_string()))
}

/// `email` queue (spec §4.J).
async fn run_email_job(state: AppState, job: meeting_types::Job) -> Result<(), HandlerError> {
    let Some(email) = &state.email else {
        return Err(HandlerError::permanent("email dispatch is not configured"));
    };

    match job.payload {
        JobPayload::EmailMeetingReminder {
            meeting_id,
            recipient_email,
            recipient_name,
            meeting_title,
            scheduled_for,
            time_label,
        } => {
            let delivery = email
                .send_meeting_reminder(
                    &recipient_email,
                    &recipient_name,
                    &meeting_title,
                    scheduled_for,
                    &time_label,
                    &meeting_id,
                )
                .await;
            if delivery.status == meeting_types::minutes::RecipientStatus::Failed {
                return Err(HandlerError::retryable(
                    delivery.error.unwrap_or_else(|| "email send failed".to_string()),
                ));
            }
            Ok(())
        }
        JobPayload::EmailMeetingMinutes {
            meeting_id,
            recipient_email,
            recipient_name,
        } => {
            let minutes = meeting_repository::minutes::find_by_meeting_id(&state.db, &meeting_id)
                .await
                .map_err(|e| HandlerError::retryable(e.to_string()))?;
            let Some(minutes) = minutes else {
                return Err(HandlerError::permanent("no minutes document to send"));
            };
            let delivery = email
                .send_meeting_minutes(&recipient_email, &recipient_name, &minutes.title, &minutes.summary, &meeting_id)
                .await;
            if delivery.status == meeting_types::minutes::RecipientStatus::Failed {
                return Err(HandlerError::retryable(
                    delivery.error.unwrap_or_else(|| "email send failed".to_string()),
                ));
            }
            Ok(())
        }
        _ => Err(HandlerError::permanent("email queue received the wrong payload kind")),
    }
}

/// `momGeneration` queue (spec §4.I), for minutes requested asynchronously
/// rather than via the synchronous `/generate` HTTP call.
async fn run_mom_job(state: AppState, job: meeting_types::Job) -> Result<(), HandlerError> {
    let JobPayload::MomGeneration { meeting_id, .. } = job.payload else {
        return Err(HandlerError::permanent("momGeneration job carried the wrong payload kind"));
    };
    let Some(llm) = &state.llm else {
        return Err(HandlerError::permanent("minutes generation is not configured"));
    };

    let meeting = meeting_repository::meetings::find_by_meeting_id(&state.db, &meeting_id)
        .await
        .map_err(|e| HandlerError::retryable(e.to_string()))?;
    let Some(meeting) = meeting else {
        return Ok(());
    };

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
        attendees.push(meeting_types::minutes::Attendee {
            user_id: participant.user_id.clone(),
            name,
            email,
            role: format!("{:?}", participant.role).to_lowercase(),
            joined_at: participant.joined_at,
            left_at: participant.left_at,
        });
    }

    let input = minutes_pipeline::GenerateMinutesInput {
        meeting_id: meeting.meeting_id.clone(),
        title: meeting.title.clone(),
        start_time: meeting.created_at,
        end_time: Some(meeting.updated_at),
        duration_minutes: meeting
            .statistics
            .total_duration
            .unwrap_or(meeting.duration_minutes as i64),
        attendees,
        transcripts: &meeting.transcripts,
    };
    let minutes = minutes_pipeline::generate(llm, input).await;
    meeting_repository::minutes::upsert(&state.db, &minutes)
        .await
        .map_err(|e| HandlerError::retryable(e.to_string()))
}

/// `recording` queue (spec §4.C): post-processing stub for a freshly
/// uploaded recording. The server never transcodes media itself (spec §1
/// Non-goals); this only marks the artifact ready once storage confirms it.
async fn run_recording_job(_state: AppState, job: meeting_types::Job) -> Result<(), HandlerError> {
    let JobPayload::RecordingPostProcess { meeting_id, recording_url } = job.payload else {
        return Err(HandlerError::permanent("recording job carried the wrong payload kind"));
    };
    tracing::info!(meeting_id = %meeting_id, recording_url = %recording_url, "recording post-process acknowledged");
    Ok(())
}
