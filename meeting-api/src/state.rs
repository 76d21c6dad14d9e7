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

//! Shared application state passed to every Axum handler via `State`.

use std::sync::Arc;

use job_queue::JobQueue;
use minutes_pipeline::LlmClient;
use presence_cache::PresenceCache;
use sqlx::PgPool;
use token_verifier::TokenVerifier;

use crate::config::{Config, EmailConfig, TurnConfig};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub tokens: Arc<TokenVerifier>,
    /// `None` when Redis was unreachable at startup; every presence-cache
    /// call already degrades gracefully, so this is only absent when we
    /// never managed to dial out at all (spec §4.B degradation policy).
    pub cache: Option<PresenceCache>,
    pub queue: JobQueue,
    pub llm: Option<LlmClient>,
    pub email: Option<email_dispatch::EmailDispatcher>,
    pub turn: Option<TurnConfig>,
    pub client_url: String,
}

impl AppState {
    pub fn new(
        db: PgPool,
        config: &Config,
        cache: Option<PresenceCache>,
        queue: JobQueue,
    ) -> Result<Self, String> {
        let llm = config
            .gemini_api_key
            .clone()
            .map(LlmClient::new);

        let email = config
            .email
            .as_ref()
            .map(|e: &EmailConfig| {
                email_dispatch::EmailDispatcher::new(&e.host, &e.user, &e.pass, &e.user)
            })
            .transpose()
            .map_err(|e| format!("failed to build SMTP transport: {e}"))?;

        Ok(Self {
            db,
            tokens: Arc::new(TokenVerifier::new(config.jwt_secret.clone())),
            cache,
            queue,
            llm,
            email,
            turn: config.turn.clone(),
            client_url: config.client_url.clone(),
        })
    }
}
