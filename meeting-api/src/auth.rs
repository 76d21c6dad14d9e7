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

//! Axum extractor that authenticates the caller via a bearer access token
//! (spec §4.A, §6 `Authorization: Bearer <token>` on every bearer-auth
//! route).

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use token_verifier::AuthOutcome;

use crate::error::AppError;
use crate::state::AppState;

/// The authenticated caller, resolved all the way to an active user record.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
    pub is_guest: bool,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer(parts)
            .ok_or_else(|| AppError::unauthenticated("missing bearer token"))?;

        let claims = state
            .tokens
            .decode(&token)
            .map_err(|_| AppError::unauthenticated("invalid or expired token"))?;

        let user = meeting_repository::users::find_by_id(&state.db, &claims.sub).await?;
        let outcome = token_verifier::authenticate(&state.tokens, &token, |_| {
            user.as_ref().map(|u| u.is_active)
        });

        match outcome {
            AuthOutcome::Authenticated(identity) => Ok(AuthUser {
                user_id: identity.user_id,
                username: identity.username,
                is_guest: identity.is_guest,
            }),
            AuthOutcome::Forbidden => Err(AppError::forbidden("account is deactivated")),
            AuthOutcome::Unauthenticated => Err(AppError::unauthenticated("invalid or expired token")),
        }
    }
}

fn extract_bearer(parts: &Parts) -> Option<String> {
    let auth = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = auth.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
