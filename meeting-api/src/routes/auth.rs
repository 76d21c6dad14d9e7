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

//! `/api/auth/*` — registration, login, guest sessions, profile (spec §6).

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use meeting_types::domain::{User, UserPreferences, UserProfile, UserStatistics};
use meeting_types::ApiResponse;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::password;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub is_guest: bool,
    pub profile: UserProfile,
    pub preferences: UserPreferences,
    pub statistics: UserStatistics,
}

impl From<&User> for UserView {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.clone(),
            username: u.username.clone(),
            email: u.email.clone(),
            is_guest: u.is_guest,
            profile: u.profile.clone(),
            preferences: u.preferences.clone(),
            statistics: u.statistics.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserView,
    pub token: String,
}

fn validate_username(username: &str) -> Result<(), AppError> {
    let len = username.chars().count();
    if !(3..=30).contains(&len) {
        return Err(AppError::bad_request(
            "username must be between 3 and 30 characters",
        ));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub profile: Option<UserProfile>,
}

/// `POST /api/auth/register` (spec §6): `{username, email, password, profile?}`.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, AppError> {
    validate_username(&req.username)?;
    if req.password.len() < 8 {
        return Err(AppError::bad_request(
            "password must be at least 8 characters",
        ));
    }
    let email = req.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(AppError::bad_request("invalid email address"));
    }

    let hash = password::hash(&req.password)
        .map_err(|e| AppError::from(meeting_types::ApiError::internal(e.to_string())))?;

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        username: req.username,
        email,
        password_hash: Some(hash),
        is_guest: false,
        profile: req.profile.unwrap_or_default(),
        preferences: UserPreferences::default(),
        statistics: UserStatistics::default(),
        is_active: true,
        last_seen_at: Utc::now(),
    };

    meeting_repository::users::insert(&state.db, &user)
        .await
        .map_err(|e| match e {
            meeting_repository::RepositoryError::Duplicate(_) => {
                AppError::from(meeting_types::ApiError::conflict(
                    "username or email already registered",
                ))
            }
            other => other.into(),
        })?;

    let token = state.tokens.issue(&user.id, &user.username, false);
    Ok(Json(ApiResponse::ok(
        "registered",
        AuthResponse {
            user: UserView::from(&user),
            token,
        },
    )))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `POST /api/auth/login` (spec §6). Rate-limited per client IP in front of
/// this handler by the global middleware (spec §8 scenario 5).
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, AppError> {
    let email = req.email.trim().to_lowercase();
    let user = meeting_repository::users::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| AppError::unauthenticated("invalid email or password"))?;

    if user.is_guest {
        return Err(AppError::unauthenticated("invalid email or password"));
    }
    let matches = user
        .password_hash
        .as_deref()
        .is_some_and(|h| password::verify(&req.password, h));
    if !matches {
        return Err(AppError::unauthenticated("invalid email or password"));
    }
    if !user.is_active {
        return Err(AppError::forbidden("account is deactivated"));
    }

    let token = state.tokens.issue(&user.id, &user.username, false);
    Ok(Json(ApiResponse::ok(
        "logged in",
        AuthResponse {
            user: UserView::from(&user),
            token,
        },
    )))
}

#[derive(Debug, Deserialize)]
pub struct GuestRequest {
    pub username: String,
}

/// `POST /api/auth/guest` (spec §6, SPEC_FULL §C): synthesizes a unique
/// guest identity rather than accepting an email/password.
pub async fn guest(
    State(state): State<AppState>,
    Json(req): Json<GuestRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, AppError> {
    validate_username(&req.username)?;

    let mut user = None;
    for _ in 0..5 {
        let (_, synthetic_email) = User::synthesize_guest_identity();
        let candidate = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: req.username.clone(),
            email: synthetic_email,
            password_hash: None,
            is_guest: true,
            profile: UserProfile::default(),
            preferences: UserPreferences::default(),
            statistics: UserStatistics::default(),
            is_active: true,
            last_seen_at: Utc::now(),
        };
        match meeting_repository::users::insert(&state.db, &candidate).await {
            Ok(()) => {
                user = Some(candidate);
                break;
            }
            Err(meeting_repository::RepositoryError::Duplicate(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    let user = user.ok_or_else(|| {
        AppError::from(meeting_types::ApiError::internal(
            "failed to allocate a unique guest identity",
        ))
    })?;

    let token = state.tokens.issue(&user.id, &user.username, true);
    Ok(Json(ApiResponse::ok(
        "guest session created",
        AuthResponse {
            user: UserView::from(&user),
            token,
        },
    )))
}

/// `GET /api/auth/me` (spec §6).
pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<UserView>>, AppError> {
    let user = meeting_repository::users::find_by_id(&state.db, &auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;
    Ok(Json(ApiResponse::ok("ok", UserView::from(&user))))
}

#[derive(Debug, Deserialize, Default)]
pub struct ProfileUpdateRequest {
    #[serde(default)]
    pub profile: Option<ProfilePatch>,
    #[serde(default)]
    pub preferences: Option<PreferencesPatch>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ProfilePatch {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PreferencesPatch {
    pub theme: Option<String>,
    pub default_mute_on_entry: Option<bool>,
}

/// `PUT /api/auth/profile` (spec §6): shallow-merge `profile`/`preferences`,
/// the same "replace key-by-key" rule settings updates use (SPEC_FULL §C).
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ProfileUpdateRequest>,
) -> Result<Json<ApiResponse<UserView>>, AppError> {
    let mut user = meeting_repository::users::find_by_id(&state.db, &auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    if let Some(patch) = req.profile {
        if let Some(v) = patch.display_name {
            user.profile.display_name = Some(v);
        }
        if let Some(v) = patch.avatar_url {
            user.profile.avatar_url = Some(v);
        }
        if let Some(v) = patch.bio {
            user.profile.bio = Some(v);
        }
    }
    if let Some(patch) = req.preferences {
        if let Some(v) = patch.theme {
            user.preferences.theme = Some(v);
        }
        if let Some(v) = patch.default_mute_on_entry {
            user.preferences.default_mute_on_entry = Some(v);
        }
    }

    meeting_repository::users::replace(&state.db, &user).await?;
    Ok(Json(ApiResponse::ok("profile updated", UserView::from(&user))))
}

/// `POST /api/auth/logout` (spec §6): updates `lastSeenAt`.
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<()>>, AppError> {
    meeting_repository::users::touch_last_seen(&state.db, &auth.user_id, Utc::now()).await?;
    Ok(Json(ApiResponse::ok_empty("logged out")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_length_bounds_are_enforced() {
        assert!(validate_username("ab").is_err());
        assert!(validate_username("abc").is_ok());
        assert!(validate_username(&"a".repeat(30)).is_ok());
        assert!(validate_username(&"a".repeat(31)).is_err());
    }
}
