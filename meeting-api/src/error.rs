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

//! Application error type that implements Axum's `IntoResponse`.
//!
//! Wraps the transport-agnostic `meeting_types::ApiError` (spec §7 "Error
//! kinds") and maps its `ErrorKind` to an HTTP status code. Every error is
//! returned as `ApiResponse<()>` with `success: false`, matching spec §6's
//! "4xx carries `{success:false, message}`".

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use meeting_types::{ApiError, ApiResponse, ErrorKind};

#[derive(Debug)]
pub struct AppError(pub ApiError);

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(ApiError::bad_request(message))
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self(ApiError::unauthenticated(message))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self(ApiError::forbidden(message))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self(ApiError::not_found(message))
    }
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl From<meeting_repository::RepositoryError> for AppError {
    fn from(err: meeting_repository::RepositoryError) -> Self {
        Self(err.into())
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Gone => StatusCode::GONE,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::FailedPrecondition => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.0.kind == ErrorKind::Internal {
            tracing::error!(detail = ?self.0.engineering_error, "internal error");
        }
        let status = status_for(self.0.kind);
        let body = ApiResponse::<()> {
            success: false,
            message: self.0.message,
            data: None,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body(resp: Response) -> (StatusCode, ApiResponse<()>) {
        let status = resp.status();
        let bytes = Body::new(resp.into_body())
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        (status, serde_json::from_slice(&bytes).expect("deserialize"))
    }

    #[tokio::test]
    async fn unauthenticated_produces_401() {
        let err = AppError::unauthenticated("missing token");
        let (status, body) = read_body(err.into_response()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(!body.success);
    }

    #[tokio::test]
    async fn not_found_produces_404() {
        let err = AppError::not_found("meeting ABC-123-XYZ not found");
        let (status, _) = read_body(err.into_response()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn gone_produces_410() {
        let err = AppError(ApiError::gone("meeting has ended"));
        let (status, _) = read_body(err.into_response()).await;
        assert_eq!(status, StatusCode::GONE);
    }

    #[tokio::test]
    async fn internal_redacts_message_in_response_body() {
        let err = AppError(ApiError::internal("connection refused"));
        let (status, body) = read_body(err.into_response()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, "Internal server error");
    }
}
