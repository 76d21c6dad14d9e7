use meeting_types::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("meetingId {0} already exists")]
    Duplicate(String),
    #[error("stored document failed to deserialize: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("optimistic write lost the race after {0} retries")]
    VersionConflict(u32),
    /// A domain rule inside an `update_atomic` closure rejected the mutation
    /// (e.g. `joinMeeting` on a full or terminal meeting). Carries the
    /// original `ApiError` through so its `kind` survives the round trip.
    #[error("{0}")]
    Domain(ApiError),
}

impl From<ApiError> for RepositoryError {
    fn from(err: ApiError) -> Self {
        RepositoryError::Domain(err)
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
            RepositoryError::Duplicate(id) => {
                ApiError::conflict(&format!("meetingId {id} already exists"))
            }
            RepositoryError::VersionConflict(_) => {
                ApiError::conflict("meeting was modified concurrently, retry")
            }
            RepositoryError::Domain(err) => err,
            other => ApiError::internal(other.to_string()),
        }
    }
}
