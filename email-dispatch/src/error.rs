use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("failed to build SMTP transport: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("invalid recipient address: {0}")]
    Address(#[from] lettre::address::AddressError),
}

impl EmailError {
    /// The worker retries transport-level failures; permanent SMTP 4xx/5xx
    /// responses are not retried (spec §4.J).
    pub fn is_retryable(&self) -> bool {
        matches!(self, EmailError::Transport(_))
    }
}
