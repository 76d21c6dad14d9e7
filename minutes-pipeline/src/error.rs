use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("LLM request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("LLM response was not valid JSON after fence-stripping: {0}")]
    Parse(serde_json::Error),
}
