//! Remote LLM call (spec §4.I step 2). Shaped as a Gemini-style
//! `generateContent` request since `GEMINI_API_KEY` is the env var spec §6
//! names for this integration; the server never hosts the model itself.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::PipelineError;

const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "topK")]
    top_k: u32,
    #[serde(rename = "topP")]
    top_p: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata", default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Deserialize)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: String,
}

#[derive(Deserialize, Default)]
struct UsageMetadata {
    #[serde(rename = "totalTokenCount", default)]
    total_token_count: i64,
}

pub struct LlmResult {
    pub raw_json: JsonValue,
    pub tokens_used: i64,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Submit the prompt with the fixed sampling parameters spec §4.I
    /// mandates, and parse the response as JSON after stripping Markdown
    /// code fences the model commonly wraps its output in.
    pub async fn generate_minutes(&self, prompt: &str) -> Result<LlmResult, PipelineError> {
        let body = GenerateContentRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.3,
                top_k: 40,
                top_p: 0.95,
                max_output_tokens: 8192,
            },
        };

        let response: GenerateContentResponse = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let text = response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .unwrap_or_default();

        let stripped = strip_markdown_fences(text);
        let raw_json: JsonValue =
            serde_json::from_str(&stripped).map_err(PipelineError::Parse)?;

        Ok(LlmResult {
            raw_json,
            tokens_used: response
                .usage_metadata
                .map(|u| u.total_token_count)
                .unwrap_or(0),
        })
    }
}

/// Strip a leading ` ```json ` / ` ``` ` fence and trailing ` ``` `, if
/// present (spec §4.I step 3).
pub fn strip_markdown_fences(text: &str) -> String {
    let trimmed = text.trim();
    let without_leading = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_leading
        .strip_suffix("```")
        .unwrap_or(without_leading)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let text = "```json\n{\"summary\": \"ok\"}\n```";
        assert_eq!(strip_markdown_fences(text), "{\"summary\": \"ok\"}");
    }

    #[test]
    fn strips_bare_fence() {
        let text = "```\n{\"summary\": \"ok\"}\n```";
        assert_eq!(strip_markdown_fences(text), "{\"summary\": \"ok\"}");
    }

    #[test]
    fn leaves_unfenced_text_untouched() {
        let text = "{\"summary\": \"ok\"}";
        assert_eq!(strip_markdown_fences(text), text);
    }
}
