//! Client for the Gemini `generateContent` REST API.
//!
//! Four single-turn request shapes (fast, thinking, search-grounded, and
//! image+prompt) plus an explicit multi-turn [`ChatSession`]. Every
//! operation is stateless except the chat session, which owns its own
//! history. Failures surface as [`GeminiError`]; callers are expected to
//! present a generic retryable message and log the cause. No retries are
//! attempted at this layer.

mod chat;

pub use chat::ChatSession;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use mime_guess::mime;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GeminiConfig;

/// Low-latency profile for the symptom checker, chat, and health summaries.
pub const FAST_MODEL: &str = "gemini-2.5-flash";
/// Extended-reasoning profile for the research assistant.
pub const THINKING_MODEL: &str = "gemini-3-pro-preview";
/// Bounded extra-computation allowance for thinking requests.
pub const THINKING_BUDGET: u32 = 16_000;

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("no text in response candidates")]
    EmptyResponse,
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// A grounding citation returned alongside search-grounded text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSource {
    pub uri: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Text plus the citations that grounded it. `sources` may be empty.
#[derive(Debug, Clone)]
pub struct GroundedReply {
    pub text: String,
    pub sources: Vec<WebSource>,
}

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &GeminiConfig) -> Self {
        Self::new(config.api_key.clone(), config.base_url.clone())
    }

    /// Single-turn, low-latency completion.
    pub async fn complete_fast(&self, prompt: &str) -> Result<String, GeminiError> {
        let request = GenerateContentRequest::single_turn(prompt);
        let response = self.generate(FAST_MODEL, &request).await?;
        extract_text(&response)
    }

    /// Single-turn completion on the extended-reasoning profile.
    pub async fn complete_thinking(&self, prompt: &str) -> Result<String, GeminiError> {
        let mut request = GenerateContentRequest::single_turn(prompt);
        request.generation_config = Some(GenerationConfig {
            thinking_config: Some(ThinkingConfig {
                thinking_budget: THINKING_BUDGET,
            }),
        });
        let response = self.generate(THINKING_MODEL, &request).await?;
        extract_text(&response)
    }

    /// Single-turn completion augmented with live web search.
    pub async fn complete_grounded(&self, prompt: &str) -> Result<GroundedReply, GeminiError> {
        let mut request = GenerateContentRequest::single_turn(prompt);
        request.tools = Some(vec![Tool {
            google_search: GoogleSearch {},
        }]);
        let response = self.generate(FAST_MODEL, &request).await?;
        let text = extract_text(&response)?;
        let sources = extract_sources(&response);
        Ok(GroundedReply { text, sources })
    }

    /// Pair an image with a prompt in one multi-part request. The upload is
    /// validated locally; nothing is sent for a non-image or empty file.
    pub async fn analyze_image(
        &self,
        prompt: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, GeminiError> {
        let mime_type = validate_image(file_name, bytes)?;
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type,
                            data: BASE64_STANDARD.encode(bytes),
                        },
                    },
                    Part::text(prompt),
                ],
            }],
            system_instruction: None,
            tools: None,
            generation_config: None,
        };
        let response = self.generate(FAST_MODEL, &request).await?;
        extract_text(&response)
    }

    /// Plain-English summary of a patient's vitals and lab results.
    pub async fn summarize_health_record(
        &self,
        record: &serde_json::Value,
    ) -> Result<String, GeminiError> {
        let prompt = format!(
            "You are a medical AI assistant for a patient portal. \
             Analyze the following patient health data (Lab results, Vitals). \
             Provide a summary in plain English that a patient can understand. \
             Highlight any values that are outside the normal range and suggest \
             general lifestyle tips.\n\nData: {}\n\n\
             Keep it reassuring but factual. Add a disclaimer that this is \
             AI-generated and not a doctor's diagnosis.",
            record
        );
        self.complete_fast(&prompt).await
    }

    /// Begin a fresh multi-turn chat session. Each call discards nothing —
    /// the returned handle simply starts with empty history, so replacing
    /// an old handle is the conversation reset.
    pub fn start_chat(&self) -> ChatSession {
        ChatSession::new(self.clone())
    }

    pub(crate) async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        let response = self.http.post(url).json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorWrapper>(&body)
                .ok()
                .and_then(|wrapper| wrapper.error.message)
                .unwrap_or(body);
            tracing::warn!(status, "Gemini API error: {}", message);
            return Err(GeminiError::Api { status, message });
        }

        Ok(response.json().await?)
    }
}

/// Reject unreadable or non-image uploads before any network call.
pub fn validate_image(file_name: &str, bytes: &[u8]) -> Result<String, GeminiError> {
    if bytes.is_empty() {
        return Err(GeminiError::InvalidImage("file is empty".to_string()));
    }
    let guessed = mime_guess::from_path(file_name)
        .first()
        .ok_or_else(|| GeminiError::InvalidImage("unrecognized file type".to_string()))?;
    if guessed.type_() != mime::IMAGE {
        return Err(GeminiError::InvalidImage(format!(
            "{} is not an image",
            guessed.essence_str()
        )));
    }
    Ok(guessed.essence_str().to_string())
}

// Wire types for generateContent

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    pub(crate) fn single_turn(prompt: &str) -> Self {
        Self {
            contents: vec![Content::user(prompt)],
            system_instruction: None,
            tools: None,
            generation_config: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub(crate) fn user(text: &str) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part::text(text)],
        }
    }

    pub(crate) fn model(text: &str) -> Self {
        Self {
            role: "model".to_string(),
            parts: vec![Part::text(text)],
        }
    }

    pub(crate) fn system(text: &str) -> Self {
        Self {
            role: "system".to_string(),
            parts: vec![Part::text(text)],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub(crate) enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl Part {
    fn text(text: &str) -> Self {
        Part::Text {
            text: text.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct Tool {
    #[serde(rename = "googleSearch")]
    pub google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
pub(crate) struct GoogleSearch {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ThinkingConfig {
    pub thinking_budget: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    pub content: Option<CandidateContent>,
    #[serde(default)]
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GroundingChunk {
    pub web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

pub(crate) fn extract_text(response: &GenerateContentResponse) -> Result<String, GeminiError> {
    response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .and_then(|content| {
            content
                .parts
                .iter()
                .find_map(|part| part.text.clone())
        })
        .ok_or(GeminiError::EmptyResponse)
}

fn extract_sources(response: &GenerateContentResponse) -> Vec<WebSource> {
    response
        .candidates
        .first()
        .and_then(|candidate| candidate.grounding_metadata.as_ref())
        .map(|metadata| {
            metadata
                .grounding_chunks
                .iter()
                .filter_map(|chunk| chunk.web.clone())
                .collect()
        })
        .unwrap_or_default()
}
