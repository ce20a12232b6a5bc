//! Gemini API client for text answers.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Anything that can turn a prompt and a persona into text.
pub trait TextGenerator: Send + Sync {
    fn generate(
        &self,
        prompt: &str,
        persona: &str,
    ) -> impl Future<Output = Result<String, GeminiError>> + Send;
}

/// Every way a generation call can fail. Callers treat them all alike.
#[derive(Debug)]
pub enum GeminiError {
    Http(String),
    Status { status: u16, body: String },
    Parse(String),
    Api(String),
    MissingText,
}

impl std::fmt::Display for GeminiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeminiError::Http(e) => write!(f, "HTTP error: {e}"),
            GeminiError::Status { status, body } => write!(f, "API error {status}: {body}"),
            GeminiError::Parse(e) => write!(f, "Failed to parse response: {e}"),
            GeminiError::Api(e) => write!(f, "Gemini error: {e}"),
            GeminiError::MissingText => write!(f, "No text in response"),
        }
    }
}

impl std::error::Error for GeminiError {}

pub struct GeminiClient {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    system_instruction: Content,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

impl Content {
    fn text(text: &str) -> Self {
        Self {
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Deserialize, Debug)]
struct ApiError {
    message: String,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self, GeminiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GeminiError::Http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key,
            model,
            client,
        })
    }

    fn url(&self) -> String {
        format!("{}/{}:generateContent?key={}", GEMINI_API_BASE, self.model, self.api_key)
    }
}

impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str, persona: &str) -> Result<String, GeminiError> {
        let preview: String = prompt.chars().take(80).collect();
        info!("🧠 Asking Gemini: {}", preview);

        let request = GenerateRequest {
            contents: vec![Content::text(prompt)],
            system_instruction: Content::text(persona),
        };

        // Timeouts surface here as HTTP errors.
        let response = self
            .client
            .post(self.url())
            .json(&request)
            .send()
            .await
            .map_err(|e| GeminiError::Http(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GeminiError::Http(format!("Failed to read response: {}", e.without_url())))?;

        debug!("Gemini response status: {status}");

        if !status.is_success() {
            return Err(GeminiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = extract_text(&body)?;
        info!("🧠 Gemini answered ({} chars)", text.len());
        Ok(text)
    }
}

/// Pull the first candidate's first text part out of a response body.
fn extract_text(body: &str) -> Result<String, GeminiError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| GeminiError::Parse(e.to_string()))?;

    if let Some(error) = parsed.error {
        return Err(GeminiError::Api(error.message));
    }

    let text = parsed
        .candidates
        .as_deref()
        .and_then(|c| c.first())
        .and_then(|c| c.content.as_ref())
        .and_then(|c| c.parts.first())
        .and_then(|p| p.text.as_deref())
        .map(str::trim)
        .unwrap_or_default();

    if text.is_empty() {
        return Err(GeminiError::MissingText);
    }
    Ok(text.to_string())
}
