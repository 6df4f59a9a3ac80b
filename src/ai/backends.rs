use crate::ai::analyzer::format_prompt;
use crate::error::AnalysisError;
use crate::vitals::VitalsSnapshot;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Trait for AI assessment backend implementations
pub trait AnalysisBackend: Send + Sync {
    fn assess<'a>(
        &'a self,
        vitals: &'a VitalsSnapshot,
    ) -> Pin<Box<dyn Future<Output = Result<String, AnalysisError>> + Send + 'a>>;
}

/// Gemini backend for cloud-based assessment
///
/// Communicates with the Google Generative Language API. Requires an API
/// key and internet connection.
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

/// Request format for the generateContent endpoint
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

/// Response format from the generateContent endpoint
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

impl GeminiBackend {
    /// Create a new Gemini backend
    ///
    /// # Arguments
    /// * `api_key` - Google AI API key; empty means not configured
    /// * `model` - Model name to use (e.g., "gemini-pro")
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(
            api_key,
            model,
            "https://generativelanguage.googleapis.com".to_string(),
        )
    }

    /// Create a new Gemini backend with a custom base URL
    ///
    /// Allows pointing at a proxy or a compatible endpoint.
    pub fn with_base_url(api_key: String, model: String, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            model,
            base_url,
        }
    }

    /// Format the generateContent endpoint URL
    fn api_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            self.api_key
        )
    }
}

impl AnalysisBackend for GeminiBackend {
    fn assess<'a>(
        &'a self,
        vitals: &'a VitalsSnapshot,
    ) -> Pin<Box<dyn Future<Output = Result<String, AnalysisError>> + Send + 'a>> {
        Box::pin(async move {
            if self.api_key.is_empty() {
                return Err(AnalysisError::MissingApiKey);
            }

            let request = GeminiRequest {
                contents: vec![GeminiContent {
                    parts: vec![GeminiPart {
                        text: format_prompt(vitals),
                    }],
                }],
            };

            let response = self
                .client
                .post(self.api_url())
                .json(&request)
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(AnalysisError::BackendError(format!(
                    "Gemini API returned error {}: {}",
                    status, error_text
                )));
            }

            let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
                AnalysisError::InvalidResponse(format!("Failed to parse Gemini response: {}", e))
            })?;

            if let Some(error) = gemini_response.error {
                return Err(AnalysisError::BackendError(format!(
                    "Gemini error: {}",
                    error.message
                )));
            }

            let text = gemini_response
                .candidates
                .first()
                .and_then(|c| c.content.parts.first())
                .map(|p| p.text.clone())
                .ok_or_else(|| {
                    AnalysisError::InvalidResponse(
                        "No candidates in Gemini response".to_string(),
                    )
                })?;

            Ok(text)
        })
    }
}

/// Mock backend for testing and development
///
/// Provides configurable responses and tracks invocations, so tests can
/// assert on both the output and the vitals that were submitted.
pub struct MockBackend {
    responses: Vec<Result<String, AnalysisError>>,
    current_index: std::sync::Arc<std::sync::Mutex<usize>>,
    call_count: std::sync::Arc<std::sync::Mutex<usize>>,
    last_vitals: std::sync::Arc<std::sync::Mutex<Option<VitalsSnapshot>>>,
}

impl MockBackend {
    /// Create a mock backend with a single response
    pub fn with_response(response: Result<String, AnalysisError>) -> Self {
        Self::with_responses(vec![response])
    }

    /// Create a mock backend with multiple responses
    ///
    /// Responses are returned in order and cycle after the last one.
    pub fn with_responses(responses: Vec<Result<String, AnalysisError>>) -> Self {
        Self {
            responses,
            current_index: std::sync::Arc::new(std::sync::Mutex::new(0)),
            call_count: std::sync::Arc::new(std::sync::Mutex::new(0)),
            last_vitals: std::sync::Arc::new(std::sync::Mutex::new(None)),
        }
    }

    /// Create a mock backend that always returns a fixed assessment
    pub fn success(text: &str) -> Self {
        Self::with_response(Ok(text.to_string()))
    }

    /// Create a mock backend that always fails
    pub fn error(message: String) -> Self {
        Self::with_response(Err(AnalysisError::BackendError(message)))
    }

    /// Create a mock backend that reports a missing API key
    pub fn missing_key() -> Self {
        Self::with_response(Err(AnalysisError::MissingApiKey))
    }

    /// Get the number of times assess() has been called
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Get the last vitals snapshot passed to assess()
    pub fn last_vitals(&self) -> Option<VitalsSnapshot> {
        self.last_vitals.lock().unwrap().clone()
    }
}

impl AnalysisBackend for MockBackend {
    fn assess<'a>(
        &'a self,
        vitals: &'a VitalsSnapshot,
    ) -> Pin<Box<dyn Future<Output = Result<String, AnalysisError>> + Send + 'a>> {
        Box::pin(async move {
            *self.call_count.lock().unwrap() += 1;
            *self.last_vitals.lock().unwrap() = Some(vitals.clone());

            let mut index = self.current_index.lock().unwrap();
            let response_index = *index % self.responses.len();
            *index += 1;

            match &self.responses[response_index] {
                Ok(text) => Ok(text.clone()),
                Err(AnalysisError::MissingApiKey) => Err(AnalysisError::MissingApiKey),
                Err(AnalysisError::BackendError(msg)) => {
                    Err(AnalysisError::BackendError(msg.clone()))
                }
                Err(AnalysisError::InvalidResponse(msg)) => {
                    Err(AnalysisError::InvalidResponse(msg.clone()))
                }
                Err(e) => Err(AnalysisError::BackendError(e.to_string())),
            }
        })
    }
}
