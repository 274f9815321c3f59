use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::grounding::{block_reason, extract_grounded_summary, response_text};
use super::types::{
    ApiEnvelope, ApiError, GenerateContentRequest, GenerateContentResponse, GroundedSummary,
    ImageParameters, ImagePrompt, OutputOptions, PredictRequest, PredictResponse,
};
use crate::config::{ApiKey, Config};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
/// Article drafts and image generation routinely take tens of seconds.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("GEMINI_API_KEY not set. Get one at https://aistudio.google.com/apikey")]
    ApiKeyNotSet,

    #[error("API rate limit exceeded. Please retry later.")]
    RateLimited,

    #[error("API quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("Response blocked by safety filters ({0})")]
    Blocked(String),

    #[error("Malformed model response: {0}")]
    Malformed(String),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl GeminiError {
    pub fn is_blocked(&self) -> bool {
        matches!(self, GeminiError::Blocked(_))
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: ApiKey,
    model: String,
    image_model: String,
    base_url: String,
    initial_backoff_ms: u64,
}

impl GeminiClient {
    pub fn new(http: Client, config: &Config) -> Result<Self, GeminiError> {
        let api_key = config.api_key.clone().ok_or(GeminiError::ApiKeyNotSet)?;
        Ok(Self {
            http,
            api_key,
            model: config.model.clone(),
            image_model: config.image_model.clone(),
            base_url: API_BASE.to_string(),
            initial_backoff_ms: INITIAL_BACKOFF_MS,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            api_key: ApiKey::new("test-key"),
            model: crate::config::DEFAULT_MODEL.to_string(),
            image_model: crate::config::DEFAULT_IMAGE_MODEL.to_string(),
            base_url: base_url.to_string(),
            initial_backoff_ms: 1,
        }
    }

    /// Runs a `generateContent` call and returns the raw response.
    pub async fn generate(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let response: GenerateContentResponse = self
            .post_with_retries(&self.model, "generateContent", request)
            .await?;
        debug!(model = %self.model, "gemini generate complete");
        Ok(response)
    }

    /// Grounded answer plus the web sources it cites.
    pub async fn generate_grounded(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GroundedSummary, GeminiError> {
        let response = self.generate(request).await?;
        let grounded = extract_grounded_summary(&response);
        if grounded.summary.is_empty()
            && let Some(reason) = block_reason(&response)
        {
            warn!(%reason, "grounded answer blocked");
            return Err(GeminiError::Blocked(reason));
        }
        Ok(grounded)
    }

    pub async fn generate_text(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<String, GeminiError> {
        let response = self.generate(request).await?;
        let text = response_text(&response);
        if text.trim().is_empty() {
            return Err(match block_reason(&response) {
                Some(reason) => GeminiError::Blocked(reason),
                None => GeminiError::Malformed("empty response".to_string()),
            });
        }
        Ok(text)
    }

    /// Structured output: the request should carry a JSON response schema.
    pub async fn generate_json<T: DeserializeOwned>(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<T, GeminiError> {
        let text = self.generate_text(request).await?;
        serde_json::from_str(text.trim()).map_err(|e| GeminiError::Malformed(e.to_string()))
    }

    /// Generates one 3:4 JPEG and returns its base64 payload.
    /// `Ok(None)` means the service returned no image (typically filtered).
    pub async fn generate_image(&self, prompt: &str) -> Result<Option<String>, GeminiError> {
        let request = PredictRequest {
            instances: vec![ImagePrompt {
                prompt: prompt.to_string(),
            }],
            parameters: ImageParameters {
                sample_count: 1,
                aspect_ratio: "3:4".to_string(),
                output_options: OutputOptions {
                    mime_type: "image/jpeg".to_string(),
                },
            },
        };

        let response: PredictResponse = self
            .post_with_retries(&self.image_model, "predict", &request)
            .await?;

        let Some(encoded) = response
            .predictions
            .unwrap_or_default()
            .into_iter()
            .find_map(|p| p.bytes_base64_encoded)
            .filter(|b| !b.is_empty())
        else {
            return Ok(None);
        };

        BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| GeminiError::Malformed(format!("invalid image payload: {e}")))?;
        debug!(model = %self.image_model, bytes = encoded.len(), "image generated");
        Ok(Some(encoded))
    }

    async fn post_with_retries<B, R>(
        &self,
        model: &str,
        method: &str,
        body: &B,
    ) -> Result<R, GeminiError>
    where
        B: Serialize,
        R: DeserializeOwned + ApiEnvelope,
    {
        let mut last_err = None;
        for attempt in 0..MAX_RETRIES {
            match self.post(model, method, body).await {
                Ok(response) => return Ok(response),
                Err(e) if is_retriable(&e) => {
                    last_err = Some(e);
                    if attempt + 1 < MAX_RETRIES {
                        let delay_ms = jittered_backoff(self.initial_backoff_ms, attempt);
                        debug!(
                            attempt = attempt + 1,
                            delay_ms, "retrying after transient error"
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or(GeminiError::RateLimited))
    }

    async fn post<B, R>(&self, model: &str, method: &str, body: &B) -> Result<R, GeminiError>
    where
        B: Serialize,
        R: DeserializeOwned + ApiEnvelope,
    {
        let url = format!("{}/{model}:{method}", self.base_url);

        debug_assert!(
            url.starts_with("https://") || cfg!(test),
            "API key must only be sent over HTTPS"
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose())
            .header("User-Agent", crate::USER_AGENT)
            .json(body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!(%model, "Gemini API rate limited");
            return Err(GeminiError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if let Ok(body) = serde_json::from_str::<R>(&text)
                && let Some(err) = body.api_error()
            {
                let classified = classify_api_error(err);
                warn!(error = %classified, %model, "Gemini API error");
                return Err(classified);
            }
            let end = text.floor_char_boundary(200);
            warn!(status = %status, %model, "Gemini API error (no structured body)");
            return Err(GeminiError::Api {
                code: status.as_u16(),
                message: format!("HTTP {status}: {}", &text[..end]),
            });
        }

        let body: R = response.json().await?;
        if let Some(err) = body.api_error() {
            let classified = classify_api_error(err);
            warn!(error = %classified, %model, "Gemini API error in 200 response");
            return Err(classified);
        }

        Ok(body)
    }
}

fn is_retriable(e: &GeminiError) -> bool {
    matches!(
        e,
        GeminiError::RateLimited
            | GeminiError::Api {
                code: 500..=599,
                ..
            }
    )
}

/// Equal jitter backoff: base/2 + rand(0, base/2).
fn jittered_backoff(initial_ms: u64, attempt: u32) -> u64 {
    let base = initial_ms * 2u64.pow(attempt);
    let half = base / 2;
    half + fastrand::u64(..half.max(1))
}

fn classify_api_error(err: &ApiError) -> GeminiError {
    let message = err
        .message
        .clone()
        .unwrap_or_else(|| "Unknown error".to_string());

    match err.code {
        Some(429) => GeminiError::RateLimited,
        Some(403) => GeminiError::QuotaExhausted(message),
        Some(code) => GeminiError::Api { code, message },
        None => GeminiError::Api {
            code: 0,
            message: format!("Unknown error (no status code): {message}"),
        },
    }
}
