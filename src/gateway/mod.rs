//! Remote operations against the generative-AI backend.
//!
//! Only `grounded_summary` reports failure. Every other operation turns its
//! own errors into a fallback value so a search can degrade instead of abort.

mod lang;
mod prompts;

pub use lang::Lang;

use chrono::Datelike;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::gemini::types::{GenerateContentRequest, GenerationConfig, GroundedSummary};
use crate::gemini::{GeminiClient, GeminiError};
use crate::session::{CorrelationData, SearchResult};

const SUMMARY_TEMPERATURE: f32 = 0.1;
const ARTICLE_TEMPERATURE: f32 = 0.5;

/// AI-derived metadata for one source title.
///
/// Missing keys take neutral defaults so one incomplete record keeps its
/// readable fields instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Enrichment {
    pub rating: f64,
    pub tags: Vec<String>,
    pub brief_summary: String,
    #[serde(deserialize_with = "lenient_year")]
    pub publication_year: i32,
    pub validity_rating: String,
}

impl Default for Enrichment {
    fn default() -> Self {
        Self {
            rating: 0.0,
            tags: Vec::new(),
            brief_summary: String::new(),
            publication_year: 0,
            validity_rating: "N/A".to_string(),
        }
    }
}

impl Enrichment {
    /// Placeholder used when enrichment fails.
    pub fn fallback(lang: Lang) -> Self {
        Self {
            tags: vec![lang.analysis_failed_tag().to_string()],
            brief_summary: lang.summary_unavailable().to_string(),
            ..Self::default()
        }
    }
}

/// Accepts `2023`, `2023.0` or `"2023"`; anything else is 0 (unknown).
fn lenient_year<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    let year = match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    Ok(year.and_then(|y| i32::try_from(y).ok()).unwrap_or(0))
}

/// Abstraction over the model backend.
/// Implemented by `GeminiGateway` for production; mock implementations used in tests.
pub trait ResearchGateway {
    /// Grounded one-paragraph answer plus the web sources behind it.
    async fn grounded_summary(&self, query: &str) -> Result<GroundedSummary, GeminiError>;

    /// Base64 JPEG cover for `title`, or an empty string on failure.
    async fn cover_image(&self, title: &str) -> String;

    /// One record per title, in order. Falls back to placeholders for every title on failure.
    async fn enrich_sources(&self, titles: &[String], query: &str) -> Vec<Enrichment>;

    /// Thematic clusters over `titles`, or `None` on failure.
    async fn correlation_map(&self, titles: &[&str]) -> Option<CorrelationData>;

    /// Body-only HTML article, or an HTML error fragment on failure.
    async fn generate_article(&self, works: &[&SearchResult]) -> String;
}

#[derive(Clone)]
pub struct GeminiGateway {
    client: GeminiClient,
    lang: Lang,
}

impl GeminiGateway {
    pub fn new(client: GeminiClient, lang: Lang) -> Self {
        Self { client, lang }
    }
}

impl ResearchGateway for GeminiGateway {
    async fn grounded_summary(&self, query: &str) -> Result<GroundedSummary, GeminiError> {
        let request = GenerateContentRequest::prompt(prompts::summary(query, self.lang))
            .with_google_search()
            .with_config(GenerationConfig::temperature(SUMMARY_TEMPERATURE));
        let grounded = self.client.generate_grounded(&request).await?;
        debug!(sources = grounded.sources.len(), "grounded summary received");
        Ok(grounded)
    }

    async fn cover_image(&self, title: &str) -> String {
        match self.client.generate_image(&prompts::cover_image(title)).await {
            Ok(Some(image)) => image,
            Ok(None) => {
                warn!(%title, "image generation returned no images");
                String::new()
            }
            Err(e) => {
                warn!(%title, error = %e, "cover image generation failed");
                String::new()
            }
        }
    }

    async fn enrich_sources(&self, titles: &[String], query: &str) -> Vec<Enrichment> {
        let current_year = chrono::Local::now().year();
        let request = GenerateContentRequest::prompt(prompts::enrichment(
            titles,
            query,
            current_year,
            self.lang,
        ))
        .with_config(GenerationConfig::json(prompts::enrichment_schema()));

        match self.client.generate_json::<Vec<Value>>(&request).await {
            Ok(records) => {
                if records.len() != titles.len() {
                    warn!(
                        expected = titles.len(),
                        got = records.len(),
                        "enrichment count mismatch"
                    );
                }
                records
                    .into_iter()
                    .enumerate()
                    .map(|(index, record)| {
                        serde_json::from_value(record).unwrap_or_else(|e| {
                            warn!(index, error = %e, "unreadable enrichment record");
                            Enrichment::fallback(self.lang)
                        })
                    })
                    .collect()
            }
            Err(e) => {
                warn!(error = %e, "source enrichment failed, using placeholders");
                titles.iter().map(|_| Enrichment::fallback(self.lang)).collect()
            }
        }
    }

    async fn correlation_map(&self, titles: &[&str]) -> Option<CorrelationData> {
        let request = GenerateContentRequest::prompt(prompts::correlation(titles, self.lang))
            .with_config(GenerationConfig::json(prompts::correlation_schema()));

        match self.client.generate_json::<CorrelationData>(&request).await {
            Ok(mut data) => {
                for cluster in &mut data.clusters {
                    cluster.nodes.retain(|node| node.result_index < titles.len());
                }
                Some(data)
            }
            Err(e) => {
                warn!(error = %e, "correlation map generation failed");
                None
            }
        }
    }

    async fn generate_article(&self, works: &[&SearchResult]) -> String {
        let works: Vec<(&str, &str)> = works
            .iter()
            .map(|w| (w.title.as_str(), w.url.as_str()))
            .collect();
        let request = GenerateContentRequest::prompt(prompts::article(&works, self.lang))
            .with_config(GenerationConfig::temperature(ARTICLE_TEMPERATURE));

        match self.client.generate_text(&request).await {
            Ok(html) => strip_html_fence(&html).to_string(),
            Err(e) if e.is_blocked() => {
                warn!(error = %e, "article generation blocked");
                self.lang.article_blocked_html().to_string()
            }
            Err(e) => {
                warn!(error = %e, "article generation failed");
                self.lang.article_failed_html().to_string()
            }
        }
    }
}

/// Models sometimes wrap HTML answers in a Markdown code fence.
fn strip_html_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```html")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}
