use tracing::warn;

use super::types::{GenerateContentResponse, GroundedSummary, Source};

const BLOCKING_FINISH_REASONS: &[&str] = &["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII"];

/// Concatenated text of the first candidate, like the SDKs' `response.text`.
pub fn response_text(response: &GenerateContentResponse) -> String {
    response
        .candidates
        .as_ref()
        .and_then(|c| c.first())
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .map(|part| part.text.as_str())
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Reason the prompt or the answer was withheld by a safety filter, if any.
pub fn block_reason(response: &GenerateContentResponse) -> Option<String> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.clone())
    {
        return Some(reason);
    }

    response
        .candidates
        .as_ref()
        .and_then(|c| c.first())
        .and_then(|c| c.finish_reason.as_deref())
        .filter(|reason| BLOCKING_FINISH_REASONS.contains(reason))
        .map(str::to_string)
}

pub fn extract_grounded_summary(response: &GenerateContentResponse) -> GroundedSummary {
    let summary = response_text(response).trim().to_string();
    if summary.is_empty() {
        warn!("Gemini returned empty summary");
    }

    let sources = response
        .candidates
        .as_ref()
        .and_then(|c| c.first())
        .and_then(|c| c.grounding_metadata.as_ref())
        .and_then(|m| m.grounding_chunks.as_ref())
        .map(|chunks| {
            chunks
                .iter()
                .map(|chunk| {
                    let web = chunk.web.as_ref();
                    Source {
                        url: web.and_then(|w| w.uri.clone()).filter(|u| !u.is_empty()),
                        title: web.and_then(|w| w.title.clone()).filter(|t| !t.is_empty()),
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    GroundedSummary { summary, sources }
}
