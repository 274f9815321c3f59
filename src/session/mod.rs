//! Search sessions: the data model, local history persistence, and file export.

pub mod export;
mod store;

pub use store::{SessionStore, StoreError};

use serde::{Deserialize, Serialize};

/// Publication window (in years) for a source to count as recent.
pub(crate) const RECENT_YEARS: i32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    /// `data:image/jpeg;base64,...`, or empty when no cover could be generated.
    #[serde(rename = "coverImageUrl", default)]
    pub cover_image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brief_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_year: Option<i32>,
    /// Qualis CAPES grade (`A1`..`C`) or `N/A`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity_rating: Option<String>,
    #[serde(default)]
    pub selected: bool,
}

impl SearchResult {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            cover_image: String::new(),
            rating: None,
            tags: None,
            brief_summary: None,
            publication_year: None,
            validity_rating: None,
            selected: false,
        }
    }

    /// Recent (last five years) and graded above `C`.
    pub fn is_recent_and_valid(&self, current_year: i32) -> bool {
        let (Some(year), Some(grade)) = (self.publication_year, self.validity_rating.as_deref())
        else {
            return false;
        };
        year > 0 && current_year - year <= RECENT_YEARS && grade != "N/A" && grade != "C"
    }

    pub fn has_cover(&self) -> bool {
        !self.cover_image.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// 0-based index into the session's results.
    pub result_index: usize,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationCluster {
    pub theme: String,
    pub description: String,
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationData {
    pub clusters: Vec<CorrelationCluster>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSession {
    pub query: String,
    pub summary: String,
    pub results: Vec<SearchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_data: Option<CorrelationData>,
    /// Milliseconds since the Unix epoch; identifies the session in history.
    pub timestamp: i64,
    #[serde(default)]
    pub selection_mode: bool,
}

impl SearchSession {
    /// Leaving selection mode clears every selection.
    pub fn set_selection_mode(&mut self, enabled: bool) {
        self.selection_mode = enabled;
        if !enabled {
            for result in &mut self.results {
                result.selected = false;
            }
        }
    }

    /// Toggles the result at `index` (0-based). Ignored outside selection mode.
    pub fn toggle_selected(&mut self, index: usize) -> bool {
        if !self.selection_mode {
            return false;
        }
        match self.results.get_mut(index) {
            Some(result) => {
                result.selected = !result.selected;
                true
            }
            None => false,
        }
    }

    pub fn selected(&self) -> Vec<&SearchResult> {
        self.results.iter().filter(|r| r.selected).collect()
    }
}
