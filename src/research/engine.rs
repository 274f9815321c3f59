use futures::future::join_all;
use tracing::{info, warn};

use crate::gateway::{Enrichment, Lang, ResearchGateway};
use crate::gemini::GeminiError;
use crate::gemini::types::Source;
use crate::session::{CorrelationData, SearchResult, SearchSession, SessionStore, StoreError};

const MISSING_URL: &str = "#";

pub struct SearchRequest<'a> {
    pub query: &'a str,
    pub lang: Lang,
}

#[derive(Debug)]
pub struct SearchOutcome {
    pub session: SearchSession,
    /// History after the session was saved, most recent first.
    pub history: Vec<SearchSession>,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error("{message}")]
    Summary {
        message: String,
        #[source]
        source: GeminiError,
    },

    #[error("failed to save session: {0}")]
    Store(#[from] StoreError),
}

impl SearchError {
    /// Hard failure of the grounded summary, with a message in the answer language.
    fn summary(source: GeminiError, lang: Lang) -> Self {
        let message = match &source {
            GeminiError::Blocked(_) => lang.search_blocked_message().to_string(),
            GeminiError::ApiKeyNotSet => source.to_string(),
            _ => lang.search_failed_message().to_string(),
        };
        SearchError::Summary { message, source }
    }
}

/// Runs one search end to end and saves the resulting session.
///
/// Only the grounded summary can abort the search. Enrichment, covers and
/// correlation degrade to placeholders.
pub async fn run_search(
    gateway: &impl ResearchGateway,
    store: &SessionStore,
    req: &SearchRequest<'_>,
) -> Result<SearchOutcome, SearchError> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err(SearchError::EmptyQuery);
    }

    let grounded = gateway.grounded_summary(query).await.map_err(|e| {
        warn!(error = %e, "grounded summary failed, aborting search");
        SearchError::summary(e, req.lang)
    })?;

    if grounded.sources.is_empty() {
        info!("no sources found, saving summary only");
        return finalize(store, query, grounded.summary, Vec::new(), None);
    }

    let titles: Vec<String> = grounded
        .sources
        .iter()
        .map(|s| s.title.clone().unwrap_or_else(|| req.lang.untitled().to_string()))
        .collect();

    info!(sources = titles.len(), "enriching sources and generating covers");
    let (enriched, images) = tokio::join!(
        gateway.enrich_sources(&titles, query),
        join_all(titles.iter().map(|title| gateway.cover_image(title))),
    );

    let results = assemble_results(&grounded.sources, titles, &enriched, images);

    let correlation = if results.len() > 1 {
        let titles: Vec<&str> = results.iter().map(|r| r.title.as_str()).collect();
        gateway.correlation_map(&titles).await
    } else {
        None
    };

    finalize(store, query, grounded.summary, results, correlation)
}

fn assemble_results(
    sources: &[Source],
    titles: Vec<String>,
    enriched: &[Enrichment],
    images: Vec<String>,
) -> Vec<SearchResult> {
    sources
        .iter()
        .zip(titles)
        .zip(images)
        .enumerate()
        .map(|(i, ((source, title), image))| {
            let url = source.url.clone().unwrap_or_else(|| MISSING_URL.to_string());
            let mut result = SearchResult::new(title, url);
            if !image.is_empty() {
                result.cover_image = format!("data:image/jpeg;base64,{image}");
            }
            if let Some(e) = enriched.get(i) {
                result.rating = Some(e.rating);
                result.tags = Some(e.tags.clone());
                result.brief_summary = Some(e.brief_summary.clone());
                result.publication_year = Some(e.publication_year);
                result.validity_rating = Some(e.validity_rating.clone());
            }
            result
        })
        .collect()
}

fn finalize(
    store: &SessionStore,
    query: &str,
    summary: String,
    results: Vec<SearchResult>,
    correlation_data: Option<CorrelationData>,
) -> Result<SearchOutcome, SearchError> {
    let session = SearchSession {
        query: query.to_string(),
        summary,
        results,
        correlation_data,
        timestamp: next_timestamp(store),
        selection_mode: false,
    };
    let history = store.save(session.clone())?;
    info!(
        timestamp = session.timestamp,
        results = session.results.len(),
        clusters = session
            .correlation_data
            .as_ref()
            .map_or(0, |c| c.clusters.len()),
        "search complete"
    );
    Ok(SearchOutcome { session, history })
}

/// Current time in ms, bumped past the newest saved session so timestamps stay unique.
fn next_timestamp(store: &SessionStore) -> i64 {
    let now = chrono::Utc::now().timestamp_millis();
    let newest = store.list().first().map_or(i64::MIN, |s| s.timestamp);
    now.max(newest.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::types::GroundedSummary;
    use crate::session::{CorrelationCluster, GraphNode};
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct MockGateway {
        summary: Mutex<Option<Result<GroundedSummary, GeminiError>>>,
        /// `None` simulates a failed enrichment call.
        enrichment: Option<Vec<Enrichment>>,
        failing_covers: Vec<String>,
        correlation: Option<CorrelationData>,
        calls: Mutex<Vec<String>>,
    }

    impl MockGateway {
        fn with_summary(summary: Result<GroundedSummary, GeminiError>) -> Self {
            Self {
                summary: Mutex::new(Some(summary)),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl ResearchGateway for MockGateway {
        async fn grounded_summary(&self, query: &str) -> Result<GroundedSummary, GeminiError> {
            self.record(format!("summary:{query}"));
            self.summary
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Err(GeminiError::RateLimited))
        }

        async fn cover_image(&self, title: &str) -> String {
            self.record(format!("cover:{title}"));
            if self.failing_covers.iter().any(|t| t == title) {
                String::new()
            } else {
                "aW1n".to_string()
            }
        }

        async fn enrich_sources(&self, titles: &[String], _query: &str) -> Vec<Enrichment> {
            self.record(format!("enrich:{}", titles.len()));
            self.enrichment.clone().unwrap_or_else(|| {
                titles.iter().map(|_| Enrichment::fallback(Lang::Pt)).collect()
            })
        }

        async fn correlation_map(&self, titles: &[&str]) -> Option<CorrelationData> {
            self.record(format!("correlate:{}", titles.len()));
            self.correlation.clone()
        }

        async fn generate_article(&self, _works: &[&SearchResult]) -> String {
            self.record("article".to_string());
            "<h1>Artigo</h1>".to_string()
        }
    }

    fn grounded(summary: &str, sources: Vec<(Option<&str>, Option<&str>)>) -> GroundedSummary {
        GroundedSummary {
            summary: summary.to_string(),
            sources: sources
                .into_iter()
                .map(|(url, title)| Source {
                    url: url.map(Into::into),
                    title: title.map(Into::into),
                })
                .collect(),
        }
    }

    fn enrichment(rating: f64, year: i32, grade: &str) -> Enrichment {
        Enrichment {
            rating,
            tags: vec!["tag".into()],
            brief_summary: "summary".into(),
            publication_year: year,
            validity_rating: grade.into(),
        }
    }

    fn store() -> (TempDir, SessionStore) {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path(), 10);
        (dir, store)
    }

    fn request(query: &str) -> SearchRequest<'_> {
        SearchRequest {
            query,
            lang: Lang::Pt,
        }
    }

    #[tokio::test]
    async fn zero_sources_saves_summary_only() {
        let (_dir, store) = store();
        let gateway = MockGateway::with_summary(Ok(grounded("Nada encontrado.", vec![])));

        let outcome = run_search(&gateway, &store, &request("tema raro")).await.unwrap();

        assert!(outcome.session.results.is_empty());
        assert_eq!(outcome.session.summary, "Nada encontrado.");
        assert!(outcome.session.correlation_data.is_none());
        assert_eq!(gateway.calls(), ["summary:tema raro"]);
        assert_eq!(store.list(), vec![outcome.session]);
    }

    #[tokio::test]
    async fn summary_failure_aborts_without_saving() {
        let (_dir, store) = store();
        let gateway = MockGateway::with_summary(Err(GeminiError::Api {
            code: 500,
            message: "boom".into(),
        }));

        let err = run_search(&gateway, &store, &request("q")).await.unwrap_err();

        assert!(matches!(err, SearchError::Summary { .. }));
        assert!(err.to_string().starts_with("Não foi possível processar"), "got: {err}");
        assert!(store.list().is_empty());
        assert_eq!(gateway.calls().len(), 1);
    }

    #[tokio::test]
    async fn blocked_summary_reports_safety() {
        let (_dir, store) = store();
        let gateway = MockGateway::with_summary(Err(GeminiError::Blocked("SAFETY".into())));

        let err = run_search(&gateway, &store, &request("q")).await.unwrap_err();
        assert!(err.to_string().contains("políticas de segurança"), "got: {err}");
    }

    #[tokio::test]
    async fn summary_failure_message_follows_language() {
        let (_dir, store) = store();
        let gateway = MockGateway::with_summary(Err(GeminiError::Blocked("SAFETY".into())));
        let req = SearchRequest {
            query: "q",
            lang: Lang::En,
        };

        let err = run_search(&gateway, &store, &req).await.unwrap_err();
        assert!(err.to_string().contains("safety policies"), "got: {err}");
    }

    #[tokio::test]
    async fn empty_query_is_rejected_before_any_call() {
        let (_dir, store) = store();
        let gateway = MockGateway::default();

        let err = run_search(&gateway, &store, &request("   ")).await.unwrap_err();

        assert!(matches!(err, SearchError::EmptyQuery));
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_enrichment_yields_placeholders() {
        let (_dir, store) = store();
        let gateway = MockGateway::with_summary(Ok(grounded(
            "Resumo",
            vec![(Some("https://a.com"), Some("A")), (Some("https://b.com"), Some("B"))],
        )));

        let outcome = run_search(&gateway, &store, &request("q")).await.unwrap();

        for result in &outcome.session.results {
            assert_eq!(result.rating, Some(0.0));
            assert_eq!(result.tags.as_deref(), Some(&["Análise Falhou".to_string()][..]));
            assert_eq!(result.publication_year, Some(0));
            assert_eq!(result.validity_rating.as_deref(), Some("N/A"));
        }
    }

    #[tokio::test]
    async fn assembles_enriched_results_and_correlation() {
        let (_dir, store) = store();
        let correlation = CorrelationData {
            clusters: vec![CorrelationCluster {
                theme: "Tema".into(),
                description: "Ligação".into(),
                nodes: vec![GraphNode {
                    result_index: 1,
                    title: "B".into(),
                }],
            }],
        };
        let gateway = MockGateway {
            enrichment: Some(vec![enrichment(4.5, 2023, "A1"), enrichment(3.0, 1999, "C")]),
            correlation: Some(correlation.clone()),
            ..MockGateway::with_summary(Ok(grounded(
                "Resumo",
                vec![(Some("https://a.com"), Some("A")), (Some("https://b.com"), Some("B"))],
            )))
        };

        let outcome = run_search(&gateway, &store, &request("q")).await.unwrap();
        let results = &outcome.session.results;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "A");
        assert_eq!(results[0].url, "https://a.com");
        assert_eq!(results[0].cover_image, "data:image/jpeg;base64,aW1n");
        assert_eq!(results[0].rating, Some(4.5));
        assert_eq!(results[1].validity_rating.as_deref(), Some("C"));
        assert!(results.iter().all(|r| !r.selected));
        assert_eq!(outcome.session.correlation_data, Some(correlation));
        assert!(!outcome.session.selection_mode);

        let calls = gateway.calls();
        assert!(calls.contains(&"enrich:2".to_string()));
        assert!(calls.contains(&"cover:A".to_string()));
        assert!(calls.contains(&"cover:B".to_string()));
        assert_eq!(calls.last().map(String::as_str), Some("correlate:2"));
    }

    #[tokio::test]
    async fn failed_cover_only_affects_its_result() {
        let (_dir, store) = store();
        let gateway = MockGateway {
            failing_covers: vec!["B".into()],
            ..MockGateway::with_summary(Ok(grounded(
                "Resumo",
                vec![(Some("https://a.com"), Some("A")), (Some("https://b.com"), Some("B"))],
            )))
        };

        let outcome = run_search(&gateway, &store, &request("q")).await.unwrap();

        assert!(outcome.session.results[0].has_cover());
        assert!(!outcome.session.results[1].has_cover());
    }

    #[tokio::test]
    async fn single_result_skips_correlation() {
        let (_dir, store) = store();
        let gateway = MockGateway::with_summary(Ok(grounded(
            "Resumo",
            vec![(Some("https://a.com"), Some("A"))],
        )));

        let outcome = run_search(&gateway, &store, &request("q")).await.unwrap();

        assert_eq!(outcome.session.results.len(), 1);
        assert!(outcome.session.correlation_data.is_none());
        assert!(!gateway.calls().iter().any(|c| c.starts_with("correlate")));
    }

    #[tokio::test]
    async fn missing_title_and_url_get_placeholders() {
        let (_dir, store) = store();
        let gateway = MockGateway::with_summary(Ok(grounded("Resumo", vec![(None, None)])));

        let outcome = run_search(&gateway, &store, &request("q")).await.unwrap();

        assert_eq!(outcome.session.results[0].title, "Sem título");
        assert_eq!(outcome.session.results[0].url, "#");
    }

    #[tokio::test]
    async fn short_enrichment_leaves_trailing_fields_empty() {
        let (_dir, store) = store();
        let gateway = MockGateway {
            enrichment: Some(vec![enrichment(5.0, 2024, "A2")]),
            ..MockGateway::with_summary(Ok(grounded(
                "Resumo",
                vec![(Some("https://a.com"), Some("A")), (Some("https://b.com"), Some("B"))],
            )))
        };

        let outcome = run_search(&gateway, &store, &request("q")).await.unwrap();

        assert_eq!(outcome.session.results[0].rating, Some(5.0));
        assert_eq!(outcome.session.results[1].rating, None);
        assert_eq!(outcome.session.results[1].tags, None);
    }

    #[tokio::test]
    async fn consecutive_searches_get_distinct_timestamps() {
        let (_dir, store) = store();
        for _ in 0..3 {
            let gateway = MockGateway::with_summary(Ok(grounded("Resumo", vec![])));
            run_search(&gateway, &store, &request("q")).await.unwrap();
        }

        let history = store.list();
        assert_eq!(history.len(), 3);
        assert!(history.windows(2).all(|w| w[0].timestamp > w[1].timestamp));
    }

    #[tokio::test]
    async fn outcome_history_is_most_recent_first() {
        let (_dir, store) = store();
        let first = MockGateway::with_summary(Ok(grounded("um", vec![])));
        run_search(&first, &store, &request("primeira")).await.unwrap();
        let second = MockGateway::with_summary(Ok(grounded("dois", vec![])));
        let outcome = run_search(&second, &store, &request("segunda")).await.unwrap();

        assert_eq!(outcome.history.len(), 2);
        assert_eq!(outcome.history[0].query, "segunda");
        assert_eq!(outcome.history[1].query, "primeira");
    }
}
