use crate::config::ConfigError;
use crate::gemini::GeminiError;
use crate::research::SearchError;
use crate::session::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Gemini(String),

    #[error("{0}")]
    Search(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no saved search with timestamp {0}; run `scholar history` to list them")]
    SessionNotFound(i64),

    #[error("no sources selected; run `scholar select <timestamp> <number>...` first")]
    NothingSelected,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub(super) fn retriable_error(e: &impl std::fmt::Display) -> CliError {
    CliError::Gemini(format!("{e} (retriable)"))
}

pub(super) fn gemini_to_cli_error(e: GeminiError) -> CliError {
    match &e {
        GeminiError::RateLimited => retriable_error(&e),
        GeminiError::QuotaExhausted(_) => CliError::Gemini(format!(
            "{e}; check your API billing at https://aistudio.google.com"
        )),
        _ => CliError::Gemini(e.to_string()),
    }
}

pub(super) fn search_to_cli_error(e: SearchError) -> CliError {
    match e {
        SearchError::Store(inner) => CliError::Store(inner),
        SearchError::EmptyQuery => CliError::InvalidInput(e.to_string()),
        SearchError::Summary {
            source: GeminiError::RateLimited,
            ..
        } => retriable_error(&e),
        SearchError::Summary { .. } => CliError::Search(e.to_string()),
    }
}
