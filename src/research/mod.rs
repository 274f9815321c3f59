//! Search orchestration: grounded summary, parallel enrichment and covers, correlation, persistence.

pub(crate) mod engine;

pub use engine::{SearchError, SearchOutcome, SearchRequest, run_search};
