mod args;
mod errors;

pub use args::{Cli, Command};
pub use errors::CliError;

#[cfg(test)]
use args::{SearchArgs, SessionArgs};
use args::{ArticleArgs, ExportArgs, SelectArgs};

use std::path::Path;
use std::time::Duration;

use chrono::{Datelike, Local};
use reqwest::Client;
use tracing::{debug, info};

use errors::{gemini_to_cli_error, search_to_cli_error};

use crate::config::Config;
use crate::gateway::{GeminiGateway, ResearchGateway};
use crate::gemini::{GeminiClient, GeminiError};
use crate::markdown::{format_history, format_session};
use crate::research::{self, SearchError, SearchRequest};
use crate::session::export::{self, ExportScope};
use crate::session::{SearchSession, SessionStore};

/// TCP connection establishment timeout. Request timeouts are set per call by the Gemini client.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Command dispatcher for the terminal surface.
///
/// The Gemini gateway is optional: `history`, `show`, `delete`, `select` and
/// `export` work offline, only `search` and `article` need `GEMINI_API_KEY`.
pub struct App {
    config: Config,
    gateway: Option<GeminiGateway>,
    store: SessionStore,
}

impl App {
    pub fn new(config: Config) -> Result<Self, CliError> {
        let http = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        let gateway = GeminiClient::new(http, &config)
            .inspect_err(|e| debug!("Gemini client not available: {e}"))
            .ok()
            .map(|client| GeminiGateway::new(client, config.lang));
        let store = SessionStore::new(&config.data_dir, config.history_limit);
        debug!(history = %store.path().display(), limit = config.history_limit, "session store ready");
        Ok(Self {
            config,
            gateway,
            store,
        })
    }

    fn gateway(&self) -> Result<&GeminiGateway, CliError> {
        self.gateway
            .as_ref()
            .ok_or_else(|| gemini_to_cli_error(GeminiError::ApiKeyNotSet))
    }

    fn session(&self, timestamp: i64) -> Result<SearchSession, CliError> {
        self.store
            .get(timestamp)
            .ok_or(CliError::SessionNotFound(timestamp))
    }

    /// Runs one command and returns the Markdown to print.
    pub async fn run(&self, command: Command) -> Result<String, CliError> {
        match command {
            Command::Search(args) => self.search(&args.query()).await,
            Command::History => Ok(self.history()),
            Command::Show(args) => self.show(args.timestamp),
            Command::Delete(args) => self.delete(args.timestamp),
            Command::Select(args) => self.select(&args),
            Command::Article(args) => self.article(&args).await,
            Command::Export(args) => self.export(&args),
        }
    }

    async fn search(&self, query: &str) -> Result<String, CliError> {
        if query.trim().is_empty() {
            return Err(search_to_cli_error(SearchError::EmptyQuery));
        }

        info!(query = %query, "cmd:search");

        let gateway = self.gateway()?;
        let req = SearchRequest {
            query,
            lang: self.config.lang,
        };
        let outcome = research::run_search(gateway, &self.store, &req)
            .await
            .map_err(search_to_cli_error)?;

        let mut output = format_session(&outcome.session, current_year());
        output.push_str(&format!(
            "---\n_Saved as session {} ({} in history)._\n",
            outcome.session.timestamp,
            outcome.history.len()
        ));
        Ok(output)
    }

    fn history(&self) -> String {
        format_history(&self.store.list())
    }

    fn show(&self, timestamp: i64) -> Result<String, CliError> {
        let session = self.session(timestamp)?;
        Ok(format_session(&session, current_year()))
    }

    fn delete(&self, timestamp: i64) -> Result<String, CliError> {
        self.session(timestamp)?;
        let remaining = self.store.delete(timestamp)?;
        info!(timestamp, remaining = remaining.len(), "session deleted");
        Ok(format!(
            "Deleted session {timestamp}. {} saved searches remain.\n",
            remaining.len()
        ))
    }

    fn select(&self, args: &SelectArgs) -> Result<String, CliError> {
        let mut session = self.session(args.timestamp)?;

        if args.clear {
            session.set_selection_mode(false);
        } else {
            let count = session.results.len();
            if let Some(bad) = args.numbers.iter().find(|n| **n == 0 || **n > count) {
                return Err(CliError::InvalidInput(format!(
                    "source number {bad} is out of range (1-{count})"
                )));
            }
            session.set_selection_mode(true);
            for number in &args.numbers {
                session.toggle_selected(number - 1);
            }
        }

        self.store.save(session.clone())?;
        debug!(
            timestamp = session.timestamp,
            selected = session.selected().len(),
            "selection updated"
        );
        Ok(format_session(&session, current_year()))
    }

    async fn article(&self, args: &ArticleArgs) -> Result<String, CliError> {
        let session = self.session(args.timestamp)?;
        let selected = session.selected();
        if selected.is_empty() {
            return Err(CliError::NothingSelected);
        }

        info!(timestamp = session.timestamp, works = selected.len(), "cmd:article");

        let html = self.gateway()?.generate_article(&selected).await;
        let path = export::export_article(&html, &session.query, &args.out)?;
        Ok(format!(
            "Article on \"{}\" from {} selected sources written to {}\n",
            session.query,
            selected.len(),
            path.display()
        ))
    }

    fn export(&self, args: &ExportArgs) -> Result<String, CliError> {
        let today = Local::now().date_naive();
        let path = match args.timestamp {
            Some(timestamp) => {
                let session = self.session(timestamp)?;
                export::export_sessions(ExportScope::One(&session), &args.out, today)?
            }
            None => {
                let sessions = self.store.list();
                export::export_sessions(ExportScope::All(&sessions), &args.out, today)?
            }
        };
        Ok(exported_message(&path))
    }
}

fn exported_message(path: &Path) -> String {
    format!("Exported to {}\n", path.display())
}

fn current_year() -> i32 {
    Local::now().year()
}
