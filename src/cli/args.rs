use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::Overrides;
use crate::gateway::Lang;

#[derive(Debug, Parser)]
#[command(
    name = "scholar",
    version,
    about = "Research assistant: grounded summaries, enriched sources, thematic clusters, and ABNT article drafts"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Default, Args)]
pub struct GlobalArgs {
    /// Directory holding history.json (default: platform data directory)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
    /// Language of generated text: "pt" (default) or "en"
    #[arg(long, global = true, value_enum)]
    pub lang: Option<Lang>,
    /// Number of searches kept in history (default: 10)
    #[arg(long, global = true)]
    pub history_limit: Option<usize>,
}

impl From<GlobalArgs> for Overrides {
    fn from(args: GlobalArgs) -> Self {
        Overrides {
            data_dir: args.data_dir,
            lang: args.lang,
            history_limit: args.history_limit,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Research a topic: grounded summary, enriched sources, covers, and thematic clusters
    Search(SearchArgs),
    /// List recent searches, most recent first
    History,
    /// Show a saved search
    Show(SessionArgs),
    /// Delete a saved search
    Delete(SessionArgs),
    /// Toggle sources of a saved search for article generation
    Select(SelectArgs),
    /// Draft an ABNT article from the selected sources and export it as HTML
    Article(ArticleArgs),
    /// Export one saved search, or the whole history, as JSON
    Export(ExportArgs),
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Topic to research
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,
}

impl SearchArgs {
    pub fn query(&self) -> String {
        self.query.join(" ")
    }
}

#[derive(Debug, Args)]
pub struct SessionArgs {
    /// Session timestamp as shown by `scholar history`
    pub timestamp: i64,
}

#[derive(Debug, Args)]
pub struct SelectArgs {
    /// Session timestamp as shown by `scholar history`
    pub timestamp: i64,
    /// Source numbers to toggle (1-based, as shown by `scholar show`)
    pub numbers: Vec<usize>,
    /// Leave selection mode and clear every selection
    #[arg(long, conflicts_with = "numbers")]
    pub clear: bool,
}

#[derive(Debug, Args)]
pub struct ArticleArgs {
    /// Session timestamp as shown by `scholar history`
    pub timestamp: i64,
    /// Directory to write the article into
    #[arg(long, default_value = ".")]
    pub out: PathBuf,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Session to export (default: the whole history)
    pub timestamp: Option<i64>,
    /// Directory to write the export into
    #[arg(long, default_value = ".")]
    pub out: PathBuf,
}
