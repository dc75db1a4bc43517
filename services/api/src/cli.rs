use crate::commands;
use crate::server;
use clap::{Args, Parser, Subcommand};
use ecotide::config::AppConfig;
use ecotide::error::AppError;
use ecotide::{telemetry, EcoStore, Grade};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "EcoTide",
    about = "Grade saved product pages and inspect local sustainability progress",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the dashboard HTTP service (default command)
    Serve(ServeArgs),
    /// Grade every product found in a saved page
    Scan(ScanArgs),
    /// Print dashboard statistics derived from the viewing history
    Stats(StatsArgs),
    /// Inspect, export, or clear the viewing history
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },
    /// Manage the local sustainability cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
    /// Show or change user settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    /// Check whether the scoring service is reachable
    Health,
    /// Send grade feedback to the scoring service
    Feedback(FeedbackArgs),
    /// Ask the scoring service for greener alternatives
    Suggestions(SuggestionsArgs),
}

#[derive(Subcommand, Debug)]
enum HistoryCommand {
    /// List recent views, newest first
    Show(HistoryShowArgs),
    /// Write the history as CSV
    Export(HistoryExportArgs),
    /// Delete the history and the derived progress snapshot
    Clear,
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// Drop every cached grade
    Clear,
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Print the current settings
    Show,
    /// Merge the given values into the stored settings
    Set(SettingsSetArgs),
    /// Restore default settings
    Reset,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct ScanArgs {
    /// Saved HTML of a product page or search results page
    pub(crate) page: PathBuf,
    /// URL the page was saved from, used to recover the product id
    #[arg(long)]
    pub(crate) url: Option<String>,
    /// Keep watching the file and rescan when it changes
    #[arg(long)]
    pub(crate) watch: bool,
    /// Interval between file change checks while watching, in milliseconds
    #[arg(long, default_value_t = 250)]
    pub(crate) poll_ms: u64,
}

#[derive(Args, Debug)]
pub(crate) struct StatsArgs {
    /// Print the dashboard JSON view instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct HistoryShowArgs {
    /// Maximum number of events to print
    #[arg(long, default_value_t = 20)]
    pub(crate) limit: usize,
}

#[derive(Args, Debug)]
pub(crate) struct HistoryExportArgs {
    /// Destination file; stdout when omitted
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct SettingsSetArgs {
    #[arg(long, value_name = "true|false")]
    pub(crate) notifications: Option<bool>,
    #[arg(long, value_name = "true|false")]
    pub(crate) auto_scan: Option<bool>,
    /// Base URL of the scoring service
    #[arg(long)]
    pub(crate) api_endpoint: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct FeedbackArgs {
    /// Product title the feedback refers to
    #[arg(long)]
    pub(crate) product: String,
    /// Grade that was shown for the product
    #[arg(long)]
    pub(crate) grade: Grade,
    /// Free-form feedback text
    pub(crate) feedback: String,
}

#[derive(Args, Debug)]
pub(crate) struct SuggestionsArgs {
    /// Product title to find alternatives for
    #[arg(long)]
    pub(crate) product: String,
    #[arg(long, default_value = "general")]
    pub(crate) category: String,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let store = EcoStore::open_file(&config.store.path)?;

    match command {
        Command::Serve(args) => server::run(config, store, args).await,
        Command::Scan(args) => commands::scan(&config, store, args).await,
        Command::Stats(args) => {
            commands::stats(&store, args);
            Ok(())
        }
        Command::History { command } => match command {
            HistoryCommand::Show(args) => {
                commands::show_history(&store, args);
                Ok(())
            }
            HistoryCommand::Export(args) => commands::export_history(&store, args),
            HistoryCommand::Clear => {
                commands::clear_history(&store);
                Ok(())
            }
        },
        Command::Cache {
            command: CacheCommand::Clear,
        } => {
            commands::clear_cache(&store);
            Ok(())
        }
        Command::Settings { command } => {
            match command {
                SettingsCommand::Show => commands::show_settings(&store),
                SettingsCommand::Set(args) => commands::update_settings(&store, args),
                SettingsCommand::Reset => commands::reset_settings(&store),
            }
            Ok(())
        }
        Command::Health => commands::health(&config, &store).await,
        Command::Feedback(args) => commands::feedback(&config, &store, args).await,
        Command::Suggestions(args) => commands::suggestions(&config, &store, args).await,
    }
}
