mod inspect;

use anyhow::Result;
use clap::{Parser, Subcommand};
use inbox_core::config::AppConfig;
use inbox_core::store::{InteractionStore, MemoryStore};
use inbox_db::Database;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "inbox-monitor",
    about = "Conversation browser and analytics for Instagram webhook interactions",
    version,
    author
)]
struct Cli {
    /// Path to config file (default: ~/.config/inbox-monitor/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the database URL
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Read interactions from a JSON fixture instead of the database
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve {
        /// Bind host
        #[arg(long)]
        host: Option<String>,
        /// Bind port
        #[arg(long)]
        port: Option<u16>,
    },

    /// List conversation threads
    Threads {
        /// Only threads with this receiver
        #[arg(short, long)]
        receiver: Option<String>,
        /// Case-insensitive text search
        #[arg(short, long)]
        query: Option<String>,
        /// Most recent activity first
        #[arg(long)]
        recent: bool,
        /// Print the threads as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the analytics summary
    Report {
        /// Only threads with this receiver
        #[arg(short, long)]
        receiver: Option<String>,
        /// Full markdown report instead of the compact summary
        #[arg(long, conflicts_with = "json")]
        markdown: bool,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the transcript of one sender's threads
    Transcript {
        sender_id: String,
        /// Only the thread with this receiver
        #[arg(short, long)]
        receiver: Option<String>,
    },

    /// Look up the LLM trace behind a user message
    Trace {
        sender_id: String,
        input_query: String,
    },

    /// Show or manage configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Initialize default configuration file
    Init,
    /// Print config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up tracing.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "inbox_monitor=info,inbox_db=info,warn".into()),
        )
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load config.
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = AppConfig::load_from(path)?;
            config.apply_env();
            config
        }
        None => AppConfig::load()?,
    };
    if cli.database_url.is_some() {
        config.database.apply_url_override(cli.database_url.clone());
    }

    if let Some(Commands::Config { action }) = &cli.command {
        return handle_config_command(action.as_ref(), &config);
    }

    let (store, database) = open_store(&config, cli.fixture.as_deref()).await?;

    let outcome = match cli.command {
        Some(Commands::Serve { host, port }) => {
            if let Some(h) = host {
                config.server.host = h;
            }
            if let Some(p) = port {
                config.server.port = p;
            }
            inbox_server::serve(config, store).await
        }
        None => inbox_server::serve(config, store).await,
        Some(command) => run_inspect(command, &config, store).await,
    };

    if let Some(db) = database {
        db.close().await;
    }
    outcome
}

/// Pick the interaction source: a fixture file if given, else Postgres.
/// A missing database URL is not fatal here; the server reports it per request.
async fn open_store(
    config: &AppConfig,
    fixture: Option<&std::path::Path>,
) -> Result<(Option<Arc<dyn InteractionStore>>, Option<Database>)> {
    if let Some(path) = fixture {
        let store = MemoryStore::load_json(path).await?;
        return Ok((Some(Arc::new(store)), None));
    }

    match Database::new(&config.database) {
        Ok(db) => {
            let store: Arc<dyn InteractionStore> = Arc::new(db.interactions());
            Ok((Some(store), Some(db)))
        }
        Err(inbox_core::InboxError::DatabaseUnconfigured) => {
            tracing::warn!("{}", inbox_core::InboxError::DatabaseUnconfigured);
            Ok((None, None))
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_inspect(
    command: Commands,
    config: &AppConfig,
    store: Option<Arc<dyn InteractionStore>>,
) -> Result<()> {
    let store = store.ok_or(inbox_core::InboxError::DatabaseUnconfigured)?;
    let store = store.as_ref();

    match command {
        Commands::Threads {
            receiver,
            query,
            recent,
            json,
        } => inspect::threads(store, receiver, query, recent, json).await,
        Commands::Report {
            receiver,
            markdown,
            json,
        } => inspect::report(store, config, receiver.as_deref(), markdown, json).await,
        Commands::Transcript {
            sender_id,
            receiver,
        } => inspect::transcript(store, &sender_id, receiver.as_deref()).await,
        Commands::Trace {
            sender_id,
            input_query,
        } => inspect::trace(store, &sender_id, &input_query).await,
        Commands::Serve { .. } | Commands::Config { .. } => Ok(()),
    }
}

fn handle_config_command(action: Option<&ConfigAction>, config: &AppConfig) -> Result<()> {
    match action {
        Some(ConfigAction::Show) | None => {
            let mut shown = config.clone();
            if let Some(url) = shown.database.url() {
                let redacted = inbox_db::redact_url(url);
                shown.database.apply_url_override(Some(redacted));
            }
            let toml_str = toml::to_string_pretty(&shown)?;
            println!("{}", toml_str);
        }
        Some(ConfigAction::Init) => {
            let path = AppConfig::default_path();
            if path.exists() {
                println!("Config already exists at: {}", path.display());
            } else {
                AppConfig::default().save()?;
                println!("Created default config at: {}", path.display());
            }
        }
        Some(ConfigAction::Path) => {
            println!("{}", AppConfig::default_path().display());
        }
    }
    Ok(())
}
