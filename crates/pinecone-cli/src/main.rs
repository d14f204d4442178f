//! Pinecone CLI - Command-line interface
//!
//! Usage:
//!   pinecone index create --name <name> --dimension <n>
//!   pinecone index read <state.json>
//!   pinecone index wait <name>
//!   pinecone collection create --name <name> --source <index>
//!   pinecone data collection <name>
//!
//! Exits with status 3 when a readiness wait is abandoned.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pinecone_core::{AppConfig, LoggingConfig, Metric};
use pinecone_provider::{PineconeProvider, ProviderModel};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "pinecone")]
#[command(about = "Manage Pinecone indexes and collections")]
#[command(version)]
struct Cli {
    /// TOML config file; environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API key (defaults to PINECONE_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Project environment (defaults to PINECONE_ENVIRONMENT)
    #[arg(long, global = true)]
    environment: Option<String>,

    /// Seconds between readiness checks
    #[arg(long, global = true)]
    poll_interval: Option<u64>,

    /// Give up waiting for readiness after this many seconds (0 = never)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage indexes
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },
    /// Manage collections
    Collection {
        #[command(subcommand)]
        action: CollectionAction,
    },
    /// Look up existing resources
    Data {
        #[command(subcommand)]
        source: DataSource,
    },
}

#[derive(Subcommand)]
enum IndexAction {
    /// Create an index and wait until it is ready
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        dimension: u32,
        #[arg(long, default_value_t = Metric::Cosine)]
        metric: Metric,
        #[arg(long, default_value_t = 1)]
        replicas: u32,
        #[arg(long, default_value_t = 1)]
        pods: u32,
        #[arg(long, default_value = pinecone_core::DEFAULT_POD_TYPE)]
        pod_type: String,
        /// Collection to seed the index from
        #[arg(long)]
        source_collection: Option<String>,
    },
    /// Refresh a saved index state
    Read { state: PathBuf },
    /// Scale a saved index in place
    Update {
        state: PathBuf,
        #[arg(long)]
        replicas: Option<u32>,
        #[arg(long)]
        pod_type: Option<String>,
    },
    /// Delete a saved index
    Delete { state: PathBuf },
    /// Adopt an existing index by name or `{environment}/{name}`
    Import { id: String },
    /// List index names
    List,
    /// Wait for an index to become ready
    Wait { name: String },
}

#[derive(Subcommand)]
enum CollectionAction {
    /// Snapshot an index into a collection
    Create {
        #[arg(long)]
        name: String,
        /// Index to snapshot
        #[arg(long)]
        source: String,
    },
    /// Refresh a saved collection state
    Read { state: PathBuf },
    /// Delete a saved collection
    Delete { state: PathBuf },
    /// Adopt an existing collection by name or `{environment}/{name}`
    Import { id: String },
    /// List collection names
    List,
}

#[derive(Subcommand)]
enum DataSource {
    /// Describe a collection
    Collection { name: String },
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path.clone())?.with_env_override()?,
        None => AppConfig::from_env()?,
    };

    if let Some(secs) = cli.poll_interval {
        config.polling.interval_secs = secs;
    }
    if let Some(secs) = cli.timeout {
        config.polling.timeout_secs = (secs > 0).then_some(secs);
    }
    if cli.debug {
        config.logging.level = "debug".to_string();
    }

    Ok(config)
}

// Logs go to stderr; stdout carries the JSON result.
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.level.as_str().into());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = load_config(&cli).context("Failed to load configuration")?;
    init_tracing(&config.logging);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, abandoning readiness wait");
                cancel.cancel();
            }
        }
    });

    let provider = PineconeProvider::new(env!("CARGO_PKG_VERSION"));
    let model = ProviderModel {
        apikey: cli.api_key.clone(),
        environment: cli.environment.clone(),
    };
    let configured = provider
        .configure(&model, &config)
        .map_err(commands::diagnostic)?
        .with_cancellation(cancel);

    info!(provider = provider.type_name(), "Provider configured");

    let outcome = match cli.command {
        Commands::Index { action } => match action {
            IndexAction::Create {
                name,
                dimension,
                metric,
                replicas,
                pods,
                pod_type,
                source_collection,
            } => {
                let plan = pinecone_provider::IndexPlan {
                    name,
                    dimension,
                    metric,
                    replicas,
                    pods,
                    pod_type,
                    source_collection,
                };
                commands::index_create(&configured, &plan).await
            }
            IndexAction::Read { state } => commands::index_read(&configured, &state).await,
            IndexAction::Update {
                state,
                replicas,
                pod_type,
            } => commands::index_update(&configured, &state, replicas, pod_type).await,
            IndexAction::Delete { state } => commands::index_delete(&configured, &state).await,
            IndexAction::Import { id } => commands::index_import(&configured, &id).await,
            IndexAction::List => commands::index_list(&configured).await,
            IndexAction::Wait { name } => commands::index_wait(&configured, &name).await,
        },
        Commands::Collection { action } => match action {
            CollectionAction::Create { name, source } => {
                let plan = pinecone_provider::CollectionPlan { name, source };
                commands::collection_create(&configured, &plan).await
            }
            CollectionAction::Read { state } => {
                commands::collection_read(&configured, &state).await
            }
            CollectionAction::Delete { state } => {
                commands::collection_delete(&configured, &state).await
            }
            CollectionAction::Import { id } => commands::collection_import(&configured, &id).await,
            CollectionAction::List => commands::collection_list(&configured).await,
        },
        Commands::Data { source } => match source {
            DataSource::Collection { name } => commands::data_collection(&configured, &name).await,
        },
    }?;

    Ok(outcome.exit_code())
}
