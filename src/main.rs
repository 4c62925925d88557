use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sr_timeline::api::{build_router, state::AppState};
use sr_timeline::calculate::build_graph;
use sr_timeline::config::AppConfig;
use sr_timeline::models::PlayerMatches;
use sr_timeline::storage::{JsonlMatchSource, MatchSource, StorageConfig};

#[derive(Parser)]
#[command(name = "sr-timeline")]
#[command(about = "Skill-rating reconstruction and gap-aware match timelines")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: String,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<String>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,

        /// Port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the graph series for a share key as JSON
    Render {
        share_key: String,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Print the layout for an x range
    Viewport {
        share_key: String,

        #[arg(long, allow_hyphen_values = true)]
        left: f64,

        #[arg(long, allow_hyphen_values = true)]
        right: f64,

        /// Players enabled for vertical autoscale (comma separated)
        #[arg(long, value_delimiter = ',')]
        players: Option<Vec<String>>,
    },

    /// Print the season table
    Seasons,
}

async fn load_players(config: &AppConfig, share_key: &str) -> Result<Vec<PlayerMatches>> {
    let source = JsonlMatchSource::new(StorageConfig::new(config.data_dir.clone()));
    source
        .load(share_key)
        .await
        .with_context(|| format!("Failed to load match history for '{}'", share_key))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(&PathBuf::from(&cli.config))
        .with_context(|| format!("Failed to load config from {}", cli.config))?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = PathBuf::from(dir);
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::debug!("Starting sr-timeline v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;

            let addr = format!("{}:{}", config.server.host, config.server.port);
            tracing::info!("Serving match data from {:?}", config.data_dir);

            let app = build_router(AppState::new(config));
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
        Commands::Render { share_key, pretty } => {
            let players = load_players(&config, &share_key).await?;
            let graph = build_graph(&players, &config.graph, &config.season_table())?;

            let json = if pretty {
                serde_json::to_string_pretty(&graph)?
            } else {
                serde_json::to_string(&graph)?
            };
            println!("{}", json);
        }
        Commands::Viewport {
            share_key,
            left,
            right,
            players,
        } => {
            let matches = load_players(&config, &share_key).await?;
            let graph = build_graph(&matches, &config.graph, &config.season_table())?;

            let layout = graph
                .layout(left, right, players.as_deref(), &config.graph)
                .ok_or_else(|| {
                    anyhow!("'{}' has no player with enough graphable matches", share_key)
                })?;
            println!("{}", serde_json::to_string_pretty(&layout)?);
        }
        Commands::Seasons => {
            let table = config.season_table();
            println!("{:<22} {}", "before first boundary", table.pre_season_label());
            for season in table.all_seasons() {
                let starts = season.starts_at.format("%Y-%m-%d %H:%M UTC").to_string();
                let marker = if season.off_season { " (off-season)" } else { "" };
                println!("{:<22} {}{}", starts, season.label, marker);
            }
        }
    }

    Ok(())
}
