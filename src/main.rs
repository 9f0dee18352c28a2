//! Kickover: a Kubernetes rolling-restart webhook.
//!
//! This is the application entry point. It initializes tracing, loads
//! configuration from an optional TOML file plus environment variables,
//! connects to the cluster, and serves the webhook router.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kickover::cluster::{self, KubeDeployments};
use kickover::config::{
    resolve_config_path, AppConfig, LoggingConfig, DEFAULT_CONFIG_PATH, DEFAULT_LOG_FILTER,
};
use kickover::{create_router, http, AppState};

/// Kickover: trigger rolling restarts of Kubernetes Deployments over HTTP
#[derive(Parser, Debug)]
#[command(name = "kickover", version, about)]
struct Args {
    /// Path to configuration file [default: /etc/kickover.toml, if present]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level filter (e.g., "kickover=debug,tower_http=info")
    #[arg(short, long)]
    log_level: Option<String>,
}

fn init_tracing(filter: &str, logging: &LoggingConfig) {
    let env_filter = tracing_subscriber::EnvFilter::new(filter);

    if logging.is_json() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration before tracing so the log format can be honoured
    let config_path = resolve_config_path(args.config.as_deref(), Path::new(DEFAULT_CONFIG_PATH));
    let mut config = match &config_path {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok());

    // Initialize tracing with priority: CLI > env > default
    let log_filter = args
        .log_level
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    init_tracing(&log_filter, &config.logging);

    config.validate()?;
    tracing::info!(
        config_file = ?config_path,
        cluster_mode = ?config.cluster.effective_mode(),
        "Loaded configuration"
    );

    // Without a working cluster client there is nothing to serve
    let client = cluster::connect(&config.cluster).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to connect to cluster");
        e
    })?;
    let store = Arc::new(KubeDeployments::new(client));

    let http_config = config.http.clone();
    let state = AppState::new(config, store);
    let app = create_router(state);

    http::serve(app, &http_config).await?;

    Ok(())
}
