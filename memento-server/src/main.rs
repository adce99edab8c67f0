//! memento-server - Event guestbook contribution service
//!
//! Serves guest entry, host moderation, live walls, share galleries and
//! exports over HTTP.

use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use memento_common::config::{CompiledDefaults, RootFolderInitializer, RootFolderResolver, TomlConfig};
use memento_common::db::init_database;
use memento_common::{ChangeFeed, SqliteStore};
use memento_server::links::PublicLinks;
use memento_server::{build_router, notify, storage, AppState};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const MODULE_NAME: &str = "memento-server";

/// Buffered changes per feed before slow subscribers lag
const FEED_CAPACITY: usize = 256;

/// Command-line arguments for memento-server
#[derive(Parser, Debug)]
#[command(name = "memento-server")]
#[command(about = "Event guestbook contribution and moderation service")]
#[command(version)]
struct Args {
    /// Root folder holding the database and local media
    #[arg(short, long, env = "MEMENTO_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "MEMENTO_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(short, long, env = "MEMENTO_BIND")]
    bind: Option<String>,

    /// Log filter, e.g. `info` or `memento_server=debug`
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load_or_default(MODULE_NAME);
    let defaults = CompiledDefaults::for_current_platform();

    let level = args.log_level.clone().unwrap_or_else(|| config.logging.level.clone());
    let file_layer = match &config.logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level)))
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    info!(
        "Starting Memento server ({}) v{} [{}] built {} ({})",
        MODULE_NAME,
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder.clone())
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;
    info!("Root folder: {}", initializer.root_folder().display());

    let db_path = initializer.database_path();
    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready at {}", db_path.display());
            pool
        }
        Err(e) => {
            error!("Failed to open database {}: {}", db_path.display(), e);
            return Err(e.into());
        }
    };

    let media = storage::from_config(&config.media, &initializer.media_root())
        .context("Failed to set up media storage")?;
    info!("Media storage: {:?} (bucket {})", config.media.backend, config.media.bucket);

    let store = SqliteStore::new(pool, ChangeFeed::new(FEED_CAPACITY));
    let slide_interval = Duration::from_secs(config.wall.slide_interval_secs);
    let links = PublicLinks::new(&config.site.public_url);
    let notifier = notify::from_config(&config.notify, links.clone()).context("Failed to set up notifications")?;
    info!(
        "Public site: {} (host notifications {})",
        config.site.public_url,
        if config.notify.enabled { "by mail" } else { "logged only" }
    );
    let app = build_router(
        AppState::new(store, media, slide_interval)
            .with_links(links)
            .with_notifier(notifier),
    );

    let bind = args
        .bind
        .or(config.bind_address)
        .unwrap_or(defaults.bind_address);
    let port = args.port.or(config.port).unwrap_or(defaults.port);
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("memento-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
