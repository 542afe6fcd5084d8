//! nodelog relay binary.
//!
//! Reads newline-delimited JSON events from stdin, appends each to the local
//! event log and forwards it to the configured collector. Stops at end of
//! input or on SIGTERM/SIGINT, then drains the event log writer.

use std::sync::Arc;

use nodelog_channel::{RealtimeChannel, WsConnector};
use nodelog_relay::config;
use nodelog_relay::ingest::ingest_lines;
use nodelog_relay::Relay;
use nodelog_store::SqliteSink;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("NODELOG_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

fn fatal(message: &str, error: &dyn std::fmt::Display) -> ! {
    tracing::error!("{}: {}", message, error);
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("nodelog.toml"));

    let config = match config::load_config(selected_config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    let channel_config = config
        .channel_config()
        .unwrap_or_else(|e| fatal("invalid collector configuration", &e));

    let pool = nodelog_db::create_pool(&config.db_settings())
        .unwrap_or_else(|e| fatal("failed to create database pool", &e));

    {
        let conn = pool
            .get()
            .unwrap_or_else(|e| fatal("failed to get database connection for migrations", &e));
        let applied = nodelog_db::run_migrations(&conn)
            .unwrap_or_else(|e| fatal("failed to run database migrations", &e));
        if applied > 0 {
            tracing::info!(count = applied, "applied database migrations");
        }
    }

    let (sink, writer) = SqliteSink::spawn(pool, config.sink.queue_capacity.max(1));

    let channel = RealtimeChannel::new(channel_config);
    let Some(channel_handle) = channel.start(WsConnector::new(config.collector.url.clone())) else {
        fatal("failed to start realtime channel", &"already supervised");
    };

    tracing::info!(
        collector = %config.collector.url,
        database = %config.database.path,
        "nodelog relay started"
    );

    let relay = Relay::new(Arc::new(sink), channel);
    let stdin = BufReader::new(tokio::io::stdin());

    tokio::select! {
        stats = ingest_lines(&relay, stdin) => {
            tracing::info!(
                published = stats.published,
                skipped = stats.skipped,
                "event input closed"
            );
        }
        () = shutdown_signal() => {}
    }

    channel_handle.shutdown().await;

    // The writer exits once the last sink handle is gone.
    drop(relay);
    if let Err(e) = writer.await {
        tracing::error!("event writer join error: {}", e);
    }

    tracing::info!("nodelog relay shut down");

    // A pending stdin read holds a blocking thread the runtime would wait on.
    std::process::exit(0);
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
