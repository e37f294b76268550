//! # Feed Worker
//!
//! The background process that keeps the reader's data fresh: it refreshes the
//! global top list and the interest shelves on their schedules, serves refill
//! and comment-fetch signals, drains the summary and saved-thread job queues,
//! and runs retention cleanup.
//!
//! ## Key Features:
//! - **Layered configuration**: defaults, then a JSON file (`--config`), then
//!   `FEED_*` environment variables and CLI flags. A `.env` file is honoured.
//! - **Optional cache**: without a reachable Redis the worker still ingests;
//!   signals, job queues and the stampede lock are simply disabled.
//! - **Graceful shutdown**: Ctrl-C or SIGTERM cancels the loop between steps
//!   and the HTTP client is drained before exit.

use anyhow::{Context, Result};
use clap::Parser;
use lib_feed::ai::MockSummarizer;
use lib_feed::connections::db_postgres::{create_pool, ensure_schema, ping};
use lib_feed::loggers::setup_logging;
use lib_feed::retrieve::{ApiClient, HnClient, SearchClient};
use lib_feed::store::{ContentBackend, PgContentStore};
use lib_feed::worker::{Worker, WorkerDeps};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod worker_logic;
use worker_logic::bootstrap::connect_cache;
use worker_logic::config::{load_config, WorkerConfig};

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut term_signal) => {
                        term_signal.recv().await;
                        info!("SIGTERM received, initiating shutdown.");
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to install SIGTERM handler");
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                // On non-unix platforms, just wait forever.
                std::future::pending::<()>().await;
            }
        } => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = load_config(WorkerConfig::parse())?;
    let _guard = setup_logging(
        "feed_worker",
        &config.log_dir(),
        config.log_level(),
        config.log_json.unwrap_or(false),
    )?;
    let settings = config.to_settings()?;

    let database_url = config
        .database_url
        .as_deref()
        .context("A database URL is required (--database-url or FEED_DATABASE_URL)")?;
    let pool = create_pool(database_url, config.db_pool_size.unwrap_or(16))?;
    ping(&pool).await.context("Database is unreachable")?;
    ensure_schema(&pool).await.context("Failed to apply schema")?;
    let backend: Arc<dyn ContentBackend> = Arc::new(PgContentStore::new(pool));

    let cache = connect_cache(config.redis_url.as_deref(), &settings.cache).await;

    let api = Arc::new(ApiClient::new(&settings.fetch)?);
    let source = Arc::new(HnClient::new(Arc::clone(&api), &settings.endpoints.hn_api_url)?);
    let search = Arc::new(SearchClient::new(
        Arc::clone(&api),
        &settings.endpoints.search_api_url,
    )?);
    let summarizer = Arc::new(MockSummarizer::new(settings.summary.model_version.clone()));

    let mut worker = Worker::new(
        WorkerDeps {
            backend,
            cache,
            source,
            search,
            summarizer,
        },
        settings,
    );

    let cancel = CancellationToken::new();
    let worker_handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { worker.run(cancel).await }
    });

    shutdown_signal().await;
    cancel.cancel();

    if let Err(e) = worker_handle.await {
        error!(error = %e, "Worker task ended abnormally");
    }
    api.shutdown().await;

    info!("Shutdown complete.");
    Ok(())
}
