//! # Feed Reader
//!
//! Request-time command surface over the engine: reads the personalized feed
//! and the top list, shows a story with its comments and summary, records
//! seen/read/dismissed state, manages interest selections, queues summary and
//! saved-thread jobs, and runs keyword searches. Every command prints JSON.
//!
//! `--memory` runs against process-local stores seeded with the interest
//! catalog, which is enough to try the commands without PostgreSQL or Redis.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lib_feed::cache::SharedCache;
use lib_feed::connections::db_postgres::{create_pool, ensure_schema};
use lib_feed::connections::MemoryCacheStore;
use lib_feed::engine::{seed_catalog, ReaderService};
use lib_feed::loggers::setup_logging;
use lib_feed::retrieve::{ApiClient, SearchClient};
use lib_feed::store::{ContentBackend, MemoryContentStore, PgContentStore};
use serde::Serialize;
use std::sync::Arc;

mod worker_logic;
use worker_logic::bootstrap::connect_cache;
use worker_logic::config::{load_config, WorkerConfig};

#[derive(Parser, Debug)]
#[clap(about = "Reads and updates the personalized Hacker News feed", version)]
struct ReaderCli {
    #[clap(flatten)]
    config: WorkerConfig,

    /// Use in-memory stores instead of PostgreSQL and Redis.
    #[clap(long)]
    memory: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// The global top list.
    Top {
        #[clap(long)]
        limit: Option<usize>,
    },
    /// A user's personalized feed.
    Feed {
        user: String,
        #[clap(long)]
        limit: Option<usize>,
    },
    /// Every interest in the catalog.
    Interests,
    /// Replaces a user's interest selection.
    Select {
        user: String,
        #[clap(value_delimiter = ',', required = true)]
        interest_ids: Vec<i64>,
    },
    /// A user's selected interests.
    MyInterests { user: String },
    /// One story with its first comments and summary state.
    Story {
        hn_id: i64,
        #[clap(long)]
        user: Option<String>,
    },
    /// Stored comments of a story.
    Comments {
        hn_id: i64,
        #[clap(long)]
        limit: Option<usize>,
    },
    /// Marks stories as seen.
    Seen {
        user: String,
        #[clap(value_delimiter = ',', required = true)]
        hn_ids: Vec<i64>,
    },
    /// Hides stories from the user's feed.
    Dismiss {
        user: String,
        #[clap(value_delimiter = ',', required = true)]
        hn_ids: Vec<i64>,
    },
    /// Records that the user read a story.
    Read { user: String, hn_id: i64 },
    /// Summary state of a story.
    Summary { hn_id: i64 },
    /// Queues a summary for a story.
    RequestSummary { user: String, hn_id: i64 },
    /// Summary state of a comment.
    CommentSummary { hn_id: i64 },
    /// Queues a summary for a comment.
    RequestCommentSummary { user: String, hn_id: i64 },
    /// Queues a saved thread of a story and selected comments.
    SaveThread {
        user: String,
        story_hn_id: i64,
        #[clap(value_delimiter = ',')]
        comment_hn_ids: Vec<i64>,
    },
    /// A user's saved threads, newest first.
    Threads { user: String },
    /// Entries of a saved thread.
    Thread { thread_id: i64 },
    /// Keyword search over stories.
    Search {
        query: String,
        #[clap(long)]
        limit: Option<usize>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = ReaderCli::parse();
    let config = load_config(cli.config)?;
    let _guard = setup_logging(
        "feed_reader",
        &config.log_dir(),
        config.log_level(),
        config.log_json.unwrap_or(false),
    )?;
    let settings = config.to_settings()?;

    let (backend, cache): (Arc<dyn ContentBackend>, SharedCache) = if cli.memory {
        let backend: Arc<dyn ContentBackend> = Arc::new(MemoryContentStore::new());
        seed_catalog(backend.as_ref()).await?;
        let cache = SharedCache::new(Arc::new(MemoryCacheStore::new()), &settings.cache);
        (backend, cache)
    } else {
        let database_url = config
            .database_url
            .as_deref()
            .context("A database URL is required unless --memory is given")?;
        let pool = create_pool(database_url, config.db_pool_size.unwrap_or(16))?;
        ensure_schema(&pool).await.context("Failed to apply schema")?;
        let backend: Arc<dyn ContentBackend> = Arc::new(PgContentStore::new(pool));
        let cache = connect_cache(config.redis_url.as_deref(), &settings.cache).await;
        (backend, cache)
    };

    let api = Arc::new(ApiClient::new(&settings.fetch)?);
    let search = Arc::new(SearchClient::new(
        Arc::clone(&api),
        &settings.endpoints.search_api_url,
    )?);
    let reader = ReaderService::new(backend, cache, search, settings);

    match cli.command {
        Command::Top { limit } => print_json(&reader.top_stories(limit).await?)?,
        Command::Feed { user, limit } => print_json(&reader.feed(&user, limit).await?)?,
        Command::Interests => print_json(&reader.list_interests().await?)?,
        Command::Select { user, interest_ids } => {
            let selected = reader.select_interests(&user, &interest_ids).await?;
            print_json(&serde_json::json!({ "user": user, "selected": selected }))?
        }
        Command::MyInterests { user } => print_json(&reader.my_interests(&user).await?)?,
        Command::Story { hn_id, user } => {
            match reader.story_detail(user.as_deref(), hn_id).await? {
                Some(detail) => print_json(&detail)?,
                None => anyhow::bail!("Story {hn_id} is not stored"),
            }
        }
        Command::Comments { hn_id, limit } => print_json(&reader.story_comments(hn_id, limit).await?)?,
        Command::Seen { user, hn_ids } => {
            let marked = reader.mark_seen(&user, &hn_ids).await?;
            print_json(&serde_json::json!({ "user": user, "seen": marked }))?
        }
        Command::Dismiss { user, hn_ids } => {
            let marked = reader.mark_dismissed(&user, &hn_ids).await?;
            print_json(&serde_json::json!({ "user": user, "dismissed": marked }))?
        }
        Command::Read { user, hn_id } => print_json(&reader.mark_read(&user, hn_id).await?)?,
        Command::Summary { hn_id } => print_json(&reader.summary(hn_id).await?)?,
        Command::RequestSummary { user, hn_id } => {
            print_json(&reader.request_summary(&user, hn_id).await?)?
        }
        Command::CommentSummary { hn_id } => print_json(&reader.comment_summary(hn_id).await?)?,
        Command::RequestCommentSummary { user, hn_id } => {
            print_json(&reader.request_comment_summary(&user, hn_id).await?)?
        }
        Command::SaveThread {
            user,
            story_hn_id,
            comment_hn_ids,
        } => {
            reader
                .request_saved_thread(&user, story_hn_id, comment_hn_ids)
                .await?;
            print_json(&serde_json::json!({ "queued": true, "story": story_hn_id }))?
        }
        Command::Threads { user } => print_json(&reader.saved_threads(&user).await?)?,
        Command::Thread { thread_id } => print_json(&reader.thread_entries(thread_id).await?)?,
        Command::Search { query, limit } => print_json(&reader.search(&query, limit).await?)?,
    }

    api.shutdown().await;
    Ok(())
}
