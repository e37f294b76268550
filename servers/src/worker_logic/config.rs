use anyhow::{Context, Result};
use clap::Parser;
use lib_feed::FeedSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file read when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "feed_worker.json";

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[clap(about = "Hacker News feed ingestion worker", version)]
#[serde(rename_all = "camelCase")]
pub struct WorkerConfig {
    #[clap(long = "config", env = "FEED_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "FEED_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "FEED_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "FEED_LOG_JSON", help = "Write the log file as JSON lines (true/false).")]
    pub log_json: Option<bool>,

    #[clap(long, env = "FEED_DATABASE_URL", help = "PostgreSQL connection URL.")]
    pub database_url: Option<String>,

    #[clap(long, env = "FEED_DB_POOL_SIZE", help = "Maximum pooled database connections.")]
    pub db_pool_size: Option<usize>,

    #[clap(long, env = "FEED_REDIS_URL", help = "Redis URL; without it the cache and job queues are disabled.")]
    pub redis_url: Option<String>,

    #[clap(long, env = "FEED_HN_API_URL", help = "Base URL of the item API.")]
    pub hn_api_url: Option<String>,

    #[clap(long, env = "FEED_SEARCH_API_URL", help = "URL of the keyword search API.")]
    pub search_api_url: Option<String>,

    #[clap(long, env = "FEED_RATE_PER_SEC", help = "Outbound requests per second.")]
    pub rate_per_sec: Option<f64>,

    #[clap(long, env = "FEED_MAX_CONCURRENCY", help = "Maximum simultaneous outbound requests.")]
    pub max_concurrency: Option<usize>,

    #[clap(long, env = "FEED_TOP_LIMIT", help = "Length of the global top list.")]
    pub top_limit: Option<usize>,

    #[clap(long, env = "FEED_TOP_REFRESH_SECS", help = "Seconds between top list refreshes.")]
    pub top_refresh_secs: Option<u64>,

    #[clap(long, env = "FEED_INTEREST_REFRESH_SECS", help = "Seconds between full interest refreshes.")]
    pub interest_refresh_secs: Option<u64>,

    #[clap(long, env = "FEED_SUMMARY_ENABLED", help = "Queue summaries for new or changed top items (true/false).")]
    pub summary_enabled: Option<bool>,

    #[clap(long, env = "FEED_CLEANUP_INTERVAL_SECS", help = "Seconds between retention cleanups.")]
    pub cleanup_interval_secs: Option<u64>,

    /// Full sectioned engine settings; only settable from the config file.
    #[clap(skip)]
    pub settings: Option<FeedSettings>,
}

impl WorkerConfig {
    fn defaults() -> Self {
        WorkerConfig {
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            log_json: Some(false),
            db_pool_size: Some(16),
            ..Default::default()
        }
    }

    // Merge two WorkerConfig structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: WorkerConfig) -> WorkerConfig {
        WorkerConfig {
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            log_json: other.log_json.or(self.log_json),
            database_url: other.database_url.or(self.database_url),
            db_pool_size: other.db_pool_size.or(self.db_pool_size),
            redis_url: other.redis_url.or(self.redis_url),
            hn_api_url: other.hn_api_url.or(self.hn_api_url),
            search_api_url: other.search_api_url.or(self.search_api_url),
            rate_per_sec: other.rate_per_sec.or(self.rate_per_sec),
            max_concurrency: other.max_concurrency.or(self.max_concurrency),
            top_limit: other.top_limit.or(self.top_limit),
            top_refresh_secs: other.top_refresh_secs.or(self.top_refresh_secs),
            interest_refresh_secs: other.interest_refresh_secs.or(self.interest_refresh_secs),
            summary_enabled: other.summary_enabled.or(self.summary_enabled),
            cleanup_interval_secs: other.cleanup_interval_secs.or(self.cleanup_interval_secs),
            settings: other.settings.or(self.settings),
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| PathBuf::from("./logs"))
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    /// Engine settings: the file's sections, then the flat overrides on top,
    /// validated.
    pub fn to_settings(&self) -> Result<FeedSettings> {
        let mut s = self.settings.clone().unwrap_or_default();
        if let Some(url) = &self.hn_api_url {
            s.endpoints.hn_api_url = url.clone();
        }
        if let Some(url) = &self.search_api_url {
            s.endpoints.search_api_url = url.clone();
        }
        if let Some(rate) = self.rate_per_sec {
            s.fetch.rate_per_sec = rate;
        }
        if let Some(n) = self.max_concurrency {
            s.fetch.max_concurrency = n;
        }
        if let Some(n) = self.top_limit {
            s.top.limit = n;
        }
        if let Some(secs) = self.top_refresh_secs {
            s.top.refresh_secs = secs;
        }
        if let Some(secs) = self.interest_refresh_secs {
            s.interest.refresh_secs = secs;
        }
        if let Some(enabled) = self.summary_enabled {
            s.summary.enabled = enabled;
        }
        if let Some(secs) = self.cleanup_interval_secs {
            s.cleanup.interval_secs = secs;
        }
        s.validate().context("Invalid feed settings")?;
        Ok(s)
    }
}

fn read_config_file(path: &Path) -> Result<WorkerConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

/// Layers defaults, the JSON config file and the parsed CLI/env values.
///
/// An explicit `--config` path must exist; the default file is optional.
pub fn load_config(cli: WorkerConfig) -> Result<WorkerConfig> {
    let mut current = WorkerConfig::defaults();

    match &cli.config_path {
        Some(path) => current = current.merge(read_config_file(path)?),
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if path.exists() {
                current = current.merge(read_config_file(&path)?);
            }
        }
    }

    Ok(current.merge(cli))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cli_overrides_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"logLevel": "debug", "topLimit": 30, "redisUrl": "redis://file/"}}"#
        )
        .unwrap();

        let cli = WorkerConfig {
            config_path: Some(file.path().to_path_buf()),
            top_limit: Some(10),
            ..Default::default()
        };
        let config = load_config(cli).unwrap();

        assert_eq!(config.top_limit, Some(10));
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.redis_url.as_deref(), Some("redis://file/"));
        assert_eq!(config.db_pool_size, Some(16));
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cli = WorkerConfig {
            config_path: Some(dir.path().join("absent.json")),
            ..Default::default()
        };
        assert!(load_config(cli).is_err());
    }

    #[test]
    fn test_flat_overrides_apply_over_file_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"settings": {{"top": {{"limit": 25}}, "summary": {{"enabled": true}}}}}}"#
        )
        .unwrap();

        let cli = WorkerConfig {
            config_path: Some(file.path().to_path_buf()),
            summary_enabled: Some(false),
            ..Default::default()
        };
        let settings = load_config(cli).unwrap().to_settings().unwrap();

        assert_eq!(settings.top.limit, 25);
        assert!(!settings.summary.enabled);
        assert_eq!(settings.comments.fetch_limit, 100);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let cli = WorkerConfig {
            max_concurrency: Some(0),
            ..Default::default()
        };
        let err = cli.to_settings().unwrap_err();
        assert!(format!("{err:#}").contains("fetch.maxConcurrency"));
    }

    #[test]
    fn test_parse_flags() {
        let cli = WorkerConfig::try_parse_from(["feed_worker", "--top-limit", "7", "--summary-enabled", "true"])
            .unwrap();
        assert_eq!(cli.top_limit, Some(7));
        assert_eq!(cli.summary_enabled, Some(true));
    }
}
