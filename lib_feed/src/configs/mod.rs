//! # Configuration Module
//!
//! Holds the explicit configuration struct consumed by every engine component.
//! Loading (defaults, JSON file, environment, CLI) is the binaries' job; this
//! module defines the shape, the defaults and validation.

/// Sectioned settings with serde defaults and validation.
pub mod settings;

pub use settings::{
    CacheSettings, CleanupSettings, CommentSettings, EndpointSettings, FeedLimits, FeedSettings,
    FetchSettings, InterestSettings, QueueSettings, SearchSettings, SettingsError, SummarySettings,
    TopItemsSettings, WorkerTimings,
};
