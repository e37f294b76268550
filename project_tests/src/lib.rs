//! # Integration Test Fixtures
//!
//! Scripted stand-ins for the external source and search APIs, a counting top
//! feed source for stampede tests, and a helper that serves an `axum` router on
//! an ephemeral local port. The tests under `tests/` share these.

pub mod fakes;
pub mod stub;

use lib_feed::FeedSettings;

/// Engine settings with waits shortened for tests.
pub fn test_settings() -> FeedSettings {
    let mut settings = FeedSettings::default();
    settings.worker.signal_wait_secs = 0;
    settings.worker.error_sleep_secs = 0;
    settings.fetch.backoff_secs = 0.01;
    settings
}
