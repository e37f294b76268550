//! # Summarization Contract
//!
//! The engine only depends on the call shape of summarization: a payload in,
//! a `SummaryData` out. Generation itself is an external collaborator; the
//! bundled [`MockSummarizer`] is deterministic so background jobs can be
//! exercised end to end.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Deterministic summarizer for development and tests.
pub mod mock;

pub use mock::MockSummarizer;

/// Overall tone of a discussion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consensus {
    Positive,
    Mixed,
    Unclear,
    Negative,
}

impl Consensus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Consensus::Positive => "positive",
            Consensus::Mixed => "mixed",
            Consensus::Unclear => "unclear",
            Consensus::Negative => "negative",
        }
    }

    /// Unrecognized values read back from storage map to `Unclear`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "positive" => Consensus::Positive,
            "mixed" => Consensus::Mixed,
            "negative" => Consensus::Negative,
            _ => Consensus::Unclear,
        }
    }
}

/// The result of one summarization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryData {
    pub tldr: String,
    pub key_points: Vec<String>,
    pub consensus: Consensus,
}

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("Nothing to summarize: {0}")]
    EmptyInput(String),
    #[error("Summarization provider failed: {0}")]
    Provider(String),
}

/// A summarization provider.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Identifies the model; summaries are stored per version.
    fn model_version(&self) -> &str;

    /// Summarizes one raw item payload.
    async fn summarize(&self, payload: &Value) -> Result<SummaryData, SummarizeError>;
}
