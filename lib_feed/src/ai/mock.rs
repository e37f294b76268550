use super::{Consensus, SummarizeError, Summarizer, SummaryData};
use async_trait::async_trait;
use serde_json::Value;

const MAX_KEY_POINTS: usize = 5;

/// Produces summaries derived only from the payload fields.
///
/// - `tldr` is `TL;DR: <title>`, or `TL;DR: <type> <id>` for untitled items.
/// - `key_points` are the title plus the first three other fields in key order.
/// - `consensus` follows `score`: above 100 positive, above 0 mixed, 0 or
///   missing unclear, negative otherwise.
pub struct MockSummarizer {
    model_version: String,
}

impl MockSummarizer {
    pub fn new(model_version: impl Into<String>) -> Self {
        Self {
            model_version: model_version.into(),
        }
    }
}

impl Default for MockSummarizer {
    fn default() -> Self {
        Self::new("mock-v1")
    }
}

fn consensus_for(score: Option<i64>) -> Consensus {
    match score {
        Some(s) if s > 100 => Consensus::Positive,
        Some(s) if s > 0 => Consensus::Mixed,
        Some(s) if s < 0 => Consensus::Negative,
        _ => Consensus::Unclear,
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    fn model_version(&self) -> &str {
        &self.model_version
    }

    async fn summarize(&self, payload: &Value) -> Result<SummaryData, SummarizeError> {
        let object = payload
            .as_object()
            .ok_or_else(|| SummarizeError::EmptyInput("payload is not an object".to_string()))?;

        let title = object.get("title").and_then(Value::as_str);
        let tldr = match title {
            Some(t) => format!("TL;DR: {t}"),
            None => {
                let kind = object.get("type").and_then(Value::as_str).unwrap_or("item");
                let id = object.get("id").map(Value::to_string).unwrap_or_default();
                format!("TL;DR: {kind} {id}")
            }
        };

        let mut key_points: Vec<String> = title.map(|t| format!("Title: {t}")).into_iter().collect();
        key_points.extend(
            object
                .iter()
                .filter(|(k, _)| k.as_str() != "title")
                .take(3)
                .map(|(k, v)| format!("{k}: {v}")),
        );
        key_points.truncate(MAX_KEY_POINTS);

        let score = object.get("score").and_then(Value::as_i64);

        Ok(SummaryData {
            tldr,
            key_points,
            consensus: consensus_for(score),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_consensus_follows_score() {
        let ai = MockSummarizer::default();
        for (score, expected) in [
            (json!(150), Consensus::Positive),
            (json!(5), Consensus::Mixed),
            (json!(0), Consensus::Unclear),
            (json!(-3), Consensus::Negative),
            (Value::Null, Consensus::Unclear),
        ] {
            let out = ai.summarize(&json!({ "id": 1, "score": score })).await.unwrap();
            assert_eq!(out.consensus, expected);
        }
    }

    #[tokio::test]
    async fn test_is_deterministic_and_uses_title() {
        let ai = MockSummarizer::default();
        let payload = json!({ "id": 7, "title": "Rust 2.0", "score": 12, "by": "pg" });
        let a = ai.summarize(&payload).await.unwrap();
        let b = ai.summarize(&payload).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.tldr, "TL;DR: Rust 2.0");
        assert_eq!(a.key_points[0], "Title: Rust 2.0");
        assert!(a.key_points.len() <= MAX_KEY_POINTS);
    }

    #[tokio::test]
    async fn test_untitled_comment_fallback() {
        let ai = MockSummarizer::default();
        let out = ai.summarize(&json!({ "id": 3, "type": "comment" })).await.unwrap();
        assert_eq!(out.tldr, "TL;DR: comment 3");
    }

    #[tokio::test]
    async fn test_rejects_non_object() {
        let ai = MockSummarizer::default();
        assert!(ai.summarize(&json!([1, 2])).await.is_err());
    }
}
