//! Static interest catalog: five groups of five interests, each with the
//! keywords its shelf is searched by.

use crate::store::{ContentBackend, Interest, StoreError};
use tracing::info;

pub struct CatalogEntry {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
}

pub struct CatalogGroup {
    pub group: &'static str,
    pub items: &'static [CatalogEntry],
}

const fn entry(name: &'static str, keywords: &'static [&'static str]) -> CatalogEntry {
    CatalogEntry { name, keywords }
}

pub static INTEREST_GROUPS: &[CatalogGroup] = &[
    CatalogGroup {
        group: "AI",
        items: &[
            entry("LLMs", &["llm", "gpt", "transformer", "claude", "gemini"]),
            entry("AI Research", &["arxiv", "paper", "benchmark", "research", "neural"]),
            entry("MLOps", &["mlops", "inference", "serving", "pipeline", "deployment"]),
            entry("AI Safety", &["alignment", "safety", "evals", "red team", "policy"]),
            entry(
                "Prompting",
                &["prompt", "prompting", "system prompt", "prompt engineering", "chain-of-thought"],
            ),
        ],
    },
    CatalogGroup {
        group: "Backend",
        items: &[
            entry("Databases", &["postgres", "mysql", "sqlite", "database", "sql"]),
            entry("Distributed Systems", &["distributed", "consensus", "raft", "paxos", "kafka"]),
            entry("DevOps", &["devops", "ci/cd", "kubernetes", "docker", "terraform"]),
            entry("Networking", &["network", "tcp", "http", "dns", "bgp"]),
            entry("Cloud", &["aws", "gcp", "azure", "cloud", "serverless"]),
        ],
    },
    CatalogGroup {
        group: "Frontend",
        items: &[
            entry("Web Frameworks", &["react", "vue", "svelte", "angular", "next"]),
            entry("UI/UX", &["ux", "ui", "design", "interface", "usability"]),
            entry("Mobile", &["android", "ios", "flutter", "react native", "swift"]),
            entry("Design Systems", &["design system", "component", "storybook", "ui kit", "tokens"]),
            entry("Performance", &["performance", "web perf", "latency", "bundle", "rendering"]),
        ],
    },
    CatalogGroup {
        group: "Startups",
        items: &[
            entry("SaaS", &["saas", "b2b", "subscription", "pricing", "churn"]),
            entry("Fundraising", &["funding", "series a", "seed", "investor", "vc"]),
            entry("Product Strategy", &["product", "roadmap", "strategy", "market", "pm"]),
            entry("Growth", &["growth", "marketing", "seo", "distribution", "acquisition"]),
            entry("Hiring", &["hiring", "jobs", "recruiting", "talent", "interview"]),
        ],
    },
    CatalogGroup {
        group: "Security",
        items: &[
            entry("AppSec", &["security", "xss", "csrf", "auth", "vulnerability"]),
            entry("InfraSec", &["infra", "zero trust", "cloud security", "iam", "k8s security"]),
            entry("Cryptography", &["crypto", "encryption", "tls", "hash", "key"]),
            entry("Privacy", &["privacy", "tracking", "data", "gdpr", "consent"]),
            entry("Vulnerabilities", &["cve", "exploit", "bug", "rce", "patch"]),
        ],
    },
];

/// Upserts every catalog interest; safe to run on every start.
pub async fn seed_catalog(backend: &dyn ContentBackend) -> Result<Vec<Interest>, StoreError> {
    let mut seeded = Vec::new();
    for group in INTEREST_GROUPS {
        for item in group.items {
            let keywords: Vec<String> = item.keywords.iter().map(|k| k.to_string()).collect();
            seeded.push(backend.upsert_interest(group.group, item.name, &keywords).await?);
        }
    }
    info!(count = seeded.len(), "Interest catalog seeded");
    Ok(seeded)
}

/// The search query for an interest: its first `max_keywords` keywords.
pub fn keyword_query(interest: &Interest, max_keywords: usize) -> Option<String> {
    let query = interest
        .keywords
        .iter()
        .take(max_keywords)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    (!query.trim().is_empty()).then_some(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryContentStore;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_shape() {
        assert_eq!(INTEREST_GROUPS.len(), 5);
        for group in INTEREST_GROUPS {
            assert_eq!(group.items.len(), 5, "group {}", group.group);
        }
        let names: HashSet<_> = INTEREST_GROUPS
            .iter()
            .flat_map(|g| g.items.iter().map(|i| i.name))
            .collect();
        assert_eq!(names.len(), 25);
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = MemoryContentStore::new();
        let first = seed_catalog(&store).await.unwrap();
        let second = seed_catalog(&store).await.unwrap();
        assert_eq!(first.len(), 25);
        assert_eq!(
            first.iter().map(|i| i.id).collect::<Vec<_>>(),
            second.iter().map(|i| i.id).collect::<Vec<_>>()
        );
        assert_eq!(store.list_interests().await.unwrap().len(), 25);
    }

    #[test]
    fn test_keyword_query_caps_keywords() {
        let interest = Interest {
            id: 1,
            group_name: "AI".into(),
            name: "LLMs".into(),
            keywords: vec!["a".into(), "b".into(), "c".into()],
            read_count: 0,
            last_read_at: None,
        };
        assert_eq!(keyword_query(&interest, 2).as_deref(), Some("a b"));
        let empty = Interest { keywords: vec![], ..interest };
        assert_eq!(keyword_query(&empty, 5), None);
    }
}
