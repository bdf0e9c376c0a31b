//! Response cache keyed by request fingerprint.
//!
//! Entries expire after their TTL. When the in-memory cache is full, expired entries
//! are dropped first, then the entry closest to expiry. TTLs are capped at
//! [`MAX_ENTRY_TTL`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use answer_core::AnswerResponse;

#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<AnswerResponse>;
    async fn set(&self, key: &str, value: &AnswerResponse, ttl: Duration);
}

/// Cache that never stores anything. Used when caching is disabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullResponseCache;

#[async_trait]
impl ResponseCache for NullResponseCache {
    async fn get(&self, _key: &str) -> Option<AnswerResponse> {
        None
    }

    async fn set(&self, _key: &str, _value: &AnswerResponse, _ttl: Duration) {}
}

pub const MAX_ENTRY_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

struct CacheEntry {
    value: AnswerResponse,
    expires_at: Instant,
}

pub struct InMemoryResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    max_entries: usize,
}

impl InMemoryResponseCache {
    pub fn new(max_entries: usize) -> Self {
        Self { entries: RwLock::new(HashMap::new()), max_entries: max_entries.max(1) }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ResponseCache for InMemoryResponseCache {
    async fn get(&self, key: &str) -> Option<AnswerResponse> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.expires_at <= now) {
            entries.remove(key);
        }
        None
    }

    async fn set(&self, key: &str, value: &AnswerResponse, ttl: Duration) {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl.min(MAX_ENTRY_TTL)).unwrap_or(now);
        let mut entries = self.entries.write().await;

        if !entries.contains_key(key) && entries.len() >= self.max_entries {
            entries.retain(|_, entry| entry.expires_at > now);
            if entries.len() >= self.max_entries {
                let soonest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.expires_at)
                    .map(|(key, _)| key.clone());
                if let Some(soonest) = soonest {
                    entries.remove(&soonest);
                }
            }
        }

        entries.insert(key.to_owned(), CacheEntry { value: value.clone(), expires_at });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use answer_core::answer::{AnswerTrace, ConfidenceLevel, Intent, ProviderTrace};
    use answer_core::AnswerResponse;

    use super::{InMemoryResponseCache, NullResponseCache, ResponseCache};

    fn response(answer: &str) -> AnswerResponse {
        AnswerResponse {
            answer: answer.to_owned(),
            confidence: ConfidenceLevel::Low,
            reason: "reason".to_owned(),
            next_action: "next".to_owned(),
            intent: Intent::UnknownIntent,
            entities: None,
            trace: AnswerTrace {
                request_id: "req".to_owned(),
                normalized_question: "q".to_owned(),
                missing_fields: Vec::new(),
                rules_applied: Vec::new(),
                provider: ProviderTrace { llm_model: "m".to_owned(), latency_ms: 10 },
            },
        }
    }

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn oversized_ttl_is_capped_instead_of_overflowing() {
        let cache = InMemoryResponseCache::new(4);
        cache.set("forever", &response("kept"), Duration::from_secs(u64::MAX)).await;
        cache.set("max", &response("also kept"), Duration::MAX).await;

        assert_eq!(cache.get("forever").await.map(|hit| hit.answer).as_deref(), Some("kept"));
        assert_eq!(cache.get("max").await.map(|hit| hit.answer).as_deref(), Some("also kept"));
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn stored_value_is_returned_until_it_expires() {
        let cache = InMemoryResponseCache::new(8);
        cache.set("live", &response("live"), MINUTE).await;
        cache.set("dead", &response("dead"), Duration::ZERO).await;

        assert_eq!(cache.get("live").await.map(|value| value.answer), Some("live".to_owned()));
        assert!(cache.get("dead").await.is_none());
        assert!(cache.get("missing").await.is_none());
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn full_cache_evicts_the_entry_closest_to_expiry() {
        let cache = InMemoryResponseCache::new(2);
        cache.set("short", &response("short"), MINUTE).await;
        cache.set("long", &response("long"), MINUTE * 10).await;
        cache.set("new", &response("new"), MINUTE * 5).await;

        assert!(cache.get("short").await.is_none());
        assert!(cache.get("long").await.is_some());
        assert!(cache.get("new").await.is_some());
    }

    #[tokio::test]
    async fn null_cache_never_hits() {
        let cache = NullResponseCache;
        cache.set("key", &response("x"), MINUTE).await;
        assert!(cache.get("key").await.is_none());
    }
}
