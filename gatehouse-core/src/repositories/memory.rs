use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::{
    Error,
    repositories::AttemptRepository,
    storage::{AttemptRecord, RateLimitConfig, RateLimitDecision},
};

/// Process-local attempt store backed by a [`DashMap`].
///
/// The entry API holds the shard's write lock while the transition runs, which
/// makes check-and-increment atomic per identifier. State does not survive a
/// restart and is not shared between processes.
#[derive(Debug, Default)]
pub struct InMemoryAttemptRepository {
    records: DashMap<String, AttemptRecord>,
}

impl InMemoryAttemptRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttemptRepository for InMemoryAttemptRepository {
    async fn apply_attempt(
        &self,
        identifier: &str,
        now: DateTime<Utc>,
        config: &RateLimitConfig,
    ) -> Result<RateLimitDecision, Error> {
        let mut record = self
            .records
            .entry(identifier.to_string())
            .or_insert_with(|| AttemptRecord::new(now));

        Ok(record.register_attempt(now, config))
    }

    async fn get(&self, identifier: &str) -> Result<Option<AttemptRecord>, Error> {
        Ok(self.records.get(identifier).map(|record| record.clone()))
    }

    async fn remove(&self, identifier: &str) -> Result<bool, Error> {
        Ok(self.records.remove(identifier).is_some())
    }

    async fn evict_stale(
        &self,
        now: DateTime<Utc>,
        config: &RateLimitConfig,
    ) -> Result<u64, Error> {
        let mut evicted = 0u64;
        self.records.retain(|_, record| {
            let stale = record.is_stale(now, config);
            if stale {
                evicted += 1;
            }
            !stale
        });
        Ok(evicted)
    }

    async fn len(&self) -> Result<usize, Error> {
        Ok(self.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[tokio::test]
    async fn test_first_attempt_creates_record() {
        let repo = InMemoryAttemptRepository::new();
        let config = RateLimitConfig::default();

        let decision = repo
            .apply_attempt("user@example.com", start(), &config)
            .await
            .unwrap();

        assert!(decision.allowed);
        assert_eq!(decision.attempts, 1);
        let record = repo.get("user@example.com").await.unwrap().unwrap();
        assert_eq!(record.attempts, 1);
        assert_eq!(record.last_attempt, start());
        assert!(!record.blocked);
    }

    #[tokio::test]
    async fn test_remove_reports_existence() {
        let repo = InMemoryAttemptRepository::new();
        let config = RateLimitConfig::default();
        repo.apply_attempt("a", start(), &config).await.unwrap();

        assert!(repo.remove("a").await.unwrap());
        assert!(!repo.remove("a").await.unwrap());
        assert!(repo.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_evict_stale_keeps_recent_and_blocked() {
        let repo = InMemoryAttemptRepository::new();
        let config = RateLimitConfig::default();

        repo.apply_attempt("idle", start(), &config).await.unwrap();
        for _ in 0..6 {
            repo.apply_attempt("blocked", start() + Duration::minutes(10), &config)
                .await
                .unwrap();
        }
        repo.apply_attempt("recent", start() + Duration::minutes(25), &config)
            .await
            .unwrap();

        let evicted = repo
            .evict_stale(start() + Duration::minutes(30), &config)
            .await
            .unwrap();

        assert_eq!(evicted, 1);
        assert!(repo.get("idle").await.unwrap().is_none());
        assert!(repo.get("blocked").await.unwrap().is_some());
        assert!(repo.get("recent").await.unwrap().is_some());
        assert_eq!(repo.len().await.unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_attempts_are_all_counted() {
        let repo = Arc::new(InMemoryAttemptRepository::new());
        let config = Arc::new(RateLimitConfig {
            max_attempts: 1_000,
            ..RateLimitConfig::default()
        });

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let repo = Arc::clone(&repo);
                let config = Arc::clone(&config);
                tokio::spawn(async move {
                    repo.apply_attempt("shared", start(), &config).await.unwrap()
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        let record = repo.get("shared").await.unwrap().unwrap();
        assert_eq!(record.attempts, 64);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_evicted_count_ignores_concurrent_inserts() {
        let repo = Arc::new(InMemoryAttemptRepository::new());
        let config = Arc::new(RateLimitConfig::default());
        let now = start() + Duration::minutes(40);

        for i in 0..1_000 {
            repo.apply_attempt(&format!("idle-{i}"), start(), &config)
                .await
                .unwrap();
        }

        let writer = {
            let repo = Arc::clone(&repo);
            let config = Arc::clone(&config);
            tokio::spawn(async move {
                for i in 0..1_000 {
                    repo.apply_attempt(&format!("fresh-{i}"), now, &config)
                        .await
                        .unwrap();
                }
            })
        };

        let evicted = repo.evict_stale(now, &config).await.unwrap();
        writer.await.unwrap();

        assert_eq!(evicted, 1_000);
        assert_eq!(repo.len().await.unwrap(), 1_000);
    }
}
