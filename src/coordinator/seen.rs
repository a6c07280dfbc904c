/// "Already posted" checks consulted before a token is evaluated

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

#[async_trait]
pub trait SeenOracle: Send + Sync {
    async fn has_seen(&self, token: &str) -> Result<bool>;
}

/// Process-local oracle; the alert printer marks tokens after posting
#[derive(Debug, Default)]
pub struct MemorySeenOracle {
    seen: DashMap<String, DateTime<Utc>>,
}

impl MemorySeenOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_seen(&self, token: &str) {
        self.seen.entry(token.to_string()).or_insert_with(Utc::now);
    }

    pub fn seen_at(&self, token: &str) -> Option<DateTime<Utc>> {
        self.seen.get(token).map(|t| *t.value())
    }
}

#[async_trait]
impl SeenOracle for MemorySeenOracle {
    async fn has_seen(&self, token: &str) -> Result<bool> {
        Ok(self.seen.contains_key(token))
    }
}
