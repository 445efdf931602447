//! At-most-once gate for redelivered events.
//!
//! The platform retries deliveries it believes failed, so every mention and
//! interaction is claimed in a [`DedupStore`] before its handler runs. The
//! store's conditional insert is the only synchronization point: exactly one
//! caller per key observes [`InsertOutcome::Inserted`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Result of a conditional insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The key was absent and is now recorded.
    Inserted,
    /// Another delivery already claimed the key.
    AlreadyPresent,
}

/// Durable keyed store supporting an atomic "insert if absent".
#[async_trait]
pub trait DedupStore: Send + Sync {
    async fn conditional_insert(&self, key: &str) -> Result<InsertOutcome, DispatchError>;
}

/// How long a claimed key blocks redeliveries by default.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(60 * 60);

/// Map size at which expired keys are swept before the next insert.
const DEFAULT_SWEEP_THRESHOLD: usize = 10_000;

/// In-process store keyed by dedup key.
///
/// Keys live for the retention window, after which the same key can be
/// claimed again. The map is private to one process, so replicas behind a
/// load balancer do not share claims.
pub struct MemoryDedupStore {
    table: String,
    seen: DashMap<String, DateTime<Utc>>,
    retention: chrono::Duration,
    sweep_threshold: usize,
}

impl MemoryDedupStore {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            seen: DashMap::new(),
            retention: to_chrono(DEFAULT_RETENTION),
            sweep_threshold: DEFAULT_SWEEP_THRESHOLD,
        }
    }

    pub fn with_ttl(mut self, retention: Duration) -> Self {
        self.retention = to_chrono(retention);
        self
    }

    pub fn with_sweep_threshold(mut self, threshold: usize) -> Self {
        self.sweep_threshold = threshold.max(1);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// When a live key was claimed.
    pub fn first_seen(&self, key: &str) -> Option<DateTime<Utc>> {
        let now = Utc::now();
        self.seen
            .get(key)
            .map(|at| *at)
            .filter(|at| !self.expired(*at, now))
    }

    /// Drop every expired key. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Utc::now();
        let before = self.seen.len();
        self.seen.retain(|_, at| !self.expired(*at, now));
        let removed = before.saturating_sub(self.seen.len());
        if removed > 0 {
            tracing::debug!(table = %self.table, removed, "Swept expired dedup keys");
        }
        removed
    }

    fn expired(&self, claimed_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - claimed_at >= self.retention
    }
}

fn to_chrono(retention: Duration) -> chrono::Duration {
    chrono::Duration::from_std(retention).unwrap_or_else(|_| chrono::Duration::days(365 * 100))
}

impl Default for MemoryDedupStore {
    fn default() -> Self {
        Self::new("dedup")
    }
}

#[async_trait]
impl DedupStore for MemoryDedupStore {
    async fn conditional_insert(&self, key: &str) -> Result<InsertOutcome, DispatchError> {
        // Sweep before taking the entry lock; `retain` locks every shard.
        if self.seen.len() >= self.sweep_threshold {
            self.sweep();
        }

        let now = Utc::now();
        match self.seen.entry(key.to_string()) {
            Entry::Occupied(mut slot) => {
                if self.expired(*slot.get(), now) {
                    slot.insert(now);
                    Ok(InsertOutcome::Inserted)
                } else {
                    Ok(InsertOutcome::AlreadyPresent)
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
                Ok(InsertOutcome::Inserted)
            }
        }
    }
}

/// What the gate decided for one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupDecision {
    Proceed,
    AlreadyProcessed,
    /// The store could not be reached and the gate is failing closed.
    StoreUnavailable,
}

impl DedupDecision {
    pub fn permits(&self) -> bool {
        matches!(self, DedupDecision::Proceed)
    }
}

/// Behaviour when the store errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreFailurePolicy {
    /// Skip the handler.
    #[default]
    FailClosed,
    /// Run the handler anyway.
    FailOpen,
}

/// Claims dedup keys before handlers run.
#[derive(Clone)]
pub struct DedupGate {
    store: Option<Arc<dyn DedupStore>>,
    policy: StoreFailurePolicy,
}

impl DedupGate {
    pub fn new(store: Arc<dyn DedupStore>) -> Self {
        Self {
            store: Some(store),
            policy: StoreFailurePolicy::default(),
        }
    }

    /// A gate that lets everything through.
    pub fn disabled() -> Self {
        Self {
            store: None,
            policy: StoreFailurePolicy::default(),
        }
    }

    pub fn with_failure_policy(mut self, policy: StoreFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Claim `key`. A payload without a usable key is let through.
    pub async fn ensure(&self, key: Option<&str>) -> DedupDecision {
        let Some(store) = &self.store else {
            return DedupDecision::Proceed;
        };
        let Some(key) = key.filter(|k| !k.is_empty()) else {
            tracing::debug!("No dedup key on payload, proceeding");
            return DedupDecision::Proceed;
        };

        match store.conditional_insert(key).await {
            Ok(InsertOutcome::Inserted) => DedupDecision::Proceed,
            Ok(InsertOutcome::AlreadyPresent) => {
                tracing::info!(key = %key, "Duplicate delivery skipped");
                DedupDecision::AlreadyProcessed
            }
            Err(e) => match self.policy {
                StoreFailurePolicy::FailClosed => {
                    tracing::error!(key = %key, error = %e, "Dedup store unavailable, skipping handler");
                    DedupDecision::StoreUnavailable
                }
                StoreFailurePolicy::FailOpen => {
                    tracing::warn!(key = %key, error = %e, "Dedup store unavailable, proceeding");
                    DedupDecision::Proceed
                }
            },
        }
    }
}

impl std::fmt::Debug for DedupGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DedupGate")
            .field("enabled", &self.is_enabled())
            .field("policy", &self.policy)
            .finish()
    }
}
