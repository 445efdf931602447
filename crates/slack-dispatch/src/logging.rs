//! Dispatch record logger.
//!
//! Every handler invocation produces one [`DispatchRecord`], emitted as a JSON
//! line on the `dispatch` tracing target and optionally appended to a file.

use std::path::PathBuf;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::types::{DispatchRecord, RouteKind};

/// Structured dispatch logger that writes JSON lines to a file or tracing only.
pub struct DispatchLogger {
    log_path: Option<PathBuf>,
    count: RwLock<u64>,
    failures: RwLock<u64>,
}

impl DispatchLogger {
    /// Create a logger that also appends to `log_path` when given.
    pub fn new(log_path: Option<PathBuf>) -> Self {
        Self {
            log_path,
            count: RwLock::new(0),
            failures: RwLock::new(0),
        }
    }

    pub async fn log(&self, record: &DispatchRecord) {
        let json = serde_json::to_string(record).unwrap_or_else(|e| {
            format!(
                r#"{{"error":"serialization failed: {}","ts":"{}"}}"#,
                e,
                Utc::now().to_rfc3339()
            )
        });

        if record.success {
            tracing::info!(target: "dispatch", "{}", json);
        } else {
            tracing::warn!(target: "dispatch", "{}", json);
        }

        if let Some(ref path) = self.log_path {
            if let Err(e) = append_log_line(path, &json).await {
                tracing::warn!("Failed to write dispatch log: {}", e);
            }
        }

        *self.count.write().await += 1;
        if !record.success {
            *self.failures.write().await += 1;
        }
    }

    /// Build a record stamped with the current time.
    pub fn entry(
        route: RouteKind,
        binding: &str,
        user: &str,
        channel: &str,
        success: bool,
        duration_ms: Option<u64>,
        error: Option<String>,
    ) -> DispatchRecord {
        DispatchRecord {
            ts: Utc::now(),
            route,
            binding: binding.to_string(),
            user: user.to_string(),
            channel: channel.to_string(),
            success,
            duration_ms,
            error,
        }
    }

    /// Total records logged.
    pub async fn dispatch_count(&self) -> u64 {
        *self.count.read().await
    }

    pub async fn failure_count(&self) -> u64 {
        *self.failures.read().await
    }
}

impl Default for DispatchLogger {
    fn default() -> Self {
        Self::new(None)
    }
}

async fn append_log_line(path: &std::path::Path, line: &str) -> Result<(), std::io::Error> {
    use tokio::io::AsyncWriteExt;

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await?;
    Ok(())
}
