/// Audit logging for control-plane writes
///
/// This module provides structured logging of every write attempt against
/// the NSG, plus a per-run summary. Auditing is best-effort: a failure to
/// write the log is reported through tracing and never affects the run.
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

/// Types of auditable events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ApplyRule,
    RunSummary,
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// When the event occurred (UTC)
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Type of event
    pub event_type: EventType,

    /// Whether the operation succeeded
    pub success: bool,

    /// Additional structured data about the event
    pub details: serde_json::Value,

    /// Error message if operation failed
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(
        event_type: EventType,
        success: bool,
        details: serde_json::Value,
        error: Option<String>,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            event_type,
            success,
            details,
            error,
        }
    }
}

/// Audit log writer
pub struct AuditLog {
    log_path: PathBuf,
}

impl AuditLog {
    /// Creates a new audit log instance
    ///
    /// # Errors
    ///
    /// Returns `Err` if state directory cannot be determined
    pub fn new() -> std::io::Result<Self> {
        let mut log_path = crate::utils::get_state_dir().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "State directory not found")
        })?;
        log_path.push("audit.log");

        Ok(Self { log_path })
    }

    /// Appends an event to the audit log as one JSON line
    ///
    /// # Errors
    ///
    /// Returns `Err` if file cannot be opened or written
    pub async fn log(&self, event: AuditEvent) -> std::io::Result<()> {
        let json = serde_json::to_string(&event)?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await?;

        file.write_all(json.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.sync_all().await?;

        Ok(())
    }
}

/// Logs one create/update attempt
pub async fn log_apply(rule: &str, priority: u16, success: bool, error: Option<String>) {
    if let Ok(audit) = AuditLog::new() {
        let event = AuditEvent::new(
            EventType::ApplyRule,
            success,
            serde_json::json!({
                "rule": rule,
                "priority": priority,
            }),
            error,
        );

        if let Err(e) = audit.log(event).await {
            tracing::warn!("Failed to write audit log: {}", e);
        }
    }
}

/// Logs the end-of-run summary counts
pub async fn log_run(applied: usize, skipped: usize, failed: usize, invalid: usize) {
    if let Ok(audit) = AuditLog::new() {
        let event = AuditEvent::new(
            EventType::RunSummary,
            failed == 0,
            serde_json::json!({
                "applied": applied,
                "skipped": skipped,
                "failed": failed,
                "invalid_rows": invalid,
            }),
            None,
        );

        if let Err(e) = audit.log(event).await {
            tracing::warn!("Failed to write audit log: {}", e);
        }
    }
}
