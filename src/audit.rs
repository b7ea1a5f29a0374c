/// Audit logging for profile changes and privileged operations
///
/// Every mutation of the profile store, every config write and every call to
/// `nft` that changes or checks the kernel ruleset is recorded as one
/// JSON line in `audit.log` under the state directory.
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Types of auditable events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventType {
    AddProfile,
    EditProfile,
    RemoveProfile,
    SaveConfig,
    VerifyRules,
    ApplyRules,
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
    /// Creates a new audit event
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
    /// Creates an audit log in the state directory
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

    /// Creates an audit log at an explicit path
    pub fn at(path: impl AsRef<Path>) -> Self {
        Self {
            log_path: path.as_ref().to_path_buf(),
        }
    }

    /// Appends an event to the audit log
    ///
    /// Events are written as JSON-lines format (one JSON object per line)
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

    /// Reads the most recent events from the log, newest first
    ///
    /// Lines that fail to parse are skipped. A missing log reads as empty.
    ///
    /// # Errors
    ///
    /// Returns `Err` if file exists but cannot be read
    pub async fn read_recent(&self, count: usize) -> std::io::Result<Vec<AuditEvent>> {
        let content = match tokio::fs::read_to_string(&self.log_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let events: Vec<AuditEvent> = content
            .lines()
            .rev()
            .filter_map(|line| serde_json::from_str(line).ok())
            .take(count)
            .collect();

        Ok(events)
    }

    /// Returns the path to the audit log file
    pub fn path(&self) -> &Path {
        &self.log_path
    }
}

async fn record(event: AuditEvent) {
    if let Ok(audit) = AuditLog::new()
        && let Err(e) = audit.log(event).await
    {
        tracing::warn!("Failed to write audit log: {}", e);
    }
}

/// Logs a profile add/edit/remove
pub async fn log_profile_change(event_type: EventType, profile: &str, change: &str) {
    record(AuditEvent::new(
        event_type,
        true,
        serde_json::json!({
            "profile": profile,
            "change": change,
        }),
        None,
    ))
    .await;
}

/// Logs a configuration file write
pub async fn log_save(path: &Path, profile_count: usize, success: bool, error: Option<String>) {
    record(AuditEvent::new(
        EventType::SaveConfig,
        success,
        serde_json::json!({
            "path": path.display().to_string(),
            "profile_count": profile_count,
        }),
        error,
    ))
    .await;
}

/// Logs a verification operation
pub async fn log_verify(success: bool, error_count: usize, error: Option<String>) {
    record(AuditEvent::new(
        EventType::VerifyRules,
        success,
        serde_json::json!({
            "error_count": error_count,
        }),
        error,
    ))
    .await;
}

/// Logs an apply operation
///
/// * `profile_count` - Number of profiles in the applied file
/// * `rule_count` - Number of profiles that produced a live accept rule
pub async fn log_apply(
    profile_count: usize,
    rule_count: usize,
    success: bool,
    error: Option<String>,
) {
    record(AuditEvent::new(
        EventType::ApplyRules,
        success,
        serde_json::json!({
            "profile_count": profile_count,
            "rule_count": rule_count,
        }),
        error,
    ))
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_audit_event_creation() {
        let event = AuditEvent::new(
            EventType::ApplyRules,
            true,
            serde_json::json!({"rule_count": 5}),
            None,
        );

        assert!(event.success);
        assert!(event.error.is_none());
        assert_eq!(event.details["rule_count"], 5);
    }

    #[test]
    fn test_event_serialization() {
        let event = AuditEvent::new(
            EventType::VerifyRules,
            false,
            serde_json::json!({"errors": 2}),
            Some("validation failed".to_string()),
        );

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("verify_rules"));
        assert!(json.contains("validation failed"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"timestamp":"2024-01-01T00:00:00Z","event_type":"add_profile","success":true,"details":{"profile":"brazil"},"error":null}"#;
        let event: AuditEvent = serde_json::from_str(json).unwrap();

        assert!(event.success);
        assert_eq!(event.event_type, EventType::AddProfile);
    }

    #[test]
    fn test_event_type_display_matches_serde() {
        assert_eq!(EventType::RemoveProfile.to_string(), "remove_profile");
    }

    #[tokio::test]
    async fn test_read_recent_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let audit = AuditLog::at(dir.path().join("audit.log"));

        for event_type in [EventType::AddProfile, EventType::SaveConfig, EventType::ApplyRules] {
            audit
                .log(AuditEvent::new(event_type, true, serde_json::json!({}), None))
                .await
                .unwrap();
        }

        let recent = audit.read_recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].event_type, EventType::ApplyRules);
        assert_eq!(recent[1].event_type, EventType::SaveConfig);
    }

    #[tokio::test]
    async fn test_read_recent_missing_log() {
        let dir = tempfile::tempdir().unwrap();
        let audit = AuditLog::at(dir.path().join("nope.log"));
        assert!(audit.read_recent(5).await.unwrap().is_empty());
    }
}
