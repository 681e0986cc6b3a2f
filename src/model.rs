use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Current layout version of the persisted payload.
pub const PAYLOAD_VERSION: &str = "1.0";

/// Canonical published document.
///
/// Only the parser constructs a `Statement`, so `title`, `slug` and `body`
/// are always non-blank and `date` is always a valid instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    title: String,
    date: DateTime<Utc>,
    summary: String,
    body: String,
    slug: String,
    published: bool,
    id: Option<String>,
    image: Option<String>,
    attachments: Vec<String>,
    category: Option<String>,
    metadata: Map<String, Value>,
}

/// Validated field values handed from the parser to [`Statement::new`].
#[derive(Debug)]
pub(crate) struct StatementParts {
    pub title: String,
    pub date: DateTime<Utc>,
    pub summary: String,
    pub body: String,
    pub slug: String,
    pub published: bool,
    pub id: Option<String>,
    pub image: Option<String>,
    pub attachments: Vec<String>,
    pub category: Option<String>,
    pub metadata: Map<String, Value>,
}

impl Statement {
    pub(crate) fn new(parts: StatementParts) -> Self {
        let StatementParts {
            title,
            date,
            summary,
            body,
            slug,
            published,
            id,
            image,
            attachments,
            category,
            metadata,
        } = parts;
        Self {
            title,
            date,
            summary,
            body,
            slug,
            published,
            id,
            image,
            attachments,
            category,
            metadata,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn published(&self) -> bool {
        self.published
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn attachments(&self) -> &[String] {
        &self.attachments
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }
}

/// Outcome of one full sync cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Partial,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Success => "success",
            SyncStatus::Partial => "partial",
            SyncStatus::Error => "error",
        }
    }
}

/// Batch-level status persisted next to the statements as `_metadata`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    /// When data was last known good. Older or hand-written payloads may omit it.
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    pub sync_status: SyncStatus,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default, alias = "count")]
    pub statements_count: usize,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_duration_ms: Option<u64>,
}

fn default_version() -> String {
    PAYLOAD_VERSION.to_string()
}

impl SyncMetadata {
    pub fn new(sync_status: SyncStatus, error_message: Option<String>, count: usize) -> Self {
        Self {
            last_updated: Some(Utc::now()),
            sync_status,
            error_message,
            statements_count: count,
            version: default_version(),
            sync_duration_ms: None,
        }
    }

    /// True when the last sync failed outright, or fell back and said why.
    pub fn is_degraded(&self) -> bool {
        match self.sync_status {
            SyncStatus::Success => false,
            SyncStatus::Error => true,
            SyncStatus::Partial => self
                .error_message
                .as_deref()
                .map(|m| !m.trim().is_empty())
                .unwrap_or(false),
        }
    }
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
pub fn iso_timestamp(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn sync_metadata_reads_persisted_shape() {
        let meta: SyncMetadata = serde_json::from_value(json!({
            "lastUpdated": "2026-01-15T03:00:00.000Z",
            "syncStatus": "partial",
            "errorMessage": "No statements found in database",
            "statementsCount": 0,
            "version": "1.0"
        }))
        .unwrap();
        assert_eq!(meta.sync_status, SyncStatus::Partial);
        assert_eq!(
            meta.last_updated,
            Some(Utc.with_ymd_and_hms(2026, 1, 15, 3, 0, 0).unwrap())
        );
        assert!(meta.is_degraded());
    }

    #[test]
    fn sync_metadata_accepts_count_alias_and_default_version() {
        let meta: SyncMetadata = serde_json::from_value(json!({
            "lastUpdated": "2026-01-15T03:00:00Z",
            "syncStatus": "success",
            "count": 4
        }))
        .unwrap();
        assert_eq!(meta.statements_count, 4);
        assert_eq!(meta.version, PAYLOAD_VERSION);
        assert_eq!(meta.error_message, None);
        assert!(!meta.is_degraded());
    }

    #[test]
    fn sync_metadata_without_timestamp_keeps_status() {
        let meta: SyncMetadata = serde_json::from_value(json!({
            "syncStatus": "error",
            "errorMessage": "Notion API down"
        }))
        .unwrap();
        assert_eq!(meta.last_updated, None);
        assert_eq!(meta.sync_status, SyncStatus::Error);
        assert_eq!(meta.error_message.as_deref(), Some("Notion API down"));
    }

    #[test]
    fn error_status_is_degraded_without_a_message() {
        let meta: SyncMetadata = serde_json::from_value(json!({
            "lastUpdated": "2026-01-15T03:00:00.000Z",
            "syncStatus": "error",
            "errorMessage": null
        }))
        .unwrap();
        assert!(meta.is_degraded());

        let quiet_partial = SyncMetadata::new(SyncStatus::Partial, None, 0);
        assert!(!quiet_partial.is_degraded());
        let explained_partial = SyncMetadata::new(SyncStatus::Partial, Some("cached".into()), 2);
        assert!(explained_partial.is_degraded());
    }

    #[test]
    fn sync_metadata_serializes_camel_case() {
        let mut meta = SyncMetadata::new(SyncStatus::Error, Some("boom".into()), 0);
        meta.sync_duration_ms = Some(12);
        let v = serde_json::to_value(&meta).unwrap();
        assert_eq!(v["syncStatus"], "error");
        assert_eq!(v["errorMessage"], "boom");
        assert_eq!(v["statementsCount"], 0);
        assert_eq!(v["syncDurationMs"], 12);
    }

    #[test]
    fn iso_timestamp_uses_millis() {
        let d = Utc.with_ymd_and_hms(2026, 1, 12, 0, 0, 0).unwrap();
        assert_eq!(iso_timestamp(d), "2026-01-12T00:00:00.000Z");
    }
}
