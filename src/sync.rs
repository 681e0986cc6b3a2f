//! Pull statements from Notion and persist them with sync metadata.
//!
//! A failed or empty sync never wipes out statements that were already on
//! disk: the previous snapshot is carried forward and the metadata records
//! why.
use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::collection::normalize_payload;
use crate::model::{SyncMetadata, SyncStatus};
use crate::notion::{short_id, transform_page, NotionService};

pub const NO_STATEMENTS_MESSAGE: &str = "No statements found in database";

/// What a sync run wrote and why.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub path: PathBuf,
    pub metadata: SyncMetadata,
    /// Pages that could not be turned into records.
    pub skipped_pages: usize,
    /// True when the persisted statements are the previous snapshot.
    pub used_previous: bool,
}

struct Fetched {
    records: Vec<Value>,
    skipped: usize,
}

/// Run one sync cycle against `database_id`, writing the payload to `data_path`.
///
/// Notion failures are recorded in the metadata rather than returned; only
/// failing to write the payload is an error.
pub async fn run_sync<S>(service: &S, database_id: &str, data_path: &Path) -> Result<SyncReport>
where
    S: NotionService + ?Sized,
{
    let started = Instant::now();
    info!(database = short_id(database_id), "starting Notion sync");

    let (mut statements, status, message, skipped, mut used_previous) =
        match fetch_records(service, database_id).await {
            Ok(Fetched { records, skipped }) if records.is_empty() => {
                warn!("no statements found; check the integration has access to the database");
                (records, SyncStatus::Partial, Some(NO_STATEMENTS_MESSAGE.to_string()), skipped, false)
            }
            Ok(Fetched { records, skipped }) => (records, SyncStatus::Success, None, skipped, false),
            Err(err) => {
                let reason = format!("{:#}", err);
                error!(error = %reason, "Notion sync failed");
                let cached = read_cached(data_path).await;
                if cached.is_empty() {
                    (cached, SyncStatus::Error, Some(reason), 0, false)
                } else {
                    info!(count = cached.len(), "using cached statements as fallback");
                    let message = format!("Sync failed, using cached data: {}", reason);
                    (cached, SyncStatus::Partial, Some(message), 0, true)
                }
            }
        };

    if statements.is_empty() && status != SyncStatus::Success {
        let existing = read_cached(data_path).await;
        if !existing.is_empty() {
            info!(count = existing.len(), "keeping existing statements (sync returned none)");
            statements = existing;
            used_previous = true;
        }
    }

    let mut metadata = SyncMetadata::new(status, message, statements.len());
    metadata.sync_duration_ms = Some(started.elapsed().as_millis() as u64);

    persist(data_path, &statements, &metadata).await?;

    match metadata.sync_status {
        SyncStatus::Success => info!(count = statements.len(), path = %data_path.display(), "Notion sync completed"),
        SyncStatus::Partial => warn!(
            count = statements.len(),
            error = metadata.error_message.as_deref().unwrap_or(""),
            "Notion sync completed with warnings"
        ),
        SyncStatus::Error => error!(
            error = metadata.error_message.as_deref().unwrap_or(""),
            "Notion sync failed; saved fallback payload"
        ),
    }

    Ok(SyncReport {
        path: data_path.to_path_buf(),
        metadata,
        skipped_pages: skipped,
        used_previous,
    })
}

async fn fetch_records<S>(service: &S, database_id: &str) -> Result<Fetched>
where
    S: NotionService + ?Sized,
{
    let pages = service
        .query_database(database_id)
        .await
        .context("failed to query statements database")?;
    info!(count = pages.len(), "fetched pages from database");

    if let Some(props) = pages.first().and_then(|p| p.get("properties")).and_then(Value::as_object) {
        let names: Vec<String> = props
            .iter()
            .map(|(name, p)| format!("{}:{}", name, p.get("type").and_then(Value::as_str).unwrap_or("unknown")))
            .collect();
        debug!(properties = ?names, "first page properties");
    }

    let mut records = Vec::with_capacity(pages.len());
    let mut skipped = 0;
    for page in &pages {
        let page_id = page.get("id").and_then(Value::as_str).unwrap_or("");
        let blocks = match service.page_blocks(page_id).await {
            Ok(blocks) => blocks,
            Err(err) => {
                warn!(page = short_id(page_id), error = %format!("{:#}", err), "failed to fetch page blocks; skipping");
                skipped += 1;
                continue;
            }
        };
        match transform_page(page, &blocks) {
            Some(record) => {
                debug!(page = short_id(page_id), blocks = blocks.len(), "transformed page");
                records.push(record);
            }
            None => {
                let fields: Vec<&str> = page
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|p| p.keys().map(String::as_str).collect())
                    .unwrap_or_default();
                warn!(page = short_id(page_id), ?fields, "page has no title; skipping");
                skipped += 1;
            }
        }
    }
    Ok(Fetched { records, skipped })
}

/// Statements from an existing payload file; empty when absent or unreadable.
pub async fn read_cached(path: &Path) -> Vec<Value> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            warn!(path = %path.display(), %err, "failed to read cached payload");
            return Vec::new();
        }
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(payload) => normalize_payload(payload).statements,
        Err(err) => {
            warn!(path = %path.display(), %err, "cached payload is not valid JSON");
            Vec::new()
        }
    }
}

async fn persist(path: &Path, statements: &[Value], metadata: &SyncMetadata) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let payload = json!({ "_metadata": metadata, "statements": statements });
    let text = serde_json::to_string_pretty(&payload).context("failed to serialize payload")?;
    tokio::fs::write(path, text)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}
