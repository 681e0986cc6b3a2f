//! Batch assembly over parsed statements: filtering, ordering, lookup.
use serde_json::Value;
use tracing::{debug, warn};

use crate::model::{Statement, SyncMetadata};
use crate::parser::{self, ParseError, ParseOutcome};

/// A record that failed validation, by its position in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub index: usize,
    pub errors: Vec<ParseError>,
}

/// Accounting for one batch parse.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Published statements in input order.
    pub statements: Vec<Statement>,
    pub rejected: Vec<Rejection>,
    pub unpublished: usize,
}

/// Payload envelope after normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedPayload {
    pub statements: Vec<Value>,
    pub metadata: Option<SyncMetadata>,
}

/// Parse every record, keeping published statements in input order.
pub fn parse_all(raws: &[Value]) -> Vec<Statement> {
    parse_batch(raws).statements
}

/// Like [`parse_all`], also reporting what was dropped and why.
pub fn parse_batch(raws: &[Value]) -> BatchReport {
    let mut report = BatchReport::default();
    for (index, raw) in raws.iter().enumerate() {
        let outcome = parser::parse(raw);
        if !outcome.warnings().is_empty() {
            debug!(index, warnings = ?outcome.warnings(), "statement parsed with warnings");
        }
        match outcome {
            ParseOutcome::Parsed { statement, .. } => {
                if statement.published() {
                    report.statements.push(statement);
                } else {
                    report.unpublished += 1;
                }
            }
            ParseOutcome::Rejected { errors, .. } => {
                warn!(index, ?errors, "skipping invalid statement record");
                report.rejected.push(Rejection { index, errors });
            }
        }
    }
    report
}

/// Newest first. The sort is stable, so equal dates keep their input order.
pub fn sort_by_date(mut statements: Vec<Statement>) -> Vec<Statement> {
    statements.sort_by(|a, b| b.date().cmp(&a.date()));
    statements
}

/// Resolve a statement from a slug taken out of a URL.
///
/// Matching is tried in passes, each returning the first hit in collection
/// order: exact slug, slug with hyphens ignored, then the external id with
/// hyphens ignored where either side may be a prefix of the other. The id
/// pass tolerates truncated identifiers and so can be ambiguous when ids
/// share a prefix.
pub fn find_by_slug<'a>(statements: &'a [Statement], slug: Option<&str>) -> Option<&'a Statement> {
    let query = slug?.trim();
    if query.is_empty() || statements.is_empty() {
        return None;
    }

    if let Some(hit) = statements.iter().find(|s| s.slug().trim() == query) {
        return Some(hit);
    }

    let compact = strip_hyphens(query);
    if compact.is_empty() {
        return None;
    }

    if let Some(hit) = statements
        .iter()
        .find(|s| strip_hyphens(s.slug().trim()) == compact)
    {
        return Some(hit);
    }

    statements.iter().find(|s| {
        let Some(id) = s.id().map(strip_hyphens).filter(|id| !id.is_empty()) else {
            return false;
        };
        id == query || id == compact || id.starts_with(&compact) || compact.starts_with(&id)
    })
}

/// Accept either a bare array of records or `{ statements, _metadata }`.
pub fn normalize_payload(payload: Value) -> NormalizedPayload {
    match payload {
        Value::Array(statements) => NormalizedPayload {
            statements,
            metadata: None,
        },
        Value::Object(mut map) => {
            let statements = match map.remove("statements") {
                Some(Value::Array(items)) => items,
                Some(Value::Null) | None => Vec::new(),
                Some(other) => {
                    warn!(kind = json_kind(&other), "payload statements is not an array");
                    Vec::new()
                }
            };
            let metadata = match map.remove("_metadata") {
                Some(Value::Null) | None => None,
                Some(raw) => match serde_json::from_value::<SyncMetadata>(raw) {
                    Ok(meta) => Some(meta),
                    Err(err) => {
                        warn!(%err, "ignoring malformed payload metadata");
                        None
                    }
                },
            };
            NormalizedPayload {
                statements,
                metadata,
            }
        }
        other => {
            warn!(kind = json_kind(&other), "unexpected payload shape");
            NormalizedPayload::default()
        }
    }
}

fn strip_hyphens(s: &str) -> String {
    s.replace('-', "")
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
