//! Raw record → [`Statement`] conversion and validation.
//!
//! Records come from an external content source whose field names drift, so
//! every logical field is resolved through a small table of `(name, extractor)`
//! candidates, first match wins. A value of the wrong JSON type is treated as
//! absent rather than as an error.
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use tracing::error;

use crate::model::{iso_timestamp, Statement, StatementParts};

/// Largest magnitude accepted for epoch-millisecond dates (±100,000,000 days).
const MAX_EPOCH_MILLIS: f64 = 8.64e15;

type Extractor<T> = fn(&Value) -> Option<T>;
type Candidate<T> = (&'static str, Extractor<T>);

const TITLE_FIELDS: &[Candidate<String>] = &[("title", text), ("name", text)];
const SUMMARY_FIELDS: &[Candidate<String>] = &[("summary", text), ("description", text)];
const BODY_FIELDS: &[Candidate<String>] = &[("body", text), ("content", text)];
const SLUG_FIELDS: &[Candidate<String>] = &[("slug", text), ("id", text)];
const ID_FIELDS: &[Candidate<String>] = &[("id", text)];
const IMAGE_FIELDS: &[Candidate<String>] = &[("image", text), ("cover", text)];
const CATEGORY_FIELDS: &[Candidate<String>] = &[("category", text), ("type", text)];
const PUBLISHED_FIELDS: &[Candidate<bool>] = &[("published", flag), ("public", flag)];
const DATE_FIELDS: &[Candidate<Value>] = &[
    ("date", date_input),
    ("created_time", date_input),
    ("last_edited_time", date_input),
];

static NON_SLUG_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").expect("valid regex"));
static SLUG_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_-]+").expect("valid regex"));

/// Fields a record cannot do without.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    Title,
    Date,
    Slug,
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RequiredField::Title => "title",
            RequiredField::Date => "date",
            RequiredField::Slug => "slug or id",
        })
    }
}

/// Reasons a record is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("record is not a JSON object")]
    MalformedInput,
    /// An invalid or unparseable date is reported as a missing `Date`.
    #[error("required field missing or invalid: {0}")]
    RequiredFieldMissing(RequiredField),
    #[error("failed to parse record: {0}")]
    InternalParseFailure(String),
}

/// Non-fatal findings; the statement is still produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseWarning {
    #[error("summary is empty; the title is used instead")]
    MissingSummary,
    #[error("body is empty; the summary or title is used instead")]
    MissingBody,
}

/// Per-record result.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed {
        statement: Statement,
        warnings: Vec<ParseWarning>,
    },
    Rejected {
        errors: Vec<ParseError>,
        warnings: Vec<ParseWarning>,
    },
}

impl ParseOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ParseOutcome::Parsed { .. })
    }

    pub fn statement(&self) -> Option<&Statement> {
        match self {
            ParseOutcome::Parsed { statement, .. } => Some(statement),
            ParseOutcome::Rejected { .. } => None,
        }
    }

    pub fn into_statement(self) -> Option<Statement> {
        match self {
            ParseOutcome::Parsed { statement, .. } => Some(statement),
            ParseOutcome::Rejected { .. } => None,
        }
    }

    pub fn errors(&self) -> &[ParseError] {
        match self {
            ParseOutcome::Parsed { .. } => &[],
            ParseOutcome::Rejected { errors, .. } => errors,
        }
    }

    pub fn warnings(&self) -> &[ParseWarning] {
        match self {
            ParseOutcome::Parsed { warnings, .. } | ParseOutcome::Rejected { warnings, .. } => {
                warnings
            }
        }
    }
}

/// Parse and validate one raw record.
///
/// Never panics: a failure while extracting fields is converted into
/// [`ParseError::InternalParseFailure`] so one record cannot abort a batch.
pub fn parse(raw: &Value) -> ParseOutcome {
    let Some(record) = raw.as_object() else {
        return ParseOutcome::Rejected {
            errors: vec![ParseError::MalformedInput],
            warnings: Vec::new(),
        };
    };

    match panic::catch_unwind(AssertUnwindSafe(|| extract(record))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(%message, "statement record extraction failed");
            ParseOutcome::Rejected {
                errors: vec![ParseError::InternalParseFailure(message)],
                warnings: Vec::new(),
            }
        }
    }
}

fn extract(record: &Map<String, Value>) -> ParseOutcome {
    let title = resolve(record, TITLE_FIELDS).unwrap_or_default();
    let date_input = resolve(record, DATE_FIELDS);
    let summary = resolve(record, SUMMARY_FIELDS).unwrap_or_default();
    let body = resolve(record, BODY_FIELDS).unwrap_or_default();
    let slug = resolve(record, SLUG_FIELDS).unwrap_or_else(|| slugify(&title));
    let published = resolve(record, PUBLISHED_FIELDS).unwrap_or(true);

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let title = title.trim();
    if title.is_empty() {
        errors.push(ParseError::RequiredFieldMissing(RequiredField::Title));
    }

    let date = date_input.as_ref().and_then(parse_date);
    if date.is_none() {
        errors.push(ParseError::RequiredFieldMissing(RequiredField::Date));
    }

    let summary = summary.trim();
    if summary.is_empty() {
        warnings.push(ParseWarning::MissingSummary);
    }
    let body = body.trim();
    if body.is_empty() {
        warnings.push(ParseWarning::MissingBody);
    }

    let slug = slug.trim();
    if slug.is_empty() {
        errors.push(ParseError::RequiredFieldMissing(RequiredField::Slug));
    }

    let date = match date {
        Some(date) if errors.is_empty() => date,
        _ => return ParseOutcome::Rejected { errors, warnings },
    };

    let mut metadata = match record.get("metadata") {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    metadata.insert("createdAt".into(), timestamp_or(record.get("created_time"), date));
    metadata.insert("updatedAt".into(), timestamp_or(record.get("last_edited_time"), date));

    let summary = if summary.is_empty() { title } else { summary };
    let body = if body.is_empty() { summary } else { body };

    let statement = Statement::new(StatementParts {
        title: title.to_string(),
        date,
        summary: summary.to_string(),
        body: body.to_string(),
        slug: slug.to_string(),
        published,
        id: resolve(record, ID_FIELDS),
        image: resolve(record, IMAGE_FIELDS),
        attachments: attachments(record.get("attachments")),
        category: resolve(record, CATEGORY_FIELDS),
        metadata,
    });

    ParseOutcome::Parsed {
        statement,
        warnings,
    }
}

fn resolve<T>(record: &Map<String, Value>, candidates: &[Candidate<T>]) -> Option<T> {
    candidates
        .iter()
        .find_map(|(name, extract)| record.get(*name).and_then(*extract))
}

/// Non-empty string.
fn text(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Boolean, or a string meaning true when it is `"true"` (any case) or `"1"`.
fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => Some(s.eq_ignore_ascii_case("true") || s == "1"),
        _ => None,
    }
}

/// Candidate date value: a non-empty string or a non-zero number.
fn date_input(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) if !s.is_empty() => Some(value.clone()),
        Value::Number(n) if n.as_f64().map(|f| f != 0.0).unwrap_or(false) => Some(value.clone()),
        _ => None,
    }
}

fn attachments(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// The source timestamp when one is present, else the statement date.
fn timestamp_or(source: Option<&Value>, date: DateTime<Utc>) -> Value {
    match source {
        Some(v) if is_truthy(v) => v.clone(),
        _ => Value::String(iso_timestamp(date)),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Resolve a date value to an instant, or `None` when it is not a valid date.
///
/// Numbers are epoch milliseconds. Strings may be RFC 3339, RFC 2822, or one of
/// a few zone-less forms which are read as UTC.
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let millis = n.as_f64()?;
            if !millis.is_finite() || millis.abs() > MAX_EPOCH_MILLIS {
                return None;
            }
            DateTime::from_timestamp_millis(millis.trunc() as i64)
        }
        Value::String(s) => parse_date_str(s),
        _ => None,
    }
}

fn parse_date_str(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc));
    }
    if let Ok(d) = DateTime::parse_from_rfc2822(s) {
        return Some(d.with_timezone(&Utc));
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"] {
        if let Ok(day) = NaiveDate::parse_from_str(s, fmt) {
            return day
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive));
        }
    }
    None
}

/// URL-safe slug derived from a title.
///
/// Lowercases, drops everything but word characters, whitespace and hyphens,
/// and collapses separator runs into one hyphen. Word characters are
/// Unicode-aware, so Hangul survives.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let kept = NON_SLUG_CHARS.replace_all(lowered.trim(), "");
    let joined = SLUG_SEPARATORS.replace_all(&kept, "-");
    joined.trim_matches('-').to_string()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown failure".to_string()
    }
}
