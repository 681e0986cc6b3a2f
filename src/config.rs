//! Configuration loader and validator for the statements site.
use chrono::{FixedOffset, Offset, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the persisted payload inside `app.data_dir`.
pub const DATA_FILE_NAME: &str = "statements.json";

/// Environment variables consulted, in order, for the Notion token.
const TOKEN_ENV: [&str; 2] = ["NOTION_STATEMENTS_API_KEY", "NOTION_API_KEY"];
/// Environment variables consulted, in order, for the statements database id.
const DATABASE_ENV: [&str; 2] = ["NOTION_STATEMENTS_DATABASE_ID", "NOTION_DATABASE_ID"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub site: Site,
    pub notion: Notion,
}

/// Local directories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    pub output_dir: String,
}

/// Public site settings: where the statements page lives and how it is addressed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Site {
    pub base_url: String,
    pub page: String,
    pub query_param: String,
    pub hash_prefix: String,
    /// Offset used when printing dates for readers, in minutes east of UTC.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

/// Notion API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notion {
    pub token: String,
    pub version: String,
    pub database_id: String,
}

fn default_utc_offset_minutes() -> i32 {
    9 * 60
}

impl App {
    /// `data_dir` with a leading `~/` expanded to `$HOME`.
    pub fn resolved_data_dir(&self) -> String {
        expand_home(&self.data_dir)
    }

    /// `output_dir` with a leading `~/` expanded to `$HOME`.
    pub fn resolved_output_dir(&self) -> String {
        expand_home(&self.output_dir)
    }
}

impl Site {
    /// Fixed offset for reader-facing dates. Validation guarantees it is in range.
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` and `app.output_dir`).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        for dir in [self.app.resolved_data_dir(), self.app.resolved_output_dir()] {
            if !dir.trim().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        Ok(())
    }

    /// Path of the persisted statements payload.
    pub fn data_file(&self) -> PathBuf {
        PathBuf::from(self.app.resolved_data_dir()).join(DATA_FILE_NAME)
    }

    /// Overlay secrets from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| lookup(*k))
                .find(|v| !v.trim().is_empty())
        };
        if let Some(token) = first(&TOKEN_ENV) {
            self.notion.token = token;
        }
        if let Some(id) = first(&DATABASE_ENV) {
            self.notion.database_id = id;
        }
    }
}

/// Load configuration from a YAML file, apply environment overrides, and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&content)?;
    cfg.apply_env_overrides();
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate the settings every command needs. Notion credentials are checked
/// separately by [`validate_notion`].
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.output_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.output_dir must be non-empty"));
    }

    match Url::parse(cfg.site.base_url.trim()) {
        Ok(url) if !url.cannot_be_a_base() => {}
        _ => return Err(ConfigError::Invalid("site.base_url must be an absolute URL")),
    }
    if cfg.site.page.trim().is_empty() {
        return Err(ConfigError::Invalid("site.page must be non-empty"));
    }
    if cfg.site.query_param.trim().is_empty() {
        return Err(ConfigError::Invalid("site.query_param must be non-empty"));
    }
    if !cfg.site.hash_prefix.starts_with('#') {
        return Err(ConfigError::Invalid("site.hash_prefix must start with '#'"));
    }
    if cfg.site.utc_offset_minutes.abs() >= 24 * 60 {
        return Err(ConfigError::Invalid("site.utc_offset_minutes must be within ±23:59"));
    }
    if cfg.notion.version.trim().is_empty() {
        return Err(ConfigError::Invalid("notion.version must be non-empty"));
    }

    Ok(())
}

/// Notion credentials, required only by commands that talk to the API.
pub fn validate_notion(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.notion.token.trim().is_empty() {
        return Err(ConfigError::Invalid("notion.token must be non-empty"));
    }
    if cfg.notion.database_id.trim().is_empty() {
        return Err(ConfigError::Invalid("notion.database_id must be non-empty"));
    }

    Ok(())
}

/// Returns the example YAML content shipped with the README.
pub fn example() -> &'static str {
    r##"app:
  data_dir: "./data"
  output_dir: "./site"

site:
  base_url: "https://example.org/"
  page: "./poli-statements.html"
  query_param: "statement"
  hash_prefix: "#/statement/"
  utc_offset_minutes: 540

notion:
  token: "YOUR_NOTION_INTEGRATION_TOKEN"
  version: "2022-06-28"
  database_id: "NOTION_STATEMENTS_DATABASE_ID"
"##
}

fn expand_home(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return format!("{}/{}", home.trim_end_matches('/'), rest);
        }
    }
    path.to_string()
}
