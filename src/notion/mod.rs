use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::fmt;
use tracing::{debug, warn};

use crate::notion::model::{ListPage, RetrieveDatabaseResp};

pub mod model;
pub mod transform;

pub use transform::transform_page;

const NOTION_API_BASE: &str = "https://api.notion.com/";
const PAGE_SIZE: &str = "100";

#[derive(Clone)]
pub struct NotionClient {
    http: Client,
    base_url: Url,
    token: String,
    version: String,
}

impl fmt::Debug for NotionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotionClient")
            .field("base_url", &self.base_url)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Read access to the statements database.
#[async_trait]
pub trait NotionService: Send + Sync {
    /// Every page in the database, following pagination to the end.
    async fn query_database(&self, database_id: &str) -> Result<Vec<Value>>;

    /// Top-level blocks of a page, following pagination to the end.
    async fn page_blocks(&self, page_id: &str) -> Result<Vec<Value>>;

    async fn retrieve_database(&self, database_id: &str) -> Result<RetrieveDatabaseResp>;
}

impl NotionClient {
    pub fn new(token: String, version: String) -> Result<Self> {
        let base_url = Url::parse(NOTION_API_BASE).expect("valid default Notion URL");
        Self::with_base_url(token, version, base_url)
    }

    pub fn with_base_url(token: String, version: String, base_url: Url) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("statement-press/", env!("CARGO_PKG_VERSION")))
            .no_proxy()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url,
            token,
            version,
        })
    }

    pub fn build_query_request(&self, database_id: &str, cursor: Option<&str>) -> Result<reqwest::Request> {
        let id = normalize_database_id(database_id)?;
        let endpoint = self
            .base_url
            .join(&format!("v1/databases/{}/query", id))
            .context("invalid Notion base URL")?;
        let mut body = json!({ "page_size": 100 });
        if let Some(cursor) = cursor {
            body["start_cursor"] = json!(cursor);
        }
        self.authorized(self.http.post(endpoint))
            .header("Content-Type", "application/json")
            .json(&body)
            .build()
            .context("failed to build Notion request")
    }

    pub fn build_blocks_request(&self, page_id: &str, cursor: Option<&str>) -> Result<reqwest::Request> {
        let mut endpoint = self
            .base_url
            .join(&format!("v1/blocks/{}/children", page_id.trim()))
            .context("invalid Notion base URL")?;
        {
            let mut query = endpoint.query_pairs_mut();
            query.append_pair("page_size", PAGE_SIZE);
            if let Some(cursor) = cursor {
                query.append_pair("start_cursor", cursor);
            }
        }
        self.authorized(self.http.get(endpoint))
            .build()
            .context("failed to build Notion request")
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Notion-Version", &self.version)
    }

    async fn execute<T: DeserializeOwned>(&self, request: reqwest::Request) -> Result<T> {
        debug!(method = %request.method(), url = %request.url(), "notion request");
        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach Notion")?;

        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = res.text().await.unwrap_or_default();
            warn!(%body, "rate limited by Notion");
            return Err(anyhow!("received 429 from Notion: {}", body));
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(%status, %body, "Notion API error");
            return Err(anyhow!("notion error {}: {}", status, body));
        }

        let text = res.text().await.context("failed to read Notion response")?;
        serde_json::from_str(&text).context("invalid Notion response JSON")
    }
}

#[async_trait]
impl NotionService for NotionClient {
    async fn query_database(&self, database_id: &str) -> Result<Vec<Value>> {
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let request = self.build_query_request(database_id, cursor.as_deref())?;
            let batch: ListPage = self.execute(request).await.context("database query failed")?;
            pages.extend(batch.results.iter().cloned());
            match batch.continuation() {
                Some(next) => cursor = Some(next.to_string()),
                None => break,
            }
        }
        debug!(count = pages.len(), "database query complete");
        Ok(pages)
    }

    async fn page_blocks(&self, page_id: &str) -> Result<Vec<Value>> {
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let request = self.build_blocks_request(page_id, cursor.as_deref())?;
            let batch: ListPage = self
                .execute(request)
                .await
                .with_context(|| format!("failed to list blocks of page {}", page_id))?;
            blocks.extend(batch.results.iter().cloned());
            match batch.continuation() {
                Some(next) => cursor = Some(next.to_string()),
                None => break,
            }
        }
        Ok(blocks)
    }

    async fn retrieve_database(&self, database_id: &str) -> Result<RetrieveDatabaseResp> {
        let id = normalize_database_id(database_id)?;
        let url = self.base_url.join(&format!("v1/databases/{}", id))?;
        let request = self
            .authorized(self.http.get(url))
            .build()
            .context("failed to build Notion request")?;
        self.execute(request)
            .await
            .context("failed to retrieve database schema")
    }
}

/// Database ids are 32 hex digits, with or without hyphens.
pub fn normalize_database_id(database_id: &str) -> Result<String> {
    let clean: String = database_id.trim().chars().filter(|c| *c != '-').collect();
    if clean.chars().count() != 32 {
        let preview: String = database_id.chars().take(20).collect();
        return Err(anyhow!(
            "invalid database id: expected 32 characters, got {} (value: {}...)",
            clean.chars().count(),
            preview
        ));
    }
    Ok(clean)
}

/// First eight characters of an id, for log lines.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}
