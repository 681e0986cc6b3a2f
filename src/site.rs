//! Assemble the persisted payload into the HTML the static site serves.
use anyhow::{Context, Result};
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::collection::{find_by_slug, normalize_payload, parse_batch, sort_by_date};
use crate::config::Config;
use crate::escape::escape_html;
use crate::links::enhance_external_links;
use crate::model::{Statement, SyncMetadata};
use crate::present::{Presenter, Rendered};
use crate::route::RouteState;

pub const FRAGMENTS_FILE: &str = "statements.fragments.json";
pub const INDEX_FILE: &str = "index.html";
pub const STYLE_FILE: &str = "static/style.css";

/// Published statements, newest first, plus what the last sync said.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub statements: Vec<Statement>,
    pub metadata: Option<SyncMetadata>,
    pub rejected: usize,
    pub unpublished: usize,
}

impl Catalog {
    pub fn from_payload(payload: Value) -> Self {
        let normalized = normalize_payload(payload);
        let report = parse_batch(&normalized.statements);
        if !report.rejected.is_empty() {
            warn!(count = report.rejected.len(), "some records failed validation");
        }
        Self {
            statements: sort_by_date(report.statements),
            metadata: normalized.metadata,
            rejected: report.rejected.len(),
            unpublished: report.unpublished,
        }
    }

    /// The view `url` addresses: the list, or one statement's detail.
    pub fn render(&self, presenter: &Presenter, url: &str) -> Rendered {
        match presenter.routes().decode(url) {
            None => presenter.render_collection(&self.statements, self.metadata.as_ref()),
            Some(slug) => presenter.render_detail(find_by_slug(&self.statements, Some(&slug))),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DetailFragment {
    pub html: String,
    pub ok: bool,
    pub url: String,
    pub title: String,
    pub state: RouteState,
}

/// Fragments keyed by intent, as consumed by the page script.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragments {
    pub list: String,
    pub list_ok: bool,
    pub empty: String,
    pub loading: String,
    pub error: String,
    pub not_found: String,
    pub details: BTreeMap<String, DetailFragment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SyncMetadata>,
}

#[derive(Debug, Clone)]
pub struct SiteBundle {
    pub fragments: Fragments,
    pub index_html: String,
}

/// Run the whole pipeline over a payload.
pub fn build_site(payload: Value, config: &Config) -> Result<SiteBundle> {
    let site_base = Url::parse(&config.site.base_url)
        .with_context(|| format!("invalid site base_url {}", config.site.base_url))?;
    let presenter = Presenter::from_config(&config.site);
    let routes = presenter.routes();
    let catalog = Catalog::from_payload(payload);

    let list = catalog.render(&presenter, routes.list_url());
    let list_html = enhance_external_links(&list.html, &site_base);

    let mut details = BTreeMap::new();
    for statement in &catalog.statements {
        if details.contains_key(statement.slug()) {
            warn!(slug = statement.slug(), "duplicate slug; keeping the newest statement");
            continue;
        }
        let url = routes.encode(Some(statement.slug()));
        let rendered = catalog.render(&presenter, &url);
        details.insert(
            statement.slug().to_string(),
            DetailFragment {
                html: enhance_external_links(&rendered.html, &site_base),
                ok: rendered.ok,
                url,
                title: routes.title(Some(statement.slug())),
                state: routes.state(Some(statement.slug())),
            },
        );
    }

    let error = match catalog.metadata.as_ref() {
        Some(meta) => presenter.error_notice(meta.error_message.as_deref(), meta.last_updated),
        None => presenter.error_notice(None, None),
    };

    info!(
        published = catalog.statements.len(),
        rejected = catalog.rejected,
        unpublished = catalog.unpublished,
        "assembled statements"
    );

    let index_html = render_index(&routes.title(None), &list_html);
    Ok(SiteBundle {
        fragments: Fragments {
            list: list_html,
            list_ok: list.ok,
            empty: presenter.empty_notice(),
            loading: presenter.loading_notice(),
            error,
            not_found: presenter.render_detail(None).html,
            details,
            metadata: catalog.metadata,
        },
        index_html,
    })
}

/// Read a persisted payload. A missing file is an empty collection.
pub async fn load_payload(path: &Path) -> Result<Value> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "payload not found; exporting an empty collection");
            Ok(Value::Array(Vec::new()))
        }
        Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
    }
}

/// Write the bundle under `out_dir`, returning the files written.
pub async fn write_site(bundle: &SiteBundle, out_dir: &Path) -> Result<Vec<PathBuf>> {
    let static_dir = out_dir.join("static");
    tokio::fs::create_dir_all(&static_dir)
        .await
        .with_context(|| format!("failed to create {}", static_dir.display()))?;

    let fragments_path = out_dir.join(FRAGMENTS_FILE);
    let fragments = serde_json::to_string_pretty(&bundle.fragments).context("failed to serialize fragments")?;
    tokio::fs::write(&fragments_path, fragments)
        .await
        .with_context(|| format!("failed to write {}", fragments_path.display()))?;

    let index_path = out_dir.join(INDEX_FILE);
    tokio::fs::write(&index_path, &bundle.index_html)
        .await
        .with_context(|| format!("failed to write {}", index_path.display()))?;

    let css_path = out_dir.join(STYLE_FILE);
    tokio::fs::write(&css_path, DEFAULT_STYLE)
        .await
        .with_context(|| format!("failed to write {}", css_path.display()))?;

    Ok(vec![fragments_path, index_path, css_path])
}

fn render_index(title: &str, list_html: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="ko">
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <link rel="stylesheet" href="static/style.css">
  </head>
  <body>
    <header>
      <h1>{title}</h1>
    </header>
    <main>
      <section class="statements-list" aria-label="성명 목록">
      {list}
      </section>
    </main>
  </body>
</html>"#,
        title = escape_html(title),
        list = list_html
    )
}

const DEFAULT_STYLE: &str = r#"
:root {
  color-scheme: light dark;
  --fg: #222;
  --bg: #fff;
  --muted: #666;
  --card: #f7f7f8;
  --accent: #0b7285;
}

@media (prefers-color-scheme: dark) {
  :root {
    --fg: #eee;
    --bg: #121212;
    --muted: #aaa;
    --card: #1c1c1f;
  }
}

html,
body {
  margin: 0;
  padding: 0;
  background: var(--bg);
  color: var(--fg);
  font: 15px/1.7 -apple-system, BlinkMacSystemFont, 'Apple SD Gothic Neo',
        'Noto Sans KR', 'Malgun Gothic', 'Segoe UI', Roboto, sans-serif;
}

header {
  padding: 16px;
  border-bottom: 1px solid #ddd4;
}

main {
  padding: 16px;
  max-width: 820px;
  margin: 0 auto;
}

.card {
  background: var(--card);
  border-radius: 8px;
  padding: 16px 20px;
  margin: 0 0 16px;
}

.statement-title {
  margin: 0 0 4px;
  font-size: 1.1rem;
}

.statement-link,
.statement-detail-body a {
  color: var(--accent);
  text-decoration: none;
}

.statement-date,
.statement-detail-date,
.small {
  color: var(--muted);
  font-size: 0.875rem;
}

.statement-category {
  display: inline-block;
  margin-right: 8px;
  padding: 0 8px;
  border-radius: 999px;
  border: 1px solid var(--muted);
  font-size: 0.8rem;
}

.statement-detail-title {
  margin: 8px 0;
}

.statement-detail-summary {
  color: var(--muted);
}

.statement-detail-body pre {
  overflow-x: auto;
  padding: 12px;
  border-radius: 6px;
  background: #0001;
}

img {
  max-width: 100%;
  display: block;
  margin: 8px 0;
}

.btn {
  display: inline-block;
  margin-top: 12px;
  padding: 6px 14px;
  border-radius: 6px;
  border: 1px solid var(--accent);
  color: var(--accent);
  text-decoration: none;
}
"#;
