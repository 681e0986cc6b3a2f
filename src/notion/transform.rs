//! Turns a Notion page and its blocks into a raw statement record.
use serde_json::{json, Map, Value};
use tracing::debug;

const TITLE_NAMES: &[&str] = &["제목", "title", "name"];
const DATE_NAMES: &[&str] = &["날짜", "date"];
const SUMMARY_NAMES: &[&str] = &["요약", "summary", "description"];
const SLUG_NAMES: &[&str] = &["슬러그", "slug"];
const PUBLISHED_NAMES: &[&str] = &["공개", "published", "public"];
const CATEGORY_NAMES: &[&str] = &["카테고리", "category", "type"];
const IMAGE_NAMES: &[&str] = &["이미지", "image", "cover"];
const ATTACHMENT_NAMES: &[&str] = &["첨부", "attachments", "files"];

/// Select or status names that mean "published".
const PUBLISHED_WORDS: &[&str] = &["공개", "published", "public", "true", "yes", "1"];

/// Build a raw record from a database page. Pages without a title yield `None`.
pub fn transform_page(page: &Value, blocks: &[Value]) -> Option<Value> {
    let props = page.get("properties").and_then(Value::as_object);
    let empty = Map::new();
    let props = props.unwrap_or(&empty);

    let title = find_property(props, TITLE_NAMES)
        .or_else(|| props.values().find(|p| prop_type(p) == Some("title")))
        .and_then(property_text)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())?;

    let mut record = Map::new();
    record.insert("title".into(), json!(title));
    for key in ["id", "created_time", "last_edited_time"] {
        if let Some(v) = page.get(key).filter(|v| !v.is_null()) {
            record.insert(key.into(), v.clone());
        }
    }

    if let Some(date) = find_property(props, DATE_NAMES).and_then(property_text) {
        record.insert("date".into(), json!(date));
    }
    if let Some(summary) = find_property(props, SUMMARY_NAMES).and_then(property_text) {
        record.insert("summary".into(), json!(summary));
    }
    if let Some(slug) = find_property(props, SLUG_NAMES).and_then(property_text) {
        record.insert("slug".into(), json!(slug));
    }
    if let Some(published) = find_property(props, PUBLISHED_NAMES).and_then(property_flag) {
        record.insert("published".into(), json!(published));
    }
    if let Some(category) = find_property(props, CATEGORY_NAMES).and_then(property_text) {
        record.insert("category".into(), json!(category));
    }

    let image = find_property(props, IMAGE_NAMES)
        .and_then(|p| property_urls(p).into_iter().next())
        .or_else(|| page.get("cover").and_then(file_url));
    if let Some(image) = image {
        record.insert("image".into(), json!(image));
    }

    let attachments = find_property(props, ATTACHMENT_NAMES)
        .map(property_urls)
        .unwrap_or_default();
    if !attachments.is_empty() {
        record.insert("attachments".into(), json!(attachments));
    }

    let body = blocks_to_markdown(blocks);
    if !body.is_empty() {
        record.insert("body".into(), json!(body));
    }

    if let Some(url) = page.get("url").and_then(Value::as_str) {
        record.insert("metadata".into(), json!({ "notionUrl": url }));
    }

    Some(Value::Object(record))
}

/// Property names compare without case or whitespace.
fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn find_property<'a>(props: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|wanted| {
        let wanted = normalize_name(wanted);
        props
            .iter()
            .find(|(name, _)| normalize_name(name) == wanted)
            .map(|(_, v)| v)
    })
}

fn prop_type(prop: &Value) -> Option<&str> {
    prop.get("type").and_then(Value::as_str)
}

fn plain_text(rich: &Value) -> String {
    rich.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|t| t.get("plain_text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default()
}

/// Text content of a property, whatever its type. Empty values are `None`.
fn property_text(prop: &Value) -> Option<String> {
    let typ = prop_type(prop)?;
    let inner = prop.get(typ)?;
    let text = match typ {
        "title" | "rich_text" => plain_text(inner),
        "date" => inner.get("start").and_then(Value::as_str)?.to_string(),
        "select" | "status" => inner.get("name").and_then(Value::as_str)?.to_string(),
        "multi_select" => inner
            .as_array()?
            .iter()
            .filter_map(|o| o.get("name").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(", "),
        "url" | "email" | "phone_number" => inner.as_str()?.to_string(),
        "number" => inner.as_f64().map(|n| n.to_string())?,
        "checkbox" => inner.as_bool()?.to_string(),
        "formula" => match inner.get("type").and_then(Value::as_str)? {
            "string" => inner.get("string").and_then(Value::as_str)?.to_string(),
            "number" => inner.get("number").and_then(Value::as_f64)?.to_string(),
            "boolean" => inner.get("boolean").and_then(Value::as_bool)?.to_string(),
            "date" => inner
                .get("date")
                .and_then(|d| d.get("start"))
                .and_then(Value::as_str)?
                .to_string(),
            _ => return None,
        },
        _ => return None,
    };
    Some(text).filter(|t| !t.trim().is_empty())
}

fn property_flag(prop: &Value) -> Option<bool> {
    match prop_type(prop)? {
        "checkbox" => prop.get("checkbox").and_then(Value::as_bool),
        _ => {
            let text = property_text(prop)?;
            let text = text.trim();
            Some(PUBLISHED_WORDS.iter().any(|w| text.eq_ignore_ascii_case(w)))
        }
    }
}

fn file_url(file: &Value) -> Option<String> {
    let typ = file.get("type").and_then(Value::as_str)?;
    file.get(typ)
        .and_then(|f| f.get("url"))
        .and_then(Value::as_str)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
}

fn property_urls(prop: &Value) -> Vec<String> {
    match prop_type(prop) {
        Some("files") => prop
            .get("files")
            .and_then(Value::as_array)
            .map(|files| files.iter().filter_map(file_url).collect())
            .unwrap_or_default(),
        Some("url") => property_text(prop).into_iter().collect(),
        _ => Vec::new(),
    }
}

/// Rich text with annotations as markdown.
fn rich_text_markdown(rich: &Value) -> String {
    let Some(items) = rich.as_array() else {
        return String::new();
    };
    let mut out = String::new();
    for item in items {
        let text = item.get("plain_text").and_then(Value::as_str).unwrap_or("");
        if text.trim().is_empty() {
            out.push_str(text);
            continue;
        }
        let flag = |name: &str| {
            item.get("annotations")
                .and_then(|a| a.get(name))
                .and_then(Value::as_bool)
                .unwrap_or(false)
        };
        let mut piece = text.to_string();
        if flag("code") {
            piece = format!("`{}`", piece);
        }
        if flag("bold") {
            piece = format!("**{}**", piece);
        } else if flag("italic") {
            piece = format!("*{}*", piece);
        }
        if let Some(url) = item.get("href").and_then(Value::as_str).filter(|u| !u.is_empty()) {
            piece = format!("[{}]({})", piece, url);
        }
        out.push_str(&piece);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chunk {
    Block,
    Bullet,
    Numbered,
}

/// Page blocks as markdown in the renderer's dialect.
pub fn blocks_to_markdown(blocks: &[Value]) -> String {
    let mut chunks: Vec<(Chunk, String)> = Vec::new();
    let mut number = 0usize;

    for block in blocks {
        let Some(typ) = block.get("type").and_then(Value::as_str) else {
            continue;
        };
        let content = block.get(typ);
        let rich = || {
            content
                .and_then(|c| c.get("rich_text"))
                .map(rich_text_markdown)
                .unwrap_or_default()
        };

        if typ != "numbered_list_item" {
            number = 0;
        }

        let chunk = match typ {
            "paragraph" | "quote" | "callout" => (Chunk::Block, rich()),
            "heading_1" => (Chunk::Block, prefixed("# ", rich())),
            "heading_2" => (Chunk::Block, prefixed("## ", rich())),
            "heading_3" => (Chunk::Block, prefixed("### ", rich())),
            "bulleted_list_item" | "to_do" => (Chunk::Bullet, prefixed("- ", rich())),
            "numbered_list_item" => {
                number += 1;
                (Chunk::Numbered, prefixed(&format!("{}. ", number), rich()))
            }
            "code" => {
                let code = content.and_then(|c| c.get("rich_text")).map(plain_text).unwrap_or_default();
                (Chunk::Block, format!("```\n{}\n```", code))
            }
            "divider" => continue,
            other => {
                debug!(block_type = other, "skipping unsupported block");
                continue;
            }
        };
        if !chunk.1.trim().is_empty() {
            chunks.push(chunk);
        }
    }

    let mut out = String::new();
    let mut previous: Option<Chunk> = None;
    for (kind, text) in chunks {
        if let Some(prev) = previous {
            let same_list = prev == kind && kind != Chunk::Block;
            out.push_str(if same_list { "\n" } else { "\n\n" });
        }
        out.push_str(&text);
        previous = Some(kind);
    }
    out
}

fn prefixed(prefix: &str, text: String) -> String {
    if text.trim().is_empty() {
        String::new()
    } else {
        format!("{}{}", prefix, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rich(text: &str) -> Value {
        json!([{ "plain_text": text, "annotations": {}, "href": null }])
    }

    fn block(typ: &str, text: &str) -> Value {
        let mut b = json!({ "type": typ });
        b[typ] = json!({ "rich_text": rich(text) });
        b
    }

    fn page() -> Value {
        json!({
            "id": "2f1a9c3e-0000-4000-8000-1234567890ab",
            "created_time": "2026-01-10T01:00:00.000Z",
            "last_edited_time": "2026-01-11T02:00:00.000Z",
            "url": "https://www.notion.so/2f1a9c3e",
            "cover": null,
            "properties": {
                " 제 목 ": { "type": "title", "title": rich("노동 성명") },
                "Date": { "type": "date", "date": { "start": "2026-01-12" } },
                "요약": { "type": "rich_text", "rich_text": rich("요약문") },
                "SLUG": { "type": "rich_text", "rich_text": rich("labor-statement") },
                "공개": { "type": "checkbox", "checkbox": true },
                "Type": { "type": "select", "select": { "name": "논평" } },
                "Files": { "type": "files", "files": [
                    { "name": "a.pdf", "type": "file", "file": { "url": "https://s3/a.pdf" } },
                    { "name": "b", "type": "external", "external": { "url": "https://x/b.pdf" } }
                ] }
            }
        })
    }

    #[test]
    fn maps_properties_ignoring_case_and_spaces() {
        let record = transform_page(&page(), &[block("paragraph", "본문")]).unwrap();
        assert_eq!(record["title"], "노동 성명");
        assert_eq!(record["date"], "2026-01-12");
        assert_eq!(record["summary"], "요약문");
        assert_eq!(record["slug"], "labor-statement");
        assert_eq!(record["published"], true);
        assert_eq!(record["category"], "논평");
        assert_eq!(record["attachments"], json!(["https://s3/a.pdf", "https://x/b.pdf"]));
        assert_eq!(record["body"], "본문");
        assert_eq!(record["id"], "2f1a9c3e-0000-4000-8000-1234567890ab");
        assert_eq!(record["created_time"], "2026-01-10T01:00:00.000Z");
        assert_eq!(record["metadata"]["notionUrl"], "https://www.notion.so/2f1a9c3e");
        assert!(record.get("image").is_none());
    }

    #[test]
    fn transformed_page_parses_into_a_statement() {
        let record = transform_page(&page(), &[]).unwrap();
        let statement = crate::parser::parse(&record).into_statement().unwrap();
        assert_eq!(statement.slug(), "labor-statement");
        assert_eq!(statement.body(), "요약문");
        assert_eq!(statement.attachments().len(), 2);
    }

    #[test]
    fn pages_without_title_are_skipped() {
        let mut p = page();
        p["properties"][" 제 목 "]["title"] = json!([]);
        assert!(transform_page(&p, &[]).is_none());
        assert!(transform_page(&json!({ "id": "x" }), &[]).is_none());
    }

    #[test]
    fn title_falls_back_to_any_title_property() {
        let p = json!({
            "id": "x",
            "properties": { "Headline": { "type": "title", "title": rich("헤드라인") } }
        });
        assert_eq!(transform_page(&p, &[]).unwrap()["title"], "헤드라인");
    }

    #[test]
    fn status_and_cover_fallbacks() {
        let p = json!({
            "id": "x",
            "cover": { "type": "external", "external": { "url": "https://img/c.png" } },
            "properties": {
                "Name": { "type": "title", "title": rich("T") },
                "Public": { "type": "status", "status": { "name": "Published" } }
            }
        });
        let record = transform_page(&p, &[]).unwrap();
        assert_eq!(record["published"], true);
        assert_eq!(record["image"], "https://img/c.png");

        let draft = json!({
            "id": "y",
            "properties": {
                "Name": { "type": "title", "title": rich("T") },
                "published": { "type": "select", "select": { "name": "초안" } }
            }
        });
        assert_eq!(transform_page(&draft, &[]).unwrap()["published"], false);
    }

    #[test]
    fn blocks_become_markdown() {
        let blocks = vec![
            block("heading_1", "제목"),
            block("paragraph", "첫 문단"),
            block("bulleted_list_item", "하나"),
            block("bulleted_list_item", "둘"),
            block("numbered_list_item", "첫째"),
            block("numbered_list_item", "둘째"),
            json!({ "type": "divider", "divider": {} }),
            json!({ "type": "code", "code": { "rich_text": rich("let x = 1;"), "language": "rust" } }),
            block("paragraph", ""),
            json!({ "type": "image", "image": {} }),
            block("quote", "인용"),
        ];
        assert_eq!(
            blocks_to_markdown(&blocks),
            "# 제목\n\n첫 문단\n\n- 하나\n- 둘\n\n1. 첫째\n2. 둘째\n\n```\nlet x = 1;\n```\n\n인용"
        );
    }

    #[test]
    fn annotations_map_to_inline_markdown() {
        let rich = json!([
            { "plain_text": "굵게", "annotations": { "bold": true } },
            { "plain_text": " ", "annotations": { "bold": true } },
            { "plain_text": "기울임", "annotations": { "italic": true } },
            { "plain_text": " and ", "annotations": {} },
            { "plain_text": "code", "annotations": { "code": true } },
            { "plain_text": " ", "annotations": {} },
            { "plain_text": "link", "annotations": {}, "href": "https://example.org" }
        ]);
        assert_eq!(
            rich_text_markdown(&rich),
            "**굵게** *기울임* and `code` [link](https://example.org)"
        );
    }
}
