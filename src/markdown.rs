//! A restricted markdown dialect rendered to HTML.
//!
//! Supported: fenced code blocks, inline code, `#`/`##`/`###` headings,
//! `- ` lists, `**bold**`, `*italic*`, `[text](url)` links, two-space hard
//! breaks and blank-line paragraphs. Rules run in a fixed order; code blocks
//! are lifted out first so nothing inside them is reinterpreted.
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::escape::{escape_attr, escape_html};

/// Rendered in place of an empty body.
pub const EMPTY_BODY_HTML: &str = "<p>내용이 없습니다.</p>";

static FENCED_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```(.*?)```").expect("valid regex"));
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").expect("valid regex"));
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid regex"));
static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid regex"));
static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\n+").expect("valid regex"));
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<[a-z].*>").expect("valid regex"));
static BLOCK_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<(?:!--|(?:h[1-6]|ul|ol|pre|blockquote|div|table|hr|p)\b)").expect("valid regex")
});

/// Headings, longest prefix first so `#` never claims a `##` line.
const HEADINGS: [(&str, &str); 3] = [("### ", "h3"), ("## ", "h2"), ("# ", "h1")];

/// Render a body for display.
///
/// A body that already contains an HTML tag anywhere is returned unchanged:
/// markdown is skipped for the whole document and nothing is escaped. Callers
/// own sanitizing HTML-bearing bodies.
pub fn render_body(body: Option<&str>) -> String {
    match body {
        Some(b) if !b.is_empty() => {
            if contains_html(b) {
                b.to_string()
            } else {
                render(b)
            }
        }
        _ => EMPTY_BODY_HTML.to_string(),
    }
}

/// True when the text contains something that looks like an HTML tag.
pub fn contains_html(text: &str) -> bool {
    HTML_TAG.is_match(text)
}

/// Render markdown to HTML. Empty input renders to an empty string.
pub fn render(markdown: &str) -> String {
    if markdown.is_empty() {
        return String::new();
    }

    let mut code_blocks: Vec<String> = Vec::new();
    let html = FENCED_CODE.replace_all(markdown, |caps: &Captures| {
        let marker = code_marker(code_blocks.len());
        code_blocks.push(escape_html(caps[1].trim()));
        marker
    });

    let html = INLINE_CODE.replace_all(&html, "<code>$1</code>");
    let html = render_blocks(&html);
    let html = BOLD.replace_all(&html, "<strong>$1</strong>");
    let html = replace_italics(&html);
    let html = LINK.replace_all(&html, |caps: &Captures| link(&caps[1], &caps[2]));
    let html = html.replace("  \n", "<br>");

    let mut out = String::with_capacity(html.len() + 16);
    for chunk in PARAGRAPH_BREAK.split(&html) {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            continue;
        }
        if BLOCK_START.is_match(chunk) {
            out.push_str(chunk);
        } else {
            out.push_str("<p>");
            out.push_str(chunk);
            out.push_str("</p>");
        }
    }

    for (i, code) in code_blocks.iter().enumerate() {
        out = out.replacen(&code_marker(i), &format!("<pre><code>{}</code></pre>", code), 1);
    }
    out
}

/// Opaque stand-in for an extracted code block. Shaped like an HTML comment
/// so the paragraph pass leaves it unwrapped.
fn code_marker(index: usize) -> String {
    format!("<!--code-block-{}-->", index)
}

/// Headings and lists, one line at a time.
fn render_blocks(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut in_list = false;

    for line in text.split('\n') {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            close_list(&mut lines, &mut in_list);
            lines.push(String::new());
            continue;
        }

        if let Some((content, tag)) = HEADINGS
            .iter()
            .find_map(|(prefix, tag)| trimmed.strip_prefix(prefix).map(|c| (c, tag)))
        {
            close_list(&mut lines, &mut in_list);
            lines.push(format!("<{tag}>{content}</{tag}>"));
            continue;
        }

        if let Some(item) = trimmed.strip_prefix("- ") {
            if !in_list {
                lines.push("<ul>".to_string());
                in_list = true;
            }
            lines.push(format!("<li>{}</li>", item));
            continue;
        }

        close_list(&mut lines, &mut in_list);
        lines.push(line.to_string());
    }
    close_list(&mut lines, &mut in_list);

    lines.join("\n")
}

fn close_list(lines: &mut Vec<String>, in_list: &mut bool) {
    if *in_list {
        lines.push("</ul>".to_string());
        *in_list = false;
    }
}

/// `*text*` → `<em>text</em>`, skipping any `*` that touches another `*`
/// so leftover bold delimiters are never split into two italics.
fn replace_italics(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'*' && (i == 0 || bytes[i - 1] != b'*') {
            if let Some(rel) = input[i + 1..].find('*') {
                let close = i + 1 + rel;
                if rel > 0 && bytes.get(close + 1) != Some(&b'*') {
                    out.push_str(&input[last..i]);
                    out.push_str("<em>");
                    out.push_str(&input[i + 1..close]);
                    out.push_str("</em>");
                    i = close + 1;
                    last = i;
                    continue;
                }
            }
        }
        i += 1;
    }

    out.push_str(&input[last..]);
    out
}

fn link(text: &str, url: &str) -> String {
    let href = escape_attr(url);
    if is_external_url(url) {
        format!(
            "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>",
            href, text
        )
    } else {
        format!("<a href=\"{}\">{}</a>", href, text)
    }
}

/// Absolute `http(s)` or protocol-relative URL.
pub fn is_external_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://") || url.starts_with("//")
}
