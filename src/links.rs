//! Post-processing pass that marks links leaving the site.
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use reqwest::Url;

static ANCHOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a>").expect("valid regex"));
static HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex"));
static TARGET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\btarget\s*=").expect("valid regex"));
static ARIA_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\baria-label\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex"));
static REL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\s+rel\s*=\s*(?:"[^"]*"|'[^']*')"#).expect("valid regex"));
static TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\btitle\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

const FALLBACK_LABEL: &str = "링크";

/// Open every link whose origin differs from `site_base` in a new window.
///
/// Anchors that already carry a `target` are left alone, as are hrefs that
/// do not resolve against the site. An `aria-label` announcing the new
/// window is added unless one is present.
pub fn enhance_external_links(html: &str, site_base: &Url) -> String {
    ANCHOR
        .replace_all(html, |caps: &Captures| enhance_anchor(caps, site_base))
        .into_owned()
}

fn enhance_anchor(caps: &Captures, site_base: &Url) -> String {
    let whole = caps[0].to_string();
    let attrs = &caps[1];
    let inner = &caps[2];

    let Some(href) = attr_value(&HREF, attrs) else {
        return whole;
    };
    if href.is_empty() || TARGET.is_match(attrs) || !is_external(&href, site_base) {
        return whole;
    }

    let mut attrs = REL.replace_all(attrs, "").into_owned();
    attrs.push_str(" target=\"_blank\" rel=\"noopener noreferrer\"");

    if attr_value(&ARIA_LABEL, &attrs).map_or(true, |v| v.is_empty()) {
        let text = TAG.replace_all(inner, "");
        let text = text.trim();
        let label = if text.is_empty() {
            attr_value(&TITLE, &attrs)
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| FALLBACK_LABEL.to_string())
        } else {
            text.to_string()
        };
        attrs.push_str(&format!(
            " aria-label=\"{}, 새 창에서 열림\"",
            label.replace('"', "&quot;")
        ));
    }

    format!("<a{}>{}</a>", attrs, inner)
}

fn attr_value(pattern: &Regex, attrs: &str) -> Option<String> {
    let caps = pattern.captures(attrs)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

fn is_external(href: &str, site_base: &Url) -> bool {
    match site_base.join(&href.replace("&amp;", "&")) {
        Ok(url) => url.origin() != site_base.origin(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://statements.example.org/poli-statements.html").unwrap()
    }

    #[test]
    fn marks_foreign_origins() {
        let out = enhance_external_links(
            "<p>See <a href=\"https://news.example.com/a?x=1&amp;y=2\">the <em>report</em></a>.</p>",
            &base(),
        );
        assert_eq!(
            out,
            "<p>See <a href=\"https://news.example.com/a?x=1&amp;y=2\" target=\"_blank\" rel=\"noopener noreferrer\" aria-label=\"the report, 새 창에서 열림\">the <em>report</em></a>.</p>"
        );
    }

    #[test]
    fn leaves_internal_and_relative_links() {
        let html = concat!(
            "<a href=\"./poli-statements.html?statement=a\">a</a>",
            "<a href=\"/about.html\">about</a>",
            "<a href=\"https://statements.example.org/x\">same origin</a>",
            "<a name=\"anchor\">no href</a>"
        );
        assert_eq!(enhance_external_links(html, &base()), html);
    }

    #[test]
    fn respects_existing_target_and_label() {
        let targeted = "<a href=\"https://x.example.com\" target=\"_self\">x</a>";
        assert_eq!(enhance_external_links(targeted, &base()), targeted);

        let labelled = enhance_external_links(
            "<a href=\"https://x.example.com\" aria-label=\"외부\" rel=\"nofollow\">x</a>",
            &base(),
        );
        assert_eq!(
            labelled,
            "<a href=\"https://x.example.com\" aria-label=\"외부\" target=\"_blank\" rel=\"noopener noreferrer\">x</a>"
        );
    }

    #[test]
    fn label_falls_back_to_title_then_generic() {
        let titled = enhance_external_links("<a href=\"//cdn.example.net/f.pdf\" title=\"자료\"><img src=\"i.png\"></a>", &base());
        assert!(titled.contains("aria-label=\"자료, 새 창에서 열림\""));

        let bare = enhance_external_links("<a href='https://x.example.com'> </a>", &base());
        assert!(bare.contains("aria-label=\"링크, 새 창에서 열림\""));
    }

    #[test]
    fn markdown_links_already_targeted_pass_through() {
        let rendered = crate::markdown::render("[site](https://example.org)");
        assert_eq!(enhance_external_links(&rendered, &base()), rendered);
    }
}
