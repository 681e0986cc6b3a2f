//! Mapping between statement slugs and the URLs and history states that address them.
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Url;
use serde::Serialize;

use crate::config::Site;

/// Characters `encodeURIComponent` leaves untouched, everything else is escaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Relative URLs are resolved against this before inspection.
const DUMMY_BASE: &str = "http://localhost/";

pub const DEFAULT_PAGE: &str = "./poli-statements.html";
pub const DEFAULT_QUERY_PARAM: &str = "statement";
pub const DEFAULT_HASH_PREFIX: &str = "#/statement/";

const LIST_TITLE: &str = "성명공유";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    List,
    Detail,
}

/// State object handed to the history shell.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RouteState {
    pub slug: Option<String>,
    pub page: PageKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteCodec {
    page: String,
    param: String,
    hash_prefix: String,
}

impl Default for RouteCodec {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_QUERY_PARAM, DEFAULT_HASH_PREFIX)
    }
}

impl RouteCodec {
    pub fn new(page: impl Into<String>, param: impl Into<String>, hash_prefix: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            param: param.into(),
            hash_prefix: hash_prefix.into(),
        }
    }

    pub fn from_config(site: &Site) -> Self {
        Self::new(&site.page, &site.query_param, &site.hash_prefix)
    }

    /// URL of the list view.
    pub fn list_url(&self) -> &str {
        &self.page
    }

    /// Slug addressed by `url`, or `None` for the list view.
    ///
    /// The query parameter wins over the hash form. Values are decoded once.
    pub fn decode(&self, url: &str) -> Option<String> {
        let parsed = parse_lenient(url)?;

        if let Some((_, value)) = parsed.query_pairs().find(|(k, _)| k == self.param.as_str()) {
            if !value.is_empty() {
                return Some(value.into_owned());
            }
        }

        let fragment = parsed.fragment()?;
        let prefix = self.hash_prefix.strip_prefix('#').unwrap_or(&self.hash_prefix);
        let rest = fragment.strip_prefix(prefix)?;
        if rest.is_empty() {
            return None;
        }
        percent_decode_str(rest)
            .decode_utf8()
            .ok()
            .map(|s| s.into_owned())
    }

    /// Canonical query-form URL for `slug`; the list URL for `None` or an empty slug.
    pub fn encode(&self, slug: Option<&str>) -> String {
        match slug.filter(|s| !s.is_empty()) {
            Some(slug) => format!("{}?{}={}", self.page, self.param, encode_component(slug)),
            None => self.page.clone(),
        }
    }

    /// Hash-form URL for `slug`.
    pub fn encode_hash(&self, slug: &str) -> String {
        format!("{}{}{}", self.page, self.hash_prefix, encode_component(slug))
    }

    pub fn state(&self, slug: Option<&str>) -> RouteState {
        let slug = slug.filter(|s| !s.is_empty()).map(str::to_string);
        let page = if slug.is_some() {
            PageKind::Detail
        } else {
            PageKind::List
        };
        RouteState { slug, page }
    }

    pub fn title(&self, slug: Option<&str>) -> String {
        match slug.filter(|s| !s.is_empty()) {
            Some(slug) => format!("성명 상세 - {}", slug),
            None => LIST_TITLE.to_string(),
        }
    }
}

/// Percent-encode like `encodeURIComponent`.
pub fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string()
}

fn parse_lenient(url: &str) -> Option<Url> {
    match Url::parse(url) {
        Ok(u) => Some(u),
        Err(_) => Url::parse(DUMMY_BASE).ok()?.join(url).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_uses_query_form() {
        let codec = RouteCodec::default();
        assert_eq!(
            codec.encode(Some("2026-01-meeting")),
            "./poli-statements.html?statement=2026-01-meeting"
        );
        assert_eq!(codec.encode(None), "./poli-statements.html");
        assert_eq!(codec.encode(Some("")), "./poli-statements.html");
    }

    #[test]
    fn encode_component_matches_uri_component_rules() {
        assert_eq!(encode_component("a b+c%d#e/f"), "a%20b%2Bc%25d%23e%2Ff");
        assert_eq!(encode_component("it's-(ok)!~*_."), "it's-(ok)!~*_.");
        assert_eq!(encode_component("성명"), "%EC%84%B1%EB%AA%85");
    }

    #[test]
    fn round_trips_awkward_slugs_in_both_forms() {
        let codec = RouteCodec::default();
        for slug in ["성명 발표", "a+b", "100% sure", "tag#1", "plain-slug", "x&y=z"] {
            assert_eq!(codec.decode(&codec.encode(Some(slug))).as_deref(), Some(slug), "{slug}");
            assert_eq!(codec.decode(&codec.encode_hash(slug)).as_deref(), Some(slug), "{slug}");
        }
    }

    #[test]
    fn decode_absolute_urls() {
        let codec = RouteCodec::default();
        assert_eq!(
            codec
                .decode("https://example.org/poli-statements.html?x=1&statement=abc#/statement/zzz")
                .as_deref(),
            Some("abc")
        );
        assert_eq!(
            codec
                .decode("https://example.org/poli-statements.html#/statement/%EC%84%B1%EB%AA%85")
                .as_deref(),
            Some("성명")
        );
    }

    #[test]
    fn decode_list_view_cases() {
        let codec = RouteCodec::default();
        assert_eq!(codec.decode("./poli-statements.html"), None);
        assert_eq!(codec.decode("./poli-statements.html?statement="), None);
        assert_eq!(codec.decode("./poli-statements.html#/statement/"), None);
        assert_eq!(codec.decode("./poli-statements.html#/other/x"), None);
        assert_eq!(codec.decode("./poli-statements.html#/statement/%FF"), None);
    }

    #[test]
    fn empty_query_value_falls_through_to_hash() {
        let codec = RouteCodec::default();
        assert_eq!(
            codec.decode("./poli-statements.html?statement=#/statement/from-hash").as_deref(),
            Some("from-hash")
        );
    }

    #[test]
    fn state_and_title() {
        let codec = RouteCodec::default();
        assert_eq!(
            codec.state(Some("a")),
            RouteState {
                slug: Some("a".into()),
                page: PageKind::Detail
            }
        );
        assert_eq!(codec.state(None).page, PageKind::List);
        let v = serde_json::to_value(codec.state(None)).unwrap();
        assert_eq!(v, serde_json::json!({ "slug": null, "page": "list" }));
        assert_eq!(codec.title(Some("a")), "성명 상세 - a");
        assert_eq!(codec.title(None), "성명공유");
    }

    #[test]
    fn custom_names_from_site_config() {
        let codec = RouteCodec::new("/news.html", "s", "#!/s/");
        assert_eq!(codec.encode(Some("x y")), "/news.html?s=x%20y");
        assert_eq!(codec.encode_hash("x y"), "/news.html#!/s/x%20y");
        assert_eq!(codec.decode("/news.html#!/s/x%20y").as_deref(), Some("x y"));
        assert_eq!(codec.decode("/news.html?s=q").as_deref(), Some("q"));
    }
}
