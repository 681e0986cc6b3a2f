use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Deserialize, Debug)]
pub struct DatabaseProperty {
    pub id: String,
    #[serde(rename = "type")]
    pub typ: String,
}

#[derive(Deserialize, Debug)]
pub struct RetrieveDatabaseResp {
    pub id: String,
    #[serde(default)]
    pub title: Vec<Value>,
    pub properties: HashMap<String, DatabaseProperty>,
}

impl RetrieveDatabaseResp {
    /// Database title as plain text.
    pub fn plain_title(&self) -> String {
        self.title
            .iter()
            .filter_map(|t| t.get("plain_text").and_then(|s| s.as_str()))
            .collect()
    }

    /// `(name, type)` pairs sorted by name.
    pub fn property_summary(&self) -> Vec<(&str, &str)> {
        let mut props: Vec<_> = self
            .properties
            .iter()
            .map(|(name, p)| (name.as_str(), p.typ.as_str()))
            .collect();
        props.sort();
        props
    }
}

/// One page of a paginated list endpoint.
#[derive(Deserialize, Debug, Default)]
pub struct ListPage {
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl ListPage {
    /// Cursor for the following request, if the listing continues.
    pub fn continuation(&self) -> Option<&str> {
        if self.has_more {
            self.next_cursor.as_deref().filter(|c| !c.is_empty())
        } else {
            None
        }
    }
}
