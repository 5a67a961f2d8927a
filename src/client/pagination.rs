//! `Link` response header parsing.
//!
//! GitHub paginates list endpoints with a header like:
//!
//! ```text
//! Link: <https://api.github.com/user/repos?page=3&per_page=100>; rel="next",
//!       <https://api.github.com/user/repos?page=50&per_page=100>; rel="last"
//! ```

use reqwest::Url;
use serde::Serialize;
use serde_json::{Map, Value};

/// A single page reference from the `Link` header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub page: u64,
    pub url: String,
}

/// Recognized pagination relations. Any relation may be absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<PageLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<PageLink>,
}

impl Pagination {
    pub fn is_empty(&self) -> bool {
        self.next.is_none() && self.prev.is_none() && self.first.is_none() && self.last.is_none()
    }

    fn slot(&mut self, rel: &str) -> Option<&mut Option<PageLink>> {
        match rel {
            "next" => Some(&mut self.next),
            "prev" => Some(&mut self.prev),
            "first" => Some(&mut self.first),
            "last" => Some(&mut self.last),
            _ => None,
        }
    }

    /// Flattens into `{rel: page, "<rel>_url": url}`.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let relations = [
            ("next", &self.next),
            ("prev", &self.prev),
            ("first", &self.first),
            ("last", &self.last),
        ];
        for (rel, link) in relations {
            if let Some(link) = link {
                map.insert(rel.to_string(), Value::from(link.page));
                map.insert(format!("{}_url", rel), Value::from(link.url.clone()));
            }
        }
        map
    }
}

/// Parses a `Link` header value. Malformed entries are skipped.
pub fn parse_link_header(header: &str) -> Pagination {
    let mut pagination = Pagination::default();

    for entry in header.split(',') {
        let Some((rel, link)) = parse_entry(entry) else {
            tracing::trace!(entry = %entry.trim(), "Skipping malformed Link entry");
            continue;
        };
        if let Some(slot) = pagination.slot(&rel) {
            *slot = Some(link);
        }
    }

    pagination
}

fn parse_entry(entry: &str) -> Option<(String, PageLink)> {
    let segments: Vec<&str> = entry.split(';').map(str::trim).collect();
    if segments.len() < 2 {
        return None;
    }

    let url = segments[0].strip_prefix('<')?.strip_suffix('>')?;
    let parsed = Url::parse(url).ok()?;
    let page = parsed
        .query_pairs()
        .find(|(k, _)| k == "page")
        .and_then(|(_, v)| v.parse::<u64>().ok())?;

    let rel = segments[1..].iter().find_map(|param| {
        let (name, value) = param.split_once('=')?;
        (name.trim() == "rel").then(|| value.trim().trim_matches('"').to_string())
    })?;

    Some((
        rel,
        PageLink {
            page,
            url: url.to_string(),
        },
    ))
}
