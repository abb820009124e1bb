//! Turning a response body into torrent records.

use scraper::{ElementRef, Html};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;
use tracing::{debug, warn};
use url::Url;

use super::{columns, groups, Body, RowContext, Site, SiteError};
use crate::entity::{Torrent, EXT_PREFIX};
use crate::field::{is_empty_value, Coercion, FieldSelector, Source, SELF_SELECTOR};
use crate::html::{fragment_root, merged_rows, parse_selector};
use crate::metadata::{RowsSelector, SearchSelectors};
use crate::path;

/// Fields every row is resolved for, whether or not the entry declares them.
pub const DEFAULT_TORRENT_KEYS: &[&str] = &[
    "id", "title", "subTitle", "url", "link", "time", "size", "author", "seeders", "leechers",
    "completed", "comments", "category", "tags", "progress", "status",
];

pub(crate) type Fields = BTreeMap<String, FieldSelector>;

/// Resolves every row of one page against one set of selectors.
pub(crate) struct RowMapper<'a> {
    pub site: &'a Site,
    pub selectors: &'a SearchSelectors,
    pub ctx: &'a RowContext<'a>,
}

impl<'a> RowMapper<'a> {
    pub fn new(site: &'a Site, selectors: &'a SearchSelectors, ctx: &'a RowContext<'a>) -> Self {
        Self {
            site,
            selectors,
            ctx,
        }
    }

    /// All records of the page; no rows at all is [`SiteError::NoTorrents`].
    pub fn map(&self, body: &Body) -> Result<Vec<Torrent>, SiteError> {
        let rows = self
            .selectors
            .rows
            .as_ref()
            .ok_or_else(|| SiteError::InvalidMetadata("search selectors have no rows".into()))?;

        let records = match body {
            Body::Document(doc) => self.map_document(doc, rows),
            Body::Json(value) => self.map_json(value, rows),
        };
        debug!(site = %self.site.id(), rows = records.len(), "Mapped rows");

        if records.is_empty() {
            return Err(SiteError::NoTorrents);
        }
        Ok(records.into_iter().map(|fields| self.finish(fields)).collect())
    }

    fn map_document(&self, doc: &Html, rows: &RowsSelector) -> Vec<Map<String, Value>> {
        let fields: Cow<'_, Fields> = match &rows.columns {
            Some(detect) => columns::detect(doc, detect, &self.selectors.fields),
            None => Cow::Borrowed(&self.selectors.fields),
        };

        let matched = locate_elements(doc, &rows.selector);
        let matched: Vec<ElementRef<'_>> = match self.row_filter(rows) {
            Some(keep) => matched.into_iter().filter(|r| keep(Source::Element(*r))).collect(),
            None => matched,
        };
        if matched.is_empty() {
            return Vec::new();
        }

        if let Some(group) = &rows.group {
            return groups::flatten_document(self, &matched, group, &fields);
        }

        match rows.merge.filter(|k| *k > 1) {
            Some(k) => matched
                .chunks(k)
                .filter_map(|chunk| {
                    let fragment = merged_rows(chunk);
                    let root = merged_root(&fragment, chunk)?;
                    Some(self.parse_row(Source::Element(root), &fields))
                })
                .collect(),
            None => matched
                .into_iter()
                .map(|row| self.parse_row(Source::Element(row), &fields))
                .collect(),
        }
    }

    fn map_json(&self, body: &Value, rows: &RowsSelector) -> Vec<Map<String, Value>> {
        let matched = locate_json(body, &rows.selector);
        let matched: Vec<&Value> = match self.row_filter(rows) {
            Some(keep) => matched.into_iter().filter(|r| keep(Source::Json(*r))).collect(),
            None => matched,
        };

        if let Some(group) = rows.group.as_ref().filter(|g| g.children_path.is_some()) {
            return groups::flatten_json(self, &matched, group, &self.selectors.fields);
        }

        matched
            .into_iter()
            .map(|row| self.parse_row(Source::Json(row), &self.selectors.fields))
            .collect()
    }

    fn row_filter(&self, rows: &RowsSelector) -> Option<&super::RowFilter> {
        let name = rows.filter.as_deref()?;
        let filter = self.site.hooks().row_filters.get(name);
        if filter.is_none() {
            warn!(site = %self.site.id(), filter = %name, "Unknown row filter");
        }
        filter
    }

    /// Resolve every field of one row.
    ///
    /// A registered field parser replaces the selector for its field and
    /// sees the fields resolved before it.
    pub fn parse_row(&self, source: Source<'_>, fields: &Fields) -> Map<String, Value> {
        let hooks = self.site.hooks();
        let resolver = self.site.resolver();

        let mut keys: Vec<&str> = DEFAULT_TORRENT_KEYS.to_vec();
        for key in fields.keys().chain(hooks.torrent_fields.keys()) {
            if !keys.contains(&key.as_str()) {
                keys.push(key.as_str());
            }
        }

        let mut acc = Map::new();
        for key in keys {
            let value = if let Some(parser) = hooks.torrent_fields.get(key) {
                parser(&acc, source, self.ctx)
            } else if let Some(selector) = fields.get(key).filter(|s| s.is_configured()) {
                resolver.resolve_with(source, selector, coercion_for(key))
            } else {
                continue;
            };
            acc.insert(key.to_string(), value);
        }
        acc
    }

    fn finish(&self, mut fields: Map<String, Value>) -> Torrent {
        let base = if self.ctx.final_url.is_empty() {
            self.site.metadata().base_url().unwrap_or_default()
        } else {
            self.ctx.final_url
        };
        for key in ["url", "link"] {
            if let Some(Value::String(url)) = fields.get_mut(key) {
                *url = absolutize_url(url, base);
            }
        }
        Torrent::from_fields(self.site.id(), &fields)
    }
}

/// Opaque identifiers keep their text.
pub(crate) fn coercion_for(key: &str) -> Coercion {
    if key == "id" || key.starts_with(EXT_PREFIX) {
        Coercion::Keep
    } else {
        Coercion::Numeric
    }
}

/// Elements matched by the first selector that matches anything.
pub(crate) fn locate_elements<'d>(doc: &'d Html, selectors: &[String]) -> Vec<ElementRef<'d>> {
    selectors
        .iter()
        .filter_map(|s| parse_selector(s))
        .map(|css| doc.select(&css).collect::<Vec<_>>())
        .find(|rows| !rows.is_empty())
        .unwrap_or_default()
}

/// Items of the first path that resolves to a non-empty collection.
pub(crate) fn locate_json<'v>(body: &'v Value, selectors: &[String]) -> Vec<&'v Value> {
    let candidates: Vec<&str> = if selectors.is_empty() {
        vec![SELF_SELECTOR]
    } else {
        selectors.iter().map(String::as_str).collect()
    };

    candidates
        .into_iter()
        .filter_map(|selector| {
            if selector == SELF_SELECTOR {
                Some(body)
            } else {
                path::get(body, selector)
            }
        })
        .map(|found| match found {
            Value::Array(items) => items.iter().collect(),
            Value::Object(map) => map.values().collect(),
            _ => Vec::new(),
        })
        .find(|rows: &Vec<&Value>| !rows.is_empty())
        .unwrap_or_default()
}

fn merged_root<'f>(fragment: &'f Html, chunk: &[ElementRef<'_>]) -> Option<ElementRef<'f>> {
    let is_table = chunk.first().is_some_and(|r| r.value().name() == "tr");
    fragment_root(fragment, if is_table { "tbody" } else { "div[data-merged]" })
}

/// Resolve `url` against the page it was found on.
///
/// Magnet links are left alone and protocol-relative URLs take the page's
/// scheme.
pub fn absolutize_url(url: &str, base: &str) -> String {
    let url = url.trim();
    if url.is_empty() || url.starts_with("magnet:") {
        return url.to_string();
    }
    let Ok(base) = Url::parse(base) else {
        return url.to_string();
    };
    if let Some(rest) = url.strip_prefix("//") {
        return format!("{}://{}", base.scheme(), rest);
    }
    base.join(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}

/// Copy `keys` from `group` into `child` where the group has a value.
pub(crate) fn inherit(child: &mut Map<String, Value>, group: &Map<String, Value>, keys: &[String]) {
    for key in keys {
        if let Some(value) = group.get(key).filter(|v| !is_empty_value(v)) {
            child.insert(key.clone(), value.clone());
        }
    }
}
