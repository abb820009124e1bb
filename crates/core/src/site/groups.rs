//! Flattening release groups into one record per variant.
//!
//! HTML pages encode the group/variant relation positionally: a header row
//! followed by variant rows. Parsing happens in two passes. Rows are first
//! tagged as group headers, children or standalone rows, each carrying a
//! group id. The tagged stream is then folded, resolving every child
//! against the header recorded under its id.

use scraper::ElementRef;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

use super::rows::{coercion_for, inherit, Fields, RowMapper};
use crate::field::{is_empty_value, Coercion, FieldSelector, Source};
use crate::filters::as_text;
use crate::html::{direct_cells, fragment_root, padded_row, row_width, span};
use crate::metadata::GroupConfig;
use crate::path;

enum RowTag<'d> {
    Group { id: String, row: ElementRef<'d> },
    Child { group: Option<String>, row: ElementRef<'d> },
    Standalone(ElementRef<'d>),
}

/// What a variant row needs from its header.
struct GroupHeader {
    fields: Map<String, Value>,
    width: usize,
    /// Columns taken by leading cells spanning several rows.
    spanned: usize,
}

fn has_class(row: ElementRef<'_>, class: &str) -> bool {
    row.value().classes().any(|c| c == class)
}

/// Keys a variant takes from its group.
fn inherited_keys(group: &GroupConfig) -> Vec<String> {
    let mut keys = group.inherit.clone();
    for key in group.selectors.keys() {
        if !keys.contains(key) {
            keys.push(key.clone());
        }
    }
    keys
}

fn resolve_group_fields(
    mapper: &RowMapper<'_>,
    source: Source<'_>,
    group: &GroupConfig,
    fields: &Fields,
) -> Map<String, Value> {
    let resolver = mapper.site.resolver();
    let mut out = Map::new();
    for key in inherited_keys(group) {
        let selector = group.selectors.get(&key).or_else(|| fields.get(&key));
        if let Some(selector) = selector.filter(|s| s.is_configured()) {
            let value = resolver.resolve_with(source, selector, coercion_for(&key));
            if !is_empty_value(&value) {
                out.insert(key, value);
            }
        }
    }
    out
}

fn read_id(mapper: &RowMapper<'_>, row: ElementRef<'_>, selector: &FieldSelector) -> Option<String> {
    if !selector.is_configured() {
        return None;
    }
    let value = mapper
        .site
        .resolver()
        .resolve_with(Source::Element(row), selector, Coercion::Keep);
    let id = as_text(&value);
    (!id.trim().is_empty()).then(|| id.trim().to_string())
}

fn tag_rows<'d>(
    mapper: &RowMapper<'_>,
    rows: &[ElementRef<'d>],
    group: &GroupConfig,
) -> Vec<RowTag<'d>> {
    let mut tagged = Vec::with_capacity(rows.len());
    let mut current: Option<String> = None;

    for (index, row) in rows.iter().copied().enumerate() {
        if group.skip_class.as_deref().is_some_and(|c| has_class(row, c)) {
            continue;
        }
        if has_class(row, &group.group_class) {
            let id = read_id(mapper, row, &group.group_id).unwrap_or_else(|| format!("#{}", index));
            current = Some(id.clone());
            tagged.push(RowTag::Group { id, row });
        } else if has_class(row, &group.child_class) {
            let id = read_id(mapper, row, &group.child_group_id).or_else(|| current.clone());
            tagged.push(RowTag::Child { group: id, row });
        } else {
            current = None;
            tagged.push(RowTag::Standalone(row));
        }
    }
    tagged
}

fn leading_spanned_width(row: ElementRef<'_>) -> usize {
    direct_cells(row)
        .into_iter()
        .take_while(|cell| span(*cell, "rowspan") > 1)
        .map(|cell| span(cell, "colspan"))
        .sum()
}

/// Empty cells to insert before a variant row's own cells.
fn padding(row: ElementRef<'_>, header: &GroupHeader) -> usize {
    let width = row_width(row);
    if width >= header.width {
        return 0;
    }
    header.spanned.min(header.width - width)
}

pub(crate) fn flatten_document(
    mapper: &RowMapper<'_>,
    rows: &[ElementRef<'_>],
    group: &GroupConfig,
    fields: &Fields,
) -> Vec<Map<String, Value>> {
    let keys = inherited_keys(group);
    let mut headers: HashMap<String, GroupHeader> = HashMap::new();
    let mut records = Vec::new();

    for tag in tag_rows(mapper, rows, group) {
        match tag {
            RowTag::Group { id, row } => {
                let header = GroupHeader {
                    fields: resolve_group_fields(mapper, Source::Element(row), group, fields),
                    width: row_width(row),
                    spanned: leading_spanned_width(row),
                };
                headers.insert(id, header);
            }
            RowTag::Child { group: id, row } => {
                let header = id.as_ref().and_then(|id| headers.get(id));
                let pad = match header {
                    Some(header) if group.compensate_span => padding(row, header),
                    _ => 0,
                };

                let mut record = if pad > 0 {
                    debug!(pad, "Padding variant row");
                    let fragment = padded_row(row, pad);
                    match fragment_root(&fragment, row.value().name()) {
                        Some(padded) => mapper.parse_row(Source::Element(padded), fields),
                        None => mapper.parse_row(Source::Element(row), fields),
                    }
                } else {
                    mapper.parse_row(Source::Element(row), fields)
                };

                if let Some(header) = header {
                    inherit(&mut record, &header.fields, &keys);
                }
                records.push(record);
            }
            RowTag::Standalone(row) => records.push(mapper.parse_row(Source::Element(row), fields)),
        }
    }
    records
}

/// JSON groups carry their variants in an array at `childrenPath`.
pub(crate) fn flatten_json(
    mapper: &RowMapper<'_>,
    rows: &[&Value],
    group: &GroupConfig,
    fields: &Fields,
) -> Vec<Map<String, Value>> {
    let keys = inherited_keys(group);
    let children_path = group.children_path.as_deref().unwrap_or("torrents");
    let mut records = Vec::new();

    for row in rows.iter().copied() {
        let children = match path::get(row, children_path) {
            Some(Value::Array(children)) if !children.is_empty() => children,
            _ => {
                records.push(mapper.parse_row(Source::Json(row), fields));
                continue;
            }
        };

        let group_fields = resolve_group_fields(mapper, Source::Json(row), group, fields);
        for child in children {
            let mut record = mapper.parse_row(Source::Json(child), fields);
            inherit(&mut record, &group_fields, &keys);
            records.push(record);
        }
    }
    records
}
