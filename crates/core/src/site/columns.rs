//! Column-position inference from a table's header row.
//!
//! Many trackers share one table layout but order the columns differently.
//! The header usually carries sort links (`?sort=5`, `order_by=size`) that
//! identify each column, so a field without an explicit selector gets a
//! positional `td:nth-child(N)` selector pointing at the column whose
//! header markup contains one of its markers.

use scraper::Html;
use std::borrow::Cow;
use tracing::debug;

use super::rows::{locate_elements, Fields};
use crate::html::{direct_cells, span};
use crate::metadata::ColumnDetect;

/// `fields` with positional selectors filled in where detection succeeds.
pub(crate) fn detect<'f>(doc: &Html, detect: &ColumnDetect, fields: &'f Fields) -> Cow<'f, Fields> {
    let missing: Vec<(&String, &Vec<String>)> = detect
        .markers
        .iter()
        .filter(|(field, _)| !fields.get(*field).is_some_and(|s| !s.selector.is_empty()))
        .collect();
    if missing.is_empty() {
        return Cow::Borrowed(fields);
    }

    let Some(header) = locate_elements(doc, &detect.header).into_iter().next() else {
        debug!("No header row for column detection");
        return Cow::Borrowed(fields);
    };

    // physical (1-based) column of every header cell
    let mut positions = Vec::new();
    let mut column = 1;
    for cell in direct_cells(header) {
        positions.push((column, cell.html()));
        column += span(cell, "colspan");
    }

    let mut resolved = fields.clone();
    for (field, markers) in missing {
        let hit = positions
            .iter()
            .find(|(_, markup)| markers.iter().any(|m| markup.contains(m.as_str())));
        if let Some((index, _)) = hit {
            debug!(field = %field, column = index, "Detected column");
            let entry = resolved.entry(field.clone()).or_default();
            entry.selector = vec![format!("td:nth-child({})", index)];
        }
    }
    Cow::Owned(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldSelector;
    use crate::filters::Filter;
    use serde_json::json;

    fn detect_config() -> ColumnDetect {
        serde_json::from_value(json!({
            "header": "table.torrents > tbody > tr:first-child",
            "markers": {
                "size": ["sort=5"],
                "seeders": ["sort=7"],
                "comments": ["sort=3"]
            }
        }))
        .unwrap()
    }

    const PAGE: &str = r#"
        <table class="torrents"><tbody>
          <tr>
            <td colspan="2">Name</td>
            <td><a href="?sort=3">C</a></td>
            <td><a href="?sort=5">Size</a></td>
            <td><a href="?sort=7">S</a></td>
          </tr>
        </tbody></table>"#;

    #[test]
    fn test_detect_fills_missing_selectors_only() {
        let doc = Html::parse_document(PAGE);
        let mut fields = Fields::new();
        fields.insert(
            "size".into(),
            FieldSelector::default().filter(Filter::new("parseSize")),
        );
        fields.insert("comments".into(), FieldSelector::new(["td.comments"]));

        let resolved = detect(&doc, &detect_config(), &fields);
        assert_eq!(resolved["size"].selector, vec!["td:nth-child(4)"]);
        assert_eq!(resolved["size"].filters, vec![Filter::new("parseSize")]);
        assert_eq!(resolved["seeders"].selector, vec!["td:nth-child(5)"]);
        assert_eq!(resolved["comments"].selector, vec!["td.comments"]);
    }

    #[test]
    fn test_detect_without_header_is_noop() {
        let doc = Html::parse_document("<table><tr><td>x</td></tr></table>");
        let fields = Fields::new();
        let resolved = detect(&doc, &detect_config(), &fields);
        assert!(matches!(resolved, Cow::Borrowed(_)));
    }
}
