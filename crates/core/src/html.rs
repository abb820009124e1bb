//! Small helpers over `scraper` for row handling.
//!
//! Synthetic rows (padded group children, merged multi-row records) are
//! built by re-serializing the original markup into an owned fragment, so
//! the page document itself is never mutated.

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

/// Parse a CSS selector, logging instead of failing on invalid input.
pub fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(selector = %selector, error = ?e, "Invalid CSS selector");
            None
        }
    }
}

/// Concatenated text content of an element.
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

/// Direct `td`/`th` children of a table row.
pub fn direct_cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|child| matches!(child.value().name(), "td" | "th"))
        .collect()
}

/// Numeric `colspan`/`rowspan` of a cell, defaulting to 1.
pub fn span(cell: ElementRef<'_>, attr: &str) -> usize {
    cell.value()
        .attr(attr)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(1)
}

/// Number of physical columns a row occupies (sum of colspans).
pub fn row_width(row: ElementRef<'_>) -> usize {
    direct_cells(row).into_iter().map(|c| span(c, "colspan")).sum()
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn open_tag(element: ElementRef<'_>) -> String {
    let mut tag = format!("<{}", element.value().name());
    for (name, value) in element.value().attrs() {
        tag.push_str(&format!(" {}=\"{}\"", name, escape_attr(value)));
    }
    tag.push('>');
    tag
}

fn wrap_in_table(rows_html: &str) -> String {
    format!("<table><tbody>{}</tbody></table>", rows_html)
}

/// Copy of `row` with `pad` empty cells inserted before its own cells.
pub fn padded_row(row: ElementRef<'_>, pad: usize) -> Html {
    let name = row.value().name();
    let row_html = format!(
        "{}{}{}</{}>",
        open_tag(row),
        "<td></td>".repeat(pad),
        row.inner_html(),
        name
    );
    let markup = if name == "tr" {
        wrap_in_table(&row_html)
    } else {
        row_html
    };
    Html::parse_fragment(&markup)
}

/// Wrap several consecutive rows into a single synthetic node.
///
/// Table rows end up under a `tbody`, anything else under a `div`.
pub fn merged_rows(rows: &[ElementRef<'_>]) -> Html {
    let joined: String = rows.iter().map(|r| r.html()).collect();
    let is_table = rows.first().is_some_and(|r| r.value().name() == "tr");
    let markup = if is_table {
        wrap_in_table(&joined)
    } else {
        format!("<div data-merged=\"true\">{}</div>", joined)
    };
    Html::parse_fragment(&markup)
}

/// First element named `tag` in a synthetic fragment, i.e. its wrapper.
pub fn fragment_root<'a>(fragment: &'a Html, tag: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(tag).ok()?;
    fragment.select(&selector).next()
}
