//! Helpers shared by schema hooks.
//!
//! Tracker profile pages list statistics as "Label: value" pairs, either
//! one per element (`<li>Uploaded: 1.5 GiB</li>`) or inline in one cell
//! (`<b>Uploaded</b>: 1.5 GiB <b>Downloaded</b>: 20 GiB`).

use chrono::{FixedOffset, Offset, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use scraper::ElementRef;
use serde_json::Value;

use crate::field::Source;
use crate::filters::{
    number_value, parse_number, parse_size, parse_time_in, parse_ttl, DEFAULT_TIME_PATTERNS,
};
use crate::html::{element_text, parse_selector};

/// Elements that typically hold one "Label: value" statistic.
const LABEL_CONTAINERS: &str = "li, tr, dt, dd, p";

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{4}[-/]\d{2}[-/]\d{2}(?:[ T]\d{2}:\d{2}(?::\d{2})?)?")
        .expect("date regex is valid")
});

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_separator(text: &str) -> &str {
    text.trim_start()
        .trim_start_matches([':', '：'])
        .trim()
}

/// The first statistic element whose text starts with one of `labels`,
/// descending into nested matches.
pub(crate) fn labelled<'a>(source: Source<'a>, labels: &[&str]) -> Option<ElementRef<'a>> {
    let root = source.as_element()?;
    let css = parse_selector(LABEL_CONTAINERS)?;
    let hits: Vec<ElementRef<'a>> = root
        .select(&css)
        .filter(|el| {
            let text = element_text(*el);
            let text = text.trim_start();
            labels.iter().any(|label| starts_with_ignore_case(text, label))
        })
        .collect();
    let mut found = *hits.first()?;
    // document order puts descendants right after their ancestor
    for hit in &hits[1..] {
        if hit.ancestors().any(|node| node.id() == found.id()) {
            found = *hit;
        } else {
            break;
        }
    }
    Some(found)
}

/// Text after the label (and its colon) of a labelled statistic.
pub(crate) fn labelled_text(source: Source<'_>, labels: &[&str]) -> Option<String> {
    let el = labelled(source, labels)?;
    let text = collapse(&element_text(el));
    let label = labels
        .iter()
        .find(|label| starts_with_ignore_case(&text, label))?;
    let rest = strip_separator(&text[label.len()..]);
    (!rest.is_empty()).then(|| rest.to_string())
}

/// Whatever follows the first occurrence of a label anywhere in the page.
/// Callers parse the leading value out of it.
pub(crate) fn inline_after(source: Source<'_>, labels: &[&str]) -> Option<String> {
    let root = source.as_element()?;
    let text = collapse(&element_text(root));
    labels.iter().find_map(|label| {
        let index = text.find(label)?;
        let rest = strip_separator(&text[index + label.len()..]);
        (!rest.is_empty()).then(|| rest.to_string())
    })
}

/// First non-empty reading among `labels`, line-wise then inline.
fn stat(source: Source<'_>, labels: &[&str]) -> Option<String> {
    labelled_text(source, labels).or_else(|| inline_after(source, labels))
}

pub(crate) fn size_after(source: Source<'_>, labels: &[&str]) -> Value {
    stat(source, labels)
        .map(|text| number_value(parse_size(&text)))
        .unwrap_or(Value::Null)
}

pub(crate) fn number_after(source: Source<'_>, labels: &[&str]) -> Value {
    stat(source, labels)
        .map(|text| number_value(parse_number(&text)))
        .unwrap_or(Value::Null)
}

pub(crate) fn text_after(source: Source<'_>, labels: &[&str]) -> Value {
    labelled_text(source, labels)
        .map(Value::String)
        .unwrap_or(Value::Null)
}

fn absolute_time(text: &str, offset: FixedOffset) -> Option<i64> {
    parse_time_in(text.trim(), DEFAULT_TIME_PATTERNS, offset).or_else(|| {
        let date = DATE_RE.find(text)?;
        parse_time_in(date.as_str(), DEFAULT_TIME_PATTERNS, offset)
    })
}

/// A labelled timestamp at `offset`.
///
/// Tried in order: the `title` of a nested element, a date inside the
/// text, the text as a relative age ("3 years ago").
pub(crate) fn time_after(source: Source<'_>, labels: &[&str], offset: FixedOffset) -> Value {
    let Some(el) = labelled(source, labels) else {
        return Value::Null;
    };
    let titled = parse_selector("[title]")
        .and_then(|css| el.select(&css).next())
        .and_then(|titled| titled.value().attr("title"))
        .and_then(|title| absolute_time(title, offset));
    if let Some(ms) = titled {
        return Value::from(ms);
    }
    match labelled_text(source, labels) {
        Some(text) => match absolute_time(&text, offset) {
            Some(ms) => Value::from(ms),
            None => Value::from(parse_ttl(&text)),
        },
        None => Value::Null,
    }
}

pub(crate) fn utc() -> FixedOffset {
    Utc.fix()
}
