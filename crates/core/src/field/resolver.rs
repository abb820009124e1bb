//! Field resolution: candidate selectors -> extraction -> filters -> coercion.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use super::{is_empty_value, ElementProcess, FieldSelector, Source, SELF_SELECTOR};
use crate::filters::{Filter, FilterRegistry};
use crate::html::{element_text, parse_selector};
use crate::path;

static INTEGER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d+$").expect("integer regex is valid"));

/// Whether an all-digit result string becomes a JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    Numeric,
    /// Opaque identifiers keep their exact text ("007" stays "007").
    Keep,
}

/// One candidate selector together with the pipeline used when it wins.
struct Rule<'s> {
    matcher: &'s str,
    filters: &'s [Filter],
}

/// Resolves [`FieldSelector`]s against DOM or JSON nodes. Never fails.
pub struct FieldResolver<'a> {
    filters: &'a FilterRegistry,
    processors: &'a HashMap<String, ElementProcess>,
}

impl<'a> FieldResolver<'a> {
    pub fn new(
        filters: &'a FilterRegistry,
        processors: &'a HashMap<String, ElementProcess>,
    ) -> Self {
        Self {
            filters,
            processors,
        }
    }

    pub fn resolve(&self, source: Source<'_>, selector: &FieldSelector) -> Value {
        self.resolve_with(source, selector, Coercion::Numeric)
    }

    pub fn resolve_with(
        &self,
        source: Source<'_>,
        selector: &FieldSelector,
        coercion: Coercion,
    ) -> Value {
        let chosen = rules(selector).find_map(|rule| {
            let raw = self.extract(source, rule.matcher, selector)?;
            (!is_empty_value(&raw)).then_some((raw, rule.filters))
        });

        let value = match chosen {
            Some((raw, pipeline)) => self.filters.apply(raw, pipeline),
            None => {
                let fallback = selector
                    .text
                    .clone()
                    .unwrap_or_else(|| Value::String(String::new()));
                self.filters.apply(fallback, &selector.filters)
            }
        };
        finalize(value, coercion)
    }

    fn extract(&self, source: Source<'_>, matcher: &str, field: &FieldSelector) -> Option<Value> {
        match source {
            Source::Element(element) => {
                let target = if matcher == SELF_SELECTOR {
                    element
                } else {
                    let css = parse_selector(matcher)?;
                    element.select(&css).next()?
                };

                if let Some(name) = &field.element_process {
                    return self.process(name, Source::Element(target));
                }
                if let Some(case) = &field.case {
                    let hit = case.iter().find(|(rule, _)| {
                        parse_selector(rule).is_some_and(|css| {
                            css.matches(&target) || target.select(&css).next().is_some()
                        })
                    });
                    return Some(hit.map(|(_, v)| v.clone()).unwrap_or(Value::Null));
                }
                if let Some(data) = &field.data {
                    let attr = format!("data-{}", data);
                    return target.value().attr(&attr).map(|v| Value::String(v.to_string()));
                }
                if let Some(attr) = &field.attr {
                    return target.value().attr(attr).map(|v| Value::String(v.to_string()));
                }
                Some(Value::String(element_text(target)))
            }
            Source::Json(node) => {
                let target = if matcher == SELF_SELECTOR {
                    node
                } else {
                    path::get(node, matcher)?
                };

                if let Some(name) = &field.element_process {
                    return self.process(name, Source::Json(target));
                }
                if let Some(case) = &field.case {
                    let key = match target {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    return Some(case.get(&key).cloned().unwrap_or(Value::Null));
                }
                if let Some(attr) = field.attr.as_ref().or(field.data.as_ref()) {
                    return path::get(target, attr).cloned();
                }
                Some(target.clone())
            }
        }
    }

    fn process(&self, name: &str, source: Source<'_>) -> Option<Value> {
        match self.processors.get(name) {
            Some(process) => Some(process(source)),
            None => {
                warn!(element_process = %name, "Unknown element processor");
                None
            }
        }
    }
}

fn rules(field: &FieldSelector) -> impl Iterator<Item = Rule<'_>> {
    field.selector.iter().map(move |matcher| Rule {
        matcher,
        filters: field
            .switch_filters
            .get(matcher)
            .map(Vec::as_slice)
            .unwrap_or(field.filters.as_slice()),
    })
}

fn finalize(value: Value, coercion: Coercion) -> Value {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if coercion == Coercion::Numeric && INTEGER_RE.is_match(trimmed) {
                if let Ok(n) = trimmed.parse::<i64>() {
                    return Value::from(n);
                }
            }
            Value::String(trimmed.to_string())
        }
        other => other,
    }
}
