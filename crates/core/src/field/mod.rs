//! Field descriptors and the resolver that turns one source node into one
//! normalized value.

mod resolver;

pub use resolver::{Coercion, FieldResolver};

use scraper::ElementRef;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::filters::Filter;

/// Sentinel selector meaning "the source node itself".
pub const SELF_SELECTOR: &str = ":self";

/// A node a field can be extracted from.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    Element(ElementRef<'a>),
    Json(&'a Value),
}

impl<'a> Source<'a> {
    pub fn as_element(&self) -> Option<ElementRef<'a>> {
        match self {
            Source::Element(el) => Some(*el),
            Source::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&'a Value> {
        match self {
            Source::Json(v) => Some(v),
            Source::Element(_) => None,
        }
    }
}

/// Named read-only extraction hook (`elementProcess`).
pub type ElementProcess = Arc<dyn for<'a> Fn(Source<'a>) -> Value + Send + Sync>;

/// Declarative description of how to read one field.
///
/// Candidate `selector`s are tried in order and the first one producing a
/// non-empty value wins. `text` is the static fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSelector {
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub selector: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_process: Option<String>,
    /// CSS rule -> value; the first rule matching the node wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
    /// Selector-specific pipelines that replace `filters` for that selector.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub switch_filters: BTreeMap<String, Vec<Filter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Value>,
}

impl FieldSelector {
    pub fn new<I, S>(selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selector: selectors.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn text(value: impl Into<Value>) -> Self {
        Self {
            text: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn attr(mut self, attr: impl Into<String>) -> Self {
        self.attr = Some(attr.into());
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn element_process(mut self, name: impl Into<String>) -> Self {
        self.element_process = Some(name.into());
        self
    }

    /// Whether this descriptor can produce anything at all.
    pub fn is_configured(&self) -> bool {
        !self.selector.is_empty() || self.text.is_some()
    }
}

/// Accept either `"sel"` or `["sel1", "sel2"]`.
pub(crate) fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
    })
}

/// Null, blank strings and empty arrays count as "nothing found".
pub(crate) fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
