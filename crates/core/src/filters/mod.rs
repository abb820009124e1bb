//! Named value transforms applied after a field has been extracted.
//!
//! A filter pipeline is an ordered list of [`Filter`] calls evaluated
//! left to right. Built-in filters never fail: a value they cannot parse
//! degrades to a neutral default (`0`, the unchanged input, or `""`).

mod number;
mod text;
mod time;

pub use number::{parse_number, parse_size};
pub use text::querystring;
pub use time::{
    parse_offset, parse_time, parse_time_filter, parse_time_in, parse_ttl, parse_ttl_at,
    DEFAULT_TIME_PATTERNS,
};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Signature of a filter implementation: `(value, args) -> value`.
pub type FilterFn = Arc<dyn Fn(Value, &[Value]) -> Value + Send + Sync>;

/// One step of a filter pipeline.
///
/// Deserializes from either a bare name (`"parseSize"`) or an object
/// (`{"name": "replace", "args": ["GB", "GiB"]}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "FilterSpec", into = "FilterSpec")]
pub struct Filter {
    pub name: String,
    pub args: Vec<Value>,
}

impl Filter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum FilterSpec {
    Name(String),
    Call {
        name: String,
        #[serde(default)]
        args: Vec<Value>,
    },
}

impl From<FilterSpec> for Filter {
    fn from(spec: FilterSpec) -> Self {
        match spec {
            FilterSpec::Name(name) => Filter::new(name),
            FilterSpec::Call { name, args } => Filter { name, args },
        }
    }
}

impl From<Filter> for FilterSpec {
    fn from(filter: Filter) -> Self {
        if filter.args.is_empty() {
            FilterSpec::Name(filter.name)
        } else {
            FilterSpec::Call {
                name: filter.name,
                args: filter.args,
            }
        }
    }
}

fn builtin<F>(f: F) -> FilterFn
where
    F: Fn(Value, &[Value]) -> Value + Send + Sync + 'static,
{
    Arc::new(f)
}

static BUILTIN: Lazy<HashMap<String, FilterFn>> = Lazy::new(|| {
    let mut map: HashMap<String, FilterFn> = HashMap::new();
    map.insert("parseSize".into(), builtin(|v, _| number::parse_size_value(&v)));
    map.insert("parseNumber".into(), builtin(|v, _| number::parse_number_value(&v)));
    map.insert("parseTTL".into(), builtin(|v, _| time::parse_ttl_value(&v)));
    map.insert("parseTime".into(), builtin(time::parse_time_value));
    map.insert("querystring".into(), builtin(text::querystring_value));
    map.insert("append".into(), builtin(text::append));
    map.insert("prepend".into(), builtin(text::prepend));
    map.insert("replace".into(), builtin(text::replace));
    map.insert("urlEncode".into(), builtin(text::url_encode));
    map.insert("urlDecode".into(), builtin(text::url_decode));
    map.insert("split".into(), builtin(text::split));
    map.insert("trim".into(), builtin(text::trim));
    map.insert("regex".into(), builtin(text::regex_capture));
    map.insert("toLowerCase".into(), builtin(|v, _| text::map_str(v, |s| s.to_lowercase())));
    map.insert("toUpperCase".into(), builtin(|v, _| text::map_str(v, |s| s.to_uppercase())));
    map
});

/// Table of named filters.
///
/// Starts with the built-ins; sites and schemas may register more under
/// their own names without affecting other sites.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    extra: HashMap<String, FilterFn>,
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.extra.keys().collect();
        names.sort();
        f.debug_struct("FilterRegistry")
            .field("extra", &names)
            .finish()
    }
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or shadow a built-in with) a named filter.
    pub fn register<F>(&mut self, name: impl Into<String>, filter: F)
    where
        F: Fn(Value, &[Value]) -> Value + Send + Sync + 'static,
    {
        self.extra.insert(name.into(), Arc::new(filter));
    }

    pub fn insert(&mut self, name: impl Into<String>, filter: FilterFn) {
        self.extra.insert(name.into(), filter);
    }

    /// Take over every named filter of `other`, replacing same-named ones.
    pub fn extend(&mut self, other: FilterRegistry) {
        self.extra.extend(other.extra);
    }

    pub fn get(&self, name: &str) -> Option<&FilterFn> {
        self.extra.get(name).or_else(|| BUILTIN.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Run `value` through `pipeline` in declared order.
    ///
    /// Unknown filter names are logged and skipped.
    pub fn apply(&self, value: Value, pipeline: &[Filter]) -> Value {
        pipeline.iter().fold(value, |acc, filter| match self.get(&filter.name) {
            Some(f) => f(acc, filter.args.as_slice()),
            None => {
                warn!(filter = %filter.name, "Unknown filter, value passed through");
                acc
            }
        })
    }
}

/// Render a scalar JSON value as the string a filter operates on.
pub(crate) fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Build a JSON number, preferring an integer representation.
pub(crate) fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or_else(|| Value::from(0))
    }
}
