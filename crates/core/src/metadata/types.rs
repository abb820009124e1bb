//! The declarative site description consumed by the engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::field::{one_or_many, FieldSelector};

/// Everything the engine needs to know about one site.
///
/// Built once per activation by merging schema defaults, the site
/// definition and user overrides; treated as immutable afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteMetadata {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default, rename = "type")]
    pub site_type: SiteType,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub legacy_urls: Vec<String>,
    /// Fixed UTC offset of the times the site displays, e.g. `+0800`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone_offset: Option<String>,
    #[serde(default)]
    pub is_offline: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_search: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_query_user_info: Option<bool>,
    /// Also flag short login-form pages as logged out.
    #[serde(default)]
    pub strict_login_check: bool,
    /// User-provided credentials/keys (api keys, passkeys, usernames).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub user_input: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<CategoryDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchEntry>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub search_entry: BTreeMap<String, SearchEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<UserInfoConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<DetailConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub list: Vec<ListConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub level_requirements: Vec<LevelRequirement>,
}

fn default_schema() -> String {
    "common".to_string()
}

impl SiteMetadata {
    pub fn allow_search(&self) -> bool {
        !self.is_offline && self.allow_search.unwrap_or(false)
    }

    pub fn allow_query_user_info(&self) -> bool {
        !self.is_offline && self.allow_query_user_info.unwrap_or(false)
    }

    /// The URL requests are sent to.
    pub fn base_url(&self) -> Option<&str> {
        self.urls.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteType {
    #[default]
    Private,
    Public,
}

/// A search filter the site exposes (category, resolution, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDef {
    pub name: String,
    pub key: String,
    #[serde(default)]
    pub options: Vec<CategoryOption>,
    /// Several options may be selected at once.
    #[serde(default)]
    pub cross: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryOption {
    pub name: String,
    pub value: Value,
}

/// One addressable search variant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Partial request config merged over the seed request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_config: Option<Value>,
    /// Name of a registered request transformer run last.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_config_transformer: Option<String>,
    /// Where keywords are injected (default `params.keywords`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword_path: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub advance_keyword_params: BTreeMap<String, AdvanceKeywordConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectors: Option<SearchSelectors>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<CategoryDef>,
}

impl SearchEntry {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn keyword_path(&self) -> &str {
        self.keyword_path.as_deref().unwrap_or("params.keywords")
    }
}

/// Handling of a prefixed query such as `imdb|tt0111161`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdvanceKeywordConfig {
    /// `false` disables the prefix on this site; `true` keeps defaults.
    Flag(bool),
    Config(AdvanceKeywordEntry),
}

impl AdvanceKeywordConfig {
    pub fn is_enabled(&self) -> bool {
        match self {
            AdvanceKeywordConfig::Flag(enabled) => *enabled,
            AdvanceKeywordConfig::Config(entry) => entry.enabled.unwrap_or(true),
        }
    }

    pub fn entry(&self) -> Option<&AdvanceKeywordEntry> {
        match self {
            AdvanceKeywordConfig::Config(entry) => Some(entry),
            AdvanceKeywordConfig::Flag(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceKeywordEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_config: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_config_transformer: Option<String>,
    /// Move the injected keywords to this path instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword_path: Option<String>,
}

/// Row locator plus per-field selectors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSelectors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<RowsSelector>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldSelector>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowsSelector {
    #[serde(default, deserialize_with = "one_or_many")]
    pub selector: Vec<String>,
    /// Name of a registered row filter applied after matching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Number of consecutive physical rows forming one record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<ColumnDetect>,
}

/// Group/variant layout: one header row followed by its torrents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupConfig {
    /// Class marking a group header row (HTML).
    #[serde(default = "default_group_class")]
    pub group_class: String,
    /// Class marking a variant row (HTML).
    #[serde(default = "default_child_class")]
    pub child_class: String,
    /// Class of rows to drop entirely (edition separators).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_class: Option<String>,
    /// Reads the group id from a header row.
    #[serde(default)]
    pub group_id: FieldSelector,
    /// Reads the owning group id from a variant row.
    #[serde(default)]
    pub child_group_id: FieldSelector,
    /// JSON layout: path of the variants array inside a group object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children_path: Option<String>,
    /// Fields every variant takes from its group.
    #[serde(default = "default_inherit")]
    pub inherit: Vec<String>,
    /// Pad variant rows shortened by the header's `rowspan` cells.
    #[serde(default = "default_true")]
    pub compensate_span: bool,
    /// Selectors used on the header row instead of the entry selectors.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub selectors: BTreeMap<String, FieldSelector>,
}

fn default_group_class() -> String {
    "group".to_string()
}

fn default_child_class() -> String {
    "group_torrent".to_string()
}

fn default_inherit() -> Vec<String> {
    vec!["title".to_string(), "category".to_string()]
}

/// Infer column positions from header-row markers (e.g. sort links).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDetect {
    #[serde(default, deserialize_with = "one_or_many")]
    pub header: Vec<String>,
    /// field -> substrings looked for in the header cell markup.
    #[serde(default)]
    pub markers: BTreeMap<String, Vec<String>>,
}

/// Multi-step account data collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfoConfig {
    /// Fields carried over from the previous record.
    #[serde(default)]
    pub pick_last: Vec<String>,
    #[serde(default)]
    pub process: Vec<ProcessStep>,
    #[serde(default)]
    pub selectors: BTreeMap<String, FieldSelector>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStep {
    #[serde(default)]
    pub request_config: Value,
    #[serde(default)]
    pub fields: Vec<String>,
    /// field -> path in the request config that receives its value.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub assertion: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectors: Option<BTreeMap<String, FieldSelector>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_config_transformer: Option<String>,
}

/// Detail page used when a list view omits the direct download link.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_config: Option<Value>,
    #[serde(default)]
    pub selectors: BTreeMap<String, FieldSelector>,
}

/// Non-search list pages (e.g. bookmarks) that render torrent rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListConfig {
    /// Regexes matched against the page URL.
    #[serde(default, deserialize_with = "one_or_many")]
    pub url_pattern: Vec<String>,
    #[serde(default = "default_true")]
    pub merge_search_selectors: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectors: Option<SearchSelectors>,
}

fn default_true() -> bool {
    true
}

/// What an account needs to reach a class/level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelRequirement {
    pub id: u32,
    pub name: String,
    /// Minimum account age in weeks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloaded: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploads: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privilege: Option<String>,
}
