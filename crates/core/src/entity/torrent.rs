use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::convert::{as_epoch_millis, as_f64, as_i64, as_string, as_u64};

/// Prefix of external-id fields (`ext_imdb`, `ext_douban`, ...).
pub const EXT_PREFIX: &str = "ext_";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TorrentStatus {
    #[default]
    Unknown,
    Downloading,
    Seeding,
    Inactive,
    Completed,
}

impl TorrentStatus {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(1) => TorrentStatus::Downloading,
                Some(2) => TorrentStatus::Seeding,
                Some(3) => TorrentStatus::Inactive,
                Some(4) => TorrentStatus::Completed,
                _ => TorrentStatus::Unknown,
            },
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "downloading" | "leeching" => TorrentStatus::Downloading,
                "seeding" => TorrentStatus::Seeding,
                "inactive" | "stopped" => TorrentStatus::Inactive,
                "completed" | "snatched" => TorrentStatus::Completed,
                _ => TorrentStatus::Unknown,
            },
            _ => TorrentStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentTag {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// One normalized search result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Torrent {
    pub site: String,
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_title: Option<String>,
    /// Details page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Direct download (or magnet) link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    /// Bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seeders: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leechers: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TorrentTag>,
    #[serde(default)]
    pub status: TorrentStatus,
    /// 0-100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(flatten)]
    pub ext: BTreeMap<String, Value>,
}

impl Torrent {
    /// Build a record from resolved field values. Unknown keys other than
    /// `ext_*` are dropped.
    pub fn from_fields(site: &str, fields: &Map<String, Value>) -> Self {
        let get = |key: &str| fields.get(key).unwrap_or(&Value::Null);

        Self {
            site: site.to_string(),
            id: as_string(get("id")).unwrap_or_default(),
            title: as_string(get("title")).unwrap_or_default(),
            sub_title: as_string(get("subTitle")),
            url: as_string(get("url")),
            link: as_string(get("link")),
            time: as_epoch_millis(get("time")),
            size: as_u64(get("size")),
            seeders: as_i64(get("seeders")),
            leechers: as_i64(get("leechers")),
            completed: as_i64(get("completed")),
            comments: as_i64(get("comments")),
            category: as_string(get("category")),
            tags: tags_from(get("tags")),
            status: TorrentStatus::from_value(get("status")),
            progress: as_f64(get("progress")).map(|p| p.clamp(0.0, 100.0)),
            author: as_string(get("author")),
            ext: fields
                .iter()
                .filter(|(key, value)| key.starts_with(EXT_PREFIX) && !value.is_null())
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }
}

fn tags_from(value: &Value) -> Vec<TorrentTag> {
    let tag = |item: &Value| match item {
        Value::Object(obj) => obj.get("name").and_then(as_string).map(|name| TorrentTag {
            name,
            color: obj.get("color").and_then(as_string),
        }),
        other => as_string(other).map(|name| TorrentTag { name, color: None }),
    };

    match value {
        Value::Array(items) => items.iter().filter_map(tag).collect(),
        Value::Null => Vec::new(),
        other => tag(other).into_iter().collect(),
    }
}
