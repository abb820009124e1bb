use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::convert::{as_epoch_millis, as_f64, as_i64, as_string, as_u64};

/// Outcome of a user-info collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserInfoStatus {
    Success,
    NeedLogin,
    ParseError,
    PassParse,
    NoResults,
    #[default]
    UnknownError,
}

/// Keys of every typed [`UserInfo`] field, in camelCase.
pub const USER_INFO_FIELDS: &[&str] = &[
    "id",
    "name",
    "uploaded",
    "downloaded",
    "trueUploaded",
    "trueDownloaded",
    "ratio",
    "trueRatio",
    "levelName",
    "levelId",
    "bonus",
    "bonusPerHour",
    "seedingBonus",
    "seedingBonusPerHour",
    "uploads",
    "snatches",
    "seeding",
    "seedingSize",
    "leeching",
    "joinTime",
    "lastAccessAt",
    "messageCount",
    "invites",
    "hnrUnsatisfied",
    "hnrPreWarning",
];

/// Normalized account record for one site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub site: String,
    #[serde(default)]
    pub status: UserInfoStatus,
    /// Epoch milliseconds of the collection.
    #[serde(default)]
    pub update_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloaded: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_uploaded: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_downloaded: Option<u64>,
    /// `-1` means infinite (nothing downloaded yet).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_per_hour: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seeding_bonus: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seeding_bonus_per_hour: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploads: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snatches: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seeding: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seeding_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leeching: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_access_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invites: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hnr_unsatisfied: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hnr_pre_warning: Option<u64>,
}

impl UserInfo {
    /// A typed record carrying only a status, stamped now.
    pub fn with_status(site: &str, status: UserInfoStatus) -> Self {
        Self {
            site: site.to_string(),
            status,
            update_at: Utc::now().timestamp_millis(),
            ..Default::default()
        }
    }

    pub fn from_fields(site: &str, status: UserInfoStatus, fields: &Map<String, Value>) -> Self {
        let get = |key: &str| fields.get(key).unwrap_or(&Value::Null);

        let mut info = Self {
            id: as_string(get("id")),
            name: as_string(get("name")),
            uploaded: as_u64(get("uploaded")),
            downloaded: as_u64(get("downloaded")),
            true_uploaded: as_u64(get("trueUploaded")),
            true_downloaded: as_u64(get("trueDownloaded")),
            ratio: as_f64(get("ratio")),
            true_ratio: as_f64(get("trueRatio")),
            level_name: as_string(get("levelName")),
            level_id: as_i64(get("levelId")),
            bonus: as_f64(get("bonus")),
            bonus_per_hour: as_f64(get("bonusPerHour")),
            seeding_bonus: as_f64(get("seedingBonus")),
            seeding_bonus_per_hour: as_f64(get("seedingBonusPerHour")),
            uploads: as_u64(get("uploads")),
            snatches: as_u64(get("snatches")),
            seeding: as_u64(get("seeding")),
            seeding_size: as_u64(get("seedingSize")),
            leeching: as_u64(get("leeching")),
            join_time: as_epoch_millis(get("joinTime")),
            last_access_at: as_epoch_millis(get("lastAccessAt")),
            message_count: as_u64(get("messageCount")),
            invites: as_u64(get("invites")),
            hnr_unsatisfied: as_u64(get("hnrUnsatisfied")),
            hnr_pre_warning: as_u64(get("hnrPreWarning")),
            ..Self::with_status(site, status)
        };
        info.fill_ratios();
        info
    }

    /// Typed fields as a camelCase object, for seeding the next collection.
    pub fn to_fields(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => {
                map.retain(|key, _| USER_INFO_FIELDS.contains(&key.as_str()));
                map
            }
            _ => Map::new(),
        }
    }

    fn fill_ratios(&mut self) {
        if self.ratio.is_none() {
            self.ratio = ratio_of(self.uploaded, self.downloaded);
        }
        if self.true_ratio.is_none() {
            self.true_ratio = ratio_of(self.true_uploaded, self.true_downloaded);
        }
    }
}

fn ratio_of(uploaded: Option<u64>, downloaded: Option<u64>) -> Option<f64> {
    match (uploaded?, downloaded?) {
        (0, 0) => Some(0.0),
        (_, 0) => Some(-1.0),
        (up, down) => Some(((up as f64 / down as f64) * 1000.0).round() / 1000.0),
    }
}
