//! Normalized records handed back to callers.

mod convert;
mod level;
mod torrent;
mod user_info;

pub use convert::{as_epoch_millis, as_f64, as_i64, as_string, as_u64};
pub use level::next_level;
pub use torrent::{Torrent, TorrentStatus, TorrentTag, EXT_PREFIX};
pub use user_info::{UserInfo, UserInfoStatus, USER_INFO_FIELDS};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchStatus {
    Success,
    NeedLogin,
    NoResults,
    ParseError,
    PassParse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub status: SearchStatus,
    pub data: Vec<Torrent>,
}

impl SearchResult {
    pub fn success(data: Vec<Torrent>) -> Self {
        Self {
            status: SearchStatus::Success,
            data,
        }
    }

    pub fn empty(status: SearchStatus) -> Self {
        Self {
            status,
            data: Vec::new(),
        }
    }
}
