//! Evaluating level requirements against a user record.

use chrono::{DateTime, Duration, Utc};

use super::UserInfo;
use crate::filters::parse_size;
use crate::metadata::LevelRequirement;

impl LevelRequirement {
    /// Whether `user` satisfies every declared condition at `now`.
    ///
    /// Conditions the user record cannot answer count as unmet.
    pub fn is_met_at(&self, user: &UserInfo, now: DateTime<Utc>) -> bool {
        if let Some(weeks) = self.interval {
            let Some(joined) = user.join_time else {
                return false;
            };
            let required = now - Duration::weeks(weeks as i64);
            if joined > required.timestamp_millis() {
                return false;
            }
        }
        if let Some(uploaded) = &self.uploaded {
            if (user.uploaded.unwrap_or(0) as f64) < parse_size(uploaded) {
                return false;
            }
        }
        if let Some(downloaded) = &self.downloaded {
            if (user.downloaded.unwrap_or(0) as f64) < parse_size(downloaded) {
                return false;
            }
        }
        if let Some(ratio) = self.ratio {
            match user.ratio {
                Some(r) if r < 0.0 || r >= ratio => {}
                _ => return false,
            }
        }
        if let Some(bonus) = self.bonus {
            if user.bonus.unwrap_or(0.0) < bonus {
                return false;
            }
        }
        if let Some(uploads) = self.uploads {
            if user.uploads.unwrap_or(0) < uploads {
                return false;
            }
        }
        true
    }

    pub fn is_met(&self, user: &UserInfo) -> bool {
        self.is_met_at(user, Utc::now())
    }
}

/// The first level (by id) above the user's current one that is not met yet.
pub fn next_level<'a>(
    requirements: &'a [LevelRequirement],
    user: &UserInfo,
) -> Option<&'a LevelRequirement> {
    let current = user.level_id.unwrap_or(i64::MIN);
    let mut sorted: Vec<&LevelRequirement> = requirements.iter().collect();
    sorted.sort_by_key(|req| req.id);
    sorted
        .into_iter()
        .filter(|req| i64::from(req.id) > current)
        .find(|req| !req.is_met(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::UserInfoStatus;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn user() -> UserInfo {
        UserInfo {
            uploaded: Some(200 * 1024 * 1024 * 1024),
            downloaded: Some(100 * 1024 * 1024 * 1024),
            ratio: Some(2.0),
            join_time: Some((now() - Duration::weeks(10)).timestamp_millis()),
            level_id: Some(1),
            ..UserInfo::with_status("demo", UserInfoStatus::Success)
        }
    }

    fn level(id: u32, interval: u32, uploaded: &str, ratio: f64) -> LevelRequirement {
        LevelRequirement {
            id,
            name: format!("L{}", id),
            interval: Some(interval),
            uploaded: Some(uploaded.to_string()),
            ratio: Some(ratio),
            ..Default::default()
        }
    }

    #[test]
    fn test_is_met_checks_every_condition() {
        assert!(level(2, 4, "50 GiB", 1.05).is_met_at(&user(), now()));
        assert!(!level(3, 20, "50 GiB", 1.05).is_met_at(&user(), now()));
        assert!(!level(3, 4, "1 TiB", 1.05).is_met_at(&user(), now()));
        assert!(!level(3, 4, "50 GiB", 3.0).is_met_at(&user(), now()));
    }

    #[test]
    fn test_infinite_ratio_meets_any_ratio() {
        let mut user = user();
        user.ratio = Some(-1.0);
        assert!(level(2, 4, "1 GiB", 10.0).is_met_at(&user, now()));
    }

    #[test]
    fn test_next_level_skips_current_and_met() {
        let requirements = vec![
            level(3, 1000, "1 GiB", 1.0),
            level(1, 1, "1 GiB", 1.0),
            level(2, 1, "1 GiB", 1.0),
        ];
        let next = next_level(&requirements, &user()).unwrap();
        assert_eq!(next.id, 3);
    }
}
