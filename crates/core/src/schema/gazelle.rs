use serde_json::{json, Value};

use super::support::{size_after, text_after, time_after, utc};
use super::{PrivateSchema, Schema};
use crate::field::Source;
use crate::metadata::merge_layers;
use crate::site::SiteHooks;

/// Gazelle (What.CD lineage) sites scraped through their HTML pages.
///
/// Search results are release groups; each group header row is followed
/// by one row per torrent variant.
pub struct GazelleSchema;

/// Group id carried by a variant row as a `groupid_<n>` class.
fn variant_group_id(source: Source<'_>) -> Value {
    source
        .as_element()
        .and_then(|row| {
            row.value()
                .classes()
                .find_map(|class| class.strip_prefix("groupid_"))
                .map(|id| Value::String(id.to_string()))
        })
        .unwrap_or(Value::Null)
}

impl GazelleSchema {
    pub(crate) fn layer() -> Value {
        json!({
            "schema": "gazelle",
            "search": {
                "keywordPath": "params.searchstr",
                "requestConfig": {
                    "url": "/torrents.php",
                    "responseType": "document",
                    "params": { "searchsubmit": 1 }
                },
                "selectors": {
                    "rows": {
                        "selector": [
                            "table#torrent_table > tbody > tr:not(.colhead)",
                            "table.torrent_table > tbody > tr:not(.colhead)"
                        ],
                        "group": {
                            "groupClass": "group",
                            "childClass": "group_torrent",
                            "skipClass": "edition",
                            "groupId": {
                                "selector": "a[href*='torrents.php?id=']",
                                "attr": "href",
                                "filters": [{ "name": "querystring", "args": ["id"] }]
                            },
                            "childGroupId": {
                                "selector": ":self",
                                "elementProcess": "gazelleGroupId"
                            },
                            "inherit": ["title", "category", "time"],
                            "selectors": {
                                "title": { "selector": "a[href*='torrents.php?id=']:not([href*='torrentid'])" },
                                "category": { "selector": "td.cats_col div[title]", "attr": "title" }
                            }
                        }
                    },
                    "id": {
                        "selector": ["a[href*='torrentid=']", "a[href*='action=download']"],
                        "attr": "href",
                        "filters": [{ "name": "querystring", "args": ["torrentid", "id"] }]
                    },
                    "title": { "selector": "a[href*='torrents.php?id=']" },
                    "subTitle": { "selector": "a[href*='torrentid=']" },
                    "url": { "selector": "a[href*='torrentid=']", "attr": "href" },
                    "link": { "selector": "a[href*='action=download']", "attr": "href" },
                    "time": { "selector": "span.time[title]", "attr": "title" },
                    "size": { "selector": "td:nth-last-child(4)" },
                    "completed": { "selector": "td:nth-last-child(3)", "filters": ["parseNumber"] },
                    "seeders": { "selector": "td:nth-last-child(2)", "filters": ["parseNumber"] },
                    "leechers": { "selector": "td:nth-last-child(1)", "filters": ["parseNumber"] }
                }
            },
            "userInfo": {
                "process": [
                    {
                        "requestConfig": { "url": "/index.php", "responseType": "document" },
                        "fields": ["id", "name"]
                    },
                    {
                        "requestConfig": {
                            "url": "/user.php",
                            "params": { "id": "$id$" },
                            "responseType": "document"
                        },
                        "assertion": { "id": "params.id" },
                        "fields": [
                            "uploaded", "downloaded", "levelName", "joinTime",
                            "uploads", "snatches", "seeding", "leeching"
                        ]
                    }
                ],
                "selectors": {
                    "id": {
                        "selector": ["#nav_userinfo a.username", "a.username"],
                        "attr": "href",
                        "filters": [{ "name": "querystring", "args": ["id"] }]
                    },
                    "name": { "selector": ["#nav_userinfo a.username", "a.username"] },
                    "uploads": { "selector": "#comm_upload", "filters": ["parseNumber"] },
                    "snatches": { "selector": "#comm_snatched", "filters": ["parseNumber"] },
                    "seeding": { "selector": "#comm_seeding", "filters": ["parseNumber"] },
                    "leeching": { "selector": "#comm_leeching", "filters": ["parseNumber"] }
                }
            }
        })
    }
}

impl Schema for GazelleSchema {
    fn name(&self) -> &'static str {
        "gazelle"
    }

    fn defaults(&self) -> Value {
        merge_layers(PrivateSchema.defaults(), &[&Self::layer()])
    }

    fn hooks(&self) -> SiteHooks {
        SiteHooks::new()
            .element_processor("gazelleGroupId", variant_group_id)
            .user_info_field("uploaded", |_, source| size_after(source, &["Uploaded"]))
            .user_info_field("downloaded", |_, source| size_after(source, &["Downloaded"]))
            .user_info_field("levelName", |_, source| text_after(source, &["Class"]))
            .user_info_field("joinTime", |_, source| time_after(source, &["Joined"], utc()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse_selector;
    use scraper::Html;

    #[test]
    fn test_variant_group_id_from_class() {
        let doc = Html::parse_document(
            r#"<table><tr id="v" class="group_torrent groupid_123 edition_1"><td>x</td></tr></table>"#,
        );
        let row = doc
            .select(&parse_selector("#v").unwrap())
            .next()
            .unwrap();
        assert_eq!(variant_group_id(Source::Element(row)), json!("123"));
    }

    #[test]
    fn test_defaults_build_on_private() {
        let defaults = GazelleSchema.defaults();
        assert_eq!(defaults["type"], "private");
        assert_eq!(defaults["search"]["keywordPath"], "params.searchstr");
        assert_eq!(defaults["userInfo"]["process"].as_array().unwrap().len(), 2);
    }
}
