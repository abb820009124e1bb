use chrono::FixedOffset;
use serde_json::{json, Value};

use super::support::{labelled, number_after, size_after, time_after};
use super::{PrivateSchema, Schema};
use crate::field::Source;
use crate::filters::{parse_offset, parse_ttl};
use crate::html::{element_text, parse_selector};
use crate::metadata::merge_layers;
use crate::site::SiteHooks;

const TIMEZONE: &str = "+0800";

const UPLOADED: &[&str] = &["上传量", "上傳量", "Uploaded"];
const DOWNLOADED: &[&str] = &["下载量", "下載量", "Downloaded"];
const BONUS: &[&str] = &["魔力值", "魔力", "Bonus", "Karma"];
const SEEDING: &[&str] = &["当前做种", "當前做種", "Seeding"];
const LEVEL: &[&str] = &["等级", "等級", "Class"];
const JOINED: &[&str] = &["加入日期", "Join date"];

/// The NexusPHP tracker software.
pub struct NexusPhpSchema;

fn offset() -> FixedOffset {
    parse_offset(TIMEZONE).unwrap_or_else(super::support::utc)
}

/// Time cell of a torrent row: the absolute time lives in a `title`,
/// the visible text is an age.
fn row_time(source: Source<'_>) -> Value {
    let Some(cell) = source.as_element() else {
        return Value::Null;
    };
    let titled = parse_selector("span[title]")
        .and_then(|css| cell.select(&css).next())
        .and_then(|span| span.value().attr("title"));
    match titled {
        Some(title) => Value::String(title.trim().to_string()),
        None => {
            let text = element_text(cell);
            let text = text.trim();
            if text.is_empty() {
                Value::Null
            } else {
                Value::from(parse_ttl(text))
            }
        }
    }
}

/// Second line of the name cell, below the title link.
fn sub_title(source: Source<'_>) -> Value {
    let (Some(table), Some(cells), Some(link)) = (
        source.as_element(),
        parse_selector("td.embedded"),
        parse_selector("a[href*='details.php?id=']"),
    ) else {
        return Value::Null;
    };
    let Some(cell) = table
        .select(&cells)
        .find(|td| td.select(&link).next().is_some())
    else {
        return Value::Null;
    };
    let title = cell.select(&link).next().map(element_text).unwrap_or_default();
    let text = element_text(cell);
    let rest = text.replacen(title.as_str(), "", 1);
    let rest = rest.split_whitespace().collect::<Vec<_>>().join(" ");
    Value::String(rest)
}

/// Class name of the account: the icon's `alt`/`title`, or the text.
fn level_name(source: Source<'_>) -> Value {
    let Some(row) = labelled(source, LEVEL) else {
        return Value::Null;
    };
    let icon = parse_selector("img")
        .and_then(|css| row.select(&css).next())
        .and_then(|img| img.value().attr("title").or_else(|| img.value().attr("alt")));
    if let Some(name) = icon {
        return Value::String(name.trim().to_string());
    }
    super::support::text_after(source, LEVEL)
}

/// Rows of the torrent table that are not the header.
fn is_torrent_row(source: Source<'_>) -> bool {
    let Some(row) = source.as_element() else {
        return true;
    };
    parse_selector("td.colhead")
        .map(|css| row.select(&css).next().is_none())
        .unwrap_or(true)
}

impl Schema for NexusPhpSchema {
    fn name(&self) -> &'static str {
        "nexusphp"
    }

    fn defaults(&self) -> Value {
        let layer = json!({
            "schema": "nexusphp",
            "search": {
                "keywordPath": "params.search",
                "requestConfig": {
                    "url": "/torrents.php",
                    "params": { "notnewword": 1 }
                },
                "advanceKeywordParams": {
                    "imdb": {
                        "requestConfig": { "params": { "search_area": 4 } }
                    }
                },
                "selectors": {
                    "rows": {
                        "selector": "table.torrents > tbody > tr",
                        "filter": "nexusphpTorrentRow",
                        "columns": {
                            "header": "table.torrents > tbody > tr:first-child",
                            "markers": {
                                "comments": ["sort=3"],
                                "time": ["sort=4"],
                                "size": ["sort=5"],
                                "seeders": ["sort=7"],
                                "leechers": ["sort=8"],
                                "completed": ["sort=6"]
                            }
                        }
                    },
                    "id": {
                        "selector": "a[href*='details.php?id=']",
                        "attr": "href",
                        "filters": [{ "name": "querystring", "args": ["id"] }]
                    },
                    "title": {
                        "selector": [
                            "table.torrentname a[href*='details.php?id='] b",
                            "a[href*='details.php?id=']"
                        ]
                    },
                    "subTitle": {
                        "selector": "table.torrentname",
                        "elementProcess": "nexusphpSubTitle"
                    },
                    "url": { "selector": "a[href*='details.php?id=']", "attr": "href" },
                    "link": { "selector": "a[href*='download.php?id=']", "attr": "href" },
                    "category": {
                        "selector": ["a[href*='cat='] img", "img[class^='c_']"],
                        "attr": "alt"
                    },
                    "time": { "elementProcess": "nexusphpTime" }
                }
            },
            "userInfo": {
                "process": [
                    {
                        "requestConfig": { "url": "/index.php", "responseType": "document" },
                        "fields": ["id", "name", "messageCount"]
                    },
                    {
                        "requestConfig": {
                            "url": "/userdetails.php",
                            "params": { "id": "$id$" },
                            "responseType": "document"
                        },
                        "assertion": { "id": "params.id" },
                        "fields": ["uploaded", "downloaded", "levelName", "bonus", "joinTime", "seeding"]
                    }
                ],
                "selectors": {
                    "id": {
                        "selector": ["#info_block a[href*='userdetails.php']", "a[href*='userdetails.php']"],
                        "attr": "href",
                        "filters": [{ "name": "querystring", "args": ["id"] }]
                    },
                    "name": {
                        "selector": ["#info_block a[href*='userdetails.php']", "a[href*='userdetails.php']"]
                    },
                    "messageCount": {
                        "selector": "a[href*='messages.php'] font[color='red'], a[href*='messages.php'] b",
                        "filters": ["parseNumber"]
                    }
                }
            }
        });
        merge_layers(PrivateSchema.defaults(), &[&layer])
    }

    fn hooks(&self) -> SiteHooks {
        let offset = offset();
        SiteHooks::new()
            .element_processor("nexusphpTime", row_time)
            .element_processor("nexusphpSubTitle", sub_title)
            .row_filter("nexusphpTorrentRow", is_torrent_row)
            .user_info_field("uploaded", |_, source| size_after(source, UPLOADED))
            .user_info_field("downloaded", |_, source| size_after(source, DOWNLOADED))
            .user_info_field("bonus", |_, source| number_after(source, BONUS))
            .user_info_field("seeding", |_, source| number_after(source, SEEDING))
            .user_info_field("levelName", |_, source| level_name(source))
            .user_info_field("joinTime", move |_, source| time_after(source, JOINED, offset))
    }

    fn default_timezone(&self) -> Option<&'static str> {
        Some(TIMEZONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_row_time_prefers_title() {
        let doc = Html::parse_document(
            r#"<table><tr><td id="t"><span title="2024-03-01 12:00:00">1天</span></td></tr></table>"#,
        );
        let cell = doc
            .select(&parse_selector("#t").unwrap())
            .next()
            .unwrap();
        assert_eq!(row_time(Source::Element(cell)), json!("2024-03-01 12:00:00"));
    }

    #[test]
    fn test_sub_title_strips_title_link() {
        let doc = Html::parse_document(
            r#"<table class="torrentname" id="c"><tr>
                 <td class="embedded"><img src="thumb.jpg"/></td>
                 <td class="embedded">
                   <a href="details.php?id=1"><b>Movie 2024</b></a><br/>Director's cut
                 </td></tr></table>"#,
        );
        let cell = doc
            .select(&parse_selector("#c").unwrap())
            .next()
            .unwrap();
        assert_eq!(sub_title(Source::Element(cell)), json!("Director's cut"));
    }

    #[test]
    fn test_header_row_is_filtered() {
        let doc = Html::parse_document(
            r#"<table><tr id="h"><td class="colhead">Name</td></tr><tr id="r"><td>x</td></tr></table>"#,
        );
        let pick = |id: &str| {
            doc.select(&parse_selector(id).unwrap())
                .next()
                .unwrap()
        };
        assert!(!is_torrent_row(Source::Element(pick("#h"))));
        assert!(is_torrent_row(Source::Element(pick("#r"))));
    }

    #[test]
    fn test_level_name_from_icon() {
        let doc = Html::parse_document(
            r#"<table><tr><td class="rowhead">等级</td>
               <td><img src="pic/power.gif" alt="Power User" title="Power User"/></td></tr></table>"#,
        );
        let root = Source::Element(doc.root_element());
        assert_eq!(level_name(root), json!("Power User"));
    }
}
