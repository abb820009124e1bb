//! User info, download link and list page integration tests.
//!
//! These verify the non-search operations of a site against the mock
//! transport, plus activation of definitions read from disk.

use serde_json::{json, Value};
use std::sync::Arc;

use trackhub_core::{
    config::SiteConfig,
    site::SiteHooks,
    testing::{fixtures, MockTransport},
    SiteError, SiteRegistry, Torrent, UserInfoStatus,
};

const GIB: u64 = 1024 * 1024 * 1024;

fn user_info_definition() -> Value {
    json!({
        "id": "demo",
        "urls": [fixtures::BASE_URL],
        "userInfo": {
            "pickLast": ["id", "name"],
            "process": [
                {
                    "requestConfig": { "url": "/index.php" },
                    "fields": ["id", "name"]
                },
                {
                    "requestConfig": { "url": "/userdetails.php", "params": { "id": "$id$" } },
                    "assertion": { "id": "params.id" },
                    "fields": ["uploaded", "downloaded", "seeding"]
                }
            ],
            "selectors": {
                "id": { "selector": "a.user", "attr": "href", "filters": [{ "name": "querystring", "args": ["id"] }] },
                "name": { "selector": "a.user" },
                "uploaded": { "selector": "td.uploaded", "filters": ["parseSize"] },
                "downloaded": { "selector": "td.downloaded", "filters": ["parseSize"] },
                "seeding": { "selector": "td.seeding" }
            }
        }
    })
}

fn index_page() -> String {
    fixtures::page(r#"<div id="info"><a class="user" href="userdetails.php?id=4242">alice</a></div>"#)
}

fn details_page() -> String {
    fixtures::page(
        r#"<table>
             <tr><td>Uploaded</td><td class="uploaded">3 GB</td></tr>
             <tr><td>Downloaded</td><td class="downloaded">1 GB</td></tr>
             <tr><td>Seeding</td><td class="seeding">17</td></tr>
           </table>"#,
    )
}

#[tokio::test]
async fn test_user_info_threads_id_between_steps() {
    let transport = Arc::new(
        MockTransport::new()
            .route("/index.php", index_page())
            .route("/userdetails.php", details_page()),
    );
    let site = fixtures::site(&user_info_definition(), transport.clone());

    let info = site.get_user_info(None).await.unwrap();

    assert_eq!(info.status, UserInfoStatus::Success);
    assert_eq!(info.site, "demo");
    assert_eq!(info.id.as_deref(), Some("4242"));
    assert_eq!(info.name.as_deref(), Some("alice"));
    assert_eq!(info.uploaded, Some(3 * GIB));
    assert_eq!(info.downloaded, Some(GIB));
    assert_eq!(info.ratio, Some(3.0));
    assert_eq!(info.seeding, Some(17));

    let requests = transport.requests().await;
    assert_eq!(requests.len(), 2);
    assert!(requests[1].url.contains("userdetails.php?id=4242"));
}

#[tokio::test]
async fn test_user_info_pick_last_skips_satisfied_step() {
    let transport = Arc::new(MockTransport::new().route("/userdetails.php", details_page()));
    let site = fixtures::site(&user_info_definition(), transport.clone());

    let mut previous = trackhub_core::UserInfo::with_status("demo", UserInfoStatus::Success);
    previous.id = Some("77".into());
    previous.name = Some("bob".into());

    let info = site.get_user_info(Some(&previous)).await.unwrap();

    assert_eq!(info.status, UserInfoStatus::Success);
    assert_eq!(info.id.as_deref(), Some("77"));
    assert_eq!(info.name.as_deref(), Some("bob"));
    assert_eq!(transport.requests_to("/index.php").await, 0);
    assert_eq!(transport.requests_to("userdetails.php?id=77").await, 1);
}

#[tokio::test]
async fn test_user_info_missing_assertion_is_error() {
    let transport = Arc::new(
        MockTransport::new()
            .route("/index.php", fixtures::page("<p>no user link here</p>"))
            .route("/userdetails.php", details_page()),
    );
    let site = fixtures::site(&user_info_definition(), transport.clone());

    let err = site.get_user_info(None).await.unwrap_err();
    assert_eq!(err.step, 1);
    assert_eq!(err.field, "id");
    assert_eq!(transport.requests_to("/userdetails.php").await, 0);
}

#[tokio::test]
async fn test_user_info_logged_out_keeps_partial_record() {
    let transport = Arc::new(
        MockTransport::new()
            .route("/index.php", index_page())
            .with_response(
                "/userdetails.php",
                fixtures::redirected("https://tracker.example/login.php", fixtures::login_form()),
            ),
    );
    let site = fixtures::site(&user_info_definition(), transport);

    let info = site.get_user_info(None).await.unwrap();
    assert_eq!(info.status, UserInfoStatus::NeedLogin);
    assert_eq!(info.id.as_deref(), Some("4242"));
    assert!(info.uploaded.is_none());
}

#[tokio::test]
async fn test_user_info_disabled_is_pass_parse() {
    let transport = Arc::new(MockTransport::new());
    let mut definition = user_info_definition();
    definition["allowQueryUserInfo"] = json!(false);
    let site = fixtures::site(&definition, transport.clone());

    let info = site.get_user_info(None).await.unwrap();
    assert_eq!(info.status, UserInfoStatus::PassParse);
    assert_eq!(transport.request_count().await, 0);
}

fn detail_definition() -> Value {
    let mut definition = fixtures::table_site_definition();
    definition["detail"] = json!({
        "requestConfig": { "url": "/details.php?id=$id$" },
        "selectors": {
            "link": { "selector": "a.download", "attr": "href" }
        }
    });
    definition
}

#[tokio::test]
async fn test_download_link_prefers_row_link() {
    let transport = Arc::new(MockTransport::new());
    let site = fixtures::site(&detail_definition(), transport.clone());
    let torrent = Torrent {
        id: "5".into(),
        link: Some("/download.php?id=5&passkey=abc".into()),
        ..Torrent::default()
    };

    let link = site.get_download_link(&torrent).await.unwrap();
    assert_eq!(link, "https://tracker.example/download.php?id=5&passkey=abc");
    assert_eq!(transport.request_count().await, 0);
}

#[tokio::test]
async fn test_download_link_from_detail_page() {
    let transport = Arc::new(MockTransport::new().route(
        "/details.php",
        fixtures::page(r#"<a class="download" href="download.php?id=5&amp;key=xyz">Download</a>"#),
    ));
    let site = fixtures::site(&detail_definition(), transport.clone());
    let torrent = Torrent {
        id: "5".into(),
        ..Torrent::default()
    };

    let link = site.get_download_link(&torrent).await.unwrap();
    assert_eq!(link, "https://tracker.example/download.php?id=5&key=xyz");
    assert_eq!(transport.requests_to("details.php?id=5").await, 1);
}

#[tokio::test]
async fn test_download_link_missing_on_detail_page() {
    let transport = Arc::new(MockTransport::new().route("/details.php", fixtures::page("<p>gone</p>")));
    let site = fixtures::site(&detail_definition(), transport);
    let torrent = Torrent {
        id: "5".into(),
        ..Torrent::default()
    };

    let result = site.get_download_link(&torrent).await;
    assert!(matches!(result, Err(SiteError::NoDownloadLink)));
}

#[tokio::test]
async fn test_download_link_without_detail_block() {
    let site = fixtures::site(&fixtures::table_site_definition(), Arc::new(MockTransport::new()));
    let torrent = Torrent {
        id: "5".into(),
        ..Torrent::default()
    };
    assert!(matches!(
        site.get_download_link(&torrent).await,
        Err(SiteError::NoDownloadLink)
    ));
}

#[test]
fn test_list_page_reuses_search_selectors() {
    let mut definition = fixtures::table_site_definition();
    definition["list"] = json!([{
        "urlPattern": "/bookmarks\\.php",
        "selectors": {
            "rows": { "selector": "table#bookmarks > tbody > tr.torrent" }
        }
    }]);
    let site = fixtures::site(&definition, Arc::new(MockTransport::new()));

    let page = fixtures::torrent_table(&[("31", "Bookmarked One", "700 MB"), ("32", "Bookmarked Two", "1 GB")])
        .replace("class=\"torrents\"", "id=\"bookmarks\"");
    let url = "https://tracker.example/bookmarks.php";

    assert!(site.list_config_for(url).is_some());
    let torrents = site.parse_list_page(url, &page).unwrap();
    assert_eq!(torrents.len(), 2);
    assert_eq!(torrents[0].id, "31");
    assert_eq!(torrents[0].size, Some(700 * 1024 * 1024));
    assert_eq!(
        torrents[1].link.as_deref(),
        Some("https://tracker.example/download.php?id=32")
    );
}

#[test]
fn test_list_page_without_matching_block() {
    let site = fixtures::site(&fixtures::table_site_definition(), Arc::new(MockTransport::new()));
    let result = site.parse_list_page("https://tracker.example/bookmarks.php", "<html></html>");
    assert!(matches!(result, Err(SiteError::InvalidMetadata(_))));
}

#[tokio::test]
async fn test_registry_site_from_disk_with_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let mut definition = fixtures::table_site_definition();
    definition["tags"] = json!(["linux"]);
    std::fs::write(dir.path().join("demo.json"), definition.to_string()).unwrap();

    let registry = SiteRegistry::load_dir(dir.path()).unwrap();
    let config = SiteConfig {
        id: "demo".into(),
        url: Some("https://mirror.example/".into()),
        overrides: json!({
            "tags": ["mirror"],
            "search": { "requestConfig": { "params": { "incldead": 0 } } }
        }),
        ..SiteConfig::default()
    };

    let transport = Arc::new(MockTransport::new().route(
        "/torrents.php",
        fixtures::torrent_table(&[("1", "Arch Linux", "1 GB")]),
    ));
    let site = registry
        .build_site(&config, SiteHooks::new(), transport.clone())
        .unwrap();

    assert_eq!(site.metadata().tags, vec!["mirror".to_string(), "linux".to_string()]);

    let result = site.search("arch", None).await;
    assert_eq!(result.data.len(), 1);
    assert_eq!(
        result.data[0].url.as_deref(),
        Some("https://mirror.example/details.php?id=1")
    );
    let requests = transport.requests().await;
    assert!(requests[0].url.starts_with("https://mirror.example/torrents.php?"));
    assert!(requests[0].url.contains("incldead=0"));
}
