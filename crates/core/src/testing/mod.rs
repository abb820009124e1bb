//! Testing utilities: a scripted transport and page/definition fixtures.
//!
//! # Example
//!
//! ```rust,ignore
//! use trackhub_core::testing::{fixtures, MockTransport};
//!
//! let transport = Arc::new(
//!     MockTransport::new().route("/torrents.php", fixtures::torrent_table(&[("1", "Ubuntu", "1.2 GB")])),
//! );
//! let site = fixtures::site(&fixtures::table_site_definition(), transport.clone());
//! let result = site.search("ubuntu", None).await;
//! ```

mod mock_transport;

pub use mock_transport::{ok, MockTransport, RecordedRequest};

/// Test fixtures and helper functions.
pub mod fixtures {
    use serde_json::{json, Value};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use crate::site::{Site, SiteHooks};
    use crate::transport::{Response, Transport};

    pub const BASE_URL: &str = "https://tracker.example/";

    /// Build a site from a definition layer with the schema's hooks only.
    ///
    /// Panics on an invalid definition.
    pub fn site(definition: &Value, transport: Arc<dyn Transport>) -> Site {
        Site::from_definition(definition, None, SiteHooks::new(), transport)
            .unwrap_or_else(|e| panic!("invalid test definition: {}", e))
    }

    /// A `common` site searching `/torrents.php` and reading a plain
    /// `table.torrents` with one row per torrent.
    pub fn table_site_definition() -> Value {
        json!({
            "id": "demo",
            "name": "Demo",
            "urls": [BASE_URL],
            "allowSearch": true,
            "search": {
                "requestConfig": { "url": "/torrents.php" },
                "selectors": {
                    "rows": { "selector": "table.torrents > tbody > tr.torrent" },
                    "id": { "selector": "a.title", "attr": "href", "filters": [{ "name": "querystring", "args": ["id"] }] },
                    "title": { "selector": "a.title" },
                    "url": { "selector": "a.title", "attr": "href" },
                    "link": { "selector": "a.dl", "attr": "href" },
                    "size": { "selector": "td.size" },
                    "seeders": { "selector": "td.seeders" },
                    "time": { "selector": "td.time" }
                }
            }
        })
    }

    /// One `tr.torrent` per `(id, title, size)`.
    pub fn torrent_table(rows: &[(&str, &str, &str)]) -> String {
        let body: String = rows
            .iter()
            .map(|(id, title, size)| {
                format!(
                    r#"<tr class="torrent">
                         <td><a class="title" href="/details.php?id={id}">{title}</a>
                             <a class="dl" href="/download.php?id={id}">DL</a></td>
                         <td class="time">2024-01-02 03:04:05</td>
                         <td class="size">{size}</td>
                         <td class="seeders">10</td>
                       </tr>"#,
                    id = id,
                    title = title,
                    size = size,
                )
            })
            .collect();
        page(&format!(
            r#"<table class="torrents"><tbody>
                 <tr class="header"><td>Name</td><td>Time</td><td>Size</td><td>Seeders</td></tr>
                 {}
               </tbody></table>"#,
            body
        ))
    }

    /// Wrap `content` in a minimal logged-in page.
    pub fn page(content: &str) -> String {
        format!(
            r#"<!DOCTYPE html><html><head><title>Tracker</title></head><body>
                 <div id="nav"><a href="/logout.php">Logout</a></div>
                 {}
               </body></html>"#,
            content
        )
    }

    /// The login form trackers answer anonymous requests with.
    pub fn login_form() -> String {
        page(r#"<form action="takelogin.php" method="post"><input type="password" name="password"/></form>"#)
    }

    pub fn response(status: u16, final_url: &str, body: impl Into<String>) -> Response {
        Response {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
            final_url: final_url.to_string(),
        }
    }

    /// A 200 response that ended up on `final_url` after redirects.
    pub fn redirected(final_url: &str, body: impl Into<String>) -> Response {
        response(200, final_url, body)
    }
}
