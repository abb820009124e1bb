use serde_json::{json, Value};
use tracing::debug;

use super::rows::absolutize_url;
use super::{Body, Site, SiteError};
use crate::entity::Torrent;
use crate::field::Source;
use crate::filters::as_text;
use crate::path;

impl Site {
    /// Direct download link of `torrent`.
    ///
    /// When the list view carried no link, the torrent's detail page is
    /// fetched once and the `link` selector of the `detail` block applied.
    pub async fn get_download_link(&self, torrent: &Torrent) -> Result<String, SiteError> {
        let base = self.metadata.base_url().unwrap_or_default();
        if let Some(link) = torrent.link.as_deref().filter(|l| !l.trim().is_empty()) {
            return Ok(absolutize_url(link, base));
        }

        let detail = self.metadata.detail.as_ref().ok_or(SiteError::NoDownloadLink)?;
        let selector = detail.selectors.get("link").ok_or(SiteError::NoDownloadLink)?;

        let mut request = detail
            .request_config
            .clone()
            .unwrap_or_else(|| json!({}));
        match path::get(&request, "url").and_then(Value::as_str) {
            Some(url) if url.contains("$id$") => {
                let url = url.replace("$id$", &torrent.id);
                path::set(&mut request, "url", Value::String(url));
            }
            Some(_) => {}
            None => {
                let url = torrent.url.clone().ok_or(SiteError::NoDownloadLink)?;
                path::set(&mut request, "url", Value::String(url));
            }
        }

        debug!(site = %self.id(), torrent = %torrent.id, "Fetching detail page for download link");
        let exchange = self.send(request).await?;
        let link = {
            let body = Body::decode(exchange.response_type, &exchange.response.body)?;
            let source = match &body {
                Body::Document(doc) => Source::Element(doc.root_element()),
                Body::Json(value) => Source::Json(value),
            };
            as_text(&self.resolver().resolve(source, selector))
        };

        if link.trim().is_empty() {
            return Err(SiteError::NoDownloadLink);
        }
        let page = if exchange.response.final_url.is_empty() {
            base
        } else {
            exchange.response.final_url.as_str()
        };
        Ok(absolutize_url(&link, page))
    }
}
