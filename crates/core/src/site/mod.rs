//! A configured site: metadata, hooks and the capabilities used to talk to it.
//!
//! The public operations are [`Site::search`], [`Site::get_user_info`],
//! [`Site::get_download_link`] and [`Site::parse_list_page`]. None of them
//! keeps state between calls.

mod columns;
mod download;
mod error;
mod groups;
mod hooks;
mod list;
mod login;
mod rows;
mod search;
mod user_info;

pub use error::{AssertionMissing, SiteError};
pub use hooks::{
    AuthorizeContext, LoginCheck, RequestAuthorizer, RequestTransformer, RowContext, RowFilter,
    SiteHooks, TorrentFieldParser, TransformContext, UserInfoFieldParser,
};
pub use login::default_login_check;
pub use rows::{absolutize_url, DEFAULT_TORRENT_KEYS};

use scraper::Html;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::field::FieldResolver;
use crate::filters::{parse_offset, parse_time_filter};
use crate::metadata::{MetadataError, MetadataResolver, SiteMetadata};
use crate::path;
use crate::schema;
use crate::throttle::{NoThrottle, RequestThrottle};
use crate::transport::{RequestConfig, Response, ResponseType, Transport};

/// One tracker, ready to be queried.
#[derive(Clone)]
pub struct Site {
    metadata: Arc<SiteMetadata>,
    hooks: Arc<SiteHooks>,
    transport: Arc<dyn Transport>,
    throttle: Arc<dyn RequestThrottle>,
}

impl std::fmt::Debug for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Site")
            .field("id", &self.metadata.id)
            .field("schema", &self.metadata.schema)
            .field("hooks", &self.hooks)
            .finish()
    }
}

/// A request as sent together with its response.
pub(crate) struct Exchange {
    pub request: Value,
    pub response_type: ResponseType,
    pub response: Response,
}

/// A decoded response body.
pub(crate) enum Body {
    Document(Html),
    Json(Value),
}

impl Body {
    pub fn decode(response_type: ResponseType, body: &str) -> Result<Self, SiteError> {
        match response_type {
            ResponseType::Json => serde_json::from_str(body)
                .map(Body::Json)
                .map_err(|e| SiteError::Parse(format!("Invalid JSON response: {}", e))),
            ResponseType::Document | ResponseType::Text => Ok(Body::Document(Html::parse_document(body))),
        }
    }
}

impl Site {
    /// Wrap already-resolved metadata.
    ///
    /// A declared `timezoneOffset` makes this site's `parseTime` read naive
    /// timestamps in that offset.
    pub fn new(metadata: SiteMetadata, mut hooks: SiteHooks, transport: Arc<dyn Transport>) -> Self {
        if let Some(tz) = metadata.timezone_offset.as_deref() {
            match parse_offset(tz) {
                Some(offset) => hooks.filters.insert("parseTime", parse_time_filter(offset)),
                None => warn!(site = %metadata.id, timezone = %tz, "Ignoring invalid timezone offset"),
            }
        }
        Self {
            metadata: Arc::new(metadata),
            hooks: Arc::new(hooks),
            transport,
            throttle: Arc::new(NoThrottle),
        }
    }

    /// Resolve a site definition against its schema and optional user
    /// overrides, then attach the schema's hooks plus `extra_hooks`.
    pub fn from_definition(
        definition: &Value,
        user: Option<&Value>,
        extra_hooks: SiteHooks,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, MetadataError> {
        let schema_name = definition
            .get("schema")
            .and_then(Value::as_str)
            .unwrap_or(schema::DEFAULT_SCHEMA);
        let schema = schema::lookup(schema_name)
            .ok_or_else(|| MetadataError::UnknownSchema(schema_name.to_string()))?;

        let defaults = schema.defaults();
        let metadata = MetadataResolver::new(&defaults)
            .with_default_timezone(schema.default_timezone())
            .resolve(definition, user)?;
        let hooks = schema.hooks().extend(extra_hooks);
        Ok(Self::new(metadata, hooks, transport))
    }

    pub fn with_throttle(mut self, throttle: Arc<dyn RequestThrottle>) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn metadata(&self) -> &SiteMetadata {
        &self.metadata
    }

    pub fn hooks(&self) -> &SiteHooks {
        &self.hooks
    }

    pub(crate) fn resolver(&self) -> FieldResolver<'_> {
        FieldResolver::new(&self.hooks.filters, &self.hooks.element_processors)
    }

    /// Whether `response` came from an authenticated session.
    pub fn is_logged_in(&self, response: &Response) -> bool {
        match &self.hooks.login_check {
            Some(check) => check(response, &self.metadata),
            None => default_login_check(response, self.metadata.strict_login_check),
        }
    }

    /// Run the named request transformer, if any.
    pub(crate) fn transform(
        &self,
        name: Option<&str>,
        ctx: &TransformContext<'_>,
        request: Value,
    ) -> Value {
        let Some(name) = name else {
            return request;
        };
        match self.hooks.request_transformers.get(name) {
            Some(transform) => transform(ctx, request),
            None => {
                warn!(site = %self.id(), transformer = %name, "Unknown request transformer");
                request
            }
        }
    }

    /// Authorize, throttle and send one request; classify auth failures.
    pub(crate) async fn send(&self, mut request: Value) -> Result<Exchange, SiteError> {
        if !path::has(&request, "baseURL") {
            if let Some(base) = self.metadata.base_url() {
                path::set(&mut request, "baseURL", Value::String(base.to_string()));
            }
        }
        if let Some(authorizer) = &self.hooks.authorizer {
            let ctx = AuthorizeContext {
                metadata: &self.metadata,
                transport: self.transport.as_ref(),
            };
            authorizer.authorize(&ctx, &mut request).await?;
        }

        let config = RequestConfig::from_value(request.clone())?;
        self.throttle.acquire(self.id()).await;
        debug!(site = %self.id(), url = %config.url, "Requesting");
        let response = self.transport.request(&config).await?;

        if matches!(response.status, 401 | 403) || !self.is_logged_in(&response) {
            debug!(site = %self.id(), status = response.status, final_url = %response.final_url, "Not logged in");
            return Err(SiteError::NeedLogin);
        }
        if !response.is_success() {
            return Err(SiteError::Transport(
                crate::transport::TransportError::Http(format!("HTTP {}", response.status)),
            ));
        }

        Ok(Exchange {
            request,
            response_type: config.response_type,
            response,
        })
    }
}
