//! Named code hooks a site definition can refer to.
//!
//! [`SiteMetadata`] is plain data; whenever a site needs behaviour the
//! declarative model cannot express it names a hook, and the schema (or
//! the embedding application) registers the implementation here.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::SiteError;
use crate::field::{ElementProcess, Source};
use crate::filters::{FilterFn, FilterRegistry};
use crate::metadata::{SearchEntry, SiteMetadata};
use crate::transport::{Response, Transport};

/// What a search row is being parsed for.
#[derive(Debug, Clone, Copy)]
pub struct RowContext<'a> {
    pub keywords: &'a str,
    pub entry: &'a SearchEntry,
    /// The request config that produced the page.
    pub request: &'a Value,
    /// URL the page was actually served from.
    pub final_url: &'a str,
}

/// Inputs available to a request transformer.
#[derive(Debug, Clone, Copy)]
pub struct TransformContext<'a> {
    pub metadata: &'a SiteMetadata,
    pub keywords: Option<&'a str>,
    pub entry: Option<&'a SearchEntry>,
    /// Fields collected so far during a user-info run.
    pub user_info: Option<&'a Map<String, Value>>,
}

/// Replaces selector resolution for one torrent field.
pub type TorrentFieldParser =
    Arc<dyn for<'a> Fn(&Map<String, Value>, Source<'a>, &RowContext<'_>) -> Value + Send + Sync>;

/// Replaces selector resolution for one user-info field.
pub type UserInfoFieldParser =
    Arc<dyn for<'a> Fn(&Map<String, Value>, Source<'a>) -> Value + Send + Sync>;

pub type RequestTransformer = Arc<dyn Fn(&TransformContext<'_>, Value) -> Value + Send + Sync>;

/// Keeps (`true`) or drops a located row.
pub type RowFilter = Arc<dyn for<'a> Fn(Source<'a>) -> bool + Send + Sync>;

pub type LoginCheck = Arc<dyn Fn(&Response, &SiteMetadata) -> bool + Send + Sync>;

/// Inputs available to a [`RequestAuthorizer`].
pub struct AuthorizeContext<'a> {
    pub metadata: &'a SiteMetadata,
    pub transport: &'a dyn Transport,
}

/// Adds credentials to every outbound request of a site.
#[async_trait]
pub trait RequestAuthorizer: Send + Sync {
    async fn authorize(
        &self,
        ctx: &AuthorizeContext<'_>,
        request: &mut Value,
    ) -> Result<(), SiteError>;
}

/// Capability map of per-site code.
#[derive(Clone, Default)]
pub struct SiteHooks {
    pub torrent_fields: HashMap<String, TorrentFieldParser>,
    pub user_info_fields: HashMap<String, UserInfoFieldParser>,
    pub element_processors: HashMap<String, ElementProcess>,
    pub request_transformers: HashMap<String, RequestTransformer>,
    pub row_filters: HashMap<String, RowFilter>,
    pub filters: FilterRegistry,
    pub login_check: Option<LoginCheck>,
    pub authorizer: Option<Arc<dyn RequestAuthorizer>>,
}

impl fmt::Debug for SiteHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn names<V>(map: &HashMap<String, V>) -> Vec<&str> {
            let mut names: Vec<&str> = map.keys().map(String::as_str).collect();
            names.sort_unstable();
            names
        }

        f.debug_struct("SiteHooks")
            .field("torrent_fields", &names(&self.torrent_fields))
            .field("user_info_fields", &names(&self.user_info_fields))
            .field("element_processors", &names(&self.element_processors))
            .field("request_transformers", &names(&self.request_transformers))
            .field("row_filters", &names(&self.row_filters))
            .field("filters", &self.filters)
            .field("login_check", &self.login_check.is_some())
            .field("authorizer", &self.authorizer.is_some())
            .finish()
    }
}

impl SiteHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn torrent_field<F>(mut self, field: impl Into<String>, parser: F) -> Self
    where
        F: for<'a> Fn(&Map<String, Value>, Source<'a>, &RowContext<'_>) -> Value
            + Send
            + Sync
            + 'static,
    {
        self.torrent_fields.insert(field.into(), Arc::new(parser));
        self
    }

    pub fn user_info_field<F>(mut self, field: impl Into<String>, parser: F) -> Self
    where
        F: for<'a> Fn(&Map<String, Value>, Source<'a>) -> Value + Send + Sync + 'static,
    {
        self.user_info_fields.insert(field.into(), Arc::new(parser));
        self
    }

    pub fn element_processor<F>(mut self, name: impl Into<String>, process: F) -> Self
    where
        F: for<'a> Fn(Source<'a>) -> Value + Send + Sync + 'static,
    {
        self.element_processors.insert(name.into(), Arc::new(process));
        self
    }

    pub fn request_transformer<F>(mut self, name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&TransformContext<'_>, Value) -> Value + Send + Sync + 'static,
    {
        self.request_transformers
            .insert(name.into(), Arc::new(transform));
        self
    }

    pub fn row_filter<F>(mut self, name: impl Into<String>, keep: F) -> Self
    where
        F: for<'a> Fn(Source<'a>) -> bool + Send + Sync + 'static,
    {
        self.row_filters.insert(name.into(), Arc::new(keep));
        self
    }

    pub fn filter(mut self, name: impl Into<String>, filter: FilterFn) -> Self {
        self.filters.insert(name, filter);
        self
    }

    pub fn login_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&Response, &SiteMetadata) -> bool + Send + Sync + 'static,
    {
        self.login_check = Some(Arc::new(check));
        self
    }

    pub fn authorizer(mut self, authorizer: Arc<dyn RequestAuthorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    /// Layer `other` over `self`; entries in `other` win.
    pub fn extend(mut self, other: SiteHooks) -> Self {
        self.torrent_fields.extend(other.torrent_fields);
        self.user_info_fields.extend(other.user_info_fields);
        self.element_processors.extend(other.element_processors);
        self.request_transformers.extend(other.request_transformers);
        self.row_filters.extend(other.row_filters);
        self.filters.extend(other.filters);
        if other.login_check.is_some() {
            self.login_check = other.login_check;
        }
        if other.authorizer.is_some() {
            self.authorizer = other.authorizer;
        }
        self
    }
}
