//! Site schemas: families of trackers sharing one software stack.
//!
//! A schema contributes the bottom metadata layer of every site declaring
//! it, plus the hooks that layer refers to by name. Schemas build on each
//! other (`nexusphp` starts from `private`, which starts from `common`).

mod avistaz;
mod common;
mod gazelle;
mod gazelle_json;
mod nexusphp;
mod private;
pub(crate) mod support;

pub use avistaz::{AvistazSchema, BearerTokenAuthorizer};
pub use common::CommonSchema;
pub use gazelle::GazelleSchema;
pub use gazelle_json::{ApiKeyAuthorizer, GazelleJsonSchema};
pub use nexusphp::NexusPhpSchema;
pub use private::PrivateSchema;

use serde_json::Value;

use crate::site::SiteHooks;

/// Schema used by definitions that do not name one.
pub const DEFAULT_SCHEMA: &str = "common";

pub trait Schema: Send + Sync {
    fn name(&self) -> &'static str;

    /// Bottom metadata layer.
    fn defaults(&self) -> Value;

    /// Fresh hooks for one site. Called once per site so stateful hooks
    /// (token caches) are never shared between sites.
    fn hooks(&self) -> SiteHooks {
        SiteHooks::new()
    }

    /// Offset applied when a site declares no `timezoneOffset`.
    fn default_timezone(&self) -> Option<&'static str> {
        None
    }
}

static SCHEMAS: &[&dyn Schema] = &[
    &CommonSchema,
    &PrivateSchema,
    &NexusPhpSchema,
    &GazelleSchema,
    &GazelleJsonSchema,
    &AvistazSchema,
];

pub fn lookup(name: &str) -> Option<&'static dyn Schema> {
    SCHEMAS
        .iter()
        .copied()
        .find(|schema| schema.name().eq_ignore_ascii_case(name))
}

/// Every built-in schema.
pub fn all() -> &'static [&'static dyn Schema] {
    SCHEMAS
}
