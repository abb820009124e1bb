pub mod config;
pub mod entity;
pub mod field;
pub mod filters;
pub mod html;
pub mod metadata;
pub mod path;
pub mod registry;
pub mod schema;
pub mod site;
pub mod testing;
pub mod throttle;
pub mod transport;

pub use config::{
    load_config, load_config_from_str, validate_config, validate_sites, Config, ConfigError,
    SanitizedConfig, SiteConfig,
};
pub use entity::{SearchResult, SearchStatus, Torrent, UserInfo, UserInfoStatus};
pub use metadata::{merge_layers, MetadataError, MetadataResolver, SiteMetadata};
pub use registry::{RegistryError, SiteRegistry};
pub use site::{Site, SiteError, SiteHooks};
pub use transport::{ReqwestTransport, Response, Transport, TransportError};
