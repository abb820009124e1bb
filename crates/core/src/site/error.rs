use thiserror::Error;

use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("Login required")]
    NeedLogin,

    #[error("No torrents found")]
    NoTorrents,

    #[error("Parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("No download link available")]
    NoDownloadLink,

    #[error("Invalid site metadata: {0}")]
    InvalidMetadata(String),
}

/// A user-info step depends on a field no earlier step produced.
///
/// This is a bug in the site definition, never a remote failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("User info step {step} asserts field '{field}' which has not been collected")]
pub struct AssertionMissing {
    pub step: usize,
    pub field: String,
}
