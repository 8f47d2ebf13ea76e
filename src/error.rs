//! Request-level error taxonomy for the feed endpoints.
//!
//! Per-id directory/network lookup failures are deliberately NOT here: those
//! are swallowed inside the identity resolver and surface only as
//! unresolved entries.

use thiserror::Error;

use crate::database_ops::db::StoreError;

#[derive(Debug, Error)]
pub enum FeedError {
    /// A credential the endpoint cannot work without is not configured.
    #[error("missing required credential: {0}")]
    MissingCredential(&'static str),

    /// A caption page fetch failed. Fatal: the whole request aborts with no
    /// partial captions returned.
    #[error("caption page fetch failed: {0}")]
    PageFetch(#[source] StoreError),

    /// An image batch fetch failed. Fatal for the request.
    #[error("image batch fetch failed: {0}")]
    ImageFetch(#[source] StoreError),

    /// None of the legacy uploader column conventions exist on this schema.
    #[error("no compatible uploader columns found on captions table")]
    NoUploaderColumns,

    #[error(transparent)]
    Store(#[from] StoreError),
}
