//! Crate-level error type.

use thiserror::Error;

use crate::{
    config::ConfigError,
    dispatch::DispatchError,
    fragment::SplitError,
    request::RequestError,
    tag::TagError,
    tracker::TrackerError,
};

/// Any error raised by `tagframe`.
///
/// Per-tag failures never appear here; they are reported as
/// [`ResponseCode`](crate::response::ResponseCode)s in the merged response.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TagframeError {
    #[error(transparent)]
    Tag(#[from] TagError),
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Split(#[from] SplitError),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Result type used throughout the public API.
pub type Result<T> = std::result::Result<T, TagframeError>;
