//! Overlay errors.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors returned by overlay lifecycle and configuration calls.
///
/// Fetch and load failures are not errors at this level; they surface as
/// `error` events.
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("Overlay is already attached to a map")]
    AlreadyAttached,

    #[error("Overlay is not attached to a map")]
    NotAttached,

    #[error("Invalid layer configuration: {0}")]
    Config(#[from] ConfigError),
}
