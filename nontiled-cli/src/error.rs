//! CLI error type.

use thiserror::Error;

use nontiled::config::ConfigError;
use nontiled::overlay::OverlayError;
use nontiled::provider::ProviderError;

/// Errors surfaced to the user by `nontiled` commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid value for --{name}: '{value}'")]
    InvalidArgument { name: &'static str, value: String },

    #[error(
        "No image provider configured. Use --template, --wms-url, \
         or add a [wms] section to the config file"
    )]
    NoProvider,

    #[error("Overlay error: {0}")]
    Overlay(#[from] OverlayError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}
