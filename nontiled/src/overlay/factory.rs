//! Factory functions for common overlay kinds.

use crate::config::{apply_wms_setting, ConfigError, LayerConfig};
use crate::overlay::{NonTiledOverlay, OverlayError};
use crate::provider::{FetchProvider, TemplateProvider, WmsProvider};

/// Overlay over any provider.
pub fn non_tiled_layer(
    config: LayerConfig,
    provider: FetchProvider,
) -> Result<NonTiledOverlay, OverlayError> {
    NonTiledOverlay::new(config, provider)
}

/// Overlay fetching images from a WMS GetMap endpoint.
///
/// `params` accepts GetMap parameters plus the `crs` and `uppercase` settings.
pub fn wms_layer(
    url: &str,
    params: &[(&str, &str)],
    config: LayerConfig,
) -> Result<NonTiledOverlay, OverlayError> {
    let mut provider = WmsProvider::new(url);
    for (key, value) in params {
        provider = apply_wms_setting(provider, key, value)?;
    }
    provider.version().map_err(ConfigError::from)?;
    non_tiled_layer(config, FetchProvider::sync(provider))
}

/// Overlay fetching images from a URL template such as
/// `https://example.com/render?bbox={bbox}&w={width}&h={height}`.
pub fn template_layer(
    template: &str,
    config: LayerConfig,
) -> Result<NonTiledOverlay, OverlayError> {
    let provider = TemplateProvider::new(template).map_err(ConfigError::from)?;
    non_tiled_layer(config, FetchProvider::sync(provider))
}
