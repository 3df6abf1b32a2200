//! Layer configuration.
//!
//! [`LayerConfig`] is fixed once the overlay is built, apart from opacity and
//! z-index, which have their own setters on the overlay. Values come from code
//! through the `with_*` builder or from an INI file:
//!
//! ```ini
//! [layer]
//! opacity = 0.8
//! min_zoom = 3
//! max_zoom = 16
//! ; south, west, north, east
//! bounds = 47.0, 6.0, 55.0, 15.0
//! z_index = 10
//! ; true | false | auto
//! use_canvas = auto
//! detect_retina = true
//! cross_origin = anonymous
//! attribution = © Example
//!
//! [wms]
//! url = https://wms.example.com/wms
//! layers = roads
//! version = 1.3.0
//! crs = EPSG:4326
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::Ini;
use thiserror::Error;

use crate::geo::GeoBounds;
use crate::provider::{Crs, ProviderError, WmsProvider};
use crate::surface::CrossOrigin;

// ==================== Defaults ====================

/// Default layer opacity.
pub const DEFAULT_OPACITY: f64 = 1.0;

/// Default lowest zoom level at which the layer requests images.
pub const DEFAULT_MIN_ZOOM: i32 = 0;

/// Default highest zoom level at which the layer requests images.
pub const DEFAULT_MAX_ZOOM: i32 = 18;

/// 1×1 transparent GIF shown when a resource fails to load.
pub const DEFAULT_ERROR_RESOURCE_URL: &str =
    "data:image/gif;base64,R0lGODlhAQABAHAAACH5BAUAAAAALAAAAAABAAEAAAICRAEAOw==";

/// Reserved empty resource loaded into a slot for degenerate viewports.
pub const EMPTY_RESOURCE_URL: &str =
    "data:image/gif;base64,R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";

/// Section holding layer options.
pub const LAYER_SECTION: &str = "layer";

/// Section holding WMS provider options.
pub const WMS_SECTION: &str = "wms";

/// Errors raised while building or loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Opacity must be within [0, 1], got {0}")]
    InvalidOpacity(f64),

    #[error("min_zoom ({min}) must not exceed max_zoom ({max})")]
    InvalidZoomRange { min: i32, max: i32 },

    #[error("Layer bounds must be finite with south <= north and west <= east")]
    InvalidBounds,

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Ini(String),

    #[error("Invalid value for '{key}': {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid provider settings: {0}")]
    Provider(#[from] ProviderError),
}

impl From<ini::Error> for ConfigError {
    fn from(e: ini::Error) -> Self {
        match e {
            ini::Error::Io(io) => ConfigError::Io(io),
            ini::Error::Parse(parse) => ConfigError::Ini(parse.to_string()),
        }
    }
}

/// Options of one non-tiled layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerConfig {
    /// Container opacity, within [0, 1].
    pub opacity: f64,

    /// Lowest zoom level at which images are requested.
    pub min_zoom: i32,

    /// Highest zoom level at which images are requested.
    pub max_zoom: i32,

    /// Geographic extent of the layer; requests are clipped to it.
    pub bounds: GeoBounds,

    /// Stacking order of the container. `None` leaves the host default.
    pub z_index: Option<i32>,

    /// Resource substituted when a fetched resource fails to load.
    pub error_resource_url: String,

    /// Render through canvas surfaces. `None` uses canvas when the host supports it.
    pub use_canvas: Option<bool>,

    /// Request double-size images on high-density displays.
    pub detect_retina: bool,

    /// Credential mode passed to surfaces as-is.
    pub cross_origin: Option<CrossOrigin>,

    /// Attribution text shown by the host.
    pub attribution: String,

    /// Pointer-events style of the container.
    pub pointer_events: Option<String>,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            opacity: DEFAULT_OPACITY,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            bounds: GeoBounds::world(),
            z_index: None,
            error_resource_url: DEFAULT_ERROR_RESOURCE_URL.to_string(),
            use_canvas: None,
            detect_retina: false,
            cross_origin: None,
            attribution: String::new(),
            pointer_events: None,
        }
    }
}

impl LayerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_zoom_range(mut self, min_zoom: i32, max_zoom: i32) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    pub fn with_bounds(mut self, bounds: GeoBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = Some(z_index);
        self
    }

    pub fn with_error_resource_url(mut self, url: impl Into<String>) -> Self {
        self.error_resource_url = url.into();
        self
    }

    pub fn with_canvas(mut self, use_canvas: bool) -> Self {
        self.use_canvas = Some(use_canvas);
        self
    }

    pub fn with_retina_detection(mut self, detect_retina: bool) -> Self {
        self.detect_retina = detect_retina;
        self
    }

    pub fn with_cross_origin(mut self, cross_origin: CrossOrigin) -> Self {
        self.cross_origin = Some(cross_origin);
        self
    }

    pub fn with_attribution(mut self, attribution: impl Into<String>) -> Self {
        self.attribution = attribution.into();
        self
    }

    pub fn with_pointer_events(mut self, pointer_events: impl Into<String>) -> Self {
        self.pointer_events = Some(pointer_events.into());
        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_opacity(self.opacity)?;
        if self.min_zoom > self.max_zoom {
            return Err(ConfigError::InvalidZoomRange {
                min: self.min_zoom,
                max: self.max_zoom,
            });
        }
        if !self.bounds.is_finite() || self.bounds.is_inverted() {
            return Err(ConfigError::InvalidBounds);
        }
        Ok(())
    }

    /// Read the `[layer]` section, starting from defaults.
    ///
    /// A missing section yields the defaults. The result is validated.
    pub fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let Some(section) = ini.section(Some(LAYER_SECTION)) else {
            return Ok(config);
        };

        for (key, value) in section.iter() {
            let value = value.trim();
            match key {
                "opacity" => config.opacity = parse_value(key, value)?,
                "min_zoom" => config.min_zoom = parse_value(key, value)?,
                "max_zoom" => config.max_zoom = parse_value(key, value)?,
                "bounds" => config.bounds = parse_bounds(key, value)?,
                "z_index" => config.z_index = Some(parse_value(key, value)?),
                "error_resource_url" => config.error_resource_url = value.to_string(),
                "use_canvas" => {
                    config.use_canvas = match value {
                        "auto" | "" => None,
                        other => Some(parse_value(key, other)?),
                    }
                }
                "detect_retina" => config.detect_retina = parse_value(key, value)?,
                "cross_origin" => {
                    config.cross_origin =
                        Some(CrossOrigin::parse(value).ok_or_else(|| invalid(key, value))?)
                }
                "attribution" => config.attribution = value.to_string(),
                "pointer_events" => config.pointer_events = Some(value.to_string()),
                _ => tracing::warn!(key, "Ignoring unknown [layer] setting"),
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Load the `[layer]` section of the INI file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path)?;
        Self::from_ini(&ini)
    }
}

/// Check that an opacity lies within [0, 1].
pub fn validate_opacity(opacity: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&opacity) {
        Ok(())
    } else {
        Err(ConfigError::InvalidOpacity(opacity))
    }
}

/// Build a WMS provider from the `[wms]` section.
///
/// Returns `Ok(None)` when the file has no `[wms]` section. Keys other than
/// `url`, `crs` and `uppercase` are sent as GetMap parameters.
pub fn wms_from_ini(ini: &Ini) -> Result<Option<WmsProvider>, ConfigError> {
    let Some(section) = ini.section(Some(WMS_SECTION)) else {
        return Ok(None);
    };
    let url = section
        .get("url")
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| invalid("url", "<missing>"))?;

    let mut provider = WmsProvider::new(url);
    for (key, value) in section.iter().filter(|(key, _)| *key != "url") {
        provider = apply_wms_setting(provider, key, value.trim())?;
    }
    // Surface a bad version now rather than on the first request
    provider.version()?;
    Ok(Some(provider))
}

/// Apply one WMS setting: `crs`, `uppercase`, or any GetMap parameter.
pub fn apply_wms_setting(
    provider: WmsProvider,
    key: &str,
    value: &str,
) -> Result<WmsProvider, ConfigError> {
    Ok(match key {
        "crs" => provider.with_crs(Crs::parse(value)?),
        "uppercase" => provider.with_uppercase(parse_value(key, value)?),
        _ => provider.with_param(key, value),
    })
}

/// Default location of the configuration file.
///
/// `<config dir>/nontiled/config.ini`, e.g. `~/.config/nontiled/config.ini`
/// on Linux. `None` when the platform has no config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("nontiled").join("config.ini"))
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| invalid(key, value))
}

fn parse_bounds(key: &str, value: &str) -> Result<GeoBounds, ConfigError> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid(key, value))?;
    match parts.as_slice() {
        [south, west, north, east] => Ok(GeoBounds::new(*south, *west, *north, *east)),
        _ => Err(invalid(key, value)),
    }
}
