//! Arguments and helpers shared across commands.

use std::path::Path;

use clap::Args;
use ini::Ini;
use tracing::debug;

use nontiled::config::{
    apply_wms_setting, default_config_path, wms_from_ini, ConfigError, LayerConfig,
};
use nontiled::geo::{GeoBounds, LatLng};
use nontiled::host::WebMercatorHost;
use nontiled::provider::{ProviderError, ResourceUrlProvider, TemplateProvider, WmsProvider};

use crate::error::CliError;

/// Container size in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Viewport selection.
#[derive(Debug, Clone, Args)]
pub struct ViewArgs {
    /// Map center as LAT,LNG
    #[arg(long, default_value = "50.1,8.7", value_parser = parse_center, allow_hyphen_values = true)]
    pub center: LatLng,

    /// Zoom level
    #[arg(long, default_value_t = 10.0)]
    pub zoom: f64,

    /// Container size as WIDTHxHEIGHT
    #[arg(long, default_value = "800x600", value_parser = parse_size)]
    pub size: Size,

    /// Device pixel ratio reported by the host
    #[arg(long, default_value_t = 1.0)]
    pub pixel_ratio: f64,
}

/// Image provider selection. Command-line values take precedence over the
/// `[wms]` section of the config file.
#[derive(Debug, Clone, Args)]
pub struct ProviderArgs {
    /// URL template using {bbox}, {west}, {south}, {east}, {north}, {width}, {height}
    #[arg(long, conflicts_with = "wms_url")]
    pub template: Option<String>,

    /// WMS GetMap endpoint
    #[arg(long)]
    pub wms_url: Option<String>,

    /// WMS layers
    #[arg(long)]
    pub layers: Option<String>,

    /// Additional WMS setting as KEY=VALUE (repeatable), e.g. version=1.3.0 or crs=EPSG:4326
    #[arg(long = "param", value_parser = parse_param)]
    pub params: Vec<(String, String)>,
}

/// Settings read from the config file.
#[derive(Debug, Default)]
pub struct Settings {
    pub layer: LayerConfig,
    pub wms: Option<WmsProvider>,
}

/// Provider chosen for a command.
#[derive(Debug, Clone)]
pub enum ImageProvider {
    Wms(WmsProvider),
    Template(TemplateProvider),
}

impl ResourceUrlProvider for ImageProvider {
    fn resource_url(
        &self,
        bounds: &GeoBounds,
        width: u32,
        height: u32,
    ) -> Result<String, ProviderError> {
        match self {
            ImageProvider::Wms(p) => p.resource_url(bounds, width, height),
            ImageProvider::Template(p) => p.resource_url(bounds, width, height),
        }
    }

    fn name(&self) -> &str {
        match self {
            ImageProvider::Wms(p) => p.name(),
            ImageProvider::Template(p) => p.name(),
        }
    }

    fn set_params(&mut self, params: &[(String, String)]) -> bool {
        match self {
            ImageProvider::Wms(p) => p.set_params(params),
            ImageProvider::Template(p) => p.set_params(params),
        }
    }
}

/// Load settings from `path`, or from the default location if it exists.
///
/// Without a config file the layer defaults apply.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, CliError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => path,
            None => return Ok(Settings::default()),
        },
    };

    debug!(path = %path.display(), "Loading config");
    let ini = Ini::load_from_file(&path).map_err(ConfigError::from)?;
    Ok(Settings {
        layer: LayerConfig::from_ini(&ini)?,
        wms: wms_from_ini(&ini)?,
    })
}

/// Resolve the provider from CLI arguments, falling back to the config file.
pub fn resolve_provider(
    args: &ProviderArgs,
    configured: Option<WmsProvider>,
) -> Result<ImageProvider, CliError> {
    if let Some(template) = &args.template {
        return Ok(ImageProvider::Template(TemplateProvider::new(
            template.as_str(),
        )?));
    }

    let mut wms = match &args.wms_url {
        Some(url) => WmsProvider::new(url.as_str()),
        None => configured.ok_or(CliError::NoProvider)?,
    };
    if let Some(layers) = &args.layers {
        wms = wms.with_param("layers", layers.as_str());
    }
    for (key, value) in &args.params {
        wms = apply_wms_setting(wms, key, value)?;
    }
    wms.version()?;
    Ok(ImageProvider::Wms(wms))
}

/// Build the headless host for a viewport.
pub fn build_host(view: &ViewArgs) -> WebMercatorHost {
    WebMercatorHost::new(view.center, view.zoom, view.size.width, view.size.height)
        .with_device_pixel_ratio(view.pixel_ratio)
}

pub fn parse_center(value: &str) -> Result<LatLng, String> {
    let (lat, lng) = value
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LNG, got '{}'", value))?;
    let lat: f64 = lat.trim().parse().map_err(|_| format!("bad latitude '{}'", lat))?;
    let lng: f64 = lng.trim().parse().map_err(|_| format!("bad longitude '{}'", lng))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(format!("coordinates out of range: {}", value));
    }
    Ok(LatLng::new(lat, lng))
}

pub fn parse_size(value: &str) -> Result<Size, String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", value))?;
    let width: f64 = width.trim().parse().map_err(|_| format!("bad width '{}'", width))?;
    let height: f64 = height
        .trim()
        .parse()
        .map_err(|_| format!("bad height '{}'", height))?;
    if width < 0.0 || height < 0.0 {
        return Err(format!("size must not be negative: {}", value));
    }
    Ok(Size { width, height })
}

pub fn parse_param(value: &str) -> Result<(String, String), String> {
    let (key, val) = value
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", value))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", value));
    }
    Ok((key.to_string(), val.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn provider_args() -> ProviderArgs {
        ProviderArgs {
            template: None,
            wms_url: None,
            layers: None,
            params: Vec::new(),
        }
    }

    #[test]
    fn test_parse_center() {
        assert_eq!(parse_center("50.1, 8.7"), Ok(LatLng::new(50.1, 8.7)));
        assert_eq!(parse_center("-33.9,151.2"), Ok(LatLng::new(-33.9, 151.2)));
        assert!(parse_center("50.1").is_err());
        assert!(parse_center("95,0").is_err());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(
            parse_size("800x600"),
            Ok(Size {
                width: 800.0,
                height: 600.0
            })
        );
        assert!(parse_size("800").is_err());
        assert!(parse_size("-1x5").is_err());
    }

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("version=1.3.0"),
            Ok(("version".to_string(), "1.3.0".to_string()))
        );
        assert!(parse_param("=x").is_err());
        assert!(parse_param("novalue").is_err());
    }

    #[test]
    fn test_template_takes_precedence() {
        let mut args = provider_args();
        args.template = Some("http://x/{bbox}".to_string());
        let provider = resolve_provider(&args, Some(WmsProvider::new("http://wms"))).unwrap();
        assert!(matches!(provider, ImageProvider::Template(_)));
    }

    #[test]
    fn test_cli_wms_overrides_config() {
        let mut args = provider_args();
        args.wms_url = Some("http://cli".to_string());
        args.layers = Some("roads".to_string());
        args.params = vec![("crs".to_string(), "EPSG:4326".to_string())];

        match resolve_provider(&args, Some(WmsProvider::new("http://config"))).unwrap() {
            ImageProvider::Wms(wms) => {
                assert_eq!(wms.param("layers"), Some("roads"));
                let url = wms
                    .resource_url(&GeoBounds::new(0.0, 0.0, 1.0, 1.0), 64, 64)
                    .unwrap();
                assert!(url.starts_with("http://cli?"));
            }
            other => panic!("expected WMS, got {:?}", other),
        }
    }

    #[test]
    fn test_no_provider() {
        assert!(matches!(
            resolve_provider(&provider_args(), None),
            Err(CliError::NoProvider)
        ));
    }

    #[test]
    fn test_load_settings_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[layer]\nmin_zoom = 4\n\n[wms]\nurl = http://wms.example.com\nlayers = roads"
        )
        .unwrap();

        let settings = load_settings(Some(file.path())).unwrap();
        assert_eq!(settings.layer.min_zoom, 4);
        assert_eq!(settings.wms.unwrap().param("layers"), Some("roads"));
    }

    #[test]
    fn test_load_settings_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_settings(Some(&dir.path().join("nope.ini")));
        assert!(matches!(result, Err(CliError::Config(ConfigError::Io(_)))));
    }
}
