//! WMS GetMap provider.
//!
//! Builds a single GetMap request covering the clipped viewport. The
//! projection parameter name depends on the protocol version (`srs` before
//! 1.3, `crs` from 1.3 on), and WMS 1.3 with EPSG:4326 swaps the bbox axis
//! order to latitude first.
//!
//! # URL Pattern
//!
//! `{url}?service=WMS&request=GetMap&version=…&layers=…&styles=…&format=…&transparent=…&srs=…&width=…&height=…&bbox=…`

use crate::geo::{GeoBounds, LatLng};
use crate::provider::{ProviderError, ResourceUrlProvider};

/// Equatorial radius used by spherical Mercator (meters).
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude limit of spherical Mercator.
const MAX_LATITUDE: f64 = 85.051_128_779_8;

/// Default GetMap parameters, in the order they are sent.
const DEFAULT_PARAMS: &[(&str, &str)] = &[
    ("service", "WMS"),
    ("request", "GetMap"),
    ("version", "1.1.1"),
    ("layers", ""),
    ("styles", ""),
    ("format", "image/jpeg"),
    ("transparent", "false"),
];

/// Coordinate reference systems the provider can project bbox corners into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    /// Spherical (Web) Mercator, meters.
    Epsg3857,
    /// Plain longitude/latitude, degrees.
    Epsg4326,
}

impl Crs {
    /// The EPSG code sent in the `srs`/`crs` parameter.
    pub fn code(&self) -> &'static str {
        match self {
            Crs::Epsg3857 => "EPSG:3857",
            Crs::Epsg4326 => "EPSG:4326",
        }
    }

    /// Parse an EPSG code (`EPSG:900913` is accepted as an alias of 3857).
    pub fn parse(code: &str) -> Result<Self, ProviderError> {
        match code.trim().to_uppercase().as_str() {
            "EPSG:3857" | "EPSG:900913" => Ok(Crs::Epsg3857),
            "EPSG:4326" => Ok(Crs::Epsg4326),
            _ => Err(ProviderError::UnsupportedCrs(code.to_string())),
        }
    }

    /// Project a geographic point into this CRS as `(x, y)`.
    pub fn project(&self, point: LatLng) -> (f64, f64) {
        match self {
            Crs::Epsg3857 => {
                let lat = point.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
                let sin = lat.to_radians().sin();
                let x = EARTH_RADIUS * point.lng.to_radians();
                let y = EARTH_RADIUS * ((1.0 + sin) / (1.0 - sin)).ln() / 2.0;
                (x, y)
            }
            Crs::Epsg4326 => (point.lng, point.lat),
        }
    }
}

/// Parse a WMS version string into `major.minor` as a number (`"1.3.0"` → 1.3).
fn parse_version(version: &str) -> Result<f64, ProviderError> {
    let unsupported = || ProviderError::UnsupportedVersion(version.to_string());

    let mut parts = version.trim().split('.');
    let major = parts.next().unwrap_or_default();
    let minor = parts.next().unwrap_or("0");
    if major.is_empty() || minor.is_empty() {
        return Err(unsupported());
    }
    format!("{}.{}", major, minor)
        .parse::<f64>()
        .map_err(|_| unsupported())
}

/// WMS non-tiled image provider.
///
/// # Example
///
/// ```
/// use nontiled::geo::GeoBounds;
/// use nontiled::provider::{Crs, ResourceUrlProvider, WmsProvider};
///
/// let provider = WmsProvider::new("https://wms.example.com/wms")
///     .with_param("layers", "roads")
///     .with_crs(Crs::Epsg4326);
/// let url = provider
///     .resource_url(&GeoBounds::new(-10.0, -20.0, 10.0, 20.0), 500, 400)
///     .unwrap();
/// assert!(url.ends_with("&width=500&height=400&bbox=-20,-10,20,10"));
/// ```
#[derive(Debug, Clone)]
pub struct WmsProvider {
    url: String,
    params: Vec<(String, String)>,
    crs: Crs,
    uppercase: bool,
}

impl WmsProvider {
    /// Create a provider for the service at `url` with default parameters.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            params: DEFAULT_PARAMS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            crs: Crs::Epsg3857,
            uppercase: false,
        }
    }

    /// Set one GetMap parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_param(key.into(), value.into());
        self
    }

    /// Set the CRS used for the bbox and the `srs`/`crs` parameter.
    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = crs;
        self
    }

    /// Send parameter names in upper case.
    pub fn with_uppercase(mut self, uppercase: bool) -> Self {
        self.uppercase = uppercase;
        self
    }

    /// Current value of a parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Configured CRS.
    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Protocol version as `major.minor`.
    pub fn version(&self) -> Result<f64, ProviderError> {
        parse_version(self.param("version").unwrap_or("1.1.1"))
    }

    fn insert_param(&mut self, key: String, value: String) {
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.params.push((key, value)),
        }
    }

    fn bbox(&self, bounds: &GeoBounds, version: f64) -> String {
        let (nw_x, nw_y) = self.crs.project(bounds.north_west());
        let (se_x, se_y) = self.crs.project(bounds.south_east());

        let corners = if version >= 1.3 && self.crs == Crs::Epsg4326 {
            [se_y, nw_x, nw_y, se_x]
        } else {
            [nw_x, se_y, se_x, nw_y]
        };
        corners
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl ResourceUrlProvider for WmsProvider {
    fn resource_url(
        &self,
        bounds: &GeoBounds,
        width: u32,
        height: u32,
    ) -> Result<String, ProviderError> {
        let version = self.version()?;
        let projection_key = if version >= 1.3 { "crs" } else { "srs" };

        let mut params = self.clone();
        params.insert_param(projection_key.to_string(), self.crs.code().to_string());
        params.insert_param("width".to_string(), width.to_string());
        params.insert_param("height".to_string(), height.to_string());

        let query = params
            .params
            .iter()
            .map(|(k, v)| {
                let key = if self.uppercase {
                    k.to_uppercase()
                } else {
                    k.clone()
                };
                format!("{}={}", urlencoding::encode(&key), urlencoding::encode(v))
            })
            .collect::<Vec<_>>()
            .join("&");

        let separator = if self.url.contains('?') { '&' } else { '?' };
        let bbox_key = if self.uppercase { "BBOX" } else { "bbox" };

        Ok(format!(
            "{}{}{}&{}={}",
            self.url,
            separator,
            query,
            bbox_key,
            self.bbox(bounds, version)
        ))
    }

    fn name(&self) -> &str {
        "WMS"
    }

    fn set_params(&mut self, params: &[(String, String)]) -> bool {
        for (key, value) in params {
            self.insert_param(key.clone(), value.clone());
        }
        !params.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://wms.example.com/service";

    fn bounds() -> GeoBounds {
        GeoBounds::new(-10.0, -20.0, 10.0, 20.0)
    }

    fn bbox_of(url: &str) -> Vec<f64> {
        let start = url.to_lowercase().rfind("bbox=").unwrap() + 5;
        url[start..]
            .split(',')
            .map(|c| c.parse::<f64>().unwrap())
            .collect()
    }

    #[test]
    fn test_url_construction_wms_111() {
        let provider = WmsProvider::new(BASE)
            .with_param("layers", "roads")
            .with_crs(Crs::Epsg4326);

        let url = provider.resource_url(&bounds(), 500, 400).unwrap();
        assert_eq!(
            url,
            "https://wms.example.com/service?service=WMS&request=GetMap&version=1.1.1\
             &layers=roads&styles=&format=image%2Fjpeg&transparent=false\
             &srs=EPSG%3A4326&width=500&height=400&bbox=-20,-10,20,10"
        );
    }

    #[test]
    fn test_wms_130_epsg4326_swaps_axis_order() {
        let provider = WmsProvider::new(BASE)
            .with_param("version", "1.3.0")
            .with_crs(Crs::Epsg4326);

        let url = provider.resource_url(&bounds(), 500, 400).unwrap();
        assert!(url.contains("&crs=EPSG%3A4326&"));
        assert!(!url.contains("srs="));
        assert!(url.ends_with("&bbox=-10,-20,10,20"));
    }

    #[test]
    fn test_wms_130_epsg3857_keeps_axis_order() {
        let provider = WmsProvider::new(BASE).with_param("version", "1.3.0");

        let url = provider.resource_url(&bounds(), 500, 400).unwrap();
        assert!(url.contains("&crs=EPSG%3A3857&"));
        let bbox = bbox_of(&url);
        assert!(bbox[0] < 0.0 && bbox[2] > 0.0, "x first: {:?}", bbox);
        assert!((bbox[2] - 2_226_389.815_9).abs() < 1.0);
        assert!((bbox[3] - 1_118_889.974_8).abs() < 1.0);
    }

    #[test]
    fn test_uppercase_parameter_names() {
        let provider = WmsProvider::new(BASE).with_uppercase(true);

        let url = provider.resource_url(&bounds(), 64, 64).unwrap();
        assert!(url.contains("?SERVICE=WMS&REQUEST=GetMap"));
        assert!(url.contains("&SRS=EPSG%3A3857&WIDTH=64&HEIGHT=64&BBOX="));
    }

    #[test]
    fn test_existing_query_string_uses_ampersand() {
        let provider = WmsProvider::new("https://wms.example.com/service?map=/data/world.map");
        let url = provider.resource_url(&bounds(), 64, 64).unwrap();
        assert!(url.starts_with("https://wms.example.com/service?map=/data/world.map&service=WMS"));
    }

    #[test]
    fn test_set_params_overrides_and_appends() {
        let mut provider = WmsProvider::new(BASE).with_param("layers", "roads");
        let changed = provider.set_params(&[
            ("layers".to_string(), "rivers".to_string()),
            ("time".to_string(), "2024-01-01".to_string()),
        ]);
        assert!(changed);
        assert_eq!(provider.param("layers"), Some("rivers"));

        let url = provider.resource_url(&bounds(), 64, 64).unwrap();
        assert!(url.contains("&layers=rivers&"));
        assert!(url.contains("&transparent=false&time=2024-01-01&srs="));
    }

    #[test]
    fn test_invalid_version() {
        let provider = WmsProvider::new(BASE).with_param("version", "latest");
        match provider.resource_url(&bounds(), 64, 64) {
            Err(ProviderError::UnsupportedVersion(v)) => assert_eq!(v, "latest"),
            other => panic!("Expected UnsupportedVersion, got {:?}", other),
        }
    }

    #[test]
    fn test_version_parsing() {
        assert_eq!(parse_version("1.1.1").unwrap(), 1.1);
        assert_eq!(parse_version("1.3.0").unwrap(), 1.3);
        assert_eq!(parse_version("2").unwrap(), 2.0);
        assert!(parse_version("").is_err());
    }

    #[test]
    fn test_crs_parse_and_project() {
        assert_eq!(Crs::parse("epsg:4326").unwrap(), Crs::Epsg4326);
        assert_eq!(Crs::parse("EPSG:900913").unwrap(), Crs::Epsg3857);
        assert!(Crs::parse("EPSG:27700").is_err());

        let (x, y) = Crs::Epsg3857.project(LatLng::new(0.0, 180.0));
        assert!((x - 20_037_508.342_789_244).abs() < 1e-6);
        assert!(y.abs() < 1e-6);

        assert_eq!(Crs::Epsg4326.project(LatLng::new(1.5, 2.5)), (2.5, 1.5));
    }
}
