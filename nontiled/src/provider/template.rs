//! URL template provider.
//!
//! Fills a URL template with the request geometry, for services that take a
//! bounding box and image size in a fixed URL layout (ArcGIS `export`,
//! MapServer CGI, custom renderers).
//!
//! # Placeholders
//!
//! - `{west}`, `{south}`, `{east}`, `{north}` - bounds edges in degrees
//! - `{bbox}` - `west,south,east,north`
//! - `{width}`, `{height}` - image size in pixels

use regex::Regex;

use crate::geo::GeoBounds;
use crate::provider::{ProviderError, ResourceUrlProvider};

const PLACEHOLDERS: &[&str] = &["west", "south", "east", "north", "bbox", "width", "height"];

/// Provider that renders a URL template.
///
/// # Example
///
/// ```
/// use nontiled::geo::GeoBounds;
/// use nontiled::provider::{ResourceUrlProvider, TemplateProvider};
///
/// let provider = TemplateProvider::new(
///     "https://maps.example.com/export?bbox={bbox}&size={width},{height}",
/// )
/// .unwrap();
/// let url = provider
///     .resource_url(&GeoBounds::new(1.0, 2.0, 3.0, 4.0), 640, 480)
///     .unwrap();
/// assert_eq!(url, "https://maps.example.com/export?bbox=2,1,4,3&size=640,480");
/// ```
#[derive(Debug, Clone)]
pub struct TemplateProvider {
    template: String,
    pattern: Regex,
}

impl TemplateProvider {
    /// Parse and validate a template.
    pub fn new(template: impl Into<String>) -> Result<Self, ProviderError> {
        let template = template.into();
        let pattern = Regex::new(r"\{([A-Za-z_]+)\}")
            .map_err(|e| ProviderError::InvalidTemplate(e.to_string()))?;

        let mut found = 0;
        for captures in pattern.captures_iter(&template) {
            let name = &captures[1];
            if !PLACEHOLDERS.contains(&name) {
                return Err(ProviderError::InvalidTemplate(format!(
                    "unknown placeholder {{{}}}",
                    name
                )));
            }
            found += 1;
        }
        if found == 0 {
            return Err(ProviderError::InvalidTemplate(format!(
                "no placeholders in '{}'",
                template
            )));
        }

        Ok(Self { template, pattern })
    }

    /// The template string.
    pub fn template(&self) -> &str {
        &self.template
    }
}

impl ResourceUrlProvider for TemplateProvider {
    fn resource_url(
        &self,
        bounds: &GeoBounds,
        width: u32,
        height: u32,
    ) -> Result<String, ProviderError> {
        let url = self
            .pattern
            .replace_all(&self.template, |captures: &regex::Captures| {
                match &captures[1] {
                    "west" => bounds.west.to_string(),
                    "south" => bounds.south.to_string(),
                    "east" => bounds.east.to_string(),
                    "north" => bounds.north.to_string(),
                    "bbox" => format!(
                        "{},{},{},{}",
                        bounds.west, bounds.south, bounds.east, bounds.north
                    ),
                    "width" => width.to_string(),
                    "height" => height.to_string(),
                    // Validated in new()
                    other => format!("{{{}}}", other),
                }
            });
        Ok(url.into_owned())
    }

    fn name(&self) -> &str {
        "Template"
    }
}
