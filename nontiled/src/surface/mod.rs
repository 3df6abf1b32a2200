//! Paintable surfaces and the overlay pane.
//!
//! The refresh controller never touches a paint API directly. It drives two
//! [`Surface`]s, one per resource slot, through a small polymorphic interface,
//! and toggles container-level state through an [`OverlayPane`]. The rendering
//! mode (plain image element vs. off-screen canvas) is resolved once when the
//! overlay attaches and selects which concrete surface the pane creates.
//!
//! # Architecture
//!
//! ```text
//! MapHost ──create_pane──► OverlayPane ──create_surface(spec)──► Box<dyn Surface> ×2
//!                          (visibility,                          (size, position,
//!                           opacity, z-index)                     transform, load)
//! ```
//!
//! [`headless`] provides in-memory implementations used by the CLI and tests.

pub mod headless;

use crate::geo::PixelPoint;

/// How a slot's resource is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// The resource is shown directly as an image element.
    Image,
    /// The resource is drawn into an off-screen canvas once it has loaded.
    Canvas,
}

impl RenderMode {
    /// Resolve the mode from the layer option and the host capability.
    ///
    /// An explicit option wins; otherwise canvas is used when available.
    pub fn resolve(use_canvas: Option<bool>, canvas_supported: bool) -> Self {
        if use_canvas.unwrap_or(canvas_supported) {
            RenderMode::Canvas
        } else {
            RenderMode::Image
        }
    }
}

/// Cross-origin credential mode forwarded to surfaces as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossOrigin {
    Anonymous,
    UseCredentials,
}

impl CrossOrigin {
    /// The attribute value understood by browsers.
    pub fn as_str(&self) -> &'static str {
        match self {
            CrossOrigin::Anonymous => "anonymous",
            CrossOrigin::UseCredentials => "use-credentials",
        }
    }

    /// Parse the attribute value.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "anonymous" | "" => Some(CrossOrigin::Anonymous),
            "use-credentials" => Some(CrossOrigin::UseCredentials),
            _ => None,
        }
    }
}

/// Outcome of asking a surface to load a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// The resource is ready to be shown.
    Loaded,
    /// The resource could not be loaded or decoded.
    Failed,
    /// Loading continues; the host reports the outcome later through
    /// [`NonTiledOverlay::resource_loaded`](crate::overlay::NonTiledOverlay::resource_loaded)
    /// or [`NonTiledOverlay::resource_failed`](crate::overlay::NonTiledOverlay::resource_failed).
    Pending,
}

/// Parameters used to create the two slot surfaces.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSpec {
    pub mode: RenderMode,
    pub cross_origin: Option<CrossOrigin>,
    /// Whether the host animates zoom with transforms (otherwise surfaces hide during zoom).
    pub zoom_animated: bool,
}

/// Container-level presentation applied when the pane is created.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PaneSpec {
    pub opacity: f64,
    pub z_index: Option<i32>,
    pub pointer_events: Option<String>,
}

/// One paintable resource owned by a slot.
pub trait Surface {
    /// The rendering mode this surface implements.
    fn mode(&self) -> RenderMode;

    /// Resize the paintable area, in layer pixels.
    fn set_size(&mut self, width: f64, height: f64);

    /// Move the top-left corner, in layer pixels, clearing any scale.
    fn set_position(&mut self, position: PixelPoint);

    /// Apply a translate-then-scale transform.
    fn set_transform(&mut self, origin: PixelPoint, scale: f64);

    /// Set the opacity (the controller only uses 0 and 1).
    fn set_opacity(&mut self, opacity: f64);

    /// Toggle the visual "invalid" marker shown after a failed load.
    fn set_invalid(&mut self, invalid: bool);

    /// Start loading `url` into this surface.
    fn load(&mut self, url: &str) -> LoadState;

    /// Commit the loaded resource for display. Canvas surfaces draw here.
    fn present(&mut self) {}
}

/// The container holding both slot surfaces.
pub trait OverlayPane {
    /// Create a surface for one slot.
    fn create_surface(&mut self, spec: &SurfaceSpec) -> Box<dyn Surface>;

    /// Show or hide the whole container.
    fn set_visible(&mut self, visible: bool);

    /// Set the container opacity.
    fn set_opacity(&mut self, opacity: f64);

    /// Set the stacking order.
    fn set_z_index(&mut self, z_index: i32);

    /// Move the container above its siblings.
    fn bring_to_front(&mut self);

    /// Move the container below its siblings.
    fn bring_to_back(&mut self);

    /// Detach the container and its surfaces from the host.
    fn remove(&mut self);
}
