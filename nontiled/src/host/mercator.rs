//! Headless spherical Web Mercator host.
//!
//! Implements [`MapHost`] over the standard 256 px Web Mercator pixel pyramid,
//! with the same pixel-origin bookkeeping an interactive map keeps: layer
//! pixels are measured from an origin fixed at the last zoom change, and
//! panning only moves the map pane offset. Used by the CLI simulator and tests.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::sync::Arc;

use tracing::trace;

use crate::geo::{GeoBounds, LatLng, PixelPoint};
use crate::host::{HostEventKind, MapHost, SubscriptionId};
use crate::surface::headless::{AlwaysLoad, HeadlessPane, PaneHandle, ResourceResolver};
use crate::surface::{OverlayPane, PaneSpec};

/// Pixel size of one tile at zoom 0; the world is `TILE_SIZE * 2^zoom` wide.
pub const TILE_SIZE: f64 = 256.0;

/// Latitude limit of the square Web Mercator world.
const MAX_LATITUDE: f64 = 85.051_128_779_8;

fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2.0_f64.powf(zoom)
}

/// Project a geographic point to absolute world pixels at `zoom`.
fn project(point: LatLng, zoom: f64) -> PixelPoint {
    let n = world_size(zoom);
    let lat_rad = point.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();

    let x = (point.lng + 180.0) / 360.0 * n;
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n;
    PixelPoint::new(x, y)
}

/// Inverse of [`project`].
fn unproject(point: PixelPoint, zoom: f64) -> LatLng {
    let n = world_size(zoom);
    let lng = point.x / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * point.y / n)).sinh().atan().to_degrees();
    LatLng::new(lat, lng)
}

/// In-memory map host.
///
/// # Example
///
/// ```
/// use nontiled::geo::LatLng;
/// use nontiled::host::{MapHost, WebMercatorHost};
///
/// let host = WebMercatorHost::new(LatLng::new(0.0, 0.0), 2.0, 800.0, 600.0);
/// let bounds = host.visible_bounds();
/// assert!(bounds.west < 0.0 && bounds.east > 0.0);
/// assert_eq!(host.zoom_scale(3.0, 2.0), 2.0);
/// ```
pub struct WebMercatorHost {
    center: LatLng,
    zoom: f64,
    width: f64,
    height: f64,
    pixel_origin: PixelPoint,
    pane_position: PixelPoint,
    zoom_animated: bool,
    supports_canvas: bool,
    device_pixel_ratio: f64,
    resolver: Arc<dyn ResourceResolver>,
    subscriptions: BTreeMap<SubscriptionId, HostEventKind>,
    next_subscription: u64,
    pane: Option<PaneHandle>,
}

impl WebMercatorHost {
    /// Create a host centered on `center` with a `width` × `height` container.
    pub fn new(center: LatLng, zoom: f64, width: f64, height: f64) -> Self {
        let mut host = Self {
            center,
            zoom,
            width,
            height,
            pixel_origin: PixelPoint::default(),
            pane_position: PixelPoint::default(),
            zoom_animated: true,
            supports_canvas: true,
            device_pixel_ratio: 1.0,
            resolver: Arc::new(AlwaysLoad),
            subscriptions: BTreeMap::new(),
            next_subscription: 1,
            pane: None,
        };
        host.reset_origin();
        host
    }

    /// Decide URL load outcomes for panes created from now on.
    pub fn with_resolver(mut self, resolver: impl ResourceResolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Enable or disable animated zoom frames.
    pub fn with_zoom_animation(mut self, enabled: bool) -> Self {
        self.zoom_animated = enabled;
        self
    }

    /// Declare canvas support.
    pub fn with_canvas_support(mut self, supported: bool) -> Self {
        self.supports_canvas = supported;
        self
    }

    /// Set the device pixel ratio.
    pub fn with_device_pixel_ratio(mut self, ratio: f64) -> Self {
        self.device_pixel_ratio = ratio;
        self
    }

    /// Current center.
    pub fn center(&self) -> LatLng {
        self.center
    }

    fn half_size(&self) -> PixelPoint {
        PixelPoint::new(self.width / 2.0, self.height / 2.0)
    }

    fn reset_origin(&mut self) {
        self.pixel_origin = project(self.center, self.zoom).sub(self.half_size()).round();
        self.pane_position = PixelPoint::default();
    }

    /// Move the view. A zoom change resets the pixel origin; a pure pan
    /// only shifts the pane.
    pub fn set_view(&mut self, center: LatLng, zoom: f64) {
        self.center = center;
        if zoom != self.zoom {
            self.zoom = zoom;
            self.reset_origin();
        } else {
            let layer_center = project(center, zoom).sub(self.pixel_origin);
            self.pane_position = self.half_size().sub(layer_center).round();
        }
        trace!(lat = center.lat, lng = center.lng, zoom, "view set");
    }

    /// Pan by a pixel offset.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        let target = project(self.center, self.zoom).add(PixelPoint::new(dx, dy));
        self.set_view(unproject(target, self.zoom), self.zoom);
    }

    /// Resize the container.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.reset_origin();
    }

    /// Event kinds with a live registration, in registration order.
    pub fn active_subscriptions(&self) -> Vec<HostEventKind> {
        self.subscriptions.values().copied().collect()
    }

    /// Inspection handle onto the most recently created pane.
    pub fn pane_handle(&self) -> Option<PaneHandle> {
        self.pane.clone()
    }

    fn container_to_world(&self, point: PixelPoint) -> PixelPoint {
        point.sub(self.pane_position).add(self.pixel_origin)
    }
}

impl MapHost for WebMercatorHost {
    fn visible_bounds(&self) -> GeoBounds {
        let nw = self.container_to_world(PixelPoint::new(0.0, 0.0));
        let se = self.container_to_world(PixelPoint::new(self.width, self.height));
        GeoBounds::from_corners(unproject(nw, self.zoom), unproject(se, self.zoom))
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn container_size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn project_to_container(&self, point: LatLng) -> PixelPoint {
        self.project_to_layer(point).add(self.pane_position)
    }

    fn project_to_layer(&self, point: LatLng) -> PixelPoint {
        project(point, self.zoom).round().sub(self.pixel_origin)
    }

    fn project_to_layer_at(&self, point: LatLng, zoom: f64, center: LatLng) -> PixelPoint {
        let origin = project(center, zoom)
            .sub(self.half_size())
            .add(self.pane_position)
            .round();
        project(point, zoom).sub(origin)
    }

    fn zoom_scale(&self, to_zoom: f64, from_zoom: f64) -> f64 {
        2.0_f64.powf(to_zoom - from_zoom)
    }

    fn zoom_animated(&self) -> bool {
        self.zoom_animated
    }

    fn supports_canvas(&self) -> bool {
        self.supports_canvas
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }

    fn create_pane(&mut self, spec: &PaneSpec) -> Box<dyn OverlayPane> {
        let mut pane = HeadlessPane::with_resolver(Arc::clone(&self.resolver));
        pane.apply_spec(spec);
        self.pane = Some(pane.handle());
        Box::new(pane)
    }

    fn subscribe(&mut self, kind: HostEventKind) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscriptions.insert(id, kind);
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscriptions.remove(&id);
    }
}
