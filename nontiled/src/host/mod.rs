//! Host map contract.
//!
//! The host owns the viewport and the paint tree. The overlay reads the
//! viewport fresh on every cycle through [`MapHost`], never caching it, and
//! registers for the three event kinds it reacts to at attach time.
//!
//! Event delivery stays with the host: the embedding code forwards each
//! [`HostEvent`] to
//! [`NonTiledOverlay::handle_event`](crate::overlay::NonTiledOverlay::handle_event).
//! The subscription ids returned by [`MapHost::subscribe`] are held by the
//! overlay and released symmetrically on detach.

mod mercator;

pub use mercator::{WebMercatorHost, TILE_SIZE};

use crate::geo::{GeoBounds, LatLng, PixelPoint};
use crate::surface::{OverlayPane, PaneSpec};

/// Identifier of one event registration on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

/// Event kinds an overlay subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostEventKind {
    /// The viewport settled after a pan or zoom.
    ViewportSettled,
    /// One frame of an animated zoom gesture.
    ZoomFrame,
    /// The zoom level changed, with or without animation.
    ZoomChanged,
}

/// Events delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    /// The viewport settled (pan end, zoom end, resize).
    ViewportSettled,
    /// Zoom animation frame targeting `zoom` around `center`.
    ZoomFrame { zoom: f64, center: LatLng },
    /// The zoom level changed.
    ZoomChanged,
}

impl HostEvent {
    /// The subscription kind this event belongs to.
    pub fn kind(&self) -> HostEventKind {
        match self {
            HostEvent::ViewportSettled => HostEventKind::ViewportSettled,
            HostEvent::ZoomFrame { .. } => HostEventKind::ZoomFrame,
            HostEvent::ZoomChanged => HostEventKind::ZoomChanged,
        }
    }
}

/// The map/viewport API the overlay consumes.
pub trait MapHost {
    /// Geographic region currently visible in the container.
    fn visible_bounds(&self) -> GeoBounds;

    /// Current zoom level.
    fn zoom(&self) -> f64;

    /// Container size in pixels.
    fn container_size(&self) -> (f64, f64);

    /// Project a point to container-relative pixels (used for sizing decisions).
    fn project_to_container(&self, point: LatLng) -> PixelPoint;

    /// Project a point to layer pixels (used for placing surfaces).
    fn project_to_layer(&self, point: LatLng) -> PixelPoint;

    /// Project a point to the layer pixels it will have once a zoom to
    /// `zoom` around `center` completes.
    fn project_to_layer_at(&self, point: LatLng, zoom: f64, center: LatLng) -> PixelPoint;

    /// Ratio between the pixel scales of two zoom levels.
    fn zoom_scale(&self, to_zoom: f64, from_zoom: f64) -> f64;

    /// Whether zoom changes are animated frame by frame.
    fn zoom_animated(&self) -> bool {
        true
    }

    /// Whether canvas surfaces are available.
    fn supports_canvas(&self) -> bool {
        true
    }

    /// Device pixel ratio of the display.
    fn device_pixel_ratio(&self) -> f64 {
        1.0
    }

    /// Create the container the overlay paints into.
    fn create_pane(&mut self, spec: &PaneSpec) -> Box<dyn OverlayPane>;

    /// Register interest in an event kind.
    fn subscribe(&mut self, kind: HostEventKind) -> SubscriptionId;

    /// Release a registration made with [`MapHost::subscribe`].
    fn unsubscribe(&mut self, id: SubscriptionId);
}

/// The viewport as read at the start of one refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub bounds: GeoBounds,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// Read the current viewport from the host.
    pub fn read(host: &dyn MapHost) -> Self {
        let (width, height) = host.container_size();
        Self {
            bounds: host.visible_bounds(),
            zoom: host.zoom(),
            width,
            height,
        }
    }

    /// True when `zoom` lies within `[min_zoom, max_zoom]`.
    pub fn zoom_within(&self, min_zoom: i32, max_zoom: i32) -> bool {
        self.zoom >= f64::from(min_zoom) && self.zoom <= f64::from(max_zoom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kinds() {
        assert_eq!(
            HostEvent::ViewportSettled.kind(),
            HostEventKind::ViewportSettled
        );
        assert_eq!(
            HostEvent::ZoomFrame {
                zoom: 3.0,
                center: LatLng::new(0.0, 0.0)
            }
            .kind(),
            HostEventKind::ZoomFrame
        );
        assert_eq!(HostEvent::ZoomChanged.kind(), HostEventKind::ZoomChanged);
    }

    #[test]
    fn test_zoom_within() {
        let viewport = Viewport {
            bounds: GeoBounds::world(),
            zoom: 10.0,
            width: 800.0,
            height: 600.0,
        };
        assert!(viewport.zoom_within(0, 18));
        assert!(viewport.zoom_within(10, 10));
        assert!(!viewport.zoom_within(11, 18));
        assert!(!viewport.zoom_within(0, 9));
    }
}
