//! Refresh requests.
//!
//! A [`Request`] is the immutable description of one image fetch: the clipped
//! geographic bounds, the pixel size after the scale multiplier, and the
//! [`RequestKey`] that later identifies its completion.

mod key;

pub use key::{RequestKey, EMPTY_KEY};

use crate::geo::GeoBounds;

/// Smallest width or height, in container pixels, worth requesting.
///
/// Viewports clipping to anything smaller are hidden instead of fetched.
pub const MIN_REQUEST_PIXELS: f64 = 32.0;

/// Multiplier applied to the requested size on high-density displays.
pub const RETINA_SCALE: u32 = 2;

/// One image request issued by the refresh cycle.
///
/// # Example
///
/// ```
/// use nontiled::geo::GeoBounds;
/// use nontiled::request::Request;
///
/// let bounds = GeoBounds::new(47.0, 6.0, 55.0, 15.0);
/// let request = Request::new(bounds, 1000, 800);
/// assert_eq!(request.width(), 1000);
/// assert_eq!(request.key(), Request::new(bounds, 1000, 800).key());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    bounds: GeoBounds,
    width: u32,
    height: u32,
    key: RequestKey,
}

impl Request {
    /// Create a request and derive its key.
    pub fn new(bounds: GeoBounds, width: u32, height: u32) -> Self {
        let key = RequestKey::for_request(&bounds, width, height);
        Self {
            bounds,
            width,
            height,
            key,
        }
    }

    /// Clipped geographic bounds of the image.
    pub fn bounds(&self) -> &GeoBounds {
        &self.bounds
    }

    /// Requested width in image pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Requested height in image pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Key identifying this request.
    pub fn key(&self) -> &RequestKey {
        &self.key
    }
}

/// Resolve the size multiplier for a layer.
///
/// Returns [`RETINA_SCALE`] when retina detection is enabled and the host
/// reports a device pixel ratio above 1, otherwise 1.
pub fn scale_multiplier(detect_retina: bool, device_pixel_ratio: f64) -> u32 {
    if detect_retina && device_pixel_ratio > 1.0 {
        RETINA_SCALE
    } else {
        1
    }
}

/// True when a container-pixel size is too small to request.
pub fn is_below_floor(width: f64, height: f64) -> bool {
    // NaN from degenerate projections compares false, so test the negation
    !(width >= MIN_REQUEST_PIXELS && height >= MIN_REQUEST_PIXELS)
}
