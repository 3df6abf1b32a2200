//! Geographic and pixel-space value types.

use std::fmt;

/// Southern edge of the default layer bounds (Web Mercator safe latitude).
pub const DEFAULT_SOUTH: f64 = -85.05;

/// Northern edge of the default layer bounds (Web Mercator safe latitude).
pub const DEFAULT_NORTH: f64 = 85.05;

/// Western edge of the default layer bounds.
pub const DEFAULT_WEST: f64 = -180.0;

/// Eastern edge of the default layer bounds.
pub const DEFAULT_EAST: f64 = 180.0;

/// A geographic point in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    /// Latitude in degrees (positive north)
    pub lat: f64,
    /// Longitude in degrees (positive east)
    pub lng: f64,
}

impl LatLng {
    /// Create a new geographic point.
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LatLng({}, {})", self.lat, self.lng)
    }
}

/// Geographic rectangle described by its four edges.
///
/// No antimeridian handling: `west` is expected to be less than `east`.
/// Rectangles produced by [`clip_bounds`](super::clip_bounds) may be inverted
/// when the inputs do not overlap; see [`GeoBounds::is_inverted`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    /// Southernmost latitude
    pub south: f64,
    /// Westernmost longitude
    pub west: f64,
    /// Northernmost latitude
    pub north: f64,
    /// Easternmost longitude
    pub east: f64,
}

impl GeoBounds {
    /// Create a rectangle from its edges.
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Create a rectangle from two opposite corners, in any order.
    pub fn from_corners(a: LatLng, b: LatLng) -> Self {
        Self {
            south: a.lat.min(b.lat),
            west: a.lng.min(b.lng),
            north: a.lat.max(b.lat),
            east: a.lng.max(b.lng),
        }
    }

    /// The near-full-world rectangle used when a layer does not configure bounds.
    pub fn world() -> Self {
        Self::new(DEFAULT_SOUTH, DEFAULT_WEST, DEFAULT_NORTH, DEFAULT_EAST)
    }

    /// North-west corner.
    pub fn north_west(&self) -> LatLng {
        LatLng::new(self.north, self.west)
    }

    /// South-east corner.
    pub fn south_east(&self) -> LatLng {
        LatLng::new(self.south, self.east)
    }

    /// Geographic center.
    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    /// True when the rectangle has no area (south above north, or west past east).
    pub fn is_inverted(&self) -> bool {
        self.south > self.north || self.west > self.east
    }

    /// True when every edge is a finite number.
    pub fn is_finite(&self) -> bool {
        self.south.is_finite()
            && self.west.is_finite()
            && self.north.is_finite()
            && self.east.is_finite()
    }

    /// True when `point` lies inside or on the edge of this rectangle.
    pub fn contains(&self, point: LatLng) -> bool {
        (self.south..=self.north).contains(&point.lat)
            && (self.west..=self.east).contains(&point.lng)
    }
}

impl Default for GeoBounds {
    fn default() -> Self {
        Self::world()
    }
}

impl fmt::Display for GeoBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.north_west(), self.south_east())
    }
}

/// A point in pixel space (container or layer relative).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    /// Create a new pixel point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Round both coordinates to whole pixels.
    pub fn round(self) -> Self {
        Self::new(self.x.round(), self.y.round())
    }

    /// Component-wise sum.
    pub fn add(self, other: PixelPoint) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }

    /// Component-wise difference.
    pub fn sub(self, other: PixelPoint) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelBounds {
    /// Top-left corner
    pub min: PixelPoint,
    /// Bottom-right corner
    pub max: PixelPoint,
}

impl PixelBounds {
    /// Create pixel bounds from two corners, normalizing their order.
    pub fn from_corners(a: PixelPoint, b: PixelPoint) -> Self {
        Self {
            min: PixelPoint::new(a.x.min(b.x), a.y.min(b.y)),
            max: PixelPoint::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Height in pixels.
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}
