//! Geographic primitives and the viewport clipper.
//!
//! The clipper intersects the host's visible region with the layer's configured
//! bounds before a request is sized. It performs no wraparound handling: a
//! viewport crossing ±180° simply clips against the layer's west/east edges.

mod types;

pub use types::{
    GeoBounds, LatLng, PixelBounds, PixelPoint, DEFAULT_EAST, DEFAULT_NORTH, DEFAULT_SOUTH,
    DEFAULT_WEST,
};

/// Intersects the visible region with the layer bounds, edge by edge.
///
/// Always returns a rectangle. When the inputs do not overlap the result is
/// inverted (see [`GeoBounds::is_inverted`]); projected to pixels it yields a
/// non-positive width or height, which the refresh cycle treats as too small
/// to request.
#[inline]
pub fn clip_bounds(viewport: &GeoBounds, layer: &GeoBounds) -> GeoBounds {
    GeoBounds {
        south: viewport.south.max(layer.south),
        west: viewport.west.max(layer.west),
        north: viewport.north.min(layer.north),
        east: viewport.east.min(layer.east),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_viewport_inside_layer() {
        let viewport = GeoBounds::new(40.0, -75.0, 41.0, -73.0);
        let clipped = clip_bounds(&viewport, &GeoBounds::world());
        assert_eq!(clipped, viewport);
    }

    #[test]
    fn test_clip_truncates_polar_latitudes() {
        let viewport = GeoBounds::new(-89.0, -170.0, 89.0, 170.0);
        let clipped = clip_bounds(&viewport, &GeoBounds::world());
        assert_eq!(clipped.south, DEFAULT_SOUTH);
        assert_eq!(clipped.north, DEFAULT_NORTH);
        assert_eq!(clipped.west, -170.0);
        assert_eq!(clipped.east, 170.0);
    }

    #[test]
    fn test_clip_partial_overlap() {
        let viewport = GeoBounds::new(45.0, 5.0, 55.0, 15.0);
        let layer = GeoBounds::new(47.0, 6.0, 55.1, 15.0);
        let clipped = clip_bounds(&viewport, &layer);
        assert_eq!(clipped, GeoBounds::new(47.0, 6.0, 55.0, 15.0));
        assert!(!clipped.is_inverted());
    }

    #[test]
    fn test_clip_disjoint_is_inverted() {
        let viewport = GeoBounds::new(10.0, 10.0, 20.0, 20.0);
        let layer = GeoBounds::new(30.0, 30.0, 40.0, 40.0);
        let clipped = clip_bounds(&viewport, &layer);
        assert!(clipped.is_inverted());
    }

    #[test]
    fn test_clip_across_antimeridian_clamps_to_layer_edges() {
        let viewport = GeoBounds::new(-10.0, 170.0, 10.0, 190.0);
        let clipped = clip_bounds(&viewport, &GeoBounds::world());
        assert_eq!(clipped.east, DEFAULT_EAST);
        assert_eq!(clipped.west, 170.0);
    }

    #[test]
    fn test_corners_and_display() {
        let bounds = GeoBounds::from_corners(LatLng::new(10.0, 20.0), LatLng::new(-5.0, -15.0));
        assert_eq!(bounds.north_west(), LatLng::new(10.0, -15.0));
        assert_eq!(bounds.south_east(), LatLng::new(-5.0, 20.0));
        assert_eq!(bounds.to_string(), "LatLng(10, -15), LatLng(-5, 20)");
    }

    #[test]
    fn test_pixel_bounds_size() {
        let bounds =
            PixelBounds::from_corners(PixelPoint::new(500.0, 10.0), PixelPoint::new(0.0, 410.0));
        assert_eq!(bounds.min, PixelPoint::new(0.0, 10.0));
        assert_eq!(bounds.width(), 500.0);
        assert_eq!(bounds.height(), 400.0);
    }

    // Property-based tests using proptest
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn bounds_strategy() -> impl Strategy<Value = GeoBounds> {
            (-90.0..90.0_f64, -90.0..90.0_f64, -180.0..180.0_f64, -180.0..180.0_f64).prop_map(
                |(lat_a, lat_b, lng_a, lng_b)| {
                    GeoBounds::from_corners(LatLng::new(lat_a, lng_a), LatLng::new(lat_b, lng_b))
                },
            )
        }

        proptest! {
            #[test]
            fn test_clip_is_contained_in_both(
                viewport in bounds_strategy(),
                layer in bounds_strategy()
            ) {
                let clipped = clip_bounds(&viewport, &layer);
                prop_assume!(!clipped.is_inverted());

                prop_assert!(viewport.contains(clipped.north_west()));
                prop_assert!(viewport.contains(clipped.south_east()));
                prop_assert!(layer.contains(clipped.north_west()));
                prop_assert!(layer.contains(clipped.south_east()));
            }

            #[test]
            fn test_clip_is_commutative(
                a in bounds_strategy(),
                b in bounds_strategy()
            ) {
                prop_assert_eq!(clip_bounds(&a, &b), clip_bounds(&b, &a));
            }

            #[test]
            fn test_clip_is_idempotent(
                viewport in bounds_strategy(),
                layer in bounds_strategy()
            ) {
                let once = clip_bounds(&viewport, &layer);
                prop_assert_eq!(clip_bounds(&once, &layer), once);
            }
        }
    }
}
