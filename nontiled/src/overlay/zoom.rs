//! Zoom scale calculator.
//!
//! Keeps already-loaded images geometrically correct while the map zooms,
//! independently of any request in flight. Each slot carries three factors:
//!
//! - `scale`: fixed when a request is issued (1 for the target slot, the last
//!   applied scale for the slot left on screen)
//! - `settle_scale`: recomputed on each discrete zoom change as the ratio of the
//!   current pixel size to the size captured when the slot was sized
//! - `last_scale`: what was last applied to the surface
//!
//! A discrete settle always takes precedence over animation frames. It stores
//! the absolute scale in `settle_scale` and resets `scale` to 1, so frames that
//! follow in the same gesture cannot count the zoom twice.

use tracing::trace;

use crate::geo::{LatLng, PixelBounds};
use crate::host::MapHost;
use crate::overlay::ResourceSlot;

fn layer_bounds(slot: &ResourceSlot, host: &dyn MapHost) -> Option<PixelBounds> {
    slot.bounds.map(|bounds| {
        PixelBounds::from_corners(
            host.project_to_layer(bounds.north_west()),
            host.project_to_layer(bounds.south_east()),
        )
    })
}

/// Size and place a freshly targeted slot at the current view.
///
/// Captures the pixel snapshot later zoom scales are measured against.
pub(crate) fn reset_image(slot: &mut ResourceSlot, host: &dyn MapHost) {
    let Some(pixels) = layer_bounds(slot, host) else {
        return;
    };
    slot.place(pixels.min, pixels.width(), pixels.height());
    slot.original = Some(pixels);
    slot.settle_scale = 1.0;
}

/// Apply one animation frame of a zoom to `zoom` around `center`.
pub(crate) fn animate(slot: &mut ResourceSlot, host: &dyn MapHost, zoom: f64, center: LatLng) {
    let Some(bounds) = slot.bounds else {
        return;
    };
    let scale = slot.scale * slot.settle_scale * host.zoom_scale(zoom, host.zoom());
    let top_left = host.project_to_layer_at(bounds.north_west(), zoom, center);

    slot.transform(top_left, scale);
    slot.last_scale = scale;
    trace!(zoom, scale, "zoom frame");
}

/// Rescale after a discrete zoom change, anchored to the captured snapshot.
pub(crate) fn settle(slot: &mut ResourceSlot, host: &dyn MapHost) {
    let (Some(pixels), Some(original)) = (layer_bounds(slot, host), slot.original) else {
        return;
    };
    if original.height() <= 0.0 {
        return;
    }
    let scale = pixels.height() / original.height();

    slot.settle_scale = scale;
    slot.scale = 1.0;
    slot.last_scale = scale;
    slot.transform(pixels.min, scale);
    trace!(scale, "zoom settled");
}
