//! The two resource slots and the buffer swap.
//!
//! Slots live in a fixed two-element array; a single index says which one is
//! current. Requests always target the other one (the buffer), so the image
//! on screen stays visible until its replacement has loaded.

use crate::geo::{GeoBounds, PixelBounds, PixelPoint};
use crate::provider::Tag;
use crate::request::RequestKey;
use crate::surface::{LoadState, RenderMode, Surface};

/// Physical identity of a slot. Stable across swaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotId {
    First,
    Second,
}

impl SlotId {
    fn index(self) -> usize {
        match self {
            SlotId::First => 0,
            SlotId::Second => 1,
        }
    }

    fn from_index(index: usize) -> Self {
        if index == 0 {
            SlotId::First
        } else {
            SlotId::Second
        }
    }

    /// The other slot of the pair.
    pub fn other(self) -> Self {
        match self {
            SlotId::First => SlotId::Second,
            SlotId::Second => SlotId::First,
        }
    }
}

/// One paintable resource and the state bound to it.
pub struct ResourceSlot {
    surface: Box<dyn Surface>,
    /// Geographic bounds of the last request sized into this slot.
    pub(crate) bounds: Option<GeoBounds>,
    /// Layer-pixel bounds captured when the slot was sized; the zoom baseline.
    pub(crate) original: Option<PixelBounds>,
    /// Scale fixed when a new request is issued.
    pub(crate) scale: f64,
    /// Scale recomputed on every discrete zoom change.
    pub(crate) settle_scale: f64,
    /// Scale most recently applied to the surface.
    pub(crate) last_scale: f64,
    pub(crate) key: Option<RequestKey>,
    pub(crate) tag: Option<Tag>,
    src: Option<String>,
    opacity: f64,
    invalid: bool,
}

impl ResourceSlot {
    pub(crate) fn new(mut surface: Box<dyn Surface>, opacity: f64) -> Self {
        surface.set_opacity(opacity);
        Self {
            surface,
            bounds: None,
            original: None,
            scale: 1.0,
            settle_scale: 1.0,
            last_scale: 1.0,
            key: None,
            tag: None,
            src: None,
            opacity,
            invalid: false,
        }
    }

    /// Rendering mode of the underlying surface.
    pub fn mode(&self) -> RenderMode {
        self.surface.mode()
    }

    /// Bounds of the last request sized into this slot.
    pub fn bounds(&self) -> Option<&GeoBounds> {
        self.bounds.as_ref()
    }

    /// Key the slot is bound to.
    pub fn key(&self) -> Option<&RequestKey> {
        self.key.as_ref()
    }

    /// Provider payload of the loaded resource.
    pub fn tag(&self) -> Option<&Tag> {
        self.tag.as_ref()
    }

    /// URL last assigned to the surface.
    pub fn src(&self) -> Option<&str> {
        self.src.as_deref()
    }

    /// 0 while hidden or loading, 1 when shown.
    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    /// True while the slot shows the failure marker.
    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    /// Scale last applied during a zoom.
    pub fn last_scale(&self) -> f64 {
        self.last_scale
    }

    pub(crate) fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity;
        self.surface.set_opacity(opacity);
    }

    pub(crate) fn set_invalid(&mut self, invalid: bool) {
        if self.invalid != invalid {
            self.invalid = invalid;
            self.surface.set_invalid(invalid);
        }
    }

    pub(crate) fn clear_src(&mut self) {
        self.src = None;
    }

    pub(crate) fn load(&mut self, url: &str) -> LoadState {
        self.src = Some(url.to_string());
        self.surface.load(url)
    }

    pub(crate) fn place(&mut self, position: PixelPoint, width: f64, height: f64) {
        self.surface.set_position(position);
        self.surface.set_size(width, height);
    }

    pub(crate) fn transform(&mut self, origin: PixelPoint, scale: f64) {
        self.surface.set_transform(origin, scale);
    }

    fn present(&mut self) {
        self.surface.present();
    }
}

/// The current/buffer slot pair.
pub struct SlotPair {
    slots: [ResourceSlot; 2],
    current: usize,
}

impl SlotPair {
    /// Build the pair with `first` current and shown, `second` hidden.
    pub(crate) fn new(first: Box<dyn Surface>, second: Box<dyn Surface>) -> Self {
        Self {
            slots: [ResourceSlot::new(first, 1.0), ResourceSlot::new(second, 0.0)],
            current: 0,
        }
    }

    /// The slot currently on screen.
    pub fn current_id(&self) -> SlotId {
        SlotId::from_index(self.current)
    }

    /// The slot the next request targets.
    pub fn buffer_id(&self) -> SlotId {
        self.current_id().other()
    }

    pub fn get(&self, id: SlotId) -> &ResourceSlot {
        &self.slots[id.index()]
    }

    pub(crate) fn get_mut(&mut self, id: SlotId) -> &mut ResourceSlot {
        &mut self.slots[id.index()]
    }

    pub(crate) fn current_mut(&mut self) -> &mut ResourceSlot {
        &mut self.slots[self.current]
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut ResourceSlot {
        &mut self.slots[1 - self.current]
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut ResourceSlot> {
        self.slots.iter_mut()
    }

    /// Show `completed` and hide the other slot, then exchange roles.
    ///
    /// Only the buffer can be finalized. Returns `false`, changing nothing,
    /// when `completed` is already current.
    pub(crate) fn finalize(&mut self, completed: SlotId) -> bool {
        if completed != self.buffer_id() {
            return false;
        }
        let index = completed.index();
        self.slots[index].present();
        self.slots[index].set_opacity(1.0);
        self.slots[1 - index].set_opacity(0.0);
        self.current = index;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::headless::{AlwaysLoad, HeadlessPane, PaneHandle};
    use crate::surface::{OverlayPane, SurfaceSpec};

    fn pair(mode: RenderMode) -> (SlotPair, PaneHandle) {
        let mut pane = HeadlessPane::new(AlwaysLoad);
        let handle = pane.handle();
        let spec = SurfaceSpec {
            mode,
            cross_origin: None,
            zoom_animated: true,
        };
        let first = pane.create_surface(&spec);
        let second = pane.create_surface(&spec);
        (SlotPair::new(first, second), handle)
    }

    fn opacities(slots: &SlotPair) -> (f64, f64) {
        (
            slots.get(SlotId::First).opacity(),
            slots.get(SlotId::Second).opacity(),
        )
    }

    #[test]
    fn test_initial_roles() {
        let (slots, handle) = pair(RenderMode::Image);
        assert_eq!(slots.current_id(), SlotId::First);
        assert_eq!(slots.buffer_id(), SlotId::Second);
        assert_eq!(opacities(&slots), (1.0, 0.0));
        assert_eq!(handle.surface(1).unwrap().opacity, 0.0);
    }

    #[test]
    fn test_finalize_swaps_roles_and_opacity() {
        let (mut slots, handle) = pair(RenderMode::Image);

        assert!(slots.finalize(SlotId::Second));
        assert_eq!(slots.current_id(), SlotId::Second);
        assert_eq!(opacities(&slots), (0.0, 1.0));
        assert_eq!(handle.surface(0).unwrap().opacity, 0.0);
        assert_eq!(handle.surface(1).unwrap().opacity, 1.0);

        assert!(slots.finalize(SlotId::First));
        assert_eq!(slots.current_id(), SlotId::First);
        assert_eq!(opacities(&slots), (1.0, 0.0));
    }

    #[test]
    fn test_finalize_current_is_rejected() {
        let (mut slots, _) = pair(RenderMode::Image);
        assert!(!slots.finalize(SlotId::First));
        assert_eq!(slots.current_id(), SlotId::First);
        assert_eq!(opacities(&slots), (1.0, 0.0));
    }

    #[test]
    fn test_finalize_presents_canvas() {
        let (mut slots, handle) = pair(RenderMode::Canvas);
        slots.buffer_mut().load("a.png");
        assert_eq!(handle.surface(1).unwrap().drawn, None);

        slots.finalize(SlotId::Second);
        assert_eq!(handle.surface(1).unwrap().drawn.as_deref(), Some("a.png"));
    }

    #[test]
    fn test_invalid_marker_forwarded_once() {
        let (mut slots, handle) = pair(RenderMode::Image);
        let slot = slots.get_mut(SlotId::First);
        slot.set_invalid(true);
        assert!(slot.is_invalid());
        assert!(handle.surface(0).unwrap().invalid);

        slot.set_invalid(false);
        assert!(!handle.surface(0).unwrap().invalid);
    }

    #[test]
    fn test_slot_id_other() {
        assert_eq!(SlotId::First.other(), SlotId::Second);
        assert_eq!(SlotId::Second.other(), SlotId::First);
    }
}
