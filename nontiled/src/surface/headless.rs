//! In-memory surfaces and pane.
//!
//! These implementations record every command they receive so that a driver
//! (the CLI simulator, or a test) can inspect what a real paint backend would
//! have shown. Whether a URL "loads" is decided by a [`ResourceResolver`].
//!
//! State lives behind `Arc<Mutex<_>>` so a [`PaneHandle`] obtained before the
//! pane is handed to the overlay keeps observing it afterwards.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::geo::PixelPoint;
use crate::surface::{
    CrossOrigin, LoadState, OverlayPane, PaneSpec, RenderMode, Surface, SurfaceSpec,
};

/// Decides the load outcome of a URL.
pub trait ResourceResolver: Send + Sync {
    fn resolve(&self, url: &str) -> LoadState;
}

impl<F> ResourceResolver for F
where
    F: Fn(&str) -> LoadState + Send + Sync,
{
    fn resolve(&self, url: &str) -> LoadState {
        self(url)
    }
}

/// Resolver under which every URL loads immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysLoad;

impl ResourceResolver for AlwaysLoad {
    fn resolve(&self, _url: &str) -> LoadState {
        LoadState::Loaded
    }
}

/// Resolver under which every URL stays pending until the driver reports it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverSettle;

impl ResourceResolver for NeverSettle {
    fn resolve(&self, _url: &str) -> LoadState {
        LoadState::Pending
    }
}

/// Recorded state of one headless surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceState {
    pub mode: RenderMode,
    pub cross_origin: Option<CrossOrigin>,
    pub width: f64,
    pub height: f64,
    pub position: PixelPoint,
    pub scale: f64,
    pub opacity: f64,
    pub invalid: bool,
    /// URL most recently assigned to the surface.
    pub src: Option<String>,
    /// Every URL the surface was asked to load, in order.
    pub loads: Vec<String>,
    /// URL last drawn into the canvas backing store (canvas mode only).
    pub drawn: Option<String>,
}

impl SurfaceState {
    fn new(spec: &SurfaceSpec) -> Self {
        Self {
            mode: spec.mode,
            cross_origin: spec.cross_origin,
            width: 0.0,
            height: 0.0,
            position: PixelPoint::default(),
            scale: 1.0,
            opacity: 1.0,
            invalid: false,
            src: None,
            loads: Vec::new(),
            drawn: None,
        }
    }
}

type SharedSurface = Arc<Mutex<SurfaceState>>;

fn lock(state: &SharedSurface) -> MutexGuard<'_, SurfaceState> {
    // A poisoned lock only means a panicking test thread; the data is still usable.
    state.lock().unwrap_or_else(|e| e.into_inner())
}

fn load_into(state: &SharedSurface, resolver: &dyn ResourceResolver, url: &str) -> LoadState {
    let mut s = lock(state);
    s.src = Some(url.to_string());
    s.loads.push(url.to_string());
    drop(s);
    resolver.resolve(url)
}

/// Surface that shows the resource as an image element sized in CSS pixels.
pub struct ImageSurface {
    state: SharedSurface,
    resolver: Arc<dyn ResourceResolver>,
}

impl Surface for ImageSurface {
    fn mode(&self) -> RenderMode {
        RenderMode::Image
    }

    fn set_size(&mut self, width: f64, height: f64) {
        let mut s = lock(&self.state);
        s.width = width;
        s.height = height;
    }

    fn set_position(&mut self, position: PixelPoint) {
        let mut s = lock(&self.state);
        s.position = position;
        s.scale = 1.0;
    }

    fn set_transform(&mut self, origin: PixelPoint, scale: f64) {
        let mut s = lock(&self.state);
        s.position = origin;
        s.scale = scale;
    }

    fn set_opacity(&mut self, opacity: f64) {
        lock(&self.state).opacity = opacity;
    }

    fn set_invalid(&mut self, invalid: bool) {
        lock(&self.state).invalid = invalid;
    }

    fn load(&mut self, url: &str) -> LoadState {
        load_into(&self.state, self.resolver.as_ref(), url)
    }
}

/// Surface that draws the loaded resource into a canvas backing store.
///
/// The backing store has whole-pixel dimensions; the drawn resource only
/// changes when [`Surface::present`] is called.
pub struct CanvasSurface {
    state: SharedSurface,
    resolver: Arc<dyn ResourceResolver>,
}

impl Surface for CanvasSurface {
    fn mode(&self) -> RenderMode {
        RenderMode::Canvas
    }

    fn set_size(&mut self, width: f64, height: f64) {
        let mut s = lock(&self.state);
        s.width = width.round();
        s.height = height.round();
        // Resizing a canvas clears it
        s.drawn = None;
    }

    fn set_position(&mut self, position: PixelPoint) {
        let mut s = lock(&self.state);
        s.position = position;
        s.scale = 1.0;
    }

    fn set_transform(&mut self, origin: PixelPoint, scale: f64) {
        let mut s = lock(&self.state);
        s.position = origin;
        s.scale = scale;
    }

    fn set_opacity(&mut self, opacity: f64) {
        lock(&self.state).opacity = opacity;
    }

    fn set_invalid(&mut self, invalid: bool) {
        lock(&self.state).invalid = invalid;
    }

    fn load(&mut self, url: &str) -> LoadState {
        load_into(&self.state, self.resolver.as_ref(), url)
    }

    fn present(&mut self) {
        let mut s = lock(&self.state);
        s.drawn = s.src.clone();
    }
}

/// Recorded state of a headless pane.
#[derive(Debug, Clone, PartialEq)]
pub struct PaneState {
    pub visible: bool,
    pub opacity: f64,
    pub z_index: Option<i32>,
    pub pointer_events: Option<String>,
    /// Stacking moves in order, `true` for front and `false` for back.
    pub restacks: Vec<bool>,
    pub removed: bool,
}

/// Inspection handle onto a [`HeadlessPane`].
#[derive(Clone)]
pub struct PaneHandle {
    pane: Arc<Mutex<PaneState>>,
    surfaces: Arc<Mutex<Vec<SharedSurface>>>,
}

impl PaneHandle {
    /// Snapshot of the container state.
    pub fn pane(&self) -> PaneState {
        self.pane.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Snapshot of the `index`-th created surface.
    pub fn surface(&self, index: usize) -> Option<SurfaceState> {
        let surfaces = self.surfaces.lock().unwrap_or_else(|e| e.into_inner());
        surfaces.get(index).map(|s| lock(s).clone())
    }

    /// Number of surfaces created so far.
    pub fn surface_count(&self) -> usize {
        self.surfaces.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// In-memory overlay pane.
///
/// # Example
///
/// ```
/// use nontiled::surface::headless::{AlwaysLoad, HeadlessPane};
///
/// let pane = HeadlessPane::new(AlwaysLoad);
/// let handle = pane.handle();
/// assert_eq!(handle.surface_count(), 0);
/// assert!(handle.pane().visible);
/// ```
pub struct HeadlessPane {
    handle: PaneHandle,
    resolver: Arc<dyn ResourceResolver>,
}

impl HeadlessPane {
    /// Create a pane whose surfaces resolve URLs with `resolver`.
    pub fn new(resolver: impl ResourceResolver + 'static) -> Self {
        Self::with_resolver(Arc::new(resolver))
    }

    /// Create a pane sharing an existing resolver.
    pub fn with_resolver(resolver: Arc<dyn ResourceResolver>) -> Self {
        Self {
            handle: PaneHandle {
                pane: Arc::new(Mutex::new(PaneState {
                    visible: true,
                    opacity: 1.0,
                    z_index: None,
                    pointer_events: None,
                    restacks: Vec::new(),
                    removed: false,
                })),
                surfaces: Arc::new(Mutex::new(Vec::new())),
            },
            resolver,
        }
    }

    /// Apply container presentation options.
    pub fn apply_spec(&mut self, spec: &PaneSpec) {
        let mut pane = self.pane_state();
        pane.opacity = spec.opacity;
        pane.z_index = spec.z_index;
        pane.pointer_events = spec.pointer_events.clone();
    }

    /// Handle for inspecting this pane after it has been handed out.
    pub fn handle(&self) -> PaneHandle {
        self.handle.clone()
    }

    fn pane_state(&self) -> MutexGuard<'_, PaneState> {
        self.handle.pane.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl OverlayPane for HeadlessPane {
    fn create_surface(&mut self, spec: &SurfaceSpec) -> Box<dyn Surface> {
        let state = Arc::new(Mutex::new(SurfaceState::new(spec)));
        self.handle
            .surfaces
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::clone(&state));

        let resolver = Arc::clone(&self.resolver);
        match spec.mode {
            RenderMode::Image => Box::new(ImageSurface { state, resolver }),
            RenderMode::Canvas => Box::new(CanvasSurface { state, resolver }),
        }
    }

    fn set_visible(&mut self, visible: bool) {
        self.pane_state().visible = visible;
    }

    fn set_opacity(&mut self, opacity: f64) {
        self.pane_state().opacity = opacity;
    }

    fn set_z_index(&mut self, z_index: i32) {
        self.pane_state().z_index = Some(z_index);
    }

    fn bring_to_front(&mut self) {
        self.pane_state().restacks.push(true);
    }

    fn bring_to_back(&mut self) {
        self.pane_state().restacks.push(false);
    }

    fn remove(&mut self) {
        self.pane_state().removed = true;
    }
}
