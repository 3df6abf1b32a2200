//! The non-tiled overlay refresh controller.
//!
//! [`NonTiledOverlay`] shows one server-rendered image over the whole
//! viewport and replaces it whenever the viewport settles.
//!
//! # Refresh cycle
//!
//! ```text
//! ViewportSettled ─► clip ─► degenerate? ──yes──► Hidden (empty resource, no fetch)
//!                              │ no
//!                              ▼
//!                    key ─► `loading` ─► provider ─┬─ sync: URL now
//!                                                  └─ async: URL later, via sink
//!                                                            │
//!                    staleness guard (key == latest?) ◄──────┘
//!                              │ yes
//!                              ▼
//!                    load into buffer slot ─► swap ─► `load`
//! ```
//!
//! Requests are never cancelled. Every completion carries the key it was
//! issued with and is dropped unless that key is still the latest one, both
//! when the provider answers and when the resource finishes loading.
//!
//! Zoom frames and discrete zoom changes rescale whatever the two slots show
//! without touching the fetch state (see the `zoom` module).
//!
//! # Driving an overlay
//!
//! The host owns event delivery. Forward its events with
//! [`NonTiledOverlay::handle_event`], report resource outcomes that completed
//! asynchronously with [`NonTiledOverlay::resource_loaded`] and
//! [`NonTiledOverlay::resource_failed`], and drain async provider completions
//! with [`NonTiledOverlay::process_completions`].

mod error;
mod events;
mod factory;
mod orchestrator;
mod slots;
mod zoom;

pub use error::OverlayError;
pub use events::{EventEmitter, EventKind, ListenerId, OverlayEvent};
pub use factory::{non_tiled_layer, template_layer, wms_layer};
pub use slots::{ResourceSlot, SlotId, SlotPair};

use tracing::{debug, info, warn};

use crate::config::{validate_opacity, LayerConfig, EMPTY_RESOURCE_URL};
use crate::geo::{clip_bounds, LatLng};
use crate::host::{HostEvent, HostEventKind, MapHost, SubscriptionId, Viewport};
use crate::provider::{Completion, FetchProvider};
use crate::request::{is_below_floor, scale_multiplier, Request, RequestKey};
use crate::surface::{LoadState, OverlayPane, PaneSpec, RenderMode, SurfaceSpec};
use orchestrator::{Issued, Orchestrator};

/// Where the refresh cycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    /// Not attached to a host.
    Detached,
    /// The last request was shown, or failed.
    Idle,
    /// The viewport is degenerate; nothing is requested.
    Hidden,
    /// Waiting for an async provider to deliver the URL.
    AwaitingUrl,
    /// The URL is known; waiting for the resource to load.
    AwaitingResource,
}

/// Everything that only exists while attached.
struct Attachment {
    pane: Box<dyn OverlayPane>,
    slots: SlotPair,
    subscriptions: Vec<SubscriptionId>,
    mode: RenderMode,
    visible: bool,
    phase: RefreshPhase,
}

/// Double-buffered overlay showing one dynamically rendered image.
///
/// # Example
///
/// ```
/// use nontiled::config::LayerConfig;
/// use nontiled::geo::LatLng;
/// use nontiled::host::{HostEvent, WebMercatorHost};
/// use nontiled::overlay::{wms_layer, RefreshPhase};
///
/// let mut host = WebMercatorHost::new(LatLng::new(50.0, 8.0), 10.0, 800.0, 600.0);
/// let mut overlay = wms_layer(
///     "https://wms.example.com/wms",
///     &[("layers", "roads")],
///     LayerConfig::default(),
/// )
/// .unwrap();
///
/// overlay.attach(&mut host).unwrap();
/// assert_eq!(overlay.phase(), RefreshPhase::Idle);
///
/// host.pan_by(200.0, 0.0);
/// overlay.handle_event(&host, HostEvent::ViewportSettled);
/// overlay.detach(&mut host).unwrap();
/// ```
pub struct NonTiledOverlay {
    config: LayerConfig,
    orchestrator: Orchestrator,
    events: EventEmitter,
    attachment: Option<Attachment>,
}

impl NonTiledOverlay {
    /// Create a detached overlay. The configuration is validated.
    pub fn new(config: LayerConfig, provider: FetchProvider) -> Result<Self, OverlayError> {
        config.validate()?;
        Ok(Self {
            config,
            orchestrator: Orchestrator::new(provider),
            events: EventEmitter::new(),
            attachment: None,
        })
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn provider(&self) -> &FetchProvider {
        self.orchestrator.provider()
    }

    pub fn attribution(&self) -> &str {
        &self.config.attribution
    }

    pub fn is_attached(&self) -> bool {
        self.attachment.is_some()
    }

    /// Rendering mode chosen at attach time.
    pub fn render_mode(&self) -> Option<RenderMode> {
        self.attachment.as_ref().map(|a| a.mode)
    }

    pub fn phase(&self) -> RefreshPhase {
        self.attachment
            .as_ref()
            .map_or(RefreshPhase::Detached, |a| a.phase)
    }

    /// Key of the most recent request, or the empty sentinel while hidden.
    pub fn latest_key(&self) -> Option<&RequestKey> {
        self.orchestrator.latest_key()
    }

    /// Whether the container is shown.
    pub fn is_visible(&self) -> bool {
        self.attachment.as_ref().is_some_and(|a| a.visible)
    }

    /// The slot pair, while attached.
    pub fn slots(&self) -> Option<&SlotPair> {
        self.attachment.as_ref().map(|a| &a.slots)
    }

    /// Register an event listener.
    pub fn on(
        &mut self,
        kind: EventKind,
        listener: impl FnMut(&OverlayEvent) + 'static,
    ) -> ListenerId {
        self.events.on(kind, listener)
    }

    /// Remove an event listener.
    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    // ==================== Lifecycle ====================

    /// Create the pane and both slots, subscribe to host events and run the
    /// first refresh.
    pub fn attach(&mut self, host: &mut dyn MapHost) -> Result<(), OverlayError> {
        if self.attachment.is_some() {
            return Err(OverlayError::AlreadyAttached);
        }

        let mode = RenderMode::resolve(self.config.use_canvas, host.supports_canvas());
        let zoom_animated = host.zoom_animated();

        let mut pane = host.create_pane(&PaneSpec {
            opacity: self.config.opacity,
            z_index: self.config.z_index,
            pointer_events: self.config.pointer_events.clone(),
        });
        let spec = SurfaceSpec {
            mode,
            cross_origin: self.config.cross_origin,
            zoom_animated,
        };
        let first = pane.create_surface(&spec);
        let second = pane.create_surface(&spec);

        let mut subscriptions = vec![
            host.subscribe(HostEventKind::ViewportSettled),
            host.subscribe(HostEventKind::ZoomChanged),
        ];
        if zoom_animated {
            subscriptions.push(host.subscribe(HostEventKind::ZoomFrame));
        }

        self.attachment = Some(Attachment {
            pane,
            slots: SlotPair::new(first, second),
            subscriptions,
            mode,
            visible: true,
            phase: RefreshPhase::Idle,
        });
        info!(
            provider = self.orchestrator.provider().name(),
            ?mode,
            zoom_animated,
            "Overlay attached"
        );

        self.update(&*host);
        Ok(())
    }

    /// Release every host subscription made at attach time and remove the pane.
    ///
    /// Completions still queued are discarded; requests still running are
    /// left to finish and will be ignored.
    pub fn detach(&mut self, host: &mut dyn MapHost) -> Result<(), OverlayError> {
        let mut attachment = self.attachment.take().ok_or(OverlayError::NotAttached)?;

        for id in attachment.subscriptions.drain(..) {
            host.unsubscribe(id);
        }
        attachment.pane.remove();

        let discarded = self.orchestrator.discard_pending();
        info!(discarded, "Overlay detached");
        Ok(())
    }

    /// React to a host event.
    pub fn handle_event(&mut self, host: &dyn MapHost, event: HostEvent) {
        match event {
            HostEvent::ViewportSettled => self.update(host),
            HostEvent::ZoomFrame { zoom, center } => self.animate_zoom(host, zoom, center),
            HostEvent::ZoomChanged => self.settle_zoom(host),
        }
    }

    /// Re-run the refresh cycle. Does nothing while detached.
    pub fn redraw(&mut self, host: &dyn MapHost) {
        if self.attachment.is_some() {
            self.update(host);
        }
    }

    // ==================== Presentation ====================

    /// Change the container opacity.
    pub fn set_opacity(&mut self, opacity: f64) -> Result<(), OverlayError> {
        validate_opacity(opacity)?;
        self.config.opacity = opacity;
        if let Some(attachment) = self.attachment.as_mut() {
            attachment.pane.set_opacity(opacity);
        }
        Ok(())
    }

    /// Change the stacking order. Zero is ignored.
    pub fn set_z_index(&mut self, z_index: i32) {
        if z_index == 0 {
            return;
        }
        self.config.z_index = Some(z_index);
        if let Some(attachment) = self.attachment.as_mut() {
            attachment.pane.set_z_index(z_index);
        }
    }

    pub fn bring_to_front(&mut self) {
        if let Some(attachment) = self.attachment.as_mut() {
            attachment.pane.bring_to_front();
        }
    }

    pub fn bring_to_back(&mut self) {
        if let Some(attachment) = self.attachment.as_mut() {
            attachment.pane.bring_to_back();
        }
    }

    /// Merge provider parameters and redraw unless `no_redraw` is set.
    ///
    /// Returns `false` when the provider has no parameters to update.
    pub fn set_params(
        &mut self,
        host: &dyn MapHost,
        params: &[(String, String)],
        no_redraw: bool,
    ) -> bool {
        let changed = self.orchestrator.provider_mut().set_params(params);
        if changed && !no_redraw {
            self.redraw(host);
        }
        changed
    }

    // ==================== Completions ====================

    /// Apply every queued async completion. Returns how many were processed.
    pub fn process_completions(&mut self) -> usize {
        let mut processed = 0;
        while let Some(completion) = self.orchestrator.try_next() {
            self.apply_completion(completion);
            processed += 1;
        }
        processed
    }

    /// Wait for the next async completion and apply it.
    ///
    /// The overlay keeps a sender of its own, so this waits until a provider
    /// delivers; bound it with a timeout when no delivery may come.
    pub async fn wait_for_completion(&mut self) {
        if let Some(completion) = self.orchestrator.next().await {
            self.apply_completion(completion);
        }
    }

    /// Report that `url` finished loading into `slot`.
    ///
    /// Reports for a URL the slot no longer holds are ignored.
    pub fn resource_loaded(&mut self, slot: SlotId, url: &str) {
        let Some(attachment) = self.attachment.as_mut() else {
            return;
        };
        let resource = attachment.slots.get_mut(slot);
        if resource.src() != Some(url) {
            debug!(?slot, url, "Ignoring load of a replaced resource");
            return;
        }
        resource.set_invalid(false);

        if url == self.config.error_resource_url {
            debug!(?slot, "Fallback resource loaded");
            return;
        }

        let Some(key) = resource.key.clone() else {
            return;
        };
        if !self.orchestrator.accept(&key) {
            debug!(?slot, key = %key, "Dropping stale resource");
            return;
        }
        if slot != attachment.slots.buffer_id() {
            debug!(?slot, key = %key, "Resource already on screen");
            return;
        }
        self.finalize(slot);
    }

    /// Report that `url` failed to load into `slot`.
    ///
    /// Only the buffer slot is failed over to the fallback; the slot on
    /// screen keeps what it shows.
    pub fn resource_failed(&mut self, slot: SlotId, url: &str) {
        let Some(attachment) = self.attachment.as_ref() else {
            return;
        };
        if attachment.slots.get(slot).src() != Some(url) {
            debug!(?slot, url, "Ignoring failure of a replaced resource");
            return;
        }
        if slot != attachment.slots.buffer_id() {
            debug!(?slot, url, "Ignoring failure reported for the shown slot");
            return;
        }
        self.fail_slot(slot, Some(url.to_string()));
    }

    // ==================== Refresh cycle ====================

    fn update(&mut self, host: &dyn MapHost) {
        let Some(attachment) = self.attachment.as_mut() else {
            return;
        };

        let viewport = Viewport::read(host);
        let clipped = clip_bounds(&viewport.bounds, &self.config.bounds);
        let nw = host.project_to_container(clipped.north_west());
        let se = host.project_to_container(clipped.south_east());
        let (width, height) = (se.x - nw.x, se.y - nw.y);

        let visible = attachment.slots.current_mut();
        visible.scale = visible.last_scale;
        visible.settle_scale = 1.0;

        let target_id = attachment.slots.buffer_id();
        let target = attachment.slots.buffer_mut();
        target.scale = 1.0;
        target.last_scale = 1.0;
        target.tag = None;
        target.clear_src();
        target.set_opacity(0.0);

        if !viewport.zoom_within(self.config.min_zoom, self.config.max_zoom)
            || is_below_floor(width, height)
        {
            debug!(zoom = viewport.zoom, width, height, "Nothing to request, hiding overlay");
            target.bounds = None;
            target.key = Some(RequestKey::empty());
            self.orchestrator.mark_empty();

            attachment.pane.set_visible(false);
            attachment.visible = false;
            attachment.phase = RefreshPhase::Hidden;

            let state = target.load(EMPTY_RESOURCE_URL);
            self.apply_load_state(target_id, EMPTY_RESOURCE_URL, state);
            return;
        }

        target.bounds = Some(clipped);
        zoom::reset_image(target, host);

        let multiplier = f64::from(scale_multiplier(
            self.config.detect_retina,
            host.device_pixel_ratio(),
        ));
        let request = Request::new(
            clipped,
            (width * multiplier).round() as u32,
            (height * multiplier).round() as u32,
        );
        target.key = Some(request.key().clone());
        attachment.phase = RefreshPhase::AwaitingUrl;

        self.events.emit(&OverlayEvent::Loading {
            key: request.key().clone(),
        });

        match self.orchestrator.issue(target_id, &request) {
            Issued::Ready(url) => {
                attachment.phase = RefreshPhase::AwaitingResource;
                let state = attachment.slots.get_mut(target_id).load(&url);
                self.apply_load_state(target_id, &url, state);
            }
            Issued::Failed(e) => {
                warn!(error = %e, key = %request.key(), "Provider could not build a URL");
                self.fail_slot(target_id, None);
            }
            Issued::Awaiting => {}
        }
    }

    fn apply_completion(&mut self, completion: Completion) {
        let Some(attachment) = self.attachment.as_mut() else {
            return;
        };
        let Completion {
            slot,
            key,
            url,
            tag,
        } = completion;

        if !self.orchestrator.accept(&key) {
            debug!(?slot, key = %key, "Dropping stale completion");
            return;
        }
        if slot != attachment.slots.buffer_id() {
            debug!(?slot, key = %key, "Dropping completion for a slot already on screen");
            return;
        }

        attachment.phase = RefreshPhase::AwaitingResource;
        let resource = attachment.slots.get_mut(slot);
        resource.key = Some(key);
        resource.tag = tag;
        let state = resource.load(&url);
        self.apply_load_state(slot, &url, state);
    }

    fn apply_load_state(&mut self, slot: SlotId, url: &str, state: LoadState) {
        match state {
            LoadState::Loaded => self.resource_loaded(slot, url),
            LoadState::Failed => self.resource_failed(slot, url),
            LoadState::Pending => {}
        }
    }

    /// Fire `error`, mark the slot and substitute the fallback resource.
    ///
    /// The fallback is substituted at most once: if it fails too, the slot
    /// stays marked invalid.
    fn fail_slot(&mut self, slot: SlotId, url: Option<String>) {
        let Some(attachment) = self.attachment.as_mut() else {
            return;
        };
        warn!(?slot, url = url.as_deref().unwrap_or("<none>"), "Resource failed");
        self.events.emit(&OverlayEvent::Error {
            slot,
            url: url.clone(),
        });

        if slot == attachment.slots.buffer_id()
            && matches!(
                attachment.phase,
                RefreshPhase::AwaitingUrl | RefreshPhase::AwaitingResource
            )
        {
            attachment.phase = RefreshPhase::Idle;
        }

        let resource = attachment.slots.get_mut(slot);
        resource.set_invalid(true);

        let fallback = self.config.error_resource_url.clone();
        if url.as_deref() == Some(fallback.as_str()) {
            return;
        }
        let state = resource.load(&fallback);
        self.apply_load_state(slot, &fallback, state);
    }

    /// Swap `slot` in and fire `load`.
    fn finalize(&mut self, slot: SlotId) {
        let Some(attachment) = self.attachment.as_mut() else {
            return;
        };
        if !attachment.slots.finalize(slot) {
            return;
        }

        let shown = attachment.slots.get(slot);
        let key = shown.key.clone().unwrap_or_else(RequestKey::empty);
        let tag = shown.tag.clone();
        if let Some(tag) = &tag {
            self.orchestrator.tag_resolved(tag);
        }

        if key.is_empty() {
            attachment.pane.set_visible(false);
            attachment.visible = false;
            attachment.phase = RefreshPhase::Hidden;
        } else {
            attachment.pane.set_visible(true);
            attachment.visible = true;
            attachment.phase = RefreshPhase::Idle;
        }

        debug!(?slot, key = %key, "Resource swapped in");
        self.events.emit(&OverlayEvent::Load { slot, key, tag });
    }

    // ==================== Zoom ====================

    fn animate_zoom(&mut self, host: &dyn MapHost, zoom: f64, center: LatLng) {
        if let Some(attachment) = self.attachment.as_mut() {
            for slot in attachment.slots.iter_mut() {
                zoom::animate(slot, host, zoom, center);
            }
        }
    }

    fn settle_zoom(&mut self, host: &dyn MapHost) {
        if let Some(attachment) = self.attachment.as_mut() {
            for slot in attachment.slots.iter_mut() {
                zoom::settle(slot, host);
            }
        }
    }
}

impl Drop for NonTiledOverlay {
    fn drop(&mut self) {
        if let Some(mut attachment) = self.attachment.take() {
            warn!(
                subscriptions = attachment.subscriptions.len(),
                "Overlay dropped while attached; host subscriptions were not released"
            );
            attachment.pane.remove();
        }
    }
}

impl std::fmt::Debug for NonTiledOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonTiledOverlay")
            .field("provider", self.orchestrator.provider())
            .field("phase", &self.phase())
            .field("latest_key", &self.latest_key())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::geo::GeoBounds;
    use crate::host::WebMercatorHost;
    use crate::provider::tests::{RecordingAsyncProvider, StaticUrlProvider};
    use crate::provider::Tag;
    use crate::surface::headless::NeverSettle;

    fn host() -> WebMercatorHost {
        WebMercatorHost::new(LatLng::new(50.0, 8.0), 10.0, 500.0, 400.0)
    }

    fn sync_overlay(config: LayerConfig) -> NonTiledOverlay {
        NonTiledOverlay::new(
            config,
            FetchProvider::sync(StaticUrlProvider::new("http://img")),
        )
        .unwrap()
    }

    fn record(overlay: &mut NonTiledOverlay) -> Rc<RefCell<Vec<OverlayEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        for kind in [EventKind::Loading, EventKind::Load, EventKind::Error] {
            let sink = Rc::clone(&events);
            overlay.on(kind, move |event| sink.borrow_mut().push(event.clone()));
        }
        events
    }

    fn kinds(events: &Rc<RefCell<Vec<OverlayEvent>>>) -> Vec<EventKind> {
        events.borrow().iter().map(OverlayEvent::kind).collect()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = NonTiledOverlay::new(
            LayerConfig::new().with_zoom_range(5, 2),
            FetchProvider::sync(StaticUrlProvider::new("http://img")),
        );
        assert!(matches!(result, Err(OverlayError::Config(_))));
    }

    #[test]
    fn test_attach_twice_fails() {
        let mut host = host();
        let mut overlay = sync_overlay(LayerConfig::default());
        overlay.attach(&mut host).unwrap();
        assert!(matches!(
            overlay.attach(&mut host),
            Err(OverlayError::AlreadyAttached)
        ));
        overlay.detach(&mut host).unwrap();
        assert!(matches!(
            overlay.detach(&mut host),
            Err(OverlayError::NotAttached)
        ));
    }

    #[test]
    fn test_sync_attach_swaps_in_first_image() {
        let mut host = host();
        let mut overlay = sync_overlay(LayerConfig::default());
        let events = record(&mut overlay);

        overlay.attach(&mut host).unwrap();

        assert_eq!(kinds(&events), vec![EventKind::Loading, EventKind::Load]);
        let slots = overlay.slots().unwrap();
        assert_eq!(slots.current_id(), SlotId::Second);
        assert_eq!(
            slots.get(SlotId::Second).src(),
            Some("http://img?w=500&h=400")
        );
        assert_eq!(slots.get(SlotId::Second).opacity(), 1.0);
        assert_eq!(slots.get(SlotId::First).opacity(), 0.0);
        assert!(overlay.is_visible());
        assert_eq!(overlay.phase(), RefreshPhase::Idle);
    }

    #[test]
    fn test_pending_load_waits_for_host_report() {
        let mut host = host().with_resolver(NeverSettle);
        let mut overlay = sync_overlay(LayerConfig::default());
        let events = record(&mut overlay);
        overlay.attach(&mut host).unwrap();

        assert_eq!(overlay.phase(), RefreshPhase::AwaitingResource);
        assert_eq!(kinds(&events), vec![EventKind::Loading]);

        overlay.resource_loaded(SlotId::Second, "http://other");
        assert_eq!(kinds(&events), vec![EventKind::Loading]);

        overlay.resource_loaded(SlotId::Second, "http://img?w=500&h=400");
        assert_eq!(kinds(&events), vec![EventKind::Loading, EventKind::Load]);
        assert_eq!(overlay.slots().unwrap().current_id(), SlotId::Second);
    }

    #[test]
    fn test_retina_doubles_request_size() {
        let mut host = host().with_device_pixel_ratio(2.0);
        let mut overlay = sync_overlay(LayerConfig::new().with_retina_detection(true));
        overlay.attach(&mut host).unwrap();

        let slots = overlay.slots().unwrap();
        assert_eq!(
            slots.get(slots.current_id()).src(),
            Some("http://img?w=1000&h=800")
        );
    }

    #[test]
    fn test_zoom_outside_range_hides() {
        let mut host = host();
        let mut overlay = sync_overlay(LayerConfig::new().with_zoom_range(0, 8));
        let events = record(&mut overlay);
        overlay.attach(&mut host).unwrap();

        assert!(!overlay.is_visible());
        assert_eq!(overlay.latest_key(), Some(&RequestKey::empty()));
        assert_eq!(overlay.phase(), RefreshPhase::Hidden);
        assert!(!kinds(&events).contains(&EventKind::Loading));
        assert!(!host.pane_handle().unwrap().pane().visible);
    }

    #[test]
    fn test_sync_provider_error_substitutes_fallback() {
        let mut host = host();
        let mut provider = StaticUrlProvider::new("http://img");
        provider.fail = true;
        let mut overlay =
            NonTiledOverlay::new(LayerConfig::default(), FetchProvider::sync(provider)).unwrap();
        let events = record(&mut overlay);
        overlay.attach(&mut host).unwrap();

        assert_eq!(kinds(&events), vec![EventKind::Loading, EventKind::Error]);
        let slots = overlay.slots().unwrap();
        assert_eq!(slots.current_id(), SlotId::First);
        assert_eq!(
            slots.get(SlotId::Second).src(),
            Some(crate::config::DEFAULT_ERROR_RESOURCE_URL)
        );
        assert_eq!(overlay.phase(), RefreshPhase::Idle);
    }

    #[test]
    fn test_async_completion_with_tag() {
        let mut host = host();
        let provider = RecordingAsyncProvider::default();
        let mut overlay = NonTiledOverlay::new(
            LayerConfig::default(),
            FetchProvider::from_async(provider.clone()),
        )
        .unwrap();
        let events = record(&mut overlay);
        overlay.attach(&mut host).unwrap();
        assert_eq!(overlay.phase(), RefreshPhase::AwaitingUrl);

        let pending = provider.take();
        assert_eq!(pending.len(), 1);
        assert_eq!((pending[0].width, pending[0].height), (500, 400));
        let tag = Tag::new("features");
        pending[0]
            .sink
            .complete(pending[0].key.clone(), "a.png", Some(tag.clone()));

        assert_eq!(overlay.process_completions(), 1);
        let events = events.borrow();
        match events.last() {
            Some(OverlayEvent::Load { slot, tag: Some(t), .. }) => {
                assert_eq!(*slot, SlotId::Second);
                assert!(t.ptr_eq(&tag));
            }
            other => panic!("expected load with tag, got {:?}", other),
        }
        assert_eq!(provider.resolved_tags.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_completion_after_swap_is_ignored() {
        let mut host = host();
        let provider = RecordingAsyncProvider::default();
        let mut overlay = NonTiledOverlay::new(
            LayerConfig::default(),
            FetchProvider::from_async(provider.clone()),
        )
        .unwrap();
        let events = record(&mut overlay);
        overlay.attach(&mut host).unwrap();

        let pending = provider.take();
        pending[0].sink.complete(pending[0].key.clone(), "a.png", None);
        pending[0].sink.complete(pending[0].key.clone(), "a.png", None);
        overlay.process_completions();

        let loads = kinds(&events)
            .into_iter()
            .filter(|k| *k == EventKind::Load)
            .count();
        assert_eq!(loads, 1);
        assert_eq!(overlay.slots().unwrap().current_id(), SlotId::Second);
        assert_eq!(overlay.slots().unwrap().get(SlotId::First).src(), None);
    }

    #[test]
    fn test_zoom_events_rescale_slots() {
        let mut host = host();
        let mut overlay = sync_overlay(LayerConfig::default());
        overlay.attach(&mut host).unwrap();
        let center = host.center();

        overlay.handle_event(&host, HostEvent::ZoomFrame { zoom: 11.0, center });
        let current = overlay.slots().unwrap().current_id();
        assert_eq!(overlay.slots().unwrap().get(current).last_scale(), 2.0);

        host.set_view(center, 11.0);
        overlay.handle_event(&host, HostEvent::ZoomChanged);
        let scale = overlay.slots().unwrap().get(current).last_scale();
        assert!((scale - 2.0).abs() < 0.05);
    }

    #[test]
    fn test_presentation_controls() {
        let mut host = host();
        let mut overlay = sync_overlay(LayerConfig::new().with_attribution("© Example"));
        overlay.attach(&mut host).unwrap();
        let pane = host.pane_handle().unwrap();

        assert!(overlay.set_opacity(2.0).is_err());
        overlay.set_opacity(0.25).unwrap();
        overlay.set_z_index(0);
        assert_eq!(pane.pane().z_index, None);
        overlay.set_z_index(5);
        overlay.bring_to_front();
        overlay.bring_to_back();

        let state = pane.pane();
        assert_eq!(state.opacity, 0.25);
        assert_eq!(state.z_index, Some(5));
        assert_eq!(state.restacks, vec![true, false]);
        assert_eq!(overlay.attribution(), "© Example");
    }

    #[test]
    fn test_redraw_detached_is_noop() {
        let host = host();
        let mut overlay = sync_overlay(LayerConfig::default());
        let events = record(&mut overlay);
        overlay.redraw(&host);
        overlay.handle_event(&host, HostEvent::ViewportSettled);
        assert!(events.borrow().is_empty());
        assert_eq!(overlay.phase(), RefreshPhase::Detached);
    }

    #[test]
    fn test_layer_bounds_clip_request() {
        let mut host = host();
        let bounds = host.visible_bounds();
        let half = GeoBounds::new(bounds.south, bounds.west, bounds.north, bounds.center().lng);
        let provider = RecordingAsyncProvider::default();
        let mut overlay = NonTiledOverlay::new(
            LayerConfig::new().with_bounds(half),
            FetchProvider::from_async(provider.clone()),
        )
        .unwrap();
        overlay.attach(&mut host).unwrap();

        let pending = provider.take();
        assert!((i64::from(pending[0].width) - 250).abs() <= 1);
        assert_eq!(pending[0].height, 400);
    }

    #[test]
    fn test_drop_while_attached_removes_pane() {
        let mut host = host();
        let mut overlay = sync_overlay(LayerConfig::default());
        overlay.attach(&mut host).unwrap();
        let pane = host.pane_handle().unwrap();

        drop(overlay);
        assert!(pane.pane().removed);
    }

    #[test]
    fn test_failure_on_shown_slot_is_ignored() {
        let mut host = host();
        let mut overlay = sync_overlay(LayerConfig::default());
        overlay.attach(&mut host).unwrap();
        let events = record(&mut overlay);

        let slots = overlay.slots().unwrap();
        let shown = slots.current_id();
        let url = slots.get(shown).src().unwrap().to_string();

        overlay.resource_failed(shown, &url);

        assert!(kinds(&events).is_empty());
        let slots = overlay.slots().unwrap();
        assert_eq!(slots.current_id(), shown);
        assert_eq!(slots.get(shown).src(), Some(url.as_str()));
        assert!(!slots.get(shown).is_invalid());
        assert!(overlay.is_visible());
        overlay.detach(&mut host).unwrap();
    }
}
