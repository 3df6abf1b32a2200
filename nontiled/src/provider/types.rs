//! Fetch provider contracts.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::geo::GeoBounds;
use crate::overlay::SlotId;
use crate::request::RequestKey;

/// Errors a provider can report while building a resource URL.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProviderError {
    /// The WMS version string could not be parsed.
    #[error("Unsupported WMS version: {0}")]
    UnsupportedVersion(String),

    /// The coordinate reference system is not known.
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    /// A URL template is malformed.
    #[error("Invalid URL template: {0}")]
    InvalidTemplate(String),

    /// The provider cannot serve this request right now.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

/// Opaque payload attached to a completed request.
///
/// The core never inspects it; it is forwarded to
/// [`AsyncResourceUrlProvider::on_tag_resolved`] after a successful swap and
/// carried on the `load` event.
#[derive(Clone)]
pub struct Tag(Arc<dyn Any + Send + Sync>);

impl Tag {
    /// Wrap any value as a tag.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrow the payload as `T`, if that is its type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// True when both tags share the same payload allocation.
    pub fn ptr_eq(&self, other: &Tag) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Tag(..)")
    }
}

/// One callback delivery from an asynchronous provider.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Slot the request was issued for.
    pub slot: SlotId,
    /// Key the provider was given for this request.
    pub key: RequestKey,
    /// URL of the resolved resource.
    pub url: String,
    /// Optional provider payload.
    pub tag: Option<Tag>,
}

/// Callback handle passed to an asynchronous provider.
///
/// The sink is `Send` and may be moved to another task or thread. It may be
/// invoked any number of times, including never; deliveries queue up until the
/// overlay drains them with
/// [`NonTiledOverlay::process_completions`](crate::overlay::NonTiledOverlay::process_completions).
#[derive(Debug, Clone)]
pub struct CompletionSink {
    slot: SlotId,
    sender: UnboundedSender<Completion>,
}

impl CompletionSink {
    pub(crate) fn new(slot: SlotId, sender: UnboundedSender<Completion>) -> Self {
        Self { slot, sender }
    }

    /// Deliver a resolved URL for `key`.
    ///
    /// Returns `false` when the overlay no longer exists.
    pub fn complete(&self, key: RequestKey, url: impl Into<String>, tag: Option<Tag>) -> bool {
        self.sender
            .send(Completion {
                slot: self.slot,
                key,
                url: url.into(),
                tag,
            })
            .is_ok()
    }
}

/// Synchronous provider: the URL is known as soon as the request is.
pub trait ResourceUrlProvider {
    /// Build the URL of an image covering `bounds` at `width` × `height` pixels.
    fn resource_url(
        &self,
        bounds: &GeoBounds,
        width: u32,
        height: u32,
    ) -> Result<String, ProviderError>;

    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Merge provider-specific query parameters.
    ///
    /// Returns `false` when the provider has no parameters to update.
    fn set_params(&mut self, _params: &[(String, String)]) -> bool {
        false
    }
}

/// Asynchronous provider: the URL arrives later through a [`CompletionSink`].
pub trait AsyncResourceUrlProvider {
    /// Start resolving the URL for a request identified by `key`.
    ///
    /// The provider should hand `key` back unchanged to
    /// [`CompletionSink::complete`].
    fn request_resource_url(
        &mut self,
        bounds: &GeoBounds,
        width: u32,
        height: u32,
        key: &RequestKey,
        sink: CompletionSink,
    );

    /// Called with the tag of a completion once its resource is on screen.
    fn on_tag_resolved(&mut self, _tag: &Tag) {}

    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Merge provider-specific query parameters.
    fn set_params(&mut self, _params: &[(String, String)]) -> bool {
        false
    }
}

/// The fetch contract an overlay is built with; exactly one mode per overlay.
pub enum FetchProvider {
    Sync(Box<dyn ResourceUrlProvider>),
    Async(Box<dyn AsyncResourceUrlProvider>),
}

impl FetchProvider {
    /// Wrap a synchronous provider.
    pub fn sync(provider: impl ResourceUrlProvider + 'static) -> Self {
        FetchProvider::Sync(Box::new(provider))
    }

    /// Wrap an asynchronous provider.
    pub fn from_async(provider: impl AsyncResourceUrlProvider + 'static) -> Self {
        FetchProvider::Async(Box::new(provider))
    }

    /// Name of the wrapped provider.
    pub fn name(&self) -> &str {
        match self {
            FetchProvider::Sync(p) => p.name(),
            FetchProvider::Async(p) => p.name(),
        }
    }

    /// True for the asynchronous contract.
    pub fn is_async(&self) -> bool {
        matches!(self, FetchProvider::Async(_))
    }

    /// Forward parameters to the wrapped provider.
    pub fn set_params(&mut self, params: &[(String, String)]) -> bool {
        match self {
            FetchProvider::Sync(p) => p.set_params(params),
            FetchProvider::Async(p) => p.set_params(params),
        }
    }
}

impl fmt::Debug for FetchProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.is_async() { "Async" } else { "Sync" };
        f.debug_struct("FetchProvider")
            .field("mode", &mode)
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(test)]
pub mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Sync provider answering every request with a URL built from its size.
    #[derive(Debug, Clone)]
    pub struct StaticUrlProvider {
        pub base: String,
        pub fail: bool,
    }

    impl StaticUrlProvider {
        pub fn new(base: &str) -> Self {
            Self {
                base: base.to_string(),
                fail: false,
            }
        }
    }

    impl ResourceUrlProvider for StaticUrlProvider {
        fn resource_url(
            &self,
            _bounds: &GeoBounds,
            width: u32,
            height: u32,
        ) -> Result<String, ProviderError> {
            if self.fail {
                return Err(ProviderError::Unavailable("mock failure".to_string()));
            }
            Ok(format!("{}?w={}&h={}", self.base, width, height))
        }

        fn name(&self) -> &str {
            "static"
        }
    }

    /// One recorded async request.
    #[derive(Debug, Clone)]
    pub struct PendingRequest {
        pub key: RequestKey,
        pub width: u32,
        pub height: u32,
        pub sink: CompletionSink,
    }

    /// Async provider that parks every request until the test answers it.
    #[derive(Clone, Default)]
    pub struct RecordingAsyncProvider {
        pub pending: Arc<Mutex<Vec<PendingRequest>>>,
        pub resolved_tags: Arc<Mutex<Vec<Tag>>>,
    }

    impl RecordingAsyncProvider {
        pub fn take(&self) -> Vec<PendingRequest> {
            std::mem::take(&mut *self.pending.lock().unwrap())
        }
    }

    impl AsyncResourceUrlProvider for RecordingAsyncProvider {
        fn request_resource_url(
            &mut self,
            _bounds: &GeoBounds,
            width: u32,
            height: u32,
            key: &RequestKey,
            sink: CompletionSink,
        ) {
            self.pending.lock().unwrap().push(PendingRequest {
                key: key.clone(),
                width,
                height,
                sink,
            });
        }

        fn on_tag_resolved(&mut self, tag: &Tag) {
            self.resolved_tags.lock().unwrap().push(tag.clone());
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    #[test]
    fn test_tag_downcast() {
        let tag = Tag::new(vec![1u32, 2, 3]);
        assert_eq!(tag.downcast_ref::<Vec<u32>>(), Some(&vec![1, 2, 3]));
        assert!(tag.downcast_ref::<String>().is_none());
        assert!(tag.ptr_eq(&tag.clone()));
        assert!(!tag.ptr_eq(&Tag::new(vec![1u32, 2, 3])));
    }

    #[test]
    fn test_sink_delivers_until_receiver_dropped() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = CompletionSink::new(SlotId::Second, tx);

        assert!(sink.complete(RequestKey::from_raw("k1"), "a.png", None));
        let completion = rx.try_recv().unwrap();
        assert_eq!(completion.slot, SlotId::Second);
        assert_eq!(completion.key, RequestKey::from_raw("k1"));
        assert_eq!(completion.url, "a.png");

        drop(rx);
        assert!(!sink.complete(RequestKey::from_raw("k2"), "b.png", None));
    }

    #[test]
    fn test_fetch_provider_mode() {
        let sync = FetchProvider::sync(StaticUrlProvider::new("http://x"));
        assert!(!sync.is_async());
        assert_eq!(sync.name(), "static");

        let mut asynchronous = FetchProvider::from_async(RecordingAsyncProvider::default());
        assert!(asynchronous.is_async());
        assert!(!asynchronous.set_params(&[("a".to_string(), "b".to_string())]));
        assert!(format!("{:?}", asynchronous).contains("Async"));
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::UnsupportedCrs("EPSG:27700".to_string());
        assert_eq!(err.to_string(), "Unsupported CRS: EPSG:27700");
    }
}
