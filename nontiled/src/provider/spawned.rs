//! Async adapter running a sync provider on a Tokio runtime.
//!
//! Each request becomes a spawned task that waits out an optional delay and
//! then delivers the URL through the [`CompletionSink`]. Delays cycle through a
//! configured list, which makes it easy to reproduce out-of-order completion.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::geo::GeoBounds;
use crate::provider::{AsyncResourceUrlProvider, CompletionSink, ResourceUrlProvider};
use crate::request::RequestKey;

/// Runs a [`ResourceUrlProvider`] off the caller's stack.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use nontiled::provider::{FetchProvider, SpawnedProvider, WmsProvider};
///
/// let wms = WmsProvider::new("https://wms.example.com/wms");
/// let provider = SpawnedProvider::new(wms, tokio::runtime::Handle::current())
///     .with_delays(vec![Duration::from_millis(300), Duration::from_millis(50)]);
/// let fetch = FetchProvider::from_async(provider);
/// ```
pub struct SpawnedProvider<P> {
    inner: Arc<P>,
    runtime: Handle,
    delays: Vec<Duration>,
    issued: usize,
}

impl<P> SpawnedProvider<P>
where
    P: ResourceUrlProvider + Clone + Send + Sync + 'static,
{
    /// Wrap `inner`, spawning work onto `runtime`.
    pub fn new(inner: P, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(inner),
            runtime,
            delays: Vec::new(),
            issued: 0,
        }
    }

    /// Delay the n-th request by `delays[n % delays.len()]`.
    pub fn with_delays(mut self, delays: Vec<Duration>) -> Self {
        self.delays = delays;
        self
    }

    /// Number of requests started so far.
    pub fn issued(&self) -> usize {
        self.issued
    }

    fn next_delay(&mut self) -> Duration {
        let delay = if self.delays.is_empty() {
            Duration::ZERO
        } else {
            self.delays[self.issued % self.delays.len()]
        };
        self.issued += 1;
        delay
    }
}

impl<P> AsyncResourceUrlProvider for SpawnedProvider<P>
where
    P: ResourceUrlProvider + Clone + Send + Sync + 'static,
{
    fn request_resource_url(
        &mut self,
        bounds: &GeoBounds,
        width: u32,
        height: u32,
        key: &RequestKey,
        sink: CompletionSink,
    ) {
        let delay = self.next_delay();
        let inner = Arc::clone(&self.inner);
        let bounds = *bounds;
        let key = key.clone();

        debug!(key = %key, delay_ms = delay.as_millis() as u64, "Spawning URL resolution");
        self.runtime.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match inner.resource_url(&bounds, width, height) {
                Ok(url) => {
                    if !sink.complete(key, url, None) {
                        debug!("Overlay dropped before completion was delivered");
                    }
                }
                // Zero deliveries are part of the async contract
                Err(e) => warn!(error = %e, key = %key, "URL resolution failed"),
            }
        });
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    /// Requests already in flight keep resolving with the parameters they
    /// were issued with.
    fn set_params(&mut self, params: &[(String, String)]) -> bool {
        Arc::make_mut(&mut self.inner).set_params(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::SlotId;
    use crate::provider::tests::StaticUrlProvider;
    use crate::provider::WmsProvider;

    fn bounds() -> GeoBounds {
        GeoBounds::new(0.0, 0.0, 1.0, 1.0)
    }

    #[tokio::test]
    async fn test_completion_delivered() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut provider = SpawnedProvider::new(WmsProvider::new("http://x"), Handle::current());
        let key = RequestKey::for_request(&bounds(), 64, 64);

        provider.request_resource_url(
            &bounds(),
            64,
            64,
            &key,
            CompletionSink::new(SlotId::First, tx),
        );

        let completion = rx.recv().await.unwrap();
        assert_eq!(completion.key, key);
        assert!(completion.url.starts_with("http://x?service=WMS"));
        assert_eq!(provider.issued(), 1);
        assert_eq!(provider.name(), "WMS");
    }

    #[tokio::test]
    async fn test_delays_reorder_completions() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut provider = SpawnedProvider::new(StaticUrlProvider::new("http://x"), Handle::current())
            .with_delays(vec![Duration::from_millis(80), Duration::ZERO]);

        let slow = RequestKey::from_raw("slow");
        let fast = RequestKey::from_raw("fast");
        provider.request_resource_url(
            &bounds(),
            64,
            64,
            &slow,
            CompletionSink::new(SlotId::Second, tx.clone()),
        );
        provider.request_resource_url(
            &bounds(),
            64,
            64,
            &fast,
            CompletionSink::new(SlotId::Second, tx),
        );

        assert_eq!(rx.recv().await.unwrap().key, fast);
        assert_eq!(rx.recv().await.unwrap().key, slow);
    }

    #[tokio::test]
    async fn test_set_params_reaches_wrapped_provider() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut provider = SpawnedProvider::new(WmsProvider::new("http://w"), Handle::current())
            .with_delays(vec![Duration::from_millis(50), Duration::ZERO]);

        let before = RequestKey::from_raw("before");
        provider.request_resource_url(
            &bounds(),
            64,
            64,
            &before,
            CompletionSink::new(SlotId::First, tx.clone()),
        );

        let params = vec![("layers".to_string(), "roads".to_string())];
        assert!(provider.set_params(&params));

        let after = RequestKey::from_raw("after");
        provider.request_resource_url(
            &bounds(),
            64,
            64,
            &after,
            CompletionSink::new(SlotId::First, tx),
        );

        let first = rx.recv().await.unwrap();
        assert_eq!(first.key, after);
        assert!(first.url.contains("layers=roads"), "{}", first.url);

        let second = rx.recv().await.unwrap();
        assert_eq!(second.key, before);
        assert!(!second.url.contains("layers=roads"), "{}", second.url);
    }

    #[test]
    fn test_set_params_unsupported_by_wrapped_provider() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let mut provider =
            SpawnedProvider::new(StaticUrlProvider::new("http://x"), runtime.handle().clone());
        assert!(!provider.set_params(&[("a".to_string(), "b".to_string())]));
    }

    #[tokio::test]
    async fn test_failure_delivers_nothing() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut failing = StaticUrlProvider::new("http://x");
        failing.fail = true;
        let mut provider = SpawnedProvider::new(failing, Handle::current());

        provider.request_resource_url(
            &bounds(),
            64,
            64,
            &RequestKey::from_raw("k"),
            CompletionSink::new(SlotId::First, tx),
        );

        // The task drops its sink without sending, closing the channel
        assert!(rx.recv().await.is_none());
    }
}
