//! Fetch orchestration and the staleness guard.
//!
//! The orchestrator owns the provider and the key of the most recent request.
//! Superseded requests are never cancelled; their completions are simply
//! rejected by [`Orchestrator::accept`] when they arrive.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::overlay::SlotId;
use crate::provider::{Completion, CompletionSink, FetchProvider, ProviderError, Tag};
use crate::request::{Request, RequestKey};

/// Immediate result of issuing a request.
#[derive(Debug)]
pub(crate) enum Issued {
    /// A sync provider returned the URL.
    Ready(String),
    /// A sync provider failed.
    Failed(ProviderError),
    /// An async provider will deliver through its sink.
    Awaiting,
}

pub(crate) struct Orchestrator {
    provider: FetchProvider,
    latest_key: Option<RequestKey>,
    sender: UnboundedSender<Completion>,
    receiver: UnboundedReceiver<Completion>,
}

impl Orchestrator {
    pub(crate) fn new(provider: FetchProvider) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            provider,
            latest_key: None,
            sender,
            receiver,
        }
    }

    pub(crate) fn provider(&self) -> &FetchProvider {
        &self.provider
    }

    pub(crate) fn provider_mut(&mut self) -> &mut FetchProvider {
        &mut self.provider
    }

    pub(crate) fn latest_key(&self) -> Option<&RequestKey> {
        self.latest_key.as_ref()
    }

    /// Record that the latest intent is "show nothing".
    pub(crate) fn mark_empty(&mut self) {
        self.latest_key = Some(RequestKey::empty());
    }

    /// Make `request` the latest intent and hand it to the provider.
    pub(crate) fn issue(&mut self, slot: SlotId, request: &Request) -> Issued {
        self.latest_key = Some(request.key().clone());
        debug!(key = %request.key(), ?slot, provider = self.provider.name(), "Issuing request");

        match &mut self.provider {
            FetchProvider::Sync(provider) => {
                match provider.resource_url(request.bounds(), request.width(), request.height()) {
                    Ok(url) => Issued::Ready(url),
                    Err(e) => Issued::Failed(e),
                }
            }
            FetchProvider::Async(provider) => {
                let sink = CompletionSink::new(slot, self.sender.clone());
                provider.request_resource_url(
                    request.bounds(),
                    request.width(),
                    request.height(),
                    request.key(),
                    sink,
                );
                Issued::Awaiting
            }
        }
    }

    /// True only when `key` is the latest issued key.
    pub(crate) fn accept(&self, key: &RequestKey) -> bool {
        self.latest_key.as_ref() == Some(key)
    }

    /// Next queued completion, if any.
    pub(crate) fn try_next(&mut self) -> Option<Completion> {
        self.receiver.try_recv().ok()
    }

    /// Wait for the next completion.
    pub(crate) async fn next(&mut self) -> Option<Completion> {
        self.receiver.recv().await
    }

    /// Drop every queued completion. Returns how many were discarded.
    pub(crate) fn discard_pending(&mut self) -> usize {
        let mut discarded = 0;
        while self.receiver.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }

    pub(crate) fn tag_resolved(&mut self, tag: &Tag) {
        if let FetchProvider::Async(provider) = &mut self.provider {
            provider.on_tag_resolved(tag);
        }
    }
}
