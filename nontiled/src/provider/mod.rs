//! Fetch providers.
//!
//! A provider turns a request (clipped bounds plus pixel size) into the URL of
//! the image to show. An overlay is built with exactly one of two contracts:
//!
//! - [`ResourceUrlProvider`]: the URL is computed inline and applied in the
//!   same refresh cycle.
//! - [`AsyncResourceUrlProvider`]: the URL is delivered later through a
//!   [`CompletionSink`], zero or more times, possibly out of order.
//!
//! # Implementations
//!
//! - [`WmsProvider`] - OGC WMS GetMap
//! - [`TemplateProvider`] - bbox/size URL templates
//! - [`SpawnedProvider`] - runs any sync provider as an async one on Tokio

mod spawned;
mod template;
mod types;
mod wms;

pub use spawned::SpawnedProvider;
pub use template::TemplateProvider;
pub use types::{
    AsyncResourceUrlProvider, Completion, CompletionSink, FetchProvider, ProviderError,
    ResourceUrlProvider, Tag,
};
pub use wms::{Crs, WmsProvider, EARTH_RADIUS};

#[cfg(test)]
pub use types::tests;
