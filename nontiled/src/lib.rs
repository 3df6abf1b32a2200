//! NonTiled - refresh controller for single-image map overlays
//!
//! Renders one dynamically generated image (a WMS GetMap response, a server
//! side render) over the whole map viewport instead of a tile grid, and
//! replaces it whenever the viewport settles.
//!
//! # Architecture
//!
//! ```text
//! MapHost ──events──► NonTiledOverlay ──request──► FetchProvider (sync | async)
//!    ▲                  │  clip, key, guard              │
//!    │                  ▼                                ▼
//!    └──pane─────── SlotPair [current, buffer] ◄── URL + key (+ tag)
//! ```
//!
//! - [`geo`] - coordinates and the viewport clipper
//! - [`request`] - requests and request keys
//! - [`host`] - the map contract and a headless Web Mercator host
//! - [`surface`] - paintable surfaces (image or canvas) and the overlay pane
//! - [`provider`] - fetch providers (WMS, URL template, spawned async)
//! - [`config`] - layer options and INI loading
//! - [`overlay`] - the double-buffered refresh controller

pub mod config;
pub mod geo;
pub mod host;
pub mod overlay;
pub mod provider;
pub mod request;
pub mod surface;

pub use overlay::{non_tiled_layer, template_layer, wms_layer, NonTiledOverlay};
