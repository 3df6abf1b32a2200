//! Request keys.
//!
//! A key identifies one refresh attempt. Keys are derived from the clipped
//! bounds and the requested pixel size, so two requests for the same image
//! compare equal and any change in bounds, width or height yields a different
//! key. The overlay stores the most recently issued key; a completion whose key
//! differs from it is stale.

use std::fmt;

use crate::geo::GeoBounds;

/// Reserved key for the "nothing to request" state of a degenerate viewport.
pub const EMPTY_KEY: &str = "<empty>";

/// Opaque identifier of a refresh attempt.
///
/// Keys are cheap to build (one string format per viewport event) and compare
/// by value.
///
/// # Example
///
/// ```
/// use nontiled::geo::GeoBounds;
/// use nontiled::request::RequestKey;
///
/// let bounds = GeoBounds::new(47.0, 6.0, 55.0, 15.0);
/// let a = RequestKey::for_request(&bounds, 500, 400);
/// let b = RequestKey::for_request(&bounds, 500, 400);
/// assert_eq!(a, b);
/// assert_ne!(a, RequestKey::for_request(&bounds, 501, 400));
/// assert!(RequestKey::empty().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey(String);

impl RequestKey {
    /// Derive the key for a request of `width` × `height` pixels over `bounds`.
    ///
    /// The size is the already rounded request size, so two viewports whose
    /// pixel sizes differ by less than half a pixel share a key unless their
    /// bounds differ.
    pub fn for_request(bounds: &GeoBounds, width: u32, height: u32) -> Self {
        Self(format!(
            "{}, {}, {}, {}",
            bounds.north_west(),
            bounds.south_east(),
            width,
            height
        ))
    }

    /// The reserved empty-sentinel key.
    pub fn empty() -> Self {
        Self(EMPTY_KEY.to_string())
    }

    /// Wrap a key string handed back by a provider.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// True for the empty-sentinel key.
    pub fn is_empty(&self) -> bool {
        self.0 == EMPTY_KEY
    }

    /// The key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
