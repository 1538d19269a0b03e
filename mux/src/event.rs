//! Event values and the kind tokens used to route them.
//!
//! This module provides the two value types the rest of the crate traffics in:
//!
//! - **[`EventKind`]**: an opaque, comparable token naming a category of event.
//!   Kinds are cheap to clone (shared string) and totally ordered so kind sets
//!   iterate deterministically.
//! - **[`Event`]**: one notification instance, carrying a kind and an opaque
//!   payload. The payload is type-erased; consumers that know the concrete
//!   type recover it by downcasting.
//!
//! # Type Erasure
//!
//! The multiplexer never interprets payloads, so `Event` stores them as
//! `Arc<dyn Any + Send + Sync>` and exposes a typed [`payload()`](Event::payload)
//! accessor that downcasts to the concrete type. Cloning an event shares the
//! payload rather than copying it.
//!
//! # Example
//!
//! ```rust,ignore
//! let event = Event::new("camera-changed", CameraState { zoom: 4.2 });
//!
//! assert_eq!(event.kind().as_str(), "camera-changed");
//! let state = event.payload::<CameraState>().unwrap();
//! ```

use std::{any::Any, collections::BTreeSet, fmt, sync::Arc};

/// An opaque token naming a category of event a consumer may subscribe to.
///
/// Kinds compare by their token text and carry no further meaning inside this
/// crate; the port and the host application agree on the vocabulary.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventKind(Arc<str>);

impl EventKind {
    /// Construct a kind from its token text.
    #[inline]
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self(token.into())
    }

    /// Get the token text of this kind.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EventKind {
    #[inline]
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for EventKind {
    #[inline]
    fn from(token: String) -> Self {
        Self::new(token)
    }
}

impl fmt::Debug for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventKind({:?})", self.0)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A set of event kinds. Ordered so iteration (and therefore logging and
/// port calls observed in tests) is deterministic.
pub type KindSet = BTreeSet<EventKind>;

/// Collect an iterator of kind-convertible values into a [`KindSet`].
pub fn kind_set<I>(kinds: I) -> KindSet
where
    I: IntoIterator,
    I::Item: Into<EventKind>,
{
    kinds.into_iter().map(Into::into).collect()
}

/// One notification instance: a kind plus an opaque payload.
///
/// Events are immutable and cheap to clone; clones share the payload.
#[derive(Clone)]
pub struct Event {
    /// The category this event belongs to.
    kind: EventKind,

    /// Type-erased payload, shared between clones.
    payload: Arc<dyn Any + Send + Sync>,
}

impl Event {
    /// Construct a new event with the given kind and payload.
    pub fn new(kind: impl Into<EventKind>, payload: impl Any + Send + Sync) -> Self {
        Self {
            kind: kind.into(),
            payload: Arc::new(payload),
        }
    }

    /// Construct an event that carries no payload.
    pub fn empty(kind: impl Into<EventKind>) -> Self {
        Self::new(kind, ())
    }

    /// Get the kind of this event.
    #[inline]
    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Downcast the payload to a concrete type, or `None` if the payload is
    /// of a different type.
    #[inline]
    pub fn payload<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Payload is opaque by design; show the kind only.
        f.debug_struct("Event").field("kind", &self.kind).finish()
    }
}
