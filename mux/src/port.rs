//! The external port contract the multiplexer is built over.
//!
//! A **port** is the native event-notification source being wrapped. It is an
//! external collaborator, not part of this crate's core: the crate only
//! defines the traits a port must satisfy, plus [`LocalPort`](crate::LocalPort)
//! as a reference implementation.
//!
//! # Contract
//!
//! A port supports exactly one active subscription per registered adapter:
//!
//! - [`Port::subscribe`] registers an adapter to receive zero or more future
//!   [`notify`](Notify::notify) calls for any event whose kind is in the given
//!   set, until a matching unsubscribe. Delivery may happen synchronously,
//!   nested inside the `subscribe` call itself, or later from any thread.
//! - [`Port::unsubscribe`] releases the registration; after it returns, no
//!   further `notify` calls for that adapter occur.
//!
//! Registrations are identified by the adapter's allocation address
//! (`Arc` pointer identity); the port holds only a routing reference and
//! never owns the adapter.

use std::sync::Arc;

use crate::event::{Event, KindSet};

/// The one capability a port requires of a registered adapter: receive an
/// event and forward it.
pub trait Notify: Send + Sync {
    /// Deliver one event to this adapter.
    fn notify(&self, event: &Event);
}

/// The external notification source wrapped by the multiplexer.
///
/// Both operations are synchronous and non-blocking. Failures inside a port
/// propagate to the caller untouched; the multiplexer performs no retries and
/// no suppression.
pub trait Port: Send + Sync {
    /// Register `adapter` to receive events for the given kinds until a
    /// matching [`unsubscribe`](Self::unsubscribe).
    fn subscribe(&self, adapter: Arc<dyn Notify>, kinds: &KindSet);

    /// Release the registration identified by `adapter`. After this returns,
    /// no further [`notify`](Notify::notify) calls for that adapter occur.
    /// Unsubscribing an adapter that is not registered is a no-op.
    fn unsubscribe(&self, adapter: &Arc<dyn Notify>);
}
