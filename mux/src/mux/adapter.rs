//! Disposable downstream adapters registered with the port.
//!
//! An [`Adapter`] is the routing object the registry hands to the port. It
//! implements the one capability the port requires ([`Notify`]): receive an
//! event and forward it to the entry's target. A **fresh** adapter is created
//! for every port registration; adapters are never reused across
//! registrations, and the port identifies a registration by the adapter's
//! allocation address. Holding the `Arc<Adapter>` therefore *is* holding the
//! registration handle.
//!
//! # Tombstone
//!
//! When an adapter is replaced (widen/narrow re-registration) or its entry is
//! torn down, it is [`revoked`](Adapter::revoke) before the port unsubscribe
//! is issued. A revoked adapter drops any late delivery, so even a port that
//! violates its own unsubscribe postcondition cannot reach a handler or
//! listener that has been cancelled.

use std::sync::{
    Arc, Weak,
    atomic::{AtomicBool, Ordering},
};

use log::trace;

use crate::{
    event::Event,
    mux::{Listener, identity::SubscriberId, registry::Registry},
    port::Notify,
};

/// Where an adapter routes the events it receives.
///
/// Cloning a target is cheap and shares the underlying listener or handler;
/// the registry clones the target each time it mints a fresh adapter for a
/// re-registration.
#[derive(Clone)]
pub(crate) enum Target {
    /// Forward every event to a client listener, unmodified.
    Listener(Arc<dyn Listener>),

    /// Forward every event to an `on_every` handler.
    Every(Arc<dyn Fn(&Event) + Send + Sync>),

    /// Forward the first event to an `on_next` handler, tearing the entry
    /// down first. The shared [`OnceTarget`] keeps the fired state across
    /// any re-registration, so the handler can never run twice.
    Once(Arc<OnceTarget>),
}

/// State of one `on_next` subscription: the handler plus the fire-once guard
/// and the back-reference needed for self-teardown.
pub(crate) struct OnceTarget {
    /// Set on first delivery; later deliveries are dropped.
    fired: AtomicBool,

    handler: Box<dyn Fn(&Event) + Send + Sync>,

    /// Back-reference into the registry for the self-unsubscribe. Weak so an
    /// outstanding subscription never keeps a discarded multiplexer alive.
    registry: Weak<Registry>,

    /// The synthetic identity this target tears down.
    id: SubscriberId,
}

impl OnceTarget {
    pub(crate) fn new(
        handler: impl Fn(&Event) + Send + Sync + 'static,
        registry: Weak<Registry>,
        id: SubscriberId,
    ) -> Arc<Self> {
        Arc::new(Self {
            fired: AtomicBool::new(false),
            handler: Box::new(handler),
            registry,
            id,
        })
    }

    /// Deliver one event: tear the entry down, then run the handler. The
    /// teardown-before-handler ordering makes a `cancel()` issued from inside
    /// the handler observe "already gone", which also keeps the synchronous
    /// nested-delivery case correct.
    fn fire(&self, event: &Event) {
        if self.fired.swap(true, Ordering::AcqRel) {
            trace!("dropping repeat delivery to one-shot subscription {:?}", self.id);
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.teardown(self.id);
        }
        (self.handler)(event);
    }
}

/// A disposable routing object registered with the port.
pub(crate) struct Adapter {
    /// Tombstone: set when this adapter is retired; deliveries afterwards are
    /// dropped.
    revoked: AtomicBool,

    target: Target,
}

impl Adapter {
    /// Mint a fresh adapter for one port registration.
    pub(crate) fn new(target: Target) -> Arc<Self> {
        Arc::new(Self {
            revoked: AtomicBool::new(false),
            target,
        })
    }

    /// Retire this adapter. Any delivery after this point is dropped.
    pub(crate) fn revoke(&self) {
        self.revoked.store(true, Ordering::Release);
    }
}

impl Notify for Adapter {
    fn notify(&self, event: &Event) {
        if self.revoked.load(Ordering::Acquire) {
            trace!("dropping delivery to revoked adapter, kind {}", event.kind());
            return;
        }
        match &self.target {
            Target::Listener(listener) => listener.notify(event),
            Target::Every(handler) => handler(event),
            Target::Once(once) => once.fire(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    struct Counting(AtomicUsize);

    impl Listener for Counting {
        fn notify(&self, _event: &Event) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn listener_target_forwards_every_event() {
        // Given
        let listener = Arc::new(Counting(AtomicUsize::new(0)));
        let adapter = Adapter::new(Target::Listener(listener.clone()));

        // When
        adapter.notify(&Event::empty("a"));
        adapter.notify(&Event::empty("b"));

        // Then
        assert_eq!(listener.0.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn every_target_forwards_every_event() {
        // Given
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let adapter = Adapter::new(Target::Every(Arc::new(move |_event: &Event| {
            seen.fetch_add(1, Ordering::Relaxed);
        })));

        // When
        adapter.notify(&Event::empty("a"));
        adapter.notify(&Event::empty("a"));
        adapter.notify(&Event::empty("a"));

        // Then
        assert_eq!(count.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn once_target_fires_at_most_once() {
        // Given - a dangling registry reference; teardown becomes a no-op
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let once = OnceTarget::new(
            move |_event: &Event| {
                seen.fetch_add(1, Ordering::Relaxed);
            },
            Weak::new(),
            SubscriberId::Ephemeral(0),
        );
        let adapter = Adapter::new(Target::Once(once));

        // When - the port double-delivers
        adapter.notify(&Event::empty("x"));
        adapter.notify(&Event::empty("x"));

        // Then
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn once_guard_is_shared_across_adapters() {
        // Given - two adapters minted from the same once target
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let once = OnceTarget::new(
            move |_event: &Event| {
                seen.fetch_add(1, Ordering::Relaxed);
            },
            Weak::new(),
            SubscriberId::Ephemeral(1),
        );
        let first = Adapter::new(Target::Once(Arc::clone(&once)));
        let second = Adapter::new(Target::Once(once));

        // When
        first.notify(&Event::empty("x"));
        second.notify(&Event::empty("x"));

        // Then
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn revoked_adapter_drops_deliveries() {
        // Given
        let listener = Arc::new(Counting(AtomicUsize::new(0)));
        let adapter = Adapter::new(Target::Listener(listener.clone()));

        // When
        adapter.revoke();
        adapter.notify(&Event::empty("a"));

        // Then
        assert_eq!(listener.0.load(Ordering::Relaxed), 0);
    }
}
