//! An in-process reference implementation of the [`Port`] contract.
//!
//! [`LocalPort`] is a small event dispatcher for hosts that have no native
//! notification source: registrations live in a sharded concurrent map and
//! [`raise`](LocalPort::raise) fans an event out to every registration whose
//! kind set contains the event's kind. It honors the port contract the
//! multiplexer relies on: one kind set per registered adapter, registrations
//! identified by adapter address, and no delivery after `unsubscribe`
//! returns.
//!
//! Handlers reached during a [`raise`](LocalPort::raise) may freely re-enter
//! the port (one-shot subscriptions unsubscribe from inside their own
//! delivery); the dispatch loop snapshots the matching registrations first
//! and re-checks liveness before each delivery.

use std::sync::Arc;

use dashmap::DashMap;
use log::trace;

use crate::{
    event::{Event, KindSet},
    port::{Notify, Port},
};

/// Key a registration by the adapter's allocation address.
#[inline]
fn key_of(adapter: &Arc<dyn Notify>) -> usize {
    Arc::as_ptr(adapter) as *const () as usize
}

/// One live registration: the routing reference plus its kind set.
struct Registration {
    adapter: Arc<dyn Notify>,
    kinds: KindSet,
}

/// A self-contained, thread-safe event port.
#[derive(Default)]
pub struct LocalPort {
    registrations: DashMap<usize, Registration>,
}

impl LocalPort {
    /// Construct an empty port with no registrations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to every registration subscribed to its kind.
    ///
    /// Returns the number of adapters the event was delivered to.
    /// Registrations added by handlers during this call are not delivered to;
    /// registrations removed by handlers during this call are skipped.
    pub fn raise(&self, event: &Event) -> usize {
        // Snapshot first: handlers may re-enter subscribe/unsubscribe, and
        // delivering while iterating would hold shard locks across them.
        let matching: Vec<(usize, Arc<dyn Notify>)> = self
            .registrations
            .iter()
            .filter(|entry| entry.kinds.contains(event.kind()))
            .map(|entry| (*entry.key(), Arc::clone(&entry.adapter)))
            .collect();

        let mut delivered = 0;
        for (key, adapter) in matching {
            // An earlier handler may have torn this registration down.
            if !self.registrations.contains_key(&key) {
                continue;
            }
            adapter.notify(event);
            delivered += 1;
        }
        trace!("raised {} to {delivered} adapters", event.kind());
        delivered
    }

    /// Number of live registrations.
    #[inline]
    pub fn active_count(&self) -> usize {
        self.registrations.len()
    }
}

impl Port for LocalPort {
    fn subscribe(&self, adapter: Arc<dyn Notify>, kinds: &KindSet) {
        self.registrations.insert(
            key_of(&adapter),
            Registration {
                adapter,
                kinds: kinds.clone(),
            },
        );
    }

    fn unsubscribe(&self, adapter: &Arc<dyn Notify>) {
        self.registrations.remove(&key_of(adapter));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::event::kind_set;

    /// A `Notify` built from a closure, for driving the port directly.
    struct FnAdapter(Box<dyn Fn(&Event) + Send + Sync>);

    impl FnAdapter {
        fn new(f: impl Fn(&Event) + Send + Sync + 'static) -> Arc<dyn Notify> {
            Arc::new(Self(Box::new(f)))
        }
    }

    impl Notify for FnAdapter {
        fn notify(&self, event: &Event) {
            (self.0)(event);
        }
    }

    #[test]
    fn raise_routes_by_kind() {
        // Given
        let port = LocalPort::new();
        let moves = Arc::new(AtomicUsize::new(0));
        let zooms = Arc::new(AtomicUsize::new(0));
        let seen_moves = Arc::clone(&moves);
        let seen_zooms = Arc::clone(&zooms);
        port.subscribe(
            FnAdapter::new(move |_| {
                seen_moves.fetch_add(1, Ordering::Relaxed);
            }),
            &kind_set(["move"]),
        );
        port.subscribe(
            FnAdapter::new(move |_| {
                seen_zooms.fetch_add(1, Ordering::Relaxed);
            }),
            &kind_set(["zoom"]),
        );

        // When
        let delivered = port.raise(&Event::empty("move"));

        // Then
        assert_eq!(delivered, 1);
        assert_eq!(moves.load(Ordering::Relaxed), 1);
        assert_eq!(zooms.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        // Given
        let port = LocalPort::new();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let adapter = FnAdapter::new(move |_| {
            seen.fetch_add(1, Ordering::Relaxed);
        });
        port.subscribe(Arc::clone(&adapter), &kind_set(["move"]));
        port.raise(&Event::empty("move"));

        // When
        port.unsubscribe(&adapter);
        let delivered = port.raise(&Event::empty("move"));

        // Then
        assert_eq!(delivered, 0);
        assert_eq!(count.load(Ordering::Relaxed), 1);
        assert_eq!(port.active_count(), 0);
    }

    #[test]
    fn unsubscribing_an_unknown_adapter_is_a_no_op() {
        // Given
        let port = LocalPort::new();
        let adapter = FnAdapter::new(|_| {});

        // When / Then - no panic, nothing registered
        port.unsubscribe(&adapter);
        assert_eq!(port.active_count(), 0);
    }

    #[test]
    fn resubscribing_the_same_adapter_replaces_its_kinds() {
        // Given
        let port = LocalPort::new();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let adapter = FnAdapter::new(move |_| {
            seen.fetch_add(1, Ordering::Relaxed);
        });
        port.subscribe(Arc::clone(&adapter), &kind_set(["move"]));

        // When - one subscription per adapter; the new kind set wins
        port.subscribe(Arc::clone(&adapter), &kind_set(["zoom"]));
        port.raise(&Event::empty("move"));
        port.raise(&Event::empty("zoom"));

        // Then
        assert_eq!(count.load(Ordering::Relaxed), 1);
        assert_eq!(port.active_count(), 1);
    }
}
