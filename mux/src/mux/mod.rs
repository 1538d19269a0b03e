//! The event-subscription multiplexer.
//!
//! [`Multiplexer`] sits between application-level listeners and a single
//! underlying [`Port`], which supports only one active subscription (one
//! event-kind set) per registered downstream identity. On top of that the
//! multiplexer provides:
//!
//! - **Merging**: repeated [`subscribe`](Multiplexer::subscribe) calls for the
//!   same listener widen one underlying subscription instead of stacking new
//!   ones.
//! - **Partial unsubscription**: [`unsubscribe`](Multiplexer::unsubscribe)
//!   removes individual kinds, re-registering the remainder.
//! - **Ephemeral handlers**: [`on_next`](Multiplexer::on_next) fires a handler
//!   once then auto-unsubscribes; [`on_every`](Multiplexer::on_every) fires
//!   repeatedly until cancelled. Both return a [`CancelToken`].
//! - **Guaranteed teardown**: [`dispose`](Multiplexer::dispose) (also run on
//!   drop) releases every outstanding port registration exactly once.
//!
//! # Delivery timing
//!
//! The port may deliver an event synchronously, nested inside the `subscribe`
//! call that registered the adapter, or asynchronously from another thread.
//! Both are handled: registry bookkeeping always completes before port calls
//! are issued, and one-shot handlers tear their entry down before running.

mod adapter;
mod cancel;
mod identity;
mod registry;

use std::sync::Arc;

use crate::{
    event::{Event, EventKind, KindSet, kind_set},
    port::Port,
};

use adapter::{OnceTarget, Target};
use identity::SubscriberId;
use registry::Registry;

pub use cancel::{CancelToken, Cancelable};

/// An application-level consumer of events.
///
/// Listeners are registered with [`Multiplexer::subscribe`] and receive every
/// event the port delivers for their subscribed kinds, unmodified. The same
/// listener `Arc` must be passed to `subscribe` and `unsubscribe`; its
/// allocation address is the listener's identity.
pub trait Listener: Send + Sync {
    /// Receive one event.
    fn notify(&self, event: &Event);
}

/// Multiplexes many listener and handler subscriptions onto one port.
///
/// All operations are synchronous and non-blocking. The multiplexer owns its
/// subscription entries and releases every one of them at disposal; the port
/// only ever holds non-owning routing references to the adapters registered
/// with it.
pub struct Multiplexer {
    registry: Arc<Registry>,
}

impl Multiplexer {
    /// Construct a multiplexer over the given port.
    pub fn new(port: Arc<dyn Port>) -> Self {
        Self {
            registry: Registry::new(port),
        }
    }

    /// Subscribe `listener` to the given kinds, merged with whatever it is
    /// already subscribed to.
    ///
    /// Subscribing to an empty kind sequence, or to kinds already covered, is
    /// a no-op and issues no port calls.
    pub fn subscribe<I>(&self, listener: &Arc<dyn Listener>, kinds: I)
    where
        I: IntoIterator,
        I::Item: Into<EventKind>,
    {
        let id = SubscriberId::of_listener(listener);
        let target = Target::Listener(Arc::clone(listener));
        self.registry.subscribe(id, target, &kind_set(kinds));
    }

    /// Remove the given kinds from `listener`'s subscription. An empty kind
    /// sequence means "unsubscribe from everything". Kinds that were never
    /// subscribed, and listeners with no subscription, are ignored.
    pub fn unsubscribe<I>(&self, listener: &Arc<dyn Listener>, kinds: I)
    where
        I: IntoIterator,
        I::Item: Into<EventKind>,
    {
        let id = SubscriberId::of_listener(listener);
        self.registry.unsubscribe(id, &kind_set(kinds));
    }

    /// Subscribe `handler` to fire **once** for the next event matching
    /// `kinds`, then auto-unsubscribe.
    ///
    /// The subscription is torn down before the handler runs, so a
    /// [`cancel`](Cancelable::cancel) issued from inside the handler is a
    /// no-op. The returned token cancels the subscription early if no event
    /// has fired yet.
    pub fn on_next<I, F>(&self, kinds: I, handler: F) -> CancelToken
    where
        I: IntoIterator,
        I::Item: Into<EventKind>,
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = self.registry.allocate_ephemeral();
        let once = OnceTarget::new(handler, Arc::downgrade(&self.registry), id);
        self.registry
            .subscribe(id, Target::Once(once), &kind_set(kinds));
        CancelToken::new(Arc::downgrade(&self.registry), id)
    }

    /// Subscribe `handler` to fire for **every** event matching `kinds` until
    /// the returned token is cancelled.
    pub fn on_every<I, F>(&self, kinds: I, handler: F) -> CancelToken
    where
        I: IntoIterator,
        I::Item: Into<EventKind>,
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = self.registry.allocate_ephemeral();
        self.registry
            .subscribe(id, Target::Every(Arc::new(handler)), &kind_set(kinds));
        CancelToken::new(Arc::downgrade(&self.registry), id)
    }

    /// Tear down every outstanding subscription, exactly one port unsubscribe
    /// per entry. Idempotent; also run automatically when the multiplexer is
    /// dropped. After disposal, no new subscriptions are accepted.
    pub fn dispose(&self) {
        self.registry.dispose();
    }

    /// Whether disposal has begun.
    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.registry.is_disposed()
    }

    /// The kinds `listener` is currently subscribed to, if any.
    pub fn active_kinds(&self, listener: &Arc<dyn Listener>) -> Option<KindSet> {
        self.registry.kinds_of(SubscriberId::of_listener(listener))
    }

    /// Number of live subscription entries (listeners and ephemerals).
    #[inline]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Whether no subscription entries are live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registry.len() == 0
    }
}

impl Drop for Multiplexer {
    fn drop(&mut self) {
        self.registry.dispose();
    }
}
