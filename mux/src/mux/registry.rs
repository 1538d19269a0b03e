//! The subscription registry: per-identity kind sets and live port handles.
//!
//! The registry is the multiplexer's single piece of state. It maps a
//! [`SubscriberId`] to its currently active kind set plus the adapter
//! registered with the port for it, and implements the merge/diff state
//! machine:
//!
//! - [`subscribe`](Registry::subscribe) only ever **widens** an identity's
//!   kind set (union); a subset re-subscribe issues no port calls at all.
//! - [`unsubscribe`](Registry::unsubscribe) only **narrows** or removes; kinds
//!   that were never subscribed are ignored.
//! - Any change to the effective kind set is realized against the port as
//!   unsubscribe-old-adapter followed by subscribe-fresh-adapter, keeping at
//!   most one live registration per identity.
//! - [`dispose`](Registry::dispose) tears down every remaining entry exactly
//!   once and refuses all later registrations.
//!
//! # Reentrancy
//!
//! Entries live in a sharded concurrent map. All port calls and handler
//! invocations happen **after** the relevant map guard is released, so a port
//! that delivers synchronously from inside `subscribe` (and a one-shot
//! handler that tears itself down from inside that delivery) re-enters the
//! registry without deadlocking.

use std::{
    mem,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use dashmap::DashMap;
use log::{debug, warn};

use crate::{
    event::KindSet,
    mux::{
        adapter::{Adapter, Target},
        identity::SubscriberId,
    },
    port::{Notify, Port},
};

/// One registry entry: the subscription state for a single identity.
struct Subscription {
    /// The kinds this identity is currently subscribed to. Never empty while
    /// the entry exists.
    kinds: KindSet,

    /// Routing target, cloned into each fresh adapter on re-registration.
    target: Target,

    /// The adapter currently registered with the port. Exactly one per
    /// identity at any time.
    adapter: Arc<Adapter>,
}

/// A port call computed under the map guard and issued after it is released.
enum PortAction {
    /// Nothing to do (no-op paths and the dedup optimization).
    None,

    /// First registration for an identity.
    Register { adapter: Arc<Adapter>, kinds: KindSet },

    /// Re-registration after a widen or narrow: retire the old adapter, then
    /// register the fresh one with the new effective kind set.
    Replace {
        retired: Arc<Adapter>,
        adapter: Arc<Adapter>,
        kinds: KindSet,
    },

    /// The narrow removed the last kind; tear the whole entry down.
    Teardown,
}

/// Identity-keyed subscription state shared between the multiplexer, its
/// adapters, and outstanding cancel tokens.
pub(crate) struct Registry {
    port: Arc<dyn Port>,
    entries: DashMap<SubscriberId, Subscription>,

    /// Set once disposal begins; no port subscribe is issued afterwards.
    disposed: AtomicBool,

    /// Next ephemeral identity for `on_next`/`on_every` entries.
    next_ephemeral: AtomicU64,
}

impl Registry {
    pub(crate) fn new(port: Arc<dyn Port>) -> Arc<Self> {
        Arc::new(Self {
            port,
            entries: DashMap::new(),
            disposed: AtomicBool::new(false),
            next_ephemeral: AtomicU64::new(0),
        })
    }

    /// Allocate a fresh ephemeral identity, disjoint from every other.
    pub(crate) fn allocate_ephemeral(&self) -> SubscriberId {
        SubscriberId::Ephemeral(self.next_ephemeral.fetch_add(1, Ordering::Relaxed))
    }

    /// Widen the identity's subscription to cover `kinds` as well.
    ///
    /// Empty `kinds` is a no-op. If the identity is already subscribed to a
    /// superset, no port call is made. Otherwise the port registration is
    /// replaced with one covering the union.
    pub(crate) fn subscribe(&self, id: SubscriberId, target: Target, kinds: &KindSet) {
        if kinds.is_empty() {
            return;
        }
        if self.disposed.load(Ordering::Acquire) {
            warn!("ignoring subscribe for {id:?}: registry already disposed");
            return;
        }

        let action = match self.entries.entry(id) {
            dashmap::Entry::Occupied(mut occupied) => {
                let subscription = occupied.get_mut();
                if kinds.is_subset(&subscription.kinds) {
                    // Already covered; avoid redundant port churn.
                    PortAction::None
                } else {
                    subscription.kinds.extend(kinds.iter().cloned());
                    let adapter = Adapter::new(subscription.target.clone());
                    let retired = mem::replace(&mut subscription.adapter, Arc::clone(&adapter));
                    debug!(
                        "widening {id:?} to {} kinds",
                        subscription.kinds.len()
                    );
                    PortAction::Replace {
                        retired,
                        adapter,
                        kinds: subscription.kinds.clone(),
                    }
                }
            }
            dashmap::Entry::Vacant(vacant) => {
                let adapter = Adapter::new(target.clone());
                vacant.insert(Subscription {
                    kinds: kinds.clone(),
                    target,
                    adapter: Arc::clone(&adapter),
                });
                debug!("registering {id:?} with {} kinds", kinds.len());
                PortAction::Register {
                    adapter,
                    kinds: kinds.clone(),
                }
            }
        };

        self.apply(id, action);
    }

    /// Narrow the identity's subscription by removing `kinds`.
    ///
    /// Empty `kinds` means "remove everything". Unknown identities and kinds
    /// that were never subscribed are ignored. If no subscribed kind remains,
    /// the entry is torn down.
    pub(crate) fn unsubscribe(&self, id: SubscriberId, kinds: &KindSet) {
        if kinds.is_empty() {
            self.teardown(id);
            return;
        }

        let action = {
            let Some(mut entry) = self.entries.get_mut(&id) else {
                warn!("ignoring unsubscribe for unknown identity {id:?}");
                return;
            };
            let subscription = entry.value_mut();
            let remaining: KindSet = subscription.kinds.difference(kinds).cloned().collect();
            if remaining.len() == subscription.kinds.len() {
                // None of the kinds were subscribed.
                PortAction::None
            } else if remaining.is_empty() {
                PortAction::Teardown
            } else {
                subscription.kinds = remaining.clone();
                let adapter = Adapter::new(subscription.target.clone());
                let retired = mem::replace(&mut subscription.adapter, Arc::clone(&adapter));
                debug!("narrowing {id:?} to {} kinds", remaining.len());
                PortAction::Replace {
                    retired,
                    adapter,
                    kinds: remaining,
                }
            }
        };

        self.apply(id, action);
    }

    /// Remove the identity's entry entirely, releasing its port registration.
    /// A no-op for identities with no entry, which makes repeat cancels and
    /// repeat disposes safe.
    pub(crate) fn teardown(&self, id: SubscriberId) {
        let Some((_, subscription)) = self.entries.remove(&id) else {
            return;
        };
        debug!("tearing down {id:?}");
        subscription.adapter.revoke();
        let retired: Arc<dyn Notify> = subscription.adapter;
        self.port.unsubscribe(&retired);
    }

    /// Tear down every remaining entry, exactly one port unsubscribe each.
    /// Ordering across entries is unspecified. Idempotent.
    pub(crate) fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let ids: Vec<SubscriberId> = self.entries.iter().map(|entry| *entry.key()).collect();
        debug!("disposing registry with {} outstanding entries", ids.len());
        for id in ids {
            self.teardown(id);
        }
    }

    /// Whether disposal has begun.
    #[inline]
    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// The kinds the identity is currently subscribed to, if any.
    pub(crate) fn kinds_of(&self, id: SubscriberId) -> Option<KindSet> {
        self.entries.get(&id).map(|entry| entry.kinds.clone())
    }

    /// Number of live entries.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Issue the port calls for an action. Runs with no map guard held, so
    /// synchronous deliveries may re-enter the registry freely.
    fn apply(&self, id: SubscriberId, action: PortAction) {
        match action {
            PortAction::None => {}
            PortAction::Register { adapter, kinds } => {
                self.port.subscribe(adapter, &kinds);
            }
            PortAction::Replace {
                retired,
                adapter,
                kinds,
            } => {
                retired.revoke();
                let retired: Arc<dyn Notify> = retired;
                self.port.unsubscribe(&retired);
                self.port.subscribe(adapter, &kinds);
            }
            PortAction::Teardown => self.teardown(id),
        }
    }
}
