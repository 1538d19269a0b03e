//! Identity tokens for subscription registry entries.
//!
//! The registry keys its entries by an explicit comparable token rather than
//! by listener object identity. Two disjoint namespaces exist by
//! construction, so ephemeral handler subscriptions can never collide with
//! client listeners or with each other.

use std::sync::Arc;

use crate::mux::Listener;

/// Identity of one registry entry. A map key only; holding a `SubscriberId`
/// implies no ownership of anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum SubscriberId {
    /// A client listener, identified by the allocation address of its `Arc`.
    /// The registry entry holds a clone of that `Arc`, so the address cannot
    /// be reused for a different listener while the entry is live.
    Listener(usize),

    /// An ephemeral `on_next`/`on_every` subscription, identified by a
    /// per-multiplexer counter value.
    Ephemeral(u64),
}

impl SubscriberId {
    /// Derive the identity of a client listener.
    #[inline]
    pub(crate) fn of_listener(listener: &Arc<dyn Listener>) -> Self {
        Self::Listener(Arc::as_ptr(listener) as *const () as usize)
    }
}
