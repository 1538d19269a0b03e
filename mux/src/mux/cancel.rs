//! Cancellation capabilities for ephemeral subscriptions.
//!
//! [`Multiplexer::on_next`](crate::Multiplexer::on_next) and
//! [`Multiplexer::on_every`](crate::Multiplexer::on_every) return a
//! [`CancelToken`] permitting early teardown of the subscription they
//! created. Cancellation is idempotent: however many times and from whatever
//! context [`cancel`](Cancelable::cancel) is invoked - including from inside
//! the very handler the token was returned alongside - it has at most one
//! observable effect.

use std::sync::Weak;

use crate::mux::{identity::SubscriberId, registry::Registry};

/// A capability permitting idempotent early teardown of one subscription.
pub trait Cancelable {
    /// End the subscription. Safe to call repeatedly; every call after the
    /// subscription has ended (by cancellation, one-shot delivery, or
    /// disposal of the multiplexer) is a no-op.
    fn cancel(&self);
}

/// Cancellation capability for one ephemeral subscription.
///
/// Holds only a weak reference to the multiplexer's registry plus the
/// synthetic identity, so an outstanding token never keeps a discarded
/// multiplexer alive.
pub struct CancelToken {
    registry: Weak<Registry>,
    id: SubscriberId,
}

impl CancelToken {
    pub(crate) fn new(registry: Weak<Registry>, id: SubscriberId) -> Self {
        Self { registry, id }
    }

    /// See [`Cancelable::cancel`].
    pub fn cancel(&self) {
        // Idempotence falls out of the registry: once the entry is gone,
        // teardown finds nothing to do.
        if let Some(registry) = self.registry.upgrade() {
            registry.teardown(self.id);
        }
    }
}

impl Cancelable for CancelToken {
    fn cancel(&self) {
        CancelToken::cancel(self);
    }
}
