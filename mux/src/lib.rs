//! Event-subscription multiplexing over a single-subscription port.
//!
//! A native notification source (a *port*) often supports only one active
//! subscription - one event-kind set - per registered downstream identity.
//! This crate provides [`Multiplexer`], which layers the capabilities
//! applications actually want on top of such a port:
//!
//! - merging repeated subscribe calls for one listener into a single widened
//!   registration,
//! - partial unsubscription by event kind,
//! - one-shot ([`Multiplexer::on_next`]) and continuous
//!   ([`Multiplexer::on_every`]) handler subscriptions with idempotent
//!   cancellation,
//! - guaranteed release of every outstanding registration at disposal.
//!
//! # Overview
//!
//! ```rust,ignore
//! let port = Arc::new(LocalPort::new());
//! let mux = Multiplexer::new(port.clone());
//!
//! let listener: Arc<dyn Listener> = Arc::new(CameraTracker::default());
//! mux.subscribe(&listener, ["camera-moved", "camera-zoomed"]);
//!
//! let token = mux.on_next(["style-loaded"], |event| {
//!     println!("style is ready: {:?}", event);
//! });
//!
//! port.raise(&Event::empty("camera-moved"));
//!
//! token.cancel(); // no-op if the one-shot already fired
//! mux.dispose();  // also runs on drop
//! ```
//!
//! The port behind the multiplexer is anything implementing [`Port`];
//! [`LocalPort`] is a ready-made in-process implementation for hosts without
//! a native source.

pub mod event;
pub mod local;
pub mod mux;
pub mod port;

pub use event::{Event, EventKind, KindSet, kind_set};
pub use local::LocalPort;
pub use mux::{CancelToken, Cancelable, Listener, Multiplexer};
pub use port::{Notify, Port};

#[cfg(test)]
mod tests {
    //! End-to-end coverage of the multiplexer running over [`LocalPort`].

    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    struct Recording {
        seen: Mutex<Vec<String>>,
    }

    impl Recording {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl Listener for Recording {
        fn notify(&self, event: &Event) {
            self.seen.lock().unwrap().push(event.kind().as_str().to_string());
        }
    }

    #[test]
    fn multiplexer_over_local_port() {
        // Given
        let port = Arc::new(LocalPort::new());
        let mux = Multiplexer::new(port.clone());
        let recording = Recording::new();
        let listener: Arc<dyn Listener> = recording.clone();
        mux.subscribe(&listener, ["move", "zoom"]);

        let once = Arc::new(AtomicUsize::new(0));
        let every = Arc::new(AtomicUsize::new(0));
        let seen_once = Arc::clone(&once);
        let seen_every = Arc::clone(&every);
        let _next = mux.on_next(["move"], move |_| {
            seen_once.fetch_add(1, Ordering::Relaxed);
        });
        let token = mux.on_every(["move"], move |_| {
            seen_every.fetch_add(1, Ordering::Relaxed);
        });

        // When
        port.raise(&Event::empty("move"));
        port.raise(&Event::empty("move"));
        port.raise(&Event::empty("zoom"));
        token.cancel();
        port.raise(&Event::empty("move"));

        // Then
        assert_eq!(
            recording.seen.lock().unwrap().clone(),
            vec!["move", "move", "zoom", "move"]
        );
        assert_eq!(once.load(Ordering::Relaxed), 1);
        assert_eq!(every.load(Ordering::Relaxed), 2);

        // When
        mux.dispose();

        // Then - every registration released
        assert_eq!(port.active_count(), 0);
    }

    #[test]
    fn payloads_reach_handlers_intact() {
        // Given
        let port = Arc::new(LocalPort::new());
        let mux = Multiplexer::new(port.clone());
        let captured: Arc<Mutex<Option<u64>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&captured);
        let _token = mux.on_every(["progress"], move |event| {
            *slot.lock().unwrap() = event.payload::<u64>().copied();
        });

        // When
        port.raise(&Event::new("progress", 75u64));

        // Then
        assert_eq!(*captured.lock().unwrap(), Some(75));
        mux.dispose();
    }

    #[test]
    fn delivery_from_another_thread() {
        // Given
        let port = Arc::new(LocalPort::new());
        let mux = Multiplexer::new(port.clone());
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let _token = mux.on_every(["tick"], move |_| {
            seen.fetch_add(1, Ordering::Relaxed);
        });

        // When - the port dispatches from its own thread
        let producer = {
            let port = Arc::clone(&port);
            std::thread::spawn(move || {
                for _ in 0..10 {
                    port.raise(&Event::empty("tick"));
                }
            })
        };
        producer.join().unwrap();

        // Then
        assert_eq!(count.load(Ordering::Relaxed), 10);
        mux.dispose();
    }
}
