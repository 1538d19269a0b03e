//! Demo wiring of the multiplexer over [`LocalPort`].
//!
//! Subscribes a listener and both kinds of ephemeral handler, then raises
//! events from the main thread and from a producer thread feeding a crossbeam
//! channel, and finally disposes everything explicitly.

use std::sync::{Arc, Mutex};

use crossbeam::channel::unbounded;
use log::{Level, LevelFilter, Metadata, Record, info};

use evmux::{Event, Listener, LocalPort, Multiplexer};

/// Minimal stdout logger so the library's diagnostics are visible.
struct StdoutLogger;

impl log::Log for StdoutLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StdoutLogger = StdoutLogger;

/// Tracks the camera kinds it has seen.
struct CameraTracker {
    seen: Mutex<Vec<String>>,
}

impl Listener for CameraTracker {
    fn notify(&self, event: &Event) {
        self.seen.lock().unwrap().push(event.kind().to_string());
    }
}

fn main() {
    log::set_logger(&LOGGER).expect("logger already installed");
    log::set_max_level(LevelFilter::Debug);

    let port = Arc::new(LocalPort::new());
    let mux = Multiplexer::new(port.clone());

    // A long-lived listener, widened over two subscribe calls.
    let tracker = Arc::new(CameraTracker {
        seen: Mutex::new(Vec::new()),
    });
    let listener: Arc<dyn Listener> = tracker.clone();
    mux.subscribe(&listener, ["camera-moved"]);
    mux.subscribe(&listener, ["camera-zoomed"]);

    // A one-shot: fires for the first style-loaded event only.
    let _ready = mux.on_next(["style-loaded"], |event| {
        info!("style ready: {event:?}");
    });

    // A continuous handler with explicit cancellation.
    let ticks = mux.on_every(["tick"], |event| {
        info!("tick: {:?}", event.payload::<u64>());
    });

    // Synchronous deliveries from this thread.
    port.raise(&Event::empty("camera-moved"));
    port.raise(&Event::empty("style-loaded"));
    port.raise(&Event::empty("style-loaded")); // one-shot already gone

    // Asynchronous deliveries: a producer thread feeds a channel, the port
    // dispatches as events drain.
    let (sender, receiver) = unbounded::<Event>();
    let producer = std::thread::spawn(move || {
        for n in 0..5u64 {
            sender.send(Event::new("tick", n)).unwrap();
        }
        sender.send(Event::empty("camera-zoomed")).unwrap();
    });
    for event in receiver.iter() {
        port.raise(&event);
    }
    producer.join().unwrap();

    ticks.cancel();
    ticks.cancel(); // idempotent

    info!("tracker saw: {:?}", tracker.seen.lock().unwrap());

    // Explicit teardown; dropping the multiplexer would do the same.
    mux.dispose();
    info!("registrations left on port: {}", port.active_count());
}
