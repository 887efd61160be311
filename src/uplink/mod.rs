//! Detached telemetry uplink.
//!
//! The publisher hands serialized samples to [`Uplink::submit`], which
//! never blocks: samples go onto a bounded `embassy-sync` channel and a
//! dedicated I/O thread publishes them.  That thread runs an
//! `edge-executor` local executor driven by `futures_lite::block_on`:
//!
//! ```text
//!  publisher ──try_send──▶ [ queue: 16 ] ──receive().await──▶ publish_loop ──▶ transport
//!                                                    uplink I/O thread
//! ```
//!
//! A full queue drops the sample (logged, `SampleDropped`).  A failed
//! publish is logged and reported as `PublishFailed`; there is no retry.
//! [`Uplink::stop`] wakes the executor through a shutdown signal, joins
//! the thread and publishes whatever is still queued.

pub mod iothub;

use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, TelemetryTransport};
use crate::drivers::task_pin::{Core, spawn_on_core};
use crate::telemetry::TelemetrySample;

/// Queue depth in samples.
pub const QUEUE_DEPTH: usize = 16;

/// Largest serialized sample the queue accepts.
pub const MAX_PAYLOAD: usize = 256;

/// One serialized sample waiting for the transport.
pub struct OutboundMsg {
    pub sequence: u64,
    pub payload: heapless::Vec<u8, MAX_PAYLOAD>,
}

type Queue = Channel<CriticalSectionRawMutex, OutboundMsg, QUEUE_DEPTH>;
type ShutdownSignal = Signal<CriticalSectionRawMutex, ()>;

pub struct Uplink {
    queue: Arc<Queue>,
    shutdown: Arc<ShutdownSignal>,
    transport: Arc<dyn TelemetryTransport>,
    events: Arc<dyn EventSink>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Uplink {
    pub fn new(transport: Arc<dyn TelemetryTransport>, events: Arc<dyn EventSink>) -> Self {
        Self {
            queue: Arc::new(Channel::new()),
            shutdown: Arc::new(Signal::new()),
            transport,
            events,
            worker: Mutex::new(None),
        }
    }

    /// Serialize `sample` and queue it.  Returns `false` if it was dropped.
    pub fn submit(&self, sample: &TelemetrySample) -> bool {
        let sequence = sample.sequence;
        let payload = match sample.to_json() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("UPLINK | #{} serialization failed: {}", sequence, e);
                self.events.emit(&AppEvent::SampleDropped { sequence });
                return false;
            }
        };
        let Ok(payload) = heapless::Vec::from_slice(&payload) else {
            warn!(
                "UPLINK | #{} is {} bytes, limit is {}; dropping",
                sequence,
                payload.len(),
                MAX_PAYLOAD
            );
            self.events.emit(&AppEvent::SampleDropped { sequence });
            return false;
        };

        if self.queue.try_send(OutboundMsg { sequence, payload }).is_err() {
            warn!("UPLINK | queue full, dropping sample #{}", sequence);
            self.events.emit(&AppEvent::SampleDropped { sequence });
            return false;
        }
        self.events.emit(&AppEvent::SampleQueued { sequence });
        true
    }

    /// Samples currently waiting in the queue.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Spawn the I/O thread.  No-op when it is already running.
    pub fn start(&self) -> io::Result<()> {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker.is_some() {
            return Ok(());
        }
        self.shutdown.reset();

        let queue = self.queue.clone();
        let shutdown = self.shutdown.clone();
        let transport = self.transport.clone();
        let events = self.events.clone();
        *worker = Some(spawn_on_core(Core::Pro, 10, 8, "uplink\0", move || {
            run_io_loop(&queue, &shutdown, transport, events);
        })?);
        Ok(())
    }

    /// Signal the I/O thread, wait for it, and flush the queue.
    pub fn stop(&self) {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            self.shutdown.signal(());
            if handle.join().is_err() {
                warn!("UPLINK | I/O thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

fn publish_one(transport: &dyn TelemetryTransport, events: &dyn EventSink, msg: &OutboundMsg) {
    match transport.publish(&msg.payload) {
        Ok(()) => debug!("UPLINK | published #{}", msg.sequence),
        Err(e) => {
            warn!("UPLINK | publish #{} failed: {}", msg.sequence, e);
            events.emit(&AppEvent::PublishFailed {
                sequence: msg.sequence,
                error: e.to_string(),
            });
        }
    }
}

/// Wakes on every queued sample; runs until the executor is dropped.
async fn publish_loop(
    queue: Arc<Queue>,
    transport: Arc<dyn TelemetryTransport>,
    events: Arc<dyn EventSink>,
) {
    loop {
        let msg = queue.receive().await;
        publish_one(transport.as_ref(), events.as_ref(), &msg);
    }
}

fn run_io_loop(
    queue: &Arc<Queue>,
    shutdown: &ShutdownSignal,
    transport: Arc<dyn TelemetryTransport>,
    events: Arc<dyn EventSink>,
) {
    let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();
    executor
        .spawn(publish_loop(queue.clone(), transport.clone(), events.clone()))
        .detach();

    info!("UPLINK | I/O thread started (queue depth {})", QUEUE_DEPTH);
    futures_lite::future::block_on(executor.run(shutdown.wait()));
    drop(executor);

    let mut flushed = 0usize;
    while let Ok(msg) = queue.try_receive() {
        publish_one(transport.as_ref(), events.as_ref(), &msg);
        flushed += 1;
    }
    info!("UPLINK | I/O thread stopped, flushed {} queued", flushed);
}
