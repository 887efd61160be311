//! Periodic telemetry publisher.
//!
//! ```text
//!   Stopped ──start()──▶ Running ──stop()──▶ CancelRequested ──loop exits──▶ Stopped
//! ```
//!
//! One cycle: read the sensor, raise the indicator, queue a sample on the
//! uplink, then rest for the current interval inside the transmit hold
//! (indicator dropped first).  Cancellation is checked at the top of each
//! cycle and also ends the rest, including a wait for a hold the console
//! has taken, so `stop()` returns within one sensor read.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use log::{info, warn};

use crate::drivers::task_pin::{Core, spawn_on_core};
use crate::telemetry::{SequenceCounter, TelemetrySample};
use crate::uplink::Uplink;

use super::actuator::ActuatorController;
use super::events::AppEvent;
use super::ports::EventSink;
use super::sensor::SharedSensor;
use super::transmit::TransmitCycle;

/// Cooperative cancellation flag shared with one loop thread.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Everything one publish cycle touches.
pub struct PublishContext {
    pub device_id: String,
    pub sensor: Arc<SharedSensor>,
    pub actuator: Arc<ActuatorController>,
    pub transmit: Arc<TransmitCycle>,
    pub uplink: Arc<Uplink>,
    pub sequence: Arc<SequenceCounter>,
    pub events: Arc<dyn EventSink>,
}

impl PublishContext {
    fn cycle(&self, cancel: &CancelToken) {
        let reading = self.sensor.read();
        self.actuator.set_indicator(true);

        let sample = TelemetrySample::new(&self.device_id, self.sequence.next(), reading);
        self.uplink.submit(&sample);

        self.transmit
            .rest(|| cancel.is_cancelled(), || self.actuator.set_indicator(false));
        self.actuator.set_indicator(false);
    }
}

pub struct TelemetryPublisher {
    ctx: Arc<PublishContext>,
    cancel: CancelToken,
    task: Option<JoinHandle<()>>,
}

impl TelemetryPublisher {
    pub fn new(ctx: PublishContext) -> Self {
        Self {
            ctx: Arc::new(ctx),
            cancel: CancelToken::default(),
            task: None,
        }
    }

    /// Spawn the loop.  Returns `Ok(false)` if it is already running.
    pub fn start(&mut self) -> io::Result<bool> {
        if self.is_transmitting() {
            return Ok(false);
        }
        // A loop that finished on its own (panic) still needs reaping.
        if let Some(old) = self.task.take() {
            let _ = old.join();
        }

        let ctx = self.ctx.clone();
        let cancel = self.cancel.clone();
        self.task = Some(spawn_on_core(Core::App, 5, 8, "publisher\0", move || {
            while !cancel.is_cancelled() {
                ctx.cycle(&cancel);
            }
            info!("Telemetry publisher stopped");
            ctx.events.emit(&AppEvent::PublisherStopped);
        })?);

        info!(
            "Telemetry publisher started (every {}ms)",
            self.ctx.transmit.interval()
        );
        self.ctx.events.emit(&AppEvent::PublisherStarted);
        Ok(true)
    }

    /// Request cancellation and block until the loop has exited.
    /// Returns `false` when nothing was running.
    pub fn stop(&mut self) -> bool {
        let Some(task) = self.task.take() else {
            return false;
        };
        self.cancel.cancel();
        self.ctx.transmit.interrupt();
        if task.join().is_err() {
            warn!("Telemetry publisher thread panicked");
        }
        self.cancel = CancelToken::default();
        true
    }

    pub fn is_transmitting(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}
