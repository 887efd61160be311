//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each [`AppEvent`] as a one-line
//! `TAG | …` record through the `log` facade (UART on the device, the
//! tracing subscriber on the host).

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &AppEvent) {
        match event {
            AppEvent::ActuatorChanged { on } => {
                info!("ACTUATOR | {}", if *on { "ON" } else { "OFF" });
            }
            AppEvent::PublisherStarted => info!("TELEM | publisher started"),
            AppEvent::PublisherStopped => info!("TELEM | publisher stopped"),
            AppEvent::SampleQueued { sequence } => debug!("TELEM | queued #{}", sequence),
            AppEvent::SampleDropped { sequence } => warn!("TELEM | dropped #{}", sequence),
            AppEvent::PublishFailed { sequence, error } => {
                warn!("TELEM | publish #{} failed: {}", sequence, error);
            }
            AppEvent::IntervalChanged(ms) => info!("CONFIG | transmit interval {}ms", ms),
            AppEvent::TransportConnected => info!("LINK | connected"),
            AppEvent::TransportDisconnected => info!("LINK | disconnected"),
            AppEvent::ShutdownComplete => info!("AGENT | shutdown complete"),
        }
    }
}
