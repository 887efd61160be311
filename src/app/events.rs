//! Outbound application events.
//!
//! Agent components emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (serial log, test recorder).

/// Structured events emitted by the agent core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The controlled unit was switched.
    ActuatorChanged { on: bool },

    /// The telemetry publisher loop started.
    PublisherStarted,

    /// The telemetry publisher loop exited after a stop request.
    PublisherStopped,

    /// A sample was handed to the uplink queue.
    SampleQueued { sequence: u64 },

    /// The uplink queue was full; the sample was discarded.
    SampleDropped { sequence: u64 },

    /// The transport rejected a queued sample.
    PublishFailed { sequence: u64, error: String },

    /// The transmit interval was changed (milliseconds).
    IntervalChanged(u32),

    TransportConnected,

    TransportDisconnected,

    /// The shutdown sequence finished.
    ShutdownComplete,
}
