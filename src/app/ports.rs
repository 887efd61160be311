//! Port traits: the hexagonal boundary between the agent core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Agent components (domain)
//! ```
//!
//! Driven adapters (sensor, outputs, display, transport, event sinks)
//! implement these traits.  The [`Agent`](super::agent::Agent) holds them
//! as trait objects, so the domain core never touches hardware directly
//! and every component can be exercised against recording mocks.
//!
//! Every port is `Send` because each one is shared with at least one
//! background thread (publisher, refresher, uplink I/O, remote handler).

use std::sync::Arc;

use crate::error::TransportError;
use crate::sensors::Reading;

use super::commands::MethodResponse;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port for the environmental sensor.
pub trait SensorPort: Send {
    /// Take one reading.  Never fails; adapters report the last good
    /// value when the bus misbehaves.
    fn read_sample(&mut self) -> Reading;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the relay and the indicator LED.
pub trait ActuatorPort: Send {
    /// Drive the controlled unit's relay.
    fn set_relay(&mut self, on: bool);

    /// Drive the indicator LED.
    fn set_indicator(&mut self, on: bool);

    /// Both outputs low (shutdown).
    fn all_off(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Display port (driven adapter: domain → character display)
// ───────────────────────────────────────────────────────────────

/// Character display.  Exclusive access is enforced one level up by
/// [`SharedDisplay`](super::display::SharedDisplay); implementations do
/// not lock.
pub trait DisplayPort: Send {
    /// Replace the display contents with `text` (may contain `\n`).
    fn render(&mut self, text: &str);

    fn clear(&mut self);

    /// Backlight / panel power.
    fn set_power(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Telemetry transport port (driven adapter: domain ↔ cloud)
// ───────────────────────────────────────────────────────────────

/// Callback the transport invokes for a registered remote method.
/// Receives the raw request payload and returns the response to send.
pub type CommandHandler = Arc<dyn Fn(&[u8]) -> MethodResponse + Send + Sync>;

/// Connection to the remote telemetry endpoint.
///
/// Implementations own their reconnect behaviour; the agent neither
/// retries nor backs off.  Registered handlers may be invoked from any
/// thread, concurrently with each other.
pub trait TelemetryTransport: Send + Sync {
    fn connect(&self) -> Result<(), TransportError>;

    /// Send one serialized telemetry message.
    fn publish(&self, payload: &[u8]) -> Result<(), TransportError>;

    /// Route invocations of remote method `name` to `handler`.
    fn register_command_handler(
        &self,
        name: &str,
        handler: CommandHandler,
    ) -> Result<(), TransportError>;

    fn disconnect(&self);

    fn is_connected(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Shared across threads, hence `&self`.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &super::events::AppEvent);
}
