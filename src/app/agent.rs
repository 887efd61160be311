//! The agent: owns every component and shared resource.
//!
//! Built once at startup and handed around as `Arc<Agent>` to the console
//! loop, the interrupt handler and (through [`RemoteCommandHandler`]) the
//! transport.  Background tasks receive only the pieces they touch.

use std::io;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use log::{error, info, warn};

use crate::config::AgentConfig;
use crate::error::Result;
use crate::sensors::Reading;
use crate::telemetry::SequenceCounter;
use crate::uplink::Uplink;

use super::actuator::ActuatorController;
use super::commands::CONTROL_RELAY_METHOD;
use super::display::SharedDisplay;
use super::events::AppEvent;
use super::ports::{ActuatorPort, DisplayPort, EventSink, SensorPort, TelemetryTransport};
use super::publisher::{PublishContext, TelemetryPublisher};
use super::refresher::DisplayRefresher;
use super::remote::RemoteCommandHandler;
use super::sensor::SharedSensor;
use super::transmit::TransmitCycle;

/// The adapters an agent is built from.
pub struct AgentHardware {
    pub sensor: Box<dyn SensorPort>,
    pub outputs: Box<dyn ActuatorPort>,
    pub display: Box<dyn DisplayPort>,
    pub transport: Arc<dyn TelemetryTransport>,
    pub events: Arc<dyn EventSink>,
}

/// Snapshot for the console `s` command and the menu.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentStatus {
    pub actuator_on: bool,
    pub reading: Reading,
    pub transmitting: bool,
    pub interval_ms: NonZeroU32,
}

pub struct Agent {
    config: AgentConfig,
    sensor: Arc<SharedSensor>,
    actuator: Arc<ActuatorController>,
    display: Arc<SharedDisplay>,
    transmit: Arc<TransmitCycle>,
    uplink: Arc<Uplink>,
    transport: Arc<dyn TelemetryTransport>,
    events: Arc<dyn EventSink>,
    sequence: Arc<SequenceCounter>,
    publisher: Mutex<TelemetryPublisher>,
    refresher: Mutex<Option<DisplayRefresher>>,
    exit_requested: Mutex<bool>,
    exit_cv: Condvar,
    started: AtomicBool,
    shut_down: AtomicBool,
}

impl Agent {
    pub fn new(config: AgentConfig, hw: AgentHardware) -> Self {
        let sensor = Arc::new(SharedSensor::new(hw.sensor));
        let display = Arc::new(SharedDisplay::new(hw.display));
        let actuator = Arc::new(ActuatorController::new(
            hw.outputs,
            config.actuator_name.clone(),
            display.clone(),
            config.status_dwell(),
            hw.events.clone(),
        ));
        let transmit = Arc::new(TransmitCycle::new(config.transmit_interval()));
        let uplink = Arc::new(Uplink::new(hw.transport.clone(), hw.events.clone()));
        let sequence = Arc::new(SequenceCounter::new());

        let publisher = TelemetryPublisher::new(PublishContext {
            device_id: config.device_id.clone(),
            sensor: sensor.clone(),
            actuator: actuator.clone(),
            transmit: transmit.clone(),
            uplink: uplink.clone(),
            sequence: sequence.clone(),
            events: hw.events.clone(),
        });

        Self {
            config,
            sensor,
            actuator,
            display,
            transmit,
            uplink,
            transport: hw.transport,
            events: hw.events,
            sequence,
            publisher: Mutex::new(publisher),
            refresher: Mutex::new(None),
            exit_requested: Mutex::new(false),
            exit_cv: Condvar::new(),
            started: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Connect, register the remote handler, and start the background
    /// tasks.  A failed connect is logged and the agent keeps running.
    /// Only the first call does anything, and none after shutdown.
    pub fn start(&self) -> Result<()> {
        if self.is_shut_down() || self.started.swap(true, Ordering::AcqRel) {
            warn!("RTDMS agent already started or shut down; ignoring start");
            return Ok(());
        }

        match self.transport.connect() {
            Ok(()) => {
                info!("Connected to telemetry endpoint");
                self.events.emit(&AppEvent::TransportConnected);
            }
            Err(e) => error!("Error connecting to telemetry endpoint: {}", e),
        }

        self.transport
            .register_command_handler(CONTROL_RELAY_METHOD, self.remote_handler().into_handler())?;
        self.uplink.start()?;

        self.display.power_on();
        let refresher = DisplayRefresher::start(
            self.display.clone(),
            self.sensor.clone(),
            self.config.display_refresh(),
        )?;
        *lock(&self.refresher) = Some(refresher);

        info!(
            "RTDMS agent '{}' started (interval {}ms)",
            self.config.device_id,
            self.transmit.interval()
        );
        Ok(())
    }

    /// Stop everything and raise the exit flag.  Safe to call more than
    /// once and from any thread; only the first call does work.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("Shutting down RTDMS agent");

        lock(&self.publisher).stop();
        if let Some(refresher) = lock(&self.refresher).take() {
            refresher.stop();
        }
        self.actuator.release_all();
        self.display.power_off();

        self.uplink.stop();
        info!("Closing telemetry connection");
        self.transport.disconnect();
        if self.transport.is_connected() {
            warn!("Transport still reports connected after disconnect");
        } else {
            self.events.emit(&AppEvent::TransportDisconnected);
        }

        self.events.emit(&AppEvent::ShutdownComplete);
        *lock(&self.exit_requested) = true;
        self.exit_cv.notify_all();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Block until [`shutdown`](Self::shutdown) has completed.
    pub fn wait_for_exit(&self) {
        let mut done = lock(&self.exit_requested);
        while !*done {
            done = self
                .exit_cv
                .wait(done)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn status(&self) -> AgentStatus {
        AgentStatus {
            actuator_on: self.actuator.is_on(),
            reading: self.sensor.read(),
            transmitting: self.is_transmitting(),
            interval_ms: self.transmit.interval(),
        }
    }

    pub fn is_transmitting(&self) -> bool {
        lock(&self.publisher).is_transmitting()
    }

    /// Start the publisher, or stop it (blocking) if it is running.
    /// Returns whether it is running afterwards.
    pub fn toggle_transmit(&self) -> io::Result<bool> {
        let mut publisher = lock(&self.publisher);
        if publisher.is_transmitting() {
            publisher.stop();
            Ok(false)
        } else {
            publisher.start()?;
            Ok(true)
        }
    }

    pub fn start_transmit(&self) -> io::Result<bool> {
        lock(&self.publisher).start()
    }

    pub fn stop_transmit(&self) -> bool {
        lock(&self.publisher).stop()
    }

    pub fn actuator(&self) -> &ActuatorController {
        &self.actuator
    }

    pub fn transmit(&self) -> &TransmitCycle {
        &self.transmit
    }

    pub fn events(&self) -> &dyn EventSink {
        self.events.as_ref()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Sequence numbers handed out so far.
    pub fn samples_issued(&self) -> u64 {
        self.sequence.issued()
    }

    pub fn remote_handler(&self) -> RemoteCommandHandler {
        RemoteCommandHandler::new(self.actuator.clone())
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
