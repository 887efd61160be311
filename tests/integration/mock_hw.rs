//! Mock adapters for integration tests.
//!
//! Every mock records what it was asked to do, with timestamps where
//! ordering or dwell matters.  Each one is `Clone` and shares its record,
//! so a test keeps a handle after boxing the original into the agent.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use rtdms::app::commands::MethodResponse;
use rtdms::app::events::AppEvent;
use rtdms::app::ports::{
    ActuatorPort, CommandHandler, DisplayPort, EventSink, SensorPort, TelemetryTransport,
};
use rtdms::app::{Agent, AgentHardware};
use rtdms::config::AgentConfig;
use rtdms::error::TransportError;
use rtdms::sensors::Reading;

pub const DWELL: Duration = Duration::from_millis(120);
pub const INTERVAL: Duration = Duration::from_millis(40);

pub const READING: Reading = Reading {
    temperature_f: 72.5,
    pressure_kpa: 101.25,
};

/// Short timings so tests finish quickly; refresh is long so the
/// refresher renders once at start and then stays out of the way.
pub fn test_config() -> AgentConfig {
    AgentConfig {
        device_id: "rtdms-test".into(),
        status_dwell_ms: DWELL.as_millis() as u32,
        transmit_interval_ms: INTERVAL.as_millis() as u32,
        display_refresh_ms: 60_000,
        ..AgentConfig::default()
    }
}

/// Poll `cond` until it holds or two seconds pass.
pub fn wait_for(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(5));
    }
}

// ── Actuator outputs ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActuatorCall {
    Relay(bool),
    Indicator(bool),
    AllOff,
}

#[derive(Default)]
struct OutputState {
    relay: bool,
    indicator: bool,
    calls: Vec<(ActuatorCall, Instant)>,
}

#[derive(Clone, Default)]
pub struct MockOutputs(Arc<Mutex<OutputState>>);

impl MockOutputs {
    pub fn relay(&self) -> bool {
        self.0.lock().unwrap().relay
    }

    pub fn indicator(&self) -> bool {
        self.0.lock().unwrap().indicator
    }

    pub fn calls(&self) -> Vec<ActuatorCall> {
        self.0.lock().unwrap().calls.iter().map(|c| c.0).collect()
    }

    /// When the indicator was raised (one per publish cycle).
    pub fn indicator_raises(&self) -> Vec<Instant> {
        self.0
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.0 == ActuatorCall::Indicator(true))
            .map(|c| c.1)
            .collect()
    }

    fn record(&self, call: ActuatorCall) {
        let mut s = self.0.lock().unwrap();
        match call {
            ActuatorCall::Relay(on) => s.relay = on,
            ActuatorCall::Indicator(on) => s.indicator = on,
            ActuatorCall::AllOff => {
                s.relay = false;
                s.indicator = false;
            }
        }
        s.calls.push((call, Instant::now()));
    }
}

impl ActuatorPort for MockOutputs {
    fn set_relay(&mut self, on: bool) {
        self.record(ActuatorCall::Relay(on));
    }

    fn set_indicator(&mut self, on: bool) {
        self.record(ActuatorCall::Indicator(on));
    }

    fn all_off(&mut self) {
        self.record(ActuatorCall::AllOff);
    }
}

// ── Display ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayOp {
    Render(String),
    Clear,
    Power(bool),
}

#[derive(Clone, Default)]
pub struct MockDisplay(Arc<Mutex<Vec<(DisplayOp, Instant)>>>);

impl MockDisplay {
    pub fn ops(&self) -> Vec<DisplayOp> {
        self.0.lock().unwrap().iter().map(|o| o.0.clone()).collect()
    }

    /// Rendered texts with their timestamps, in order.
    pub fn frames(&self) -> Vec<(String, Instant)> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(op, at)| match op {
                DisplayOp::Render(t) => Some((t.clone(), *at)),
                _ => None,
            })
            .collect()
    }

    pub fn rendered(&self, text: &str) -> bool {
        self.frames().iter().any(|f| f.0 == text)
    }

    /// How long each frame matching `text` stayed up before the next
    /// display operation (`None` if it is still the latest).
    pub fn visible_for(&self, text: &str) -> Vec<Option<Duration>> {
        let ops = self.0.lock().unwrap();
        ops.iter()
            .enumerate()
            .filter(|(_, (op, _))| *op == DisplayOp::Render(text.to_string()))
            .map(|(i, (_, at))| ops.get(i + 1).map(|next| next.1.duration_since(*at)))
            .collect()
    }

    fn record(&self, op: DisplayOp) {
        self.0.lock().unwrap().push((op, Instant::now()));
    }
}

impl DisplayPort for MockDisplay {
    fn render(&mut self, text: &str) {
        self.record(DisplayOp::Render(text.to_string()));
    }

    fn clear(&mut self) {
        self.record(DisplayOp::Clear);
    }

    fn set_power(&mut self, on: bool) {
        self.record(DisplayOp::Power(on));
    }
}

// ── Sensor ────────────────────────────────────────────────────

/// Returns queued readings first, then [`READING`] forever.
#[derive(Clone, Default)]
pub struct ScriptedSensor {
    script: Arc<Mutex<VecDeque<Reading>>>,
    reads: Arc<Mutex<u32>>,
}

impl ScriptedSensor {
    pub fn push(&self, r: Reading) {
        self.script.lock().unwrap().push_back(r);
    }

    pub fn reads(&self) -> u32 {
        *self.reads.lock().unwrap()
    }
}

impl SensorPort for ScriptedSensor {
    fn read_sample(&mut self) -> Reading {
        *self.reads.lock().unwrap() += 1;
        self.script.lock().unwrap().pop_front().unwrap_or(READING)
    }
}

// ── Transport ─────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingTransport {
    pub connected: AtomicBool,
    pub refuse_connect: AtomicBool,
    pub fail_publish: AtomicBool,
    pub registrations: AtomicUsize,
    published: Mutex<Vec<Vec<u8>>>,
    handlers: Mutex<HashMap<String, CommandHandler>>,
}

impl RecordingTransport {
    pub fn published(&self) -> Vec<serde_json::Value> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|p| serde_json::from_slice(p).unwrap())
            .collect()
    }

    pub fn message_ids(&self) -> Vec<u64> {
        self.published()
            .iter()
            .map(|v| v["messageId"].as_u64().unwrap())
            .collect()
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.lock().unwrap().contains_key(name)
    }

    /// Invoke a registered method the way the cloud would.
    pub fn invoke(&self, name: &str, payload: &[u8]) -> MethodResponse {
        let handler = self.handlers.lock().unwrap().get(name).cloned();
        handler.expect("handler registered")(payload)
    }
}

impl TelemetryTransport for RecordingTransport {
    fn connect(&self) -> Result<(), TransportError> {
        if self.refuse_connect.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectFailed("refused".into()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn publish(&self, payload: &[u8]) -> Result<(), TransportError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(TransportError::PublishFailed("broker said no".into()));
        }
        self.published.lock().unwrap().push(payload.to_vec());
        Ok(())
    }

    fn register_command_handler(
        &self,
        name: &str,
        handler: CommandHandler,
    ) -> Result<(), TransportError> {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        self.handlers.lock().unwrap().insert(name.into(), handler);
        Ok(())
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink(Mutex<Vec<AppEvent>>);

impl RecordingSink {
    pub fn events(&self) -> Vec<AppEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, event: &AppEvent) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == event).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &AppEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

// ── Test rig ──────────────────────────────────────────────────

/// An agent wired to mocks, with handles into each of them.
/// Dropping the rig shuts the agent down.
pub struct Rig {
    pub agent: Arc<Agent>,
    pub outputs: MockOutputs,
    pub display: MockDisplay,
    pub sensor: ScriptedSensor,
    pub transport: Arc<RecordingTransport>,
    pub events: Arc<RecordingSink>,
}

impl Rig {
    pub fn new(config: AgentConfig) -> Self {
        Self::with_transport(config, RecordingTransport::default())
    }

    pub fn with_transport(config: AgentConfig, transport: RecordingTransport) -> Self {
        let outputs = MockOutputs::default();
        let display = MockDisplay::default();
        let sensor = ScriptedSensor::default();
        let transport = Arc::new(transport);
        let events = Arc::new(RecordingSink::default());

        let agent = Agent::new(
            config,
            AgentHardware {
                sensor: Box::new(sensor.clone()),
                outputs: Box::new(outputs.clone()),
                display: Box::new(display.clone()),
                transport: transport.clone(),
                events: events.clone(),
            },
        );
        Self {
            agent: Arc::new(agent),
            outputs,
            display,
            sensor,
            transport,
            events,
        }
    }

    /// Build with [`test_config`], start, and wait for the refresher's
    /// first frame so later display ops come only from the test.
    pub fn started() -> Self {
        let rig = Self::new(test_config());
        rig.agent.start().unwrap();
        wait_for("first refresh frame", || {
            rig.display.frames().iter().any(|f| f.0.contains("\nT:"))
        });
        rig
    }
}

impl Drop for Rig {
    fn drop(&mut self) {
        self.agent.shutdown();
    }
}
