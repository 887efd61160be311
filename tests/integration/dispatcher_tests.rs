//! Operator console driven with in-memory input and output.

use std::time::Duration;

use rtdms::app::dispatcher::{CommandDispatcher, Flow};
use rtdms::app::commands::LocalCommand;
use rtdms::app::events::AppEvent;

use crate::mock_hw::{Rig, wait_for};

/// Feed `input` to a fresh console and return everything it printed.
fn session(rig: &Rig, input: &str) -> String {
    let mut out = Vec::new();
    CommandDispatcher::new(rig.agent.clone(), input.as_bytes(), &mut out)
        .run()
        .unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn menu_lists_every_command() {
    let rig = Rig::started();
    let out = session(&rig, "x\n");

    assert!(out.contains("RTDMS v1.0 Menu"));
    assert!(out.contains("\"S\": - display current temperature/pressure"));
    assert!(out.contains("\"H\": - turn HVAC On"));
    assert!(out.contains("\"T\": - Transmit Telemetry To IoT Hub service"));
    assert!(out.contains("(currently 40ms)"));
    assert!(out.contains("\"X\": - Close the RTDMS agent"));
    assert!(out.contains("Command:-> "));
}

#[test]
fn h_toggles_actuator_and_menu_follows() {
    let rig = Rig::started();
    let out = session(&rig, "h\nx\n");

    assert!(rig.display.rendered("HVAC On"));
    assert!(out.contains("\"H\": - turn HVAC Off"));
    // Shutdown releases the relay afterwards.
    assert!(!rig.outputs.relay());
}

#[test]
fn unparseable_interval_keeps_current() {
    let rig = Rig::started();
    let out = session(&rig, "i\nabc\nx\n");

    assert!(out.contains("New polling rate (ms)? "));
    assert!(out.contains("Unable to parse 'abc'"));
    assert_eq!(rig.agent.transmit().interval().get(), 40);
}

#[test]
fn valid_interval_is_applied_and_announced() {
    let rig = Rig::started();
    let out = session(&rig, "I\n250\nx\n");

    assert!(out.contains("Polling rate set to 250ms"));
    assert!(out.contains("(currently 250ms)"));
    assert_eq!(rig.agent.transmit().interval().get(), 250);
    assert_eq!(rig.events.count(&AppEvent::IntervalChanged(250)), 1);
}

#[test]
fn non_positive_interval_is_rejected() {
    let rig = Rig::started();
    let out = session(&rig, "i\n0\nx\n");
    assert!(out.contains("Polling rate must be at least 1ms"));
    assert_eq!(rig.agent.transmit().interval().get(), 40);
}

#[test]
fn status_prints_device_block() {
    let rig = Rig::started();
    let out = session(&rig, "s\nx\n");

    assert!(out.contains("DEVICE STATUS\n-------------\n"));
    assert!(out.contains("HVAC: OFF"));
    assert!(out.contains("Temperature: 72.5dF"));
    assert!(out.contains("Pressure: 101.25kPa"));
}

#[test]
fn unknown_command_is_reported() {
    let rig = Rig::started();
    let out = session(&rig, "q\n\nx\n");
    assert_eq!(out.matches("Unknown command").count(), 2);
    assert!(!rig.outputs.relay());
}

#[test]
fn t_starts_then_stops_transmitting() {
    let rig = Rig::started();
    let mut out = Vec::new();
    let mut console = CommandDispatcher::new(rig.agent.clone(), &b""[..], &mut out);

    assert_eq!(console.execute(&LocalCommand::ToggleTransmit).unwrap(), Flow::Continue);
    assert!(rig.agent.is_transmitting());
    console.print_menu().unwrap();
    wait_for("a sample", || !rig.transport.message_ids().is_empty());

    console.execute(&LocalCommand::ToggleTransmit).unwrap();
    assert!(!rig.agent.is_transmitting());
    drop(console);

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("\"T\": - Stop Transmitting Telemetry To IoT Hub service"));
    assert_eq!(rig.events.count(&AppEvent::PublisherStarted), 1);
    assert_eq!(rig.events.count(&AppEvent::PublisherStopped), 1);
}

#[test]
fn end_of_input_shuts_down() {
    let rig = Rig::started();
    let out = session(&rig, "");

    assert!(out.contains("Exiting RTDMS..."));
    assert!(rig.agent.is_shut_down());
    assert_eq!(rig.events.count(&AppEvent::ShutdownComplete), 1);
}

#[test]
fn x_stops_reading_further_commands() {
    let rig = Rig::started();
    let out = session(&rig, "X\nh\n");

    assert!(rig.agent.is_shut_down());
    assert!(!rig.display.rendered("HVAC On"));
    assert_eq!(out.matches("Command:-> ").count(), 1);
}

#[test]
fn run_returns_at_once_after_external_shutdown() {
    let rig = Rig::started();
    rig.agent.shutdown();
    let t0 = std::time::Instant::now();
    let out = session(&rig, "h\n");

    assert!(out.is_empty());
    assert!(t0.elapsed() < Duration::from_millis(100));
    assert!(!rig.display.rendered("HVAC On"));
}
