//! Agent lifecycle: startup wiring, shutdown sequence, exit signalling,
//! and cross-task display exclusion.

use std::sync::atomic::Ordering;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use rtdms::app::commands::CONTROL_RELAY_METHOD;
use rtdms::app::events::AppEvent;
use rtdms::error::IntervalError;

use crate::mock_hw::{
    ActuatorCall, DWELL, DisplayOp, INTERVAL, READING, RecordingTransport, Rig, test_config,
    wait_for,
};

#[test]
fn start_connects_registers_and_lights_display() {
    let rig = Rig::started();

    assert!(rig.transport.connected.load(Ordering::SeqCst));
    assert!(rig.transport.has_handler(CONTROL_RELAY_METHOD));
    assert_eq!(rig.events.count(&AppEvent::TransportConnected), 1);
    assert_eq!(rig.display.ops().first(), Some(&DisplayOp::Power(true)));

    // The refresher renders immediately after start.
    wait_for("first refresh frame", || {
        rig.display
            .frames()
            .iter()
            .any(|f| f.0.contains("\nT:72.5F\nP:101.2kPa") || f.0.contains("\nT:72.5F\nP:101.3kPa"))
    });
}

#[test]
fn refused_connection_is_logged_not_fatal() {
    let transport = RecordingTransport::default();
    transport.refuse_connect.store(true, Ordering::SeqCst);
    let rig = Rig::with_transport(test_config(), transport);

    rig.agent.start().unwrap();
    assert_eq!(rig.events.count(&AppEvent::TransportConnected), 0);
    assert!(rig.transport.has_handler(CONTROL_RELAY_METHOD));
}

#[test]
fn shutdown_releases_outputs_and_darkens_display() {
    let rig = Rig::started();
    rig.agent.actuator().set_state(true, "HVAC On");
    assert!(rig.outputs.relay());

    rig.agent.shutdown();

    assert!(!rig.outputs.relay());
    assert!(!rig.outputs.indicator());
    assert_eq!(rig.outputs.calls().last(), Some(&ActuatorCall::AllOff));

    let ops = rig.display.ops();
    assert_eq!(&ops[ops.len() - 2..], &[DisplayOp::Clear, DisplayOp::Power(false)]);
    assert!(!rig.transport.connected.load(Ordering::SeqCst));
    assert_eq!(rig.events.events().last(), Some(&AppEvent::ShutdownComplete));
}

#[test]
fn shutdown_is_idempotent() {
    let rig = Rig::started();
    rig.agent.shutdown();
    rig.agent.shutdown();
    assert!(rig.agent.is_shut_down());
    assert_eq!(rig.events.count(&AppEvent::ShutdownComplete), 1);
}

#[test]
fn shutdown_stops_publisher_and_flushes_uplink() {
    let rig = Rig::started();
    assert!(rig.agent.start_transmit().unwrap());
    wait_for("three samples", || rig.transport.message_ids().len() >= 3);

    rig.agent.shutdown();

    assert!(!rig.agent.is_transmitting());
    // Everything numbered was either published or reported dropped.
    let issued = rig.agent.samples_issued();
    let dropped = rig
        .events
        .events()
        .iter()
        .filter(|e| matches!(e, AppEvent::SampleDropped { .. }))
        .count() as u64;
    assert_eq!(rig.transport.message_ids().len() as u64 + dropped, issued);
}

#[test]
fn wait_for_exit_returns_after_shutdown_from_another_thread() {
    let rig = Rig::started();
    let agent = rig.agent.clone();
    let t0 = Instant::now();
    let killer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        agent.shutdown();
    });
    rig.agent.wait_for_exit();
    assert!(t0.elapsed() >= Duration::from_millis(50));
    killer.join().unwrap();
}

#[test]
fn status_reports_actuator_reading_and_interval() {
    let rig = Rig::started();
    let s = rig.agent.status();
    assert!(!s.actuator_on);
    assert_eq!(s.reading, READING);
    assert!(!s.transmitting);
    assert_eq!(s.interval_ms.get(), test_config().transmit_interval_ms);
}

#[test]
fn concurrent_remote_and_local_actuation_never_interleave_on_display() {
    let rig = Rig::started();
    let transport = Arc::clone(&rig.transport);

    let remote = thread::spawn(move || transport.invoke(CONTROL_RELAY_METHOD, br#"{"onoff": true}"#));
    thread::sleep(Duration::from_millis(10));
    rig.agent.actuator().toggle();
    assert_eq!(remote.join().unwrap().status, 200);

    for text in ["HVAC Remote On", "HVAC On", "HVAC Off"] {
        for d in rig.display.visible_for(text).into_iter().flatten() {
            assert!(d >= DWELL, "{text:?} shown for only {d:?}");
        }
    }
    // Both status messages made it to the display.
    assert!(rig.display.rendered("HVAC Remote On"));
    assert!(rig.display.rendered("HVAC On") || rig.display.rendered("HVAC Off"));
}

#[test]
fn shutdown_completes_while_interval_prompt_waits_for_input() {
    let rig = Rig::started();
    rig.agent.start_transmit().unwrap();
    wait_for("a sample", || !rig.transport.message_ids().is_empty());

    // Console sits at the `i` prompt holding the transmit cycle.
    let (answer_tx, answer_rx) = mpsc::channel::<String>();
    let (held_tx, held_rx) = mpsc::channel();
    let agent = rig.agent.clone();
    let console = thread::spawn(move || {
        agent.transmit().reconfigure(|| {
            held_tx.send(()).unwrap();
            answer_rx
                .recv()
                .map_err(|e| IntervalError::Input(e.to_string()))
        })
    });
    held_rx.recv().unwrap();
    // Let the publisher block waiting for the cycle.
    thread::sleep(INTERVAL * 3);

    let (done_tx, done_rx) = mpsc::channel();
    let agent = rig.agent.clone();
    thread::spawn(move || {
        agent.shutdown();
        done_tx.send(()).unwrap();
    });
    done_rx
        .recv_timeout(Duration::from_secs(2))
        .expect("shutdown stalled behind the interval prompt");

    assert!(rig.agent.is_shut_down());
    assert!(!rig.agent.is_transmitting());
    assert!(!rig.outputs.relay());
    assert_eq!(rig.events.count(&AppEvent::ShutdownComplete), 1);

    answer_tx.send("100".into()).unwrap();
    assert!(console.join().unwrap().is_ok());
}

#[test]
fn second_start_is_ignored() {
    let config = rtdms::config::AgentConfig {
        display_refresh_ms: 10,
        ..test_config()
    };
    let rig = Rig::new(config);
    rig.agent.start().unwrap();
    rig.agent.start().unwrap();

    assert_eq!(rig.transport.registrations.load(Ordering::SeqCst), 1);
    assert_eq!(rig.events.count(&AppEvent::TransportConnected), 1);
    let power_ons = rig
        .display
        .ops()
        .iter()
        .filter(|op| **op == DisplayOp::Power(true))
        .count();
    assert_eq!(power_ons, 1);

    // A second refresher would be left running and keep rendering.
    rig.agent.shutdown();
    let ops = rig.display.ops().len();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(rig.display.ops().len(), ops);
}

#[test]
fn start_after_shutdown_does_nothing() {
    let rig = Rig::new(test_config());
    rig.agent.shutdown();
    rig.agent.start().unwrap();

    assert_eq!(rig.transport.registrations.load(Ordering::SeqCst), 0);
    assert!(!rig.display.ops().contains(&DisplayOp::Power(true)));
}
