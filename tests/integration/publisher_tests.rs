//! Telemetry publisher: ordering, pacing, start/stop semantics, and
//! interval changes between cycles.

use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use rtdms::app::events::AppEvent;

use crate::mock_hw::{INTERVAL, RecordingTransport, Rig, test_config, wait_for};

#[test]
fn samples_are_numbered_and_paced() {
    let rig = Rig::started();
    assert!(rig.agent.start_transmit().unwrap());
    wait_for("three samples", || rig.transport.message_ids().len() >= 3);
    rig.agent.stop_transmit();

    let ids = rig.transport.message_ids();
    assert_eq!(&ids[..3], &[0, 1, 2]);
    assert!(ids.windows(2).all(|w| w[1] == w[0] + 1));

    let first = &rig.transport.published()[0];
    assert_eq!(first["deviceId"], "rtdms-test");
    assert_eq!(first["temperature"], 72.5);
    assert_eq!(first["pressure"], 101.25);

    let raises = rig.outputs.indicator_raises();
    for pair in raises.windows(2) {
        let gap = pair[1].duration_since(pair[0]);
        assert!(gap >= INTERVAL, "cycles {gap:?} apart");
    }
}

#[test]
fn start_twice_is_a_no_op() {
    let rig = Rig::started();
    assert!(rig.agent.start_transmit().unwrap());
    assert!(!rig.agent.start_transmit().unwrap());
    assert_eq!(rig.events.count(&AppEvent::PublisherStarted), 1);
}

#[test]
fn stop_waits_for_loop_exit_and_restart_continues_sequence() {
    let rig = Rig::started();
    rig.agent.start_transmit().unwrap();
    wait_for("two samples", || rig.transport.message_ids().len() >= 2);

    assert!(rig.agent.stop_transmit());
    assert!(!rig.agent.is_transmitting());
    assert!(!rig.outputs.indicator());
    assert_eq!(rig.events.count(&AppEvent::PublisherStopped), 1);

    let raises = rig.outputs.indicator_raises().len();
    thread::sleep(INTERVAL * 3);
    assert_eq!(rig.outputs.indicator_raises().len(), raises);
    assert!(!rig.agent.stop_transmit());

    let issued = rig.agent.samples_issued();
    rig.agent.start_transmit().unwrap();
    wait_for("sample after restart", || {
        rig.transport.message_ids().contains(&issued)
    });
}

#[test]
fn interval_change_applies_from_next_cycle() {
    let config = rtdms::config::AgentConfig {
        transmit_interval_ms: 200,
        ..test_config()
    };
    let rig = Rig::new(config);
    rig.agent.start().unwrap();
    rig.agent.start_transmit().unwrap();

    wait_for("first cycle", || !rig.outputs.indicator_raises().is_empty());
    // Blocks until the 200ms rest in progress is over.
    rig.agent.transmit().apply("20").unwrap();
    wait_for("four cycles", || rig.outputs.indicator_raises().len() >= 4);
    rig.agent.stop_transmit();

    let raises = rig.outputs.indicator_raises();
    let first_gap = raises[1].duration_since(raises[0]);
    assert!(first_gap >= Duration::from_millis(200), "first gap {first_gap:?}");
    for pair in raises[1..4].windows(2) {
        let gap = pair[1].duration_since(pair[0]);
        assert!(gap < Duration::from_millis(200), "later gap {gap:?}");
    }
}

#[test]
fn publish_failure_is_reported_and_loop_keeps_going() {
    let transport = RecordingTransport::default();
    transport.fail_publish.store(true, Ordering::SeqCst);
    let rig = Rig::with_transport(test_config(), transport);
    rig.agent.start().unwrap();
    rig.agent.start_transmit().unwrap();

    wait_for("two failures", || {
        rig.events
            .events()
            .iter()
            .filter(|e| matches!(e, AppEvent::PublishFailed { .. }))
            .count()
            >= 2
    });
    assert!(rig.agent.is_transmitting());
    assert!(rig.transport.published().is_empty());
}
