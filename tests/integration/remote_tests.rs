//! `ControlRelay` remote method, driven through the transport's
//! registered handler.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use rtdms::app::commands::CONTROL_RELAY_METHOD;
use rtdms::app::events::AppEvent;

use crate::mock_hw::{ActuatorCall, DWELL, Rig};

#[test]
fn switch_on_drives_both_outputs_and_holds_status() {
    let rig = Rig::started();
    let t0 = Instant::now();
    let resp = rig.transport.invoke(CONTROL_RELAY_METHOD, br#"{"onoff": true}"#);

    assert_eq!(resp.status, 200);
    assert!(t0.elapsed() >= DWELL);
    assert!(rig.outputs.relay());
    assert!(rig.outputs.indicator());
    assert!(rig.display.rendered("HVAC Remote On"));
    assert_eq!(rig.events.count(&AppEvent::ActuatorChanged { on: true }), 1);
}

#[test]
fn switch_off_answers_ok() {
    let rig = Rig::started();
    rig.agent.actuator().set_state(true, "HVAC On");
    let resp = rig.transport.invoke(CONTROL_RELAY_METHOD, br#"{"onoff":false}"#);

    assert_eq!(resp.status, 200);
    assert!(!rig.outputs.relay());
    assert!(!rig.agent.actuator().is_on());
    assert!(rig.display.rendered("HVAC Remote Off"));
}

#[test]
fn bad_payloads_are_rejected_without_side_effects() {
    let rig = Rig::started();
    let calls_before = rig.outputs.calls();
    let frames_before = rig.display.frames().len();

    let payloads: [&[u8]; 5] = [
        b"not json",
        br#"{}"#,
        br#"{"onoff": "yes"}"#,
        br#"{"onoff": 1}"#,
        b"",
    ];
    for payload in payloads {
        let t0 = Instant::now();
        let resp = rig.transport.invoke(CONTROL_RELAY_METHOD, payload);
        assert_eq!(resp.status, 400, "payload {:?}", String::from_utf8_lossy(payload));
        assert!(t0.elapsed() < DWELL);
    }

    assert_eq!(rig.outputs.calls(), calls_before);
    assert_eq!(rig.display.frames().len(), frames_before);
    assert!(!rig.agent.actuator().is_on());
}

#[test]
fn concurrent_invocations_are_serialized() {
    let rig = Rig::started();
    let t0 = Instant::now();
    let handles: Vec<_> = [br#"{"onoff":true}"#.as_slice(), br#"{"onoff":false}"#.as_slice()]
        .into_iter()
        .map(|payload| {
            let transport = Arc::clone(&rig.transport);
            thread::spawn(move || transport.invoke(CONTROL_RELAY_METHOD, payload))
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap().status, 200);
    }

    assert!(t0.elapsed() >= DWELL * 2);
    for text in ["HVAC Remote On", "HVAC Remote Off"] {
        assert!(rig.display.rendered(text));
        for d in rig.display.visible_for(text).into_iter().flatten() {
            assert!(d >= DWELL, "{text:?} shown for only {d:?}");
        }
    }

    // The final pin state matches the final logical state.
    let relay_writes: Vec<_> = rig
        .outputs
        .calls()
        .into_iter()
        .filter(|c| matches!(c, ActuatorCall::Relay(_)))
        .collect();
    assert_eq!(relay_writes.len(), 2);
    assert_eq!(
        relay_writes.last(),
        Some(&ActuatorCall::Relay(rig.agent.actuator().is_on()))
    );
}
