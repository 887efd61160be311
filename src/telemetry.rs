//! Telemetry samples and their sequence numbering.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::sensors::Reading;

/// One published data point.
///
/// Serialized as `{"messageId":0,"deviceId":"…","temperature":72.1,"pressure":101.3}`;
/// `messageId` is the key the cloud consumer already reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySample {
    #[serde(rename = "messageId")]
    pub sequence: u64,
    #[serde(rename = "deviceId")]
    pub device_id: String,
    pub temperature: f64,
    pub pressure: f64,
}

impl TelemetrySample {
    pub fn new(device_id: &str, sequence: u64, reading: Reading) -> Self {
        Self {
            sequence,
            device_id: device_id.to_string(),
            temperature: reading.temperature_f,
            pressure: reading.pressure_kpa,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Process-wide publish-attempt counter.  Starts at 0 and is never reset,
/// so numbering continues across publisher stop/start.
#[derive(Debug, Default)]
pub struct SequenceCounter(AtomicU64);

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the next sequence number.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }

    /// Number of sequence numbers handed out so far.
    pub fn issued(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}
