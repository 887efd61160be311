//! Agent configuration parameters
//!
//! Loaded once at startup from the `Settings` section of
//! `appsettings.json` and read-only thereafter.

use std::num::NonZeroU32;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pins;
use crate::uplink::iothub::{self, ConnectionString};

/// Core agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    // --- Transport identity ---
    /// IoT Hub device connection string (`HostName=…;DeviceId=…;SharedAccessKey=…`).
    #[serde(rename = "ConnectionString")]
    pub connection_string: String,
    /// Device id stamped on every telemetry sample.
    #[serde(rename = "DeviceId")]
    pub device_id: String,
    /// Pre-issued SAS token used as the MQTT password.
    #[serde(rename = "SasToken", default)]
    pub sas_token: Option<String>,

    // --- Outputs ---
    /// GPIO driving the HVAC relay.
    #[serde(rename = "HVACPin")]
    pub actuator_pin: i32,
    /// GPIO driving the transmit / status indicator LED.
    #[serde(rename = "LEDPin")]
    pub indicator_pin: i32,
    /// Human name of the controlled unit, used in status messages.
    #[serde(rename = "ActuatorName", default = "default_actuator_name")]
    pub actuator_name: String,

    // --- Display ---
    /// Number of character rows on the LCD.
    #[serde(rename = "LCDMaxLines")]
    pub display_line_count: u8,
    /// Number of characters per LCD row.
    #[serde(rename = "LCDLineLen")]
    pub display_line_length: u8,
    /// I²C address of the LCD backpack.
    #[serde(rename = "DisplayAddress", default = "default_display_address")]
    pub display_address: u8,
    /// I²C address of the BMP280.
    #[serde(rename = "SensorAddress", default = "default_sensor_address")]
    pub sensor_address: u8,

    // --- Timing ---
    /// Initial telemetry transmit interval (milliseconds).
    #[serde(rename = "TransmitInterval")]
    pub transmit_interval_ms: u32,
    /// How long a status message stays on the display (milliseconds).
    #[serde(rename = "StatusDwellMs", default = "default_status_dwell_ms")]
    pub status_dwell_ms: u32,
    /// Display refresh period (milliseconds).
    #[serde(rename = "DisplayRefreshMs", default = "default_display_refresh_ms")]
    pub display_refresh_ms: u32,

    // --- Network (ESP-IDF builds only) ---
    #[serde(rename = "WifiSsid", default)]
    pub wifi_ssid: Option<String>,
    #[serde(rename = "WifiPassword", default)]
    pub wifi_password: Option<String>,
}

/// On-disk shape of `appsettings.json`.
#[derive(Debug, Deserialize)]
struct AppSettings {
    #[serde(rename = "Settings")]
    settings: AgentConfig,
}

fn default_actuator_name() -> String {
    "HVAC".into()
}

fn default_display_address() -> u8 {
    0x27
}

fn default_sensor_address() -> u8 {
    0x77
}

fn default_status_dwell_ms() -> u32 {
    5_000
}

fn default_display_refresh_ms() -> u32 {
    2_000
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            connection_string: "HostName=localhost;DeviceId=rtdms-sim;SharedAccessKey=c2lt".into(),
            device_id: "rtdms-sim".into(),
            sas_token: None,

            actuator_pin: 17,
            indicator_pin: 27,
            actuator_name: default_actuator_name(),

            display_line_count: 4,
            display_line_length: 20,
            display_address: default_display_address(),
            sensor_address: default_sensor_address(),

            transmit_interval_ms: 1_000,
            status_dwell_ms: default_status_dwell_ms(),
            display_refresh_ms: default_display_refresh_ms(),

            wifi_ssid: None,
            wifi_password: None,
        }
    }
}

impl AgentConfig {
    /// Read, parse and validate a settings file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    /// Parse and validate the contents of `appsettings.json`.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let settings: AppSettings =
            serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.settings.validate()?;
        Ok(settings.settings)
    }

    /// Reject out-of-range values instead of clamping them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_id.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("DeviceId must not be empty"));
        }
        // Every sample has to fit an uplink payload slot.
        if !iothub::is_valid_device_id(&self.device_id) {
            return Err(ConfigError::ValidationFailed(
                "DeviceId must be at most 128 IoT Hub device-id characters",
            ));
        }
        if ConnectionString::parse(&self.connection_string).is_none() {
            return Err(ConfigError::ValidationFailed(
                "ConnectionString must contain HostName and DeviceId",
            ));
        }
        if self.transmit_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("TransmitInterval must be positive"));
        }
        if !(1..=4).contains(&self.display_line_count) {
            return Err(ConfigError::ValidationFailed("LCDMaxLines must be 1..=4"));
        }
        if !(1..=40).contains(&self.display_line_length) {
            return Err(ConfigError::ValidationFailed("LCDLineLen must be 1..=40"));
        }
        if self.actuator_pin == self.indicator_pin {
            return Err(ConfigError::ValidationFailed(
                "HVACPin and LEDPin must be different pins",
            ));
        }
        if !pins::is_assignable_output(self.actuator_pin)
            || !pins::is_assignable_output(self.indicator_pin)
        {
            return Err(ConfigError::ValidationFailed(
                "HVACPin and LEDPin must be free output GPIOs",
            ));
        }
        if self.status_dwell_ms == 0 || self.display_refresh_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "StatusDwellMs and DisplayRefreshMs must be positive",
            ));
        }
        Ok(())
    }

    /// Initial transmit interval.  Only valid after [`validate`](Self::validate).
    pub fn transmit_interval(&self) -> NonZeroU32 {
        NonZeroU32::new(self.transmit_interval_ms).unwrap_or(NonZeroU32::MIN)
    }

    pub fn status_dwell(&self) -> Duration {
        Duration::from_millis(u64::from(self.status_dwell_ms))
    }

    pub fn display_refresh(&self) -> Duration {
        Duration::from_millis(u64::from(self.display_refresh_ms))
    }
}
