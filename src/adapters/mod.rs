//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter     | Implements          | Connects to                     |
//! |-------------|---------------------|---------------------------------|
//! | `hardware`  | ActuatorPort        | relay + LED `OutputPin`s        |
//! |             | SensorPort          | BMP280 over I²C                 |
//! |             | DisplayPort         | HD44780 LCD over I²C            |
//! | `log_sink`  | EventSink           | `log` facade                    |
//! | `mqtt`      | TelemetryTransport  | IoT Hub over ESP-IDF MQTT       |
//! | `sim`       | all hardware ports  | host simulation                 |
//! |             | TelemetryTransport  | in-process loopback             |

pub mod hardware;
pub mod log_sink;
#[cfg(target_os = "espidf")]
pub mod mqtt;
#[cfg(not(target_os = "espidf"))]
pub mod sim;
