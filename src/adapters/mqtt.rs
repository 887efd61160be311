//! IoT Hub telemetry transport over ESP-IDF MQTT (TLS, port 8883).
//!
//! Telemetry is enqueued on `devices/{id}/messages/events/`.  Direct
//! methods arrive on `$iothub/methods/POST/{name}/?$rid={rid}`; each
//! invocation runs its handler on a fresh thread (a relay command holds
//! the display for several seconds, which must not stall the MQTT event
//! task) and the response is published on the matching `res` topic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};
use log::{info, warn};

use crate::app::commands::MethodResponse;
use crate::app::ports::{CommandHandler, TelemetryTransport};
use crate::error::TransportError;
use crate::uplink::iothub::{self, ConnectionString};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const KEEP_ALIVE: Duration = Duration::from_secs(240);

type SharedClient = Arc<Mutex<Option<EspMqttClient<'static>>>>;
type HandlerMap = Arc<Mutex<HashMap<String, CommandHandler>>>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct IotHubMqttTransport {
    identity: ConnectionString,
    sas_token: Option<String>,
    telemetry_topic: String,
    client: SharedClient,
    handlers: HandlerMap,
    connected: Arc<AtomicBool>,
}

impl IotHubMqttTransport {
    pub fn new(identity: ConnectionString, sas_token: Option<String>) -> Self {
        let telemetry_topic = iothub::telemetry_topic(&identity.device_id);
        Self {
            identity,
            sas_token,
            telemetry_topic,
            client: Arc::new(Mutex::new(None)),
            handlers: Arc::new(Mutex::new(HashMap::new())),
            connected: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Run one direct-method invocation and publish its response.
fn dispatch_method(client: &SharedClient, handlers: &HandlerMap, topic: &str, payload: Vec<u8>) {
    let Some(req) = iothub::parse_method_topic(topic) else {
        warn!("MQTT | ignoring message on {}", topic);
        return;
    };
    let handler = lock(handlers).get(req.method).cloned();
    let method = req.method.to_string();
    let res_topic_rid = req.request_id.to_string();

    let client = client.clone();
    let spawned = std::thread::Builder::new()
        .name("remote-cmd".into())
        .stack_size(8 * 1024)
        .spawn(move || {
            let response = match handler {
                Some(h) => h(&payload),
                None => MethodResponse {
                    status: 404,
                    message: format!("unknown method '{method}'"),
                },
            };
            info!("MQTT | {} -> {}", method, response.status);
            let topic = iothub::method_response_topic(response.status, &res_topic_rid);
            if let Some(c) = lock(&client).as_mut() {
                if let Err(e) = c.enqueue(&topic, QoS::AtMostOnce, false, &response.body()) {
                    warn!("MQTT | method response failed: {}", e);
                }
            }
        });
    if let Err(e) = spawned {
        warn!("MQTT | could not spawn handler thread: {}", e);
    }
}

impl TelemetryTransport for IotHubMqttTransport {
    fn connect(&self) -> Result<(), TransportError> {
        if self.is_connected() {
            return Ok(());
        }

        let url = self.identity.broker_url();
        let username = self.identity.mqtt_username();
        let conf = MqttClientConfiguration {
            client_id: Some(&self.identity.device_id),
            username: Some(&username),
            password: self.sas_token.as_deref(),
            keep_alive_interval: Some(KEEP_ALIVE),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };

        let connected = self.connected.clone();
        let client_for_cb = self.client.clone();
        let handlers = self.handlers.clone();
        let client = EspMqttClient::new_cb(&url, &conf, move |event| match event.payload() {
            EventPayload::Connected(_) => {
                info!("MQTT | connected");
                connected.store(true, Ordering::SeqCst);
            }
            EventPayload::Disconnected => {
                warn!("MQTT | disconnected");
                connected.store(false, Ordering::SeqCst);
            }
            EventPayload::Received {
                topic: Some(topic),
                data,
                ..
            } => dispatch_method(&client_for_cb, &handlers, topic, data.to_vec()),
            EventPayload::Error(e) => warn!("MQTT | error: {:?}", e),
            _ => {}
        })
        .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        *lock(&self.client) = Some(client);

        let deadline = Instant::now() + CONNECT_TIMEOUT;
        while !self.is_connected() {
            if Instant::now() >= deadline {
                lock(&self.client).take();
                return Err(TransportError::ConnectFailed(format!(
                    "no CONNACK from {url} within {}s",
                    CONNECT_TIMEOUT.as_secs()
                )));
            }
            std::thread::sleep(Duration::from_millis(100));
        }

        if let Some(c) = lock(&self.client).as_mut() {
            c.subscribe(iothub::METHODS_SUBSCRIBE_TOPIC, QoS::AtMostOnce)
                .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        }
        Ok(())
    }

    fn publish(&self, payload: &[u8]) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let mut guard = lock(&self.client);
        let client = guard.as_mut().ok_or(TransportError::NotConnected)?;
        client
            .enqueue(&self.telemetry_topic, QoS::AtLeastOnce, false, payload)
            .map(|_| ())
            .map_err(|e| TransportError::PublishFailed(e.to_string()))
    }

    fn register_command_handler(
        &self,
        name: &str,
        handler: CommandHandler,
    ) -> Result<(), TransportError> {
        let mut handlers = lock(&self.handlers);
        if handlers.contains_key(name) {
            return Err(TransportError::RegistrationFailed(format!(
                "{name} already has a handler"
            )));
        }
        handlers.insert(name.to_string(), handler);
        Ok(())
    }

    fn disconnect(&self) {
        // Dropping the client stops the MQTT task and closes the socket.
        lock(&self.client).take();
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
