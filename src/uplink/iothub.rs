//! IoT Hub MQTT conventions.
//!
//! Pure string handling for the device-side MQTT dialect: connection
//! string parsing, the telemetry topic, and the direct-method
//! request/response topics.  Kept free of any client library so it can
//! be tested on the host.

/// MQTT API version advertised in the username.
pub const API_VERSION: &str = "2021-04-12";

/// Subscription filter covering every direct-method invocation.
pub const METHODS_SUBSCRIBE_TOPIC: &str = "$iothub/methods/POST/#";

/// Longest device id IoT Hub accepts.
pub const MAX_DEVICE_ID_LEN: usize = 128;

/// IoT Hub device-id rule: 1 to 128 ASCII alphanumerics or any of
/// `-.%_*?!(),:=@$'`.  None of these need escaping in JSON.
pub fn is_valid_device_id(id: &str) -> bool {
    (1..=MAX_DEVICE_ID_LEN).contains(&id.len())
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-.%_*?!(),:=@$'".contains(c))
}

const METHOD_REQUEST_PREFIX: &str = "$iothub/methods/POST/";
const RID_MARKER: &str = "/?$rid=";

/// Identity extracted from a device connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub host_name: String,
    pub device_id: String,
    pub shared_access_key: Option<String>,
}

impl ConnectionString {
    /// Parse `HostName=…;DeviceId=…;SharedAccessKey=…`.
    ///
    /// Keys are matched case-insensitively; values may contain `=`
    /// (base64 padding).  Returns `None` when HostName or DeviceId is
    /// missing or empty.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut host_name = None;
        let mut device_id = None;
        let mut shared_access_key = None;

        for part in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=')?;
            match key.trim().to_ascii_lowercase().as_str() {
                "hostname" => host_name = Some(value.to_string()),
                "deviceid" => device_id = Some(value.to_string()),
                "sharedaccesskey" => shared_access_key = Some(value.to_string()),
                _ => {}
            }
        }

        let host_name = host_name.filter(|h| !h.is_empty())?;
        let device_id = device_id.filter(|d| !d.is_empty())?;
        Some(Self {
            host_name,
            device_id,
            shared_access_key,
        })
    }

    /// `mqtts://{host}:8883`
    pub fn broker_url(&self) -> String {
        format!("mqtts://{}:8883", self.host_name)
    }

    /// `{host}/{device}/?api-version=…`
    pub fn mqtt_username(&self) -> String {
        format!("{}/{}/?api-version={API_VERSION}", self.host_name, self.device_id)
    }
}

/// Device-to-cloud telemetry topic.
pub fn telemetry_topic(device_id: &str) -> String {
    format!("devices/{device_id}/messages/events/")
}

/// A decoded direct-method request topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodRequest<'a> {
    pub method: &'a str,
    pub request_id: &'a str,
}

/// Parse `$iothub/methods/POST/{method}/?$rid={rid}`.
pub fn parse_method_topic(topic: &str) -> Option<MethodRequest<'_>> {
    let rest = topic.strip_prefix(METHOD_REQUEST_PREFIX)?;
    let (method, request_id) = rest.split_once(RID_MARKER)?;
    if method.is_empty() || request_id.is_empty() || method.contains('/') {
        return None;
    }
    Some(MethodRequest { method, request_id })
}

/// `$iothub/methods/res/{status}/?$rid={rid}`
pub fn method_response_topic(status: u16, request_id: &str) -> String {
    format!("$iothub/methods/res/{status}{RID_MARKER}{request_id}")
}
