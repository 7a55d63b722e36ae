use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Duplex channel path, relative to the device base URL.
pub const WS_PATH: &str = "/api/ws";
pub const RESET_PATH: &str = "/api/reset";
pub const TURN_PATH: &str = "/api/trigger/turn";
pub const INITIATE_PATH: &str = "/api/trigger/initiate";

pub const RPM_UPDATE: &str = "RPM_UPDATE";
pub const INITIATE_UPDATE: &str = "INITIATE_UPDATE";

/// Envelope of every frame the device pushes over the duplex channel:
///   { "kind": "RPM_UPDATE",      "data": { "rpm": 42.0 } }
///   { "kind": "INITIATE_UPDATE", "data": { "value": true } }
///
/// `kind` is kept as a plain string and `data` as any JSON value so that kinds
/// added on the device side still decode and can be skipped by older panels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl InboundMessage {
    pub fn rpm(rpm: f64) -> Self {
        Self::with_data(RPM_UPDATE, json!({ "rpm": rpm }))
    }

    pub fn initiate_update(value: bool) -> Self {
        Self::with_data(INITIATE_UPDATE, json!({ "value": value }))
    }

    fn with_data(kind: &str, data: Value) -> Self {
        Self {
            kind: kind.to_string(),
            data,
        }
    }

    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Body of `POST /api/trigger/initiate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiateBody {
    pub angle: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpm_frame_matches_wire_shape() {
        let frame = InboundMessage::rpm(120.0).to_frame().expect("serialize");
        let v: Value = serde_json::from_str(&frame).expect("json");
        assert_eq!(v["kind"], "RPM_UPDATE");
        assert_eq!(v["data"]["rpm"], 120.0);
    }

    #[test]
    fn missing_data_defaults_to_null() {
        let msg: InboundMessage = serde_json::from_str(r#"{"kind":"PING"}"#).expect("decode");
        assert_eq!(msg.kind, "PING");
        assert!(msg.data.is_null());
    }
}
