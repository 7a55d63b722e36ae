// frontend/src/panel/dispatch.rs
//
// Frame -> state routing. One frame in, at most one state change out.

use katapult_shared::{INITIATE_UPDATE, InboundMessage, RPM_UPDATE};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

use super::observable::Observable;
use super::telemetry_window::TelemetryWindow;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame is not a JSON object")]
    NotAnObject,
    #[error("frame has no `kind` field")]
    MissingKind,
    #[error("{kind} frame is missing a valid `{field}` field")]
    Payload { kind: String, field: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    Rpm(f64),
    Initiated(bool),
    /// Kind not known to this panel; accepted and skipped.
    Ignored(String),
}

pub fn parse_frame(raw: &str) -> Result<InboundMessage, ParseError> {
    let value: Value = serde_json::from_str(raw)?;
    let Value::Object(obj) = &value else {
        return Err(ParseError::NotAnObject);
    };
    if !obj.contains_key("kind") {
        return Err(ParseError::MissingKind);
    }
    Ok(serde_json::from_value(value)?)
}

pub struct MessageDispatcher {
    window: TelemetryWindow,
    initiated: Observable<bool>,
}

impl MessageDispatcher {
    pub fn new(window: TelemetryWindow) -> Self {
        Self {
            window,
            initiated: Observable::new(false),
        }
    }

    /// Parses and routes one raw frame. Malformed frames are logged and
    /// dropped without touching any state.
    pub fn dispatch(&mut self, raw: &str) -> Result<Dispatched, ParseError> {
        let result = parse_frame(raw).and_then(|msg| self.route(msg));
        match &result {
            Ok(Dispatched::Ignored(kind)) => trace!(%kind, "ignoring unknown frame kind"),
            Ok(_) => {}
            Err(e) => debug!(error = %e, frame = raw, "dropping frame"),
        }
        result
    }

    fn route(&mut self, msg: InboundMessage) -> Result<Dispatched, ParseError> {
        match msg.kind.as_str() {
            RPM_UPDATE => {
                let rpm = msg
                    .data
                    .get("rpm")
                    .and_then(Value::as_f64)
                    .ok_or_else(|| payload_error(&msg, "rpm"))?;
                self.window.push(rpm);
                Ok(Dispatched::Rpm(rpm))
            }
            INITIATE_UPDATE => {
                let value = msg
                    .data
                    .get("value")
                    .and_then(Value::as_bool)
                    .ok_or_else(|| payload_error(&msg, "value"))?;
                self.initiated.set(value);
                Ok(Dispatched::Initiated(value))
            }
            _ => Ok(Dispatched::Ignored(msg.kind)),
        }
    }

    pub fn window(&self) -> &TelemetryWindow {
        &self.window
    }

    /// Read/subscribe handle for the "shot in progress" flag.
    pub fn initiated(&self) -> Observable<bool> {
        self.initiated.clone()
    }
}

fn payload_error(msg: &InboundMessage, field: &'static str) -> ParseError {
    ParseError::Payload {
        kind: msg.kind.clone(),
        field,
    }
}
