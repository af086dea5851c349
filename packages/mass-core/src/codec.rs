//! Wire codec for the server's JSON command/event protocol.
//!
//! Outbound frames are [`CommandEnvelope`]s. Inbound frames are classified
//! structurally (parse first, then inspect top-level keys) into one of the
//! [`InboundMessage`] variants. Classification never looks at field values,
//! so a payload that merely contains a field name as text cannot be
//! misrouted.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::endpoint::ServerEndpoint;
use crate::error::{ClientError, ClientResult};
use crate::protocol_constants::{
    FIELD_ERROR_CODE, FIELD_EVENT, FIELD_MESSAGE_ID, FIELD_RESULT, FIELD_SERVER_ID,
    FIELD_SERVER_VERSION,
};

/// Ordered command arguments.
///
/// Built on `serde_json`'s `preserve_order` map so arguments go out in the
/// order they were inserted.
pub type CommandArgs = Map<String, Value>;

// ─────────────────────────────────────────────────────────────────────────────
// Outbound
// ─────────────────────────────────────────────────────────────────────────────

/// Outbound command frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandEnvelope {
    /// Correlation id; omitted from the wire until assigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<u64>,
    /// Command path, e.g. `players/all`.
    pub command: String,
    /// Arguments. `None` is sent as an explicit `null`.
    pub args: Option<CommandArgs>,
}

impl CommandEnvelope {
    /// Creates an envelope without a correlation id.
    pub fn new(command: impl Into<String>, args: Option<CommandArgs>) -> Self {
        Self {
            message_id: None,
            command: command.into(),
            args,
        }
    }

    /// Assigns the correlation id.
    #[must_use]
    pub fn with_message_id(mut self, id: u64) -> Self {
        self.message_id = Some(id);
        self
    }
}

/// Serializes an envelope to wire text.
///
/// # Errors
///
/// Returns [`ClientError::Encode`] if an argument value cannot be serialized.
pub fn encode(envelope: &CommandEnvelope) -> ClientResult<String> {
    serde_json::to_string(envelope).map_err(|e| ClientError::Encode(e.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Inbound
// ─────────────────────────────────────────────────────────────────────────────

/// Handshake frame sent by the server right after the socket opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub server_id: String,
    pub server_version: String,
    pub schema_version: i64,
    pub base_url: String,
    pub onboard_done: bool,
}

impl ServerInfo {
    /// Parses the advertised base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidEndpoint`] if the server advertised an
    /// unusable URL.
    pub fn endpoint(&self) -> ClientResult<ServerEndpoint> {
        ServerEndpoint::parse(&self.base_url)
    }
}

/// Unsolicited push notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEvent {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Successful command result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SuccessResult {
    #[serde(deserialize_with = "de_message_id")]
    pub message_id: u64,
    /// JSON `null` decodes to `None`.
    #[serde(default)]
    pub result: Option<Value>,
}

/// Command rejected by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorResult {
    #[serde(deserialize_with = "de_message_id")]
    pub message_id: u64,
    pub error_code: String,
    #[serde(default)]
    pub details: Option<String>,
}

impl ErrorResult {
    /// Converts the frame into the error handed to the awaiting caller.
    pub fn into_error(self) -> ClientError {
        ClientError::Server {
            code: self.error_code,
            details: self.details,
        }
    }
}

/// Shape of an inbound frame, decided from its top-level keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    ServerInfo,
    Event,
    Success,
    Error,
    Unrecognized,
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    ServerInfo(ServerInfo),
    Event(ServerEvent),
    Success(SuccessResult),
    Error(ErrorResult),
    /// Valid JSON that matches none of the known shapes.
    Unrecognized(Value),
}

impl InboundMessage {
    /// Returns the kind of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::ServerInfo(_) => MessageKind::ServerInfo,
            Self::Event(_) => MessageKind::Event,
            Self::Success(_) => MessageKind::Success,
            Self::Error(_) => MessageKind::Error,
            Self::Unrecognized(_) => MessageKind::Unrecognized,
        }
    }
}

/// Classifies a parsed frame by its top-level keys.
///
/// Precedence: handshake, event, success, error. Anything that is not a JSON
/// object is unrecognized.
pub fn classify(value: &Value) -> MessageKind {
    let Some(obj) = value.as_object() else {
        return MessageKind::Unrecognized;
    };

    if obj.contains_key(FIELD_SERVER_ID) && obj.contains_key(FIELD_SERVER_VERSION) {
        MessageKind::ServerInfo
    } else if obj.contains_key(FIELD_EVENT) {
        MessageKind::Event
    } else if obj.contains_key(FIELD_MESSAGE_ID) && obj.contains_key(FIELD_RESULT) {
        MessageKind::Success
    } else if obj.contains_key(FIELD_MESSAGE_ID) && obj.contains_key(FIELD_ERROR_CODE) {
        MessageKind::Error
    } else {
        MessageKind::Unrecognized
    }
}

/// Parses, classifies and decodes one inbound text frame.
///
/// # Errors
///
/// Returns [`ClientError::ProtocolDecode`] if the text is not JSON or a
/// classified frame does not match its expected shape. Callers treat this
/// as a per-frame failure.
pub fn decode(text: &str) -> ClientResult<InboundMessage> {
    let value: Value = serde_json::from_str(text)?;

    let message = match classify(&value) {
        MessageKind::ServerInfo => InboundMessage::ServerInfo(decode_as(value, "server info")?),
        MessageKind::Event => InboundMessage::Event(decode_as(value, "event")?),
        MessageKind::Success => InboundMessage::Success(decode_as(value, "success result")?),
        MessageKind::Error => InboundMessage::Error(decode_as(value, "error result")?),
        MessageKind::Unrecognized => InboundMessage::Unrecognized(value),
    };
    Ok(message)
}

fn decode_as<T: serde::de::DeserializeOwned>(value: Value, what: &str) -> ClientResult<T> {
    serde_json::from_value(value)
        .map_err(|e| ClientError::ProtocolDecode(format!("malformed {what} frame: {e}")))
}

/// Accepts a correlation id as a JSON integer or as a numeric string.
///
/// Servers echo the id back in whatever type they received it.
fn de_message_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Int(u64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Int(id) => Ok(id),
        RawId::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("message_id is not an integer: {s:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encode_sends_explicit_null_args() {
        let envelope = CommandEnvelope::new("players/all", None).with_message_id(1);
        let text = encode(&envelope).unwrap();
        assert_eq!(
            text,
            r#"{"message_id":1,"command":"players/all","args":null}"#
        );
    }

    #[test]
    fn encode_omits_unassigned_id_and_keeps_arg_order() {
        let mut args = CommandArgs::new();
        args.insert("queue_id".into(), json!("q1"));
        args.insert("index".into(), json!(3));
        args.insert("start_item".into(), Value::Null);
        let text = encode(&CommandEnvelope::new("player_queues/play_index", Some(args))).unwrap();
        assert_eq!(
            text,
            r#"{"command":"player_queues/play_index","args":{"queue_id":"q1","index":3,"start_item":null}}"#
        );
    }

    #[test]
    fn decodes_handshake() {
        let text = r#"{"server_id":"s1","server_version":"1.0","schema_version":1,"base_url":"http://h:8095","onboard_done":true}"#;
        let msg = decode(text).unwrap();
        assert_eq!(
            msg,
            InboundMessage::ServerInfo(ServerInfo {
                server_id: "s1".into(),
                server_version: "1.0".into(),
                schema_version: 1,
                base_url: "http://h:8095".into(),
                onboard_done: true,
            })
        );
    }

    #[test]
    fn decodes_event_with_optional_fields_missing() {
        let msg = decode(r#"{"event":"player_updated"}"#).unwrap();
        match msg {
            InboundMessage::Event(ev) => {
                assert_eq!(ev.event, "player_updated");
                assert!(ev.object_id.is_none());
                assert!(ev.data.is_none());
            }
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn decodes_success_with_null_result() {
        let msg = decode(r#"{"message_id":7,"result":null}"#).unwrap();
        assert_eq!(
            msg,
            InboundMessage::Success(SuccessResult {
                message_id: 7,
                result: None
            })
        );
    }

    #[test]
    fn decodes_string_message_id() {
        let msg = decode(r#"{"message_id":"12","result":[1,2]}"#).unwrap();
        assert_eq!(
            msg,
            InboundMessage::Success(SuccessResult {
                message_id: 12,
                result: Some(json!([1, 2]))
            })
        );
    }

    #[test]
    fn non_numeric_message_id_is_a_decode_error() {
        let err = decode(r#"{"message_id":"abc","result":1}"#).unwrap_err();
        assert!(matches!(err, ClientError::ProtocolDecode(_)));
    }

    #[test]
    fn decodes_error_frame() {
        let msg = decode(r#"{"message_id":3,"error_code":"not_found","details":"no player"}"#)
            .unwrap();
        let InboundMessage::Error(err) = msg else {
            panic!("expected error frame");
        };
        assert_eq!(
            err.into_error(),
            ClientError::Server {
                code: "not_found".into(),
                details: Some("no player".into())
            }
        );
    }

    #[test]
    fn classification_ignores_field_names_inside_values() {
        // A success result whose payload mentions "event" and "server_id"
        // as text is still a success result.
        let value = json!({
            "message_id": 4,
            "result": {"note": "\"event\" \"server_id\" \"server_version\""}
        });
        assert_eq!(classify(&value), MessageKind::Success);
    }

    #[test]
    fn nested_event_key_does_not_make_an_event() {
        let value = json!({"message_id": 5, "result": {"event": "x"}});
        assert_eq!(classify(&value), MessageKind::Success);
    }

    #[test]
    fn handshake_wins_over_event() {
        let value = json!({"server_id": "a", "server_version": "b", "event": "c"});
        assert_eq!(classify(&value), MessageKind::ServerInfo);
    }

    #[test]
    fn unknown_shapes_are_unrecognized() {
        assert_eq!(classify(&json!({"hello": "world"})), MessageKind::Unrecognized);
        assert_eq!(classify(&json!([1, 2, 3])), MessageKind::Unrecognized);
        assert_eq!(classify(&json!({"message_id": 1})), MessageKind::Unrecognized);
        assert_eq!(
            decode(r#"{"hello":"world"}"#).unwrap().kind(),
            MessageKind::Unrecognized
        );
    }

    #[test]
    fn invalid_json_is_a_decode_error() {
        assert!(matches!(
            decode("not json"),
            Err(ClientError::ProtocolDecode(_))
        ));
    }

    #[test]
    fn classified_but_malformed_is_a_decode_error() {
        // Looks like a handshake but schema_version has the wrong type.
        let err = decode(r#"{"server_id":"s","server_version":"1","schema_version":"x","base_url":"u","onboard_done":true}"#)
            .unwrap_err();
        assert!(err.to_string().contains("server info"));
    }
}
