//! JSON message types exchanged over the real-time connection.
//!
//! Every frame is a JSON object tagged by `event`. Clients send intents:
//!
//! ```json
//! {"event": "decision", "data": {"position": "left", "decision": "white"}, "id": 7}
//! ```
//!
//! and the server answers with an `ack` for each intent, plus a `stateUpdate`
//! broadcast to every connection after each transition:
//!
//! ```json
//! {"event": "ack", "data": {"id": 7, "success": true}}
//! {"event": "stateUpdate", "data": {"state": "collectingDecisions", "context": {...}}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr};

use super::errors::ParseClientEventError;
use crate::lift::{Decision, JuryOverrule, LiftSnapshot, LiftState, Position};

/// Inbound event names.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ClientEvent {
    Join,
    Decision,
    ResetRefereeDecision,
    RevealDecisions,
    ResetAll,
    JuryOverrule,
    ClearJuryOverrule,
}

/// All inbound event names.
pub const ALL_CLIENT_EVENTS: [ClientEvent; 7] = [
    ClientEvent::Join,
    ClientEvent::Decision,
    ClientEvent::ResetRefereeDecision,
    ClientEvent::RevealDecisions,
    ClientEvent::ResetAll,
    ClientEvent::JuryOverrule,
    ClientEvent::ClearJuryOverrule,
];

impl ClientEvent {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Decision => "decision",
            Self::ResetRefereeDecision => "resetRefereeDecision",
            Self::RevealDecisions => "revealDecisions",
            Self::ResetAll => "resetAll",
            Self::JuryOverrule => "juryOverrule",
            Self::ClearJuryOverrule => "clearJuryOverrule",
        }
    }
}

impl fmt::Display for ClientEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ClientEvent {
    type Err = ParseClientEventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_CLIENT_EVENTS
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| ParseClientEventError(s.to_string()))
    }
}

/// Raw message from a client.
///
/// Payload fields stay as raw JSON so that the receiver can report exactly
/// which field is invalid, whatever its type.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ClientMessage {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<MessagePayload>,
    /// Correlation ID echoed back in the acknowledgement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

impl ClientMessage {
    /// Build a message for `event` with the given payload fields.
    #[must_use]
    pub fn new(event: ClientEvent, position: Option<&str>, decision: Option<&str>) -> Self {
        let data = (position.is_some() || decision.is_some()).then(|| MessagePayload {
            position: position.map(Value::from),
            decision: decision.map(Value::from),
        });
        Self {
            event: event.as_str().to_string(),
            data,
            id: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// Raw `position` field. JSON `null` reads as absent.
    #[must_use]
    pub fn position(&self) -> Option<&Value> {
        self.data.as_ref()?.position.as_ref()
    }

    /// Raw `decision` field. JSON `null` reads as absent.
    #[must_use]
    pub fn decision(&self) -> Option<&Value> {
        self.data.as_ref()?.decision.as_ref()
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct MessagePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Value>,
}

/// Acknowledgement for a single client message.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Ack {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Ack {
    #[must_use]
    pub fn success() -> Self {
        Self {
            id: None,
            success: true,
            error: None,
        }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            id: None,
            success: false,
            error: Some(error.into()),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: Option<u64>) -> Self {
        self.id = id;
        self
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// One referee decision in transport form.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RefereeDecision {
    pub position: Position,
    pub decision: Decision,
}

/// Transport-safe context: collections flattened to sequences in seat order.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextView {
    pub decisions: Vec<RefereeDecision>,
    pub connected_referees: Vec<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jury_overrule: Option<JuryOverrule>,
}

/// Payload of every `stateUpdate` message.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct StateUpdate {
    pub state: LiftState,
    pub context: ContextView,
}

impl From<&LiftSnapshot> for StateUpdate {
    fn from(snapshot: &LiftSnapshot) -> Self {
        let context = &snapshot.context;
        Self {
            state: snapshot.state,
            context: ContextView {
                decisions: context
                    .decisions
                    .iter()
                    .map(|(&position, &decision)| RefereeDecision { position, decision })
                    .collect(),
                connected_referees: context.connected_referees.iter().copied().collect(),
                jury_overrule: context.jury_overrule,
            },
        }
    }
}

/// Messages pushed from the server to clients.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    StateUpdate(StateUpdate),
    Error(ErrorPayload),
    Ack(Ack),
}

impl ServerMessage {
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            message: message.into(),
        })
    }
}

impl From<&LiftSnapshot> for ServerMessage {
    fn from(snapshot: &LiftSnapshot) -> Self {
        Self::StateUpdate(snapshot.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lift::{LiftEvent, LiftStateMachine};
    use serde_json::json;

    #[test]
    fn test_client_event_names_round_trip() {
        for event in ALL_CLIENT_EVENTS {
            assert_eq!(event.as_str().parse::<ClientEvent>(), Ok(event));
        }
        let err = "nope".parse::<ClientEvent>().unwrap_err();
        assert_eq!(err, ParseClientEventError("nope".to_string()));
        assert_eq!(err.to_string(), r#"unknown client event: "nope""#);
    }

    #[test]
    fn test_client_message_without_data() {
        let msg: ClientMessage = serde_json::from_str(r#"{"event":"resetAll"}"#).unwrap();
        assert_eq!(msg.event, "resetAll");
        assert!(msg.data.is_none());
        assert_eq!(msg.position(), None);

        let msg: ClientMessage = serde_json::from_str(r#"{"event":"join","data":null}"#).unwrap();
        assert!(msg.data.is_none());
    }

    #[test]
    fn test_client_message_keeps_raw_fields() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"event":"decision","data":{"position":"LEFT","decision":"white"},"id":3}"#,
        )
        .unwrap();
        assert_eq!(msg.position(), Some(&json!("LEFT")));
        assert_eq!(msg.decision(), Some(&json!("white")));
        assert_eq!(msg.id, Some(3));
    }

    #[test]
    fn test_client_message_accepts_non_string_fields() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"event":"decision","data":{"position":1,"decision":{"color":"red"}}}"#,
        )
        .unwrap();
        assert_eq!(msg.position(), Some(&json!(1)));
        assert_eq!(msg.decision(), Some(&json!({"color": "red"})));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"event":"join","data":{"position":null}}"#).unwrap();
        assert_eq!(msg.position(), None);
    }

    #[test]
    fn test_client_message_builder_serializes() {
        let msg = ClientMessage::new(ClientEvent::JuryOverrule, None, Some("red")).with_id(9);
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"event": "juryOverrule", "data": {"decision": "red"}, "id": 9})
        );

        let msg = ClientMessage::new(ClientEvent::RevealDecisions, None, None);
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"event": "revealDecisions"})
        );
    }

    #[test]
    fn test_ack_shapes() {
        assert_eq!(
            serde_json::to_value(ServerMessage::Ack(Ack::success())).unwrap(),
            json!({"event": "ack", "data": {"success": true}})
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::Ack(
                Ack::failure("Invalid position").with_id(Some(4))
            ))
            .unwrap(),
            json!({"event": "ack", "data": {"id": 4, "success": false, "error": "Invalid position"}})
        );
    }

    #[test]
    fn test_error_message_shape() {
        assert_eq!(
            serde_json::to_value(ServerMessage::error("Invalid authentication token")).unwrap(),
            json!({"event": "error", "data": {"message": "Invalid authentication token"}})
        );
    }

    #[test]
    fn test_state_update_flattens_in_seat_order() {
        let mut machine = LiftStateMachine::with_clock(|| 42);
        machine.send(LiftEvent::Decision {
            position: Position::Right,
            decision: Decision::Blue,
        });
        machine.send(LiftEvent::Decision {
            position: Position::Left,
            decision: Decision::White,
        });
        machine.send(LiftEvent::RefereeConnected {
            position: Position::Right,
        });
        machine.send(LiftEvent::RefereeConnected {
            position: Position::Chief,
        });

        let value = serde_json::to_value(ServerMessage::from(&machine.snapshot())).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "stateUpdate",
                "data": {
                    "state": "collectingDecisions",
                    "context": {
                        "decisions": [
                            {"position": "left", "decision": "white"},
                            {"position": "right", "decision": "blue"}
                        ],
                        "connectedReferees": ["chief", "right"]
                    }
                }
            })
        );
    }

    #[test]
    fn test_state_update_includes_overrule() {
        let mut machine = LiftStateMachine::with_clock(|| 1_234);
        machine.send(LiftEvent::JuryOverrule {
            decision: Decision::Red,
        });

        let update = StateUpdate::from(&machine.snapshot());
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["state"], "juryOverrule");
        assert_eq!(
            value["context"]["juryOverrule"],
            json!({"decision": "red", "timestamp": 1_234})
        );

        let parsed: StateUpdate = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, update);
    }
}
