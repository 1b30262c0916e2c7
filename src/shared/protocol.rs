//! Client Protocol Frames
//!
//! Frames sent by clients over a live connection. A frame names an event,
//! carries its payload under `data`, and may request a response by setting
//! `ack`; the server answers with an `ack` event carrying the same id.
//!
//! ```json
//! {"event": "send_message", "ack": 7, "data": {"conversation_id": "…", "content": "hi"}}
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::SharedError;

/// Raw frame as received from the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientFrame {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,
}

/// Decoded client event
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Authenticate(AuthenticatePayload),
    JoinRoom(JoinRoomRequest),
    SendMessage(SendMessageRequest),
    ReceiveMessage(ReadReceiptRequest),
    TypingStart(Uuid),
    TypingStop(Uuid),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Authenticate(_) => "authenticate",
            ClientEvent::JoinRoom(_) => "join_room",
            ClientEvent::SendMessage(_) => "send_message",
            ClientEvent::ReceiveMessage(_) => "receive_message",
            ClientEvent::TypingStart(_) => "typing_start",
            ClientEvent::TypingStop(_) => "typing_stop",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthenticatePayload {
    pub token: String,
}

/// Join an existing conversation by id, or create one from participant ids
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JoinRoomRequest {
    #[serde(default)]
    pub conversation_id: Option<Uuid>,
    #[serde(default)]
    pub participant_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendMessageRequest {
    pub conversation_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadReceiptRequest {
    pub conversation_id: Uuid,
    pub message_id: Uuid,
}

/// Typing events accept either a bare conversation id or an object
#[derive(Deserialize)]
#[serde(untagged)]
enum ConversationRef {
    Bare(Uuid),
    Object { conversation_id: Uuid },
}

impl From<ConversationRef> for Uuid {
    fn from(value: ConversationRef) -> Self {
        match value {
            ConversationRef::Bare(id) => id,
            ConversationRef::Object { conversation_id } => conversation_id,
        }
    }
}

impl ClientFrame {
    /// Parse a text frame
    pub fn parse(text: &str) -> Result<Self, SharedError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decode the payload according to the event name
    pub fn decode(self) -> Result<(ClientEvent, Option<u64>), SharedError> {
        let ack = self.ack;
        let event = match self.event.as_str() {
            "authenticate" => ClientEvent::Authenticate(payload(self.data)?),
            "join_room" => {
                if self.data.is_null() {
                    ClientEvent::JoinRoom(JoinRoomRequest::default())
                } else {
                    ClientEvent::JoinRoom(payload(self.data)?)
                }
            }
            "send_message" => ClientEvent::SendMessage(payload(self.data)?),
            "receive_message" => ClientEvent::ReceiveMessage(payload(self.data)?),
            "typing_start" => ClientEvent::TypingStart(payload::<ConversationRef>(self.data)?.into()),
            "typing_stop" => ClientEvent::TypingStop(payload::<ConversationRef>(self.data)?.into()),
            other => {
                return Err(SharedError::protocol(format!("unknown event '{}'", other)));
            }
        };
        Ok((event, ack))
    }
}

fn payload<T: serde::de::DeserializeOwned>(data: serde_json::Value) -> Result<T, SharedError> {
    Ok(serde_json::from_value(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_decode_send_message_with_ack() {
        let conversation_id = Uuid::new_v4();
        let text = format!(
            r#"{{"event":"send_message","ack":7,"data":{{"conversation_id":"{}","content":"hi"}}}}"#,
            conversation_id
        );
        let (event, ack) = ClientFrame::parse(&text).unwrap().decode().unwrap();
        assert_eq!(ack, Some(7));
        assert_matches!(event, ClientEvent::SendMessage(req) if req.conversation_id == conversation_id && req.content == "hi");
    }

    #[test]
    fn test_decode_join_room_without_data() {
        let (event, ack) = ClientFrame::parse(r#"{"event":"join_room"}"#).unwrap().decode().unwrap();
        assert_eq!(ack, None);
        assert_eq!(event, ClientEvent::JoinRoom(JoinRoomRequest::default()));
    }

    #[test]
    fn test_decode_typing_accepts_bare_id_and_object() {
        let id = Uuid::new_v4();
        let bare = format!(r#"{{"event":"typing_start","data":"{}"}}"#, id);
        let object = format!(r#"{{"event":"typing_stop","data":{{"conversation_id":"{}"}}}}"#, id);

        let (event, _) = ClientFrame::parse(&bare).unwrap().decode().unwrap();
        assert_eq!(event, ClientEvent::TypingStart(id));
        let (event, _) = ClientFrame::parse(&object).unwrap().decode().unwrap();
        assert_eq!(event, ClientEvent::TypingStop(id));
    }

    #[test]
    fn test_decode_unknown_event() {
        let err = ClientFrame::parse(r#"{"event":"dance","data":{}}"#).unwrap().decode().unwrap_err();
        assert_matches!(err, SharedError::ProtocolError { .. });
    }

    #[test]
    fn test_decode_malformed_payload() {
        let err = ClientFrame::parse(r#"{"event":"send_message","data":{"content":"no id"}}"#)
            .unwrap()
            .decode()
            .unwrap_err();
        assert_matches!(err, SharedError::SerializationError { .. });
    }
}
