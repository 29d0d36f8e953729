//! Validation of inbound room socket messages.

use jamroom_protocol::{ControlMessage, ServerEvent};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Rejection {
    #[error("message data improperly encoded: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("improperly formed data")]
    MissingAction,
    #[error("Room name not specified")]
    MissingRoomName,
    #[error("Song not specified")]
    MissingSongUri,
    #[error("unsupported event: {0}")]
    Unsupported(String),
}

impl Rejection {
    /// What to tell the client, if anything. Undecodable and unknown messages
    /// are only logged.
    pub fn reply(&self) -> Option<ServerEvent> {
        match self {
            Rejection::Malformed(_) | Rejection::Unsupported(_) => None,
            Rejection::MissingAction | Rejection::MissingRoomName | Rejection::MissingSongUri => {
                Some(ServerEvent::error(self.to_string()))
            }
        }
    }
}

pub fn parse(payload: &[u8]) -> Result<ControlMessage, Rejection> {
    let value: Value = serde_json::from_slice(payload)?;
    let action = value
        .get("action")
        .and_then(Value::as_str)
        .ok_or(Rejection::MissingAction)?;
    // empty strings count as missing
    let field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    match action {
        "create_room" => Ok(ControlMessage::CreateRoom {
            room_name: field("room_name").ok_or(Rejection::MissingRoomName)?,
        }),
        "join_room" => Ok(ControlMessage::JoinRoom {
            room_name: field("room_name").ok_or(Rejection::MissingRoomName)?,
        }),
        "leave_room" => Ok(ControlMessage::LeaveRoom {}),
        "add_song" => Ok(ControlMessage::AddSong {
            song_uri: field("song_uri").ok_or(Rejection::MissingSongUri)?,
        }),
        other => Err(Rejection::Unsupported(other.to_string())),
    }
}
