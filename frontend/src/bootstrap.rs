//! What the page does with its room socket: announce itself once the socket
//! opens, and log whatever the server says back.

use jamroom_protocol as proto;
use thiserror::Error;
use tracing::{error, info};

/// Room every page creates and joins on startup.
pub const ROOM_NAME: &str = "test";

/// Outbound half of a room connection.
pub trait Transport {
    type Error: std::fmt::Debug;

    fn send_control(&self, message: &proto::ControlMessage) -> Result<(), Self::Error>;
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("message is not JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message is neither text nor binary")]
    UnsupportedFrame,
}

/// Sends `create_room` and then `join_room` for `room_name`.
///
/// Nothing is awaited between the two. A failed send is logged and does not
/// stop the next one.
pub fn announce<T: Transport>(transport: &T, room_name: &str) {
    let messages = [
        proto::ControlMessage::CreateRoom {
            room_name: room_name.to_string(),
        },
        proto::ControlMessage::JoinRoom {
            room_name: room_name.to_string(),
        },
    ];
    for control in messages.iter() {
        if let Err(error) = transport.send_control(control) {
            error!(message = "sending control message failed", ?control, ?error);
        }
    }
}

/// Decodes one inbound socket payload and logs it.
pub fn receive(payload: &[u8]) -> Result<serde_json::Value, DecodeError> {
    let value: serde_json::Value = serde_json::from_slice(payload)?;
    info!(message = "room socket message", data = %value);
    Ok(value)
}
