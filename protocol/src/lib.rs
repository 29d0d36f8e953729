use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Instruction sent by a client over the room socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ControlMessage {
    CreateRoom { room_name: String },
    JoinRoom { room_name: String },
    LeaveRoom {},
    AddSong { song_uri: String },
}

/// Everything the server pushes down the room socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerEvent {
    Error {
        error: String,
    },
    Queue {
        uris: Vec<String>,
        #[serde(with = "time::serde::rfc3339")]
        last_updated: OffsetDateTime,
    },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            error: message.into(),
        }
    }
}

// Search results, as returned by the upstream search API. Only the fields we
// display are modeled; everything else is ignored on decode.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub tracks: TrackPage,
}

impl SearchResponse {
    pub fn empty() -> Self {
        Self {
            tracks: TrackPage { items: Vec::new() },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPage {
    pub items: Vec<Track>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub album: Album,
    pub artists: Vec<Artist>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub name: String,
}
