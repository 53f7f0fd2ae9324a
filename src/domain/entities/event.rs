//! Room events pushed by the room service

use serde::Deserialize;

use super::{ChatMessage, User};
use crate::application::errors::BotError;

/// Song metadata as attached to playlist entries and the current song
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SongMetadata {
    #[serde(default)]
    pub song: String,
    #[serde(default)]
    pub artist: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Song {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub metadata: SongMetadata,
}

/// An entry of a room's song log
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggedSong {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RoomMetadata {
    #[serde(default)]
    pub djs: Vec<String>,
    #[serde(default)]
    pub max_djs: Option<usize>,
    #[serde(default)]
    pub moderator_id: Vec<String>,
    #[serde(default)]
    pub current_dj: Option<String>,
    #[serde(default)]
    pub current_song: Option<Song>,
    #[serde(default)]
    pub songlog: Vec<LoggedSong>,
    #[serde(default)]
    pub listeners: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RoomDetails {
    #[serde(default)]
    pub roomid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub shortcut: Option<String>,
    #[serde(default)]
    pub chatserver: Option<serde_json::Value>,
    #[serde(default)]
    pub metadata: RoomMetadata,
}

/// A full room snapshot, authoritative for every membership set
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RoomSnapshot {
    pub room: RoomDetails,
    #[serde(default)]
    pub users: Vec<User>,
}

/// Inbound room event, tagged by its `command` attribute
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command")]
pub enum RoomEvent {
    #[serde(rename = "add_dj")]
    AddDj { user: Vec<User> },
    #[serde(rename = "rem_dj")]
    RemDj { user: Vec<User> },
    #[serde(rename = "registered")]
    Registered { user: Vec<User> },
    #[serde(rename = "deregistered")]
    Deregistered { user: Vec<User> },
    #[serde(rename = "new_moderator")]
    NewModerator { userid: String },
    #[serde(rename = "rem_moderator")]
    RemModerator { userid: String },
    #[serde(rename = "roomChanged")]
    RoomChanged(RoomSnapshot),
    #[serde(rename = "speak")]
    Speak {
        userid: String,
        name: String,
        text: String,
    },
    #[serde(rename = "pmmed")]
    Pmmed { senderid: String, text: String },
    #[serde(rename = "newsong")]
    NewSong {
        #[serde(default)]
        room: RoomDetails,
    },
    #[serde(rename = "endsong")]
    EndSong {},
    #[serde(rename = "nosong")]
    NoSong {},
    #[serde(rename = "ready")]
    Ready {},
    #[serde(other)]
    Unknown,
}

impl RoomEvent {
    pub fn from_value(value: serde_json::Value) -> Result<Self, BotError> {
        serde_json::from_value(value).map_err(|e| BotError::Protocol(e.to_string()))
    }

    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            RoomEvent::AddDj { .. } => "add_dj",
            RoomEvent::RemDj { .. } => "rem_dj",
            RoomEvent::Registered { .. } => "registered",
            RoomEvent::Deregistered { .. } => "deregistered",
            RoomEvent::NewModerator { .. } => "new_moderator",
            RoomEvent::RemModerator { .. } => "rem_moderator",
            RoomEvent::RoomChanged(_) => "roomChanged",
            RoomEvent::Speak { .. } => "speak",
            RoomEvent::Pmmed { .. } => "pmmed",
            RoomEvent::NewSong { .. } => "newsong",
            RoomEvent::EndSong {} => "endsong",
            RoomEvent::NoSong {} => "nosong",
            RoomEvent::Ready {} => "ready",
            RoomEvent::Unknown => "unknown",
        }
    }

    /// Users carried by membership events
    pub fn users(&self) -> &[User] {
        match self {
            RoomEvent::AddDj { user }
            | RoomEvent::RemDj { user }
            | RoomEvent::Registered { user }
            | RoomEvent::Deregistered { user } => user,
            _ => &[],
        }
    }

    /// The chat message carried by `speak` and `pmmed`
    pub fn chat_message(&self) -> Option<ChatMessage> {
        match self {
            RoomEvent::Speak { userid, name, text } => {
                Some(ChatMessage::from_room(userid, text).with_sender_name(name))
            }
            RoomEvent::Pmmed { senderid, text } => Some(ChatMessage::from_private(senderid, text)),
            _ => None,
        }
    }
}
