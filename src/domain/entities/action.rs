//! Outbound actions and the responses the room service sends back

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;

use super::{Song, SongMetadata};
use crate::application::errors::BotError;

/// Identifies an outstanding request so its response can be routed back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(pub u64);

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Something the bot asks the room service to do
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    AddDj,
    RemDj,
    Skip,
    Bop,
    Speak { text: String },
    Pm { text: String, receiver: String },
    UserInfo,
    RoomInfo { room_id: Option<String> },
    ListRooms { skip: usize },
    PlaylistListAll,
    PlaylistAll { playlist: String },
    PlaylistCreate { playlist: String },
    PlaylistDelete { playlist: String },
    PlaylistSwitch { playlist: String },
    PlaylistAdd { playlist: String, song_id: String, index: usize },
    PlaylistRemove { playlist: String, index: usize },
    PlaylistReorder { playlist: String, from: usize, to: usize },
}

impl Action {
    /// Wire name of the action
    pub fn api_name(&self) -> &'static str {
        match self {
            Action::AddDj => "room.add_dj",
            Action::RemDj => "room.rem_dj",
            Action::Skip => "room.stop_song",
            Action::Bop => "room.vote",
            Action::Speak { .. } => "room.speak",
            Action::Pm { .. } => "pm.send",
            Action::UserInfo => "user.info",
            Action::RoomInfo { .. } => "room.info",
            Action::ListRooms { .. } => "room.directory_rooms",
            Action::PlaylistListAll => "playlist.list_all",
            Action::PlaylistAll { .. } => "playlist.all",
            Action::PlaylistCreate { .. } => "playlist.create",
            Action::PlaylistDelete { .. } => "playlist.delete",
            Action::PlaylistSwitch { .. } => "playlist.switch",
            Action::PlaylistAdd { .. } => "playlist.add",
            Action::PlaylistRemove { .. } => "playlist.remove",
            Action::PlaylistReorder { .. } => "playlist.reorder",
        }
    }
}

/// An action on its way to the transport, with the id its answer will carry
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: Option<CallId>,
    pub action: Action,
}

/// A playlist as listed by `playlist.list_all`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlaylistSummary {
    pub name: String,
    #[serde(default)]
    pub active: bool,
}

/// A room as listed by the room directory
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DirectoryRoom {
    pub roomid: String,
    pub shortcut: String,
    #[serde(default)]
    pub chatserver: Option<serde_json::Value>,
    #[serde(default)]
    pub metadata: DirectoryMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DirectoryMetadata {
    #[serde(default)]
    pub listeners: u64,
}

/// Body of a response from the room service
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse(pub serde_json::Value);

impl ApiResponse {
    pub fn new(body: serde_json::Value) -> Self {
        Self(body)
    }

    pub fn success(&self) -> bool {
        self.0.get("success").and_then(|v| v.as_bool()).unwrap_or(false)
    }

    /// The server's failure message, verbatim
    pub fn err(&self) -> String {
        self.str("err").unwrap_or("Unknown error").to_string()
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    pub fn field<T: DeserializeOwned>(&self, key: &str) -> Result<T, BotError> {
        let value = self
            .0
            .get(key)
            .cloned()
            .ok_or_else(|| BotError::Protocol(format!("response has no `{}` field", key)))?;
        serde_json::from_value(value).map_err(|e| BotError::Protocol(format!("`{}`: {}", key, e)))
    }

    /// Songs of a `playlist.all` listing
    pub fn songs(&self) -> Result<Vec<Song>, BotError> {
        self.field("list")
    }

    /// Playlists of a `playlist.list_all` listing
    pub fn playlists(&self) -> Result<Vec<PlaylistSummary>, BotError> {
        self.field("list")
    }

    /// Rooms of a directory page; each entry is a `[room, users]` pair
    pub fn directory_rooms(&self) -> Result<Vec<DirectoryRoom>, BotError> {
        let pairs: Vec<(DirectoryRoom, serde_json::Value)> = self.field("rooms")?;
        Ok(pairs.into_iter().map(|(room, _)| room).collect())
    }

    /// Song removed by a `playlist.remove`
    pub fn removed_song_id(&self) -> Result<String, BotError> {
        #[derive(Deserialize)]
        struct Removed {
            fileid: String,
        }

        let removed: Vec<Removed> = self.field("song_dict")?;
        removed
            .into_iter()
            .next()
            .map(|r| r.fileid)
            .ok_or_else(|| BotError::Protocol("empty `song_dict`".to_string()))
    }
}

impl SongMetadata {
    /// `"Song" by Artist`
    pub fn describe(&self) -> String {
        format!("\"{}\" by {}", self.song, self.artist)
    }
}
