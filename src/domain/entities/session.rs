//! Mirrors of the room state, fed only by server-pushed events

use std::collections::HashSet;

use super::{RoomEvent, RoomSnapshot, Song};
use crate::application::errors::BotError;

/// Room-level state that is not membership
#[derive(Debug, Clone, Default)]
pub struct RoomState {
    pub room_id: Option<String>,
    pub chat_server: Option<serde_json::Value>,
    pub current_dj: Option<String>,
    pub current_song: Option<Song>,
}

/// What the bot knows about the room it sits in
#[derive(Debug, Clone)]
pub struct Session {
    pub bot_id: String,
    pub username: Option<String>,
    pub dj_ids: HashSet<String>,
    pub listener_ids: HashSet<String>,
    pub moderator_ids: HashSet<String>,
    pub admin_ids: HashSet<String>,
    pub max_djs: Option<usize>,
    pub room: RoomState,
}

impl Session {
    pub fn new(bot_id: impl Into<String>) -> Self {
        Self {
            bot_id: bot_id.into(),
            username: None,
            dj_ids: HashSet::new(),
            listener_ids: HashSet::new(),
            moderator_ids: HashSet::new(),
            admin_ids: HashSet::new(),
            max_djs: None,
            room: RoomState::default(),
        }
    }

    pub fn with_admins(mut self, admins: impl IntoIterator<Item = String>) -> Self {
        self.admin_ids = admins.into_iter().collect();
        self
    }

    pub fn is_moderator(&self, user_id: &str) -> bool {
        self.moderator_ids.contains(user_id)
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_ids.contains(user_id)
    }

    pub fn is_dj(&self) -> bool {
        self.dj_ids.contains(&self.bot_id)
    }

    /// True while the bot's own track is on air
    pub fn is_playing(&self) -> bool {
        self.room.current_dj.as_deref() == Some(self.bot_id.as_str())
    }

    /// Apply one room event to the mirrors.
    ///
    /// Removals of members that are not present fail with
    /// [`BotError::MissingMember`]; earlier users of the same event stay applied.
    pub fn apply(&mut self, event: &RoomEvent) -> Result<(), BotError> {
        match event {
            RoomEvent::Registered { user } => {
                self.listener_ids.extend(user.iter().map(|u| u.id.clone()));
            }
            RoomEvent::Deregistered { user } => {
                for u in user {
                    remove_member(&mut self.listener_ids, "listener", &u.id)?;
                }
            }
            RoomEvent::AddDj { user } => {
                self.dj_ids.extend(user.iter().map(|u| u.id.clone()));
            }
            RoomEvent::RemDj { user } => {
                for u in user {
                    remove_member(&mut self.dj_ids, "dj", &u.id)?;
                }
            }
            RoomEvent::NewModerator { userid } => {
                self.moderator_ids.insert(userid.clone());
            }
            RoomEvent::RemModerator { userid } => {
                remove_member(&mut self.moderator_ids, "moderator", userid)?;
            }
            RoomEvent::RoomChanged(snapshot) => self.replace(snapshot),
            RoomEvent::NewSong { room } => {
                self.room.current_dj = room.metadata.current_dj.clone();
                self.room.current_song = room.metadata.current_song.clone();
            }
            RoomEvent::NoSong {} => {
                self.room.current_dj = None;
                self.room.current_song = None;
            }
            _ => {}
        }
        Ok(())
    }

    fn replace(&mut self, snapshot: &RoomSnapshot) {
        let metadata = &snapshot.room.metadata;
        self.dj_ids = metadata.djs.iter().cloned().collect();
        self.listener_ids = snapshot.users.iter().map(|u| u.id.clone()).collect();
        self.moderator_ids = metadata.moderator_id.iter().cloned().collect();
        self.max_djs = metadata.max_djs;
        self.room = RoomState {
            room_id: snapshot.room.roomid.clone(),
            chat_server: snapshot.room.chatserver.clone(),
            current_dj: metadata.current_dj.clone(),
            current_song: metadata.current_song.clone(),
        };
    }
}

fn remove_member(set: &mut HashSet<String>, name: &'static str, user_id: &str) -> Result<(), BotError> {
    if set.remove(user_id) {
        Ok(())
    } else {
        Err(BotError::MissingMember {
            set: name,
            user_id: user_id.to_string(),
        })
    }
}
