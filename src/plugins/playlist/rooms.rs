//! Room directory crawl feeding `/plupdate`

use std::collections::BTreeMap;

use serde_json::Value;

use crate::domain::entities::DirectoryRoom;

/// Quiet rooms are still kept until this many same-server rooms were seen
pub const UPDATE_MIN_ROOMS: usize = 20;
pub const UPDATE_MIN_LISTENERS: u64 = 5;

/// Shortcut to room id for rooms on the bot's chat server
#[derive(Debug, Default, Clone)]
pub struct RoomDirectory {
    rooms: BTreeMap<String, String>,
    counted: usize,
    crawl: u64,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start over from the first page; known rooms are kept.
    ///
    /// Returns the new crawl number. Pages fetched for an earlier crawl must
    /// not be absorbed once this is called.
    pub fn restart(&mut self) -> u64 {
        self.counted = 0;
        self.crawl += 1;
        self.crawl
    }

    pub fn is_current(&self, crawl: u64) -> bool {
        self.crawl == crawl
    }

    /// Absorb one directory page fetched at `skip`.
    ///
    /// Returns the offset of the next page, or `None` once the crawl is
    /// over: the page was empty, or a quiet room showed up after enough
    /// same-server rooms were already counted.
    pub fn absorb(&mut self, skip: usize, page: Vec<DirectoryRoom>, chat_server: Option<&Value>) -> Option<usize> {
        if page.is_empty() {
            return None;
        }

        let next = skip + page.len();
        for room in page {
            if room.chatserver.as_ref() != chat_server {
                continue;
            }
            self.counted += 1;
            if room.metadata.listeners < UPDATE_MIN_LISTENERS && self.counted > UPDATE_MIN_ROOMS {
                return None;
            }
            self.rooms.insert(room.shortcut, room.roomid);
        }
        Some(next)
    }

    pub fn get(&self, shortcut: &str) -> Option<&str> {
        self.rooms.get(shortcut).map(String::as_str)
    }

    pub fn shortcuts(&self) -> impl Iterator<Item = &str> {
        self.rooms.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::action::DirectoryMetadata;
    use serde_json::json;

    fn room(shortcut: &str, listeners: u64, server: &str) -> DirectoryRoom {
        DirectoryRoom {
            roomid: format!("id-{}", shortcut),
            shortcut: shortcut.to_string(),
            chatserver: Some(json!([server, 80])),
            metadata: DirectoryMetadata { listeners },
        }
    }

    #[test]
    fn test_keeps_only_same_server_rooms() {
        let server = json!(["chat1", 80]);
        let mut directory = RoomDirectory::new();

        let next = directory.absorb(0, vec![room("indie", 30, "chat1"), room("metal", 30, "chat2")], Some(&server));
        assert_eq!(next, Some(2));
        assert_eq!(directory.get("indie"), Some("id-indie"));
        assert_eq!(directory.get("metal"), None);
    }

    #[test]
    fn test_stops_on_empty_page() {
        let mut directory = RoomDirectory::new();
        assert_eq!(directory.absorb(40, vec![], None), None);
    }

    #[test]
    fn test_stops_at_quiet_room_after_enough_rooms() {
        let server = json!(["chat1", 80]);
        let mut directory = RoomDirectory::new();

        let busy: Vec<DirectoryRoom> = (0..UPDATE_MIN_ROOMS)
            .map(|i| room(&format!("busy{:02}", i), 50, "chat1"))
            .collect();
        assert_eq!(directory.absorb(0, busy, Some(&server)), Some(UPDATE_MIN_ROOMS));

        let tail = vec![room("quiet", 1, "chat1"), room("later", 50, "chat1")];
        assert_eq!(directory.absorb(UPDATE_MIN_ROOMS, tail, Some(&server)), None);
        assert_eq!(directory.len(), UPDATE_MIN_ROOMS);
        assert_eq!(directory.get("quiet"), None);
    }

    #[test]
    fn test_quiet_rooms_kept_early_on() {
        let server = json!(["chat1", 80]);
        let mut directory = RoomDirectory::new();
        directory.absorb(0, vec![room("quiet", 0, "chat1")], Some(&server));
        assert_eq!(directory.get("quiet"), Some("id-quiet"));
    }
}
