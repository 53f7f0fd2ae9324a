//! Multi-round playlist operations as explicit state machines.
//!
//! Each chain is started with the first request to issue and is then fed the
//! answer to its latest request through `on_response`, which yields the
//! replies to send and the next request, if any. A chain without a next
//! request is finished.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};

use rand::seq::SliceRandom;
use rand::Rng;

use crate::application::errors::BotError;
use crate::domain::entities::{Action, ApiResponse, LoggedSong, RoomDetails};

/// Song-id membership of each known remote playlist
pub type Mirrors = HashMap<String, HashSet<String>>;

/// What to do after a chain absorbed a response
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Step {
    pub replies: Vec<String>,
    pub next: Option<Action>,
}

impl Step {
    pub fn done() -> Self {
        Self::default()
    }

    pub fn reply(text: impl Into<String>) -> Self {
        Self::done().and_reply(text)
    }

    pub fn request(action: Action) -> Self {
        Self {
            replies: Vec::new(),
            next: Some(action),
        }
    }

    pub fn and_reply(mut self, text: impl Into<String>) -> Self {
        self.replies.push(text.into());
        self
    }

    pub fn is_done(&self) -> bool {
        self.next.is_none()
    }
}

/// Empties a playlist by removing its head until nothing is left
#[derive(Debug, Clone)]
pub struct ClearChain {
    playlist: String,
    initial_count: usize,
    removed: usize,
}

impl ClearChain {
    pub const PROGRESS_EVERY: usize = 30;

    pub fn start(playlist: &str, mirror: &HashSet<String>) -> (Self, Action) {
        let chain = Self {
            playlist: playlist.to_string(),
            initial_count: mirror.len(),
            removed: 0,
        };
        let action = chain.remove_head();
        (chain, action)
    }

    pub fn playlist(&self) -> &str {
        &self.playlist
    }

    fn remove_head(&self) -> Action {
        Action::PlaylistRemove {
            playlist: self.playlist.clone(),
            index: 0,
        }
    }

    pub fn on_response(&mut self, response: &ApiResponse, mirror: &mut HashSet<String>) -> Result<Step, BotError> {
        if !response.success() {
            return Ok(Step::reply(format!(
                "Failure clearing playlist. There are still {} items.",
                mirror.len()
            )));
        }

        let song_id = response.removed_song_id()?;
        if !mirror.remove(&song_id) {
            return Err(BotError::MissingSong {
                playlist: self.playlist.clone(),
                song_id,
            });
        }

        // The mirror may grow mid-clear (`/pladd`), so count removals here
        self.removed += 1;
        let mut step = Step::done();
        if self.removed % Self::PROGRESS_EVERY == 0 {
            step = step.and_reply(format!(
                "Removed {} of {} songs so far.",
                self.removed, self.initial_count
            ));
        }

        if mirror.is_empty() {
            Ok(step.and_reply(format!("Cleared playlist {}.", self.playlist)))
        } else {
            step.next = Some(self.remove_head());
            Ok(step)
        }
    }
}

/// Brings up to ten randomly chosen songs to the front, one move at a time.
///
/// Song order is not mirrored, so positions stand in for songs and each move
/// is replayed on that synthetic order to find the next source index.
#[derive(Debug, Clone)]
pub struct ShuffleChain {
    playlist: String,
    order: Vec<usize>,
    picks: VecDeque<usize>,
    next_dst: usize,
}

impl ShuffleChain {
    pub const MAX_MOVES: usize = 10;

    /// `None` when there are fewer than two songs to move
    pub fn start<R: Rng + ?Sized>(playlist: &str, len: usize, rng: &mut R) -> Option<(Self, Action)> {
        let moves = len.min(Self::MAX_MOVES);
        if moves < 2 {
            return None;
        }

        let mut picks = rand::seq::index::sample(rng, len, moves).into_vec();
        picks.shuffle(rng);

        let mut chain = Self {
            playlist: playlist.to_string(),
            order: (0..len).collect(),
            picks: picks.into(),
            next_dst: 0,
        };
        let action = chain.next_move()?;
        Some((chain, action))
    }

    fn next_move(&mut self) -> Option<Action> {
        let pick = self.picks.pop_front()?;
        let dst = self.next_dst;
        self.next_dst += 1;

        let src = self.order.iter().position(|&p| p == pick)?;
        if src != dst {
            self.order.remove(src);
            self.order.insert(dst, pick);
        }

        Some(Action::PlaylistReorder {
            playlist: self.playlist.clone(),
            from: src,
            to: dst,
        })
    }

    pub fn on_response(&mut self, response: &ApiResponse) -> Step {
        if !response.success() {
            return Step::reply("Error shuffling playlist.");
        }
        match self.next_move() {
            Some(action) => Step::request(action),
            None => Step::reply("Everyday I'm shuffling (completed)."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadStage {
    Deleting,
    Creating,
    Adding,
    Switching,
}

/// Rebuilds a remote playlist from a locally configured list of song ids
#[derive(Debug, Clone)]
pub struct LoadChain {
    local_name: String,
    playlist: String,
    queue: VecDeque<String>,
    in_flight: Option<String>,
    failed: Vec<String>,
    stage: LoadStage,
}

impl LoadChain {
    pub const PLAYLIST_PREFIX: &'static str = "local_";

    pub fn start(local_name: &str, song_ids: Vec<String>, mirrors: &Mirrors) -> (Self, Action) {
        let playlist = format!("{}{}", Self::PLAYLIST_PREFIX, local_name);
        let exists = mirrors.contains_key(&playlist);
        let (stage, action) = if exists {
            (
                LoadStage::Deleting,
                Action::PlaylistDelete {
                    playlist: playlist.clone(),
                },
            )
        } else {
            (
                LoadStage::Creating,
                Action::PlaylistCreate {
                    playlist: playlist.clone(),
                },
            )
        };

        let chain = Self {
            local_name: local_name.to_string(),
            playlist,
            queue: song_ids.into(),
            in_flight: None,
            failed: Vec::new(),
            stage,
        };
        (chain, action)
    }

    pub fn playlist(&self) -> &str {
        &self.playlist
    }

    pub fn on_response(
        &mut self,
        response: &ApiResponse,
        mirrors: &mut Mirrors,
        active: &mut Option<String>,
    ) -> Step {
        match self.stage {
            LoadStage::Deleting => {
                if !response.success() {
                    return Step::reply(response.err());
                }
                mirrors.remove(&self.playlist);
                self.stage = LoadStage::Creating;
                Step::request(Action::PlaylistCreate {
                    playlist: self.playlist.clone(),
                })
            }
            LoadStage::Creating => {
                if !response.success() {
                    return Step::reply(response.err());
                }
                mirrors.insert(self.playlist.clone(), HashSet::new());
                self.stage = LoadStage::Adding;
                self.add_next(mirrors)
            }
            LoadStage::Adding => {
                if let Some(song_id) = self.in_flight.take() {
                    if !response.success() {
                        if let Some(mirror) = mirrors.get_mut(&self.playlist) {
                            mirror.remove(&song_id);
                        }
                        self.failed.push(song_id);
                    }
                }
                self.add_next(mirrors)
            }
            LoadStage::Switching => {
                if !response.success() {
                    return Step::reply(response.err());
                }
                let name = response.str("playlist_name").unwrap_or(&self.playlist).to_string();
                let loaded = mirrors.get(&name).map(HashSet::len).unwrap_or(0);
                *active = Some(name);

                let mut reply = format!("Loaded {} songs from local playlist {}.", loaded, self.local_name);
                if !self.failed.is_empty() {
                    reply.push_str(&format!(
                        " Failed to load the following song ids: {}",
                        self.failed.join(",")
                    ));
                }
                Step::reply(reply)
            }
        }
    }

    /// Issue the next song not yet in the playlist, or switch once none are left
    fn add_next(&mut self, mirrors: &mut Mirrors) -> Step {
        let mirror = mirrors.entry(self.playlist.clone()).or_default();
        while let Some(song_id) = self.queue.pop_front() {
            if mirror.insert(song_id.clone()) {
                self.in_flight = Some(song_id.clone());
                return Step::request(Action::PlaylistAdd {
                    playlist: self.playlist.clone(),
                    song_id,
                    index: mirror.len() - 1,
                });
            }
        }

        self.stage = LoadStage::Switching;
        Step::request(Action::PlaylistSwitch {
            playlist: self.playlist.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpdateStage {
    RoomInfo,
    Creating,
    Switching,
    Listing,
    Adding,
}

/// Fills the playlist named after a room with that room's recently played songs
#[derive(Debug, Clone)]
pub struct UpdateChain {
    playlist: String,
    songlog: Vec<LoggedSong>,
    queue: VecDeque<String>,
    total: usize,
    /// Song whose add is awaiting an answer
    in_flight: Option<String>,
    stage: UpdateStage,
}

impl UpdateChain {
    pub fn start(shortcut: &str, room_id: &str) -> (Self, Action) {
        let chain = Self {
            playlist: shortcut.to_string(),
            songlog: Vec::new(),
            queue: VecDeque::new(),
            total: 0,
            in_flight: None,
            stage: UpdateStage::RoomInfo,
        };
        let action = Action::RoomInfo {
            room_id: Some(room_id.to_string()),
        };
        (chain, action)
    }

    pub fn playlist(&self) -> &str {
        &self.playlist
    }

    pub fn on_response(
        &mut self,
        response: &ApiResponse,
        mirrors: &mut Mirrors,
        active: &mut Option<String>,
    ) -> Result<Step, BotError> {
        if !response.success() {
            if let Some(song_id) = self.in_flight.take() {
                if let Some(mirror) = mirrors.get_mut(&self.playlist) {
                    mirror.remove(&song_id);
                }
            }
            return Ok(Step::reply(response.err()));
        }
        self.in_flight = None;

        match self.stage {
            UpdateStage::RoomInfo => {
                let room: RoomDetails = response.field("room")?;
                self.songlog = room.metadata.songlog;

                if !mirrors.contains_key(&self.playlist) {
                    self.stage = UpdateStage::Creating;
                    Ok(Step::request(Action::PlaylistCreate {
                        playlist: self.playlist.clone(),
                    }))
                } else if active.as_deref() == Some(self.playlist.as_str()) {
                    Ok(self.add_songs(mirrors))
                } else {
                    Ok(self.switch())
                }
            }
            UpdateStage::Creating => {
                mirrors.insert(self.playlist.clone(), HashSet::new());
                Ok(self.switch())
            }
            UpdateStage::Switching => {
                *active = Some(self.playlist.clone());
                self.stage = UpdateStage::Listing;
                Ok(Step::request(Action::PlaylistAll {
                    playlist: self.playlist.clone(),
                }))
            }
            UpdateStage::Listing => {
                let ids = response.songs()?.into_iter().map(|s| s.id).collect();
                mirrors.insert(self.playlist.clone(), ids);
                Ok(self.add_songs(mirrors))
            }
            UpdateStage::Adding => Ok(self.add_next(mirrors)),
        }
    }

    fn switch(&mut self) -> Step {
        self.stage = UpdateStage::Switching;
        Step::request(Action::PlaylistSwitch {
            playlist: self.playlist.clone(),
        })
    }

    /// Queue unseen songs, least popular first: each lands at the head, so
    /// the most popular ones end up playing soonest.
    fn add_songs(&mut self, mirrors: &mut Mirrors) -> Step {
        let mirror = mirrors.entry(self.playlist.clone()).or_default();

        let mut seen = HashSet::new();
        let mut to_add: Vec<&LoggedSong> = self
            .songlog
            .iter()
            .filter(|s| !mirror.contains(&s.id) && seen.insert(s.id.as_str()))
            .collect();
        if to_add.is_empty() {
            return Step::reply("No songs to add.");
        }

        to_add.sort_by(|a, b| compare_scores(a.score, b.score).then_with(|| a.id.cmp(&b.id)));
        self.queue = to_add.into_iter().map(|s| s.id.clone()).collect();
        self.total = self.queue.len();
        self.stage = UpdateStage::Adding;
        self.add_next(mirrors)
    }

    fn add_next(&mut self, mirrors: &mut Mirrors) -> Step {
        match self.queue.pop_front() {
            Some(song_id) => {
                mirrors
                    .entry(self.playlist.clone())
                    .or_default()
                    .insert(song_id.clone());
                self.in_flight = Some(song_id.clone());
                Step::request(Action::PlaylistAdd {
                    playlist: self.playlist.clone(),
                    song_id,
                    index: 0,
                })
            }
            None => Step::reply(format!("Added {} songs", self.total)),
        }
    }
}

/// Unscored songs sort before scored ones
fn compare_scores(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
