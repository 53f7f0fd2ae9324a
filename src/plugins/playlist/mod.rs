//! Playlist management - mirrors remote playlists and edits them on request

mod chains;
mod rooms;

pub use chains::{ClearChain, LoadChain, Mirrors, ShuffleChain, Step, UpdateChain};
pub use rooms::{RoomDirectory, UPDATE_MIN_LISTENERS, UPDATE_MIN_ROOMS};

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use rand::SeedableRng;
use tracing::{debug, warn};

use super::matching::{best_match, BestMatch};
use super::trait_def::{Plugin, PluginContext};
use crate::application::errors::{BotError, CommandError};
use crate::domain::entities::{
    Action, ApiResponse, CallId, ChatMessage, Command, CommandOwner, Guard, RoomEvent,
};

pub const LIST_MAX_ITEMS: usize = 5;
pub const PLAYLIST_PREFIX: &str = "botplaylist.";
pub const UPDATE_MAX_ITEMS: usize = 10;
const DEFAULT_PLAYLIST: &str = "default";

/// What an outstanding request was issued for
enum Pending {
    RoomInfo,
    PlaylistInit,
    Refresh { playlist: String },
    DirectoryPage { skip: usize, crawl: u64 },
    Create { playlist: String, reply_to: ChatMessage },
    Delete { playlist: String, reply_to: ChatMessage },
    Listing { playlist: String, reply_to: ChatMessage },
    ListAll { reply_to: ChatMessage },
    SkipNext { reply_to: ChatMessage },
    Switch { playlist: String, reply_to: ChatMessage },
    ClearDelete { playlist: String, reply_to: ChatMessage },
    ClearRecreate { playlist: String, reply_to: ChatMessage },
    Clear { chain: ClearChain, reply_to: ChatMessage },
    Shuffle { chain: ShuffleChain, reply_to: ChatMessage },
    Load { chain: LoadChain, reply_to: ChatMessage },
    Update { chain: UpdateChain, reply_to: ChatMessage },
}

/// Keeps a mirror of the bot's playlists and exposes playlist commands
pub struct Playlist {
    name: String,
    active: Option<String>,
    mirrors: Mirrors,
    directory: RoomDirectory,
    pending: HashMap<CallId, Pending>,
    rng: StdRng,
}

impl Playlist {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_rng(name, StdRng::from_entropy())
    }

    pub fn with_rng(name: impl Into<String>, rng: StdRng) -> Self {
        Self {
            name: name.into(),
            active: None,
            mirrors: Mirrors::new(),
            directory: RoomDirectory::new(),
            pending: HashMap::new(),
            rng,
        }
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn mirror(&self, playlist: &str) -> Option<&HashSet<String>> {
        self.mirrors.get(playlist)
    }

    pub fn directory(&self) -> &RoomDirectory {
        &self.directory
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn owner(&self) -> CommandOwner {
        CommandOwner::Plugin(self.name.clone())
    }

    fn command(&self, name: &str, description: &str, guards: &[Guard]) -> Command {
        guards
            .iter()
            .fold(Command::new(name).with_description(description), |cmd, g| {
                cmd.with_guard(*g)
            })
            .owned_by(self.owner())
    }

    fn track(&mut self, ctx: &mut PluginContext<'_>, action: Action, pending: Pending) -> Result<(), BotError> {
        let id = ctx.call(action)?;
        self.pending.insert(id, pending);
        Ok(())
    }

    /// Active playlist, or tell the user there is none yet
    fn require_active(&self, message: &ChatMessage, ctx: &PluginContext<'_>) -> Result<Option<String>, BotError> {
        match &self.active {
            Some(active) => Ok(Some(active.clone())),
            None => {
                ctx.reply("I have not found my active playlist yet.", message)?;
                Ok(None)
            }
        }
    }

    /// Entered the room: learn the playlists once, crawl the directory every time
    fn room_init(&mut self, ctx: &mut PluginContext<'_>) -> Result<(), BotError> {
        if self.active.is_none() {
            self.track(ctx, Action::PlaylistListAll, Pending::PlaylistInit)?;
        }
        let crawl = self.directory.restart();
        self.track(ctx, Action::ListRooms { skip: 0 }, Pending::DirectoryPage { skip: 0, crawl })
    }

    fn add_current_song(&mut self, message: &ChatMessage, ctx: &mut PluginContext<'_>) -> Result<(), BotError> {
        let Some(song) = ctx.session.room.current_song.clone() else {
            return ctx.reply("There is no song playing.", message);
        };
        let Some(active) = self.require_active(message, ctx)? else {
            return Ok(());
        };

        let mirror = self.mirrors.entry(active.clone()).or_default();
        if mirror.contains(&song.id) {
            return ctx.reply("We already have that song.", message);
        }

        let index = mirror.len();
        mirror.insert(song.id.clone());
        debug!("Adding {} to {}", song.metadata.describe(), active);
        ctx.send(Action::PlaylistAdd {
            playlist: active,
            song_id: song.id,
            index,
        })?;
        ctx.send(Action::Bop)?;
        ctx.reply("Cool tunes, daddio.", message)
    }

    fn available(&self, message: &ChatMessage, ctx: &PluginContext<'_>) -> Result<(), BotError> {
        let mut names = ctx.config.suffixes(PLAYLIST_PREFIX);
        names.sort_unstable();
        ctx.reply(format!("Available playlists: {}", names.join(", ")), message)
    }

    fn clear(&mut self, message: &ChatMessage, ctx: &mut PluginContext<'_>) -> Result<(), BotError> {
        let Some(active) = self.require_active(message, ctx)? else {
            return Ok(());
        };
        let mirror = self.mirrors.entry(active.clone()).or_default();
        if mirror.is_empty() {
            return ctx.reply("The playlist is already empty.", message);
        }

        let reply_to = message.clone();
        if active != DEFAULT_PLAYLIST {
            return self.track(
                ctx,
                Action::PlaylistDelete {
                    playlist: active.clone(),
                },
                Pending::ClearDelete {
                    playlist: active,
                    reply_to,
                },
            );
        }

        let (chain, action) = ClearChain::start(&active, mirror);
        self.track(ctx, action, Pending::Clear { chain, reply_to })
    }

    fn shuffle(&mut self, message: &ChatMessage, ctx: &mut PluginContext<'_>) -> Result<(), BotError> {
        let Some(active) = self.require_active(message, ctx)? else {
            return Ok(());
        };
        let len = self.mirrors.get(&active).map(HashSet::len).unwrap_or(0);
        match ShuffleChain::start(&active, len, &mut self.rng) {
            Some((chain, action)) => self.track(
                ctx,
                action,
                Pending::Shuffle {
                    chain,
                    reply_to: message.clone(),
                },
            ),
            None => ctx.reply(format!("There are too few items to shuffle in {}.", active), message),
        }
    }

    fn skip_next(&mut self, message: &ChatMessage, ctx: &mut PluginContext<'_>) -> Result<(), BotError> {
        let Some(active) = self.require_active(message, ctx)? else {
            return Ok(());
        };
        let len = self.mirrors.get(&active).map(HashSet::len).unwrap_or(0);
        if len < 2 {
            return ctx.reply(format!("There is no next song in {}.", active), message);
        }
        self.track(
            ctx,
            Action::PlaylistReorder {
                playlist: active,
                from: 0,
                to: len - 1,
            },
            Pending::SkipNext {
                reply_to: message.clone(),
            },
        )
    }

    fn load(&mut self, local_name: &str, message: &ChatMessage, ctx: &mut PluginContext<'_>) -> Result<(), BotError> {
        let key = format!("{}{}", PLAYLIST_PREFIX, local_name);
        if !ctx.config.contains(&key) {
            return ctx.reply(format!("Playlist `{}` does not exist.", key), message);
        }

        let song_ids = ctx.config.lines(&key);
        let (chain, action) = LoadChain::start(local_name, song_ids, &self.mirrors);
        self.track(
            ctx,
            action,
            Pending::Load {
                chain,
                reply_to: message.clone(),
            },
        )
    }

    fn switch(&mut self, selection: &str, message: &ChatMessage, ctx: &mut PluginContext<'_>) -> Result<(), BotError> {
        match best_match(selection, self.mirrors.keys().map(String::as_str)) {
            BestMatch::One(playlist) => self.track(
                ctx,
                Action::PlaylistSwitch {
                    playlist: playlist.clone(),
                },
                Pending::Switch {
                    playlist,
                    reply_to: message.clone(),
                },
            ),
            BestMatch::Candidates(candidates) if candidates.is_empty() => {
                ctx.reply("Invalid playlist name.", message)
            }
            BestMatch::Candidates(candidates) => {
                ctx.reply(format!("Possible playlist matches: {}", candidates.join(", ")), message)
            }
        }
    }

    fn update(&mut self, selection: &str, message: &ChatMessage, ctx: &mut PluginContext<'_>) -> Result<(), BotError> {
        match best_match(selection, self.directory.shortcuts()) {
            BestMatch::One(shortcut) => {
                let Some(room_id) = self.directory.get(&shortcut).map(str::to_string) else {
                    return Ok(());
                };
                ctx.reply(format!("Querying {} ({})", shortcut, room_id), message)?;
                let (chain, action) = UpdateChain::start(&shortcut, &room_id);
                self.track(
                    ctx,
                    action,
                    Pending::Update {
                        chain,
                        reply_to: message.clone(),
                    },
                )
            }
            BestMatch::Candidates(candidates) if candidates.is_empty() => {
                let mut suggestions: Vec<&str> = self
                    .directory
                    .shortcuts()
                    .choose_multiple(&mut self.rng, UPDATE_MAX_ITEMS);
                suggestions.sort_unstable();
                ctx.reply(
                    format!(
                        "Could not find `{}` in the room_list. Perhaps try one of these: {}",
                        selection,
                        suggestions.join(", ")
                    ),
                    message,
                )
            }
            BestMatch::Candidates(candidates) => {
                ctx.reply(format!("Possible room matches: {}", candidates.join(", ")), message)
            }
        }
    }

    /// Relay a chain step; the chain stays pending while it has more to do
    fn follow(
        &mut self,
        step: Step,
        reply_to: &ChatMessage,
        ctx: &mut PluginContext<'_>,
    ) -> Result<Option<CallId>, BotError> {
        for text in step.replies {
            ctx.reply(text, reply_to)?;
        }
        match step.next {
            Some(action) => ctx.call(action).map(Some),
            None => Ok(None),
        }
    }

    fn resume(
        &mut self,
        step: Step,
        reply_to: ChatMessage,
        ctx: &mut PluginContext<'_>,
        rebuild: impl FnOnce(ChatMessage) -> Pending,
    ) -> Result<(), BotError> {
        if let Some(id) = self.follow(step, &reply_to, ctx)? {
            self.pending.insert(id, rebuild(reply_to));
        }
        Ok(())
    }

    fn handle_response(
        &mut self,
        pending: Pending,
        response: &ApiResponse,
        ctx: &mut PluginContext<'_>,
    ) -> Result<(), BotError> {
        match pending {
            Pending::RoomInfo => self.room_init(ctx),
            Pending::PlaylistInit => {
                for summary in response.playlists()? {
                    if summary.active {
                        self.active = Some(summary.name.clone());
                    }
                    self.mirrors.insert(summary.name, HashSet::new());
                }
                match self.active.clone() {
                    Some(playlist) => self.track(
                        ctx,
                        Action::PlaylistAll {
                            playlist: playlist.clone(),
                        },
                        Pending::Refresh { playlist },
                    ),
                    None => {
                        warn!("No active playlist reported");
                        Ok(())
                    }
                }
            }
            Pending::Refresh { playlist } => {
                let ids = response.songs()?.into_iter().map(|s| s.id).collect();
                self.mirrors.insert(playlist, ids);
                Ok(())
            }
            Pending::DirectoryPage { skip, crawl } => {
                if !self.directory.is_current(crawl) {
                    debug!("Dropping directory page {} from an earlier crawl", skip);
                    return Ok(());
                }
                let page = response.directory_rooms()?;
                let chat_server = ctx.session.room.chat_server.as_ref();
                match self.directory.absorb(skip, page, chat_server) {
                    Some(next) => self.track(
                        ctx,
                        Action::ListRooms { skip: next },
                        Pending::DirectoryPage { skip: next, crawl },
                    ),
                    None => {
                        debug!("Room directory holds {} rooms", self.directory.len());
                        Ok(())
                    }
                }
            }
            Pending::Create { playlist, reply_to } => {
                if !response.success() {
                    return ctx.reply(response.err(), &reply_to);
                }
                let name = response.str("playlist_name").unwrap_or(&playlist).to_string();
                ctx.reply(format!("Created playlist {}.", name), &reply_to)?;
                self.mirrors.insert(name, HashSet::new());
                Ok(())
            }
            Pending::Delete { playlist, reply_to } => {
                if !response.success() {
                    return ctx.reply(response.err(), &reply_to);
                }
                self.mirrors.remove(&playlist);
                ctx.reply(format!("Deleted playlist {}", playlist), &reply_to)
            }
            Pending::Listing { playlist, reply_to } => {
                if !response.success() {
                    return ctx.reply(response.err(), &reply_to);
                }
                let songs = response.songs()?;
                let shown: Vec<String> = songs
                    .iter()
                    .take(LIST_MAX_ITEMS)
                    .map(|s| s.metadata.describe())
                    .collect();
                let mut reply = format!("There are {} songs in the playlist.", songs.len());
                if !shown.is_empty() {
                    reply.push_str(&format!(" The first {} are: {}", shown.len(), shown.join(", ")));
                }
                self.mirrors
                    .insert(playlist, songs.into_iter().map(|s| s.id).collect());
                ctx.reply(reply, &reply_to)
            }
            Pending::ListAll { reply_to } => {
                if !response.success() {
                    return ctx.reply(response.err(), &reply_to);
                }
                let mut names: Vec<String> = response
                    .playlists()?
                    .into_iter()
                    .map(|p| {
                        self.mirrors.entry(p.name.clone()).or_default();
                        if p.active {
                            format!("{}*", p.name)
                        } else {
                            p.name
                        }
                    })
                    .collect();
                names.sort();
                ctx.reply(format!("Available playlists: {}", names.join(", ")), &reply_to)
            }
            Pending::SkipNext { reply_to } => {
                let text = if response.success() {
                    "Next song skipped."
                } else {
                    "Error skipping next song."
                };
                ctx.reply(text, &reply_to)
            }
            Pending::Switch { playlist, reply_to } => {
                if !response.success() {
                    return ctx.reply(response.err(), &reply_to);
                }
                self.active = Some(playlist.clone());
                ctx.reply(format!("Switched to playlist {}", playlist), &reply_to)?;
                self.track(
                    ctx,
                    Action::PlaylistAll {
                        playlist: playlist.clone(),
                    },
                    Pending::Refresh { playlist },
                )
            }
            Pending::ClearDelete { playlist, reply_to } => {
                if !response.success() {
                    return ctx.reply(response.err(), &reply_to);
                }
                self.mirrors.insert(playlist.clone(), HashSet::new());
                self.track(
                    ctx,
                    Action::PlaylistCreate {
                        playlist: playlist.clone(),
                    },
                    Pending::ClearRecreate { playlist, reply_to },
                )
            }
            Pending::ClearRecreate { playlist, reply_to } => {
                if !response.success() {
                    return ctx.reply(response.err(), &reply_to);
                }
                ctx.reply(format!("Cleared playlist {}.", playlist), &reply_to)
            }
            Pending::Clear { mut chain, reply_to } => {
                let mirror = self.mirrors.entry(chain.playlist().to_string()).or_default();
                let step = chain.on_response(response, mirror)?;
                self.resume(step, reply_to, ctx, |reply_to| Pending::Clear { chain, reply_to })
            }
            Pending::Shuffle { mut chain, reply_to } => {
                let step = chain.on_response(response);
                self.resume(step, reply_to, ctx, |reply_to| Pending::Shuffle { chain, reply_to })
            }
            Pending::Load { mut chain, reply_to } => {
                let step = chain.on_response(response, &mut self.mirrors, &mut self.active);
                self.resume(step, reply_to, ctx, |reply_to| Pending::Load { chain, reply_to })
            }
            Pending::Update { mut chain, reply_to } => {
                let step = chain.on_response(response, &mut self.mirrors, &mut self.active)?;
                self.resume(step, reply_to, ctx, |reply_to| Pending::Update { chain, reply_to })
            }
        }
    }
}

impl Plugin for Playlist {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Manages the bot's playlists"
    }

    fn commands(&self) -> Vec<Command> {
        use Guard::{AdminOrModerator, NoArgs, SingleArg};
        vec![
            self.command("/pladd", "Add the current song to the active playlist.", &[NoArgs]),
            self.command("/plavailable", "List the locally configured playlists.", &[AdminOrModerator, NoArgs]),
            self.command("/playlists", "List the bot's playlists.", &[NoArgs]),
            self.command("/plclear", "Remove every song from the active playlist.", &[AdminOrModerator, NoArgs]),
            self.command("/plcreate", "Create a new playlist.", &[SingleArg]).with_usage("/plcreate <playlist>"),
            self.command("/pldelete", "Delete a playlist.", &[SingleArg]).with_usage("/pldelete <playlist>"),
            self.command("/pllist", "Show the first songs of the active playlist.", &[NoArgs]),
            self.command("/plload", "Replace a playlist with a locally configured one.", &[AdminOrModerator, SingleArg])
                .with_usage("/plload <local playlist>"),
            self.command("/plshuffle", "Move random songs to the front of the active playlist.", &[NoArgs]),
            self.command("/plskip", "Send the next song to the back of the active playlist.", &[NoArgs]),
            self.command("/plswitch", "Switch to another playlist.", &[SingleArg]).with_usage("/plswitch <playlist>"),
            self.command("/plupdate", "Add a room's recent songs to the playlist named after it.", &[SingleArg])
                .with_usage("/plupdate <room shortcut>"),
        ]
    }

    fn on_load(&mut self, ctx: &mut PluginContext<'_>) -> Result<(), BotError> {
        if ctx.session.room.room_id.is_some() {
            self.track(ctx, Action::RoomInfo { room_id: None }, Pending::RoomInfo)?;
        }
        Ok(())
    }

    fn on_event(&mut self, event: &RoomEvent, ctx: &mut PluginContext<'_>) -> Result<(), BotError> {
        match event {
            RoomEvent::RoomChanged(_) => self.room_init(ctx),
            _ => Ok(()),
        }
    }

    fn on_command(
        &mut self,
        command: &str,
        args: &str,
        message: &ChatMessage,
        ctx: &mut PluginContext<'_>,
    ) -> Result<(), BotError> {
        match command {
            "/pladd" => self.add_current_song(message, ctx),
            "/plavailable" => self.available(message, ctx),
            "/playlists" => self.track(
                ctx,
                Action::PlaylistListAll,
                Pending::ListAll {
                    reply_to: message.clone(),
                },
            ),
            "/plclear" => self.clear(message, ctx),
            "/plcreate" => self.track(
                ctx,
                Action::PlaylistCreate {
                    playlist: args.to_string(),
                },
                Pending::Create {
                    playlist: args.to_string(),
                    reply_to: message.clone(),
                },
            ),
            "/pldelete" => self.track(
                ctx,
                Action::PlaylistDelete {
                    playlist: args.to_string(),
                },
                Pending::Delete {
                    playlist: args.to_string(),
                    reply_to: message.clone(),
                },
            ),
            "/pllist" => {
                let Some(active) = self.require_active(message, ctx)? else {
                    return Ok(());
                };
                self.track(
                    ctx,
                    Action::PlaylistAll {
                        playlist: active.clone(),
                    },
                    Pending::Listing {
                        playlist: active,
                        reply_to: message.clone(),
                    },
                )
            }
            "/plload" => self.load(args, message, ctx),
            "/plshuffle" => self.shuffle(message, ctx),
            "/plskip" => self.skip_next(message, ctx),
            "/plswitch" => self.switch(args, message, ctx),
            "/plupdate" => self.update(args, message, ctx),
            other => Err(CommandError::NotFound(other.to_string()).into()),
        }
    }

    fn on_response(&mut self, id: CallId, response: &ApiResponse, ctx: &mut PluginContext<'_>) -> Result<(), BotError> {
        match self.pending.remove(&id) {
            Some(pending) => self.handle_response(pending, response, ctx),
            None => {
                warn!("{} has no pending request {}", self.name, id);
                Ok(())
            }
        }
    }
}
