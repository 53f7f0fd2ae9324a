//! Room session integration tests
//! Run with: cargo test --test room_session_test

use std::sync::{Arc, Once};

use serde_json::json;

use lazysusan_bot::application::errors::BotError;
use lazysusan_bot::application::messaging::EventDispatcher;
use lazysusan_bot::domain::entities::{Action, ApiResponse, ChatMessage, Command, RoomEvent};
use lazysusan_bot::domain::traits::Inbound;
use lazysusan_bot::infrastructure::adapters::MemoryAdapter;
use lazysusan_bot::infrastructure::config::{Config, DEFAULT_SECTION};
use lazysusan_bot::plugins::{plugin_factory, Plugin, PluginContext, PluginRegistry};

static INIT: Once = Once::new();

fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Test plugin claiming `/skip`, like the bundled DJ plugin does
struct Skipper {
    name: String,
}

impl Plugin for Skipper {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Skips"
    }

    fn commands(&self) -> Vec<Command> {
        vec![Command::new("/skip"), Command::new("/hop")]
    }

    fn on_command(&mut self, _: &str, _: &str, message: &ChatMessage, ctx: &mut PluginContext<'_>) -> Result<(), BotError> {
        ctx.reply("hop", message)
    }
}

struct Room {
    dispatcher: EventDispatcher,
    client: Arc<MemoryAdapter>,
}

impl Room {
    fn new(plugins: &str) -> Self {
        ensure_init();
        let config = Config::from_yaml_str(
            &format!(
                "DEFAULT:\n  auth_id: a\n  user_id: bot\n  room_id: r1\n  plugins: {}\n",
                plugins
            ),
            DEFAULT_SECTION,
        )
        .unwrap();

        let mut registry = PluginRegistry::with_bundled();
        registry.register_user("extra", "Skipper", plugin_factory(|name| Skipper { name: name.into() }));

        let client = Arc::new(MemoryAdapter::new("bot"));
        let mut dispatcher = EventDispatcher::new(config, client.clone(), registry);
        dispatcher.load_plugins();

        let mut room = Self { dispatcher, client };
        room.event(json!({"command": "ready"}));
        room.respond(json!({"success": true, "name": "susan"}));
        room.client.clear();
        room
    }

    fn event(&mut self, value: serde_json::Value) {
        let event = RoomEvent::from_value(value).unwrap();
        self.dispatcher.dispatch(Inbound::Event(event));
    }

    fn say(&mut self, user: &str, text: &str) {
        self.event(json!({"command": "speak", "userid": user, "name": user, "text": text}));
    }

    /// Answer the latest request that expects a response
    fn respond(&mut self, body: serde_json::Value) -> Action {
        let (id, action) = self.client.last_call().expect("no outstanding request");
        self.dispatcher.dispatch(Inbound::Response {
            id,
            body: ApiResponse::new(body),
        });
        action
    }

    fn enter(&mut self, users: &[&str], djs: &[&str], max_djs: usize, moderators: &[&str]) {
        let users: Vec<_> = users.iter().map(|u| json!({"userid": u})).collect();
        self.event(json!({
            "command": "roomChanged",
            "room": {
                "roomid": "r1",
                "chatserver": ["chat1", 80],
                "metadata": {"djs": djs, "max_djs": max_djs, "moderator_id": moderators}
            },
            "users": users
        }));
    }
}

#[test]
fn test_membership_follows_snapshot_and_events() {
    let mut room = Room::new("botdj.Dj");
    room.enter(&["bot", "a", "b"], &["a"], 5, &["m"]);

    room.event(json!({"command": "registered", "user": [{"userid": "c"}]}));
    room.event(json!({"command": "deregistered", "user": [{"userid": "a"}]}));
    room.event(json!({"command": "add_dj", "user": [{"userid": "c"}]}));
    room.event(json!({"command": "new_moderator", "userid": "c"}));
    room.event(json!({"command": "rem_moderator", "userid": "m"}));

    let session = room.dispatcher.session();
    let mut listeners: Vec<_> = session.listener_ids.iter().cloned().collect();
    listeners.sort();
    let mut djs: Vec<_> = session.dj_ids.iter().cloned().collect();
    djs.sort();
    assert_eq!(listeners, vec!["b", "bot", "c"]);
    // A dj leaving the room keeps its seat until rem_dj arrives
    assert_eq!(djs, vec!["a", "c"]);
    assert!(session.is_moderator("c"));
    assert!(!session.is_moderator("m"));

    // A fresh snapshot wins over everything seen before
    room.enter(&["bot", "z"], &[], 3, &[]);
    let session = room.dispatcher.session();
    assert_eq!(session.listener_ids.len(), 2);
    assert!(session.dj_ids.is_empty());
    assert_eq!(session.max_djs, Some(3));
}

#[test]
fn test_colliding_plugin_is_rejected_and_first_stays() {
    let mut room = Room::new("[botdj.Dj, extra.Skipper]");
    assert_eq!(room.dispatcher.plugins().names(), vec!["botdj.Dj"]);
    assert!(room.dispatcher.commands().get("/hop").is_none());

    room.enter(&["bot", "a"], &["bot", "a"], 5, &[]);
    room.event(json!({
        "command": "newsong",
        "room": {"metadata": {"current_dj": "bot", "current_song": {"_id": "s1"}}}
    }));
    room.client.clear();

    room.say("a", "/skip");
    assert_eq!(room.client.replies(), vec![":poop: I was just getting into it."]);
}

#[test]
fn test_commands_listing_is_stable() {
    let mut room = Room::new("[botdj.Dj, botdj.Playlist]");
    room.say("a", "/commands");
    room.say("a", "/commands");

    let replies = room.client.replies();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0], replies[1]);
    assert_eq!(
        replies[0],
        "Available commands: /about, /autoskip, /commands, /help, /pladd, /playlists, \
         /plcreate, /pldelete, /pllist, /plshuffle, /plskip, /plswitch, /plupdate, /skip"
    );
}

#[test]
fn test_bot_steps_up_when_someone_joins() {
    let mut room = Room::new("botdj.Dj");
    room.enter(&["bot"], &[], 5, &[]);
    assert!(room.client.actions().is_empty());

    room.event(json!({"command": "registered", "user": [{"userid": "alice"}]}));
    assert_eq!(room.client.actions(), vec![Action::AddDj]);

    // The server echoes the bot's own seat; that alone changes nothing
    room.client.clear();
    room.event(json!({"command": "add_dj", "user": [{"userid": "bot"}]}));
    assert!(room.client.actions().is_empty());
    assert!(room.dispatcher.session().is_dj());
}

#[test]
fn test_clear_default_playlist_through_dispatcher() {
    let mut room = Room::new("botdj.Playlist");
    room.enter(&["bot", "m"], &[], 5, &["m"]);

    // Directory crawl and playlist discovery both answer
    room.respond(json!({"success": true, "rooms": []}));
    let (id, action) = room
        .client
        .requests()
        .into_iter()
        .find_map(|r| r.id.filter(|_| r.action == Action::PlaylistListAll).map(|id| (id, r.action)))
        .unwrap();
    assert_eq!(action, Action::PlaylistListAll);
    room.dispatcher.dispatch(Inbound::Response {
        id,
        body: ApiResponse::new(json!({"success": true, "list": [{"name": "default", "active": true}]})),
    });
    assert_eq!(
        room.respond(json!({"success": true, "list": [{"_id": "a"}, {"_id": "b"}, {"_id": "c"}]})),
        Action::PlaylistAll { playlist: "default".into() }
    );
    room.client.clear();

    room.say("m", "/plclear");
    for id in ["a", "b", "c"] {
        room.respond(json!({"success": true, "song_dict": [{"fileid": id}]}));
    }

    assert_eq!(room.client.replies(), vec!["Cleared playlist default."]);
    assert_eq!(room.dispatcher.pending_requests(), 0);

    room.client.clear();
    room.say("m", "/plclear");
    assert_eq!(room.client.replies(), vec!["The playlist is already empty."]);
}

#[test]
fn test_update_adds_least_popular_first() {
    let mut room = Room::new("botdj.Playlist");
    room.enter(&["bot", "m"], &[], 5, &["m"]);

    room.respond(json!({"success": true, "rooms": [
        [{"roomid": "r9", "shortcut": "indie", "chatserver": ["chat1", 80], "metadata": {"listeners": 40}}, []]
    ]}));
    room.respond(json!({"success": true, "rooms": []}));
    room.client.clear();

    room.say("m", "/plupdate indie");
    assert_eq!(room.client.replies(), vec!["Querying indie (r9)"]);

    room.respond(json!({"success": true, "room": {"roomid": "r9", "metadata": {"songlog": [
        {"_id": "A", "score": 5},
        {"_id": "B", "score": 1},
        {"_id": "C", "score": 3}
    ]}}}));
    room.respond(json!({"success": true}));
    room.respond(json!({"success": true}));
    room.respond(json!({"success": true, "list": []}));

    let mut added = Vec::new();
    loop {
        let action = room.respond(json!({"success": true}));
        match action {
            Action::PlaylistAdd { song_id, index, .. } => {
                assert_eq!(index, 0);
                added.push(song_id);
            }
            other => panic!("unexpected {:?}", other),
        }
        if added.len() == 3 {
            break;
        }
    }
    assert_eq!(added, vec!["B", "C", "A"]);
    assert_eq!(room.client.replies().last().map(String::as_str), Some("Added 3 songs"));
}

#[test]
fn test_unknown_events_and_commands_are_ignored() {
    let mut room = Room::new("botdj.Dj");
    room.event(json!({"command": "snagged", "userid": "a"}));
    room.say("a", "/nothing here");
    room.say("a", "just chatting");
    assert!(room.client.actions().is_empty());
}
