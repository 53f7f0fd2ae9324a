//! DJ control - decides when the bot joins or leaves the DJ table

use tracing::info;

use super::trait_def::{Plugin, PluginContext};
use crate::application::errors::{BotError, CommandError};
use crate::domain::entities::{Action, ChatMessage, Command, CommandOwner, Guard, RoomEvent, Session};

/// True when the bot holds a seat it should give up
pub fn should_step_down(session: &Session) -> bool {
    let Some(max_djs) = session.max_djs else {
        return false;
    };
    session.is_dj() && (session.listener_ids.len() <= 1 || session.dj_ids.len() >= max_djs)
}

/// True when the bot should take a free seat
pub fn should_step_up(session: &Session) -> bool {
    let Some(max_djs) = session.max_djs else {
        return false;
    };
    !session.is_dj()
        && session.listener_ids.len() > 1
        && session.dj_ids.len() < max_djs.saturating_sub(1).min(2)
}

/// Keeps a seat warm at the DJ table and answers manual DJ commands
pub struct Dj {
    name: String,
    end_song_step_down: bool,
    auto_skip: bool,
}

impl Dj {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            end_song_step_down: false,
            auto_skip: false,
        }
    }

    pub fn auto_skip(&self) -> bool {
        self.auto_skip
    }

    pub fn step_down_pending(&self) -> bool {
        self.end_song_step_down
    }

    fn owner(&self) -> CommandOwner {
        CommandOwner::Plugin(self.name.clone())
    }

    /// Membership changed: maybe move to or from the table
    fn dj_update(&mut self, event: &RoomEvent, ctx: &mut PluginContext<'_>) -> Result<(), BotError> {
        let session = ctx.session;
        if event.users().iter().any(|u| u.id == session.bot_id) {
            if matches!(event, RoomEvent::RemDj { .. }) {
                self.auto_skip = false;
            }
            return Ok(());
        }

        if should_step_down(session) {
            if session.is_playing() {
                self.end_song_step_down = true;
            } else {
                info!("Leaving the table");
                ctx.send(Action::RemDj)?;
            }
        } else if should_step_up(session) {
            info!("Stepping up to dj");
            ctx.send(Action::AddDj)?;
        }
        Ok(())
    }

    fn end_song(&mut self, ctx: &mut PluginContext<'_>) -> Result<(), BotError> {
        if self.end_song_step_down {
            self.end_song_step_down = false;
            if should_step_down(ctx.session) {
                info!("Delayed leaving the table");
                ctx.send(Action::RemDj)?;
            }
        }
        Ok(())
    }

    fn new_song(&mut self, ctx: &mut PluginContext<'_>) -> Result<(), BotError> {
        let session = ctx.session;
        if session.is_playing() && self.auto_skip && session.dj_ids.len() > 1 {
            ctx.send(Action::Skip)?;
        }
        Ok(())
    }

    fn toggle_auto_skip(&mut self, message: &ChatMessage, ctx: &mut PluginContext<'_>) -> Result<(), BotError> {
        self.auto_skip = !self.auto_skip;
        if self.auto_skip {
            ctx.reply("I'll just keep this seat warm for you.", message)?;
            if ctx.session.is_playing() && ctx.session.dj_ids.len() > 1 {
                ctx.send(Action::Skip)?;
            }
        } else {
            ctx.reply("I'm back baby!", message)?;
        }
        Ok(())
    }

    fn play(&mut self, message: &ChatMessage, ctx: &mut PluginContext<'_>) -> Result<(), BotError> {
        let session = ctx.session;
        if session.is_dj() {
            return ctx.reply("I am already a dj.", message);
        }
        match session.max_djs {
            Some(max_djs) if session.dj_ids.len() < max_djs => ctx.send(Action::AddDj),
            _ => ctx.reply("I cannot do that right now.", message),
        }
    }

    fn stop(&mut self, message: &ChatMessage, ctx: &mut PluginContext<'_>) -> Result<(), BotError> {
        if !ctx.session.is_dj() {
            return ctx.reply("I am not currently dj-ing.", message);
        }
        ctx.send(Action::RemDj)
    }

    fn skip_song(&mut self, message: &ChatMessage, ctx: &mut PluginContext<'_>) -> Result<(), BotError> {
        if !ctx.session.is_playing() {
            return ctx.reply("I am not currently playing.", message);
        }
        ctx.send(Action::Skip)?;
        ctx.reply(":poop: I was just getting into it.", message)
    }
}

impl Plugin for Dj {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Controls whether or not the bot is dj-ing"
    }

    fn commands(&self) -> Vec<Command> {
        vec![
            Command::new("/autoskip")
                .with_description("Toggle whether the bot should play anything.")
                .with_guard(Guard::NoArgs)
                .owned_by(self.owner()),
            Command::new("/djdown")
                .with_description("Have the bot step down as a dj.")
                .with_guard(Guard::AdminOrModerator)
                .with_guard(Guard::NoArgs)
                .owned_by(self.owner()),
            Command::new("/djup")
                .with_description("Attempt to have the bot dj.")
                .with_guard(Guard::AdminOrModerator)
                .with_guard(Guard::NoArgs)
                .owned_by(self.owner()),
            Command::new("/skip")
                .with_description("Ask the bot to skip the current song.")
                .with_guard(Guard::NoArgs)
                .owned_by(self.owner()),
        ]
    }

    fn on_event(&mut self, event: &RoomEvent, ctx: &mut PluginContext<'_>) -> Result<(), BotError> {
        match event {
            RoomEvent::AddDj { .. }
            | RoomEvent::RemDj { .. }
            | RoomEvent::Registered { .. }
            | RoomEvent::Deregistered { .. } => self.dj_update(event, ctx),
            RoomEvent::EndSong {} => self.end_song(ctx),
            RoomEvent::NewSong { .. } => self.new_song(ctx),
            _ => Ok(()),
        }
    }

    fn on_command(
        &mut self,
        command: &str,
        _args: &str,
        message: &ChatMessage,
        ctx: &mut PluginContext<'_>,
    ) -> Result<(), BotError> {
        match command {
            "/autoskip" => self.toggle_auto_skip(message, ctx),
            "/djdown" => self.stop(message, ctx),
            "/djup" => self.play(message, ctx),
            "/skip" => self.skip_song(message, ctx),
            other => Err(CommandError::NotFound(other.to_string()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::RoomApi;
    use crate::domain::entities::{RoomDetails, User};
    use crate::infrastructure::adapters::memory::MemoryAdapter;
    use crate::infrastructure::config::{Config, DEFAULT_SECTION};
    use std::sync::Arc;

    struct Harness {
        session: Session,
        config: Config,
        client: Arc<MemoryAdapter>,
        api: RoomApi,
        dj: Dj,
    }

    impl Harness {
        fn new(listeners: &[&str], djs: &[&str], max_djs: usize) -> Self {
            let mut session = Session::new("bot");
            session.listener_ids = listeners.iter().map(|s| s.to_string()).collect();
            session.dj_ids = djs.iter().map(|s| s.to_string()).collect();
            session.max_djs = Some(max_djs);
            let client = Arc::new(MemoryAdapter::new("bot"));
            let config = Config::from_yaml_str(
                "DEFAULT: {auth_id: a, user_id: bot, room_id: r, plugins: botdj.Dj}",
                DEFAULT_SECTION,
            )
            .unwrap();
            Self {
                session,
                config,
                api: RoomApi::new(client.clone()),
                client,
                dj: Dj::new("botdj.Dj"),
            }
        }

        fn event(&mut self, event: RoomEvent) {
            self.session.apply(&event).unwrap();
            let mut ctx = PluginContext::new(&self.session, &self.config, &mut self.api, "botdj.Dj");
            self.dj.on_event(&event, &mut ctx).unwrap();
        }

        fn command(&mut self, command: &str) {
            let message = ChatMessage::from_room("mod", command);
            let mut ctx = PluginContext::new(&self.session, &self.config, &mut self.api, "botdj.Dj");
            self.dj.on_command(command, "", &message, &mut ctx).unwrap();
        }

        fn playing(&mut self, dj: &str) {
            let mut room = RoomDetails::default();
            room.metadata.current_dj = Some(dj.to_string());
            self.session.apply(&RoomEvent::NewSong { room }).unwrap();
        }
    }

    fn join(id: &str) -> RoomEvent {
        RoomEvent::Registered { user: vec![User::new(id)] }
    }

    #[test]
    fn test_thresholds_are_mutually_exclusive() {
        for max_djs in 2..=6 {
            for listeners in 0..=4 {
                for djs in 0..=max_djs {
                    for bot_is_dj in [false, true] {
                        let mut session = Session::new("bot");
                        session.max_djs = Some(max_djs);
                        session.listener_ids = (0..listeners).map(|i| format!("l{}", i)).collect();
                        session.dj_ids = (0..djs).map(|i| format!("d{}", i)).collect();
                        if bot_is_dj {
                            session.dj_ids.insert("bot".to_string());
                        }
                        assert!(!(should_step_down(&session) && should_step_up(&session)));
                    }
                }
            }
        }
    }

    #[test]
    fn test_steps_up_when_room_fills() {
        let mut h = Harness::new(&["bot"], &[], 5);
        h.event(join("alice"));
        assert_eq!(h.client.actions(), vec![Action::AddDj]);
    }

    #[test]
    fn test_ignores_events_about_itself() {
        let mut h = Harness::new(&["alice"], &[], 5);
        h.event(join("bot"));
        assert!(h.client.actions().is_empty());
    }

    #[test]
    fn test_step_down_waits_for_end_of_song() {
        let mut h = Harness::new(&["bot", "alice"], &["bot"], 5);
        h.playing("bot");

        h.event(RoomEvent::Deregistered { user: vec![User::new("alice")] });
        assert!(h.dj.step_down_pending());
        assert!(h.client.actions().is_empty());

        h.event(RoomEvent::EndSong {});
        assert!(!h.dj.step_down_pending());
        assert_eq!(h.client.actions(), vec![Action::RemDj]);
    }

    #[test]
    fn test_djup_when_table_is_full() {
        let mut h = Harness::new(&["bot", "a", "b"], &["a", "b"], 2);
        h.command("/djup");
        assert_eq!(h.client.replies(), vec!["I cannot do that right now."]);
    }

    #[test]
    fn test_djdown_when_not_a_dj() {
        let mut h = Harness::new(&["bot", "a"], &[], 5);
        h.command("/djdown");
        assert_eq!(h.client.replies(), vec!["I am not currently dj-ing."]);
    }

    #[test]
    fn test_autoskip_skips_current_track() {
        let mut h = Harness::new(&["bot", "a"], &["bot", "a"], 5);
        h.playing("bot");

        h.command("/autoskip");
        assert!(h.dj.auto_skip());
        assert!(h.client.actions().contains(&Action::Skip));

        h.client.clear();
        h.command("/autoskip");
        assert!(!h.dj.auto_skip());
        assert_eq!(h.client.replies(), vec!["I'm back baby!"]);
        assert!(!h.client.actions().contains(&Action::Skip));
    }

    #[test]
    fn test_removal_from_table_resets_autoskip() {
        let mut h = Harness::new(&["bot", "a"], &["bot"], 5);
        h.command("/autoskip");
        h.event(RoomEvent::RemDj { user: vec![User::new("bot")] });
        assert!(!h.dj.auto_skip());
    }
}
