//! Event dispatcher - Routes room events and responses to the core and plugins

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::parser::MessageParser;
use crate::application::errors::{BotError, CommandError};
use crate::application::services::{CommandService, RoomApi, Route, CORE_OWNER};
use crate::domain::entities::{Action, ApiResponse, CallId, ChatMessage, CommandOwner, RoomEvent, Session};
use crate::domain::traits::{Inbound, RoomClient};
use crate::infrastructure::config::Config;
use crate::plugins::{LoadedPlugin, PluginContext, PluginManager, PluginRegistry};

/// Owns all bot state and handles one inbound item at a time
pub struct EventDispatcher {
    session: Session,
    config: Config,
    api: RoomApi,
    commands: CommandService,
    plugins: PluginManager,
    registry: PluginRegistry,
    parser: MessageParser,
}

impl EventDispatcher {
    pub fn new(config: Config, client: Arc<dyn RoomClient>, registry: PluginRegistry) -> Self {
        let session = Session::new(client.bot_id()).with_admins(config.admin_ids());
        Self {
            session,
            config,
            api: RoomApi::new(client),
            commands: CommandService::new(),
            plugins: PluginManager::new(),
            registry,
            parser: MessageParser::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn commands(&self) -> &CommandService {
        &self.commands
    }

    pub fn plugins(&self) -> &PluginManager {
        &self.plugins
    }

    pub fn pending_requests(&self) -> usize {
        self.api.pending_count()
    }

    /// Load every configured plugin; failures are reported and skipped
    pub fn load_plugins(&mut self) -> usize {
        let mut loaded = 0;
        for reference in self.config.plugins() {
            match self.load_plugin(&reference) {
                Ok(()) => loaded += 1,
                Err(e) => error!("{}", e),
            }
        }
        loaded
    }

    pub fn load_plugin(&mut self, reference: &str) -> Result<(), BotError> {
        let loaded = self.plugins.load(reference, &self.registry, &mut self.commands)?;
        Self::notify_loaded(loaded, &self.session, &self.config, &mut self.api)
    }

    fn notify_loaded(
        loaded: &mut LoadedPlugin,
        session: &Session,
        config: &Config,
        api: &mut RoomApi,
    ) -> Result<(), BotError> {
        let LoadedPlugin { name, plugin, .. } = loaded;
        let mut ctx = PluginContext::new(session, config, api, name);
        plugin.on_load(&mut ctx)
    }

    /// Handle one inbound item; errors never escape
    pub fn dispatch(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Event(event) => self.handle_event(event),
            Inbound::Response { id, body } => self.handle_response(id, body),
        }
    }

    fn handle_event(&mut self, event: RoomEvent) {
        debug!("<- {}", event.name());
        if let Err(e) = self.core_event(&event) {
            error!("Error handling {}: {}", event.name(), e);
        }

        for loaded in self.plugins.iter_mut() {
            let LoadedPlugin { name, plugin, .. } = loaded;
            let mut ctx = PluginContext::new(&self.session, &self.config, &mut self.api, name);
            if let Err(e) = plugin.on_event(&event, &mut ctx) {
                error!("{} failed on {}: {}", name, event.name(), e);
            }
        }
    }

    /// Session bookkeeping, run before any plugin sees the event
    fn core_event(&mut self, event: &RoomEvent) -> Result<(), BotError> {
        self.session.apply(event)?;
        match event {
            RoomEvent::Ready {} => {
                self.api.call(CORE_OWNER, Action::UserInfo)?;
            }
            RoomEvent::Speak { userid, name, .. } => {
                let from_bot = *userid == self.session.bot_id
                    || self.session.username.as_deref() == Some(name.as_str());
                if self.session.username.is_some() && !from_bot {
                    if let Some(message) = event.chat_message() {
                        self.process_message(message)?;
                    }
                }
            }
            RoomEvent::Pmmed { .. } => {
                if let Some(message) = event.chat_message() {
                    self.process_message(message)?;
                }
            }
            RoomEvent::Unknown => debug!("Ignoring unknown event"),
            _ => {}
        }
        Ok(())
    }

    fn handle_response(&mut self, id: CallId, body: ApiResponse) {
        let Some(owner) = self.api.take_owner(id) else {
            warn!("Response {} matches no request", id);
            return;
        };

        if owner == CORE_OWNER {
            self.set_username(&body);
            return;
        }

        let Some(loaded) = self.plugins.get_mut(&owner) else {
            warn!("Response {} for {} which is no longer loaded", id, owner);
            return;
        };
        let LoadedPlugin { name, plugin, .. } = loaded;
        let mut ctx = PluginContext::new(&self.session, &self.config, &mut self.api, name);
        if let Err(e) = plugin.on_response(id, &body, &mut ctx) {
            error!("{} failed on response {}: {}", name, id, e);
        }
    }

    fn set_username(&mut self, body: &ApiResponse) {
        if !body.success() {
            error!("Could not fetch user info: {}", body.err());
            return;
        }
        match body.str("name") {
            Some(name) => {
                info!("Logged in as {}", name);
                self.session.username = Some(name.to_string());
            }
            None => warn!("User info carries no name"),
        }
    }

    /// Run a chat message through the command table
    fn process_message(&mut self, message: ChatMessage) -> Result<(), BotError> {
        let Some(parsed) = self.parser.parse(&message.text) else {
            return Ok(());
        };

        let command = match self.commands.route(&parsed, &message, &self.session)? {
            Route::Unknown => return Ok(()),
            Route::Blocked(None) => return Ok(()),
            Route::Blocked(Some(reply)) => return self.api.reply(reply, &message),
            Route::Run(command) => command,
        };

        match command.owner {
            CommandOwner::Builtin => self.run_builtin(&parsed.name, &parsed.args, &message),
            CommandOwner::Plugin(owner) => {
                let Some(loaded) = self.plugins.get_mut(&owner) else {
                    return Err(CommandError::NotFound(parsed.name).into());
                };
                let LoadedPlugin { name, plugin, .. } = loaded;
                let mut ctx = PluginContext::new(&self.session, &self.config, &mut self.api, name);
                plugin.on_command(&parsed.name, &parsed.args, &message, &mut ctx)
            }
        }
    }

    fn run_builtin(&mut self, command: &str, args: &str, message: &ChatMessage) -> Result<(), BotError> {
        let sender = message.sender_id.as_str();
        match command {
            "/about" => self.api.reply(self.commands.about(), message),
            "/commands" => self.api.reply(self.commands.listing(sender, &self.session), message),
            "/help" => match self.commands.help(args, sender, &self.session) {
                Some(text) => self.api.reply(text, message),
                None => Ok(()),
            },
            "/reload" => self.reload(args, message),
            other => Err(CommandError::NotFound(other.to_string()).into()),
        }
    }

    fn reload(&mut self, name: &str, message: &ChatMessage) -> Result<(), BotError> {
        match self.plugins.reload(name, &mut self.commands) {
            Ok(loaded) => {
                Self::notify_loaded(loaded, &self.session, &self.config, &mut self.api)?;
                self.api.reply(format!("Reloaded plugin {}.", name), message)
            }
            Err(e) => self.api.reply(e.to_string(), message),
        }
    }
}
