//! Plugin trait definitions

use crate::application::errors::BotError;
use crate::application::services::RoomApi;
use crate::domain::entities::{Action, ApiResponse, CallId, ChatMessage, Command, RoomEvent, Session};
use crate::infrastructure::config::Config;

/// What a plugin may touch while one of its hooks runs
pub struct PluginContext<'a> {
    pub session: &'a Session,
    pub config: &'a Config,
    api: &'a mut RoomApi,
    owner: &'a str,
}

impl<'a> PluginContext<'a> {
    pub fn new(session: &'a Session, config: &'a Config, api: &'a mut RoomApi, owner: &'a str) -> Self {
        Self {
            session,
            config,
            api,
            owner,
        }
    }

    /// Reference name of the plugin being called
    pub fn owner(&self) -> &str {
        self.owner
    }

    pub fn reply(&self, text: impl Into<String>, to: &ChatMessage) -> Result<(), BotError> {
        self.api.reply(text, to)
    }

    /// Fire-and-forget action
    pub fn send(&self, action: Action) -> Result<(), BotError> {
        self.api.send(action)
    }

    /// Action whose response comes back through [`Plugin::on_response`]
    pub fn call(&mut self, action: Action) -> Result<CallId, BotError> {
        self.api.call(self.owner, action)
    }
}

/// Core plugin trait that all plugins must implement
pub trait Plugin: Send {
    /// Reference name the plugin was loaded under
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// Commands this plugin wants bound; guards are applied by the bot
    fn commands(&self) -> Vec<Command> {
        Vec::new()
    }

    /// Called once after the plugin's commands were registered
    fn on_load(&mut self, _ctx: &mut PluginContext<'_>) -> Result<(), BotError> {
        Ok(())
    }

    /// Called for every room event, after the session has been updated
    fn on_event(&mut self, _event: &RoomEvent, _ctx: &mut PluginContext<'_>) -> Result<(), BotError> {
        Ok(())
    }

    /// Called for one of this plugin's commands once its guards passed
    fn on_command(
        &mut self,
        command: &str,
        args: &str,
        message: &ChatMessage,
        ctx: &mut PluginContext<'_>,
    ) -> Result<(), BotError>;

    /// Called with the answer to a request issued through [`PluginContext::call`]
    fn on_response(
        &mut self,
        _id: CallId,
        _response: &ApiResponse,
        _ctx: &mut PluginContext<'_>,
    ) -> Result<(), BotError> {
        Ok(())
    }
}
