use std::collections::HashMap;
use std::sync::Arc;

use crate::application::errors::{BotError, PluginError};
use crate::application::messaging::middleware::{Context, Middleware, MiddlewareChain, MiddlewareError, Next};
use crate::application::messaging::parser::ParsedCommand;
use crate::domain::entities::{ChatMessage, Command, CommandOwner, CommandRegistry, Guard, Session};

/// Outcome of routing a parsed command through its guards
#[derive(Debug, Clone)]
pub enum Route {
    /// Not a bound command
    Unknown,
    /// A guard stopped it, optionally with a reply for the sender
    Blocked(Option<String>),
    /// Guards passed; run the owner's handler
    Run(Command),
}

/// Service for binding commands and checking their guards
pub struct CommandService {
    registry: CommandRegistry,
    chains: HashMap<String, Vec<Arc<dyn Middleware>>>,
}

impl CommandService {
    pub fn new() -> Self {
        let mut service = Self {
            registry: CommandRegistry::new(),
            chains: HashMap::new(),
        };
        service.register_builtins();
        service
    }

    fn bind(&mut self, command: Command) {
        let chain = MiddlewareChain::for_command(&command).build();
        let name = command.name.clone();
        if self.registry.try_register(command).is_ok() {
            self.chains.insert(name, chain);
        }
    }

    fn register_builtins(&mut self) {
        self.bind(
            Command::new("/about")
                .with_description("Display information about this bot.")
                .with_guard(Guard::NoArgs),
        );
        self.bind(
            Command::new("/commands")
                .with_description("List the available commands.")
                .with_guard(Guard::NoArgs),
        );
        self.bind(
            Command::new("/help")
                .with_description("With no arguments, display this message. Otherwise, display the help for the given command.")
                .with_usage("/help [command]"),
        );
        self.bind(
            Command::new("/reload")
                .with_description("Reload the specified plugin.")
                .with_usage("/reload <plugin>")
                .with_guard(Guard::Moderator)
                .with_guard(Guard::SingleArg),
        );
    }

    /// Bind every command of `plugin`, or none of them when one is taken
    pub fn register_plugin(&mut self, plugin: &str, commands: Vec<Command>) -> Result<(), PluginError> {
        for command in &commands {
            if let Some(existing) = self.registry.get(&command.name) {
                return Err(match &existing.owner {
                    CommandOwner::Builtin => PluginError::ReservedCommand {
                        plugin: plugin.to_string(),
                        command: command.name.clone(),
                    },
                    CommandOwner::Plugin(other) => PluginError::CommandConflict {
                        plugin: plugin.to_string(),
                        other: other.clone(),
                        command: command.name.clone(),
                    },
                });
            }
        }

        for command in commands {
            self.bind(command.owned_by(CommandOwner::Plugin(plugin.to_string())));
        }
        Ok(())
    }

    /// Drop the commands bound to `plugin`
    pub fn unregister_plugin(&mut self, plugin: &str) -> usize {
        let removed = self
            .registry
            .remove_owned_by(&CommandOwner::Plugin(plugin.to_string()));
        let registry = &self.registry;
        self.chains.retain(|name, _| registry.contains(name));
        removed
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.registry.get(name)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Run the command's guards for this sender
    pub fn route(&self, parsed: &ParsedCommand, message: &ChatMessage, session: &Session) -> Result<Route, BotError> {
        let (Some(command), Some(chain)) = (self.registry.get(&parsed.name), self.chains.get(&parsed.name)) else {
            return Ok(Route::Unknown);
        };

        let ctx = Context::new(&parsed.name, &parsed.args, message, session);
        match Next::new(chain.clone()).run(ctx) {
            Ok(_) => Ok(Route::Run(command.clone())),
            Err(MiddlewareError::Blocked(reply)) => Ok(Route::Blocked(reply)),
            Err(MiddlewareError::Internal(msg)) => Err(BotError::Internal(msg)),
        }
    }

    /// Whether the sender would get past the command's permission guards
    pub fn visible_to(command: &Command, sender_id: &str, session: &Session) -> bool {
        command.guards.iter().all(|guard| match guard {
            Guard::Moderator => session.is_moderator(sender_id),
            Guard::AdminOrModerator => session.is_moderator(sender_id) || session.is_admin(sender_id),
            Guard::NoArgs | Guard::SingleArg => true,
        })
    }

    pub fn about(&self) -> String {
        format!(
            "I am powered by {} version {}.",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        )
    }

    /// Sorted list of the commands the sender may use
    pub fn listing(&self, sender_id: &str, session: &Session) -> String {
        let mut names: Vec<&str> = self
            .registry
            .all()
            .filter(|c| Self::visible_to(c, sender_id, session))
            .map(|c| c.name.as_str())
            .collect();
        names.sort_unstable();
        format!("Available commands: {}", names.join(", "))
    }

    /// Help text for `topic`; `None` when the sender may not see that command
    pub fn help(&self, topic: &str, sender_id: &str, session: &Session) -> Option<String> {
        let topic = if topic.is_empty() { "/help" } else { topic };
        match self.registry.get(topic) {
            Some(command) if !Self::visible_to(command, sender_id, session) => None,
            Some(command) => Some(
                command
                    .description
                    .clone()
                    .unwrap_or_else(|| "No description".to_string()),
            ),
            None => Some(format!("`{}` is not a valid command.", topic)),
        }
    }
}

impl Default for CommandService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::messaging::MessageParser;

    fn plugin_command(name: &str) -> Command {
        Command::new(name).with_description(format!("Does {}", name))
    }

    fn route(service: &CommandService, text: &str, sender: &str, session: &Session) -> Route {
        let parsed = MessageParser::new().parse(text).unwrap();
        let message = ChatMessage::from_room(sender, text);
        service.route(&parsed, &message, session).unwrap()
    }

    #[test]
    fn test_reserved_commands_are_bound() {
        let service = CommandService::new();
        for name in ["/about", "/commands", "/help", "/reload"] {
            assert_eq!(service.get(name).unwrap().owner, CommandOwner::Builtin);
        }
    }

    #[test]
    fn test_conflicting_plugin_is_rejected_whole() {
        let mut service = CommandService::new();
        service
            .register_plugin("a.One", vec![plugin_command("/skip")])
            .unwrap();

        let err = service
            .register_plugin("b.Two", vec![plugin_command("/other"), plugin_command("/skip")])
            .unwrap_err();
        assert_eq!(err.to_string(), "`b.Two` conflicts with `a.One` for command `/skip`.");
        assert!(service.get("/other").is_none());
        assert_eq!(
            service.get("/skip").unwrap().owner,
            CommandOwner::Plugin("a.One".into())
        );
    }

    #[test]
    fn test_reserved_command_collision() {
        let mut service = CommandService::new();
        let err = service
            .register_plugin("a.One", vec![plugin_command("/help")])
            .unwrap_err();
        assert!(matches!(err, PluginError::ReservedCommand { .. }));
    }

    #[test]
    fn test_unregister_drops_only_that_plugin() {
        let mut service = CommandService::new();
        service.register_plugin("a.One", vec![plugin_command("/x")]).unwrap();
        service.register_plugin("b.Two", vec![plugin_command("/y")]).unwrap();

        assert_eq!(service.unregister_plugin("a.One"), 1);
        assert!(service.get("/x").is_none());
        assert!(service.get("/y").is_some());

        let session = Session::new("bot");
        assert!(matches!(route(&service, "/x", "u", &session), Route::Unknown));
    }

    #[test]
    fn test_listing_hides_privileged_commands() {
        let mut session = Session::new("bot");
        session.moderator_ids.insert("mod".into());
        let service = CommandService::new();

        assert_eq!(
            service.listing("guest", &session),
            "Available commands: /about, /commands, /help"
        );
        assert_eq!(
            service.listing("mod", &session),
            "Available commands: /about, /commands, /help, /reload"
        );
        assert_eq!(service.listing("guest", &session), service.listing("guest", &session));
    }

    #[test]
    fn test_help() {
        let session = Session::new("bot");
        let service = CommandService::new();

        assert!(service.help("", "u", &session).unwrap().starts_with("With no arguments"));
        assert_eq!(
            service.help("/about", "u", &session).as_deref(),
            Some("Display information about this bot.")
        );
        assert_eq!(service.help("/reload", "u", &session), None);
        assert_eq!(
            service.help("/nope", "u", &session).as_deref(),
            Some("`/nope` is not a valid command.")
        );
    }

    #[test]
    fn test_route_applies_guards() {
        let session = Session::new("bot");
        let service = CommandService::new();

        assert!(matches!(route(&service, "/about", "u", &session), Route::Run(_)));
        assert!(matches!(route(&service, "/about me", "u", &session), Route::Blocked(None)));
        assert!(matches!(route(&service, "/unknown", "u", &session), Route::Unknown));
        assert!(matches!(route(&service, "/reload botdj.Dj", "u", &session), Route::Blocked(None)));
    }
}
