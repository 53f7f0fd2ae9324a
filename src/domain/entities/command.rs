use std::collections::HashMap;

/// Policy checked before a command handler runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Only runs when no argument was given
    NoArgs,
    /// Needs a non-blank argument, replies with usage otherwise
    SingleArg,
    /// Sender must be a room moderator
    Moderator,
    /// Sender must be a room moderator or a configured admin
    AdminOrModerator,
}

impl Guard {
    pub fn is_privileged(&self) -> bool {
        matches!(self, Guard::Moderator | Guard::AdminOrModerator)
    }
}

/// Who handles a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOwner {
    /// Reserved commands answered by the bot itself
    Builtin,
    /// A loaded plugin, by reference name
    Plugin(String),
}

/// Represents a bot command
#[derive(Debug, Clone)]
pub struct Command {
    pub name: String,
    pub description: Option<String>,
    pub usage: Option<String>,
    pub guards: Vec<Guard>,
    pub owner: CommandOwner,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            usage: None,
            guards: Vec::new(),
            owner: CommandOwner::Builtin,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    pub fn with_guard(mut self, guard: Guard) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn owned_by(mut self, owner: CommandOwner) -> Self {
        self.owner = owner;
        self
    }

    /// Whether non-moderators should see this command at all
    pub fn requires_moderator(&self) -> bool {
        self.guards.iter().any(Guard::is_privileged)
    }

    pub fn usage_hint(&self) -> String {
        match &self.usage {
            Some(usage) => format!("Usage: {}", usage),
            None => format!("Usage: {} <argument>", self.name),
        }
    }
}

/// Command registry keyed by the exact command token
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Command>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a command; on collision nothing changes and the existing binding is returned.
    pub fn try_register(&mut self, command: Command) -> Result<(), &Command> {
        if self.commands.contains_key(&command.name) {
            return Err(&self.commands[&command.name]);
        }
        self.commands.insert(command.name.clone(), command);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Drop every command bound to `owner`
    pub fn remove_owned_by(&mut self, owner: &CommandOwner) -> usize {
        let before = self.commands.len();
        self.commands.retain(|_, c| &c.owner != owner);
        before - self.commands.len()
    }

    pub fn all(&self) -> impl Iterator<Item = &Command> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
