//! Plugin manager - handles plugin lifecycle

use tracing::{info, warn};

use super::registry::{PluginFactory, PluginRegistry};
use super::trait_def::Plugin;
use crate::application::errors::PluginError;
use crate::application::services::CommandService;

/// A live plugin instance and the factory it came from
pub struct LoadedPlugin {
    pub name: String,
    pub plugin: Box<dyn Plugin>,
    factory: PluginFactory,
}

/// Plugin information for listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    pub name: String,
    pub description: String,
    pub commands: Vec<String>,
}

/// Manages the plugins loaded for this session, in load order
#[derive(Default)]
pub struct PluginManager {
    plugins: Vec<LoadedPlugin>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate `reference` and bind its commands.
    ///
    /// Nothing is kept when the reference is unknown or a command is taken.
    pub fn load(
        &mut self,
        reference: &str,
        registry: &PluginRegistry,
        commands: &mut CommandService,
    ) -> Result<&mut LoadedPlugin, PluginError> {
        if self.contains(reference) {
            return Err(PluginError::AlreadyLoaded(reference.to_string()));
        }

        let factory = registry.resolve(reference)?;
        let plugin = factory(reference);
        commands.register_plugin(reference, plugin.commands())?;

        info!("Loaded plugin: {}", reference);
        self.plugins.push(LoadedPlugin {
            name: reference.to_string(),
            plugin,
            factory,
        });
        let last = self.plugins.len() - 1;
        Ok(&mut self.plugins[last])
    }

    /// Replace a loaded plugin with a fresh instance from its factory
    pub fn reload(&mut self, name: &str, commands: &mut CommandService) -> Result<&mut LoadedPlugin, PluginError> {
        let loaded = self
            .plugins
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| PluginError::NotLoaded(name.to_string()))?;

        commands.unregister_plugin(name);
        let fresh = (loaded.factory)(name);
        if let Err(e) = commands.register_plugin(name, fresh.commands()) {
            warn!("Keeping previous instance of {}: {}", name, e);
            commands.register_plugin(name, loaded.plugin.commands())?;
            return Err(e);
        }

        loaded.plugin = fresh;
        info!("Reloaded plugin: {}", name);
        Ok(loaded)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut LoadedPlugin> {
        self.plugins.iter_mut().find(|p| p.name == name)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut LoadedPlugin> {
        self.plugins.iter_mut()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name.as_str()).collect()
    }

    /// List all loaded plugins
    pub fn list(&self) -> Vec<PluginInfo> {
        self.plugins
            .iter()
            .map(|p| PluginInfo {
                name: p.name.clone(),
                description: p.plugin.description().to_string(),
                commands: p.plugin.commands().into_iter().map(|c| c.name).collect(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::errors::BotError;
    use crate::domain::entities::{ChatMessage, Command};
    use crate::plugins::registry::plugin_factory;
    use crate::plugins::trait_def::PluginContext;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Echo {
        name: String,
        command: &'static str,
    }

    impl Plugin for Echo {
        fn name(&self) -> &str {
            &self.name
        }

        fn description(&self) -> &str {
            "Echoes"
        }

        fn commands(&self) -> Vec<Command> {
            vec![Command::new(self.command)]
        }

        fn on_command(&mut self, _: &str, _: &str, _: &ChatMessage, _: &mut PluginContext<'_>) -> Result<(), BotError> {
            Ok(())
        }
    }

    fn registry() -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        registry.register_user("echo", "First", plugin_factory(|name| Echo { name: name.into(), command: "/echo" }));
        registry.register_user("echo", "Second", plugin_factory(|name| Echo { name: name.into(), command: "/echo" }));
        registry
    }

    #[test]
    fn test_collision_keeps_first_plugin() {
        let registry = registry();
        let mut commands = CommandService::new();
        let mut manager = PluginManager::new();

        manager.load("echo.First", &registry, &mut commands).unwrap();
        let err = manager.load("echo.Second", &registry, &mut commands).err().unwrap();

        assert!(matches!(err, PluginError::CommandConflict { .. }));
        assert_eq!(manager.names(), vec!["echo.First"]);
        assert!(matches!(
            manager.load("echo.First", &registry, &mut commands),
            Err(PluginError::AlreadyLoaded(_))
        ));
    }

    #[test]
    fn test_unknown_reference() {
        let mut manager = PluginManager::new();
        let err = manager
            .load("nope.Nothing", &PluginRegistry::new(), &mut CommandService::new())
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Cannot find plugin `nope.Nothing`.");
        assert!(manager.is_empty());
    }

    #[test]
    fn test_reload_uses_factory_again() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let mut registry = PluginRegistry::new();
        registry.register_user(
            "echo",
            "Counted",
            plugin_factory(move |name| {
                counter.fetch_add(1, Ordering::SeqCst);
                Echo { name: name.into(), command: "/count" }
            }),
        );

        let mut commands = CommandService::new();
        let mut manager = PluginManager::new();
        manager.load("echo.Counted", &registry, &mut commands).unwrap();
        manager.reload("echo.Counted", &mut commands).unwrap();

        assert_eq!(built.load(Ordering::SeqCst), 2);
        assert!(commands.get("/count").is_some());
        assert!(matches!(
            manager.reload("echo.Missing", &mut commands),
            Err(PluginError::NotLoaded(_))
        ));
    }
}
