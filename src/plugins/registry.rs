//! Plugin registry - Maps plugin references to factories
//!
//! Plugins are selected late, by name, from the configuration. Resolution looks
//! in the user namespace first and falls back to the bundled plugins.

use std::collections::HashMap;
use std::sync::Arc;

use super::dj::Dj;
use super::playlist::Playlist;
use super::trait_def::Plugin;
use crate::application::errors::PluginError;

/// Builds a plugin instance given the reference it is loaded under
pub type PluginFactory = Arc<dyn Fn(&str) -> Box<dyn Plugin> + Send + Sync>;

/// Wrap a constructor taking the reference name into a [`PluginFactory`]
pub fn plugin_factory<P, F>(build: F) -> PluginFactory
where
    P: Plugin + 'static,
    F: Fn(&str) -> P + Send + Sync + 'static,
{
    Arc::new(move |name: &str| -> Box<dyn Plugin> { Box::new(build(name)) })
}

/// A dotted plugin reference split into module and class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginReference {
    pub module: String,
    pub class: String,
}

impl PluginReference {
    /// `a.b.C` is module `a.b`, class `C`; a bare `mod` is module `mod`, class `Mod`
    pub fn parse(reference: &str) -> Self {
        match reference.rsplit_once('.') {
            Some((module, class)) => Self {
                module: module.to_string(),
                class: class.to_string(),
            },
            None => Self {
                module: reference.to_string(),
                class: title_case(reference),
            },
        }
    }

    pub fn key(&self) -> String {
        format!("{}.{}", self.module, self.class)
    }
}

/// Registry of plugin factories
#[derive(Default, Clone)]
pub struct PluginRegistry {
    user: HashMap<String, PluginFactory>,
    bundled: HashMap<String, PluginFactory>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the plugins shipped with the bot
    pub fn with_bundled() -> Self {
        let mut registry = Self::new();
        registry.register_bundled("botdj", "Dj", plugin_factory(|name| Dj::new(name)));
        registry.register_bundled("botdj", "Playlist", plugin_factory(|name| Playlist::new(name)));
        registry
    }

    pub fn register_bundled(&mut self, module: &str, class: &str, factory: PluginFactory) {
        self.bundled.insert(format!("{}.{}", module, class), factory);
    }

    /// User plugins shadow bundled plugins of the same reference
    pub fn register_user(&mut self, module: &str, class: &str, factory: PluginFactory) {
        self.user.insert(format!("{}.{}", module, class), factory);
    }

    pub fn resolve(&self, reference: &str) -> Result<PluginFactory, PluginError> {
        let key = PluginReference::parse(reference).key();
        self.user
            .get(&key)
            .or_else(|| self.bundled.get(&key))
            .cloned()
            .ok_or_else(|| PluginError::NotFound(reference.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.user.keys().chain(self.bundled.keys()).cloned().collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn len(&self) -> usize {
        self.names().len()
    }

    pub fn is_empty(&self) -> bool {
        self.user.is_empty() && self.bundled.is_empty()
    }
}

/// Capitalize the first letter of every run of letters, lowercase the rest
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}
