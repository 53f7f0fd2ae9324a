//! Plugin system for lazysusan-bot
//!
//! Plugins are built from an explicit factory registry, keyed by dotted
//! reference, and receive the session through a context on every call.

pub mod dj;
pub mod manager;
pub mod matching;
pub mod playlist;
pub mod registry;
pub mod trait_def;

pub use manager::{LoadedPlugin, PluginInfo, PluginManager};
pub use registry::{plugin_factory, PluginFactory, PluginReference, PluginRegistry};
pub use trait_def::{Plugin, PluginContext};
