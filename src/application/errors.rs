//! Application layer errors

use std::path::PathBuf;
use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),

    /// A removal targeted a member the session never saw join.
    #[error("`{user_id}` is not in the {set} set")]
    MissingMember { set: &'static str, user_id: String },

    #[error("`{song_id}` is not in the mirror of playlist `{playlist}`")]
    MissingSong { playlist: String, song_id: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Command execution errors
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Command not found: {0}")]
    NotFound(String),
}

/// Plugin resolution and registration errors
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Cannot find plugin `{0}`.")]
    NotFound(String),

    #[error("`{plugin}` conflicts with `{other}` for command `{command}`.")]
    CommandConflict {
        plugin: String,
        other: String,
        command: String,
    },

    #[error("`{plugin}` cannot use the reserved command `{command}`.")]
    ReservedCommand { plugin: String, command: String },

    #[error("Plugin `{0}` is already loaded.")]
    AlreadyLoaded(String),

    #[error("Plugin `{0}` is not loaded.")]
    NotLoaded(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No lazysusan.yaml found (searched {})", display_paths(.0))]
    NotFound(Vec<PathBuf>),

    #[error("No section `{0}` found in lazysusan.yaml.")]
    MissingSection(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for `{key}`: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
