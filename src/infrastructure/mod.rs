//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Configuration loading
//! - Adapters: Room client implementations (console, in-memory)

pub mod config;
pub mod adapters;
