//! lazysusan-bot - a turntable room bot with pluggable commands
//!
//! Room events and request responses flow through one queue into the
//! [`EventDispatcher`](application::messaging::EventDispatcher), which keeps
//! the session up to date and hands both to the loaded plugins.

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod plugins;
