//! Domain traits - Abstractions for infrastructure implementations

pub mod room;

pub use room::{Inbound, RoomClient};
