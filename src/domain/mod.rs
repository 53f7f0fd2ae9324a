//! Domain layer - Core business logic with no external dependencies
//! 
//! This layer contains:
//! - Entities: Core business objects (Session, RoomEvent, Action, Command)
//! - Traits: Abstractions for infrastructure (RoomClient)

pub mod entities;
pub mod traits;
