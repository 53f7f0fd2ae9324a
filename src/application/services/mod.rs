//! Application services - Business logic orchestration

pub mod command_service;
pub mod room_api;

pub use command_service::{CommandService, Route};
pub use room_api::{RoomApi, CORE_OWNER};
