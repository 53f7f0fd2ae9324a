//! Domain entities - Core business objects with no external dependencies

pub mod user;
pub mod message;
pub mod command;
pub mod event;
pub mod action;
pub mod session;

pub use user::User;
pub use message::{ChatMessage, MessageOrigin};
pub use command::{Command, CommandOwner, CommandRegistry, Guard};
pub use event::{LoggedSong, RoomDetails, RoomEvent, RoomMetadata, RoomSnapshot, Song, SongMetadata};
pub use action::{Action, ApiResponse, CallId, DirectoryRoom, PlaylistSummary, Request};
pub use session::{RoomState, Session};
