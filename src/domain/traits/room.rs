use async_trait::async_trait;

use crate::application::errors::BotError;
use crate::domain::entities::{ApiResponse, CallId, Request, RoomEvent};

/// Everything the transport feeds into the single dispatch queue
#[derive(Debug, Clone)]
pub enum Inbound {
    /// A room event pushed by the service
    Event(RoomEvent),
    /// The answer to a request that carried an id
    Response { id: CallId, body: ApiResponse },
}

/// RoomClient trait - abstraction for the real-time room protocol client
///
/// Events and responses are delivered through the channel handed to the
/// adapter at construction; `send` never blocks on the service.
#[async_trait]
pub trait RoomClient: Send + Sync {
    /// Connect and begin pushing inbound items
    async fn start(&self) -> Result<(), BotError>;

    /// Queue a request for the service
    fn send(&self, request: Request) -> Result<(), BotError>;

    /// The bot's own user id
    fn bot_id(&self) -> &str;
}
