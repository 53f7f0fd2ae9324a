use std::collections::HashMap;
use std::sync::Arc;

use crate::application::errors::BotError;
use crate::domain::entities::{Action, CallId, ChatMessage, MessageOrigin, Request};
use crate::domain::traits::RoomClient;

/// Owner name used for requests issued by the bot core itself
pub const CORE_OWNER: &str = "core";

/// Issues requests to the room client and remembers who awaits each answer
pub struct RoomApi {
    client: Arc<dyn RoomClient>,
    next_id: u64,
    pending: HashMap<CallId, String>,
}

impl RoomApi {
    pub fn new(client: Arc<dyn RoomClient>) -> Self {
        Self {
            client,
            next_id: 1,
            pending: HashMap::new(),
        }
    }

    /// Fire-and-forget action; any answer is discarded
    pub fn send(&self, action: Action) -> Result<(), BotError> {
        tracing::debug!("-> {}", action.api_name());
        self.client.send(Request { id: None, action })
    }

    /// Action whose answer is routed back to `owner` under the returned id
    pub fn call(&mut self, owner: &str, action: Action) -> Result<CallId, BotError> {
        let id = CallId(self.next_id);
        self.next_id += 1;
        tracing::debug!("-> {} {} for {}", action.api_name(), id, owner);
        self.client.send(Request {
            id: Some(id),
            action,
        })?;
        self.pending.insert(id, owner.to_string());
        Ok(id)
    }

    /// Claim the owner of an answered request
    pub fn take_owner(&mut self, id: CallId) -> Option<String> {
        self.pending.remove(&id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Answer in the place the message came from
    pub fn reply(&self, text: impl Into<String>, to: &ChatMessage) -> Result<(), BotError> {
        let text = text.into();
        let action = match to.origin {
            MessageOrigin::Room => Action::Speak { text },
            MessageOrigin::Private => Action::Pm {
                text,
                receiver: to.sender_id.clone(),
            },
        };
        self.send(action)
    }
}
