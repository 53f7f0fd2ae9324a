//! In-memory adapter that records every request, for tests and embedding

use async_trait::async_trait;
use std::sync::Mutex;

use crate::application::errors::BotError;
use crate::domain::entities::{Action, CallId, Request};
use crate::domain::traits::RoomClient;

/// Records requests instead of sending them anywhere
pub struct MemoryAdapter {
    bot_id: String,
    requests: Mutex<Vec<Request>>,
}

impl MemoryAdapter {
    pub fn new(bot_id: impl Into<String>) -> Self {
        Self {
            bot_id: bot_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn actions(&self) -> Vec<Action> {
        self.requests().into_iter().map(|r| r.action).collect()
    }

    /// Text of every chat reply, room or private
    pub fn replies(&self) -> Vec<String> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                Action::Speak { text } | Action::Pm { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Id and action of the most recent request expecting an answer
    pub fn last_call(&self) -> Option<(CallId, Action)> {
        self.requests()
            .into_iter()
            .rev()
            .find_map(|r| r.id.map(|id| (id, r.action)))
    }

    pub fn clear(&self) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.clear();
        }
    }
}

#[async_trait]
impl RoomClient for MemoryAdapter {
    async fn start(&self) -> Result<(), BotError> {
        Ok(())
    }

    fn send(&self, request: Request) -> Result<(), BotError> {
        self.requests
            .lock()
            .map_err(|_| BotError::Internal("Lock poisoned".to_string()))?
            .push(request);
        Ok(())
    }

    fn bot_id(&self) -> &str {
        &self.bot_id
    }
}
