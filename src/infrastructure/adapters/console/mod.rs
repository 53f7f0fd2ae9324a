//! Console adapter for development/testing
//!
//! Simulates a room: stdin lines become chat messages from `console` (or raw
//! events when they are JSON objects), requests are printed, and requests
//! expecting an answer get a canned response.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::application::errors::BotError;
use crate::domain::entities::{Action, ApiResponse, Request, RoomEvent};
use crate::domain::traits::{Inbound, RoomClient};

const CONSOLE_USER: &str = "console";

/// Console room adapter for local development
pub struct ConsoleAdapter {
    bot_id: String,
    room_id: String,
    sender: mpsc::UnboundedSender<Inbound>,
}

impl ConsoleAdapter {
    pub fn new(bot_id: impl Into<String>, room_id: impl Into<String>, sender: mpsc::UnboundedSender<Inbound>) -> Self {
        Self {
            bot_id: bot_id.into(),
            room_id: room_id.into(),
            sender,
        }
    }

    fn push(&self, inbound: Inbound) -> Result<(), BotError> {
        self.sender
            .send(inbound)
            .map_err(|_| BotError::Transport("Dispatch queue closed".to_string()))
    }

    fn snapshot(&self) -> Result<RoomEvent, BotError> {
        RoomEvent::from_value(json!({
            "command": "roomChanged",
            "room": {
                "roomid": self.room_id,
                "name": "Console",
                "shortcut": "console",
                "chatserver": ["localhost", 0],
                "metadata": {"djs": [], "max_djs": 5, "moderator_id": [CONSOLE_USER]}
            },
            "users": [{"userid": self.bot_id}, {"userid": CONSOLE_USER, "name": CONSOLE_USER}]
        }))
    }

    /// Canned answer for a request
    fn respond(&self, action: &Action) -> Value {
        match action {
            Action::UserInfo => json!({"success": true, "userid": self.bot_id, "name": "lazysusan"}),
            Action::RoomInfo { room_id } => json!({
                "success": true,
                "room": {
                    "roomid": room_id.clone().unwrap_or_else(|| self.room_id.clone()),
                    "metadata": {"songlog": []}
                }
            }),
            Action::ListRooms { .. } => json!({"success": true, "rooms": []}),
            Action::PlaylistListAll => json!({"success": true, "list": [{"name": "default", "active": true}]}),
            Action::PlaylistAll { .. } => json!({"success": true, "list": []}),
            other => json!({
                "success": false,
                "err": format!("{} is not available in console mode", other.api_name())
            }),
        }
    }
}

/// One stdin line as an inbound item
fn parse_line(line: &str) -> Option<Inbound> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if line.starts_with('{') {
        return match serde_json::from_str::<Value>(line).map_err(|e| e.to_string()) {
            Ok(value) => match RoomEvent::from_value(value) {
                Ok(event) => Some(Inbound::Event(event)),
                Err(e) => {
                    tracing::warn!("{}", e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("Invalid event: {}", e);
                None
            }
        };
    }
    Some(Inbound::Event(RoomEvent::Speak {
        userid: CONSOLE_USER.to_string(),
        name: CONSOLE_USER.to_string(),
        text: line.to_string(),
    }))
}

#[async_trait]
impl RoomClient for ConsoleAdapter {
    async fn start(&self) -> Result<(), BotError> {
        tracing::info!("Starting console room (dev mode)");
        self.push(Inbound::Event(RoomEvent::Ready {}))?;
        self.push(Inbound::Event(self.snapshot()?))?;

        let sender = self.sender.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if let Some(inbound) = parse_line(&line) {
                            if sender.send(inbound).is_err() {
                                break;
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!("Failed to read stdin: {}", e);
                        break;
                    }
                }
            }
        });
        Ok(())
    }

    fn send(&self, request: Request) -> Result<(), BotError> {
        match &request.action {
            Action::Speak { text } => println!("[BOT] {}", text),
            Action::Pm { text, receiver } => println!("[BOT -> {}] {}", receiver, text),
            other => println!("[ACTION] {:?}", other),
        }

        if let Some(id) = request.id {
            let body = ApiResponse::new(self.respond(&request.action));
            self.push(Inbound::Response { id, body })?;
        }
        Ok(())
    }

    fn bot_id(&self) -> &str {
        &self.bot_id
    }
}
