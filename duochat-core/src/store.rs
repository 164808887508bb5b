//! In-memory conversation store
//!
//! Owns the conversation list, the active selection and the per-chat busy
//! flags. A chat becomes busy when a user message is appended and stays
//! busy until the dispatch result is appended; while busy it accepts
//! neither new submissions nor deletion.

use crate::protocol::types::Message;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Opaque conversation identifier
pub type ChatId = Uuid;

/// Title of a conversation with no messages yet
pub const DEFAULT_TITLE: &str = "New Chat";

/// Errors from store operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Unknown chat: {0}")]
    UnknownChat(ChatId),

    #[error("Message text is empty")]
    EmptyMessage,

    #[error("Title is empty")]
    EmptyTitle,

    #[error("Chat {0} is waiting for a response")]
    Busy(ChatId),

    #[error("Dispatch for chat {0} was interrupted")]
    Interrupted(ChatId),
}

/// A conversation and its message log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ChatId,
    pub title: String,
    pub messages: Vec<Message>,
    pub pinned: bool,
}

impl Conversation {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            pinned: false,
        }
    }

    fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self
                .messages
                .iter()
                .any(|m| m.text.to_lowercase().contains(needle))
    }
}

/// Conversation list with single-writer semantics
#[derive(Debug, Default)]
pub struct ConversationStore {
    /// Newest first
    chats: Vec<Conversation>,
    active: Option<ChatId>,
    in_flight: HashSet<ChatId>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty, unpinned conversation and make it active
    pub fn new_chat(&mut self) -> ChatId {
        let chat = Conversation::new();
        let id = chat.id;
        self.chats.insert(0, chat);
        self.active = Some(id);
        debug!(chat = %id, "created chat");
        id
    }

    /// Make a conversation the active one
    pub fn select(&mut self, id: ChatId) -> Result<(), StoreError> {
        self.get(id)?;
        self.active = Some(id);
        Ok(())
    }

    pub fn active_id(&self) -> Option<ChatId> {
        self.active
    }

    pub fn get(&self, id: ChatId) -> Result<&Conversation, StoreError> {
        self.chats
            .iter()
            .find(|c| c.id == id)
            .ok_or(StoreError::UnknownChat(id))
    }

    fn get_mut(&mut self, id: ChatId) -> Result<&mut Conversation, StoreError> {
        self.chats
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::UnknownChat(id))
    }

    pub fn is_busy(&self, id: ChatId) -> bool {
        self.in_flight.contains(&id)
    }

    /// Append a user message and mark the chat in flight.
    ///
    /// Sets the title to the message text when this is the first message.
    /// Returns the history snapshot to dispatch.
    pub fn append_user_message(
        &mut self,
        id: ChatId,
        text: &str,
    ) -> Result<Vec<Message>, StoreError> {
        if self.is_busy(id) {
            return Err(StoreError::Busy(id));
        }
        if text.trim().is_empty() {
            return Err(StoreError::EmptyMessage);
        }

        let chat = self.get_mut(id)?;
        if chat.messages.is_empty() {
            chat.title = text.to_string();
        }
        chat.messages.push(Message::user(text));
        let snapshot = chat.messages.clone();

        self.in_flight.insert(id);
        Ok(snapshot)
    }

    /// Append the dispatch result (reply or failure notice) and clear the
    /// in-flight flag.
    pub fn append_result_message(&mut self, id: ChatId, message: Message) -> Result<(), StoreError> {
        self.in_flight.remove(&id);
        self.get_mut(id)?.messages.push(message);
        Ok(())
    }

    /// Clear the in-flight flag without appending a reply. Used when the
    /// dispatch for this chat ended without producing a result.
    pub fn abandon(&mut self, id: ChatId) {
        if self.in_flight.remove(&id) {
            debug!(chat = %id, "abandoned in-flight dispatch");
        }
    }

    /// Remove a conversation; rejected while it awaits a response
    pub fn delete(&mut self, id: ChatId) -> Result<Conversation, StoreError> {
        if self.is_busy(id) {
            return Err(StoreError::Busy(id));
        }
        let index = self
            .chats
            .iter()
            .position(|c| c.id == id)
            .ok_or(StoreError::UnknownChat(id))?;

        if self.active == Some(id) {
            self.active = None;
        }
        debug!(chat = %id, "deleted chat");
        Ok(self.chats.remove(index))
    }

    /// Flip the pinned flag; returns the new value
    pub fn toggle_pin(&mut self, id: ChatId) -> Result<bool, StoreError> {
        let chat = self.get_mut(id)?;
        chat.pinned = !chat.pinned;
        Ok(chat.pinned)
    }

    pub fn rename(&mut self, id: ChatId, title: &str) -> Result<(), StoreError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(StoreError::EmptyTitle);
        }
        self.get_mut(id)?.title = title.to_string();
        Ok(())
    }

    /// Plain-text rendering used for sharing
    pub fn transcript(&self, id: ChatId) -> Result<String, StoreError> {
        let chat = self.get(id)?;
        Ok(chat
            .messages
            .iter()
            .map(|m| format!("{}: {}", m.role.transcript_label(), m.text))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }

    /// Pinned chats first, newest first within each group
    pub fn list(&self) -> Vec<&Conversation> {
        let mut chats: Vec<&Conversation> = self.chats.iter().collect();
        chats.sort_by_key(|c| !c.pinned);
        chats
    }

    /// Case-insensitive match on titles and message text, in list order
    pub fn search(&self, query: &str) -> Vec<&Conversation> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.list();
        }
        self.list()
            .into_iter()
            .filter(|c| c.matches(&needle))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }
}
