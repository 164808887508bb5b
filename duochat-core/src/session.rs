//! Caller-facing chat session
//!
//! Wires the conversation store, the dispatcher and the narration
//! collaborator together. The store lock is only held for the synchronous
//! append steps, never across the dispatch itself, so other chats stay
//! usable while one is waiting for a reply.

use crate::config::{ConfigError, DuochatConfig};
use crate::protocol::types::Message;
use crate::providers::routing::{DispatchOutcome, RequestOrchestrator};
use crate::store::{ChatId, ConversationStore, StoreError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, instrument, warn};

/// Text-to-speech collaborator. Implementations are fire-and-forget.
pub trait Narrator: Send + Sync {
    /// Start narrating a reply, replacing anything currently spoken
    fn speak(&self, text: &str);

    /// Stop any ongoing narration
    fn cancel(&self);
}

/// Multi-conversation chat session
pub struct ChatSession {
    store: Arc<Mutex<ConversationStore>>,
    orchestrator: Arc<RequestOrchestrator>,
    narrator: Option<Arc<dyn Narrator>>,
    speech_enabled: AtomicBool,
}

impl ChatSession {
    pub fn new(orchestrator: RequestOrchestrator) -> Self {
        Self {
            store: Arc::new(Mutex::new(ConversationStore::new())),
            orchestrator: Arc::new(orchestrator),
            narrator: None,
            speech_enabled: AtomicBool::new(true),
        }
    }

    /// Build a session, and its fallback chain, from configuration
    pub fn from_config(config: &DuochatConfig) -> Result<Self, ConfigError> {
        let session = Self::new(RequestOrchestrator::from_config(config)?);
        session.set_speech_enabled(config.speech.enabled);
        Ok(session)
    }

    pub fn with_narrator(mut self, narrator: Arc<dyn Narrator>) -> Self {
        self.narrator = Some(narrator);
        self
    }

    /// Exclusive access to the conversation store for list operations
    /// (new / select / pin / rename / delete / share / search).
    pub async fn store(&self) -> MutexGuard<'_, ConversationStore> {
        self.store.lock().await
    }

    pub fn orchestrator(&self) -> &RequestOrchestrator {
        &self.orchestrator
    }

    /// Shortcut for creating and selecting a new conversation
    pub async fn new_chat(&self) -> ChatId {
        self.store.lock().await.new_chat()
    }

    pub async fn is_busy(&self, id: ChatId) -> bool {
        self.store.lock().await.is_busy(id)
    }

    pub fn speech_enabled(&self) -> bool {
        self.speech_enabled.load(Ordering::Relaxed)
    }

    /// Mute or unmute narration; muting stops anything being spoken
    pub fn set_speech_enabled(&self, enabled: bool) {
        self.speech_enabled.store(enabled, Ordering::Relaxed);
        if !enabled {
            if let Some(narrator) = &self.narrator {
                narrator.cancel();
            }
        }
    }

    pub fn toggle_speech(&self) -> bool {
        let enabled = !self.speech_enabled();
        self.set_speech_enabled(enabled);
        enabled
    }

    /// Submit user text to a conversation and wait for the reply.
    ///
    /// Rejected with [`StoreError::Busy`] while a previous submission to the
    /// same conversation is still being dispatched. Provider failures are
    /// not errors: they come back as the aggregated assistant message.
    #[instrument(skip(self, text), fields(chat = %id))]
    pub async fn submit(&self, id: ChatId, text: &str) -> Result<Message, StoreError> {
        self.submit_detailed(id, text).await.map(|outcome| outcome.result.to_message())
    }

    /// Like [`submit`](Self::submit), returning the full attempt log
    pub async fn submit_detailed(
        &self,
        id: ChatId,
        text: &str,
    ) -> Result<DispatchOutcome, StoreError> {
        let history = self.store.lock().await.append_user_message(id, text)?;

        // Dispatch and append complete even if this future is dropped.
        let store = Arc::clone(&self.store);
        let orchestrator = Arc::clone(&self.orchestrator);
        let task = tokio::spawn(async move {
            let outcome = orchestrator.dispatch(history).await;
            let message = outcome.result.to_message();
            store.lock().await.append_result_message(id, message.clone())?;
            Ok::<_, StoreError>((outcome, message))
        });

        let (outcome, message) = match task.await {
            Ok(result) => result?,
            Err(e) => {
                self.store.lock().await.abandon(id);
                warn!(chat = %id, "dispatch task failed: {}", e);
                match e.try_into_panic() {
                    Ok(payload) => std::panic::resume_unwind(payload),
                    Err(_) => return Err(StoreError::Interrupted(id)),
                }
            }
        };

        if outcome.result.is_success() {
            info!(used_fallback = outcome.used_fallback, "reply appended");
            self.narrate(&message.text);
        }
        Ok(outcome)
    }

    /// Submit recognized speech. Behaves exactly like typed input once the
    /// final transcript is known.
    pub async fn submit_transcript(
        &self,
        id: ChatId,
        transcript: &str,
    ) -> Result<Message, StoreError> {
        self.submit(id, transcript.trim()).await
    }

    fn narrate(&self, text: &str) {
        if !self.speech_enabled() || text.is_empty() {
            return;
        }
        if let Some(narrator) = &self.narrator {
            narrator.cancel();
            narrator.speak(text);
        }
    }
}
