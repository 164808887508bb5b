//! duochat core library
//!
//! Multi-conversation chat state plus a resilient completion dispatcher:
//! every submission is answered by the first provider in an ordered
//! fallback chain that succeeds, with bounded exponential-backoff retries
//! for transient failures.

pub mod config;
pub mod context;
pub mod http;
pub mod protocol;
pub mod providers;
pub mod session;
pub mod store;

pub use context::ContextInjector;
pub use protocol::{Message, MessageRole};
pub use providers::{DispatchOutcome, DispatchResult, RequestOrchestrator};
pub use session::{ChatSession, Narrator};
pub use store::{ChatId, Conversation, ConversationStore, StoreError};

/// Returns the version of the duochat core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
