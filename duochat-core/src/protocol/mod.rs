//! Protocol module for conversation and dispatch values
//!
//! This module defines the canonical data model shared by the conversation
//! store, the context injector and every provider adapter.

pub mod types;

pub use types::{DispatchRequest, Message, MessageRole, SystemContext};
