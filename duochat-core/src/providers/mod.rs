//! Provider abstraction and resilient dispatch
//!
//! This module holds the provider adapters, the retry policy and the
//! orchestrator that chains them into an ordered fallback sequence.

pub mod adapter;
pub mod gemini;
pub mod openai;
pub mod retry;
pub mod routing;

pub use adapter::{
    create_adapter, Classification, FailureKind, ProviderAdapter, ProviderError,
};
pub use retry::RetryPolicy;
pub use routing::{
    AttemptRecord, DispatchOutcome, DispatchResult, FailureReport, OrchestratorBuilder,
    ProviderFailure, RequestOrchestrator,
};

// Re-export concrete providers
pub use gemini::GeminiAdapter;
pub use openai::OpenAIAdapter;
