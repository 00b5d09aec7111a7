//! # Recast Core
//!
//! Domain types, capability traits, and error definitions for the Recast
//! generation engine. This crate has **no workspace dependencies**; it
//! defines the model that the config, provider, and engine crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here:
//! - [`ContextSource`] supplies the open document and repository files
//! - [`Credentials`] supplies bearer tokens
//! - [`BackendTransport`] talks to the model provider
//! - [`Clock`] supplies "now" so cache expiry can be tested
//!
//! Implementations live in their respective crates, which keeps the
//! orchestration core transport-agnostic and easy to test with mocks.

pub mod backend;
pub mod clock;
pub mod error;
pub mod event;
pub mod model;
pub mod request;
pub mod source;

// Re-export key types at crate root for ergonomics
pub use backend::{AccessToken, BackendTransport, CacheContents, CallOptions, Credentials};
pub use clock::{Clock, SystemClock};
pub use error::{Error, ProviderError, Result};
pub use event::{EventBus, TransformEvent};
pub use model::{
    CacheEntry, Candidate, FinishReason, GenerateContentResponse, GenerationConfig, ModelRequest,
    ModelResponse, UsageMetadata,
};
pub use request::GenerationRequest;
pub use source::{ContextSource, Document, SourceScope};
