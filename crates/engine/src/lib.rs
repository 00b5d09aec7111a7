//! The generation-orchestration engine.
//!
//! One [`Orchestrator::generate`] call runs:
//!
//! 1. **Validate** the request (non-empty prompt and model)
//! 2. **Build context** from the open document or the repository, unless a
//!    live context cache already holds it
//! 3. **Resolve the cache**: reuse the live entry, or create one when the
//!    request opts in
//! 4. **Compose** a fresh or cached request
//! 5. **Invoke** the backend and interpret the first candidate
//!
//! Every step propagates a typed [`recast_core::Error`]; nothing is retried
//! and nothing is swallowed. [`Orchestrator::cancel`] abandons in-flight work.

pub mod cache;
pub mod client;
pub mod composer;
pub mod context;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use cache::{CacheDecision, CacheManager, CacheSlot};
pub use client::GenerationClient;
pub use composer::PromptComposer;
pub use context::{ContextAssembler, ContextBlock, WorkspaceSource};
pub use orchestrator::{EngineSettings, Orchestrator};
