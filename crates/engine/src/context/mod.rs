//! Code context gathering.
//!
//! | Scope | Source | Envelope |
//! |-------|--------|----------|
//! | Active document | `ContextSource::active_document` | `<context>` |
//! | Repository | `ContextSource::find_files` per include pattern | `<context><files>` |

pub mod assembler;
pub mod workspace;

pub use assembler::{ContextAssembler, ContextBlock};
pub use workspace::WorkspaceSource;
