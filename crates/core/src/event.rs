//! Transform events: the caller's side channel for warnings and usage.
//!
//! Events are published when something interesting happens during a
//! generate call. Callers subscribe to surface warnings (such as an
//! incomplete generation whose partial text was still returned) without
//! the engine having to know how they are displayed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::model::FinishReason;

/// All events published by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TransformEvent {
    /// A new context cache was created and stored.
    CacheCreated {
        cache_id: String,
        model_id: String,
        expires_at: DateTime<Utc>,
    },

    /// An existing context cache was reused.
    CacheReused {
        cache_id: String,
        model_id: String,
        timestamp: DateTime<Utc>,
    },

    /// The backend reported token usage for a call.
    TokensUsed {
        model_id: String,
        total_tokens: u32,
        timestamp: DateTime<Utc>,
    },

    /// Generation stopped early; partial text was returned to the caller.
    IncompleteGeneration {
        model_id: String,
        reason: FinishReason,
        message: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A generate call was cancelled by the caller.
    Cancelled { timestamp: DateTime<Utc> },
}

/// A broadcast-based event bus for transform events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<TransformEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: TransformEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<TransformEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
