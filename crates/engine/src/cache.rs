//! Context-cache manager: the single cache slot and its lifecycle.
//!
//! ```text
//! Empty ──create succeeds──▶ Active(entry)
//! Active ──expired / other model / reset──▶ Empty
//! ```
//!
//! Expiry is detected lazily on the next resolve; there is no timer. The
//! backend deletes expired caches itself, so nothing is ever deleted here.

use recast_core::backend::{BackendTransport, CacheContents};
use recast_core::clock::{Clock, SystemClock};
use recast_core::error::{Error, Result};
use recast_core::model::CacheEntry;
use recast_core::source::SourceScope;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::context::ContextBlock;

/// What to do with the cache for one request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CacheDecision<'a> {
    /// A live entry to reference instead of sending context.
    pub reuse: Option<CacheEntry>,
    /// Context the caller must turn into a new cache entry.
    pub create_from_context: Option<&'a ContextBlock>,
}

impl CacheDecision<'_> {
    /// Neither reuse nor creation: send a fresh request.
    pub fn is_bypass(&self) -> bool {
        self.reuse.is_none() && self.create_from_context.is_none()
    }
}

/// Decide without touching any state.
fn decide<'a>(
    entry: Option<&CacheEntry>,
    scope: SourceScope,
    use_cache: bool,
    model_id: &str,
    context: Option<&'a ContextBlock>,
    clock: &dyn Clock,
) -> CacheDecision<'a> {
    if scope != SourceScope::Repository || !use_cache {
        return CacheDecision::default();
    }
    match entry {
        Some(entry) if entry.is_usable_for(model_id, clock.now()) => CacheDecision {
            reuse: Some(entry.clone()),
            create_from_context: None,
        },
        _ => CacheDecision {
            reuse: None,
            create_from_context: context,
        },
    }
}

/// Owns the one cache slot of an orchestrator.
pub struct CacheManager {
    slot: Mutex<Option<CacheEntry>>,
    transport: Arc<dyn BackendTransport>,
    clock: Arc<dyn Clock>,
    ttl_secs: u64,
}

impl CacheManager {
    pub fn new(transport: Arc<dyn BackendTransport>, ttl_secs: u64) -> Self {
        Self {
            slot: Mutex::new(None),
            transport,
            clock: Arc::new(SystemClock),
            ttl_secs,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Hold the slot for a check, create, and store sequence.
    pub async fn lock(&self) -> CacheSlot<'_> {
        CacheSlot {
            entry: self.slot.lock().await,
            clock: self.clock.as_ref(),
        }
    }

    /// Decide reuse or creation for one request.
    ///
    /// Requests outside repository scope, or without the opt-in, never
    /// look at the slot. Repeated calls with no state change in between
    /// give the same answer.
    pub async fn resolve<'a>(
        &self,
        scope: SourceScope,
        use_cache: bool,
        model_id: &str,
        context: Option<&'a ContextBlock>,
    ) -> CacheDecision<'a> {
        if scope != SourceScope::Repository || !use_cache {
            return CacheDecision::default();
        }
        let slot = self.slot.lock().await;
        decide((*slot).as_ref(), scope, use_cache, model_id, context, self.clock.as_ref())
    }

    /// Upload the system prompt and context as a new cache.
    ///
    /// Any failure is a [`Error::CacheCreation`]; there is no fallback to
    /// an uncached request here.
    pub async fn create_cache(
        &self,
        context: &ContextBlock,
        system_prompt: &str,
        model_id: &str,
    ) -> Result<CacheEntry> {
        let created_at = self.clock.now();
        let contents = CacheContents {
            system_instruction: system_prompt.to_string(),
            context: context.text.clone(),
            ttl_secs: self.ttl_secs,
        };

        debug!(
            model = %model_id,
            files = context.document_count(),
            bytes = context.len(),
            "Requesting context cache"
        );

        let id = self
            .transport
            .create_cache(model_id, &contents)
            .await
            .map_err(Error::CacheCreation)?;

        let entry = CacheEntry {
            id,
            model_id: model_id.to_string(),
            created_at,
            ttl_secs: self.ttl_secs,
        };
        info!(cache = %entry.id, model = %model_id, expires_at = %entry.expires_at(), "Context cache ready");
        Ok(entry)
    }

    pub async fn current(&self) -> Option<CacheEntry> {
        self.slot.lock().await.clone()
    }

    pub async fn reset(&self) {
        self.lock().await.reset();
    }
}

/// Exclusive access to the cache slot.
pub struct CacheSlot<'a> {
    entry: MutexGuard<'a, Option<CacheEntry>>,
    clock: &'a dyn Clock,
}

impl<'a> CacheSlot<'a> {
    /// Like [`CacheManager::resolve`], but also drops an expired entry.
    ///
    /// A live entry for another model stays in the slot until [`store`]
    /// replaces it, so a failed or cancelled creation leaves it intact.
    ///
    /// [`store`]: CacheSlot::store
    pub fn resolve<'c>(
        &mut self,
        scope: SourceScope,
        use_cache: bool,
        model_id: &str,
        context: Option<&'c ContextBlock>,
    ) -> CacheDecision<'c> {
        let decision = decide(
            (*self.entry).as_ref(),
            scope,
            use_cache,
            model_id,
            context,
            self.clock,
        );
        let now = self.clock.now();
        if decision.create_from_context.is_some()
            && (*self.entry).as_ref().is_some_and(|entry| entry.is_expired(now))
        {
            debug!(model = %model_id, "Dropping expired context cache entry");
            *self.entry = None;
        }
        decision
    }

    /// The live entry for `model_id`, if there is one.
    pub fn reusable(&self, model_id: &str) -> Option<&CacheEntry> {
        (*self.entry)
            .as_ref()
            .filter(|entry| entry.is_usable_for(model_id, self.clock.now()))
    }

    /// Replace whatever the slot held.
    pub fn store(&mut self, entry: CacheEntry) {
        *self.entry = Some(entry);
    }

    pub fn reset(&mut self) {
        *self.entry = None;
    }

    pub fn current(&self) -> Option<&CacheEntry> {
        (*self.entry).as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ManualClock, MockTransport};
    use recast_core::error::ProviderError;

    fn block() -> ContextBlock {
        ContextBlock {
            scope: SourceScope::Repository,
            paths: vec!["a.cs".into()],
            text: "<context>\n<files>\n<code filename='../a.cs'>A</code>\n</files>\n</context>".into(),
        }
    }

    fn manager(transport: Arc<MockTransport>, clock: Arc<ManualClock>) -> CacheManager {
        CacheManager::new(transport, 3600).with_clock(clock)
    }

    async fn seed(manager: &CacheManager, model: &str) -> CacheEntry {
        let entry = manager.create_cache(&block(), "sys", model).await.unwrap();
        manager.lock().await.store(entry.clone());
        entry
    }

    #[tokio::test]
    async fn bypass_outside_repository_or_without_opt_in() {
        let transport = Arc::new(MockTransport::new(vec![]));
        let manager = manager(transport, Arc::new(ManualClock::new()));
        seed(&manager, "m1").await;
        let ctx = block();

        let file = manager
            .resolve(SourceScope::ActiveDocument, true, "m1", Some(&ctx))
            .await;
        let opted_out = manager
            .resolve(SourceScope::Repository, false, "m1", Some(&ctx))
            .await;
        assert!(file.is_bypass());
        assert!(opted_out.is_bypass());
        assert!(manager.current().await.is_some());
    }

    #[tokio::test]
    async fn empty_slot_asks_for_creation() {
        let transport = Arc::new(MockTransport::new(vec![]));
        let manager = manager(transport, Arc::new(ManualClock::new()));
        let ctx = block();

        let decision = manager
            .resolve(SourceScope::Repository, true, "m1", Some(&ctx))
            .await;
        assert!(decision.reuse.is_none());
        assert_eq!(decision.create_from_context, Some(&ctx));
    }

    #[tokio::test]
    async fn live_entry_reused_and_resolve_is_idempotent() {
        let transport = Arc::new(MockTransport::new(vec![]));
        let manager = manager(transport.clone(), Arc::new(ManualClock::new()));
        let entry = seed(&manager, "m1").await;
        let ctx = block();

        let first = manager
            .resolve(SourceScope::Repository, true, "m1", Some(&ctx))
            .await;
        let second = manager
            .resolve(SourceScope::Repository, true, "m1", Some(&ctx))
            .await;
        assert_eq!(first.reuse, Some(entry));
        assert!(first.create_from_context.is_none());
        assert_eq!(first, second);
        assert_eq!(transport.cache_creations(), 1);
    }

    #[tokio::test]
    async fn expired_entry_never_reused() {
        let transport = Arc::new(MockTransport::new(vec![]));
        let clock = Arc::new(ManualClock::new());
        let manager = manager(transport, clock.clone());
        seed(&manager, "m1").await;
        let ctx = block();

        clock.advance(3599);
        let live = manager
            .resolve(SourceScope::Repository, true, "m1", Some(&ctx))
            .await;
        assert!(live.reuse.is_some());

        clock.advance(1);
        let expired = manager
            .resolve(SourceScope::Repository, true, "m1", Some(&ctx))
            .await;
        assert!(expired.reuse.is_none());
        assert_eq!(expired.create_from_context, Some(&ctx));
    }

    #[tokio::test]
    async fn model_switch_requires_new_entry() {
        let transport = Arc::new(MockTransport::new(vec![]));
        let manager = manager(transport, Arc::new(ManualClock::new()));
        seed(&manager, "m1").await;
        let ctx = block();

        let mut slot = manager.lock().await;
        assert!(slot.reusable("m2").is_none());
        let decision = slot.resolve(SourceScope::Repository, true, "m2", Some(&ctx));
        assert!(decision.reuse.is_none());
        assert!(decision.create_from_context.is_some());
        assert_eq!(slot.current().map(|e| e.model_id.as_str()), Some("m1"));
    }

    #[tokio::test]
    async fn slot_resolve_drops_only_expired_entries() {
        let transport = Arc::new(MockTransport::new(vec![]));
        let clock = Arc::new(ManualClock::new());
        let manager = manager(transport, clock.clone());
        seed(&manager, "m1").await;
        let ctx = block();

        clock.advance(3600);
        let mut slot = manager.lock().await;
        let decision = slot.resolve(SourceScope::Repository, true, "m1", Some(&ctx));
        assert!(decision.create_from_context.is_some());
        assert!(slot.current().is_none());
    }

    #[tokio::test]
    async fn create_records_clock_and_ttl() {
        let transport = Arc::new(MockTransport::new(vec![]));
        let clock = Arc::new(ManualClock::new());
        let manager = manager(transport.clone(), clock.clone());

        let entry = manager.create_cache(&block(), "sys", "m1").await.unwrap();
        assert_eq!(entry.created_at, clock.now());
        assert_eq!(entry.ttl_secs, 3600);
        assert_eq!(entry.model_id, "m1");

        let created = transport.caches_created.lock().unwrap();
        assert_eq!(created[0].1.system_instruction, "sys");
        assert_eq!(created[0].1.context, block().text);
        // Creation alone does not fill the slot.
        drop(created);
        assert!(manager.current().await.is_none());
    }

    #[tokio::test]
    async fn create_failure_is_cache_creation_error() {
        let transport =
            Arc::new(MockTransport::new(vec![]).failing_cache(ProviderError::RateLimited));
        let manager = manager(transport, Arc::new(ManualClock::new()));

        let err = manager.create_cache(&block(), "sys", "m1").await.unwrap_err();
        assert!(matches!(err, Error::CacheCreation(ProviderError::RateLimited)));
        assert!(manager.current().await.is_none());
    }

    #[tokio::test]
    async fn reset_empties_slot() {
        let transport = Arc::new(MockTransport::new(vec![]));
        let manager = manager(transport, Arc::new(ManualClock::new()));
        seed(&manager, "m1").await;

        manager.reset().await;
        assert!(manager.current().await.is_none());
    }
}
