//! The orchestrator: sequences context, cache, composition, and the model
//! call for one request, and exposes cancellation.

use recast_config::{AppConfig, ConfigError};
use recast_core::backend::{BackendTransport, CallOptions};
use recast_core::clock::{Clock, SystemClock};
use recast_core::error::{Error, Result};
use recast_core::event::{EventBus, TransformEvent};
use recast_core::model::{CacheEntry, ModelRequest};
use recast_core::request::GenerationRequest;
use recast_core::source::ContextSource;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::cache::CacheManager;
use crate::client::GenerationClient;
use crate::composer::PromptComposer;
use crate::context::ContextAssembler;

/// Everything the engine takes from configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub system_prompt: String,
    pub instructions: String,
    pub include_patterns: Vec<String>,
    pub cache_ttl_secs: u64,
    pub call_options: CallOptions,
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            system_prompt: config.prompt.system_prompt.clone(),
            instructions: config.prompt.instructions.clone(),
            include_patterns: config.context.include_patterns.clone(),
            cache_ttl_secs: config.cache.ttl_secs,
            call_options: CallOptions {
                generation: config.generation.generation_config(),
                timeout: config.generation.timeout(),
            },
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Runs generate requests against one source and one backend.
///
/// Holds the single context-cache slot; concurrent calls share it.
pub struct Orchestrator {
    source: Arc<dyn ContextSource>,
    assembler: ContextAssembler,
    composer: PromptComposer,
    cache: CacheManager,
    client: GenerationClient,
    system_prompt: String,
    events: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    cancel: Mutex<CancellationToken>,
}

impl Orchestrator {
    pub fn new(
        source: Arc<dyn ContextSource>,
        transport: Arc<dyn BackendTransport>,
        settings: EngineSettings,
    ) -> Self {
        let events = Arc::new(EventBus::default());
        Self {
            source,
            assembler: ContextAssembler::new(settings.include_patterns),
            composer: PromptComposer::new(settings.instructions),
            cache: CacheManager::new(transport.clone(), settings.cache_ttl_secs),
            client: GenerationClient::new(transport, settings.call_options)
                .with_events(events.clone()),
            system_prompt: settings.system_prompt,
            events,
            clock: Arc::new(SystemClock),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Build an orchestrator talking to Vertex AI as configured.
    pub fn from_config(
        source: Arc<dyn ContextSource>,
        config: &AppConfig,
    ) -> std::result::Result<Self, ConfigError> {
        let router = recast_providers::router::build_from_config(config)?;
        Ok(Self::new(
            source,
            Arc::new(router),
            EngineSettings::from_config(config),
        ))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.cache = self.cache.with_clock(clock.clone());
        self.client = self.client.with_clock(clock.clone());
        self.clock = clock;
        self
    }

    /// Publish to `events` instead of the orchestrator's own bus.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.client = self.client.with_events(events.clone());
        self.events = events;
        self
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// The entry currently held in the cache slot.
    pub async fn cache_entry(&self) -> Option<CacheEntry> {
        self.cache.current().await
    }

    /// Forget the cache entry; the next cached request creates a new one.
    pub async fn reset_cache(&self) {
        self.cache.reset().await;
        debug!("Context cache slot cleared");
    }

    /// Abandon every in-flight `generate`. Later calls are unaffected.
    pub fn cancel(&self) {
        let mut token = self.cancel.lock().unwrap_or_else(|e| e.into_inner());
        token.cancel();
        *token = CancellationToken::new();
        info!("Cancellation requested");
    }

    fn token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Run one request and return the generated text.
    ///
    /// Fails with the first error any step raises. An incomplete generation
    /// that still produced text is returned as success after an
    /// [`TransformEvent::IncompleteGeneration`] is published.
    #[instrument(skip_all, fields(scope = %request.scope, model = %request.model_id, use_cache = request.use_cache))]
    pub async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        request.validate()?;
        let token = self.token();

        let result = self.run(request, &token).await;
        if matches!(result, Err(Error::Cancelled)) {
            info!("Generation cancelled");
            self.events.publish(TransformEvent::Cancelled {
                timestamp: self.clock.now(),
            });
        }
        result
    }

    async fn run(&self, request: &GenerationRequest, token: &CancellationToken) -> Result<String> {
        let model_request = if request.wants_cache() {
            self.prepare_cached(request, token).await?
        } else {
            let context =
                cancellable(token, self.assembler.build(request.scope, self.source.as_ref()))
                    .await??;
            self.composer
                .compose(Some(&context), &self.system_prompt, &request.prompt, None)?
        };

        match cancellable(token, self.client.invoke(&model_request, &request.model_id)).await? {
            Ok(response) => {
                info!(
                    chars = response.text.len(),
                    tokens = response.token_count,
                    "Generation complete"
                );
                Ok(response.text)
            }
            Err(Error::IncompleteGeneration {
                reason,
                partial_message,
                partial_text,
            }) if !partial_text.is_empty() => {
                warn!(%reason, "Returning partial output of an incomplete generation");
                self.events.publish(TransformEvent::IncompleteGeneration {
                    model_id: request.model_id.clone(),
                    reason,
                    message: partial_message,
                    timestamp: self.clock.now(),
                });
                Ok(partial_text)
            }
            Err(e) => Err(e),
        }
    }

    /// Reuse the live cache or create one, holding the slot throughout so
    /// concurrent callers never create two entries for the same model.
    async fn prepare_cached(
        &self,
        request: &GenerationRequest,
        token: &CancellationToken,
    ) -> Result<ModelRequest> {
        let mut slot = cancellable(token, self.cache.lock()).await?;

        if let Some(entry) = slot.reusable(&request.model_id).cloned() {
            drop(slot);
            debug!(cache = %entry.id, "Reusing context cache");
            self.events.publish(TransformEvent::CacheReused {
                cache_id: entry.id.clone(),
                model_id: entry.model_id.clone(),
                timestamp: self.clock.now(),
            });
            return self
                .composer
                .compose(None, &self.system_prompt, &request.prompt, Some(&entry.id));
        }

        let context =
            cancellable(token, self.assembler.build(request.scope, self.source.as_ref())).await??;
        let decision = slot.resolve(
            request.scope,
            request.use_cache,
            &request.model_id,
            Some(&context),
        );

        let Some(to_cache) = decision.create_from_context else {
            drop(slot);
            return self
                .composer
                .compose(Some(&context), &self.system_prompt, &request.prompt, None);
        };

        let entry = cancellable(
            token,
            self.cache
                .create_cache(to_cache, &self.system_prompt, &request.model_id),
        )
        .await??;
        slot.store(entry.clone());
        drop(slot);

        self.events.publish(TransformEvent::CacheCreated {
            cache_id: entry.id.clone(),
            model_id: entry.model_id.clone(),
            expires_at: entry.expires_at(),
        });
        self.composer
            .compose(None, &self.system_prompt, &request.prompt, Some(&entry.id))
    }
}

/// Race `fut` against `token`; cancellation wins ties.
async fn cancellable<F: Future>(token: &CancellationToken, fut: F) -> Result<F::Output> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Error::Cancelled),
        output = fut => Ok(output),
    }
}
