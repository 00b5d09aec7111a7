//! Shared test doubles for engine unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use recast_core::backend::{BackendTransport, CacheContents, CallOptions};
use recast_core::clock::Clock;
use recast_core::error::ProviderError;
use recast_core::model::{
    Candidate, Content, GenerateContentResponse, ModelRequest, Part, UsageMetadata,
};
use recast_core::source::{ContextSource, Document};
use std::collections::HashMap;
use std::sync::Mutex;

/// A context source backed by in-memory documents.
#[derive(Default)]
pub struct MemorySource {
    pub active: Option<Document>,
    pub files: HashMap<String, Vec<Document>>,
    pub find_calls: Mutex<Vec<String>>,
}

impl MemorySource {
    pub fn with_active(doc: Document) -> Self {
        Self {
            active: Some(doc),
            ..Self::default()
        }
    }

    pub fn with_files(pattern: &str, docs: Vec<Document>) -> Self {
        let mut source = Self::default();
        source.files.insert(pattern.into(), docs);
        source
    }

    pub fn find_calls(&self) -> Vec<String> {
        self.find_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContextSource for MemorySource {
    async fn active_document(&self) -> recast_core::Result<Option<Document>> {
        Ok(self.active.clone())
    }

    async fn find_files(&self, pattern: &str) -> recast_core::Result<Vec<Document>> {
        self.find_calls.lock().unwrap().push(pattern.into());
        Ok(self.files.get(pattern).cloned().unwrap_or_default())
    }
}

/// A transport returning scripted envelopes and recording every call.
pub struct MockTransport {
    responses: Mutex<Vec<Result<Option<GenerateContentResponse>, ProviderError>>>,
    cache_result: Mutex<Result<String, ProviderError>>,
    pub requests: Mutex<Vec<ModelRequest>>,
    pub caches_created: Mutex<Vec<(String, CacheContents)>>,
}

impl MockTransport {
    pub fn new(responses: Vec<Result<Option<GenerateContentResponse>, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            cache_result: Mutex::new(Ok("projects/p/locations/l/cachedContents/1".into())),
            requests: Mutex::new(Vec::new()),
            caches_created: Mutex::new(Vec::new()),
        }
    }

    /// Every generate call answers `text` with finish reason STOP.
    pub fn text(text: &str, calls: usize) -> Self {
        Self::new((0..calls).map(|_| Ok(Some(envelope(text, "STOP")))).collect())
    }

    pub fn failing_cache(self, err: ProviderError) -> Self {
        *self.cache_result.lock().unwrap() = Err(err);
        self
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn cache_creations(&self) -> usize {
        self.caches_created.lock().unwrap().len()
    }
}

#[async_trait]
impl BackendTransport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        _model_id: &str,
        request: &ModelRequest,
        _options: &CallOptions,
    ) -> Result<Option<GenerateContentResponse>, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            panic!("MockTransport: no more responses");
        }
        responses.remove(0)
    }

    async fn create_cache(
        &self,
        model_id: &str,
        contents: &CacheContents,
    ) -> Result<String, ProviderError> {
        let result = self.cache_result.lock().unwrap().clone();
        if result.is_ok() {
            self.caches_created
                .lock()
                .unwrap()
                .push((model_id.to_string(), contents.clone()));
        }
        result
    }
}

/// Build a single-candidate envelope.
pub fn envelope(text: &str, finish_reason: &str) -> GenerateContentResponse {
    GenerateContentResponse {
        candidates: vec![Candidate {
            content: Some(Content {
                role: Some("model".into()),
                parts: vec![Part {
                    text: Some(text.into()),
                }],
            }),
            finish_reason: Some(finish_reason.to_string().into()),
            finish_message: None,
        }],
        usage_metadata: Some(UsageMetadata {
            prompt_token_count: Some(100),
            candidates_token_count: Some(20),
            total_token_count: Some(120),
        }),
    }
}

/// A clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc::now()),
        }
    }

    pub fn advance(&self, secs: i64) {
        *self.now.lock().unwrap() += Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
