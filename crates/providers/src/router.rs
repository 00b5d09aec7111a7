//! Transport router: selects the transport per request shape.
//!
//! Fresh requests go to the configured fresh transport (the prediction
//! client by default); cached requests and cache creation always go to the
//! REST transport, the only one that knows about context caches.

use async_trait::async_trait;
use recast_config::{AppConfig, ConfigError, FreshTransport};
use recast_core::backend::{BackendTransport, CacheContents, CallOptions, Credentials};
use recast_core::error::ProviderError;
use recast_core::model::{GenerateContentResponse, ModelRequest};
use std::sync::Arc;
use tracing::trace;

use crate::auth::{GcloudCredentials, StaticToken};
use crate::endpoint::VertexEndpoint;
use crate::prediction::PredictionClient;
use crate::rest::RestTransport;

/// Routes each request to the transport that can carry its shape.
pub struct TransportRouter {
    fresh: Arc<dyn BackendTransport>,
    cached: Arc<dyn BackendTransport>,
}

impl TransportRouter {
    pub fn new(fresh: Arc<dyn BackendTransport>, cached: Arc<dyn BackendTransport>) -> Self {
        Self { fresh, cached }
    }

    /// The transport a request of this shape would use.
    pub fn select(&self, request: &ModelRequest) -> &Arc<dyn BackendTransport> {
        match request {
            ModelRequest::Fresh { .. } => &self.fresh,
            ModelRequest::Cached { .. } => &self.cached,
        }
    }
}

#[async_trait]
impl BackendTransport for TransportRouter {
    fn name(&self) -> &str {
        "vertex"
    }

    async fn generate(
        &self,
        model_id: &str,
        request: &ModelRequest,
        options: &CallOptions,
    ) -> Result<Option<GenerateContentResponse>, ProviderError> {
        let transport = self.select(request);
        trace!(transport = transport.name(), shape = request.shape(), "Routing request");
        transport.generate(model_id, request, options).await
    }

    async fn create_cache(
        &self,
        model_id: &str,
        contents: &CacheContents,
    ) -> Result<String, ProviderError> {
        self.cached.create_cache(model_id, contents).await
    }
}

/// Pick the credentials the configuration asks for.
pub fn credentials_from_config(config: &AppConfig) -> Arc<dyn Credentials> {
    match config.access_token.as_deref() {
        Some(token) => Arc::new(StaticToken::new(token)),
        None => Arc::new(GcloudCredentials::new()),
    }
}

/// Build the router from configuration.
pub fn build_from_config(config: &AppConfig) -> Result<TransportRouter, ConfigError> {
    let project_id = config.require_project()?;

    let mut endpoint = VertexEndpoint::new(project_id, &config.location_id);
    if let Some(api_url) = &config.backend.api_url {
        endpoint = endpoint.with_base_url(api_url);
    }

    let credentials = credentials_from_config(config);

    let rest: Arc<dyn BackendTransport> = Arc::new(
        RestTransport::new(endpoint.clone(), credentials.clone())
            .with_cache_timeout(config.generation.timeout()),
    );

    let fresh: Arc<dyn BackendTransport> = match config.backend.fresh_transport {
        FreshTransport::Prediction => Arc::new(PredictionClient::new(endpoint, credentials)),
        FreshTransport::Rest => rest.clone(),
    };

    Ok(TransportRouter::new(fresh, rest))
}
