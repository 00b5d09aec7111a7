//! Prediction-service client for Vertex AI.
//!
//! The typed client bound to the regional `v1` endpoint. It only speaks
//! the fresh request shape: the prediction API exposes no context caches,
//! so cached requests are refused with [`ProviderError::UnsupportedShape`]
//! and must be routed to the REST transport instead.

use async_trait::async_trait;
use recast_core::backend::{BackendTransport, CallOptions, Credentials};
use recast_core::error::ProviderError;
use recast_core::model::{GenerateContentResponse, ModelRequest};
use std::sync::Arc;
use tracing::debug;

use crate::api::GenerateContentRequest;
use crate::endpoint::{ApiVersion, VertexEndpoint};
use crate::http;

pub struct PredictionClient {
    name: String,
    endpoint: VertexEndpoint,
    credentials: Arc<dyn Credentials>,
    client: reqwest::Client,
}

impl PredictionClient {
    pub fn new(endpoint: VertexEndpoint, credentials: Arc<dyn Credentials>) -> Self {
        Self {
            name: "vertex-prediction".into(),
            endpoint,
            credentials,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl BackendTransport for PredictionClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        model_id: &str,
        request: &ModelRequest,
        options: &CallOptions,
    ) -> Result<Option<GenerateContentResponse>, ProviderError> {
        if request.is_cached() {
            return Err(ProviderError::UnsupportedShape {
                transport: self.name.clone(),
                shape: request.shape(),
            });
        }

        let url = self.endpoint.generate_url(ApiVersion::V1, model_id);
        let body = GenerateContentRequest::new(request, &options.generation);
        let token = self.credentials.access_token().await?;

        debug!(transport = %self.name, model = %model_id, "Sending generate request");

        let text = http::post_json(
            &self.client,
            &url,
            &token.token,
            &body,
            options.timeout,
            &self.name,
        )
        .await?;

        http::parse_envelope(&text)
    }
}
