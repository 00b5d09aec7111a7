//! Raw REST transport for Vertex AI.
//!
//! Talks to the `v1beta1` surface directly because that is where the
//! context-cache API lives. Handles both request shapes and cache
//! creation, authenticated with a bearer token from [`Credentials`].

use async_trait::async_trait;
use recast_core::backend::{BackendTransport, CacheContents, CallOptions, Credentials};
use recast_core::error::ProviderError;
use recast_core::model::{GenerateContentResponse, ModelRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::api::{CachedContentResponse, CreateCachedContentRequest, GenerateContentRequest};
use crate::endpoint::{ApiVersion, VertexEndpoint};
use crate::http;

/// Cache creation uploads the whole context; give it the generation ceiling.
const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_secs(120);

pub struct RestTransport {
    name: String,
    endpoint: VertexEndpoint,
    credentials: Arc<dyn Credentials>,
    client: reqwest::Client,
    cache_timeout: Duration,
}

impl RestTransport {
    pub fn new(endpoint: VertexEndpoint, credentials: Arc<dyn Credentials>) -> Self {
        Self {
            name: "vertex-rest".into(),
            endpoint,
            credentials,
            client: reqwest::Client::new(),
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
        }
    }

    /// Override the timeout for cache creation calls.
    pub fn with_cache_timeout(mut self, timeout: Duration) -> Self {
        self.cache_timeout = timeout;
        self
    }
}

#[async_trait]
impl BackendTransport for RestTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        model_id: &str,
        request: &ModelRequest,
        options: &CallOptions,
    ) -> Result<Option<GenerateContentResponse>, ProviderError> {
        let url = self.endpoint.generate_url(ApiVersion::V1Beta1, model_id);
        let body = GenerateContentRequest::new(request, &options.generation);
        let token = self.credentials.access_token().await?;

        debug!(
            transport = %self.name,
            model = %model_id,
            shape = request.shape(),
            "Sending generate request"
        );

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

    async fn create_cache(
        &self,
        model_id: &str,
        contents: &CacheContents,
    ) -> Result<String, ProviderError> {
        let url = self.endpoint.cached_contents_url();
        let body = CreateCachedContentRequest::new(self.endpoint.model_resource(model_id), contents);
        let token = self.credentials.access_token().await?;

        debug!(
            transport = %self.name,
            model = %model_id,
            context_bytes = contents.context.len(),
            ttl_secs = contents.ttl_secs,
            "Creating context cache"
        );

        let text = http::post_json(
            &self.client,
            &url,
            &token.token,
            &body,
            self.cache_timeout,
            &self.name,
        )
        .await?;

        let created: CachedContentResponse = http::parse_json(&text)?;
        if created.name.is_empty() {
            return Err(ProviderError::Parse(
                "cachedContents response has an empty name".into(),
            ));
        }

        info!(cache = %created.name, model = %model_id, "Context cache created");
        Ok(created.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use recast_core::model::{FinishReason, GenerationConfig};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL_PATH: &str =
        "/v1beta1/projects/p/locations/l/publishers/google/models/m1:generateContent";

    fn transport(server: &MockServer) -> RestTransport {
        let endpoint = VertexEndpoint::new("p", "l").with_base_url(server.uri());
        RestTransport::new(endpoint, Arc::new(StaticToken::new("test-token")))
    }

    fn options() -> CallOptions {
        CallOptions {
            generation: GenerationConfig::default(),
            timeout: Duration::from_secs(30),
        }
    }

    fn cached_request() -> ModelRequest {
        ModelRequest::Cached {
            cached_content: "projects/p/locations/l/cachedContents/7".into(),
            user_parts: vec!["migrate".into()],
        }
    }

    #[tokio::test]
    async fn cached_generate_sends_reference_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(header("authorization", "Bearer test-token"))
            .and(body_partial_json(serde_json::json!({
                "cachedContent": "projects/p/locations/l/cachedContents/7"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "done"}]},
                    "finishReason": "STOP"
                }],
                "usageMetadata": {"totalTokenCount": 12}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let envelope = transport(&server)
            .generate("m1", &cached_request(), &options())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(envelope.candidates[0].text(), "done");
        assert_eq!(envelope.candidates[0].finish_reason, Some(FinishReason::Stop));
        assert_eq!(envelope.usage_metadata.unwrap().total_token_count, Some(12));
    }

    #[tokio::test]
    async fn empty_body_is_no_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let envelope = transport(&server)
            .generate("m1", &cached_request(), &options())
            .await
            .unwrap();
        assert!(envelope.is_none());
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
            .mount(&server)
            .await;

        let err = transport(&server)
            .generate("m1", &cached_request(), &options())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn server_error_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
            .mount(&server)
            .await;

        let err = transport(&server)
            .generate("m1", &cached_request(), &options())
            .await
            .unwrap_err();
        match err {
            ProviderError::ApiError { status_code, message } => {
                assert_eq!(status_code, 500);
                assert_eq!(message, "internal");
            }
            other => panic!("Expected ApiError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_cache_returns_resource_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta1/projects/p/locations/l/cachedContents"))
            .and(body_partial_json(serde_json::json!({
                "model": "projects/p/locations/l/publishers/google/models/m1",
                "ttl": "3600s"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "projects/p/locations/l/cachedContents/99",
                "model": "projects/p/locations/l/publishers/google/models/m1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let contents = CacheContents {
            system_instruction: "sys".into(),
            context: "<context>code</context>".into(),
            ttl_secs: 3600,
        };
        let name = transport(&server).create_cache("m1", &contents).await.unwrap();
        assert_eq!(name, "projects/p/locations/l/cachedContents/99");
    }

    #[tokio::test]
    async fn create_cache_rejected_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("content too small"))
            .mount(&server)
            .await;

        let contents = CacheContents {
            system_instruction: "sys".into(),
            context: "tiny".into(),
            ttl_secs: 60,
        };
        let err = transport(&server).create_cache("m1", &contents).await.unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status_code: 400, .. }));
    }
}
