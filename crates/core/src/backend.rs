//! Backend capabilities: the provider transport and its credentials.
//!
//! A [`BackendTransport`] knows how to send one [`ModelRequest`] to the
//! provider and return the raw response envelope, and how to create a
//! server-side context cache. The engine never sees HTTP.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::error::ProviderError;
use crate::model::{GenerateContentResponse, GenerationConfig, ModelRequest};

/// A bearer token and the instant it stops being valid.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expiry: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty() && now < self.expiry
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[REDACTED]")
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// Supplies access tokens for the provider.
#[async_trait]
pub trait Credentials: Send + Sync {
    async fn access_token(&self) -> Result<AccessToken, ProviderError>;
}

/// Per-call settings that are not part of the request shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallOptions {
    pub generation: GenerationConfig,
    /// Always explicit; repository-scale calls take 30–120 seconds.
    pub timeout: Duration,
}

/// What a new context cache holds.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheContents {
    pub system_instruction: String,
    pub context: String,
    pub ttl_secs: u64,
}

/// The transport to the model provider.
#[async_trait]
pub trait BackendTransport: Send + Sync {
    /// A human-readable name for this transport (e.g. "vertex-rest").
    fn name(&self) -> &str;

    /// Send one generate call.
    ///
    /// `Ok(None)` means the call succeeded but carried no response envelope.
    async fn generate(
        &self,
        model_id: &str,
        request: &ModelRequest,
        options: &CallOptions,
    ) -> Result<Option<GenerateContentResponse>, ProviderError>;

    /// Create a context cache and return its resource name.
    ///
    /// Default implementation reports that caching is unsupported.
    async fn create_cache(
        &self,
        _model_id: &str,
        _contents: &CacheContents,
    ) -> Result<String, ProviderError> {
        Err(ProviderError::NotConfigured(format!(
            "Transport '{}' does not support context caches",
            self.name()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_debug_is_redacted() {
        let token = AccessToken {
            token: "ya29.secret".into(),
            expiry: Utc::now(),
        };
        let debug = format!("{token:?}");
        assert!(!debug.contains("ya29"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn token_validity_window() {
        let now = Utc::now();
        let token = AccessToken {
            token: "t".into(),
            expiry: now + chrono::Duration::seconds(10),
        };
        assert!(token.is_valid_at(now));
        assert!(!token.is_valid_at(now + chrono::Duration::seconds(10)));
    }

    struct GenerateOnly;

    #[async_trait]
    impl BackendTransport for GenerateOnly {
        fn name(&self) -> &str {
            "generate-only"
        }

        async fn generate(
            &self,
            _model_id: &str,
            _request: &ModelRequest,
            _options: &CallOptions,
        ) -> Result<Option<GenerateContentResponse>, ProviderError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn default_create_cache_is_unsupported() {
        let contents = CacheContents {
            system_instruction: "sys".into(),
            context: "<context></context>".into(),
            ttl_secs: 60,
        };
        let err = GenerateOnly.create_cache("m1", &contents).await.unwrap_err();
        assert!(err.to_string().contains("generate-only"));
    }
}
