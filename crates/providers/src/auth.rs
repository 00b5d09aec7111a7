//! Access-token sources for Vertex AI.
//!
//! - [`StaticToken`]: a token supplied through config or `RECAST_ACCESS_TOKEN`
//! - [`GcloudCredentials`]: shells out to `gcloud auth print-access-token`
//!   and memoises the result until shortly before it expires

use async_trait::async_trait;
use chrono::{Duration, Utc};
use recast_core::backend::{AccessToken, Credentials};
use recast_core::error::ProviderError;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Lifetime gcloud gives user and service-account access tokens.
const GCLOUD_TOKEN_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the recorded expiry.
const REFRESH_MARGIN_SECS: i64 = 300;

/// A fixed bearer token.
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl Credentials for StaticToken {
    async fn access_token(&self) -> Result<AccessToken, ProviderError> {
        if self.token.trim().is_empty() {
            return Err(ProviderError::AuthenticationFailed(
                "configured access token is empty".into(),
            ));
        }
        // Expiry is unknown; report a rolling hour
        Ok(AccessToken {
            token: self.token.clone(),
            expiry: Utc::now() + Duration::seconds(GCLOUD_TOKEN_LIFETIME_SECS),
        })
    }
}

/// Tokens from the Google Cloud CLI's active account.
pub struct GcloudCredentials {
    gcloud_bin: String,
    cached: Mutex<Option<AccessToken>>,
}

impl GcloudCredentials {
    pub fn new() -> Self {
        Self::with_binary("gcloud")
    }

    /// Use a specific `gcloud` executable.
    pub fn with_binary(gcloud_bin: impl Into<String>) -> Self {
        Self {
            gcloud_bin: gcloud_bin.into(),
            cached: Mutex::new(None),
        }
    }

    async fn fetch(&self) -> Result<AccessToken, ProviderError> {
        debug!(gcloud_bin = %self.gcloud_bin, "requesting access token from gcloud");

        let output = Command::new(&self.gcloud_bin)
            .args(["auth", "print-access-token"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                ProviderError::AuthenticationFailed(format!(
                    "failed to run {} ({e}); install the Google Cloud CLI or set RECAST_ACCESS_TOKEN",
                    self.gcloud_bin
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(exit_code = ?output.status.code(), stderr = %stderr, "gcloud exited with error");
            return Err(ProviderError::AuthenticationFailed(format!(
                "gcloud auth print-access-token failed: {}",
                stderr.trim()
            )));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(ProviderError::AuthenticationFailed(
                "gcloud returned an empty access token".into(),
            ));
        }

        info!("obtained access token from gcloud");
        Ok(AccessToken {
            token,
            expiry: Utc::now() + Duration::seconds(GCLOUD_TOKEN_LIFETIME_SECS),
        })
    }
}

impl Default for GcloudCredentials {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Credentials for GcloudCredentials {
    async fn access_token(&self) -> Result<AccessToken, ProviderError> {
        let mut cached = self.cached.lock().await;
        let refresh_at = Utc::now() + Duration::seconds(REFRESH_MARGIN_SECS);

        if let Some(token) = cached.as_ref().filter(|t| t.is_valid_at(refresh_at)) {
            return Ok(token.clone());
        }

        let token = self.fetch().await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_token_returned() {
        let token = StaticToken::new("ya29.abc").access_token().await.unwrap();
        assert_eq!(token.token, "ya29.abc");
        assert!(token.is_valid_at(Utc::now()));
    }

    #[tokio::test]
    async fn empty_static_token_rejected() {
        let err = StaticToken::new("  ").access_token().await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn missing_gcloud_binary_is_auth_failure() {
        let creds = GcloudCredentials::with_binary("/nonexistent/gcloud-for-tests");
        let err = creds.access_token().await.unwrap_err();
        match err {
            ProviderError::AuthenticationFailed(msg) => assert!(msg.contains("RECAST_ACCESS_TOKEN")),
            other => panic!("Expected AuthenticationFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn memoised_token_reused_until_refresh_margin() {
        let creds = GcloudCredentials::with_binary("/nonexistent/gcloud-for-tests");
        *creds.cached.lock().await = Some(AccessToken {
            token: "cached".into(),
            expiry: Utc::now() + Duration::seconds(1800),
        });
        // Binary does not exist, so a fetch would fail
        assert_eq!(creds.access_token().await.unwrap().token, "cached");

        *creds.cached.lock().await = Some(AccessToken {
            token: "stale".into(),
            expiry: Utc::now() + Duration::seconds(60),
        });
        assert!(creds.access_token().await.is_err());
    }
}
