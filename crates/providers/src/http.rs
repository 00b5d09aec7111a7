//! Status mapping and envelope parsing shared by both transports.

use recast_core::error::ProviderError;
use recast_core::model::GenerateContentResponse;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// POST a JSON body with a bearer token and return the success body.
pub(crate) async fn post_json<B: Serialize + ?Sized>(
    client: &reqwest::Client,
    url: &str,
    token: &str,
    body: &B,
    timeout: Duration,
    transport: &str,
) -> Result<String, ProviderError> {
    debug!(transport, url, timeout_secs = timeout.as_secs(), "POST");

    let response = client
        .post(url)
        .header("Authorization", format!("Bearer {token}"))
        .header("Content-Type", "application/json")
        .timeout(timeout)
        .json(body)
        .send()
        .await
        .map_err(|e| send_error(e, timeout))?;

    checked_body(response, transport, timeout).await
}

pub(crate) fn send_error(err: reqwest::Error, timeout: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(timeout.as_secs())
    } else {
        ProviderError::Network(err.to_string())
    }
}

/// Turn a non-success status into a typed error, returning the body otherwise.
pub(crate) async fn checked_body(
    response: reqwest::Response,
    transport: &str,
    timeout: Duration,
) -> Result<String, ProviderError> {
    let status = response.status().as_u16();

    if status == 429 {
        return Err(ProviderError::RateLimited);
    }
    if status == 401 || status == 403 {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::AuthenticationFailed(format!(
            "Vertex AI rejected the access token (status {status}): {}",
            body.trim()
        )));
    }
    if !(200..300).contains(&status) {
        let error_body = response.text().await.unwrap_or_default();
        warn!(transport, status, body = %error_body, "Vertex AI error");
        return Err(ProviderError::ApiError {
            status_code: status,
            message: error_body,
        });
    }

    response.text().await.map_err(|e| send_error(e, timeout))
}

/// Parse a generate response; an empty or `null` body is "no envelope".
pub(crate) fn parse_envelope(body: &str) -> Result<Option<GenerateContentResponse>, ProviderError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    parse_json(body)
}

pub(crate) fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))
}
