//! Request and response model shared by the engine and the transports.
//!
//! [`ModelRequest`] is the sum type the engine hands to a transport: either a
//! fresh request carrying the system instruction and the full context, or a
//! cached request carrying only a cache reference. The shapes share no
//! fields, so a request can never carry both.
//!
//! [`GenerateContentResponse`] mirrors the provider's response envelope and
//! [`ModelResponse`] is the engine's interpretation of it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sampling parameters sent with every generate call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub candidate_count: u32,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            candidate_count: 1,
            max_output_tokens: 8192,
            temperature: 0.2,
            top_p: 1.0,
        }
    }
}

/// The payload for one generate call.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelRequest {
    /// System instruction and context travel inline with the prompt.
    Fresh {
        system_instruction: String,
        user_parts: Vec<String>,
    },
    /// System instruction and context already live server-side.
    Cached {
        cached_content: String,
        user_parts: Vec<String>,
    },
}

impl ModelRequest {
    /// Short name of the shape, for logs and errors.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Fresh { .. } => "fresh",
            Self::Cached { .. } => "cached",
        }
    }

    pub fn user_parts(&self) -> &[String] {
        match self {
            Self::Fresh { user_parts, .. } | Self::Cached { user_parts, .. } => user_parts,
        }
    }

    pub fn cache_ref(&self) -> Option<&str> {
        match self {
            Self::Cached { cached_content, .. } => Some(cached_content),
            Self::Fresh { .. } => None,
        }
    }

    pub fn system_instruction(&self) -> Option<&str> {
        match self {
            Self::Fresh {
                system_instruction, ..
            } => Some(system_instruction),
            Self::Cached { .. } => None,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached { .. })
    }
}

/// Why the backend stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    /// Missing or `FINISH_REASON_UNSPECIFIED`.
    Unspecified,
    Other(String),
}

impl FinishReason {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Stop => "STOP",
            Self::MaxTokens => "MAX_TOKENS",
            Self::Safety => "SAFETY",
            Self::Recitation => "RECITATION",
            Self::Unspecified => "FINISH_REASON_UNSPECIFIED",
            Self::Other(reason) => reason,
        }
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Stop)
    }
}

impl From<String> for FinishReason {
    fn from(value: String) -> Self {
        match value.as_str() {
            "STOP" => Self::Stop,
            "MAX_TOKENS" => Self::MaxTokens,
            "SAFETY" => Self::Safety,
            "RECITATION" => Self::Recitation,
            "" | "FINISH_REASON_UNSPECIFIED" => Self::Unspecified,
            _ => Self::Other(value),
        }
    }
}

impl From<FinishReason> for String {
    fn from(value: FinishReason) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Provider response envelope ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_message: Option<String>,
}

impl Candidate {
    /// Concatenated text of every text part.
    pub fn text(&self) -> String {
        self.content
            .as_ref()
            .map(|c| {
                c.parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: Option<u32>,
    #[serde(default)]
    pub candidates_token_count: Option<u32>,
    #[serde(default)]
    pub total_token_count: Option<u32>,
}

/// The engine's reading of a successful response.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    pub text: String,
    pub finish_reason: FinishReason,
    pub finish_message: Option<String>,
    /// `usageMetadata.totalTokenCount`, reported for observability only.
    pub token_count: Option<u32>,
}

/// A server-side context cache owned by the cache manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Resource name returned by the backend.
    pub id: String,
    pub model_id: String,
    pub created_at: DateTime<Utc>,
    pub ttl_secs: u64,
}

impl CacheEntry {
    pub fn expires_at(&self) -> DateTime<Utc> {
        i64::try_from(self.ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| self.created_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Expired once `now >= created_at + ttl`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    pub fn is_usable_for(&self, model_id: &str, now: DateTime<Utc>) -> bool {
        self.model_id == model_id && !self.is_expired(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_reason_parses_known_and_unknown_values() {
        assert_eq!(FinishReason::from("STOP".to_string()), FinishReason::Stop);
        assert_eq!(FinishReason::from("SAFETY".to_string()), FinishReason::Safety);
        assert_eq!(
            FinishReason::from("BLOCKLIST".to_string()),
            FinishReason::Other("BLOCKLIST".into())
        );
        assert_eq!(FinishReason::Other("BLOCKLIST".into()).to_string(), "BLOCKLIST");
    }

    #[test]
    fn parse_response_envelope() {
        let resp: GenerateContentResponse = serde_json::from_str(
            r#"{
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Hello "}, {"text": "world"}]},
                    "finishReason": "STOP"
                }],
                "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 4, "totalTokenCount": 14}
            }"#,
        )
        .unwrap();

        assert_eq!(resp.candidates.len(), 1);
        assert_eq!(resp.candidates[0].text(), "Hello world");
        assert_eq!(resp.candidates[0].finish_reason, Some(FinishReason::Stop));
        assert_eq!(resp.usage_metadata.unwrap().total_token_count, Some(14));
    }

    #[test]
    fn candidate_without_content_has_empty_text() {
        let resp: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"finishReason": "SAFETY", "finishMessage": "blocked"}]}"#,
        )
        .unwrap();
        assert_eq!(resp.candidates[0].text(), "");
        assert_eq!(resp.candidates[0].finish_message.as_deref(), Some("blocked"));
    }

    #[test]
    fn request_shapes_expose_disjoint_fields() {
        let fresh = ModelRequest::Fresh {
            system_instruction: "sys".into(),
            user_parts: vec!["ctx".into(), "prompt".into()],
        };
        assert_eq!(fresh.shape(), "fresh");
        assert!(fresh.cache_ref().is_none());
        assert_eq!(fresh.system_instruction(), Some("sys"));

        let cached = ModelRequest::Cached {
            cached_content: "projects/p/locations/l/cachedContents/1".into(),
            user_parts: vec!["prompt".into()],
        };
        assert!(cached.is_cached());
        assert!(cached.system_instruction().is_none());
        assert_eq!(cached.user_parts(), ["prompt".to_string()]);
    }

    #[test]
    fn cache_entry_expiry_boundary() {
        let created = Utc::now();
        let entry = CacheEntry {
            id: "c1".into(),
            model_id: "m1".into(),
            created_at: created,
            ttl_secs: 60,
        };
        assert!(!entry.is_expired(created + Duration::seconds(59)));
        assert!(entry.is_expired(created + Duration::seconds(60)));
        assert!(entry.is_usable_for("m1", created));
        assert!(!entry.is_usable_for("m2", created));
    }
}
