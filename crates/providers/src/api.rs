//! Vertex AI request bodies.
//!
//! Response types live in `recast_core::model` because the engine reads
//! them; request bodies are transport business and stay here.
//!
//! Empty text parts are dropped on the wire: the backend rejects them and
//! an absent context block is represented as an empty part upstream.

use recast_core::backend::CacheContents;
use recast_core::model::{GenerationConfig, ModelRequest};
use serde::{Deserialize, Serialize};

/// Body of a `:generateContent` call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest<'a> {
    pub contents: Vec<WireContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<WireContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_content: Option<&'a str>,
    pub generation_config: &'a GenerationConfig,
}

impl<'a> GenerateContentRequest<'a> {
    pub fn new(request: &'a ModelRequest, generation_config: &'a GenerationConfig) -> Self {
        let user = WireContent::new("user", request.user_parts().iter().map(String::as_str));

        match request {
            ModelRequest::Fresh {
                system_instruction, ..
            } => Self {
                contents: vec![user],
                system_instruction: Some(WireContent::new(
                    "system",
                    std::iter::once(system_instruction.as_str()),
                )),
                cached_content: None,
                generation_config,
            },
            ModelRequest::Cached { cached_content, .. } => Self {
                contents: vec![user],
                system_instruction: None,
                cached_content: Some(cached_content),
                generation_config,
            },
        }
    }
}

/// Body of a `cachedContents` create call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCachedContentRequest<'a> {
    /// Full model resource name.
    pub model: String,
    pub system_instruction: WireContent<'a>,
    pub contents: Vec<WireContent<'a>>,
    /// Duration string such as `"3600s"`.
    pub ttl: String,
}

impl<'a> CreateCachedContentRequest<'a> {
    pub fn new(model_resource: String, contents: &'a CacheContents) -> Self {
        Self {
            model: model_resource,
            system_instruction: WireContent::new(
                "system",
                std::iter::once(contents.system_instruction.as_str()),
            ),
            contents: vec![WireContent::new(
                "user",
                std::iter::once(contents.context.as_str()),
            )],
            ttl: format!("{}s", contents.ttl_secs),
        }
    }
}

/// The part of a `CachedContent` resource we read back.
#[derive(Debug, Deserialize)]
pub struct CachedContentResponse {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct WireContent<'a> {
    pub role: &'static str,
    pub parts: Vec<WirePart<'a>>,
}

impl<'a> WireContent<'a> {
    fn new(role: &'static str, texts: impl Iterator<Item = &'a str>) -> Self {
        Self {
            role,
            parts: texts
                .filter(|t| !t.is_empty())
                .map(|text| WirePart { text })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WirePart<'a> {
    pub text: &'a str,
}
