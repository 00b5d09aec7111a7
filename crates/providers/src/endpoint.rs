//! Vertex AI resource names and URLs.

/// API surface version. The cache API is only published on `v1beta1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    V1,
    V1Beta1,
}

impl ApiVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V1Beta1 => "v1beta1",
        }
    }
}

/// A project/location pair and the regional host serving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexEndpoint {
    base_url: String,
    project_id: String,
    location_id: String,
}

impl VertexEndpoint {
    pub fn new(project_id: impl Into<String>, location_id: impl Into<String>) -> Self {
        let location_id = location_id.into();
        Self {
            base_url: format!("https://{location_id}-aiplatform.googleapis.com"),
            project_id: project_id.into(),
            location_id,
        }
    }

    /// Use a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `projects/{project}/locations/{location}`
    pub fn location_path(&self) -> String {
        format!("projects/{}/locations/{}", self.project_id, self.location_id)
    }

    /// Full resource name of a Google-published model.
    pub fn model_resource(&self, model_id: &str) -> String {
        format!("{}/publishers/google/models/{model_id}", self.location_path())
    }

    pub fn generate_url(&self, version: ApiVersion, model_id: &str) -> String {
        format!(
            "{}/{}/{}:generateContent",
            self.base_url,
            version.as_str(),
            self.model_resource(model_id)
        )
    }

    pub fn cached_contents_url(&self) -> String {
        format!(
            "{}/{}/{}/cachedContents",
            self.base_url,
            ApiVersion::V1Beta1.as_str(),
            self.location_path()
        )
    }
}
