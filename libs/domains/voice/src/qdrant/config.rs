use core_config::{ConfigError, FromEnv, env_or_default, env_parse};

/// Qdrant connection configuration
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    /// gRPC endpoint
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Web UI served by the same instance
    pub dashboard_url: String,
}

impl QdrantConfig {
    pub fn new(url: String) -> Self {
        Self {
            url,
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_dashboard_url(mut self, url: String) -> Self {
        self.dashboard_url = url;
        self
    }
}

impl FromEnv for QdrantConfig {
    /// Reads `QDRANT_URL`, `QDRANT_API_KEY`, `QDRANT_TIMEOUT_SECS` and
    /// `QDRANT_DASHBOARD_URL`.
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env_or_default("QDRANT_URL", "http://localhost:6334"),
            api_key: std::env::var("QDRANT_API_KEY").ok(),
            timeout_secs: env_parse("QDRANT_TIMEOUT_SECS", 30)?,
            dashboard_url: env_or_default(
                "QDRANT_DASHBOARD_URL",
                "http://localhost:6333/dashboard",
            ),
        })
    }
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            api_key: None,
            timeout_secs: 30,
            dashboard_url: "http://localhost:6333/dashboard".to_string(),
        }
    }
}
