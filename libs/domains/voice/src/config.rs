use core_config::{ConfigError, FromEnv, env_or_default, env_parse};

use crate::error::{VoiceError, VoiceResult};
use crate::models::{CollectionSpec, DistanceMetric};

/// Output size of the speaker encoder the collection is populated from.
pub const DEFAULT_DIMENSION: u32 = 256;
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_COLLECTION: &str = "voice_embeddings";

/// Settings for the collection a [`VoiceStore`](crate::VoiceStore) manages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub collection: String,
    pub dimension: u32,
    pub distance: DistanceMetric,
    /// Points requested per scroll page during full-collection scans
    pub page_size: u32,
}

impl StoreConfig {
    pub fn new(collection: impl Into<String>, dimension: u32) -> Self {
        Self {
            collection: collection.into(),
            dimension,
            distance: DistanceMetric::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_distance(mut self, distance: DistanceMetric) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn validate(&self) -> VoiceResult<()> {
        if self.collection.trim().is_empty() {
            return Err(VoiceError::Config("collection name is empty".to_string()));
        }
        if self.dimension == 0 {
            return Err(VoiceError::Config(
                "vector dimension must be positive".to_string(),
            ));
        }
        if self.page_size == 0 {
            return Err(VoiceError::Config(
                "scan page size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn collection_spec(&self) -> CollectionSpec {
        CollectionSpec {
            name: self.collection.clone(),
            dimension: self.dimension,
            distance: self.distance,
        }
    }
}

impl FromEnv for StoreConfig {
    /// Reads:
    /// - `VOICE_COLLECTION` (default `voice_embeddings`)
    /// - `VOICE_DIMENSION` (default 256)
    /// - `VOICE_DISTANCE` (default `cosine`)
    /// - `VOICE_SCAN_PAGE_SIZE` (default 100)
    fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            collection: env_or_default("VOICE_COLLECTION", DEFAULT_COLLECTION),
            dimension: env_parse("VOICE_DIMENSION", DEFAULT_DIMENSION)?,
            distance: env_parse("VOICE_DISTANCE", DistanceMetric::default())?,
            page_size: env_parse("VOICE_SCAN_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
        };

        config.validate().map_err(|e| ConfigError::Invalid {
            key: "VOICE_*".to_string(),
            details: e.to_string(),
        })?;

        Ok(config)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_COLLECTION, DEFAULT_DIMENSION)
    }
}
