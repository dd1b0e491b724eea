use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::engine::VectorEngine;
use crate::error::{VoiceError, VoiceResult};
use crate::id::new_point_id;
use crate::models::{
    Identification, Metadata, Point, PointFilter, SearchHit, SearchRequest, SpeakerPayload,
};
use crate::scan::PayloadScan;

/// Minimum cosine similarity accepted as a positive identification.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.7;

/// Speaker embedding store over a single collection.
///
/// The engine handle is injected by the caller; the store never creates
/// or looks up a client on its own.
pub struct VoiceStore<E: VectorEngine> {
    engine: E,
    config: StoreConfig,
}

impl<E: VectorEngine> VoiceStore<E> {
    /// Validate `config`, make sure the collection exists, and return the store.
    #[instrument(skip(engine, config), fields(collection = %config.collection))]
    pub async fn open(engine: E, config: StoreConfig) -> VoiceResult<Self> {
        config.validate()?;
        let store = Self { engine, config };
        store.bootstrap().await?;
        Ok(store)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn collection(&self) -> &str {
        &self.config.collection
    }

    // ===== Collection Bootstrap =====

    /// Create the collection if it is missing.
    ///
    /// Running it again against an existing collection with the same
    /// dimension and metric does nothing; any difference is a
    /// [`VoiceError::Config`].
    pub async fn bootstrap(&self) -> VoiceResult<()> {
        let spec = self.config.collection_spec();
        let existing = self.engine.list_collections().await?;

        if !existing.iter().any(|name| name == &spec.name) {
            self.engine.create_collection(&spec).await?;
            info!(
                collection = %spec.name,
                dimension = spec.dimension,
                distance = %spec.distance,
                "Created collection"
            );
            return Ok(());
        }

        let stats = self.engine.collection_stats(&spec.name).await?;
        if stats.dimension != spec.dimension || stats.distance != spec.distance {
            return Err(VoiceError::Config(format!(
                "collection '{}' exists with {} dimensions and {} distance, requested {} and {}",
                spec.name, stats.dimension, stats.distance, spec.dimension, spec.distance
            )));
        }

        debug!(collection = %spec.name, points = stats.points_count, "Collection already present");
        Ok(())
    }

    // ===== Upsert Pipeline =====

    fn check_vector(&self, vector: &[f32]) -> VoiceResult<()> {
        if vector.len() != self.config.dimension as usize {
            return Err(VoiceError::dimension_mismatch(
                self.config.dimension,
                vector.len(),
            ));
        }
        Ok(())
    }

    fn check_speaker(speaker: &str) -> VoiceResult<()> {
        if speaker.trim().is_empty() {
            return Err(VoiceError::Validation(
                "speaker label must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn build_point(&self, vector: Vec<f32>, payload: SpeakerPayload) -> VoiceResult<Point> {
        Self::check_speaker(&payload.speaker)?;
        self.check_vector(&vector)?;
        Ok(Point {
            id: new_point_id(),
            vector,
            payload: payload.into_payload()?,
        })
    }

    async fn write(&self, points: Vec<Point>) -> VoiceResult<Vec<Uuid>> {
        let ids = points.iter().map(|p| p.id).collect();
        self.engine.upsert(self.collection(), points).await?;
        Ok(ids)
    }

    /// Store one embedding for `speaker` and return its new point id.
    #[instrument(skip(self, vector, metadata), fields(collection = %self.config.collection))]
    pub async fn upsert_embedding(
        &self,
        vector: Vec<f32>,
        speaker: &str,
        metadata: Option<Metadata>,
    ) -> VoiceResult<Uuid> {
        let payload = SpeakerPayload::new(speaker).with_metadata(metadata.unwrap_or_default());
        let point = self.build_point(vector, payload)?;
        let id = point.id;

        self.write(vec![point]).await?;
        info!(%id, speaker, "Upserted embedding");

        Ok(id)
    }

    /// Store `vectors[i]` under `speakers[i]` in one request.
    ///
    /// Both sequences must have the same length. Ids come back in input order.
    #[instrument(skip_all, fields(collection = %self.config.collection, count = vectors.len()))]
    pub async fn upsert_embeddings<S: AsRef<str>>(
        &self,
        vectors: Vec<Vec<f32>>,
        speakers: &[S],
    ) -> VoiceResult<Vec<Uuid>> {
        if vectors.len() != speakers.len() {
            return Err(VoiceError::Validation(format!(
                "{} vectors but {} speaker labels",
                vectors.len(),
                speakers.len()
            )));
        }
        if vectors.is_empty() {
            return Ok(Vec::new());
        }

        let points = vectors
            .into_iter()
            .zip(speakers)
            .map(|(vector, speaker)| {
                self.build_point(vector, SpeakerPayload::new(speaker.as_ref()))
            })
            .collect::<VoiceResult<Vec<_>>>()?;

        let ids = self.write(points).await?;
        info!(count = ids.len(), "Upserted embeddings");

        Ok(ids)
    }

    /// Store several samples of one speaker, each tagged with its sample
    /// index and the sample total, with `metadata` merged into every payload.
    #[instrument(skip(self, vectors, metadata), fields(collection = %self.config.collection))]
    pub async fn add_speaker_samples(
        &self,
        speaker: &str,
        vectors: Vec<Vec<f32>>,
        metadata: Option<Metadata>,
    ) -> VoiceResult<Vec<Uuid>> {
        if vectors.is_empty() {
            debug!("No embeddings provided");
            return Ok(Vec::new());
        }

        let total = u32::try_from(vectors.len())
            .map_err(|_| VoiceError::Validation("too many samples in one batch".to_string()))?;
        let metadata = metadata.unwrap_or_default();

        let points = vectors
            .into_iter()
            .zip(0..total)
            .map(|(vector, index)| {
                let payload = SpeakerPayload::new(speaker)
                    .with_sample(index, total)
                    .with_metadata(metadata.clone());
                self.build_point(vector, payload)
            })
            .collect::<VoiceResult<Vec<_>>>()?;

        let ids = self.write(points).await?;
        info!(count = ids.len(), speaker, "Added speaker samples");

        Ok(ids)
    }

    // ===== Pagination Scanner =====

    /// Start a payload-only scan over the whole collection.
    pub fn scan(&self) -> PayloadScan<'_, E> {
        PayloadScan::new(&self.engine, self.collection(), self.config.page_size)
    }

    /// Distinct speaker names, sorted lexicographically.
    #[instrument(skip(self), fields(collection = %self.config.collection))]
    pub async fn get_all_speakers(&self) -> VoiceResult<Vec<String>> {
        let speakers = self
            .scan()
            .fold_speakers(BTreeSet::new(), |mut set, speaker| {
                set.insert(speaker.to_string());
                set
            })
            .await?;

        Ok(speakers.into_iter().collect())
    }

    /// Number of stored embeddings per speaker.
    #[instrument(skip(self), fields(collection = %self.config.collection))]
    pub async fn get_speaker_count(&self) -> VoiceResult<HashMap<String, u64>> {
        self.scan()
            .fold_speakers(HashMap::new(), |mut counts, speaker| {
                *counts.entry(speaker.to_string()).or_insert(0) += 1;
                counts
            })
            .await
    }

    // ===== Search & Identification =====

    /// Up to `top_k` nearest stored embeddings, best first.
    ///
    /// With `score_threshold`, the engine drops hits that do not reach it.
    pub async fn search_similar(
        &self,
        vector: &[f32],
        top_k: u64,
        score_threshold: Option<f64>,
    ) -> VoiceResult<Vec<SearchHit>> {
        self.check_vector(vector)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let request = SearchRequest {
            vector: vector.to_vec(),
            limit: top_k,
            score_threshold,
        };
        self.engine.search(self.collection(), request).await
    }

    /// Decide who is speaking from the single nearest neighbour.
    #[instrument(skip(self, vector), fields(collection = %self.config.collection))]
    pub async fn identify_speaker(
        &self,
        vector: &[f32],
        threshold: f64,
    ) -> VoiceResult<Identification> {
        let hits = self.search_similar(vector, 1, None).await?;
        let top = hits.first();

        if let Some(hit) = top.filter(|h| h.speaker().is_none()) {
            warn!(id = %hit.id, "Nearest neighbour carries no speaker label");
        }

        let identification = Identification::decide(top, threshold, self.config.distance);
        debug!(
            speaker = ?identification.speaker,
            confidence = identification.confidence,
            matched = identification.matched,
            "Identification"
        );

        Ok(identification)
    }

    // ===== Lifecycle =====

    /// Current point count as reported by the engine.
    pub async fn count(&self) -> VoiceResult<u64> {
        self.engine
            .count_points(self.collection(), &PointFilter::All)
            .await
    }

    /// Delete every point; the collection stays usable. Returns how many
    /// points the collection held right before.
    #[instrument(skip(self), fields(collection = %self.config.collection))]
    pub async fn clear(&self) -> VoiceResult<u64> {
        let removed = self.count().await?;
        self.engine
            .delete_points(self.collection(), &PointFilter::All)
            .await?;
        info!(removed, "Cleared collection");
        Ok(removed)
    }

    /// Delete every embedding of one speaker.
    #[instrument(skip(self), fields(collection = %self.config.collection))]
    pub async fn remove_speaker(&self, speaker: &str) -> VoiceResult<u64> {
        Self::check_speaker(speaker)?;
        let filter = PointFilter::Speaker(speaker.to_string());

        let removed = self
            .engine
            .count_points(self.collection(), &filter)
            .await?;
        if removed > 0 {
            self.engine
                .delete_points(self.collection(), &filter)
                .await?;
        }
        info!(removed, speaker, "Removed speaker");
        Ok(removed)
    }

    /// Drop the collection. Every later operation fails with
    /// [`VoiceError::NotFound`] until [`bootstrap`](Self::bootstrap) runs again.
    #[instrument(skip(self), fields(collection = %self.config.collection))]
    pub async fn delete_collection(&self) -> VoiceResult<u64> {
        let stats = self.engine.collection_stats(self.collection()).await?;
        self.engine.delete_collection(self.collection()).await?;
        info!(removed = stats.points_count, "Deleted collection");
        Ok(stats.points_count)
    }
}
