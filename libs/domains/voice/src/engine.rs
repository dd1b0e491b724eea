use async_trait::async_trait;

use crate::error::VoiceResult;
use crate::models::{
    CollectionSpec, CollectionStats, Point, PointFilter, ScrollPage, ScrollRequest, SearchHit,
    SearchRequest,
};

/// The remote vector engine the store delegates to.
///
/// Every call is one request/response round trip. Implementations must
/// report a missing collection as `VoiceError::NotFound` and transport
/// failures as `VoiceError::Connectivity`; they never retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorEngine: Send + Sync {
    // ===== Collection Management =====

    /// Names of every collection the engine holds
    async fn list_collections(&self) -> VoiceResult<Vec<String>>;

    /// Create a collection with the given vector parameters
    async fn create_collection(&self, spec: &CollectionSpec) -> VoiceResult<()>;

    /// Vector parameters and exact point count of an existing collection
    async fn collection_stats(&self, collection: &str) -> VoiceResult<CollectionStats>;

    /// Drop a collection together with all of its points
    async fn delete_collection(&self, collection: &str) -> VoiceResult<()>;

    // ===== Point Operations =====

    /// Write all points in a single request.
    ///
    /// Returns only once the engine confirms the whole batch is applied.
    async fn upsert(&self, collection: &str, points: Vec<Point>) -> VoiceResult<()>;

    /// Nearest neighbours of `request.vector`, best first
    async fn search(
        &self,
        collection: &str,
        request: SearchRequest,
    ) -> VoiceResult<Vec<SearchHit>>;

    /// One page of payloads, without vectors
    async fn scroll(&self, collection: &str, request: ScrollRequest) -> VoiceResult<ScrollPage>;

    /// Exact number of points matching `filter`
    async fn count_points(&self, collection: &str, filter: &PointFilter) -> VoiceResult<u64>;

    /// Delete every point matching `filter`; the collection itself survives
    async fn delete_points(&self, collection: &str, filter: &PointFilter) -> VoiceResult<()>;
}
