use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    self, Condition, CountPointsBuilder, CreateCollectionBuilder, DeleteCollectionBuilder,
    DeletePointsBuilder, Distance, Filter, PointId, PointStruct,
    ScrollPointsBuilder, SearchPointsBuilder, UpdateStatus, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Qdrant, QdrantError};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::QdrantConfig;
use crate::engine::VectorEngine;
use crate::error::{VoiceError, VoiceResult};
use crate::models::{
    CollectionSpec, CollectionStats, Cursor, DistanceMetric, Payload, Point, PointFilter,
    SPEAKER_KEY, ScrollPage, ScrollRequest, ScrolledPoint, SearchHit, SearchRequest,
};

/// gRPC status code Qdrant answers with for a missing collection.
const GRPC_NOT_FOUND: i32 = 5;

/// Qdrant-backed implementation of [`VectorEngine`]
pub struct QdrantEngine {
    client: Qdrant,
}

impl QdrantEngine {
    pub fn connect(config: &QdrantConfig) -> VoiceResult<Self> {
        let mut builder =
            Qdrant::from_url(&config.url).timeout(Duration::from_secs(config.timeout_secs));

        if let Some(api_key) = &config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| VoiceError::Connectivity(format!("Failed to build client: {}", e)))?;

        Ok(Self { client })
    }

    /// Wrap an already configured client handle.
    pub fn from_client(client: Qdrant) -> Self {
        Self { client }
    }
}

fn engine_error(collection: &str, err: QdrantError) -> VoiceError {
    match err {
        QdrantError::ResponseError { status, .. } if status.code() as i32 == GRPC_NOT_FOUND => {
            VoiceError::collection_not_found(collection)
        }
        other => VoiceError::Connectivity(other.to_string()),
    }
}

fn to_qdrant_distance(metric: DistanceMetric) -> Distance {
    match metric {
        DistanceMetric::Cosine => Distance::Cosine,
        DistanceMetric::Euclidean => Distance::Euclid,
        DistanceMetric::DotProduct => Distance::Dot,
        DistanceMetric::Manhattan => Distance::Manhattan,
    }
}

fn from_qdrant_distance(distance: Distance) -> Option<DistanceMetric> {
    match distance {
        Distance::Cosine => Some(DistanceMetric::Cosine),
        Distance::Euclid => Some(DistanceMetric::Euclidean),
        Distance::Dot => Some(DistanceMetric::DotProduct),
        Distance::Manhattan => Some(DistanceMetric::Manhattan),
        _ => None,
    }
}

/// Dimension and metric of a collection with a single unnamed dense vector.
fn extract_vector_params(
    config: &Option<qdrant::CollectionConfig>,
) -> Option<(u32, DistanceMetric)> {
    let vectors = config.as_ref()?.params.as_ref()?.vectors_config.as_ref()?;
    match vectors.config.as_ref()? {
        qdrant::vectors_config::Config::Params(p) => {
            Some((p.size as u32, from_qdrant_distance(p.distance())?))
        }
        qdrant::vectors_config::Config::ParamsMap(_) => None,
    }
}

fn point_id_to_uuid(point_id: Option<&PointId>) -> VoiceResult<Uuid> {
    match point_id.and_then(|p| p.point_id_options.as_ref()) {
        Some(qdrant::point_id::PointIdOptions::Uuid(uuid_str)) => Uuid::parse_str(uuid_str)
            .map_err(|e| VoiceError::Internal(format!("Invalid UUID: {}", e))),
        // Points written by other tools may use numeric ids
        Some(qdrant::point_id::PointIdOptions::Num(num)) => Ok(Uuid::from_u128(*num as u128)),
        None => Err(VoiceError::Internal("Missing point ID".to_string())),
    }
}

fn point_id_to_cursor(point_id: &PointId) -> VoiceResult<Cursor> {
    match &point_id.point_id_options {
        Some(qdrant::point_id::PointIdOptions::Uuid(id)) => Ok(Cursor::from_uuid(id.clone())),
        Some(qdrant::point_id::PointIdOptions::Num(num)) => Ok(Cursor::from_num(*num)),
        None => Err(VoiceError::Internal("Missing scroll offset".to_string())),
    }
}

fn cursor_to_point_id(cursor: &Cursor) -> PointId {
    match cursor.as_num() {
        Some(num) => PointId::from(num),
        None => PointId::from(cursor.as_uuid().unwrap_or_default().to_string()),
    }
}

fn to_qdrant_filter(filter: &PointFilter) -> Filter {
    match filter {
        // An empty filter matches every point
        PointFilter::All => Filter::default(),
        PointFilter::Speaker(name) => {
            Filter::must([Condition::matches(SPEAKER_KEY, name.clone())])
        }
    }
}

fn ensure_completed(collection: &str, result: Option<&qdrant::UpdateResult>) -> VoiceResult<()> {
    match result {
        Some(r) if r.status() == UpdateStatus::Completed => Ok(()),
        Some(r) => Err(VoiceError::Rejected(format!(
            "collection '{}': update finished with status {:?}",
            collection,
            r.status()
        ))),
        None => Err(VoiceError::Rejected(format!(
            "collection '{}': engine returned no update result",
            collection
        ))),
    }
}

fn payload_to_qdrant(payload: Payload) -> HashMap<String, QdrantValue> {
    payload
        .into_iter()
        .map(|(key, val)| (key, json_to_qdrant_value(val)))
        .collect()
}

fn qdrant_to_payload(payload: HashMap<String, QdrantValue>) -> Payload {
    payload
        .into_iter()
        .filter_map(|(key, val)| qdrant_value_to_json(val).map(|json| (key, json)))
        .collect()
}

fn json_to_qdrant_value(val: serde_json::Value) -> QdrantValue {
    use qdrant::value::Kind;

    let kind = match val {
        serde_json::Value::Null => Kind::NullValue(0),
        serde_json::Value::Bool(b) => Kind::BoolValue(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Kind::IntegerValue(i),
            None => Kind::DoubleValue(n.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(s) => Kind::StringValue(s),
        serde_json::Value::Array(items) => Kind::ListValue(qdrant::ListValue {
            values: items.into_iter().map(json_to_qdrant_value).collect(),
        }),
        serde_json::Value::Object(map) => Kind::StructValue(qdrant::Struct {
            fields: payload_to_qdrant(map),
        }),
    };

    QdrantValue { kind: Some(kind) }
}

fn qdrant_value_to_json(val: QdrantValue) -> Option<serde_json::Value> {
    use qdrant::value::Kind;

    match val.kind? {
        Kind::NullValue(_) => Some(serde_json::Value::Null),
        Kind::BoolValue(b) => Some(serde_json::Value::Bool(b)),
        Kind::IntegerValue(i) => Some(serde_json::Value::Number(i.into())),
        Kind::DoubleValue(f) => serde_json::Number::from_f64(f).map(serde_json::Value::Number),
        Kind::StringValue(s) => Some(serde_json::Value::String(s)),
        Kind::ListValue(list) => Some(serde_json::Value::Array(
            list.values
                .into_iter()
                .filter_map(qdrant_value_to_json)
                .collect(),
        )),
        Kind::StructValue(s) => Some(serde_json::Value::Object(qdrant_to_payload(s.fields))),
    }
}

#[async_trait]
impl VectorEngine for QdrantEngine {
    async fn list_collections(&self) -> VoiceResult<Vec<String>> {
        let response = self
            .client
            .list_collections()
            .await
            .map_err(|e| VoiceError::Connectivity(e.to_string()))?;

        Ok(response.collections.into_iter().map(|c| c.name).collect())
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> VoiceResult<()> {
        let builder = CreateCollectionBuilder::new(&spec.name).vectors_config(
            VectorParamsBuilder::new(spec.dimension as u64, to_qdrant_distance(spec.distance)),
        );

        self.client
            .create_collection(builder)
            .await
            .map_err(|e| engine_error(&spec.name, e))?;

        Ok(())
    }

    async fn collection_stats(&self, collection: &str) -> VoiceResult<CollectionStats> {
        let info = self
            .client
            .collection_info(collection)
            .await
            .map_err(|e| engine_error(collection, e))?;

        let result = info
            .result
            .ok_or_else(|| VoiceError::collection_not_found(collection))?;

        let (dimension, distance) = extract_vector_params(&result.config).ok_or_else(|| {
            VoiceError::Config(format!(
                "collection '{}' is not configured with a single dense vector",
                collection
            ))
        })?;

        // Collection info only carries an approximate count
        let points_count = self.count_points(collection, &PointFilter::All).await?;

        Ok(CollectionStats {
            dimension,
            distance,
            points_count,
        })
    }

    async fn delete_collection(&self, collection: &str) -> VoiceResult<()> {
        let response = self
            .client
            .delete_collection(DeleteCollectionBuilder::new(collection))
            .await
            .map_err(|e| engine_error(collection, e))?;

        if !response.result {
            return Err(VoiceError::collection_not_found(collection));
        }

        Ok(())
    }

    #[instrument(skip(self, points), fields(count = points.len()))]
    async fn upsert(&self, collection: &str, points: Vec<Point>) -> VoiceResult<()> {
        let points: Vec<PointStruct> = points
            .into_iter()
            .map(|p| PointStruct::new(p.id.to_string(), p.vector, payload_to_qdrant(p.payload)))
            .collect();

        let response = self
            .client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(|e| engine_error(collection, e))?;

        ensure_completed(collection, response.result.as_ref())
    }

    async fn search(
        &self,
        collection: &str,
        request: SearchRequest,
    ) -> VoiceResult<Vec<SearchHit>> {
        let mut builder = SearchPointsBuilder::new(collection, request.vector, request.limit)
            .with_payload(true)
            .with_vectors(false);

        if let Some(threshold) = request.score_threshold {
            builder = builder.score_threshold(threshold as f32);
        }

        let response = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| engine_error(collection, e))?;

        response
            .result
            .into_iter()
            .map(|point| {
                Ok(SearchHit {
                    id: point_id_to_uuid(point.id.as_ref())?,
                    score: f64::from(point.score),
                    payload: qdrant_to_payload(point.payload),
                })
            })
            .collect()
    }

    async fn scroll(&self, collection: &str, request: ScrollRequest) -> VoiceResult<ScrollPage> {
        let mut builder = ScrollPointsBuilder::new(collection)
            .limit(request.page_size)
            .with_payload(true)
            .with_vectors(false);

        if let Some(cursor) = &request.cursor {
            builder = builder.offset(cursor_to_point_id(cursor));
        }

        let response = self
            .client
            .scroll(builder)
            .await
            .map_err(|e| engine_error(collection, e))?;

        let points = response
            .result
            .into_iter()
            .map(|point| {
                Ok(ScrolledPoint {
                    id: point_id_to_uuid(point.id.as_ref())?,
                    payload: qdrant_to_payload(point.payload),
                })
            })
            .collect::<VoiceResult<Vec<_>>>()?;

        let next_cursor = response
            .next_page_offset
            .as_ref()
            .map(point_id_to_cursor)
            .transpose()?;

        debug!(points = points.len(), more = next_cursor.is_some(), "Scrolled page");

        Ok(ScrollPage {
            points,
            next_cursor,
        })
    }

    async fn count_points(&self, collection: &str, filter: &PointFilter) -> VoiceResult<u64> {
        let builder = CountPointsBuilder::new(collection)
            .filter(to_qdrant_filter(filter))
            .exact(true);

        let response = self
            .client
            .count(builder)
            .await
            .map_err(|e| engine_error(collection, e))?;

        Ok(response.result.map(|r| r.count).unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn delete_points(&self, collection: &str, filter: &PointFilter) -> VoiceResult<()> {
        let selector =
            qdrant::points_selector::PointsSelectorOneOf::Filter(to_qdrant_filter(filter));

        let response = self
            .client
            .delete_points(DeletePointsBuilder::new(collection).points(selector).wait(true))
            .await
            .map_err(|e| engine_error(collection, e))?;

        ensure_completed(collection, response.result.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_distance_mapping_round_trips() {
        for metric in [
            DistanceMetric::Cosine,
            DistanceMetric::Euclidean,
            DistanceMetric::DotProduct,
            DistanceMetric::Manhattan,
        ] {
            assert_eq!(from_qdrant_distance(to_qdrant_distance(metric)), Some(metric));
        }
        assert_eq!(from_qdrant_distance(Distance::UnknownDistance), None);
    }

    #[test]
    fn test_payload_conversion_keeps_nested_values() {
        let payload = json!({
            "speaker": "alice",
            "sample_index": 2,
            "gain": 0.5,
            "tags": ["studio", "en"],
            "device": { "model": "zoom-h5", "channels": 2 },
            "verified": true,
        });
        let serde_json::Value::Object(map) = payload.clone() else {
            unreachable!()
        };

        let back = qdrant_to_payload(payload_to_qdrant(map));
        assert_eq!(serde_json::Value::Object(back), payload);
    }

    #[test]
    fn test_point_id_conversions() {
        let id = Uuid::new_v4();
        let point_id = PointId::from(id.to_string());
        assert_eq!(point_id_to_uuid(Some(&point_id)).unwrap(), id);
        assert_eq!(
            point_id_to_uuid(Some(&PointId::from(7u64))).unwrap(),
            Uuid::from_u128(7)
        );
        assert!(point_id_to_uuid(None).is_err());
    }

    #[test]
    fn test_cursor_conversions() {
        let id = Uuid::new_v4().to_string();
        let cursor = point_id_to_cursor(&PointId::from(id.clone())).unwrap();
        assert_eq!(cursor.as_uuid(), Some(id.as_str()));
        assert_eq!(cursor_to_point_id(&cursor), PointId::from(id));

        let cursor = point_id_to_cursor(&PointId::from(42u64)).unwrap();
        assert_eq!(cursor_to_point_id(&cursor), PointId::from(42u64));
    }

    #[test]
    fn test_extract_vector_params() {
        let config = Some(qdrant::CollectionConfig {
            params: Some(qdrant::CollectionParams {
                vectors_config: Some(qdrant::VectorsConfig {
                    config: Some(qdrant::vectors_config::Config::Params(qdrant::VectorParams {
                        size: 256,
                        distance: Distance::Cosine as i32,
                        ..Default::default()
                    })),
                }),
                ..Default::default()
            }),
            ..Default::default()
        });

        assert_eq!(
            extract_vector_params(&config),
            Some((256, DistanceMetric::Cosine))
        );
        assert_eq!(extract_vector_params(&None), None);
    }

    #[test]
    fn test_ensure_completed() {
        let completed = qdrant::UpdateResult {
            status: UpdateStatus::Completed as i32,
            ..Default::default()
        };
        assert!(ensure_completed("voices", Some(&completed)).is_ok());

        let acknowledged = qdrant::UpdateResult {
            status: UpdateStatus::Acknowledged as i32,
            ..Default::default()
        };
        assert!(matches!(
            ensure_completed("voices", Some(&acknowledged)),
            Err(VoiceError::Rejected(_))
        ));
        assert!(matches!(
            ensure_completed("voices", None),
            Err(VoiceError::Rejected(_))
        ));
    }
}
