use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::engine::VectorEngine;
use crate::error::{VoiceError, VoiceResult};
use crate::models::{
    CollectionSpec, CollectionStats, Cursor, DistanceMetric, Payload, Point, PointFilter,
    SPEAKER_KEY, ScrollPage, ScrollRequest, ScrolledPoint, SearchHit, SearchRequest,
};

/// In-process [`VectorEngine`] using brute-force scoring.
///
/// Intended for tests and offline demos. Scores follow Qdrant's conventions:
/// cosine and dot are similarities, euclid and manhattan are distances.
/// Scrolling walks points in ascending id order.
#[derive(Default)]
pub struct InMemoryEngine {
    collections: RwLock<HashMap<String, MemoryCollection>>,
}

struct MemoryCollection {
    spec: CollectionSpec,
    points: BTreeMap<Uuid, (Vec<f32>, Payload)>,
}

impl MemoryCollection {
    fn check_dimension(&self, vector: &[f32]) -> VoiceResult<()> {
        if vector.len() != self.spec.dimension as usize {
            return Err(VoiceError::dimension_mismatch(
                self.spec.dimension,
                vector.len(),
            ));
        }
        Ok(())
    }

    fn matches(payload: &Payload, filter: &PointFilter) -> bool {
        match filter {
            PointFilter::All => true,
            PointFilter::Speaker(name) => {
                payload.get(SPEAKER_KEY).and_then(|v| v.as_str()) == Some(name.as_str())
            }
        }
    }
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> VoiceResult<RwLockReadGuard<'_, HashMap<String, MemoryCollection>>> {
        self.collections
            .read()
            .map_err(|_| VoiceError::Internal("in-memory engine lock poisoned".to_string()))
    }

    fn write(&self) -> VoiceResult<RwLockWriteGuard<'_, HashMap<String, MemoryCollection>>> {
        self.collections
            .write()
            .map_err(|_| VoiceError::Internal("in-memory engine lock poisoned".to_string()))
    }
}

fn get<'a>(
    collections: &'a HashMap<String, MemoryCollection>,
    name: &str,
) -> VoiceResult<&'a MemoryCollection> {
    collections
        .get(name)
        .ok_or_else(|| VoiceError::collection_not_found(name))
}

fn get_mut<'a>(
    collections: &'a mut HashMap<String, MemoryCollection>,
    name: &str,
) -> VoiceResult<&'a mut MemoryCollection> {
    collections
        .get_mut(name)
        .ok_or_else(|| VoiceError::collection_not_found(name))
}

/// Score `b` against the query `a` with f64 intermediate precision.
///
/// Cosine of a zero vector is 0.
pub fn score(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f64 {
    let pairs = a.iter().zip(b.iter()).map(|(x, y)| (*x as f64, *y as f64));

    match metric {
        DistanceMetric::Cosine => {
            let (mut dot, mut norm_a, mut norm_b) = (0.0, 0.0, 0.0);
            for (x, y) in pairs {
                dot += x * y;
                norm_a += x * x;
                norm_b += y * y;
            }
            if norm_a == 0.0 || norm_b == 0.0 {
                return 0.0;
            }
            (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
        }
        DistanceMetric::DotProduct => pairs.map(|(x, y)| x * y).sum(),
        DistanceMetric::Euclidean => pairs.map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt(),
        DistanceMetric::Manhattan => pairs.map(|(x, y)| (x - y).abs()).sum(),
    }
}

#[async_trait]
impl VectorEngine for InMemoryEngine {
    async fn list_collections(&self) -> VoiceResult<Vec<String>> {
        Ok(self.read()?.keys().cloned().collect())
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> VoiceResult<()> {
        let mut collections = self.write()?;
        if collections.contains_key(&spec.name) {
            return Err(VoiceError::Config(format!(
                "collection '{}' already exists",
                spec.name
            )));
        }
        collections.insert(
            spec.name.clone(),
            MemoryCollection {
                spec: spec.clone(),
                points: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn collection_stats(&self, collection: &str) -> VoiceResult<CollectionStats> {
        let collections = self.read()?;
        let c = get(&collections, collection)?;
        Ok(CollectionStats {
            dimension: c.spec.dimension,
            distance: c.spec.distance,
            points_count: c.points.len() as u64,
        })
    }

    async fn delete_collection(&self, collection: &str) -> VoiceResult<()> {
        self.write()?
            .remove(collection)
            .map(|_| ())
            .ok_or_else(|| VoiceError::collection_not_found(collection))
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> VoiceResult<()> {
        let mut collections = self.write()?;
        let c = get_mut(&mut collections, collection)?;

        // All or nothing
        for point in &points {
            c.check_dimension(&point.vector)?;
        }
        for point in points {
            c.points.insert(point.id, (point.vector, point.payload));
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        request: SearchRequest,
    ) -> VoiceResult<Vec<SearchHit>> {
        let collections = self.read()?;
        let c = get(&collections, collection)?;
        c.check_dimension(&request.vector)?;

        let metric = c.spec.distance;
        let mut hits: Vec<SearchHit> = c
            .points
            .iter()
            .map(|(id, (vector, payload))| SearchHit {
                id: *id,
                score: score(metric, &request.vector, vector),
                payload: payload.clone(),
            })
            .filter(|hit| {
                request
                    .score_threshold
                    .is_none_or(|threshold| metric.meets(hit.score, threshold))
            })
            .collect();

        hits.sort_by(|a, b| {
            let ord = a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal);
            if metric.higher_is_better() {
                ord.reverse()
            } else {
                ord
            }
        });
        hits.truncate(request.limit as usize);

        Ok(hits)
    }

    async fn scroll(&self, collection: &str, request: ScrollRequest) -> VoiceResult<ScrollPage> {
        let collections = self.read()?;
        let c = get(&collections, collection)?;

        let start = match &request.cursor {
            Some(cursor) => {
                let id = cursor
                    .as_uuid()
                    .and_then(|s| Uuid::parse_str(s).ok())
                    .ok_or_else(|| VoiceError::Validation("unknown scroll cursor".to_string()))?;
                Bound::Included(id)
            }
            None => Bound::Unbounded,
        };

        let mut remaining = c.points.range((start, Bound::Unbounded));
        let points: Vec<ScrolledPoint> = remaining
            .by_ref()
            .take(request.page_size as usize)
            .map(|(id, (_, payload))| ScrolledPoint {
                id: *id,
                payload: payload.clone(),
            })
            .collect();
        let next_cursor = remaining
            .next()
            .map(|(id, _)| Cursor::from_uuid(id.to_string()));

        Ok(ScrollPage {
            points,
            next_cursor,
        })
    }

    async fn count_points(&self, collection: &str, filter: &PointFilter) -> VoiceResult<u64> {
        let collections = self.read()?;
        let c = get(&collections, collection)?;
        Ok(c.points
            .values()
            .filter(|(_, payload)| MemoryCollection::matches(payload, filter))
            .count() as u64)
    }

    async fn delete_points(&self, collection: &str, filter: &PointFilter) -> VoiceResult<()> {
        let mut collections = self.write()?;
        let c = get_mut(&mut collections, collection)?;
        c.points
            .retain(|_, (_, payload)| !MemoryCollection::matches(payload, filter));
        Ok(())
    }
}
