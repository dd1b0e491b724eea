use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::error::{VoiceError, VoiceResult};

/// Raw point payload as stored by the engine.
pub type Payload = serde_json::Map<String, Value>;

pub const SPEAKER_KEY: &str = "speaker";
pub const SAMPLE_INDEX_KEY: &str = "sample_index";
pub const TOTAL_SAMPLES_KEY: &str = "total_samples";

const RESERVED_KEYS: [&str; 3] = [SPEAKER_KEY, SAMPLE_INDEX_KEY, TOTAL_SAMPLES_KEY];

/// Distance metric for similarity calculations
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum DistanceMetric {
    #[default]
    #[strum(to_string = "cosine")]
    Cosine,
    #[strum(to_string = "euclid", serialize = "euclidean")]
    Euclidean,
    #[strum(to_string = "dot", serialize = "dotproduct")]
    DotProduct,
    #[strum(to_string = "manhattan")]
    Manhattan,
}

impl DistanceMetric {
    /// Cosine and dot scores are similarities; euclid and manhattan scores are distances.
    pub fn higher_is_better(&self) -> bool {
        matches!(self, DistanceMetric::Cosine | DistanceMetric::DotProduct)
    }

    /// Whether `score` is at least as good as `threshold` under this metric.
    pub fn meets(&self, score: f64, threshold: f64) -> bool {
        if self.higher_is_better() {
            score >= threshold
        } else {
            score <= threshold
        }
    }
}

/// Name and vector parameters of the collection the store manages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub name: String,
    pub dimension: u32,
    pub distance: DistanceMetric,
}

/// What the engine reports about an existing collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub dimension: u32,
    pub distance: DistanceMetric,
    pub points_count: u64,
}

/// Caller-supplied payload extensions.
///
/// Keys owned by the payload schema (`speaker`, `sample_index`,
/// `total_samples`) are rejected so extensions can never overwrite them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> VoiceResult<Self> {
        self.insert(key, value)?;
        Ok(self)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> VoiceResult<()> {
        let key = key.into();
        if RESERVED_KEYS.contains(&key.as_str()) {
            return Err(VoiceError::Validation(format!(
                "metadata key '{}' is reserved",
                key
            )));
        }
        self.0.insert(key, value.into());
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Typed payload written with every point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeakerPayload {
    pub speaker: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_samples: Option<u32>,
    #[serde(flatten)]
    pub metadata: Metadata,
}

impl SpeakerPayload {
    pub fn new(speaker: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            sample_index: None,
            total_samples: None,
            metadata: Metadata::new(),
        }
    }

    pub fn with_sample(mut self, index: u32, total: u32) -> Self {
        self.sample_index = Some(index);
        self.total_samples = Some(total);
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn into_payload(self) -> VoiceResult<Payload> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(VoiceError::Internal(format!(
                "payload serialized to non-object: {}",
                other
            ))),
        }
    }
}

/// Speaker label of a stored payload, if it carries a usable one.
pub fn speaker_of(payload: &Payload) -> Option<&str> {
    payload
        .get(SPEAKER_KEY)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// A point ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

/// Nearest-neighbour query
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub vector: Vec<f32>,
    pub limit: u64,
    pub score_threshold: Option<f64>,
}

/// One ranked neighbour returned by a search, best first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: Uuid,
    pub score: f64,
    pub payload: Payload,
}

impl SearchHit {
    pub fn speaker(&self) -> Option<&str> {
        speaker_of(&self.payload)
    }
}

/// Opaque marker telling the engine where the next scroll page starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(CursorKind);

#[derive(Debug, Clone, PartialEq, Eq)]
enum CursorKind {
    Uuid(String),
    Num(u64),
}

impl Cursor {
    pub fn from_uuid(id: impl Into<String>) -> Self {
        Cursor(CursorKind::Uuid(id.into()))
    }

    pub fn from_num(id: u64) -> Self {
        Cursor(CursorKind::Num(id))
    }

    pub fn as_uuid(&self) -> Option<&str> {
        match &self.0 {
            CursorKind::Uuid(id) => Some(id),
            CursorKind::Num(_) => None,
        }
    }

    pub fn as_num(&self) -> Option<u64> {
        match self.0 {
            CursorKind::Num(id) => Some(id),
            CursorKind::Uuid(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrollRequest {
    pub page_size: u32,
    pub cursor: Option<Cursor>,
}

/// Payload-only view of a stored point.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrolledPoint {
    pub id: Uuid,
    pub payload: Payload,
}

impl ScrolledPoint {
    pub fn speaker(&self) -> Option<&str> {
        speaker_of(&self.payload)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrollPage {
    pub points: Vec<ScrolledPoint>,
    /// `None` once the scan is complete.
    pub next_cursor: Option<Cursor>,
}

/// Selects the points a count or delete applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointFilter {
    All,
    Speaker(String),
}

/// Outcome of a speaker identification attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identification {
    pub speaker: Option<String>,
    pub confidence: f64,
    #[serde(rename = "match")]
    pub matched: bool,
}

impl Identification {
    /// Decide on the best hit of a top-1 search.
    ///
    /// A hit that meets the threshold is a match. A hit below it still
    /// reports its score as confidence. Zero confidence is reserved for
    /// "nothing to compare against".
    pub fn decide(top: Option<&SearchHit>, threshold: f64, metric: DistanceMetric) -> Self {
        match top {
            Some(hit) => match hit.speaker() {
                Some(speaker) if metric.meets(hit.score, threshold) => Identification {
                    speaker: Some(speaker.to_string()),
                    confidence: hit.score,
                    matched: true,
                },
                _ => Identification::no_match(hit.score),
            },
            None => Identification::no_match(0.0),
        }
    }

    fn no_match(confidence: f64) -> Self {
        Identification {
            speaker: None,
            confidence,
            matched: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hit(score: f64, speaker: Option<&str>) -> SearchHit {
        let mut payload = Payload::new();
        if let Some(s) = speaker {
            payload.insert(SPEAKER_KEY.to_string(), json!(s));
        }
        SearchHit {
            id: Uuid::new_v4(),
            score,
            payload,
        }
    }

    #[test]
    fn test_distance_metric_parsing() {
        assert_eq!("cosine".parse::<DistanceMetric>().unwrap(), DistanceMetric::Cosine);
        assert_eq!("COSINE".parse::<DistanceMetric>().unwrap(), DistanceMetric::Cosine);
        assert_eq!("euclidean".parse::<DistanceMetric>().unwrap(), DistanceMetric::Euclidean);
        assert_eq!("dot".parse::<DistanceMetric>().unwrap(), DistanceMetric::DotProduct);
        assert!("hamming".parse::<DistanceMetric>().is_err());
        assert_eq!(DistanceMetric::Euclidean.to_string(), "euclid");
    }

    #[test]
    fn test_meets_respects_sign_convention() {
        assert!(DistanceMetric::Cosine.meets(0.8, 0.7));
        assert!(DistanceMetric::Cosine.meets(0.7, 0.7));
        assert!(!DistanceMetric::Cosine.meets(0.69, 0.7));
        assert!(DistanceMetric::Euclidean.meets(0.2, 0.5));
        assert!(!DistanceMetric::Euclidean.meets(0.9, 0.5));
    }

    #[test]
    fn test_metadata_rejects_reserved_keys() {
        for key in ["speaker", "sample_index", "total_samples"] {
            let err = Metadata::new().with(key, 1).unwrap_err();
            assert!(matches!(err, VoiceError::Validation(_)), "{key} should be reserved");
        }
    }

    #[test]
    fn test_speaker_payload_flattens_metadata() {
        let metadata = Metadata::new()
            .with("quality", "studio")
            .unwrap()
            .with("tags", json!(["en", "male"]))
            .unwrap();
        let payload = SpeakerPayload::new("alice")
            .with_sample(1, 3)
            .with_metadata(metadata)
            .into_payload()
            .unwrap();

        assert_eq!(
            Value::Object(payload),
            json!({
                "speaker": "alice",
                "sample_index": 1,
                "total_samples": 3,
                "quality": "studio",
                "tags": ["en", "male"],
            })
        );
    }

    #[test]
    fn test_speaker_payload_omits_absent_sample_fields() {
        let payload = SpeakerPayload::new("bob").into_payload().unwrap();
        assert_eq!(Value::Object(payload), json!({ "speaker": "bob" }));
    }

    #[test]
    fn test_speaker_of_ignores_missing_and_non_string() {
        let mut payload = Payload::new();
        assert_eq!(speaker_of(&payload), None);
        payload.insert(SPEAKER_KEY.to_string(), json!(42));
        assert_eq!(speaker_of(&payload), None);
        payload.insert(SPEAKER_KEY.to_string(), json!(""));
        assert_eq!(speaker_of(&payload), None);
        payload.insert(SPEAKER_KEY.to_string(), json!("carol"));
        assert_eq!(speaker_of(&payload), Some("carol"));
    }

    #[test]
    fn test_decide_match() {
        let top = hit(0.91, Some("alice"));
        let id = Identification::decide(Some(&top), 0.7, DistanceMetric::Cosine);
        assert_eq!(
            id,
            Identification {
                speaker: Some("alice".to_string()),
                confidence: 0.91,
                matched: true,
            }
        );
    }

    #[test]
    fn test_decide_below_threshold_keeps_confidence() {
        let top = hit(0.85, Some("alice"));
        let id = Identification::decide(Some(&top), 0.99, DistanceMetric::Cosine);
        assert!(!id.matched);
        assert_eq!(id.speaker, None);
        assert_eq!(id.confidence, 0.85);
    }

    #[test]
    fn test_decide_without_hit_is_zero_confidence() {
        let id = Identification::decide(None, 0.7, DistanceMetric::Cosine);
        assert_eq!(
            id,
            Identification {
                speaker: None,
                confidence: 0.0,
                matched: false,
            }
        );
    }

    #[test]
    fn test_decide_unlabelled_hit_is_not_a_match() {
        let top = hit(0.95, None);
        let id = Identification::decide(Some(&top), 0.7, DistanceMetric::Cosine);
        assert!(!id.matched);
        assert_eq!(id.confidence, 0.95);
    }

    #[test]
    fn test_identification_serializes_match_key() {
        let id = Identification::decide(None, 0.7, DistanceMetric::Cosine);
        let value = serde_json::to_value(&id).unwrap();
        assert_eq!(value, json!({ "speaker": null, "confidence": 0.0, "match": false }));
    }

    #[test]
    fn test_cursor_kinds() {
        let c = Cursor::from_uuid("6f1c0a4e-0000-4000-8000-000000000001");
        assert!(c.as_uuid().is_some());
        assert_eq!(c.as_num(), None);
        assert_eq!(Cursor::from_num(7).as_num(), Some(7));
    }
}
