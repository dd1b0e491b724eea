//! Embedding input files
//!
//! Three JSON layouts are accepted:
//!
//! ```text
//! {"vector": [0.1, 0.2, ...]}
//! {"vectors": [[0.1, ...], [0.3, ...]]}
//! [{"speaker": "alice", "vector": [0.1, ...]}, ...]
//! ```

use std::path::Path;

use eyre::{Result, WrapErr, bail};
use serde::Deserialize;

/// One embedding tagged with its speaker.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabelledEmbedding {
    pub speaker: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingFile {
    Single { vector: Vec<f32> },
    Batch { vectors: Vec<Vec<f32>> },
    Labelled(Vec<LabelledEmbedding>),
}

impl EmbeddingFile {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).wrap_err("Unrecognised embedding file layout")
    }

    pub fn read(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&json).wrap_err_with(|| format!("Failed to parse {}", path.display()))
    }

    /// Every vector in the file, labels dropped.
    pub fn into_vectors(self) -> Vec<Vec<f32>> {
        match self {
            Self::Single { vector } => vec![vector],
            Self::Batch { vectors } => vectors,
            Self::Labelled(items) => items.into_iter().map(|e| e.vector).collect(),
        }
    }

    /// The first vector, used as a query.
    pub fn into_query(self) -> Result<Vec<f32>> {
        match self.into_vectors().into_iter().next() {
            Some(vector) => Ok(vector),
            None => bail!("Embedding file holds no vectors"),
        }
    }

    /// Labelled entries; unlabelled layouts get `default_speaker` when given.
    pub fn into_labelled(self, default_speaker: Option<&str>) -> Result<Vec<LabelledEmbedding>> {
        match (self, default_speaker) {
            (Self::Labelled(items), _) => Ok(items),
            (other, Some(speaker)) => Ok(other
                .into_vectors()
                .into_iter()
                .map(|vector| LabelledEmbedding {
                    speaker: speaker.to_string(),
                    vector,
                })
                .collect()),
            (_, None) => bail!("Embedding file has no speaker labels; pass --speaker"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_single() {
        let file = EmbeddingFile::parse(r#"{"vector": [0.5, -0.5]}"#).unwrap();
        assert_eq!(file.into_vectors(), vec![vec![0.5, -0.5]]);
    }

    #[test]
    fn test_parse_batch() {
        let file = EmbeddingFile::parse(r#"{"vectors": [[1.0], [2.0], [3.0]]}"#).unwrap();
        assert_eq!(file.into_vectors().len(), 3);
    }

    #[test]
    fn test_parse_labelled() {
        let file = EmbeddingFile::parse(
            r#"[{"speaker": "alice", "vector": [1.0]}, {"speaker": "bob", "vector": [2.0]}]"#,
        )
        .unwrap();
        let items = file.into_labelled(None).unwrap();
        assert_eq!(items[1].speaker, "bob");
        assert_eq!(items[1].vector, vec![2.0]);
    }

    #[test]
    fn test_unlabelled_needs_default_speaker() {
        let file = EmbeddingFile::parse(r#"{"vectors": [[1.0], [2.0]]}"#).unwrap();
        assert!(file.into_labelled(None).is_err());

        let file = EmbeddingFile::parse(r#"{"vectors": [[1.0], [2.0]]}"#).unwrap();
        let items = file.into_labelled(Some("carol")).unwrap();
        assert!(items.iter().all(|e| e.speaker == "carol"));
    }

    #[test]
    fn test_query_from_empty_batch_fails() {
        let file = EmbeddingFile::parse(r#"{"vectors": []}"#).unwrap();
        assert!(file.into_query().is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_layout() {
        assert!(EmbeddingFile::parse(r#"{"embedding": [1.0]}"#).is_err());
        assert!(EmbeddingFile::parse("not json").is_err());
    }

    #[test]
    fn test_read_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"vector": [0.25, 0.75]}}"#).unwrap();

        let query = EmbeddingFile::read(file.path()).unwrap().into_query().unwrap();
        assert_eq!(query, vec![0.25, 0.75]);
    }

    #[test]
    fn test_read_missing_file() {
        assert!(EmbeddingFile::read(Path::new("/nonexistent/voice.json")).is_err());
    }
}
