//! Voice Domain Library
//!
//! Persistent store for speaker embeddings with nearest-neighbour speaker
//! identification. Fixed-length vectors produced by a speaker encoder are
//! kept in one Qdrant collection, each labelled with the speaker it belongs to.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   VoiceStore    │  ← Bootstrap, upsert pipeline, aggregates, identification
//! └────────┬────────┘
//!          │            ┌─────────────────┐
//!          ├───────────►│   PayloadScan   │  ← Cursor-driven full scans
//!          │            └────────┬────────┘
//! ┌────────▼────────┐            │
//! │  VectorEngine   │◄───────────┘
//! │    (trait)      │
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐     ┌─────────────────┐
//! │  QdrantEngine   │     │ InMemoryEngine  │
//! │ (gRPC client)   │     │ (brute force)   │
//! └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use core_config::FromEnv;
//! use domain_voice::{
//!     DEFAULT_MATCH_THRESHOLD, QdrantConfig, QdrantEngine, StoreConfig, VoiceStore,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = QdrantEngine::connect(&QdrantConfig::from_env()?)?;
//! let store = VoiceStore::open(engine, StoreConfig::from_env()?).await?;
//!
//! store
//!     .add_speaker_samples("alice", vec![vec![0.1; 256], vec![0.12; 256]], None)
//!     .await?;
//!
//! let result = store
//!     .identify_speaker(&[0.11; 256], DEFAULT_MATCH_THRESHOLD)
//!     .await?;
//! println!("{:?} ({:.2})", result.speaker, result.confidence);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod id;
pub mod memory;
pub mod models;
pub mod qdrant;
pub mod scan;
pub mod store;

// Re-export commonly used types
pub use config::StoreConfig;
pub use engine::VectorEngine;
pub use error::{VoiceError, VoiceResult};
pub use memory::InMemoryEngine;
pub use models::{
    CollectionSpec, CollectionStats, Cursor, DistanceMetric, Identification, Metadata, Payload,
    Point, PointFilter, SearchHit, SpeakerPayload,
};
pub use qdrant::{QdrantConfig, QdrantEngine};
pub use scan::PayloadScan;
pub use store::{DEFAULT_MATCH_THRESHOLD, VoiceStore};
