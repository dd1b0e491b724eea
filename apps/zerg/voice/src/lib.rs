//! Voice Store CLI
//!
//! Command-line driver for enrolling speakers and identifying voices against
//! a Qdrant-backed embedding collection.
//!
//! ## Architecture
//!
//! ```text
//! zerg-voice <command> [--memory]
//!   ↓ (clap)
//! runner::execute
//!   ↓ (JSON embedding files)
//! VoiceStore (domain layer)
//!   ↓
//! ┌──────────────┬────────────────┐
//! │ QdrantEngine │ InMemoryEngine │
//! └──────────────┴────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `cli`: Argument definitions
//! - `embeddings`: Embedding file formats
//! - `runner`: Startup and command dispatch

pub mod cli;
pub mod embeddings;
pub mod runner;

// Re-export for convenience
pub use runner::run;
