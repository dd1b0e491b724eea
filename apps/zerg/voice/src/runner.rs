//! Command execution
//!
//! Sets up tracing and configuration, picks the engine, opens the store and
//! dispatches the parsed subcommand. Results are printed to stdout as JSON.

use std::collections::BTreeMap;

use clap::Parser;
use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::{Environment, FromEnv};
use domain_voice::{
    InMemoryEngine, Metadata, QdrantConfig, QdrantEngine, StoreConfig, VectorEngine, VoiceStore,
};
use eyre::{Result, WrapErr};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::cli::{Cli, Command};
use crate::embeddings::EmbeddingFile;

/// Parse the command line and run it.
pub async fn run() -> Result<()> {
    install_color_eyre();
    let environment = Environment::from_env();
    init_tracing(&environment, "info,domain_voice=debug");

    let cli = Cli::parse();

    let mut qdrant_config =
        QdrantConfig::from_env().wrap_err("Failed to load Qdrant configuration")?;
    if let Some(url) = cli.qdrant_url.clone() {
        qdrant_config = QdrantConfig {
            url,
            ..qdrant_config
        };
    }

    // Needs no engine connection
    if let Command::Dashboard = cli.command {
        return print_dashboard(&qdrant_config);
    }

    let mut store_config =
        StoreConfig::from_env().wrap_err("Failed to load store configuration")?;
    if let Some(collection) = cli.collection.clone() {
        store_config.collection = collection;
    }

    if cli.memory {
        info!("Using in-memory engine");
        let store = VoiceStore::open(InMemoryEngine::new(), store_config).await?;
        execute(&store, &qdrant_config, cli.command).await
    } else {
        info!("Connecting to Qdrant at {}...", qdrant_config.url);
        let engine =
            QdrantEngine::connect(&qdrant_config).wrap_err("Failed to connect to Qdrant")?;
        let store = VoiceStore::open(engine, store_config)
            .await
            .wrap_err("Failed to open voice collection")?;
        execute(&store, &qdrant_config, cli.command).await
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_dashboard(qdrant: &QdrantConfig) -> Result<()> {
    println!("{}", qdrant.dashboard_url);
    Ok(())
}

/// Run one subcommand against an opened store.
pub async fn execute<E: VectorEngine>(
    store: &VoiceStore<E>,
    qdrant: &QdrantConfig,
    command: Command,
) -> Result<()> {
    match command {
        Command::Enroll {
            speaker,
            file,
            meta,
        } => {
            let vectors = EmbeddingFile::read(&file)?.into_vectors();
            let mut metadata = Metadata::new();
            for (key, value) in meta {
                metadata.insert(key, value)?;
            }

            let metadata = (!metadata.is_empty()).then_some(metadata);
            let ids = store
                .add_speaker_samples(&speaker, vectors, metadata)
                .await?;
            print_json(&json!({ "speaker": speaker, "ids": ids }))
        }

        Command::Upsert { file, speaker } => {
            let items = EmbeddingFile::read(&file)?.into_labelled(speaker.as_deref())?;
            let (vectors, speakers): (Vec<_>, Vec<_>) =
                items.into_iter().map(|e| (e.vector, e.speaker)).unzip();

            let ids = store.upsert_embeddings(vectors, &speakers).await?;
            print_json(&json!({ "ids": ids }))
        }

        Command::Search {
            file,
            top_k,
            threshold,
        } => {
            let query = EmbeddingFile::read(&file)?.into_query()?;
            let hits = store.search_similar(&query, top_k, threshold).await?;
            print_json(&hits)
        }

        Command::Identify { file, threshold } => {
            let query = EmbeddingFile::read(&file)?.into_query()?;
            let identification = store.identify_speaker(&query, threshold).await?;
            print_json(&identification)
        }

        Command::Speakers => print_json(&store.get_all_speakers().await?),

        Command::Stats => {
            let config = store.config();
            let speakers: BTreeMap<_, _> = store.get_speaker_count().await?.into_iter().collect();
            print_json(&json!({
                "collection": config.collection,
                "dimension": config.dimension,
                "distance": config.distance,
                "points": store.count().await?,
                "speakers": speakers,
            }))
        }

        Command::Demo { file, query, top_k } => {
            let items = EmbeddingFile::read(&file)?.into_labelled(None)?;
            let (vectors, speakers): (Vec<_>, Vec<_>) =
                items.into_iter().map(|e| (e.vector, e.speaker)).unzip();
            let inserted = store.upsert_embeddings(vectors, &speakers).await?.len();

            let query = EmbeddingFile::read(&query)?.into_query()?;
            let hits: Vec<_> = store
                .search_similar(&query, top_k, None)
                .await?
                .into_iter()
                .map(|hit| json!({ "speaker": hit.speaker(), "score": hit.score }))
                .collect();

            print_json(&json!({
                "inserted": inserted,
                "hits": hits,
                "speakers": store.get_all_speakers().await?,
            }))
        }

        Command::Remove { speaker } => {
            let removed = store.remove_speaker(&speaker).await?;
            print_json(&json!({ "speaker": speaker, "removed": removed }))
        }

        Command::Clear => print_json(&json!({ "removed": store.clear().await? })),

        Command::Drop => print_json(&json!({ "removed": store.delete_collection().await? })),

        Command::Dashboard => print_dashboard(qdrant),
    }
}
