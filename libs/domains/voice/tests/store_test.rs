//! End-to-end tests for the voice store
//!
//! These run the full store against the in-process engine:
//! - Collection bootstrap and reopening
//! - Upsert, search and identification round trips
//! - Scan aggregates across page boundaries
//! - Clearing and dropping the collection

use std::collections::HashMap;

use domain_voice::*;

const DIM: u32 = 8;

/// Unit-length vector pointing mostly along `axis`, nudged by `jitter`.
fn voice(axis: usize, jitter: f32) -> Vec<f32> {
    let mut v = vec![jitter; DIM as usize];
    v[axis % DIM as usize] = 1.0;
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    v.iter().map(|x| x / norm).collect()
}

async fn store_with_page_size(page_size: u32) -> VoiceStore<InMemoryEngine> {
    let config = StoreConfig::new("voices", DIM).with_page_size(page_size);
    VoiceStore::open(InMemoryEngine::new(), config)
        .await
        .unwrap()
}

async fn store() -> VoiceStore<InMemoryEngine> {
    store_with_page_size(100).await
}

#[tokio::test]
async fn test_stored_vector_is_its_own_nearest_neighbour() {
    let store = store().await;
    let id = store
        .upsert_embedding(voice(2, 0.05), "alice", None)
        .await
        .unwrap();
    store
        .upsert_embedding(voice(5, 0.05), "bob", None)
        .await
        .unwrap();

    let hits = store.search_similar(&voice(2, 0.05), 1, None).await.unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, id);
    assert_eq!(hits[0].speaker(), Some("alice"));
    assert!((hits[0].score - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn test_count_reflects_upserts() {
    let store = store().await;
    let vectors: Vec<_> = (0..5).map(|i| voice(i, 0.1)).collect();

    let ids = store
        .add_speaker_samples("alice", vectors, None)
        .await
        .unwrap();

    assert_eq!(ids.len(), 5);
    assert_eq!(store.count().await.unwrap(), 5);
}

#[tokio::test]
async fn test_speaker_aggregates() {
    let store = store().await;
    store
        .add_speaker_samples("alice", vec![voice(0, 0.1), voice(0, 0.2), voice(0, 0.3)], None)
        .await
        .unwrap();
    store
        .add_speaker_samples("bob", vec![voice(4, 0.1), voice(4, 0.2)], None)
        .await
        .unwrap();

    assert_eq!(store.get_all_speakers().await.unwrap(), vec!["alice", "bob"]);
    assert_eq!(
        store.get_speaker_count().await.unwrap(),
        HashMap::from([("alice".to_string(), 3), ("bob".to_string(), 2)])
    );
}

#[tokio::test]
async fn test_aggregates_do_not_depend_on_page_size() {
    let mut results = Vec::new();
    for page_size in [1, 3, 100] {
        let store = store_with_page_size(page_size).await;
        let vectors: Vec<_> = (0..10).map(|i| voice(i, 0.1)).collect();
        let speakers: Vec<_> = (0..10).map(|i| format!("speaker-{}", i % 4)).collect();
        store.upsert_embeddings(vectors, &speakers).await.unwrap();

        results.push((
            store.get_all_speakers().await.unwrap(),
            store.get_speaker_count().await.unwrap(),
        ));
    }

    assert_eq!(results[0], results[1]);
    assert_eq!(results[1], results[2]);
    assert_eq!(results[0].1["speaker-0"], 3);
    assert_eq!(results[0].1["speaker-3"], 2);
}

#[tokio::test]
async fn test_identify_known_and_unknown_speaker() {
    let store = store().await;
    store
        .add_speaker_samples("alice", vec![voice(0, 0.05), voice(0, 0.08)], None)
        .await
        .unwrap();
    store
        .add_speaker_samples("bob", vec![voice(6, 0.05)], None)
        .await
        .unwrap();

    let known = store
        .identify_speaker(&voice(0, 0.06), DEFAULT_MATCH_THRESHOLD)
        .await
        .unwrap();
    assert!(known.matched);
    assert_eq!(known.speaker.as_deref(), Some("alice"));

    // Orthogonal to every stored voice.
    let stranger = store.identify_speaker(&voice(3, 0.0), 0.9).await.unwrap();
    assert!(!stranger.matched);
    assert!(stranger.speaker.is_none());
    assert!(stranger.confidence < 0.9);
}

#[tokio::test]
async fn test_remove_speaker_keeps_others() {
    let store = store().await;
    store
        .upsert_embeddings(
            vec![voice(0, 0.1), voice(1, 0.1), voice(2, 0.1)],
            &["alice", "bob", "alice"],
        )
        .await
        .unwrap();

    assert_eq!(store.remove_speaker("alice").await.unwrap(), 2);
    assert_eq!(store.get_all_speakers().await.unwrap(), vec!["bob"]);
}

#[tokio::test]
async fn test_clear_then_reuse() {
    let store = store().await;
    store
        .add_speaker_samples("alice", vec![voice(0, 0.1), voice(1, 0.1)], None)
        .await
        .unwrap();

    assert_eq!(store.clear().await.unwrap(), 2);
    assert_eq!(store.count().await.unwrap(), 0);
    assert!(store.get_all_speakers().await.unwrap().is_empty());

    store
        .upsert_embedding(voice(3, 0.1), "carol", None)
        .await
        .unwrap();
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_operations_fail_after_delete_collection() {
    let store = store().await;
    store
        .upsert_embedding(voice(0, 0.1), "alice", None)
        .await
        .unwrap();

    assert_eq!(store.delete_collection().await.unwrap(), 1);

    assert!(matches!(store.count().await, Err(VoiceError::NotFound(_))));
    assert!(matches!(
        store.search_similar(&voice(0, 0.1), 3, None).await,
        Err(VoiceError::NotFound(_))
    ));
    assert!(matches!(
        store.upsert_embedding(voice(0, 0.1), "alice", None).await,
        Err(VoiceError::NotFound(_))
    ));

    store.bootstrap().await.unwrap();
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_reopen_is_idempotent() {
    let config = StoreConfig::new("voices", DIM);
    let store = VoiceStore::open(InMemoryEngine::new(), config.clone())
        .await
        .unwrap();
    store
        .upsert_embedding(voice(0, 0.1), "alice", None)
        .await
        .unwrap();

    store.bootstrap().await.unwrap();
    store.bootstrap().await.unwrap();
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_sample_metadata_is_stored() {
    let store = store().await;
    let metadata = Metadata::new().with("source", "interview.wav").unwrap();
    store
        .add_speaker_samples("alice", vec![voice(0, 0.1), voice(1, 0.1)], Some(metadata))
        .await
        .unwrap();

    let hits = store.search_similar(&voice(1, 0.1), 1, None).await.unwrap();
    let payload = &hits[0].payload;
    assert_eq!(payload["source"], "interview.wav");
    assert_eq!(payload["sample_index"], 1);
    assert_eq!(payload["total_samples"], 2);
}

#[test]
fn test_metadata_rejects_reserved_keys() {
    assert!(matches!(
        Metadata::new().with("speaker", "mallory"),
        Err(VoiceError::Validation(_))
    ));
}
