//! End-to-end embedding pipeline tests: real Gemini client against a
//! wiremock server, in-memory content store.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use folio_core::config::{EmbeddingSettings, RecommendConfig};
use folio_core::models::content::*;
use folio_core::store::memory::MemoryContentStore;
use folio_core::GeminiEmbeddingClient;
use folio_server::subsystems::embedder::{self, EmbedOutcome};

const DIMS: usize = 8;

fn settings() -> EmbeddingSettings {
    EmbeddingSettings {
        model: "gemini-embedding-001".to_string(),
        dimensions: DIMS,
        max_retries: 1,
        retry_delay_ms: 10,
    }
}

fn client(server: &MockServer) -> GeminiEmbeddingClient {
    GeminiEmbeddingClient::with_base_url(
        Some("test-api-key".to_string()),
        settings(),
        server.uri(),
    )
    .expect("client")
}

fn embedding_body(seed: f32) -> serde_json::Value {
    let values: Vec<f32> = (0..DIMS).map(|i| seed + i as f32 * 0.01).collect();
    json!({ "embedding": { "values": values } })
}

fn rich(text: &str) -> serde_json::Value {
    json!({ "root": { "children": [{ "children": [{ "text": text }] }] } })
}

fn published_post(author: Uuid, title: &str) -> ContentItem {
    ContentItem {
        meta: ContentMeta {
            id: Uuid::new_v4(),
            author_id: author,
            status: PublicationStatus::Published,
            published_at: Some(Utc.timestamp_opt(1_000, 0).unwrap()),
            created_at: Utc.timestamp_opt(900, 0).unwrap(),
            embedding: None,
            recommended_ids: Vec::new(),
        },
        body: ContentBody::Post(PostFields {
            title: title.to_string(),
            description: Some("integration test post".into()),
            project: None,
            topics: vec!["testing".into()],
            body: Some(rich("Body written for the pipeline test.")),
        }),
    }
}

#[tokio::test]
async fn publish_pipeline_embeds_and_recommends() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(embedding_body(0.5)))
        .mount(&server)
        .await;

    let store = MemoryContentStore::new();
    let author = store.add_author("rafa").await;

    // A neighbour that already has a vector
    let mut neighbour = published_post(author.id, "Older related post");
    neighbour.meta.embedding = Some(EmbeddingRecord {
        vector: (0..DIMS).map(|i| 0.5 + i as f32 * 0.01).collect(),
        model: "gemini-embedding-001".into(),
        dimensions: DIMS,
        generated_at: Utc::now(),
        text_hash: "other".into(),
    });
    let neighbour_id = neighbour.meta.id;
    store.insert(neighbour).await;

    let item = published_post(author.id, "Fresh post");
    let id = item.meta.id;
    store.insert(item).await;

    let backend = client(&server);
    let outcome = embedder::run_publish_pipeline(
        &store,
        &backend,
        &settings(),
        &RecommendConfig { top_k: 3 },
        ContentKind::Post,
        id,
    )
    .await
    .expect("pipeline");
    assert_eq!(outcome, EmbedOutcome::Generated);

    let stored = store.get(id).await.unwrap();
    let record = stored.meta.embedding.expect("vector persisted");
    assert_eq!(record.dimensions, DIMS);
    assert_eq!(record.model, "gemini-embedding-001");
    assert_eq!(stored.meta.recommended_ids, vec![neighbour_id]);
}

#[tokio::test]
async fn second_publish_without_changes_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(embedding_body(0.2)))
        .expect(1)
        .mount(&server)
        .await;

    let store = MemoryContentStore::new();
    let author = store.add_author("rafa").await;
    let item = published_post(author.id, "Unchanged post");
    let id = item.meta.id;
    store.insert(item).await;

    let backend = client(&server);
    let s = settings();
    let rc = RecommendConfig { top_k: 3 };

    let first = embedder::run_publish_pipeline(&store, &backend, &s, &rc, ContentKind::Post, id)
        .await
        .unwrap();
    assert_eq!(first, EmbedOutcome::Generated);

    let second = embedder::run_publish_pipeline(&store, &backend, &s, &rc, ContentKind::Post, id)
        .await
        .unwrap();
    assert_eq!(second, EmbedOutcome::Skipped);
    assert_eq!(store.embedding_writes(), 1);
}

#[tokio::test]
async fn provider_outage_fails_one_item_but_not_another() {
    // Failing provider for item A
    let failing_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": { "code": 500, "message": "quota exhausted" }
        })))
        .mount(&failing_server)
        .await;

    // Healthy provider for item B
    let healthy_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(embedding_body(0.9)))
        .mount(&healthy_server)
        .await;

    let store = MemoryContentStore::new();
    let author = store.add_author("rafa").await;
    let item_a = published_post(author.id, "Item A");
    let item_b = published_post(author.id, "Item B");
    let (id_a, id_b) = (item_a.meta.id, item_b.meta.id);
    store.insert(item_a).await;
    store.insert(item_b).await;

    let s = settings();
    let rc = RecommendConfig { top_k: 3 };
    let failing = client(&failing_server);
    let healthy = client(&healthy_server);

    let (res_a, res_b) = tokio::join!(
        embedder::run_publish_pipeline(&store, &failing, &s, &rc, ContentKind::Post, id_a),
        embedder::run_publish_pipeline(&store, &healthy, &s, &rc, ContentKind::Post, id_b),
    );

    assert!(res_a.is_err(), "item A should fail");
    assert_eq!(res_b.unwrap(), EmbedOutcome::Generated);
    assert!(store.get(id_a).await.unwrap().meta.embedding.is_none());
    assert!(store.get(id_b).await.unwrap().meta.embedding.is_some());
}

#[tokio::test]
async fn fire_and_forget_task_completes_in_background() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(embedding_body(0.3)))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryContentStore::new());
    let author = store.add_author("rafa").await;
    let item = published_post(author.id, "Hooked post");
    let id = item.meta.id;
    store.insert(item).await;

    let backend = Arc::new(client(&server));
    embedder::spawn_publish_task(
        store.clone(),
        backend,
        settings(),
        RecommendConfig { top_k: 3 },
        ContentKind::Post,
        id,
    );

    // The spawn returns immediately; poll until the background write lands
    for _ in 0..100 {
        if store.get(id).await.unwrap().meta.embedding.is_some() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    panic!("background embedding never completed");
}
