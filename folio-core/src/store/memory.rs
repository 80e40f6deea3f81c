//! In-memory `ContentStore`.
//!
//! Reference semantics for the Postgres store and the fixture every
//! subsystem test runs against. Items are kept in insertion order so that
//! timestamp ties resolve deterministically, matching the stable sort the
//! feed aggregator relies on.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::content::{ContentItem, ContentKind, EmbeddingRecord};

use super::{Author, ContentStore, Page, StoreError};

#[derive(Default)]
pub struct MemoryContentStore {
    inner: RwLock<Inner>,
    embedding_writes: AtomicUsize,
    recommendation_writes: AtomicUsize,
}

#[derive(Default)]
struct Inner {
    authors: Vec<Author>,
    items: Vec<ContentItem>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_author(&self, username: &str) -> Author {
        let author = Author {
            id: Uuid::new_v4(),
            username: username.to_string(),
        };
        self.inner.write().await.authors.push(author.clone());
        author
    }

    pub async fn insert(&self, item: ContentItem) {
        self.inner.write().await.items.push(item);
    }

    /// Replace a stored item in place, preserving its feed position.
    /// Models a content edit arriving through the admin UI.
    pub async fn update(&self, item: ContentItem) {
        let mut inner = self.inner.write().await;
        if let Some(slot) = inner.items.iter_mut().find(|i| i.meta.id == item.meta.id) {
            *slot = item;
        } else {
            inner.items.push(item);
        }
    }

    /// Direct read for test assertions.
    pub async fn get(&self, id: Uuid) -> Option<ContentItem> {
        self.inner
            .read()
            .await
            .items
            .iter()
            .find(|i| i.meta.id == id)
            .cloned()
    }

    /// How many embedding writes have been applied. Used by idempotence
    /// tests to assert that a skipped run performs zero writes.
    pub fn embedding_writes(&self) -> usize {
        self.embedding_writes.load(Ordering::SeqCst)
    }

    pub fn recommendation_writes(&self) -> usize {
        self.recommendation_writes.load(Ordering::SeqCst)
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn find_author(&self, username: &str) -> Result<Option<Author>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .authors
            .iter()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn list_published(
        &self,
        kind: ContentKind,
        author_id: Uuid,
        page: u32,
        limit: u32,
    ) -> Result<Page<ContentItem>, StoreError> {
        let inner = self.inner.read().await;
        let mut matching: Vec<ContentItem> = inner
            .items
            .iter()
            .filter(|i| i.kind() == kind && i.meta.author_id == author_id && i.is_published())
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps
        matching.sort_by(|a, b| b.primary_timestamp().cmp(&a.primary_timestamp()));

        let total = matching.len() as u64;
        let offset = (page.saturating_sub(1) as usize) * limit as usize;
        let items = matching
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .collect();

        Ok(Page { items, total })
    }

    async fn fetch_item(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<Option<ContentItem>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .items
            .iter()
            .find(|i| i.meta.id == id && i.kind() == kind)
            .cloned())
    }

    async fn write_embedding(
        &self,
        kind: ContentKind,
        id: Uuid,
        record: &EmbeddingRecord,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(item) = inner
            .items
            .iter_mut()
            .find(|i| i.meta.id == id && i.kind() == kind)
        {
            item.meta.embedding = Some(record.clone());
            self.embedding_writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn nearest_ids(
        &self,
        kind: ContentKind,
        vector: &[f32],
        exclude: Uuid,
        k: usize,
    ) -> Result<Vec<Uuid>, StoreError> {
        let inner = self.inner.read().await;
        let mut scored: Vec<(f32, Uuid)> = inner
            .items
            .iter()
            .filter(|i| i.kind() == kind && i.meta.id != exclude && i.is_published())
            .filter_map(|i| {
                i.meta
                    .embedding
                    .as_ref()
                    .map(|e| (cosine_distance(vector, &e.vector), i.meta.id))
            })
            .collect();
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored.into_iter().take(k).map(|(_, id)| id).collect())
    }

    async fn write_recommendations(
        &self,
        kind: ContentKind,
        id: Uuid,
        ids: &[Uuid],
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(item) = inner
            .items
            .iter_mut()
            .find(|i| i.meta.id == id && i.kind() == kind)
        {
            item.meta.recommended_ids = ids.to_vec();
            self.recommendation_writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
