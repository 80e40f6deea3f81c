//! Content store seam.
//!
//! The publishing site's content lives behind this trait: per-kind
//! paginated reads, deep single-item fetches, and the two metadata-only
//! writes owned by the embedding pipeline. Metadata writes must bypass any
//! content-versioning layer the backing store has — embedding and
//! recommendation fields are derived data, not user edits, and must never
//! create a new content revision.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::content::{ContentItem, ContentKind, EmbeddingRecord};

pub mod memory;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Malformed {kind} row {id}: {reason}")]
    Corrupt {
        kind: ContentKind,
        id: Uuid,
        reason: String,
    },
}

/// A resolved author identity.
#[derive(Debug, Clone)]
pub struct Author {
    pub id: Uuid,
    pub username: String,
}

/// One page of a per-kind query plus the true total count.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Resolve a username. `Ok(None)` is the normal "no such author" case.
    async fn find_author(&self, username: &str) -> Result<Option<Author>, StoreError>;

    /// Published items of one kind for one author, sorted descending by
    /// that kind's primary timestamp. `page` is 1-based.
    async fn list_published(
        &self,
        kind: ContentKind,
        author_id: Uuid,
        page: u32,
        limit: u32,
    ) -> Result<Page<ContentItem>, StoreError>;

    /// Fetch one item with enough relational depth to resolve referenced
    /// titles, topics and participants.
    async fn fetch_item(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<Option<ContentItem>, StoreError>;

    /// Persist embedding metadata for one item. Single-row, touches only
    /// the embedding columns.
    async fn write_embedding(
        &self,
        kind: ContentKind,
        id: Uuid,
        record: &EmbeddingRecord,
    ) -> Result<(), StoreError>;

    /// Ids of the `k` published items of the same kind nearest to `vector`
    /// by cosine distance, nearest first, excluding `exclude`.
    async fn nearest_ids(
        &self,
        kind: ContentKind,
        vector: &[f32],
        exclude: Uuid,
        k: usize,
    ) -> Result<Vec<Uuid>, StoreError>;

    /// Overwrite an item's recommendation list. Single-row, metadata only.
    async fn write_recommendations(
        &self,
        kind: ContentKind,
        id: Uuid,
        ids: &[Uuid],
    ) -> Result<(), StoreError>;
}
