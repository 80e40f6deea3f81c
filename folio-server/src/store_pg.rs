//! Postgres/pgvector `ContentStore`.
//!
//! Read model: one table per content kind (`posts`, `notes`,
//! `activities`) with relations denormalized into array/jsonb columns, so
//! a single-row fetch already has the depth the canonical-text builder
//! needs. Vectors live in a pgvector column on the same row; KNN uses the
//! `<=>` cosine-distance operator.
//!
//! The two write methods are plain single-row UPDATEs that touch only the
//! embedding/recommendation columns. Nothing here goes near the content
//! revision tables — derived metadata must not create revisions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pgvector::Vector;
use sqlx::PgPool;
use uuid::Uuid;

use folio_core::models::content::{
    ActivityFields, ActivityReference, ContentBody, ContentItem, ContentKind, ContentMeta,
    EmbeddingRecord, NoteFields, NoteType, ParticipantReview, PostFields, PublicationStatus,
};
use folio_core::store::{Author, ContentStore, Page, StoreError};

pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn table(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Post => "posts",
        ContentKind::Note => "notes",
        ContentKind::Activity => "activities",
    }
}

/// SQL expression for the timestamp a kind sorts by.
fn timestamp_expr(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Post | ContentKind::Note => "COALESCE(published_at, created_at)",
        ContentKind::Activity => "COALESCE(finished_at, started_at, published_at, created_at)",
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(sqlx::FromRow)]
struct EmbeddingColumns {
    embedding: Option<Vector>,
    embedding_model: Option<String>,
    embedding_dimensions: Option<i32>,
    embedding_generated_at: Option<DateTime<Utc>>,
    embedding_text_hash: Option<String>,
    recommended_ids: Option<Vec<Uuid>>,
}

impl EmbeddingColumns {
    fn into_record(self) -> (Option<EmbeddingRecord>, Vec<Uuid>) {
        let recommended = self.recommended_ids.unwrap_or_default();
        let record = match (
            self.embedding,
            self.embedding_model,
            self.embedding_dimensions,
            self.embedding_generated_at,
            self.embedding_text_hash,
        ) {
            (Some(vector), Some(model), Some(dimensions), Some(generated_at), Some(text_hash)) => {
                Some(EmbeddingRecord {
                    vector: vector.to_vec(),
                    model,
                    dimensions: dimensions as usize,
                    generated_at,
                    text_hash,
                })
            }
            _ => None,
        };
        (record, recommended)
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    author_id: Uuid,
    status: String,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    title: String,
    description: Option<String>,
    project_name: Option<String>,
    topics: Vec<String>,
    body: Option<serde_json::Value>,
    #[sqlx(flatten)]
    embedding: EmbeddingColumns,
}

#[derive(sqlx::FromRow)]
struct NoteRow {
    id: Uuid,
    author_id: Uuid,
    status: String,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    title: String,
    note_type: String,
    author_name: Option<String>,
    quoted_person: Option<String>,
    topics: Vec<String>,
    body: Option<serde_json::Value>,
    #[sqlx(flatten)]
    embedding: EmbeddingColumns,
}

#[derive(sqlx::FromRow)]
struct ActivityRow {
    id: Uuid,
    author_id: Uuid,
    status: String,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    label: String,
    reference_title: Option<String>,
    reference_kind: Option<String>,
    reference_description: Option<String>,
    notes: Option<serde_json::Value>,
    reviews: Option<serde_json::Value>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    #[sqlx(flatten)]
    embedding: EmbeddingColumns,
}

fn parse_status(kind: ContentKind, id: Uuid, status: &str) -> Result<PublicationStatus, StoreError> {
    match status {
        "published" => Ok(PublicationStatus::Published),
        "draft" => Ok(PublicationStatus::Draft),
        other => Err(StoreError::Corrupt {
            kind,
            id,
            reason: format!("unknown status '{}'", other),
        }),
    }
}

fn build_meta(
    kind: ContentKind,
    id: Uuid,
    author_id: Uuid,
    status: &str,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    embedding: EmbeddingColumns,
) -> Result<ContentMeta, StoreError> {
    let status = parse_status(kind, id, status)?;
    let (embedding, recommended_ids) = embedding.into_record();
    Ok(ContentMeta {
        id,
        author_id,
        status,
        published_at,
        created_at,
        embedding,
        recommended_ids,
    })
}

impl PostRow {
    fn into_item(self) -> Result<ContentItem, StoreError> {
        let meta = build_meta(
            ContentKind::Post,
            self.id,
            self.author_id,
            &self.status,
            self.published_at,
            self.created_at,
            self.embedding,
        )?;
        Ok(ContentItem {
            meta,
            body: ContentBody::Post(PostFields {
                title: self.title,
                description: self.description,
                project: self.project_name,
                topics: self.topics,
                body: self.body,
            }),
        })
    }
}

impl NoteRow {
    fn into_item(self) -> Result<ContentItem, StoreError> {
        let note_type = match self.note_type.as_str() {
            "quote" => NoteType::Quote,
            "thought" => NoteType::Thought,
            other => {
                return Err(StoreError::Corrupt {
                    kind: ContentKind::Note,
                    id: self.id,
                    reason: format!("unknown note_type '{}'", other),
                })
            }
        };
        let meta = build_meta(
            ContentKind::Note,
            self.id,
            self.author_id,
            &self.status,
            self.published_at,
            self.created_at,
            self.embedding,
        )?;
        Ok(ContentItem {
            meta,
            body: ContentBody::Note(NoteFields {
                title: self.title,
                note_type,
                author_name: self.author_name,
                quoted_person: self.quoted_person,
                topics: self.topics,
                body: self.body,
            }),
        })
    }
}

impl ActivityRow {
    fn into_item(self) -> Result<ContentItem, StoreError> {
        let id = self.id;
        let reference = match (self.reference_title, self.reference_kind) {
            (Some(title), Some(kind_label)) => Some(ActivityReference {
                title,
                kind_label,
                description: self.reference_description,
            }),
            _ => None,
        };
        let reviews: Vec<ParticipantReview> = match self.reviews {
            Some(value) => {
                serde_json::from_value(value).map_err(|e| StoreError::Corrupt {
                    kind: ContentKind::Activity,
                    id,
                    reason: format!("bad reviews json: {}", e),
                })?
            }
            None => Vec::new(),
        };
        let meta = build_meta(
            ContentKind::Activity,
            self.id,
            self.author_id,
            &self.status,
            self.published_at,
            self.created_at,
            self.embedding,
        )?;
        Ok(ContentItem {
            meta,
            body: ContentBody::Activity(ActivityFields {
                label: self.label,
                reference,
                notes: self.notes,
                reviews,
                started_at: self.started_at,
                finished_at: self.finished_at,
            }),
        })
    }
}

// ============================================================================
// Queries
// ============================================================================

const POST_COLUMNS: &str = "id, author_id, status, published_at, created_at, title, description, \
     project_name, topics, body, embedding, embedding_model, embedding_dimensions, \
     embedding_generated_at, embedding_text_hash, recommended_ids";

const NOTE_COLUMNS: &str = "id, author_id, status, published_at, created_at, title, note_type, \
     author_name, quoted_person, topics, body, embedding, embedding_model, embedding_dimensions, \
     embedding_generated_at, embedding_text_hash, recommended_ids";

const ACTIVITY_COLUMNS: &str = "id, author_id, status, published_at, created_at, label, \
     reference_title, reference_kind, reference_description, notes, reviews, started_at, \
     finished_at, embedding, embedding_model, embedding_dimensions, embedding_generated_at, \
     embedding_text_hash, recommended_ids";

fn columns(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Post => POST_COLUMNS,
        ContentKind::Note => NOTE_COLUMNS,
        ContentKind::Activity => ACTIVITY_COLUMNS,
    }
}

impl PgContentStore {
    async fn fetch_rows(
        &self,
        kind: ContentKind,
        author_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ContentItem>, StoreError> {
        let sql = format!(
            "SELECT {cols} FROM {table} WHERE author_id = $1 AND status = 'published' \
             ORDER BY {ts} DESC LIMIT $2 OFFSET $3",
            cols = columns(kind),
            table = table(kind),
            ts = timestamp_expr(kind),
        );

        match kind {
            ContentKind::Post => {
                let rows: Vec<PostRow> = sqlx::query_as(&sql)
                    .bind(author_id)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?;
                rows.into_iter().map(PostRow::into_item).collect()
            }
            ContentKind::Note => {
                let rows: Vec<NoteRow> = sqlx::query_as(&sql)
                    .bind(author_id)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?;
                rows.into_iter().map(NoteRow::into_item).collect()
            }
            ContentKind::Activity => {
                let rows: Vec<ActivityRow> = sqlx::query_as(&sql)
                    .bind(author_id)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?;
                rows.into_iter().map(ActivityRow::into_item).collect()
            }
        }
    }
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn find_author(&self, username: &str) -> Result<Option<Author>, StoreError> {
        let row: Option<(Uuid, String)> =
            sqlx::query_as("SELECT id, username FROM authors WHERE username = $1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id, username)| Author { id, username }))
    }

    async fn list_published(
        &self,
        kind: ContentKind,
        author_id: Uuid,
        page: u32,
        limit: u32,
    ) -> Result<Page<ContentItem>, StoreError> {
        let count_sql = format!(
            "SELECT COUNT(*) FROM {} WHERE author_id = $1 AND status = 'published'",
            table(kind)
        );
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(author_id)
            .fetch_one(&self.pool)
            .await?;

        let offset = (page.saturating_sub(1) as i64) * limit as i64;
        let items = self
            .fetch_rows(kind, author_id, limit as i64, offset)
            .await?;

        Ok(Page {
            items,
            total: total as u64,
        })
    }

    async fn fetch_item(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<Option<ContentItem>, StoreError> {
        let sql = format!(
            "SELECT {cols} FROM {table} WHERE id = $1",
            cols = columns(kind),
            table = table(kind),
        );

        match kind {
            ContentKind::Post => {
                let row: Option<PostRow> = sqlx::query_as(&sql)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?;
                row.map(PostRow::into_item).transpose()
            }
            ContentKind::Note => {
                let row: Option<NoteRow> = sqlx::query_as(&sql)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?;
                row.map(NoteRow::into_item).transpose()
            }
            ContentKind::Activity => {
                let row: Option<ActivityRow> = sqlx::query_as(&sql)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?;
                row.map(ActivityRow::into_item).transpose()
            }
        }
    }

    async fn write_embedding(
        &self,
        kind: ContentKind,
        id: Uuid,
        record: &EmbeddingRecord,
    ) -> Result<(), StoreError> {
        let sql = format!(
            "UPDATE {} SET embedding = $1, embedding_model = $2, embedding_dimensions = $3, \
             embedding_generated_at = $4, embedding_text_hash = $5 WHERE id = $6",
            table(kind)
        );
        sqlx::query(&sql)
            .bind(Vector::from(record.vector.clone()))
            .bind(&record.model)
            .bind(record.dimensions as i32)
            .bind(record.generated_at)
            .bind(&record.text_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn nearest_ids(
        &self,
        kind: ContentKind,
        vector: &[f32],
        exclude: Uuid,
        k: usize,
    ) -> Result<Vec<Uuid>, StoreError> {
        let sql = format!(
            "SELECT id FROM {} WHERE status = 'published' AND id <> $2 AND embedding IS NOT NULL \
             ORDER BY embedding <=> $1::vector LIMIT $3",
            table(kind)
        );
        let ids: Vec<(Uuid,)> = sqlx::query_as(&sql)
            .bind(Vector::from(vector.to_vec()))
            .bind(exclude)
            .bind(k as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn write_recommendations(
        &self,
        kind: ContentKind,
        id: Uuid,
        ids: &[Uuid],
    ) -> Result<(), StoreError> {
        let sql = format!(
            "UPDATE {} SET recommended_ids = $1 WHERE id = $2",
            table(kind)
        );
        sqlx::query(&sql)
            .bind(ids.to_vec())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
