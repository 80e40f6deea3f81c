//! Embedder subsystem — derives and persists semantic vectors.
//!
//! Triggered by publish/update events. The pipeline:
//! - fetch item → build canonical text → compare hash → call provider →
//!   persist vector + metadata → chain the recommendation engine.
//!
//! `spawn_publish_task` runs the pipeline in `tokio::spawn` AFTER the
//! triggering write has returned to its caller — a publish never waits on
//! or fails because of embedding work.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use folio_core::config::{EmbeddingSettings, RecommendConfig};
use folio_core::embeddings::EmbeddingBackend;
use folio_core::hash::text_hash;
use folio_core::models::content::{ContentKind, EmbeddingRecord};
use folio_core::store::{ContentStore, StoreError};
use folio_core::text::canonical_text;
use folio_core::EmbeddingError;

use super::recommend;

/// Why a generation run did not produce an embedding.
///
/// `NotFound`, `NotPublished`, `EmptyContent` and `EmptyText` are expected
/// outcomes for unpublishable items, not system failures; the provider and
/// store variants are real failures.
#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("{kind} {id} not found")]
    NotFound { kind: ContentKind, id: Uuid },

    #[error("{kind} {id} is not published")]
    NotPublished { kind: ContentKind, id: Uuid },

    #[error("{kind} {id} has no content to embed")]
    EmptyContent { kind: ContentKind, id: Uuid },

    #[error("{kind} {id} produced empty canonical text")]
    EmptyText { kind: ContentKind, id: Uuid },

    #[error("Embedding provider failed: {0}")]
    Provider(#[from] EmbeddingError),

    #[error(
        "Provider returned {got_model}/{got_dimensions}, expected {want_model}/{want_dimensions}"
    )]
    ProviderShape {
        got_model: String,
        got_dimensions: usize,
        want_model: String,
        want_dimensions: usize,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EmbedError {
    /// Expected outcomes log at info and are not operational failures.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            EmbedError::NotFound { .. }
                | EmbedError::NotPublished { .. }
                | EmbedError::EmptyContent { .. }
                | EmbedError::EmptyText { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedOutcome {
    /// A new vector was generated and persisted.
    Generated,
    /// Canonical text unchanged since the stored vector — no write.
    Skipped,
}

/// Generate and persist an embedding for one item.
///
/// Performs exactly one store write on `Generated`; zero writes on
/// `Skipped` or any error.
pub async fn generate_embedding(
    store: &dyn ContentStore,
    backend: &dyn EmbeddingBackend,
    settings: &EmbeddingSettings,
    kind: ContentKind,
    id: Uuid,
) -> Result<EmbedOutcome, EmbedError> {
    let item = store
        .fetch_item(kind, id)
        .await?
        .ok_or(EmbedError::NotFound { kind, id })?;

    if !item.is_published() {
        return Err(EmbedError::NotPublished { kind, id });
    }

    if !item.has_content() {
        return Err(EmbedError::EmptyContent { kind, id });
    }

    let text = canonical_text(&item);
    if text.trim().is_empty() {
        return Err(EmbedError::EmptyText { kind, id });
    }

    let current_hash = text_hash(&text);
    if item
        .meta
        .embedding
        .as_ref()
        .is_some_and(|e| e.text_hash == current_hash)
    {
        tracing::debug!(kind = %kind, id = %id, "Canonical text unchanged, skipping embedding");
        return Ok(EmbedOutcome::Skipped);
    }

    let embedding = backend.embed(&text).await?;

    // Refuse to store a vector of an unexpected shape — a silently wrong
    // model or dimension would poison every similarity query.
    if embedding.model != settings.model || embedding.dimensions != settings.dimensions {
        return Err(EmbedError::ProviderShape {
            got_model: embedding.model,
            got_dimensions: embedding.dimensions,
            want_model: settings.model.clone(),
            want_dimensions: settings.dimensions,
        });
    }

    let record = EmbeddingRecord {
        vector: embedding.vector,
        model: embedding.model,
        dimensions: embedding.dimensions,
        generated_at: Utc::now(),
        text_hash: current_hash,
    };

    store.write_embedding(kind, id, &record).await?;
    tracing::info!(kind = %kind, id = %id, backend = backend.name(), "Embedding persisted");

    Ok(EmbedOutcome::Generated)
}

/// Full publish pipeline: generate, then refresh recommendations.
///
/// Recommendation failures are logged and swallowed — they must never
/// undo or mask a successful embedding write.
pub async fn run_publish_pipeline(
    store: &dyn ContentStore,
    backend: &dyn EmbeddingBackend,
    settings: &EmbeddingSettings,
    recommend_config: &RecommendConfig,
    kind: ContentKind,
    id: Uuid,
) -> Result<EmbedOutcome, EmbedError> {
    let outcome = generate_embedding(store, backend, settings, kind, id).await?;

    if outcome == EmbedOutcome::Generated {
        match recommend::refresh_recommendations(store, kind, id, recommend_config.top_k).await {
            Ok(Some(ids)) => {
                tracing::info!(kind = %kind, id = %id, count = ids.len(), "Recommendations refreshed")
            }
            Ok(None) => {
                tracing::debug!(kind = %kind, id = %id, "No persisted vector, recommendations skipped")
            }
            Err(e) => {
                tracing::warn!(kind = %kind, id = %id, error = %e, "Recommendation refresh failed")
            }
        }
    }

    Ok(outcome)
}

/// Fire-and-forget pipeline trigger for publish/update hooks.
///
/// The caller returns immediately; every outcome is logged and none
/// propagates.
pub fn spawn_publish_task(
    store: Arc<dyn ContentStore>,
    backend: Arc<dyn EmbeddingBackend>,
    settings: EmbeddingSettings,
    recommend_config: RecommendConfig,
    kind: ContentKind,
    id: Uuid,
) {
    tokio::spawn(async move {
        match run_publish_pipeline(
            store.as_ref(),
            backend.as_ref(),
            &settings,
            &recommend_config,
            kind,
            id,
        )
        .await
        {
            Ok(EmbedOutcome::Generated) => {
                tracing::info!(kind = %kind, id = %id, "Background embedding completed")
            }
            Ok(EmbedOutcome::Skipped) => {
                tracing::debug!(kind = %kind, id = %id, "Background embedding skipped")
            }
            Err(e) if e.is_expected() => {
                tracing::info!(kind = %kind, id = %id, reason = %e, "Background embedding not applicable")
            }
            Err(e) => {
                tracing::error!(kind = %kind, id = %id, error = %e, "Background embedding failed")
            }
        }
    });
}

// ============================================================================
// TESTS
// ============================================================================
