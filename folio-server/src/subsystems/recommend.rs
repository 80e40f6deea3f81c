//! Recommendation engine — top-K similar items per content item.
//!
//! Runs strictly after a successful embedding write for the same item.
//! It re-reads the persisted vector rather than trusting any in-memory
//! copy, so a vector that failed to persist can never produce a
//! recommendation list.

use uuid::Uuid;

use folio_core::models::content::ContentKind;
use folio_core::store::{ContentStore, StoreError};

/// Recompute and persist the nearest-neighbour list for one item.
///
/// Returns `Ok(None)` when the item is missing or has no persisted
/// vector (a no-op, nothing written). Otherwise writes the full ordered
/// list in one update and returns it — the previous list is never left
/// partially overwritten.
pub async fn refresh_recommendations(
    store: &dyn ContentStore,
    kind: ContentKind,
    id: Uuid,
    top_k: usize,
) -> Result<Option<Vec<Uuid>>, StoreError> {
    let Some(item) = store.fetch_item(kind, id).await? else {
        tracing::debug!(kind = %kind, id = %id, "Item vanished before recommendation pass");
        return Ok(None);
    };

    let Some(record) = item.meta.embedding else {
        tracing::debug!(kind = %kind, id = %id, "No persisted vector, skipping recommendations");
        return Ok(None);
    };

    let ids = store.nearest_ids(kind, &record.vector, id, top_k).await?;
    store.write_recommendations(kind, id, &ids).await?;

    Ok(Some(ids))
}

// ============================================================================
// TESTS
// ============================================================================
