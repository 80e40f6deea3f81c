//! Feed aggregator — one reverse-chronological stream per author.
//!
//! Single-kind filters delegate straight to that kind's paginated query.
//! The `all` filter has no unified backing query, so it over-fetches from
//! each source, merges in memory and slices the requested window.
//!
//! Correctness caveat: the merge is exact only while no source holds more
//! than `page * limit + buffer` items ranked above the slice window. The
//! configurable buffer makes that bound generous for realistic feeds; a
//! true K-way merge over per-source cursors would remove it entirely and
//! is the documented upgrade path for very deep pagination.

use folio_core::models::content::ContentKind;
use folio_core::models::feed::{FeedFilter, FeedItem, FeedPage};
use folio_core::store::{ContentStore, StoreError};

/// Hard cap on page size at the service boundary.
const MAX_LIMIT: u32 = 100;

/// Fetch one feed page for an author.
///
/// `Ok(None)` means the author does not exist — a normal outcome the
/// caller branches on, not an error. An existing author with no items
/// yields an empty page with zero totals.
pub async fn get_feed(
    store: &dyn ContentStore,
    username: &str,
    filter: FeedFilter,
    page: u32,
    limit: u32,
    overfetch_buffer: u32,
) -> Result<Option<FeedPage>, StoreError> {
    let page = page.max(1);
    let limit = limit.clamp(1, MAX_LIMIT);

    let Some(author) = store.find_author(username).await? else {
        return Ok(None);
    };

    let feed_page = match filter.single_kind() {
        Some(kind) => {
            let native = store.list_published(kind, author.id, page, limit).await?;
            build_page(
                native.items.into_iter().map(FeedItem::new).collect(),
                native.total,
                page,
                limit,
            )
        }
        None => merge_all(store, author.id, page, limit, overfetch_buffer).await?,
    };

    Ok(Some(feed_page))
}

/// The `all` filter: over-fetch each source, merge, slice.
async fn merge_all(
    store: &dyn ContentStore,
    author_id: uuid::Uuid,
    page: u32,
    limit: u32,
    buffer: u32,
) -> Result<FeedPage, StoreError> {
    // Enough from each source to cover every rank above the slice window,
    // plus the buffer headroom. `page` is unbounded caller input; the
    // arithmetic must not wrap.
    let cap = u64::from(page)
        .saturating_mul(u64::from(limit))
        .saturating_add(u64::from(buffer))
        .min(u64::from(u32::MAX)) as u32;

    // The three reads are independent; issue them concurrently.
    let (posts, notes, activities) = tokio::try_join!(
        store.list_published(ContentKind::Post, author_id, 1, cap),
        store.list_published(ContentKind::Note, author_id, 1, cap),
        store.list_published(ContentKind::Activity, author_id, 1, cap),
    )?;

    let total_items = posts.total + notes.total + activities.total;

    let mut merged: Vec<FeedItem> = posts
        .items
        .into_iter()
        .chain(notes.items)
        .chain(activities.items)
        .map(FeedItem::new)
        .collect();

    // Stable sort: ties keep source fetch order (posts, notes, activities)
    merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let offset = u64::from(page - 1) * u64::from(limit);
    let items: Vec<FeedItem> = merged
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect();

    Ok(build_page(items, total_items, page, limit))
}

fn build_page(items: Vec<FeedItem>, total_items: u64, page: u32, limit: u32) -> FeedPage {
    FeedPage {
        items,
        page,
        limit,
        total_items,
        total_pages: total_items.div_ceil(limit as u64),
    }
}

// ============================================================================
// TESTS
// ============================================================================
