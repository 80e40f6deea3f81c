//! Read-time feed types. Never persisted — produced by the feed
//! aggregator from the per-kind stores on every request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::content::{ContentItem, ContentKind};

/// Which sources a feed request draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedFilter {
    All,
    Posts,
    Notes,
    Activities,
}

impl FeedFilter {
    pub fn parse(s: &str) -> Option<FeedFilter> {
        match s {
            "all" => Some(FeedFilter::All),
            "posts" => Some(FeedFilter::Posts),
            "notes" => Some(FeedFilter::Notes),
            "activities" => Some(FeedFilter::Activities),
            _ => None,
        }
    }

    /// The single backing kind, when the filter is not `All`.
    pub fn single_kind(&self) -> Option<ContentKind> {
        match self {
            FeedFilter::All => None,
            FeedFilter::Posts => Some(ContentKind::Post),
            FeedFilter::Notes => Some(ContentKind::Note),
            FeedFilter::Activities => Some(ContentKind::Activity),
        }
    }
}

/// One entry of the merged feed, tagged with its source kind and the
/// timestamp it was ranked by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    pub kind: ContentKind,
    pub timestamp: DateTime<Utc>,
    pub item: ContentItem,
}

impl FeedItem {
    pub fn new(item: ContentItem) -> Self {
        Self {
            kind: item.kind(),
            timestamp: item.primary_timestamp(),
            item,
        }
    }
}

/// A page of the feed. Totals are exact counts from the backing stores,
/// independent of any over-fetch performed while merging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    pub page: u32,
    pub limit: u32,
    pub total_items: u64,
    pub total_pages: u64,
}
