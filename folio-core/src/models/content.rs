//! Content domain model — posts, notes and logged activities.
//!
//! The three kinds share one metadata shape (`ContentMeta`) and differ in
//! their payload (`ContentBody`). Kind-specific behaviour (timestamp
//! resolution, content presence) lives on `ContentItem` so callers never
//! branch on a string discriminator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discriminator for the three content sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Post,
    Note,
    Activity,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Post => "post",
            ContentKind::Note => "note",
            ContentKind::Activity => "activity",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationStatus {
    Draft,
    Published,
}

/// Embedding metadata persisted alongside an item.
///
/// Invariant: `text_hash` is always the hash of the canonical text that
/// produced `vector`. If the item's current canonical text hashes to a
/// different value the record is stale and must be regenerated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub vector: Vec<f32>,
    pub model: String,
    pub dimensions: usize,
    pub generated_at: DateTime<Utc>,
    pub text_hash: String,
}

/// Fields common to every content kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentMeta {
    pub id: Uuid,
    pub author_id: Uuid,
    pub status: PublicationStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub embedding: Option<EmbeddingRecord>,
    /// Nearest-first recommendation list, written only by the
    /// recommendation engine.
    #[serde(default)]
    pub recommended_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostFields {
    pub title: String,
    pub description: Option<String>,
    /// Name of the linked project, when the post belongs to one.
    pub project: Option<String>,
    pub topics: Vec<String>,
    /// Rich structured body (editor JSON). `None` means the post has no
    /// body at all, which is distinct from a body that flattens to "".
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteType {
    Quote,
    Thought,
}

impl NoteType {
    pub fn label(&self) -> &'static str {
        match self {
            NoteType::Quote => "Quote",
            NoteType::Thought => "Thought",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteFields {
    pub title: String,
    pub note_type: NoteType,
    /// Author of the quoted work, when known.
    pub author_name: Option<String>,
    pub quoted_person: Option<String>,
    pub topics: Vec<String>,
    pub body: Option<serde_json::Value>,
}

/// The thing an activity was about (a film, a book, a place...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityReference {
    pub title: String,
    /// Human label for the reference type, e.g. "Movie".
    pub kind_label: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantReview {
    /// `None` when the participant relation could not be resolved.
    pub participant: Option<String>,
    pub note: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityFields {
    /// Verb label, e.g. "Watched" or "Read".
    pub label: String,
    pub reference: Option<ActivityReference>,
    pub notes: Option<serde_json::Value>,
    #[serde(default)]
    pub reviews: Vec<ParticipantReview>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Kind-specific payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContentBody {
    Post(PostFields),
    Note(NoteFields),
    Activity(ActivityFields),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(flatten)]
    pub meta: ContentMeta,
    #[serde(flatten)]
    pub body: ContentBody,
}

impl ContentItem {
    pub fn kind(&self) -> ContentKind {
        match self.body {
            ContentBody::Post(_) => ContentKind::Post,
            ContentBody::Note(_) => ContentKind::Note,
            ContentBody::Activity(_) => ContentKind::Activity,
        }
    }

    /// The timestamp an item sorts by in the combined feed.
    ///
    /// Activities prefer their finish date, then start date, then the
    /// publish date. Posts and notes use publish date, falling back to
    /// creation date. `created_at` is the final fallback for all kinds so
    /// every item has a defined position.
    pub fn primary_timestamp(&self) -> DateTime<Utc> {
        match &self.body {
            ContentBody::Activity(a) => a
                .finished_at
                .or(a.started_at)
                .or(self.meta.published_at)
                .unwrap_or(self.meta.created_at),
            ContentBody::Post(_) | ContentBody::Note(_) => {
                self.meta.published_at.unwrap_or(self.meta.created_at)
            }
        }
    }

    /// Whether the item carries anything worth embedding at all.
    ///
    /// Posts and notes need a body. An activity counts as having content
    /// when it links a reference, has notes, or carries reviews.
    pub fn has_content(&self) -> bool {
        match &self.body {
            ContentBody::Post(p) => p.body.is_some(),
            ContentBody::Note(n) => n.body.is_some(),
            ContentBody::Activity(a) => {
                a.reference.is_some() || a.notes.is_some() || !a.reviews.is_empty()
            }
        }
    }

    pub fn is_published(&self) -> bool {
        self.meta.status == PublicationStatus::Published
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn meta(published: Option<i64>, created: i64) -> ContentMeta {
        ContentMeta {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            status: PublicationStatus::Published,
            published_at: published.map(ts),
            created_at: ts(created),
            embedding: None,
            recommended_ids: Vec::new(),
        }
    }

    #[test]
    fn post_timestamp_prefers_publish_date() {
        let item = ContentItem {
            meta: meta(Some(100), 50),
            body: ContentBody::Post(PostFields {
                title: "t".into(),
                description: None,
                project: None,
                topics: vec![],
                body: None,
            }),
        };
        assert_eq!(item.primary_timestamp(), ts(100));
    }

    #[test]
    fn note_timestamp_falls_back_to_created() {
        let item = ContentItem {
            meta: meta(None, 50),
            body: ContentBody::Note(NoteFields {
                title: "t".into(),
                note_type: NoteType::Thought,
                author_name: None,
                quoted_person: None,
                topics: vec![],
                body: None,
            }),
        };
        assert_eq!(item.primary_timestamp(), ts(50));
    }

    #[test]
    fn activity_timestamp_resolution_order() {
        let mut fields = ActivityFields {
            label: "Watched".into(),
            reference: None,
            notes: None,
            reviews: vec![],
            started_at: Some(ts(20)),
            finished_at: Some(ts(30)),
        };

        let item = ContentItem {
            meta: meta(Some(10), 5),
            body: ContentBody::Activity(fields.clone()),
        };
        assert_eq!(item.primary_timestamp(), ts(30), "finish date wins");

        fields.finished_at = None;
        let item = ContentItem {
            meta: meta(Some(10), 5),
            body: ContentBody::Activity(fields.clone()),
        };
        assert_eq!(item.primary_timestamp(), ts(20), "then start date");

        fields.started_at = None;
        let item = ContentItem {
            meta: meta(Some(10), 5),
            body: ContentBody::Activity(fields),
        };
        assert_eq!(item.primary_timestamp(), ts(10), "then publish date");
    }

    #[test]
    fn activity_with_only_reference_has_content() {
        let item = ContentItem {
            meta: meta(None, 1),
            body: ContentBody::Activity(ActivityFields {
                label: "Watched".into(),
                reference: Some(ActivityReference {
                    title: "Interstellar".into(),
                    kind_label: "Movie".into(),
                    description: None,
                }),
                notes: None,
                reviews: vec![],
                started_at: None,
                finished_at: None,
            }),
        };
        assert!(item.has_content());
    }

    #[test]
    fn post_without_body_has_no_content() {
        let item = ContentItem {
            meta: meta(None, 1),
            body: ContentBody::Post(PostFields {
                title: "t".into(),
                description: Some("d".into()),
                project: None,
                topics: vec![],
                body: None,
            }),
        };
        assert!(!item.has_content());
    }
}
