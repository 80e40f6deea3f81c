//! Canonical embedding text.
//!
//! `extract_text` flattens rich editor JSON into plain text and never
//! fails — malformed structure yields whatever text could be salvaged.
//! `canonical_text` builds the deterministic per-kind string fed to the
//! embedding provider; identical items always produce identical output,
//! which is what makes hash-based change detection meaningful.

use crate::models::content::{ContentBody, ContentItem};

/// Flatten a rich structured body into plain text.
///
/// Walks the node tree collecting every `"text"` string, joining block
/// children with newlines. `None`, non-object input or unknown node shapes
/// degrade to an empty string rather than an error.
pub fn extract_text(rich: Option<&serde_json::Value>) -> String {
    let Some(value) = rich else {
        return String::new();
    };

    let mut out = String::new();
    collect_text(value, &mut out);
    out.trim().to_string()
}

fn collect_text(value: &serde_json::Value, out: &mut String) {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(text) = map.get("text").and_then(|t| t.as_str()) {
                out.push_str(text);
            }
            // Editor roots nest blocks under "root"; blocks nest inline
            // nodes under "children".
            if let Some(root) = map.get("root") {
                collect_text(root, out);
            }
            if let Some(children) = map.get("children").and_then(|c| c.as_array()) {
                for child in children {
                    collect_text(child, out);
                    if child.get("children").is_some() {
                        out.push('\n');
                    }
                }
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_text(item, out);
            }
        }
        serde_json::Value::String(s) => out.push_str(s),
        _ => {}
    }
}

/// Build the canonical embedding input for an item.
///
/// Field order per kind is fixed; empty fields are omitted and the
/// remaining segments are joined with blank lines.
pub fn canonical_text(item: &ContentItem) -> String {
    let segments: Vec<String> = match &item.body {
        ContentBody::Post(p) => {
            let mut parts = vec![p.title.clone()];
            push_opt(&mut parts, p.description.as_deref());
            push_opt(&mut parts, p.project.as_deref());
            if !p.topics.is_empty() {
                parts.push(p.topics.join(", "));
            }
            parts.push(extract_text(p.body.as_ref()));
            parts
        }
        ContentBody::Note(n) => {
            let mut parts = vec![n.title.clone(), format!("Type: {}", n.note_type.label())];
            push_opt(&mut parts, n.author_name.as_deref());
            push_opt(&mut parts, n.quoted_person.as_deref());
            if !n.topics.is_empty() {
                parts.push(n.topics.join(", "));
            }
            parts.push(extract_text(n.body.as_ref()));
            parts
        }
        ContentBody::Activity(a) => {
            let mut parts = Vec::new();
            match &a.reference {
                Some(r) => {
                    parts.push(format!("{} {}", a.label, r.title));
                    parts.push(r.kind_label.clone());
                    push_opt(&mut parts, r.description.as_deref());
                }
                None => parts.push("Activity".to_string()),
            }
            let notes = extract_text(a.notes.as_ref());
            if !notes.is_empty() {
                parts.push(format!("Notes: {}", notes));
            }
            for review in &a.reviews {
                let text = extract_text(review.note.as_ref());
                if text.is_empty() {
                    continue;
                }
                match &review.participant {
                    Some(name) => parts.push(format!("{}'s note: {}", name, text)),
                    None => parts.push(text),
                }
            }
            parts
        }
    };

    segments
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn push_opt(parts: &mut Vec<String>, value: Option<&str>) {
    if let Some(v) = value {
        if !v.trim().is_empty() {
            parts.push(v.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::content::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn rich(text: &str) -> serde_json::Value {
        json!({
            "root": {
                "children": [
                    { "children": [{ "text": text }] }
                ]
            }
        })
    }

    fn published_meta() -> ContentMeta {
        ContentMeta {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            status: PublicationStatus::Published,
            published_at: Some(Utc::now()),
            created_at: Utc::now(),
            embedding: None,
            recommended_ids: Vec::new(),
        }
    }

    #[test]
    fn extract_handles_none_and_malformed_input() {
        assert_eq!(extract_text(None), "");
        assert_eq!(extract_text(Some(&json!(42))), "");
        assert_eq!(extract_text(Some(&json!({"unexpected": true}))), "");
        // Partial salvage: text nodes are collected even when siblings are junk
        let v = json!({ "children": [{ "text": "kept" }, { "weird": [1, 2] }] });
        assert_eq!(extract_text(Some(&v)), "kept");
    }

    #[test]
    fn extract_joins_blocks_with_newlines() {
        let v = json!({
            "root": {
                "children": [
                    { "children": [{ "text": "first" }] },
                    { "children": [{ "text": "second" }] }
                ]
            }
        });
        assert_eq!(extract_text(Some(&v)), "first\nsecond");
    }

    #[test]
    fn post_canonical_text_field_order() {
        let item = ContentItem {
            meta: published_meta(),
            body: ContentBody::Post(PostFields {
                title: "Building a feed".into(),
                description: Some("How the feed works".into()),
                project: Some("Folio".into()),
                topics: vec!["rust".into(), "design".into()],
                body: Some(rich("Body text here.")),
            }),
        };
        assert_eq!(
            canonical_text(&item),
            "Building a feed\n\nHow the feed works\n\nFolio\n\nrust, design\n\nBody text here."
        );
    }

    #[test]
    fn post_canonical_text_omits_empty_fields() {
        let item = ContentItem {
            meta: published_meta(),
            body: ContentBody::Post(PostFields {
                title: "Title".into(),
                description: None,
                project: None,
                topics: vec![],
                body: Some(rich("Body.")),
            }),
        };
        assert_eq!(canonical_text(&item), "Title\n\nBody.");
    }

    #[test]
    fn note_canonical_text_includes_type_label() {
        let item = ContentItem {
            meta: published_meta(),
            body: ContentBody::Note(NoteFields {
                title: "On time".into(),
                note_type: NoteType::Quote,
                author_name: Some("Ursula K. Le Guin".into()),
                quoted_person: None,
                topics: vec!["fiction".into()],
                body: Some(rich("Quoted text.")),
            }),
        };
        assert_eq!(
            canonical_text(&item),
            "On time\n\nType: Quote\n\nUrsula K. Le Guin\n\nfiction\n\nQuoted text."
        );
    }

    #[test]
    fn activity_canonical_text_with_reference_and_reviews() {
        let item = ContentItem {
            meta: published_meta(),
            body: ContentBody::Activity(ActivityFields {
                label: "Watched".into(),
                reference: Some(ActivityReference {
                    title: "Interstellar".into(),
                    kind_label: "Movie".into(),
                    description: Some("A film about time and love.".into()),
                }),
                notes: Some(rich("Second viewing.")),
                reviews: vec![
                    ParticipantReview {
                        participant: Some("Ana".into()),
                        note: Some(rich("Loved it")),
                    },
                    ParticipantReview {
                        participant: None,
                        note: Some(rich("Docking scene!")),
                    },
                    ParticipantReview {
                        participant: Some("Bruno".into()),
                        note: None,
                    },
                ],
                started_at: None,
                finished_at: None,
            }),
        };
        assert_eq!(
            canonical_text(&item),
            "Watched Interstellar\n\nMovie\n\nA film about time and love.\n\n\
             Notes: Second viewing.\n\nAna's note: Loved it\n\nDocking scene!"
        );
    }

    #[test]
    fn activity_without_reference_falls_back_to_generic_label() {
        let item = ContentItem {
            meta: published_meta(),
            body: ContentBody::Activity(ActivityFields {
                label: "Visited".into(),
                reference: None,
                notes: Some(rich("A long walk.")),
                reviews: vec![],
                started_at: None,
                finished_at: None,
            }),
        };
        assert_eq!(canonical_text(&item), "Activity\n\nNotes: A long walk.");
    }

    #[test]
    fn canonical_text_is_deterministic() {
        let item = ContentItem {
            meta: published_meta(),
            body: ContentBody::Post(PostFields {
                title: "Stable".into(),
                description: Some("desc".into()),
                project: None,
                topics: vec!["a".into()],
                body: Some(rich("body")),
            }),
        };
        assert_eq!(canonical_text(&item), canonical_text(&item.clone()));
    }
}
