//! The note entity and its construction boundary.
//!
//! Every note that enters the program from storage, an import or a share link
//! is read as a [`NoteRecord`] first and turned into a [`Note`] by
//! `Note::from`, which fills in missing fields and repairs broken invariants.
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{extract_text_from_html, generate_id, normalize_tag, normalize_tags, NoteColor, NoteId};

/// Represents a single note in our system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "NoteRecord")]
pub struct Note {
    /// Unique identifier for the note
    pub id: NoteId,
    /// Note title, may be empty
    pub title: String,
    /// Note content as HTML markup
    pub content: String,
    /// When the note was created
    pub created: DateTime<Utc>,
    /// Last modification time
    pub updated: DateTime<Utc>,
    /// Color label
    pub color: NoteColor,
    /// Lowercase tags, unique, in insertion order
    pub tags: Vec<String>,
    /// Pinned notes are listed first
    pub pinned: bool,
}

/// A note as found in external data, with every field optional.
///
/// A field of the wrong type reads as absent instead of rejecting the record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteRecord {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<NoteId>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_color")]
    pub color: Option<NoteColor>,
    #[serde(default, deserialize_with = "lenient_tags")]
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub pinned: Option<bool>,
}

/// Partial update applied by [`Note::update`]; `None` leaves a field alone
#[derive(Debug, Clone, Default)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub color: Option<NoteColor>,
    pub tags: Option<Vec<String>>,
    pub pinned: Option<bool>,
}

impl From<NoteRecord> for Note {
    fn from(record: NoteRecord) -> Self {
        let now = Utc::now();
        let created = record.created.unwrap_or(now);
        let updated = record.updated.unwrap_or(now).max(created);

        Note {
            id: record.id.unwrap_or_else(|| NoteId(generate_id())),
            title: record.title.unwrap_or_default(),
            content: record.content.unwrap_or_default(),
            created,
            updated,
            color: record.color.unwrap_or_default(),
            tags: record.tags.map(normalize_tags).unwrap_or_default(),
            pinned: record.pinned.unwrap_or(false),
        }
    }
}

impl Note {
    /// Creates a new note with the given title and content
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Note::from(NoteRecord {
            title: Some(title.into()),
            content: Some(content.into()),
            ..NoteRecord::default()
        })
    }

    /// Applies a partial update. `updated` is refreshed even when nothing changed.
    pub fn update(&mut self, changes: NoteUpdate) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(content) = changes.content {
            self.content = content;
        }
        if let Some(color) = changes.color {
            self.color = color;
        }
        if let Some(tags) = changes.tags {
            self.tags = normalize_tags(tags);
        }
        if let Some(pinned) = changes.pinned {
            self.pinned = pinned;
        }
        self.touch();
    }

    /// Adds a tag after trimming and lowercasing it.
    ///
    /// Returns `false` when the tag is empty or already present.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let Some(tag) = normalize_tag(tag) else {
            return false;
        };
        if self.tags.contains(&tag) {
            return false;
        }
        self.tags.push(tag);
        self.touch();
        true
    }

    /// Removes a tag matching exactly. Returns whether one was removed.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        match self.tags.iter().position(|t| t == tag) {
            Some(index) => {
                self.tags.remove(index);
                self.touch();
                true
            }
            None => false,
        }
    }

    pub fn toggle_pin(&mut self) {
        self.pinned = !self.pinned;
        self.touch();
    }

    /// The content with all markup removed
    pub fn plain_text(&self) -> String {
        extract_text_from_html(&self.content)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    // never moves backwards, even if the wall clock does
    fn touch(&mut self) {
        self.updated = Utc::now().max(self.updated);
    }
}

fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<Option<NoteId>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .map(NoteId),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    })
}

fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    })
}

/// Strings as-is; numbers and booleans by their text form
fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_color<'de, D>(deserializer: D) -> std::result::Result<Option<NoteColor>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(name)) => Some(NoteColor::from_name(&name)),
        _ => None,
    })
}

/// Keeps the string items of an array; anything else in it is skipped
fn lenient_tags<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(tag) => Some(tag),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    })
}

fn lenient_flag<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::String(s)) => match s.trim() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Note {
        let mut note = Note::new("Groceries", "<p>Milk &amp; bread</p>");
        note.add_tag("Shopping");
        note.color = NoteColor::Green;
        note.pinned = true;
        note
    }

    #[test]
    fn new_note_has_defaults() {
        let note = Note::new("", "");
        assert_eq!(note.color, NoteColor::Default);
        assert!(note.tags.is_empty());
        assert!(!note.pinned);
        assert_eq!(note.created, note.updated);
    }

    #[test]
    fn serialization_round_trip_keeps_every_field() {
        let note = sample();
        let json = serde_json::to_string(&note).unwrap();
        let restored: Note = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, note);
    }

    #[test]
    fn record_fills_missing_fields() {
        let note: Note = serde_json::from_str(r#"{"title":"Only a title"}"#).unwrap();
        assert_eq!(note.title, "Only a title");
        assert_eq!(note.content, "");
        assert_eq!(note.color, NoteColor::Default);
        assert!(note.id.0 > 0);
    }

    #[test]
    fn record_accepts_loose_values() {
        let note: Note = serde_json::from_str(
            r#"{"id":"1700000000123","title":"t","content":"c","color":"teal",
                "created":1700000000000,"updated":"not a date","tags":[" A ","a","b"]}"#,
        )
        .unwrap();
        assert_eq!(note.id, NoteId(1700000000123));
        assert_eq!(note.color, NoteColor::Default);
        assert_eq!(note.created.timestamp_millis(), 1700000000000);
        assert!(note.updated >= note.created);
        assert_eq!(note.tags, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn mistyped_fields_fall_back_to_defaults() {
        let note: Note = serde_json::from_str(
            r#"{"id":1,"title":42,"content":"x","color":5,"tags":["a",null,7,"B"],"pinned":"yes"}"#,
        )
        .unwrap();
        assert_eq!(note.id, NoteId(1));
        assert_eq!(note.title, "42");
        assert_eq!(note.color, NoteColor::Default);
        assert_eq!(note.tags, vec!["a".to_string(), "b".to_string()]);
        assert!(!note.pinned);

        let note: Note =
            serde_json::from_str(r#"{"title":"t","content":"c","tags":"a,b","pinned":"true"}"#).unwrap();
        assert!(note.tags.is_empty());
        assert!(note.pinned);
    }

    #[test]
    fn updated_never_precedes_created() {
        let note: Note = serde_json::from_str(
            r#"{"title":"t","content":"c","created":"2024-05-02T00:00:00Z","updated":"2024-05-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(note.updated, note.created);
    }

    #[test]
    fn update_only_touches_given_fields() {
        let mut note = sample();
        let before = note.clone();
        note.update(NoteUpdate {
            title: Some("Renamed".to_string()),
            ..NoteUpdate::default()
        });
        assert_eq!(note.title, "Renamed");
        assert_eq!(note.content, before.content);
        assert_eq!(note.tags, before.tags);
        assert_eq!(note.created, before.created);
        assert!(note.updated >= before.updated);
    }

    #[test]
    fn empty_update_still_refreshes_timestamp() {
        let mut note = sample();
        note.updated = note.created;
        std::thread::sleep(std::time::Duration::from_millis(2));
        note.update(NoteUpdate::default());
        assert!(note.updated > note.created);
    }

    #[test]
    fn update_normalizes_tags() {
        let mut note = sample();
        note.update(NoteUpdate {
            tags: Some(vec!["Work".to_string(), " work ".to_string()]),
            ..NoteUpdate::default()
        });
        assert_eq!(note.tags, vec!["work".to_string()]);
    }

    #[test]
    fn add_tag_normalizes_and_skips_duplicates() {
        let mut note = Note::new("t", "c");
        assert!(note.add_tag("  Rust "));
        assert!(!note.add_tag("RUST"));
        assert!(!note.add_tag("   "));
        assert_eq!(note.tags, vec!["rust".to_string()]);
    }

    #[test]
    fn remove_tag_only_touches_on_removal() {
        let mut note = sample();
        let stamp = note.updated;
        assert!(!note.remove_tag("missing"));
        assert_eq!(note.updated, stamp);
        assert!(note.remove_tag("shopping"));
        assert!(note.tags.is_empty());
        assert!(note.updated >= stamp);
    }

    #[test]
    fn toggle_pin_flips() {
        let mut note = Note::new("t", "c");
        note.toggle_pin();
        assert!(note.pinned);
        note.toggle_pin();
        assert!(!note.pinned);
    }

    #[test]
    fn touch_never_goes_backwards() {
        let mut note = Note::new("t", "c");
        let future = Utc::now() + chrono::Duration::days(1);
        note.updated = future;
        note.toggle_pin();
        assert_eq!(note.updated, future);
    }

    #[test]
    fn plain_text_strips_markup() {
        assert_eq!(sample().plain_text(), "Milk & bread");
    }
}
