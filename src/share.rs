//! Share links: a note encoded as base64 JSON in a `note=` URL fragment.
//!
//! The encoding is reversible by anyone holding the link; it is not
//! encryption.
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;

use crate::{Note, NoteColor, NoteError, NoteId, NoteRecord, Result};

/// Fragment parameter carrying the payload
pub const SHARE_PARAM: &str = "note";

#[derive(Serialize)]
struct SharedNote<'a> {
    id: NoteId,
    title: &'a str,
    content: &'a str,
    color: NoteColor,
    created: DateTime<Utc>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    tags: &'a [String],
}

/// Encodes the shareable fields of a note as standard base64 JSON
pub fn encode_share(note: &Note) -> Result<String> {
    let shared = SharedNote {
        id: note.id,
        title: &note.title,
        content: &note.content,
        color: note.color,
        created: note.created,
        tags: &note.tags,
    };
    let json = serde_json::to_vec(&shared)?;
    Ok(general_purpose::STANDARD.encode(json))
}

/// `note=<payload>`, ready to be placed after `#` in a URL
pub fn share_fragment(note: &Note) -> Result<String> {
    Ok(format!("{}={}", SHARE_PARAM, encode_share(note)?))
}

/// Builds a new note from a share link, a fragment or a bare payload.
///
/// The note gets a fresh id and timestamps; title, content, color and tags
/// come from the payload. Title and content must both be present.
pub fn decode_share(input: &str) -> Result<Note> {
    let payload = extract_payload(input);
    if payload.is_empty() {
        return Err(NoteError::InvalidShare {
            message: "no share payload found".to_string(),
        });
    }

    let bytes = general_purpose::STANDARD
        .decode(payload.as_bytes())
        .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(payload.trim_end_matches('=')))
        .map_err(|e| {
            warn!("Share payload is not valid base64: {}", e);
            NoteError::Decode(e)
        })?;

    let record: NoteRecord = serde_json::from_slice(&bytes).map_err(|e| NoteError::InvalidShare {
        message: format!("payload is not a note: {}", e),
    })?;

    let title = record.title.filter(|t| !t.is_empty());
    let content = record.content.filter(|c| !c.is_empty());
    let (Some(title), Some(content)) = (title, content) else {
        return Err(NoteError::InvalidShare {
            message: "shared note needs a title and content".to_string(),
        });
    };

    let note = Note::from(NoteRecord {
        title: Some(title),
        content: Some(content),
        color: record.color,
        tags: record.tags,
        ..NoteRecord::default()
    });
    debug!("Decoded shared note '{}' as {}", note.title, note.id);
    Ok(note)
}

fn extract_payload(input: &str) -> String {
    let input = input.trim();
    let fragment = input.split_once('#').map_or(input, |(_, fragment)| fragment);
    let prefix = format!("{}=", SHARE_PARAM);

    let raw = fragment
        .split('&')
        .find_map(|param| param.strip_prefix(prefix.as_str()))
        .unwrap_or(fragment);

    // links pasted from some clients arrive percent-encoded
    raw.replace("%2B", "+")
        .replace("%2b", "+")
        .replace("%2F", "/")
        .replace("%2f", "/")
        .replace("%3D", "=")
        .replace("%3d", "=")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared() -> Note {
        let mut note = Note::new("Recipe ✓", "<p>Flour &amp; water</p>");
        note.color = NoteColor::Yellow;
        note.add_tag("food");
        note
    }

    #[test]
    fn decoded_note_carries_shared_fields() {
        let original = shared();
        let decoded = decode_share(&encode_share(&original).unwrap()).unwrap();
        assert_eq!(decoded.title, original.title);
        assert_eq!(decoded.content, original.content);
        assert_eq!(decoded.color, NoteColor::Yellow);
        assert_eq!(decoded.tags, vec!["food".to_string()]);
        assert_ne!(decoded.id, original.id);
        assert!(!decoded.pinned);
    }

    #[test]
    fn accepts_links_and_fragments() {
        let original = shared();
        let fragment = share_fragment(&original).unwrap();
        let link = format!("https://example.test/app/#view=grid&{}", fragment);

        assert_eq!(decode_share(&fragment).unwrap().title, original.title);
        assert_eq!(decode_share(&link).unwrap().title, original.title);
        assert_eq!(decode_share(&format!("#{}", fragment)).unwrap().title, original.title);
    }

    #[test]
    fn accepts_payload_without_tags_or_color() {
        let payload = general_purpose::STANDARD.encode(r#"{"title":"Hi","content":"there"}"#);
        let note = decode_share(&payload).unwrap();
        assert_eq!(note.color, NoteColor::Default);
        assert!(note.tags.is_empty());
    }

    #[test]
    fn rejects_bad_payloads() {
        assert!(matches!(decode_share("note=%%%"), Err(NoteError::Decode(_))));

        let not_json = general_purpose::STANDARD.encode("hello");
        assert!(matches!(decode_share(&not_json), Err(NoteError::InvalidShare { .. })));

        let no_content = general_purpose::STANDARD.encode(r#"{"title":"Hi","content":""}"#);
        assert!(matches!(decode_share(&no_content), Err(NoteError::InvalidShare { .. })));

        assert!(matches!(decode_share("  "), Err(NoteError::InvalidShare { .. })));
    }
}
