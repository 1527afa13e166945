use std::collections::HashSet;

use log::{debug, error, info, trace, warn};
use serde_json::Value;

use crate::{generate_id, KeyValueStore, LoadReport, Note, NoteError, NoteId, NoteRecord, Result};

/// Default key the notes collection is stored under
pub const NOTES_KEY: &str = "notepro-notes";

/// Owns the canonical note collection and its persisted copy.
///
/// Every mutation encodes and writes the candidate collection first and only
/// then commits it in memory, so a failed write leaves the store exactly as
/// it was. Two processes sharing one surface are not coordinated: the last
/// full write wins.
pub struct NotesStore<S: KeyValueStore> {
    /// Persistence surface the collection is written to
    surface: S,

    /// Key holding the JSON array of notes
    key: String,

    /// In-memory collection, in insertion order
    notes: Vec<Note>,

    /// What happened when the persisted collection was read
    load_report: LoadReport,
}

impl<S: KeyValueStore> NotesStore<S> {
    /// Opens the store, reading the collection persisted under [`NOTES_KEY`].
    pub fn open(surface: S) -> Self {
        Self::open_with_key(surface, NOTES_KEY)
    }

    /// Opens the store using a custom key.
    ///
    /// An absent value yields an empty collection. An unreadable value also
    /// yields an empty collection; the reason is kept in [`Self::load_report`].
    pub fn open_with_key(surface: S, key: &str) -> Self {
        let (notes, load_report) = load_notes(&surface, key);

        if let Some(reason) = &load_report.recovered_from {
            warn!("Stored notes under '{}' were unreadable, starting empty: {}", key, reason);
        } else {
            info!("Loaded {} notes from '{}'", load_report.loaded, key);
        }
        if load_report.dropped > 0 {
            warn!("Skipped {} unreadable note records", load_report.dropped);
        }
        if load_report.reassigned > 0 {
            warn!("Assigned fresh ids to {} notes with duplicate ids", load_report.reassigned);
        }

        Self {
            surface,
            key: key.to_string(),
            notes,
            load_report,
        }
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.load_report
    }

    /// All notes, in storage order
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Retrieves a note by its ID
    pub fn get(&self, id: NoteId) -> Option<&Note> {
        trace!("Retrieving note by ID: {}", id);
        self.notes.iter().find(|note| note.id == id)
    }

    fn position(&self, id: NoteId) -> Result<usize> {
        self.notes
            .iter()
            .position(|note| note.id == id)
            .ok_or(NoteError::NoteNotFound { id })
    }

    /// Appends a new note and persists the collection
    pub fn add(&mut self, note: Note) -> Result<()> {
        info!("Adding note: {}", note.id);

        if self.get(note.id).is_some() {
            error!("Cannot add note {}: id already in use", note.id);
            return Err(NoteError::NoteAlreadyExists { id: note.id });
        }

        let mut view: Vec<&Note> = self.notes.iter().collect();
        view.push(&note);
        write_notes(&mut self.surface, &self.key, &view)?;

        self.notes.push(note);
        Ok(())
    }

    /// Replaces the stored note with the same id.
    ///
    /// The stored creation time is kept; `created` is immutable.
    pub fn update(&mut self, mut note: Note) -> Result<()> {
        let index = self.position(note.id).inspect_err(|_| {
            error!("Cannot update note {}: Note not found", note.id);
        })?;
        debug!("Updating note: {}", note.id);

        let original = &self.notes[index];
        if note.created != original.created {
            debug!("Keeping original creation time of note {}", note.id);
            note.created = original.created;
        }
        note.updated = note.updated.max(note.created);

        let view: Vec<&Note> = self
            .notes
            .iter()
            .enumerate()
            .map(|(i, n)| if i == index { &note } else { n })
            .collect();
        write_notes(&mut self.surface, &self.key, &view)?;

        self.notes[index] = note;
        Ok(())
    }

    /// Applies `change` to a copy of the note and stores the result through
    /// [`Self::update`]. Returns whatever `change` returned.
    pub fn modify<F, R>(&mut self, id: NoteId, change: F) -> Result<R>
    where
        F: FnOnce(&mut Note) -> R,
    {
        let mut note = self.get(id).cloned().ok_or(NoteError::NoteNotFound { id })?;
        let outcome = change(&mut note);
        self.update(note)?;
        Ok(outcome)
    }

    /// Deletes a note by ID
    pub fn delete(&mut self, id: NoteId) -> Result<Note> {
        info!("Deleting note: {}", id);
        let index = self.position(id).inspect_err(|_| {
            error!("Cannot delete note {}: Note not found", id);
        })?;

        let view: Vec<&Note> = self
            .notes
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, n)| n)
            .collect();
        write_notes(&mut self.surface, &self.key, &view)?;

        Ok(self.notes.remove(index))
    }

    /// Removes every note
    pub fn clear(&mut self) -> Result<()> {
        info!("Clearing all {} notes", self.notes.len());
        write_notes(&mut self.surface, &self.key, &[])?;
        self.notes.clear();
        Ok(())
    }

    /// Serializes the whole collection, in current order, as a pretty JSON array
    pub fn export(&self) -> Result<String> {
        let json = serde_json::to_string_pretty(&self.notes).map_err(|e| {
            error!("Failed to serialize notes for export: {}", e);
            NoteError::Serialization(e)
        })?;
        info!("Exported {} notes", self.notes.len());
        Ok(json)
    }

    /// Replaces the whole collection with the notes in `data`.
    ///
    /// `data` must be a JSON array. Entries without both a `title` and a
    /// `content` field are skipped; if none remain the import is rejected and
    /// nothing changes. Entries lacking an id, or repeating one, get a fresh id.
    /// Returns the number of notes imported.
    pub fn import(&mut self, data: &str) -> Result<usize> {
        info!("Importing notes ({} bytes)", data.len());

        let parsed: Value = serde_json::from_str(data).map_err(|e| {
            warn!("Import payload is not valid JSON: {}", e);
            NoteError::InvalidImport {
                message: format!("invalid JSON: {}", e),
            }
        })?;

        let Value::Array(entries) = parsed else {
            warn!("Import payload is not a JSON array");
            return Err(NoteError::InvalidImport {
                message: "expected a JSON array of notes".to_string(),
            });
        };

        let candidates = entries.into_iter().filter(|entry| {
            entry
                .as_object()
                .is_some_and(|obj| obj.contains_key("title") && obj.contains_key("content"))
        });

        let mut seen = HashSet::new();
        let mut imported = Vec::new();
        for entry in candidates {
            let Some(mut note) = read_record(entry) else {
                continue;
            };
            if !seen.insert(note.id) {
                note.id = fresh_id(&seen);
                seen.insert(note.id);
                debug!("Imported note had a duplicate id, assigned {}", note.id);
            }
            imported.push(note);
        }

        if imported.is_empty() {
            warn!("Import payload contained no valid notes");
            return Err(NoteError::InvalidImport {
                message: "no valid notes to import".to_string(),
            });
        }

        let view: Vec<&Note> = imported.iter().collect();
        write_notes(&mut self.surface, &self.key, &view)?;

        let count = imported.len();
        self.notes = imported;
        info!("Imported {} notes", count);
        Ok(count)
    }
}

/// Reads one stored entry as a note; entries of the wrong shape are skipped
fn read_record(entry: Value) -> Option<Note> {
    match serde_json::from_value::<NoteRecord>(entry) {
        Ok(record) => Some(Note::from(record)),
        Err(e) => {
            debug!("Skipping unreadable note record: {}", e);
            None
        }
    }
}

fn fresh_id(taken: &HashSet<NoteId>) -> NoteId {
    loop {
        let id = NoteId(generate_id());
        if !taken.contains(&id) {
            return id;
        }
    }
}

fn load_notes<S: KeyValueStore>(surface: &S, key: &str) -> (Vec<Note>, LoadReport) {
    let mut report = LoadReport::default();

    let raw = match surface.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!("Nothing stored under '{}'", key);
            return (Vec::new(), report);
        }
        Err(e) => {
            report.recovered_from = Some(e.to_string());
            return (Vec::new(), report);
        }
    };

    let entries = match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) => {
            report.recovered_from = Some("stored value is not a JSON array".to_string());
            return (Vec::new(), report);
        }
        Err(e) => {
            report.recovered_from = Some(format!("invalid JSON: {}", e));
            return (Vec::new(), report);
        }
    };

    let mut seen = HashSet::new();
    let mut notes = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(mut note) = read_record(entry) else {
            report.dropped += 1;
            continue;
        };
        if !seen.insert(note.id) {
            note.id = fresh_id(&seen);
            seen.insert(note.id);
            report.reassigned += 1;
        }
        notes.push(note);
    }

    report.loaded = notes.len();
    (notes, report)
}

fn write_notes<S: KeyValueStore>(surface: &mut S, key: &str, notes: &[&Note]) -> Result<()> {
    trace!("Serializing {} notes to JSON", notes.len());
    let json = serde_json::to_string(notes).map_err(|e| {
        error!("Failed to serialize notes: {}", e);
        NoteError::Serialization(e)
    })?;

    surface.set(key, &json).inspect_err(|e| {
        error!("Failed to persist notes under '{}': {}", key, e);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStore, NoteColor};

    fn store_with(titles: &[&str]) -> NotesStore<MemoryStore> {
        let mut store = NotesStore::open(MemoryStore::new());
        for title in titles {
            store.add(Note::new(*title, "body")).unwrap();
        }
        store
    }

    fn ids(store: &NotesStore<MemoryStore>) -> Vec<NoteId> {
        store.notes().iter().map(|n| n.id).collect()
    }

    #[test]
    fn starts_empty_without_stored_data() {
        let store = NotesStore::open(MemoryStore::new());
        assert!(store.is_empty());
        assert!(store.load_report().is_clean());
    }

    #[test]
    fn malformed_storage_loads_empty_and_reports() {
        let surface = MemoryStore::new().with_entry(NOTES_KEY, "{not json");
        let store = NotesStore::open(surface);
        assert!(store.is_empty());
        assert!(store.load_report().recovered_from.is_some());

        let surface = MemoryStore::new().with_entry(NOTES_KEY, r#"{"title":"x"}"#);
        let store = NotesStore::open(surface);
        assert!(store.is_empty());
        assert!(store.load_report().recovered_from.is_some());
    }

    #[test]
    fn load_repairs_duplicate_ids_and_skips_bad_entries() {
        let raw = r#"[{"id":1,"title":"a","content":""},
                      {"id":1,"title":"b","content":""},
                      "garbage",
                      {"title":"c","content":""}]"#;
        let store = NotesStore::open(MemoryStore::new().with_entry(NOTES_KEY, raw));
        assert_eq!(store.len(), 3);
        assert_eq!(store.load_report().dropped, 1);
        assert_eq!(store.load_report().reassigned, 1);
        let unique: HashSet<NoteId> = ids(&store).into_iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn load_keeps_notes_with_mistyped_fields() {
        let raw = r#"[{"id":1,"title":"keep me","content":"x","color":5},
                      {"id":2,"title":"me too","content":"y","tags":["a",null],"pinned":"no"}]"#;
        let store = NotesStore::open(MemoryStore::new().with_entry(NOTES_KEY, raw));
        assert!(store.load_report().is_clean());
        assert_eq!(store.len(), 2);

        let first = store.get(NoteId(1)).unwrap();
        assert_eq!(first.title, "keep me");
        assert_eq!(first.color, NoteColor::Default);
        let second = store.get(NoteId(2)).unwrap();
        assert_eq!(second.tags, vec!["a".to_string()]);
        assert!(!second.pinned);
    }

    #[test]
    fn add_persists_and_reloads() {
        let store = store_with(&["one", "two"]);
        let reopened = NotesStore::open(store.surface().clone());
        assert_eq!(reopened.notes(), store.notes());
    }

    #[test]
    fn add_rejects_duplicate_id() {
        let mut store = store_with(&["one"]);
        let existing = store.notes()[0].clone();
        let err = store.add(existing).unwrap_err();
        assert!(matches!(err, NoteError::NoteAlreadyExists { .. }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn update_replaces_matching_note() {
        let mut store = store_with(&["one", "two"]);
        let mut note = store.notes()[1].clone();
        note.title = "changed".to_string();
        note.color = NoteColor::Blue;
        store.update(note.clone()).unwrap();
        assert_eq!(store.get(note.id).unwrap().title, "changed");
        assert_eq!(store.notes()[1].id, note.id);
    }

    #[test]
    fn update_keeps_created() {
        let mut store = store_with(&["one"]);
        let original = store.notes()[0].clone();
        let mut note = original.clone();
        note.created = original.created - chrono::Duration::days(10);
        store.update(note).unwrap();
        assert_eq!(store.notes()[0].created, original.created);
    }

    #[test]
    fn update_of_missing_note_fails() {
        let mut store = store_with(&["one"]);
        let before = store.notes().to_vec();
        let err = store.update(Note::new("ghost", "")).unwrap_err();
        assert!(matches!(err, NoteError::NoteNotFound { .. }));
        assert_eq!(store.notes(), before.as_slice());
    }

    #[test]
    fn modify_routes_through_update() {
        let mut store = store_with(&["one"]);
        let id = store.notes()[0].id;
        let added = store.modify(id, |note| note.add_tag("Work")).unwrap();
        assert!(added);
        let reopened = NotesStore::open(store.surface().clone());
        assert_eq!(reopened.get(id).unwrap().tags, vec!["work".to_string()]);
    }

    #[test]
    fn delete_removes_exactly_one() {
        let mut store = store_with(&["one", "two", "three"]);
        let id = store.notes()[1].id;
        let removed = store.delete(id).unwrap();
        assert_eq!(removed.title, "two");
        assert_eq!(store.len(), 2);
        assert!(store.get(id).is_none());
    }

    #[test]
    fn delete_of_missing_id_leaves_collection_unchanged() {
        let mut store = store_with(&["one", "two"]);
        let before = store.notes().to_vec();
        let err = store.delete(NoteId(42)).unwrap_err();
        assert!(matches!(err, NoteError::NoteNotFound { id } if id == NoteId(42)));
        assert_eq!(store.notes(), before.as_slice());
    }

    #[test]
    fn clear_empties_and_persists() {
        let mut store = store_with(&["one", "two"]);
        store.clear().unwrap();
        assert!(store.is_empty());
        assert!(NotesStore::open(store.surface().clone()).is_empty());
    }

    #[test]
    fn failed_write_leaves_memory_unchanged() {
        let mut store = store_with(&["one"]);
        let before = store.notes().to_vec();
        store.surface.set_quota(Some(1));

        assert!(matches!(
            store.add(Note::new("two", "")).unwrap_err(),
            NoteError::Persistence { .. }
        ));
        let id = before[0].id;
        assert!(store.modify(id, |n| n.toggle_pin()).is_err());
        assert!(store.delete(id).is_err());
        assert!(store.import(r#"[{"title":"x","content":"y"}]"#).is_err());
        assert_eq!(store.notes(), before.as_slice());
    }

    #[test]
    fn import_replaces_collection() {
        let mut store = store_with(&["one", "two", "three"]);
        let count = store
            .import(r#"[{"id":7,"title":"a","content":"x"},{"title":"b","content":"y"}]"#)
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.notes()[0].id, NoteId(7));
        assert_eq!(store.notes()[1].title, "b");
    }

    #[test]
    fn import_skips_entries_without_title_or_content() {
        let mut store = store_with(&["one"]);
        let count = store
            .import(r#"[{"title":"a"},{"content":"b"},{"title":"ok","content":null},42]"#)
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(store.notes()[0].title, "ok");
        assert_eq!(store.notes()[0].content, "");
    }

    #[test]
    fn import_rejections_leave_collection_untouched() {
        let mut store = store_with(&["one", "two", "three"]);
        let before = store.notes().to_vec();

        for payload in [r#"[{"foo":1}]"#, r#"{"title":"a","content":"b"}"#, "not json", "[]"] {
            let err = store.import(payload).unwrap_err();
            assert!(matches!(err, NoteError::InvalidImport { .. }), "{}", payload);
        }
        assert_eq!(store.notes(), before.as_slice());
    }

    #[test]
    fn import_assigns_fresh_ids_to_duplicates() {
        let mut store = store_with(&[]);
        store
            .import(r#"[{"id":5,"title":"a","content":""},{"id":5,"title":"b","content":""}]"#)
            .unwrap();
        assert_eq!(store.notes()[0].id, NoteId(5));
        assert_ne!(store.notes()[1].id, NoteId(5));
    }

    #[test]
    fn export_then_import_reproduces_records() {
        let mut store = store_with(&["one", "two"]);
        store.modify(store.notes()[0].id, |n| n.add_tag("x")).unwrap();
        let exported = store.export().unwrap();

        let mut other = store_with(&["stale"]);
        other.import(&exported).unwrap();
        assert_eq!(other.notes(), store.notes());
        assert_eq!(other.export().unwrap(), exported);
    }
}
