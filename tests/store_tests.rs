use chrono::{Duration, Utc};
use notepro::{
    FileStore, KeyValueStore, Note, NoteError, NoteId, NoteQuery, NotesStore, ReminderBook,
    SortKey, NOTES_KEY,
};

fn open(dir: &std::path::Path) -> NotesStore<FileStore> {
    NotesStore::open(FileStore::open(dir).unwrap())
}

#[test]
fn notes_survive_reopening() {
    let dir = tempfile::tempdir().unwrap();

    let mut store = open(dir.path());
    let mut first = Note::new("Groceries", "<p>milk, eggs</p>");
    first.add_tag("Home");
    let first_id = first.id;
    store.add(first).unwrap();
    store.add(Note::new("Standup", "yesterday / today")).unwrap();
    store.modify(first_id, |note| note.toggle_pin()).unwrap();

    let reopened = open(dir.path());
    assert!(reopened.load_report().is_clean());
    assert_eq!(reopened.notes(), store.notes());
    assert!(dir.path().join(format!("{}.json", NOTES_KEY)).exists());
}

#[test]
fn corrupt_file_loads_empty_with_report() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(format!("{}.json", NOTES_KEY)), "{not json").unwrap();

    let store = open(dir.path());
    assert!(store.is_empty());
    assert!(store.load_report().recovered_from.is_some());
}

#[test]
fn delete_of_missing_note_leaves_collection_alone() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open(dir.path());
    store.add(Note::new("keep", "me")).unwrap();

    let err = store.delete(NoteId(42)).unwrap_err();
    assert!(matches!(err, NoteError::NoteNotFound { .. }));
    assert_eq!(open(dir.path()).len(), 1);
}

#[test]
fn export_then_import_into_another_directory() {
    let source_dir = tempfile::tempdir().unwrap();
    let target_dir = tempfile::tempdir().unwrap();

    let mut source = open(source_dir.path());
    source.add(Note::new("a", "one")).unwrap();
    source.add(Note::new("b", "two")).unwrap();
    let exported = source.export().unwrap();

    let mut target = open(target_dir.path());
    target.add(Note::new("stale", "gone after import")).unwrap();
    assert_eq!(target.import(&exported).unwrap(), 2);

    assert_eq!(target.notes(), source.notes());
    assert_eq!(open(target_dir.path()).notes(), source.notes());
}

#[test]
fn rejected_import_keeps_existing_notes() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open(dir.path());
    store.add(Note::new("keep", "me")).unwrap();

    for payload in ["[]", r#"[{"title":"no content"}]"#, r#"{"title":"x","content":"y"}"#, "nope"] {
        let err = store.import(payload).unwrap_err();
        assert!(matches!(err, NoteError::InvalidImport { .. }), "{}", payload);
    }
    assert_eq!(open(dir.path()).len(), 1);
}

#[test]
fn query_over_persisted_notes() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open(dir.path());

    let mut pinned = Note::new("Zebra facts", "stripes");
    pinned.add_tag("animals");
    pinned.toggle_pin();
    let pinned_id = pinned.id;
    store.add(pinned).unwrap();

    let mut other = Note::new("aardvark facts", "<em>Anteater</em>");
    other.add_tag("animals");
    store.add(other).unwrap();
    store.add(Note::new("Taxes", "due in april")).unwrap();

    let store = open(dir.path());
    let results = NoteQuery::new()
        .search("FACTS")
        .tag("Animals")
        .sort(SortKey::Title)
        .apply(store.notes(), Utc::now());

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, pinned_id);
    assert_eq!(results[1].title, "aardvark facts");
}

#[test]
fn reminders_share_the_data_directory() {
    let dir = tempfile::tempdir().unwrap();
    let surface = FileStore::open(dir.path()).unwrap();

    let mut notes = NotesStore::open(surface.clone());
    let note = Note::new("Dentist", "call to confirm");
    let note_id = note.id;
    notes.add(note).unwrap();

    let now = Utc::now();
    let mut book = ReminderBook::open(surface.clone());
    book.add(note_id, "Call dentist", now + Duration::minutes(5), now)
        .unwrap();

    let mut reopened = ReminderBook::open(surface.clone());
    assert_eq!(reopened.for_note(note_id).len(), 1);

    let due = reopened.take_due(now + Duration::minutes(10)).unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].note(&notes).map(|n| n.title.as_str()), Some("Dentist"));
    assert!(ReminderBook::open(surface.clone())
        .take_due(now + Duration::minutes(10))
        .unwrap()
        .is_empty());

    assert!(surface.get(NOTES_KEY).unwrap().is_some());
}
