//! Filtering and ordering of note collections.
//!
//! Everything here is pure: functions borrow the notes they are given and
//! return a new ordered list of references, never touching the input.
use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use log::debug;

use crate::{Note, SortKey};

/// Default trailing window for the "recent" filter
pub const RECENT_WINDOW_DAYS: i64 = 3;

/// Keeps notes whose title or plain text contains `term`, ignoring case.
///
/// A blank term matches every note.
pub fn text_search<'a, I>(notes: I, term: &str) -> Vec<&'a Note>
where
    I: IntoIterator<Item = &'a Note>,
{
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return notes.into_iter().collect();
    }
    notes
        .into_iter()
        .filter(|note| {
            note.title.to_lowercase().contains(&term)
                || note.plain_text().to_lowercase().contains(&term)
        })
        .collect()
}

/// Keeps notes carrying every one of `tags`
pub fn filter_by_tags<'a, I, S>(notes: I, tags: &[S]) -> Vec<&'a Note>
where
    I: IntoIterator<Item = &'a Note>,
    S: AsRef<str>,
{
    notes
        .into_iter()
        .filter(|note| tags.iter().all(|tag| note.has_tag(tag.as_ref())))
        .collect()
}

pub fn filter_pinned<'a, I>(notes: I) -> Vec<&'a Note>
where
    I: IntoIterator<Item = &'a Note>,
{
    notes.into_iter().filter(|note| note.pinned).collect()
}

/// Keeps notes updated strictly after `now - window`.
///
/// The boundary instant itself is excluded; anything at or after it up to
/// (and past) `now` is kept.
pub fn filter_recent<'a, I>(notes: I, now: DateTime<Utc>, window: Duration) -> Vec<&'a Note>
where
    I: IntoIterator<Item = &'a Note>,
{
    let cutoff = now - window;
    notes.into_iter().filter(|note| note.updated > cutoff).collect()
}

/// Orders notes by `key`, then moves pinned notes ahead of unpinned ones.
///
/// Both passes are stable: notes that compare equal keep their input order,
/// and each partition keeps the order of the primary sort.
pub fn sort_notes<'a, I>(notes: I, key: SortKey) -> Vec<&'a Note>
where
    I: IntoIterator<Item = &'a Note>,
{
    let mut sorted: Vec<&Note> = notes.into_iter().collect();
    match key {
        SortKey::Updated => sorted.sort_by(|a, b| b.updated.cmp(&a.updated)),
        SortKey::Created => sorted.sort_by(|a, b| b.created.cmp(&a.created)),
        SortKey::Title => sorted.sort_by(|a, b| compare_titles(&a.title, &b.title)),
    }

    let (mut pinned, unpinned): (Vec<&Note>, Vec<&Note>) =
        sorted.into_iter().partition(|note| note.pinned);
    pinned.extend(unpinned);
    pinned
}

/// Title ordering: untitled notes last, the rest by [`locale_compare`]
fn compare_titles(a: &str, b: &str) -> Ordering {
    let (a, b) = (a.trim(), b.trim());
    match (a.is_empty(), b.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => locale_compare(a, b),
    }
}

/// Collator-style comparison of two titles.
///
/// Three levels are compared in turn: base letters (case and accents
/// folded, so `é` sorts with `e` and `ё` with `е`), then accents
/// (unaccented first), then case (lowercase first). Raw order breaks any
/// remaining tie.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    let lower_a: Vec<char> = a.chars().flat_map(char::to_lowercase).collect();
    let lower_b: Vec<char> = b.chars().flat_map(char::to_lowercase).collect();

    let primary = lower_a
        .iter()
        .map(|&c| base_letter(c))
        .cmp(lower_b.iter().map(|&c| base_letter(c)));
    if primary != Ordering::Equal {
        return primary;
    }

    for (&x, &y) in lower_a.iter().zip(&lower_b) {
        if x != y {
            return match (base_letter(x) == x, base_letter(y) == y) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => x.cmp(&y),
            };
        }
    }

    for (x, y) in a.chars().zip(b.chars()) {
        if x != y {
            return match (x.is_lowercase(), y.is_lowercase()) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => x.cmp(&y),
            };
        }
    }
    a.cmp(b)
}

/// The unaccented letter a lowercase character sorts with
fn base_letter(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => 'c',
        'ď' | 'đ' => 'd',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => 'g',
        'ĥ' | 'ħ' => 'h',
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' => 'i',
        'ĵ' => 'j',
        'ķ' => 'k',
        'ĺ' | 'ļ' | 'ľ' | 'ŀ' | 'ł' => 'l',
        'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => 'o',
        'ŕ' | 'ŗ' | 'ř' => 'r',
        'ś' | 'ŝ' | 'ş' | 'š' => 's',
        'ţ' | 'ť' | 'ŧ' => 't',
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
        'ŵ' => 'w',
        'ý' | 'ÿ' | 'ŷ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        'ё' => 'е',
        'ѓ' => 'г',
        'ќ' => 'к',
        'ї' => 'і',
        'ў' => 'у',
        _ => c,
    }
}

/// A combined search / filter / sort request over a collection
#[derive(Debug, Clone)]
pub struct NoteQuery {
    /// Free-text term matched against titles and plain text
    pub search: Option<String>,
    /// Tags every result must carry
    pub tags: Vec<String>,
    pub pinned_only: bool,
    pub recent_only: bool,
    /// Trailing window used by `recent_only`
    pub recent_window: Duration,
    pub sort: SortKey,
}

impl Default for NoteQuery {
    fn default() -> Self {
        Self {
            search: None,
            tags: Vec::new(),
            pinned_only: false,
            recent_only: false,
            recent_window: Duration::days(RECENT_WINDOW_DAYS),
            sort: SortKey::default(),
        }
    }
}

impl NoteQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    /// Requires `tag` on every result; the tag is normalized first
    pub fn tag(mut self, tag: &str) -> Self {
        if let Some(tag) = crate::normalize_tag(tag) {
            if !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
        self
    }

    pub fn pinned_only(mut self, pinned_only: bool) -> Self {
        self.pinned_only = pinned_only;
        self
    }

    pub fn recent_only(mut self, recent_only: bool) -> Self {
        self.recent_only = recent_only;
        self
    }

    pub fn recent_window(mut self, window: Duration) -> Self {
        self.recent_window = window;
        self
    }

    pub fn sort(mut self, key: SortKey) -> Self {
        self.sort = key;
        self
    }

    /// Runs search, tag filter, special filters and sort, in that order
    pub fn apply<'a>(&self, notes: &'a [Note], now: DateTime<Utc>) -> Vec<&'a Note> {
        let mut results = match &self.search {
            Some(term) => text_search(notes, term),
            None => notes.iter().collect(),
        };
        if !self.tags.is_empty() {
            results = filter_by_tags(results, &self.tags);
        }
        if self.pinned_only {
            results = filter_pinned(results);
        }
        if self.recent_only {
            results = filter_recent(results, now, self.recent_window);
        }
        let results = sort_notes(results, self.sort);
        debug!("Query matched {} of {} notes", results.len(), notes.len());
        results
    }
}
