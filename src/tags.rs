//! Tag aggregation and suggestion.
use std::collections::{BTreeMap, HashMap};

use crate::{Note, TagSort};

/// Number of suggestions returned by [`suggest_tags`]
pub const SUGGESTION_LIMIT: usize = 5;

/// Shortest word length (exclusive) considered for a suggestion
const MIN_WORD_LEN: usize = 3;

/// Words never suggested as tags
const STOP_WORDS: &[&str] = &[
    "the", "and", "is", "in", "to", "a", "for", "of", "with", "на", "в", "и", "с", "по", "для",
];

/// Counts, for every tag, the number of notes carrying it
pub fn tag_counts<'a, I>(notes: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'a Note>,
{
    let mut counts = BTreeMap::new();
    for note in notes {
        for tag in &note.tags {
            *counts.entry(tag.clone()).or_insert(0) += 1;
        }
    }
    counts
}

/// The `limit` most used tags, most used first; ties stay alphabetical
pub fn top_tags(counts: &BTreeMap<String, usize>, limit: usize) -> Vec<String> {
    let mut pairs: Vec<(&String, &usize)> = counts.iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(a.1));
    pairs.into_iter().take(limit).map(|(tag, _)| tag.clone()).collect()
}

/// All tags with their counts, ordered by name or by usage
pub fn sorted_tags<'a, I>(notes: I, by: TagSort) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a Note>,
{
    let mut pairs: Vec<(String, usize)> = tag_counts(notes).into_iter().collect();
    match by {
        TagSort::Alpha => pairs.sort_by(|a, b| crate::locale_compare(&a.0, &b.0)),
        TagSort::Count => pairs.sort_by(|a, b| b.1.cmp(&a.1)),
    }
    pairs
}

/// Suggests up to [`SUGGESTION_LIMIT`] tags from the words of `text`.
///
/// See [`suggest_tags_limited`].
pub fn suggest_tags<S: AsRef<str>>(text: &str, existing: &[S]) -> Vec<String> {
    suggest_tags_limited(text, existing, SUGGESTION_LIMIT)
}

/// Suggests tags from the most frequent words of a plain-text `text`.
///
/// Words are lowercased runs of letters and digits longer than three
/// characters that are not stop words. The `limit` most frequent are picked,
/// earlier words winning ties, and then any already in `existing` are
/// dropped, so fewer than `limit` may come back.
pub fn suggest_tags_limited<S: AsRef<str>>(text: &str, existing: &[S], limit: usize) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    let mut order: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for word in cleaned.split_whitespace() {
        if word.chars().count() <= MIN_WORD_LEN || STOP_WORDS.contains(&word) {
            continue;
        }
        match index.get(word) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(word.to_string(), order.len());
                order.push((word.to_string(), 1));
            }
        }
    }

    // stable: first-seen order breaks ties
    order.sort_by(|a, b| b.1.cmp(&a.1));

    let existing: Vec<String> = existing
        .iter()
        .map(|tag| tag.as_ref().trim().to_lowercase())
        .collect();
    order
        .into_iter()
        .take(limit)
        .map(|(word, _)| word)
        .filter(|word| !existing.contains(word))
        .collect()
}
