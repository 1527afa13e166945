//! Word count and reading time for note text.
use serde::Serialize;

/// Average reading speed used for estimates
pub const WORDS_PER_MINUTE: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReadingTime {
    pub minutes: usize,
    pub seconds: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NoteStats {
    pub words: usize,
    pub characters: usize,
    pub reading_time: ReadingTime,
}

impl NoteStats {
    /// Computes statistics over plain text
    pub fn of(text: &str) -> Self {
        let words = text.split_whitespace().count();
        Self {
            words,
            characters: text.chars().count(),
            reading_time: reading_time(words, WORDS_PER_MINUTE),
        }
    }
}

pub fn reading_time(words: usize, words_per_minute: usize) -> ReadingTime {
    let words_per_minute = words_per_minute.max(1);
    let remainder = (words % words_per_minute) as f64;
    ReadingTime {
        minutes: words / words_per_minute,
        seconds: (remainder / (words_per_minute as f64 / 60.0)).round() as usize,
    }
}
