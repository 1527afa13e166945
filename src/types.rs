//! Core data structures for the notepro library.
//!
//! This module contains the small value types shared across the crate
//! (identifiers, colors, sort keys, load reports) and the CLI subcommands.
use std::{fmt, path::PathBuf, str::FromStr};

use clap::{Subcommand, ValueEnum};
use serde::{Deserialize, Deserializer, Serialize};

use crate::NoteError;

/// A specialized Result type for notepro operations.
pub type Result<T> = std::result::Result<T, NoteError>;

/// Unique identifier of a note within the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub u64);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NoteId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim().parse().map(NoteId)
    }
}

impl From<u64> for NoteId {
    fn from(value: u64) -> Self {
        NoteId(value)
    }
}

/// Color label of a note.
///
/// Anything outside the palette reads back as [`NoteColor::Default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NoteColor {
    #[default]
    Default,
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Pink,
    Gray,
}

impl NoteColor {
    /// Every color of the palette, `Default` first
    pub const ALL: [NoteColor; 9] = [
        NoteColor::Default,
        NoteColor::Red,
        NoteColor::Orange,
        NoteColor::Yellow,
        NoteColor::Green,
        NoteColor::Blue,
        NoteColor::Purple,
        NoteColor::Pink,
        NoteColor::Gray,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NoteColor::Default => "default",
            NoteColor::Red => "red",
            NoteColor::Orange => "orange",
            NoteColor::Yellow => "yellow",
            NoteColor::Green => "green",
            NoteColor::Blue => "blue",
            NoteColor::Purple => "purple",
            NoteColor::Pink => "pink",
            NoteColor::Gray => "gray",
        }
    }

    /// Maps a stored color name onto the palette, falling back to `Default`
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|color| color.as_str().eq_ignore_ascii_case(name))
            .unwrap_or_default()
    }
}

impl fmt::Display for NoteColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NoteColor {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(NoteColor::from_name(&name))
    }
}

/// Keys a note listing can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Most recently modified first
    #[default]
    Updated,
    /// Most recently created first
    Created,
    /// Alphabetical by title
    Title,
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortKey::Updated => "updated",
            SortKey::Created => "created",
            SortKey::Title => "title",
        })
    }
}

impl FromStr for SortKey {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "updated" => Ok(SortKey::Updated),
            "created" => Ok(SortKey::Created),
            "title" => Ok(SortKey::Title),
            other => Err(NoteError::ConfigError {
                message: format!("Unknown sort key '{}'", other),
            }),
        }
    }
}

/// Ordering used when listing tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TagSort {
    /// Alphabetical by tag name
    #[default]
    Alpha,
    /// Most used first
    Count,
}

/// Outcome of reading a persisted collection at start-up
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Number of records that made it into memory
    pub loaded: usize,
    /// Records that could not be read as a note and were skipped
    pub dropped: usize,
    /// Records whose duplicate id was replaced by a fresh one
    pub reassigned: usize,
    /// Set when the stored value was unreadable and the collection started empty
    pub recovered_from: Option<String>,
}

impl LoadReport {
    /// Whether the stored state had to be discarded or repaired
    pub fn is_clean(&self) -> bool {
        self.recovered_from.is_none() && self.dropped == 0 && self.reassigned == 0
    }
}

/// Available subcommands for the notepro application
#[derive(Subcommand)]
pub enum Commands {
    /// Create a new note
    Create {
        /// Title of the note
        #[clap(short = 'T', long, default_value = "")]
        title: String,

        /// Content of the note (HTML markup allowed)
        #[clap(short, long)]
        content: Option<String>,

        /// Path to a file containing the note's content
        #[clap(short, long)]
        file: Option<PathBuf>,

        /// Tags to associate with the note (comma-separated)
        #[clap(short = 't', long)]
        tags: Option<String>,

        /// Color label
        #[clap(long, value_enum)]
        color: Option<NoteColor>,

        /// Pin the note
        #[clap(short, long)]
        pin: bool,
    },

    /// View a note by ID
    View {
        /// ID of the note to view
        id: NoteId,

        /// Format output as raw JSON
        #[clap(short, long)]
        json: bool,
    },

    /// List notes with optional filtering
    List {
        /// Only notes whose title or text contains this term
        #[clap(short, long)]
        search: Option<String>,

        /// Only notes carrying all of these tags (comma-separated)
        #[clap(short, long)]
        tags: Option<String>,

        /// Only pinned notes
        #[clap(long)]
        pinned: bool,

        /// Only notes modified recently
        #[clap(long)]
        recent: bool,

        /// Sort order (defaults to the configured one)
        #[clap(long, value_enum)]
        sort: Option<SortKey>,

        /// Limit the number of notes returned
        #[clap(short = 'n', long)]
        limit: Option<usize>,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,

        /// Only show note IDs and titles
        #[clap(short, long)]
        brief: bool,
    },

    /// Edit an existing note
    Edit {
        /// ID of the note to edit
        id: NoteId,

        /// New title for the note
        #[clap(short = 'T', long)]
        title: Option<String>,

        /// New content for the note
        #[clap(short, long)]
        content: Option<String>,

        /// Path to a file containing the new note content
        #[clap(short, long)]
        file: Option<PathBuf>,

        /// Replace the note's tags (comma-separated)
        #[clap(short = 't', long)]
        tags: Option<String>,

        /// New color label
        #[clap(long, value_enum)]
        color: Option<NoteColor>,
    },

    /// Delete a note by ID
    Delete {
        /// ID of the note to delete
        id: NoteId,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Tag operations (add, remove, list)
    Tag {
        /// ID of the note to modify
        id: NoteId,

        /// Tags to add (comma-separated)
        #[clap(short, long)]
        add: Option<String>,

        /// Tags to remove (comma-separated)
        #[clap(short, long)]
        remove: Option<String>,
    },

    /// Pin or unpin a note
    Pin {
        /// ID of the note to toggle
        id: NoteId,
    },

    /// Show every tag with the number of notes carrying it
    Tags {
        /// How to order the tags
        #[clap(long, value_enum, default_value_t = TagSort::Alpha)]
        sort: TagSort,

        /// Only show the most used tags
        #[clap(long)]
        top: Option<usize>,
    },

    /// Suggest tags for a note based on its text
    Suggest {
        /// ID of the note
        id: NoteId,
    },

    /// Show word count and reading time for a note
    Stats {
        /// ID of the note
        id: NoteId,
    },

    /// Export all notes as JSON
    Export {
        /// Destination file (stdout when omitted)
        #[clap(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace all notes with the contents of a JSON export
    Import {
        /// Path to the JSON file
        source: PathBuf,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Delete every note
    Clear {
        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Print a share fragment for a note
    Share {
        /// ID of the note to share
        id: NoteId,
    },

    /// Add a note from a share link or fragment
    OpenShare {
        /// Share link, `note=...` fragment or bare payload
        link: String,
    },

    /// Set a reminder for a note
    Remind {
        /// ID of the note
        id: NoteId,

        /// When to fire: RFC 3339 or "YYYY-MM-DD HH:MM" in local time
        #[clap(short, long)]
        at: String,

        /// Reminder text (defaults to the note title)
        #[clap(short, long)]
        text: Option<String>,
    },

    /// List reminders
    Reminders {
        /// Mark and show reminders that are due now
        #[clap(long)]
        due: bool,

        /// Remove reminders that have already fired
        #[clap(long)]
        clear_completed: bool,
    },

    /// Configuration management
    Config {
        /// Show current configuration
        #[clap(short = 'S', long)]
        show: bool,

        /// Update a configuration setting (key=value)
        #[clap(short, long)]
        set: Option<String>,

        /// Reset configuration to defaults
        #[clap(short, long)]
        reset: bool,
    },
}
