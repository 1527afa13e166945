//! Note-taking library
//!
//! This library provides functionality for creating, storing, searching, and sharing
//! notes with tags, colors, pins and reminders. Notes persist as a JSON array under a
//! single key of a [`KeyValueStore`].

mod cli;
mod config;
mod errors;
mod helper;
mod note;
mod persistence;
mod query;
mod reminder;
mod share;
mod stats;
mod storage;
mod tags;
mod types;

// Re-export key components
pub use cli::*;
pub use config::*;
pub use errors::*;
pub use helper::*;
pub use note::*;
pub use persistence::*;
pub use query::*;
pub use reminder::*;
pub use share::*;
pub use stats::*;
pub use storage::*;
pub use tags::*;
pub use types::*;
