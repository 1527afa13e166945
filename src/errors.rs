//! Error types for the notepro library.
//!
//! This module defines custom error types that categorize different failures
//! that can occur during note management operations.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::NoteId;

/// The main error type for the notepro library.
#[derive(Error, Debug)]
pub enum NoteError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A share payload was not valid base64.
    #[error("Decoding error: {0}")]
    Decode(#[from] base64::DecodeError),

    /// Note was not found when performing an operation.
    #[error("Note not found: {id}")]
    NoteNotFound { id: NoteId },

    /// Note with the same ID already exists.
    #[error("Note already exists: {id}")]
    NoteAlreadyExists { id: NoteId },

    /// An import payload was rejected; the collection was left untouched.
    #[error("Import rejected: {message}")]
    InvalidImport { message: String },

    /// A share link or payload could not be turned into a note.
    #[error("Invalid share data: {message}")]
    InvalidShare { message: String },

    /// A reminder could not be created.
    #[error("Invalid reminder: {message}")]
    InvalidReminder { message: String },

    /// Reminder was not found.
    #[error("Reminder not found: {id}")]
    ReminderNotFound { id: u64 },

    /// Writing to the persistence surface failed.
    #[error("Failed to persist '{key}': {message}")]
    Persistence { key: String, message: String },

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Directory creation or access failed.
    #[error("Failed to create or access directory: {path}")]
    DirectoryError { path: PathBuf },

    /// file not found
    #[error("File not found: {file_path}")]
    FileNotFound { file_path: String },
}
