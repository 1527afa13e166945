//! Reminders attached to notes.
//!
//! Reminders live under their own key, independent of the notes collection.
//! Delivering a due reminder (notification, prompt) is left to the caller;
//! this module only records them and decides which are due.
use chrono::{DateTime, TimeZone, Utc};
use log::{debug, error, info, warn};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{generate_id, KeyValueStore, Note, NoteError, NoteId, NotesStore, Result};

/// Default key reminders are stored under
pub const REMINDERS_KEY: &str = "notepro-reminders";

/// A reminder for a note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: u64,
    /// Note the reminder refers to; the note may no longer exist
    pub note_id: NoteId,
    #[serde(alias = "title")]
    pub text: String,
    /// Firing time in milliseconds since the Unix epoch
    #[serde(deserialize_with = "millis_or_rfc3339")]
    pub timestamp: i64,
    /// Set once the reminder has fired
    #[serde(default, alias = "completed")]
    pub notified: bool,
}

impl Reminder {
    pub fn fire_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.notified && self.timestamp <= now.timestamp_millis()
    }

    /// The note this reminder points at, if it still exists
    pub fn note<'a, S: KeyValueStore>(&self, notes: &'a NotesStore<S>) -> Option<&'a Note> {
        notes.get(self.note_id)
    }
}

/// The persisted list of reminders
pub struct ReminderBook<S: KeyValueStore> {
    surface: S,
    key: String,
    reminders: Vec<Reminder>,
}

impl<S: KeyValueStore> ReminderBook<S> {
    pub fn open(surface: S) -> Self {
        Self::open_with_key(surface, REMINDERS_KEY)
    }

    /// Reads reminders from `key`; unreadable data yields an empty book
    pub fn open_with_key(surface: S, key: &str) -> Self {
        let reminders = match surface.get(key) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Value>>(&raw) {
                Ok(entries) => entries
                    .into_iter()
                    .filter_map(|entry| match serde_json::from_value::<Reminder>(entry) {
                        Ok(reminder) => Some(reminder),
                        Err(e) => {
                            warn!("Skipping unreadable reminder: {}", e);
                            None
                        }
                    })
                    .collect(),
                Err(e) => {
                    warn!("Stored reminders under '{}' are unreadable, starting empty: {}", key, e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read reminders under '{}', starting empty: {}", key, e);
                Vec::new()
            }
        };
        debug!("Loaded {} reminders", reminders.len());

        Self {
            surface,
            key: key.to_string(),
            reminders,
        }
    }

    pub fn all(&self) -> &[Reminder] {
        &self.reminders
    }

    pub fn for_note(&self, note_id: NoteId) -> Vec<&Reminder> {
        self.reminders.iter().filter(|r| r.note_id == note_id).collect()
    }

    /// Schedules a reminder for `note_id` at `at`.
    ///
    /// Rejects blank text and instants before `now`.
    pub fn add(
        &mut self,
        note_id: NoteId,
        text: &str,
        at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Reminder> {
        let text = text.trim();
        if text.is_empty() {
            return Err(NoteError::InvalidReminder {
                message: "reminder text is empty".to_string(),
            });
        }
        if at < now {
            return Err(NoteError::InvalidReminder {
                message: format!("{} is in the past", at.to_rfc3339()),
            });
        }

        let reminder = Reminder {
            id: generate_id(),
            note_id,
            text: text.to_string(),
            timestamp: at.timestamp_millis(),
            notified: false,
        };

        let mut candidate = self.reminders.clone();
        candidate.push(reminder.clone());
        self.commit(candidate)?;
        info!("Reminder {} set for note {} at {}", reminder.id, note_id, at.to_rfc3339());
        Ok(reminder)
    }

    /// Marks every due reminder as notified and returns them.
    ///
    /// A reminder is returned by at most one sweep.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Result<Vec<Reminder>> {
        let mut candidate = self.reminders.clone();
        let mut due = Vec::new();
        for reminder in candidate.iter_mut().filter(|r| r.is_due(now)) {
            reminder.notified = true;
            due.push(reminder.clone());
        }

        if !due.is_empty() {
            self.commit(candidate)?;
            debug!("{} reminders became due", due.len());
        }
        Ok(due)
    }

    /// Drops reminders that have already fired; returns how many were dropped
    pub fn clear_completed(&mut self) -> Result<usize> {
        self.retain(|r| !r.notified)
    }

    /// Drops every reminder attached to `note_id`
    pub fn remove_for_note(&mut self, note_id: NoteId) -> Result<usize> {
        self.retain(|r| r.note_id != note_id)
    }

    pub fn remove(&mut self, id: u64) -> Result<Reminder> {
        let index = self
            .reminders
            .iter()
            .position(|r| r.id == id)
            .ok_or(NoteError::ReminderNotFound { id })?;
        let mut candidate = self.reminders.clone();
        let removed = candidate.remove(index);
        self.commit(candidate)?;
        Ok(removed)
    }

    fn retain<F: Fn(&Reminder) -> bool>(&mut self, keep: F) -> Result<usize> {
        let candidate: Vec<Reminder> = self.reminders.iter().filter(|r| keep(r)).cloned().collect();
        let removed = self.reminders.len() - candidate.len();
        if removed > 0 {
            self.commit(candidate)?;
        }
        Ok(removed)
    }

    fn commit(&mut self, candidate: Vec<Reminder>) -> Result<()> {
        let json = serde_json::to_string(&candidate)?;
        self.surface.set(&self.key, &json).inspect_err(|e| {
            error!("Failed to persist reminders: {}", e);
        })?;
        self.reminders = candidate;
        Ok(())
    }
}

fn millis_or_rfc3339<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| D::Error::custom("timestamp out of range")),
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| dt.timestamp_millis())
            .map_err(D::Error::custom),
        other => Err(D::Error::custom(format!("unexpected timestamp {}", other))),
    }
}
