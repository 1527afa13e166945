//! CLI module for the notepro application
//!
//! This module handles the command-line interface for interacting with the
//! note store. It only translates commands into store and query calls and
//! prints the results.
use std::{
    fs::{self, read_to_string},
    io::{stdin, stdout, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use console::style;
use log::{debug, info, warn};

use crate::{
    decode_share, parse_tags, share_fragment, sorted_tags, suggest_tags_limited, tag_counts,
    top_tags, Commands, Config, KeyValueStore, Note, NoteColor, NoteError, NoteId, NoteQuery,
    NoteStats, NoteUpdate, NotesStore, ReminderBook, Result, TagSort,
};

/// Title shown for notes without one
const UNTITLED: &str = "Untitled";

/// CLI Application handler - processes CLI commands and interfaces with the stores
pub struct App<S: KeyValueStore> {
    /// The note store
    notes: NotesStore<S>,

    /// Reminders attached to notes
    reminders: ReminderBook<S>,

    /// Application configuration
    config: Config,

    /// Where `config` was read from, used by `config --set/--reset`
    config_path: Option<PathBuf>,

    /// Whether to display verbose output
    verbose: bool,
}

impl<S: KeyValueStore> App<S> {
    /// Create a new CLI application with the given stores and config
    pub fn new(
        notes: NotesStore<S>,
        reminders: ReminderBook<S>,
        config: Config,
        config_path: Option<PathBuf>,
        verbose: bool,
    ) -> Self {
        Self {
            notes,
            reminders,
            config,
            config_path,
            verbose,
        }
    }

    pub fn notes(&self) -> &NotesStore<S> {
        &self.notes
    }

    pub fn reminders(&self) -> &ReminderBook<S> {
        &self.reminders
    }

    /// Tells the user about repaired storage and reminders that came due
    pub fn report_startup(&mut self) -> Result<()> {
        let report = self.notes.load_report();
        if let Some(reason) = &report.recovered_from {
            eprintln!(
                "{} stored notes could not be read and were ignored ({})",
                style("warning:").yellow().bold(),
                reason
            );
        } else if !report.is_clean() {
            eprintln!(
                "{} skipped {} unreadable notes, re-numbered {} duplicates",
                style("warning:").yellow().bold(),
                report.dropped,
                report.reassigned
            );
        }

        for reminder in self.reminders.take_due(Utc::now())? {
            let title = reminder
                .note(&self.notes)
                .map(|note| display_title(note).to_string());
            match title {
                Some(title) => println!(
                    "{} {} (note {}: {})",
                    style("Reminder:").magenta().bold(),
                    reminder.text,
                    reminder.note_id,
                    title
                ),
                None => println!("{} {}", style("Reminder:").magenta().bold(), reminder.text),
            }
        }
        Ok(())
    }

    /// Run the CLI application with the given command
    pub fn run(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Create {
                title,
                content,
                file,
                tags,
                color,
                pin,
            } => self.create_note(title, content, file, tags, color, pin)?,

            Commands::View { id, json } => self.view_note(id, json)?,

            Commands::List {
                search,
                tags,
                pinned,
                recent,
                sort,
                limit,
                json,
                brief,
            } => {
                let mut query = NoteQuery::new()
                    .pinned_only(pinned)
                    .recent_only(recent)
                    .recent_window(self.config.recent_window())
                    .sort(sort.unwrap_or(self.config.default_sort));
                if let Some(term) = search {
                    query = query.search(term);
                }
                for tag in parse_tags(tags) {
                    query = query.tag(&tag);
                }
                self.list_notes(&query, limit, json, brief)?
            }

            Commands::Edit {
                id,
                title,
                content,
                file,
                tags,
                color,
            } => self.edit_note(id, title, content, file, tags, color)?,

            Commands::Delete { id, force } => self.handle_delete(id, force)?,

            Commands::Tag { id, add, remove } => self.handle_tag(id, add, remove)?,

            Commands::Pin { id } => {
                let pinned = self.notes.modify(id, |note| {
                    note.toggle_pin();
                    note.pinned
                })?;
                println!("Note {} {}", id, if pinned { "pinned" } else { "unpinned" });
            }

            Commands::Tags { sort, top } => self.list_tags(sort, top),

            Commands::Suggest { id } => {
                let note = self.find(id)?;
                let suggestions =
                    suggest_tags_limited(&note.plain_text(), &note.tags, self.config.suggestion_limit);
                if suggestions.is_empty() {
                    println!("No tag suggestions for note {}", id);
                } else {
                    println!("Suggested tags: {}", style(suggestions.join(", ")).cyan());
                }
            }

            Commands::Stats { id } => {
                let stats = NoteStats::of(&self.find(id)?.plain_text());
                println!("Words:        {}", stats.words);
                println!("Characters:   {}", stats.characters);
                println!(
                    "Reading time: {} min {} s",
                    stats.reading_time.minutes, stats.reading_time.seconds
                );
            }

            Commands::Export { output } => self.handle_export(output)?,

            Commands::Import { source, force } => self.handle_import(&source, force)?,

            Commands::Clear { force } => {
                if force || confirm(&format!("Delete all {} notes?", self.notes.len()))? {
                    self.notes.clear()?;
                    println!("All notes deleted");
                } else {
                    println!("Cancelled.");
                }
            }

            Commands::Share { id } => {
                let fragment = share_fragment(self.find(id)?)?;
                println!("#{}", fragment);
            }

            Commands::OpenShare { link } => {
                let note = decode_share(&link)?;
                let (id, title) = (note.id, display_title(&note).to_string());
                self.notes.add(note)?;
                println!("Imported shared note \"{}\" with ID: {}", title, id);
            }

            Commands::Remind { id, at, text } => {
                let note = self.find(id)?;
                let text = text.unwrap_or_else(|| display_title(note).to_string());
                let when = parse_when(&at)?;
                let reminder = self.reminders.add(id, &text, when, Utc::now())?;
                println!(
                    "Reminder {} set for {}",
                    reminder.id,
                    when.with_timezone(&Local).format("%Y-%m-%d %H:%M")
                );
            }

            Commands::Reminders {
                due,
                clear_completed,
            } => self.handle_reminders(due, clear_completed)?,

            Commands::Config { show, set, reset } => self.handle_config(show, set, reset)?,
        }

        Ok(())
    }

    fn find(&self, id: NoteId) -> Result<&Note> {
        self.notes.get(id).ok_or(NoteError::NoteNotFound { id })
    }

    fn create_note(
        &mut self,
        title: String,
        content: Option<String>,
        file: Option<PathBuf>,
        tags: Option<String>,
        color: Option<NoteColor>,
        pin: bool,
    ) -> Result<()> {
        let content = read_content(content, file)?.unwrap_or_default();

        let mut note = Note::new(title, content);
        note.update(NoteUpdate {
            tags: Some(parse_tags(tags)),
            color,
            pinned: Some(pin),
            ..NoteUpdate::default()
        });

        let id = note.id;
        self.notes.add(note)?;
        println!("Note created with ID: {}", id);
        Ok(())
    }

    fn view_note(&self, id: NoteId, json: bool) -> Result<()> {
        let note = self.find(id)?;
        if json {
            println!("{}", serde_json::to_string_pretty(note)?);
            return Ok(());
        }

        print_note_header(note);
        let text = note.plain_text();
        if !text.trim().is_empty() {
            println!("\n{}", text.trim());
        }

        let reminders = self.reminders.for_note(id);
        if !reminders.is_empty() {
            println!();
            for reminder in reminders {
                let when = reminder
                    .fire_at()
                    .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "?".to_string());
                let state = if reminder.notified { " (done)" } else { "" };
                println!("Reminder: {} at {}{}", reminder.text, when, state);
            }
        }
        Ok(())
    }

    /// List notes according to the query and display options
    fn list_notes(
        &self,
        query: &NoteQuery,
        limit: Option<usize>,
        json: bool,
        brief: bool,
    ) -> Result<()> {
        let mut notes = query.apply(self.notes.notes(), Utc::now());
        if let Some(limit) = limit {
            notes.truncate(limit);
        }

        if json {
            println!("{}", serde_json::to_string_pretty(&notes)?);
            return Ok(());
        }

        if notes.is_empty() {
            println!("No notes found matching the criteria.");
            return Ok(());
        }

        for note in &notes {
            if brief {
                let pin = if note.pinned { "*" } else { " " };
                println!("{}{:>16}  {}", pin, note.id, display_title(note));
                continue;
            }

            println!("{}", "-".repeat(50));
            print_note_header(note);
            let preview: String = note.plain_text().chars().take(120).collect();
            if !preview.trim().is_empty() {
                println!("\n{}", preview.trim());
            }
        }

        if self.verbose {
            println!(
                "\n{} of {} notes, sorted by {}",
                notes.len(),
                self.notes.len(),
                query.sort
            );
        }
        Ok(())
    }

    fn edit_note(
        &mut self,
        id: NoteId,
        title: Option<String>,
        content: Option<String>,
        file: Option<PathBuf>,
        tags: Option<String>,
        color: Option<NoteColor>,
    ) -> Result<()> {
        let content = read_content(content, file)?;
        let changes = NoteUpdate {
            title,
            content,
            color,
            tags: tags.map(|t| parse_tags(Some(t))),
            pinned: None,
        };

        self.notes.modify(id, |note| note.update(changes))?;
        println!("Note {} updated successfully", id);
        Ok(())
    }

    fn handle_delete(&mut self, id: NoteId, force: bool) -> Result<()> {
        let note = self.find(id)?;

        if !force {
            println!("You are about to delete the following note:");
            println!("ID:     {}", note.id);
            println!("Title:  {}", display_title(note));
            println!("Tags:   {}", note.tags.join(", "));
            println!(
                "Created: {}",
                note.created.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
            );
            println!("\nThis action cannot be undone!");
            if !confirm("Delete this note?")? {
                println!("Deletion cancelled.");
                return Ok(());
            }
        }

        let removed = self.notes.delete(id)?;
        println!("Note {} deleted: {}", removed.id, display_title(&removed));
        Ok(())
    }

    fn handle_tag(&mut self, id: NoteId, add: Option<String>, remove: Option<String>) -> Result<()> {
        let add = parse_tags(add);
        let remove = parse_tags(remove);

        if !add.is_empty() || !remove.is_empty() {
            let changed = self.notes.modify(id, |note| {
                let added = add.iter().filter(|tag| note.add_tag(tag)).count();
                let removed = remove
                    .iter()
                    .filter(|tag| note.remove_tag(&tag.to_lowercase()))
                    .count();
                added + removed
            })?;
            debug!("{} tag changes on note {}", changed, id);
        }

        let note = self.find(id)?;
        if note.tags.is_empty() {
            println!("Note {} has no tags", id);
        } else {
            println!("Tags: {}", style(note.tags.join(", ")).cyan());
        }
        Ok(())
    }

    fn list_tags(&self, sort: TagSort, top: Option<usize>) {
        let pairs = match top {
            Some(limit) => {
                let counts = tag_counts(self.notes.notes());
                top_tags(&counts, limit)
                    .into_iter()
                    .map(|tag| {
                        let count = counts.get(&tag).copied().unwrap_or_default();
                        (tag, count)
                    })
                    .collect()
            }
            None => sorted_tags(self.notes.notes(), sort),
        };

        if pairs.is_empty() {
            println!("No tags yet.");
            return;
        }
        for (tag, count) in pairs {
            println!("{:<24} {}", style(tag).cyan(), count);
        }
    }

    fn handle_export(&self, output: Option<PathBuf>) -> Result<()> {
        let json = self.notes.export()?;
        match output {
            Some(path) => {
                fs::write(&path, json)?;
                println!("Exported {} notes to {}", self.notes.len(), path.display());
            }
            None => println!("{}", json),
        }
        Ok(())
    }

    fn handle_import(&mut self, source: &Path, force: bool) -> Result<()> {
        if !source.exists() {
            return Err(NoteError::FileNotFound {
                file_path: source.display().to_string(),
            });
        }
        if source.extension().map_or(true, |ext| ext != "json") {
            warn!("Importing from a file without .json extension: {}", source.display());
        }

        let data = read_to_string(source)?;
        if !force
            && !self.notes.is_empty()
            && !confirm(&format!(
                "Importing replaces all {} existing notes. Continue?",
                self.notes.len()
            ))?
        {
            println!("Import cancelled.");
            return Ok(());
        }

        let count = self.notes.import(&data)?;
        println!("Imported {} notes", count);
        Ok(())
    }

    fn handle_reminders(&mut self, due: bool, clear_completed: bool) -> Result<()> {
        if clear_completed {
            let removed = self.reminders.clear_completed()?;
            println!("Removed {} completed reminders", removed);
            return Ok(());
        }

        let reminders = if due {
            self.reminders.take_due(Utc::now())?
        } else {
            self.reminders.all().to_vec()
        };

        if reminders.is_empty() {
            println!("No reminders.");
            return Ok(());
        }
        for reminder in reminders {
            let when = reminder
                .fire_at()
                .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "?".to_string());
            let note = reminder
                .note(&self.notes)
                .map(|note| display_title(note).to_string())
                .unwrap_or_else(|| "(deleted note)".to_string());
            let state = if reminder.notified { "done" } else { "pending" };
            println!("{}  {}  {}  [{}]", when, reminder.text, style(note).dim(), state);
        }
        Ok(())
    }

    fn handle_config(&mut self, show: bool, set: Option<String>, reset: bool) -> Result<()> {
        let show = show || (set.is_none() && !reset);
        if reset {
            self.config = Config::default();
            self.save_config()?;
            println!("Configuration reset to defaults");
        }
        if let Some(assignment) = set {
            self.config.set(&assignment)?;
            self.save_config()?;
            println!("Configuration updated");
        }
        if show {
            println!("{}", serde_json::to_string_pretty(&self.config)?);
        }
        Ok(())
    }

    fn save_config(&self) -> Result<()> {
        let path = self
            .config_path
            .clone()
            .or_else(Config::default_path)
            .ok_or_else(|| NoteError::ConfigError {
                message: "no configuration path available".to_string(),
            })?;
        self.config.save(&path)?;
        info!("Configuration written to {}", path.display());
        Ok(())
    }
}

fn display_title(note: &Note) -> &str {
    if note.title.trim().is_empty() {
        UNTITLED
    } else {
        &note.title
    }
}

fn print_note_header(note: &Note) {
    let updated = note.updated.with_timezone(&Local).format("%Y-%m-%d %H:%M");
    let pin = if note.pinned { " [pinned]" } else { "" };
    println!("ID: {} | Updated: {}{}", note.id, updated, pin);
    println!("Title: {}", style(display_title(note)).bold());
    if note.color != NoteColor::Default {
        println!("Color: {}", note.color);
    }
    if !note.tags.is_empty() {
        println!("Tags: {}", style(note.tags.join(", ")).cyan());
    }
}

/// Content given inline wins over content read from a file
fn read_content(content: Option<String>, file: Option<PathBuf>) -> Result<Option<String>> {
    match (content, file) {
        (Some(c), _) => Ok(Some(c)),
        (None, Some(file_path)) => {
            if !file_path.exists() {
                return Err(NoteError::FileNotFound {
                    file_path: file_path.display().to_string(),
                });
            }
            Ok(Some(read_to_string(file_path)?))
        }
        (None, None) => Ok(None),
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    stdout().flush()?;
    let mut answer = String::new();
    stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Parses an RFC 3339 instant or a local `YYYY-MM-DD HH:MM`
pub fn parse_when(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Ok(at.with_timezone(&Utc));
    }

    let invalid = || NoteError::InvalidReminder {
        message: format!("cannot read '{}' as a date and time", input),
    };
    let naive = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M").map_err(|_| invalid())?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|at| at.with_timezone(&Utc))
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStore, NOTES_KEY};

    fn app() -> App<MemoryStore> {
        App::new(
            NotesStore::open(MemoryStore::new()),
            ReminderBook::open(MemoryStore::new()),
            Config::default(),
            None,
            false,
        )
    }

    fn create(app: &mut App<MemoryStore>, title: &str, tags: &str) -> NoteId {
        app.run(Commands::Create {
            title: title.to_string(),
            content: Some(format!("<p>{} body</p>", title)),
            file: None,
            tags: Some(tags.to_string()),
            color: Some(NoteColor::Blue),
            pin: false,
        })
        .unwrap();
        app.notes().notes().last().unwrap().id
    }

    #[test]
    fn create_stores_normalized_note() {
        let mut app = app();
        let id = create(&mut app, "Plan", "Work, work ,Home");
        let note = app.notes().get(id).unwrap();
        assert_eq!(note.tags, vec!["work".to_string(), "home".to_string()]);
        assert_eq!(note.color, NoteColor::Blue);
        assert!(app.notes().surface().get(NOTES_KEY).unwrap().is_some());
    }

    #[test]
    fn edit_tag_pin_and_delete_go_through_the_store() {
        let mut app = app();
        let id = create(&mut app, "Plan", "work");

        app.run(Commands::Edit {
            id,
            title: Some("Plan B".to_string()),
            content: None,
            file: None,
            tags: None,
            color: None,
        })
        .unwrap();
        app.run(Commands::Tag {
            id,
            add: Some("Urgent".to_string()),
            remove: Some("WORK".to_string()),
        })
        .unwrap();
        app.run(Commands::Pin { id }).unwrap();

        let note = app.notes().get(id).unwrap();
        assert_eq!(note.title, "Plan B");
        assert_eq!(note.tags, vec!["urgent".to_string()]);
        assert!(note.pinned);

        app.run(Commands::Delete { id, force: true }).unwrap();
        assert!(app.notes().is_empty());
    }

    #[test]
    fn missing_note_is_reported() {
        let mut app = app();
        let err = app.run(Commands::Pin { id: NoteId(1) }).unwrap_err();
        assert!(matches!(err, NoteError::NoteNotFound { .. }));
    }

    #[test]
    fn import_from_file_replaces_notes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        fs::write(&path, r#"[{"title":"a","content":"1"},{"title":"b","content":"2"}]"#).unwrap();

        let mut app = app();
        create(&mut app, "old", "");
        app.run(Commands::Import {
            source: path,
            force: true,
        })
        .unwrap();
        assert_eq!(app.notes().len(), 2);
    }

    #[test]
    fn shared_note_can_be_opened() {
        let mut app = app();
        let id = create(&mut app, "Shared", "x");
        let fragment = share_fragment(app.notes().get(id).unwrap()).unwrap();
        app.run(Commands::OpenShare { link: fragment }).unwrap();
        assert_eq!(app.notes().len(), 2);
        assert_eq!(app.notes().notes()[1].title, "Shared");
    }

    #[test]
    fn reminders_are_recorded() {
        let mut app = app();
        let id = create(&mut app, "Dentist", "");
        let at = (Utc::now() + chrono::Duration::days(1)).to_rfc3339();
        app.run(Commands::Remind { id, at, text: None }).unwrap();
        assert_eq!(app.reminders().for_note(id)[0].text, "Dentist");
    }

    #[test]
    fn parse_when_accepts_both_formats() {
        let rfc = parse_when("2030-01-02T03:04:05Z").unwrap();
        assert_eq!(rfc.to_rfc3339(), "2030-01-02T03:04:05+00:00");
        assert!(parse_when("2030-01-02 03:04").is_ok());
        assert!(parse_when("tomorrow").is_err());
    }
}
