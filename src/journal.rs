//! Goal-scoped journaling
//!
//! Each goal gets its own append-only journal, opened when the goal starts
//! and closed when it completes or is replaced. The session owns the journal
//! it was handed; nothing here is global.

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{error, info};

/// Who produced a journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JournalSource {
    /// The orchestrator itself
    Server,
    /// Forwarded from the browser side via `client_log`
    Client,
}

/// One journal line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalEntry {
    /// Local time, millisecond precision
    pub timestamp: String,
    /// Producer
    pub source: JournalSource,
    /// Event label, e.g. `GOAL_START`
    pub event_type: String,
    /// Human-readable message
    pub message: String,
    /// Structured extras
    pub extra_data: Value,
}

impl JournalEntry {
    /// Entry stamped with the current local time
    pub fn now(
        source: JournalSource,
        event_type: impl Into<String>,
        message: impl Into<String>,
        extra_data: Value,
    ) -> Self {
        Self {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            source,
            event_type: event_type.into(),
            message: message.into(),
            extra_data,
        }
    }
}

/// Sink for one goal's events
pub trait Journal: Send {
    /// Append one entry
    fn record(&mut self, entry: JournalEntry);

    /// Flush and release resources; later records are dropped
    fn close(&mut self);

    /// Record a server event
    fn server(&mut self, event_type: &str, message: &str) {
        self.record(JournalEntry::now(
            JournalSource::Server,
            event_type,
            message,
            Value::Object(Default::default()),
        ));
    }
}

/// Opens a journal per goal
pub trait JournalFactory: Send + Sync {
    /// Open the journal for `goal`
    fn open(&self, goal: &str) -> Box<dyn Journal>;
}

/// Journal that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullJournal;

impl Journal for NullJournal {
    fn record(&mut self, _entry: JournalEntry) {}
    fn close(&mut self) {}
}

impl JournalFactory for NullJournal {
    fn open(&self, _goal: &str) -> Box<dyn Journal> {
        Box::new(NullJournal)
    }
}

/// Append-only JSON-lines journal file
pub struct FileJournal {
    path: PathBuf,
    file: Option<File>,
}

impl FileJournal {
    /// Create `<dir>/<YYYYmmdd_HHMMSS>-<goal prefix>.log`
    pub fn create(dir: &Path, goal: &str, started: DateTime<Local>) -> std::io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(journal_file_name(goal, started));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!("Goal journal opened: {}", path.display());
        Ok(Self {
            path,
            file: Some(file),
        })
    }

    /// Location of the journal file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Journal for FileJournal {
    fn record(&mut self, entry: JournalEntry) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        let line = match serde_json::to_string(&entry) {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize journal entry: {}", e);
                return;
            }
        };
        if let Err(e) = writeln!(file, "{}", line) {
            error!("Failed to write journal {}: {}", self.path.display(), e);
        }
    }

    fn close(&mut self) {
        if let Some(mut file) = self.file.take() {
            if let Err(e) = file.flush() {
                error!("Failed to flush journal {}: {}", self.path.display(), e);
            }
        }
    }
}

impl Drop for FileJournal {
    fn drop(&mut self) {
        self.close();
    }
}

/// Opens a [`FileJournal`] per goal under one directory
#[derive(Debug, Clone)]
pub struct FileJournalFactory {
    dir: PathBuf,
}

impl FileJournalFactory {
    /// Journals will be written under `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl JournalFactory for FileJournalFactory {
    fn open(&self, goal: &str) -> Box<dyn Journal> {
        match FileJournal::create(&self.dir, goal, Local::now()) {
            Ok(journal) => Box::new(journal),
            Err(e) => {
                error!("Failed to open goal journal in {}: {}", self.dir.display(), e);
                Box::new(NullJournal)
            }
        }
    }
}

/// In-memory journal shared with its factory, for inspection in tests
#[derive(Debug, Default, Clone)]
pub struct MemoryJournal {
    entries: Arc<Mutex<Vec<JournalEntry>>>,
    closed: Arc<Mutex<usize>>,
}

impl MemoryJournal {
    /// Empty journal
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries recorded across every goal
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries.lock().clone()
    }

    /// Event labels in recording order
    pub fn event_types(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .map(|e| e.event_type.clone())
            .collect()
    }

    /// How many times a journal was closed
    pub fn close_count(&self) -> usize {
        *self.closed.lock()
    }
}

impl Journal for MemoryJournal {
    fn record(&mut self, entry: JournalEntry) {
        self.entries.lock().push(entry);
    }

    fn close(&mut self) {
        *self.closed.lock() += 1;
    }
}

impl JournalFactory for MemoryJournal {
    fn open(&self, _goal: &str) -> Box<dyn Journal> {
        Box::new(self.clone())
    }
}

fn journal_file_name(goal: &str, started: DateTime<Local>) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    let unsafe_chars = UNSAFE.get_or_init(|| Regex::new(r"[^\w\s-]").expect("valid regex"));
    let separators = SEPARATORS.get_or_init(|| Regex::new(r"[-\s]+").expect("valid regex"));

    let cleaned = unsafe_chars.replace_all(goal, "");
    let prefix: String = cleaned.chars().take(20).collect();
    let safe_goal = separators.replace_all(&prefix, "_");

    format!("{}-{}.log", started.format("%Y%m%d_%H%M%S"), safe_goal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_file_name_is_sanitized() {
        let started = Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 5).unwrap();
        assert_eq!(
            journal_file_name("open mail.example.com & read!", started),
            "20240501_093005-open_mailexamplecom_.log"
        );
        assert_eq!(
            journal_file_name("네이버 메일 확인", started),
            "20240501_093005-네이버_메일_확인.log"
        );
    }

    #[test]
    fn test_file_journal_appends_json_lines() {
        let dir = std::env::temp_dir().join(format!("goalpilot-journal-{}", uuid::Uuid::new_v4()));
        let mut journal = FileJournal::create(&dir, "read mail", Local::now()).unwrap();
        journal.server("GOAL_START", "read mail");
        journal.record(JournalEntry::now(
            JournalSource::Client,
            "CLICK",
            "clicked",
            json!({"selector": "#a"}),
        ));
        journal.close();
        journal.server("IGNORED", "after close");

        let content = fs::read_to_string(journal.path()).unwrap();
        let lines: Vec<Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["source"], "SERVER");
        assert_eq!(lines[0]["event_type"], "GOAL_START");
        assert_eq!(lines[1]["source"], "CLIENT");
        assert_eq!(lines[1]["extra_data"]["selector"], "#a");

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_memory_journal_shares_entries() {
        let memory = MemoryJournal::new();
        let mut journal = memory.open("goal");
        journal.server("GOAL_START", "goal");
        journal.close();
        assert_eq!(memory.event_types(), vec!["GOAL_START"]);
        assert_eq!(memory.close_count(), 1);
    }
}
