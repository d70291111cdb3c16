//! JSONL Event Store - append-only writer
//!
//! Events are written to one file per day of their timestamp.

use crate::error::PersistenceResult;
use rcard_core::Event;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

const EVENT_ID_PREFIX: &str = "EVT_";

/// Event Store - writes audit events to JSONL files.
///
/// Files are organized by day: `data/events/2026-10-17.jsonl`
pub struct EventStore {
    base_path: PathBuf,
    event_counter: AtomicU64,
    current_writer: Mutex<Option<EventWriter>>,
}

struct EventWriter {
    date: String,
    writer: BufWriter<File>,
}

impl EventStore {
    /// Open a store rooted at `base_path`, creating the directory if needed.
    ///
    /// The id counter resumes after the highest id already on disk.
    pub fn new<P: AsRef<Path>>(base_path: P) -> PersistenceResult<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;

        let event_counter = Self::load_event_counter(&base_path);

        Ok(Self {
            base_path,
            event_counter: AtomicU64::new(event_counter),
            current_writer: Mutex::new(None),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn load_event_counter(base_path: &Path) -> u64 {
        let mut max_id: u64 = 0;

        let Ok(entries) = fs::read_dir(base_path) else {
            return 1;
        };

        for path in entries.flatten().map(|e| e.path()) {
            if !is_jsonl(&path) {
                continue;
            }
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            for line in content.lines() {
                // EVT_000123 -> 123
                let id = serde_json::from_str::<Event>(line).ok().and_then(|event| {
                    event
                        .event_id
                        .strip_prefix(EVENT_ID_PREFIX)
                        .and_then(|n| n.parse::<u64>().ok())
                });
                if let Some(id) = id {
                    max_id = max_id.max(id);
                }
            }
        }

        max_id + 1
    }

    fn file_path(&self, date: &str) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", date))
    }

    fn lock_writer(&self) -> MutexGuard<'_, Option<EventWriter>> {
        // a poisoned writer is still a valid file handle
        self.current_writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Generate a new event id
    pub fn next_event_id(&self) -> String {
        let id = self.event_counter.fetch_add(1, Ordering::SeqCst);
        format!("{}{:06}", EVENT_ID_PREFIX, id)
    }

    /// Append an event to the file of its day
    pub fn append(&self, event: &Event) -> PersistenceResult<()> {
        let date = event.timestamp.format("%Y-%m-%d").to_string();
        let json = serde_json::to_string(event)?;

        let mut guard = self.lock_writer();

        let needs_new_file = guard.as_ref().map_or(true, |w| w.date != date);
        if needs_new_file {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.file_path(&date))?;
            *guard = Some(EventWriter {
                date,
                writer: BufWriter::new(file),
            });
        }

        if let Some(ref mut w) = *guard {
            writeln!(w.writer, "{}", json)?;
            w.writer.flush()?;
        }

        Ok(())
    }

    /// All event files, oldest day first
    pub fn list_files(&self) -> PersistenceResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if is_jsonl(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn flush(&self) -> PersistenceResult<()> {
        if let Some(ref mut w) = *self.lock_writer() {
            w.writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for EventStore {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

pub(crate) fn is_jsonl(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "jsonl")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rcard_core::EventType;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn deposit(store: &EventStore, day: u32) -> Event {
        let ts = Utc.with_ymd_and_hms(2026, 10, day, 9, 0, 0).unwrap();
        Event::new(store.next_event_id(), ts, EventType::WalletDeposit, 1).with_amount(dec!(100))
    }

    #[test]
    fn test_event_store_append() {
        let dir = tempdir().unwrap();
        let store = EventStore::new(dir.path()).unwrap();

        store.append(&deposit(&store, 17)).unwrap();
        store.flush().unwrap();

        let files = store.list_files().unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("2026-10-17.jsonl"));

        let content = fs::read_to_string(&files[0]).unwrap();
        assert!(content.contains("EVT_000001"));
        assert!(content.contains("wallet_deposit"));
    }

    #[test]
    fn test_event_store_splits_files_by_event_day() {
        let dir = tempdir().unwrap();
        let store = EventStore::new(dir.path()).unwrap();

        store.append(&deposit(&store, 16)).unwrap();
        store.append(&deposit(&store, 17)).unwrap();

        assert_eq!(store.list_files().unwrap().len(), 2);
    }

    #[test]
    fn test_event_store_counter() {
        let dir = tempdir().unwrap();
        let store = EventStore::new(dir.path()).unwrap();

        assert_eq!(store.next_event_id(), "EVT_000001");
        assert_eq!(store.next_event_id(), "EVT_000002");
    }

    #[test]
    fn test_event_store_reload_counter() {
        let dir = tempdir().unwrap();

        {
            let store = EventStore::new(dir.path()).unwrap();
            store.append(&deposit(&store, 17)).unwrap();
            store.append(&deposit(&store, 17)).unwrap();
        }

        let store = EventStore::new(dir.path()).unwrap();
        assert_eq!(store.next_event_id(), "EVT_000003");
    }
}
