//! Event Replay - read audit events back from JSONL files

use crate::error::PersistenceResult;
use crate::events::store::is_jsonl;
use chrono::NaiveDate;
use rcard_core::{Event, EventType, UserId};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Event Reader - reads events from JSONL files
pub struct EventReader {
    base_path: PathBuf,
}

impl EventReader {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Read every event in one file
    pub fn read_file(&self, file_path: &Path) -> PersistenceResult<Vec<Event>> {
        let reader = BufReader::new(File::open(file_path)?);
        let mut events = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(&line)?);
        }

        Ok(events)
    }

    /// Events of one day; empty if the day has no file
    pub fn read_date(&self, date: NaiveDate) -> PersistenceResult<Vec<Event>> {
        let file_path = self.base_path.join(format!("{}.jsonl", date.format("%Y-%m-%d")));
        if file_path.exists() {
            self.read_file(&file_path)
        } else {
            Ok(Vec::new())
        }
    }

    /// Events between two days, inclusive
    pub fn read_range(&self, from: NaiveDate, to: NaiveDate) -> PersistenceResult<Vec<Event>> {
        let mut all_events = Vec::new();
        for day in from.iter_days().take_while(|d| *d <= to) {
            all_events.extend(self.read_date(day)?);
        }
        Ok(all_events)
    }

    /// All events, oldest first
    pub fn read_all(&self) -> PersistenceResult<Vec<Event>> {
        let mut all_events = Vec::new();

        if !self.base_path.exists() {
            return Ok(all_events);
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.base_path)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| is_jsonl(p))
            .collect();
        files.sort();

        for file_path in files {
            all_events.extend(self.read_file(&file_path)?);
        }

        Ok(all_events)
    }
}

/// Event Filter - selects events by user, type and loan
#[derive(Debug, Default, Clone)]
pub struct EventFilter {
    pub user_id: Option<UserId>,
    pub event_types: Option<Vec<EventType>>,
    pub loan_id: Option<String>,
    /// Keep only the newest N matches
    pub limit: Option<usize>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn event_types(mut self, types: Vec<EventType>) -> Self {
        self.event_types = Some(types);
        self
    }

    pub fn loan(mut self, loan_id: &str) -> Self {
        self.loan_id = Some(loan_id.to_string());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, event: &Event) -> bool {
        if let Some(user_id) = self.user_id {
            if event.user_id != user_id {
                return false;
            }
        }

        if let Some(ref types) = self.event_types {
            if !types.contains(&event.event_type) {
                return false;
            }
        }

        if let Some(ref loan_id) = self.loan_id {
            if event.loan_id.as_deref() != Some(loan_id.as_str()) {
                return false;
            }
        }

        true
    }

    /// Apply filter to events (input order preserved)
    pub fn apply(&self, events: Vec<Event>) -> Vec<Event> {
        let mut matched: Vec<Event> = events.into_iter().filter(|e| self.matches(e)).collect();
        if let Some(limit) = self.limit {
            let skip = matched.len().saturating_sub(limit);
            matched.drain(..skip);
        }
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventStore;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn event(id: &str, event_type: EventType, user_id: UserId) -> Event {
        let ts = Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap();
        Event::new(id.to_string(), ts, event_type, user_id)
    }

    #[test]
    fn test_event_reader() {
        let dir = tempdir().unwrap();
        let store = EventStore::new(dir.path()).unwrap();

        store
            .append(&event(&store.next_event_id(), EventType::WalletDeposit, 1).with_amount(dec!(100)))
            .unwrap();
        store
            .append(&event(&store.next_event_id(), EventType::LoanCreated, 1).with_loan("loan_x"))
            .unwrap();
        store.flush().unwrap();

        let reader = EventReader::new(dir.path());
        let events = reader.read_all().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::WalletDeposit);
        assert_eq!(events[0].amount, Some(dec!(100)));
        assert_eq!(events[1].loan_id.as_deref(), Some("loan_x"));

        let day = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        assert_eq!(reader.read_range(day, day).unwrap().len(), 2);
        assert!(reader.read_date(day.succ_opt().unwrap()).unwrap().is_empty());
    }

    #[test]
    fn test_event_filter() {
        let events = vec![
            event("EVT_001", EventType::WalletDeposit, 1),
            event("EVT_002", EventType::WalletDeposit, 2),
            event("EVT_003", EventType::LoanRepaid, 1).with_loan("loan_a"),
            event("EVT_004", EventType::LoanSettled, 1).with_loan("loan_a"),
        ];

        assert_eq!(EventFilter::new().user(1).apply(events.clone()).len(), 3);
        assert_eq!(
            EventFilter::new()
                .event_types(vec![EventType::LoanRepaid, EventType::LoanSettled])
                .apply(events.clone())
                .len(),
            2
        );
        assert_eq!(EventFilter::new().loan("loan_a").apply(events.clone()).len(), 2);

        let newest = EventFilter::new().user(1).limit(1).apply(events);
        assert_eq!(newest.len(), 1);
        assert_eq!(newest[0].event_id, "EVT_004");
    }
}
