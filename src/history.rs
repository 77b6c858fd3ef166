//! History Store
//!
//! Bounded append-only log of executed command lines. Entries persist as
//! line-delimited JSON records; malformed lines are skipped on load, and a
//! file that has grown past the cap is truncated to the newest entries.

use std::collections::VecDeque;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default ring bound.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub command: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
pub struct HistoryStore {
    entries: VecDeque<HistoryEntry>,
    max_entries: usize,
    path: Option<PathBuf>,
}

impl HistoryStore {
    /// An in-memory store with the given cap.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: max_entries.max(1),
            path: None,
        }
    }

    /// A store backed by a history file. Existing records are loaded,
    /// malformed lines skipped; if the file holds more than `max_entries`
    /// records the oldest are dropped and the file rewritten.
    pub fn with_file(path: PathBuf, max_entries: usize) -> Self {
        let mut store = Self::new(max_entries);

        let mut loaded = 0usize;
        let mut kept = 0usize;
        if let Ok(text) = fs::read_to_string(&path) {
            for line in text.lines() {
                loaded += 1;
                if let Ok(entry) = serde_json::from_str::<HistoryEntry>(line) {
                    kept += 1;
                    store.entries.push_back(entry);
                    if store.entries.len() > store.max_entries {
                        store.entries.pop_front();
                    }
                }
            }
        }

        store.path = Some(path);
        if kept < loaded || store.entries.len() < kept {
            // Dropped malformed or over-cap records; rewrite the file so it
            // matches what is in memory.
            store.rewrite_file();
        }
        store
    }

    /// Append a command. The oldest entry is evicted at capacity.
    pub fn add(&mut self, command: impl Into<String>) {
        let entry = HistoryEntry {
            command: command.into(),
            timestamp: Utc::now(),
        };
        self.append_to_file(&entry);
        self.entries.push_back(entry);
        if self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    /// The last `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<&HistoryEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).collect()
    }

    /// Substring search, most recent first.
    pub fn search(&self, query: &str, limit: usize) -> Vec<&HistoryEntry> {
        self.entries
            .iter()
            .rev()
            .filter(|e| e.command.contains(query))
            .take(limit)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    fn append_to_file(&self, entry: &HistoryEntry) {
        let Some(path) = &self.path else {
            return;
        };
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let result = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| match serde_json::to_string(entry) {
                Ok(line) => writeln!(file, "{}", line),
                Err(e) => Err(e.into()),
            });
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "failed to append history record");
        }
    }

    fn rewrite_file(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let mut text = String::new();
        for entry in &self.entries {
            if let Ok(line) = serde_json::to_string(entry) {
                text.push_str(&line);
                text.push('\n');
            }
        }
        if let Err(e) = fs::write(path, text) {
            tracing::warn!(path = %path.display(), error = %e, "failed to rewrite history file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_recent() {
        let mut store = HistoryStore::new(100);
        store.add("first");
        store.add("second");
        store.add("third");
        let recent: Vec<&str> = store.recent(2).iter().map(|e| e.command.as_str()).collect();
        assert_eq!(recent, vec!["second", "third"]);
    }

    #[test]
    fn test_recent_more_than_len() {
        let mut store = HistoryStore::new(100);
        store.add("only");
        assert_eq!(store.recent(50).len(), 1);
    }

    #[test]
    fn test_eviction_drops_exactly_oldest() {
        let mut store = HistoryStore::new(3);
        store.add("a");
        store.add("b");
        store.add("c");
        store.add("d");
        assert_eq!(store.len(), 3);
        let all: Vec<&str> = store.recent(10).iter().map(|e| e.command.as_str()).collect();
        assert_eq!(all, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_search_most_recent_first() {
        let mut store = HistoryStore::new(100);
        store.add("git status");
        store.add("ls");
        store.add("git push");
        let hits: Vec<&str> = store
            .search("git", 10)
            .iter()
            .map(|e| e.command.as_str())
            .collect();
        assert_eq!(hits, vec!["git push", "git status"]);
    }

    #[test]
    fn test_search_respects_limit() {
        let mut store = HistoryStore::new(100);
        for i in 0..10 {
            store.add(format!("echo {}", i));
        }
        assert_eq!(store.search("echo", 3).len(), 3);
    }

    #[test]
    fn test_persistence_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        {
            let mut store = HistoryStore::with_file(path.clone(), 100);
            store.add("remembered");
        }
        let store = HistoryStore::with_file(path, 100);
        assert_eq!(store.len(), 1);
        assert_eq!(store.recent(1)[0].command, "remembered");
    }

    #[test]
    fn test_load_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        let good = serde_json::to_string(&HistoryEntry {
            command: "good".to_string(),
            timestamp: Utc::now(),
        })
        .unwrap();
        fs::write(&path, format!("{}\nnot-json\n{}\n", good, good)).unwrap();
        let store = HistoryStore::with_file(path, 100);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_load_truncates_over_cap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        {
            let mut store = HistoryStore::with_file(path.clone(), 100);
            for i in 0..10 {
                store.add(format!("cmd {}", i));
            }
        }
        let store = HistoryStore::with_file(path.clone(), 4);
        assert_eq!(store.len(), 4);
        assert_eq!(store.recent(1)[0].command, "cmd 9");
        // The file itself was truncated too.
        let lines = fs::read_to_string(&path).unwrap().lines().count();
        assert_eq!(lines, 4);
    }
}
