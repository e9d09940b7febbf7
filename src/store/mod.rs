//! Persisted record lists: downloads, history, bookmarks, profiles.
//!
//! Each list is one JSON array document under the data directory,
//! rewritten whole after every mutation. Lists are kept newest first.
//!
//! Layout:
//!   {data_dir}/downloads.json
//!   {data_dir}/history.json
//!   {data_dir}/bookmarks.json
//!   {data_dir}/profiles.json

pub mod bookmarks;
pub mod downloads;
pub mod history;
pub mod profiles;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Local, TimeZone, Utc};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

pub use bookmarks::BookmarkStore;
pub use downloads::{DownloadTracker, NewDownload};
pub use history::HistoryStore;
pub use profiles::{Profile, ProfileStore};

/// A JSON array of records backed by a single file
pub struct JsonStore<T> {
    path: PathBuf,
    items: Vec<T>,
}

impl<T: Serialize + DeserializeOwned + Clone> JsonStore<T> {
    /// Loads the document at `path`. A missing file is an empty list; an
    /// unreadable or corrupt one is logged and also treated as empty.
    pub fn open(path: &Path) -> Self {
        let items = match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring corrupt store {}: {e}", path.display());
                Vec::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!("Cannot read store {}: {e}", path.display());
                Vec::new()
            }
        };
        debug!("Opened {} ({} records)", path.display(), items.len());
        Self {
            path: path.to_path_buf(),
            items,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Applies `f` to a copy of the list and writes it to disk. The
    /// in-memory list only changes once the write succeeded.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut Vec<T>) -> R) -> Result<R> {
        let mut items = self.items.clone();
        let result = f(&mut items);
        self.save(&items)?;
        self.items = items;
        Ok(result)
    }

    fn save(&self, items: &[T]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(items)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Anything with a millisecond timestamp can be filtered and grouped by date
pub trait Timestamped {
    fn timestamp(&self) -> i64;
}

/// Records whose timestamp falls in `[start, end]` (unix millis, inclusive)
pub fn filter_by_date<T: Timestamped + Clone>(items: &[T], start: i64, end: i64) -> Vec<T> {
    items
        .iter()
        .filter(|e| e.timestamp() >= start && e.timestamp() <= end)
        .cloned()
        .collect()
}

/// Groups records by local calendar day (`YYYY-MM-DD`), newest day first
pub fn group_by_date<T: Timestamped + Clone>(items: &[T]) -> Vec<(String, Vec<T>)> {
    let mut groups: BTreeMap<String, Vec<T>> = BTreeMap::new();
    for item in items {
        let day = local_day(item.timestamp());
        groups.entry(day).or_default().push(item.clone());
    }
    groups.into_iter().rev().collect()
}

fn local_day(millis: i64) -> String {
    match Local.timestamp_millis_opt(millis).single() {
        Some(dt) => dt.format("%Y-%m-%d").to_string(),
        None => "unknown".to_string(),
    }
}

/// Current time in unix milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// `<unix millis><9 random base36 chars>`
pub fn new_entry_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{}{suffix}", now_millis())
}

/// RFC 3339 rendering of a millisecond timestamp, used in log lines
pub fn describe_time(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}
