//! Download tracker: one record per finished, failed or cancelled download.
//!
//! Records are never deduplicated (every attempt is its own entry) and are
//! never modified after creation. The list is capped; once full, each new
//! record evicts the oldest one.

use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{describe_time, filter_by_date, group_by_date, new_entry_id, now_millis, JsonStore, Timestamped};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DownloadEntry {
    pub id: String,
    pub filename: String,
    pub url: String,
    pub file_size: u64,
    pub file_path: String,
    pub status: DownloadStatus,
    pub timestamp: i64,
}

impl Timestamped for DownloadEntry {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// What the renderer sends with `add-download-entry`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDownload {
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub file_path: String,
    pub status: DownloadStatus,
}

pub struct DownloadTracker {
    store: Mutex<JsonStore<DownloadEntry>>,
    max_entries: usize,
}

impl DownloadTracker {
    pub fn open(path: &Path, max_entries: usize) -> Self {
        Self {
            store: Mutex::new(JsonStore::open(path)),
            max_entries,
        }
    }

    /// Records a download outcome, newest first, evicting past the cap
    pub fn add(&self, new: NewDownload) -> Result<DownloadEntry> {
        let entry = DownloadEntry {
            id: new_entry_id(),
            filename: new.filename,
            url: new.url,
            file_size: new.file_size,
            file_path: new.file_path,
            status: new.status,
            timestamp: now_millis(),
        };

        let max = self.max_entries;
        let recorded = entry.clone();
        self.lock().update(move |items| {
            items.insert(0, recorded);
            items.truncate(max);
        })?;

        info!(
            "Download {:?} {} ({}) at {}",
            entry.status,
            entry.filename,
            format_file_size(entry.file_size),
            describe_time(entry.timestamp)
        );
        Ok(entry)
    }

    /// Newest first, optionally limited
    pub fn list(&self, limit: Option<usize>) -> Vec<DownloadEntry> {
        let store = self.lock();
        let items = store.items();
        items[..limit.unwrap_or(items.len()).min(items.len())].to_vec()
    }

    /// Case-insensitive match on filename or URL
    pub fn search(&self, query: &str) -> Vec<DownloadEntry> {
        let q = query.to_lowercase();
        self.lock()
            .items()
            .iter()
            .filter(|e| e.filename.to_lowercase().contains(&q) || e.url.to_lowercase().contains(&q))
            .cloned()
            .collect()
    }

    pub fn by_date(&self, start: i64, end: i64) -> Vec<DownloadEntry> {
        filter_by_date(self.lock().items(), start, end)
    }

    pub fn grouped_by_date(&self) -> Vec<(String, Vec<DownloadEntry>)> {
        group_by_date(self.lock().items())
    }

    pub fn clear(&self) -> Result<()> {
        self.lock().update(|items| items.clear())?;
        info!("Download list cleared");
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, JsonStore<DownloadEntry>> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Human-readable size: `0 Bytes`, `512 Bytes`, `1.5 KB`, `2 MB`
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[unit])
}
