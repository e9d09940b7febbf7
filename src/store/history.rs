//! Browsing history. One entry per URL: revisiting a page moves it to the
//! top with a fresh timestamp instead of adding a duplicate.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{filter_by_date, group_by_date, new_entry_id, now_millis, JsonStore, Timestamped};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub id: String,
    pub url: String,
    pub title: String,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

impl Timestamped for HistoryEntry {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

pub struct HistoryStore {
    store: Mutex<JsonStore<HistoryEntry>>,
    max_entries: usize,
}

impl HistoryStore {
    pub fn open(path: &Path, max_entries: usize) -> Self {
        Self {
            store: Mutex::new(JsonStore::open(path)),
            max_entries,
        }
    }

    /// Records a visit. An existing entry for the same URL is replaced.
    pub fn add(&self, url: &str, title: &str, favicon: Option<String>) -> Result<HistoryEntry> {
        let entry = HistoryEntry {
            id: new_entry_id(),
            url: url.to_string(),
            title: if title.is_empty() { url.to_string() } else { title.to_string() },
            timestamp: now_millis(),
            favicon,
        };

        let max = self.max_entries;
        let recorded = entry.clone();
        self.lock().update(move |items| {
            items.retain(|e| e.url != recorded.url);
            items.insert(0, recorded);
            items.truncate(max);
        })?;

        debug!("History: {}", entry.url);
        Ok(entry)
    }

    pub fn list(&self, limit: Option<usize>) -> Vec<HistoryEntry> {
        let store = self.lock();
        let items = store.items();
        items[..limit.unwrap_or(items.len()).min(items.len())].to_vec()
    }

    /// Case-insensitive match on title or URL
    pub fn search(&self, query: &str) -> Vec<HistoryEntry> {
        let q = query.to_lowercase();
        self.lock()
            .items()
            .iter()
            .filter(|e| e.title.to_lowercase().contains(&q) || e.url.to_lowercase().contains(&q))
            .cloned()
            .collect()
    }

    /// Entries whose host equals `domain` or is a subdomain of it
    pub fn by_site(&self, domain: &str) -> Vec<HistoryEntry> {
        let domain = domain.trim().trim_start_matches("www.").to_lowercase();
        self.lock()
            .items()
            .iter()
            .filter(|e| {
                host_of(&e.url)
                    .map(|h| {
                        let h = h.trim_start_matches("www.");
                        h == domain || h.ends_with(&format!(".{domain}"))
                    })
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    pub fn by_date(&self, start: i64, end: i64) -> Vec<HistoryEntry> {
        filter_by_date(self.lock().items(), start, end)
    }

    pub fn grouped_by_date(&self) -> Vec<(String, Vec<HistoryEntry>)> {
        group_by_date(self.lock().items())
    }

    /// Removes one entry by id; returns whether it existed
    pub fn remove(&self, id: &str) -> Result<bool> {
        self.lock().update(|items| {
            let before = items.len();
            items.retain(|e| e.id != id);
            items.len() != before
        })
    }

    pub fn clear(&self) -> Result<()> {
        self.lock().update(|items| items.clear())?;
        info!("History cleared");
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, JsonStore<HistoryEntry>> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}
