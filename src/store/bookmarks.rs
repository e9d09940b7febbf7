//! Bookmarks, keyed by URL.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{new_entry_id, now_millis, JsonStore};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookmarkEntry {
    pub id: String,
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    pub timestamp: i64,
}

pub struct BookmarkStore {
    store: Mutex<JsonStore<BookmarkEntry>>,
}

impl BookmarkStore {
    pub fn open(path: &Path) -> Self {
        Self {
            store: Mutex::new(JsonStore::open(path)),
        }
    }

    /// Adds the page if absent, removes it if present.
    /// Returns true when the page is bookmarked afterwards.
    pub fn toggle(&self, url: &str, title: &str, favicon: Option<String>) -> Result<bool> {
        let entry = BookmarkEntry {
            id: new_entry_id(),
            url: url.to_string(),
            title: if title.is_empty() { url.to_string() } else { title.to_string() },
            favicon,
            timestamp: now_millis(),
        };
        let added = self.lock().update(move |items| {
            let before = items.len();
            items.retain(|b| b.url != entry.url);
            if items.len() == before {
                items.insert(0, entry);
                true
            } else {
                false
            }
        })?;
        info!("Bookmark {} {url}", if added { "added" } else { "removed" });
        Ok(added)
    }

    /// Removes the bookmark for `url`; returns whether one existed
    pub fn remove(&self, url: &str) -> Result<bool> {
        self.lock().update(|items| {
            let before = items.len();
            items.retain(|b| b.url != url);
            items.len() != before
        })
    }

    pub fn list(&self) -> Vec<BookmarkEntry> {
        self.lock().items().to_vec()
    }

    pub fn is_bookmarked(&self, url: &str) -> bool {
        self.lock().items().iter().any(|b| b.url == url)
    }

    fn lock(&self) -> MutexGuard<'_, JsonStore<BookmarkEntry>> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, BookmarkStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = BookmarkStore::open(&dir.path().join("bookmarks.json"));
        (dir, store)
    }

    #[test]
    fn test_toggle_adds_then_removes() {
        let (_dir, b) = store();
        assert!(b.toggle("https://a.com/", "A", None).unwrap());
        assert!(b.is_bookmarked("https://a.com/"));
        assert!(!b.toggle("https://a.com/", "A", None).unwrap());
        assert!(!b.is_bookmarked("https://a.com/"));
        assert!(b.list().is_empty());
    }

    #[test]
    fn test_list_newest_first() {
        let (_dir, b) = store();
        b.toggle("https://a.com/", "A", None).unwrap();
        b.toggle("https://b.com/", "", None).unwrap();
        let list = b.list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].url, "https://b.com/");
        assert_eq!(list[0].title, "https://b.com/");
    }

    #[test]
    fn test_remove_by_url() {
        let (_dir, b) = store();
        b.toggle("https://a.com/", "A", None).unwrap();
        b.toggle("https://b.com/", "B", None).unwrap();
        assert!(b.remove("https://a.com/").unwrap());
        assert!(!b.remove("https://a.com/").unwrap());
        assert_eq!(b.list().len(), 1);
    }

    #[test]
    fn test_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bookmarks.json");
        BookmarkStore::open(&path).toggle("https://a.com/", "A", None).unwrap();
        assert!(BookmarkStore::open(&path).is_bookmarked("https://a.com/"));
    }
}
