//! Local user profiles. Saving a profile with a known id replaces it.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{new_entry_id, now_millis, JsonStore};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub created_at: i64,
}

pub struct ProfileStore {
    store: Mutex<JsonStore<Profile>>,
}

impl ProfileStore {
    pub fn open(path: &Path) -> Self {
        Self {
            store: Mutex::new(JsonStore::open(path)),
        }
    }

    /// Inserts or replaces by id. A profile without id gets a fresh one.
    pub fn save(&self, mut profile: Profile) -> Result<Profile> {
        if profile.id.is_empty() {
            profile.id = new_entry_id();
        }
        if profile.created_at == 0 {
            profile.created_at = now_millis();
        }
        let saved = profile.clone();
        let replaced = self.lock().update(move |items| {
            match items.iter().position(|p| p.id == profile.id) {
                Some(index) => {
                    items[index] = profile;
                    true
                }
                None => {
                    items.push(profile);
                    false
                }
            }
        })?;
        info!(
            "Profile {} {}",
            if replaced { "updated" } else { "created" },
            saved.id
        );
        Ok(saved)
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        self.lock().update(|items| {
            let before = items.len();
            items.retain(|p| p.id != id);
            items.len() != before
        })
    }

    pub fn list(&self) -> Vec<Profile> {
        self.lock().items().to_vec()
    }

    fn lock(&self) -> MutexGuard<'_, JsonStore<Profile>> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }
}
