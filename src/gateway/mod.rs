//! The gateway context: every privileged component, built once at startup
//! and shared by all request handlers.

pub mod dispatch;
pub mod fetch;
pub mod fs;
pub mod native;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::llm::AiQueryBridge;
use crate::process::{ProcessRunner, TicketStore};
use crate::sandbox::PathSandbox;
use crate::store::{BookmarkStore, DownloadTracker, HistoryStore, ProfileStore};

pub use fetch::UrlFetcher;
pub use fs::FsBridge;

pub struct Gateway {
    pub config: Config,
    pub fs: FsBridge,
    pub runner: ProcessRunner,
    pub ai: AiQueryBridge,
    pub fetcher: UrlFetcher,
    pub downloads: DownloadTracker,
    pub history: HistoryStore,
    pub bookmarks: BookmarkStore,
    pub profiles: ProfileStore,
}

impl Gateway {
    /// Builds the context. The sandbox root must exist; it is canonicalized
    /// once here and never changes afterwards.
    pub fn new(config: Config) -> Result<Self> {
        let sandbox = PathSandbox::new(&config.gateway.root).with_context(|| {
            format!("sandbox root {} is not accessible", config.gateway.root.display())
        })?;
        info!("Sandbox root: {}", sandbox.root().display());

        let tickets = TicketStore::new(Duration::from_secs(config.gateway.ticket_ttl_secs));
        let runner = ProcessRunner::new(
            sandbox.root().to_path_buf(),
            tickets,
            config.gateway.max_output_bytes,
        );

        let data_dir = &config.storage.data_dir;
        let max_entries = config.storage.max_entries;
        info!("Data directory: {}", data_dir.display());

        Ok(Self {
            fs: FsBridge::new(sandbox),
            runner,
            ai: AiQueryBridge::new(config.ai.clone()),
            fetcher: UrlFetcher::new(),
            downloads: DownloadTracker::open(&data_dir.join("downloads.json"), max_entries),
            history: HistoryStore::open(&data_dir.join("history.json"), max_entries),
            bookmarks: BookmarkStore::open(&data_dir.join("bookmarks.json")),
            profiles: ProfileStore::open(&data_dir.join("profiles.json")),
            config,
        })
    }

    pub fn root(&self) -> &Path {
        self.fs.sandbox().root()
    }
}
