//! Filesystem bridge: list, read, write, mkdir and delete, each routed
//! through the [`PathSandbox`] before any I/O happens.
//!
//! None of these operations is transactional: a crash in the middle of
//! `write` leaves a partially written file behind.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::sandbox::PathSandbox;

/// One directory entry returned by `fs-list`
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileSystemEntry {
    pub name: String,
    pub is_directory: bool,
}

pub struct FsBridge {
    sandbox: PathSandbox,
}

impl FsBridge {
    pub fn new(sandbox: PathSandbox) -> Self {
        Self { sandbox }
    }

    pub fn sandbox(&self) -> &PathSandbox {
        &self.sandbox
    }

    /// Lists a directory, sorted by name
    pub async fn list(&self, rel: &str) -> GatewayResult<Vec<FileSystemEntry>> {
        let path = self.sandbox.resolve(rel)?;
        let mut dir = tokio::fs::read_dir(&path).await?;
        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let is_directory = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            entries.push(FileSystemEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_directory,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        debug!("Listed {} ({} entries)", path.display(), entries.len());
        Ok(entries)
    }

    /// Reads a file as text. Invalid UTF-8 is replaced, not rejected.
    pub async fn read(&self, rel: &str) -> GatewayResult<String> {
        let path = self.sandbox.resolve(rel)?;
        let bytes = tokio::fs::read(&path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Writes a file, creating missing parent directories
    pub async fn write(&self, rel: &str, content: &str) -> GatewayResult<()> {
        let path = self.sandbox.resolve(rel)?;
        if self.sandbox.is_root(&path) {
            return Err(GatewayError::InvalidRequest(
                "cannot write to the sandbox root".to_string(),
            ));
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        info!("Wrote {} bytes to {}", content.len(), path.display());
        Ok(())
    }

    pub async fn mkdir(&self, rel: &str) -> GatewayResult<()> {
        let path = self.sandbox.resolve(rel)?;
        tokio::fs::create_dir_all(&path).await?;
        info!("Created directory {}", path.display());
        Ok(())
    }

    /// Deletes a file or a whole directory tree. There is no undo.
    pub async fn delete(&self, rel: &str) -> GatewayResult<()> {
        let path = self.sandbox.resolve(rel)?;
        if self.sandbox.is_root(&path) {
            warn!("Refusing to delete the sandbox root");
            return Err(GatewayError::AccessDenied);
        }
        let meta = tokio::fs::symlink_metadata(&path).await?;
        if meta.is_dir() {
            tokio::fs::remove_dir_all(&path).await?;
        } else {
            tokio::fs::remove_file(&path).await?;
        }
        info!("Deleted {}", path.display());
        Ok(())
    }
}
