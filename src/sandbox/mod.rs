//! Path sandbox: every filesystem path the renderer sends is resolved
//! against a fixed root, and anything that lands outside it is rejected.
//!
//! Resolution is purely lexical:
//!
//! 1. `\` separators are normalized to `/`
//! 2. the input is joined onto the root (absolute inputs are taken as-is)
//! 3. `.` and `..` segments are folded
//! 4. the result must have the root as a component-wise prefix
//!
//! Symlinks are not followed. A link inside the root that points outside
//! it will pass the check; see DESIGN.md.
use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::error::{GatewayError, GatewayResult};

#[derive(Debug, Clone)]
pub struct PathSandbox {
    root: PathBuf,
}

impl PathSandbox {
    /// Creates a sandbox rooted at `root`, which must exist.
    /// The root is canonicalized once so the prefix check compares like with like.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = std::fs::canonicalize(root.as_ref())?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a renderer-supplied path to an absolute path under the root.
    pub fn resolve(&self, relative: &str) -> GatewayResult<PathBuf> {
        if relative.contains('\0') {
            return Err(GatewayError::InvalidRequest(
                "path contains null byte".to_string(),
            ));
        }

        let normalized = relative.replace('\\', "/");
        let candidate = Path::new(&normalized);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        };

        let resolved = normalize_lexically(&joined);
        if !resolved.starts_with(&self.root) {
            warn!("Sandbox rejected path {relative:?} (resolved to {})", resolved.display());
            return Err(GatewayError::AccessDenied);
        }

        Ok(resolved)
    }

    /// True when `path` is the sandbox root itself
    pub fn is_root(&self, path: &Path) -> bool {
        path == self.root
    }
}

/// Folds `.` and `..` without touching the filesystem.
/// `..` at the filesystem root stays at the root.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(c) => out.push(c),
        }
    }
    out
}
