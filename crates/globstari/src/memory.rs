//! In-memory file tree.
//!
//! Used for tests and for traversing virtual hierarchies that never touch
//! disk. All data is ephemeral and lost on drop.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use tokio::sync::RwLock;

use crate::{Entry, Error, FileTree, Result};

/// An in-memory [`FileTree`].
///
/// Thread-safe via internal locks. Parent directories are created
/// implicitly; listings are sorted by name, so traversal order is
/// deterministic.
///
/// # Examples
/// ```ignore
/// let tree = MemoryTree::new();
/// tree.add_file("/src/main.rs", "fn main() {}").await;
/// tree.add_dir("/docs").await;
/// ```
#[derive(Debug)]
pub struct MemoryTree {
    files: RwLock<BTreeMap<Utf8PathBuf, Vec<u8>>>,
    dirs: RwLock<BTreeSet<Utf8PathBuf>>,
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTree {
    /// Create an empty tree containing only the root directory `/`.
    pub fn new() -> Self {
        let mut dirs = BTreeSet::new();
        dirs.insert(Utf8PathBuf::from("/"));
        Self {
            files: RwLock::new(BTreeMap::new()),
            dirs: RwLock::new(dirs),
        }
    }

    /// Normalize a path: make it absolute and resolve `.` and `..`.
    fn normalize(path: &Utf8Path) -> Utf8PathBuf {
        let mut out = Utf8PathBuf::from("/");
        for component in path.components() {
            match component {
                Utf8Component::RootDir | Utf8Component::CurDir => {}
                Utf8Component::ParentDir => {
                    out.pop();
                }
                Utf8Component::Normal(name) => out.push(name),
                Utf8Component::Prefix(_) => {}
            }
        }
        out
    }

    /// Add a file, creating parent directories as needed.
    pub async fn add_file(&self, path: impl AsRef<Utf8Path>, contents: impl AsRef<[u8]>) {
        let path = Self::normalize(path.as_ref());
        if let Some(parent) = path.parent() {
            self.ensure_dirs(parent).await;
        }
        self.files
            .write()
            .await
            .insert(path, contents.as_ref().to_vec());
    }

    /// Add a directory (and its parents).
    pub async fn add_dir(&self, path: impl AsRef<Utf8Path>) {
        self.ensure_dirs(&Self::normalize(path.as_ref())).await;
    }

    async fn ensure_dirs(&self, path: &Utf8Path) {
        let mut dirs = self.dirs.write().await;
        let mut current = path;
        loop {
            dirs.insert(current.to_path_buf());
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
    }
}

#[async_trait]
impl FileTree for MemoryTree {
    async fn read_dir(&self, dir: &Utf8Path) -> Result<Vec<Entry>> {
        let dirs = self.dirs.read().await;
        if !dirs.contains(dir) {
            return Err(Error::io(
                dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory"),
            ));
        }

        let files = self.files.read().await;
        let mut entries: Vec<Entry> = Vec::new();

        for path in files.keys() {
            if path.parent() == Some(dir) {
                entries.push(Entry::file(path.clone()));
            }
        }
        for path in dirs.iter() {
            if path.as_path() != dir && path.parent() == Some(dir) {
                entries.push(Entry::dir(path.clone()));
            }
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn read_file(&self, path: &Utf8Path) -> Result<Vec<u8>> {
        let files = self.files.read().await;
        files.get(&Self::normalize(path)).cloned().ok_or_else(|| {
            Error::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            )
        })
    }

    async fn canonicalize(&self, path: &Utf8Path) -> Result<Option<Utf8PathBuf>> {
        let normalized = Self::normalize(path);
        let exists = self.dirs.read().await.contains(&normalized)
            || self.files.read().await.contains_key(&normalized);
        Ok(exists.then_some(normalized))
    }
}
