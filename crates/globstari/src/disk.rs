//! Host-filesystem adapter.

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use tokio::fs;

use crate::{Entry, Error, FileTree, Result};

/// A [`FileTree`] backed by the host filesystem.
///
/// Paths use `/` separators. `canonicalize` resolves symlinks and
/// `.`/`..`; directory entries that are neither regular files nor
/// directories (sockets, devices, symlinks) are skipped. Listings are
/// sorted by name for deterministic traversal order.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskTree;

impl DiskTree {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileTree for DiskTree {
    async fn read_dir(&self, dir: &Utf8Path) -> Result<Vec<Entry>> {
        let mut reader = fs::read_dir(dir.as_std_path())
            .await
            .map_err(|e| Error::io(dir, e))?;

        let mut entries = Vec::new();
        while let Some(dirent) = reader.next_entry().await.map_err(|e| Error::io(dir, e))? {
            let os_name = dirent.file_name();
            let Some(name) = os_name.to_str() else {
                tracing::debug!(name = ?os_name, %dir, "skipping entry with non-UTF-8 name");
                continue;
            };
            let path = dir.join(name);

            let file_type = dirent
                .file_type()
                .await
                .map_err(|e| Error::io(&path, e))?;
            if file_type.is_file() {
                entries.push(Entry::file(path));
            } else if file_type.is_dir() {
                entries.push(Entry::dir(path));
            } else {
                tracing::trace!(%path, "skipping special entry");
            }
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn read_file(&self, path: &Utf8Path) -> Result<Vec<u8>> {
        fs::read(path.as_std_path())
            .await
            .map_err(|e| Error::io(path, e))
    }

    async fn canonicalize(&self, path: &Utf8Path) -> Result<Option<Utf8PathBuf>> {
        match fs::canonicalize(path.as_std_path()).await {
            Ok(resolved) => Utf8PathBuf::from_path_buf(resolved).map(Some).map_err(|p| {
                Error::InvalidInput(format!("canonical path is not UTF-8: {}", p.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntryKind;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> Utf8PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let base = Utf8PathBuf::from_path_buf(std::env::temp_dir()).unwrap();
        base.join(format!("globstari-test-{}-{}", std::process::id(), id))
    }

    async fn setup() -> Utf8PathBuf {
        let dir = temp_dir();
        let _ = fs::remove_dir_all(dir.as_std_path()).await;
        fs::create_dir_all(dir.as_std_path()).await.unwrap();
        dir
    }

    async fn cleanup(dir: &Utf8Path) {
        let _ = fs::remove_dir_all(dir.as_std_path()).await;
    }

    #[tokio::test]
    async fn listing_sorted_with_kinds() {
        let dir = setup().await;
        fs::write(dir.join("b.txt").as_std_path(), b"b").await.unwrap();
        fs::write(dir.join("a.txt").as_std_path(), b"a").await.unwrap();
        fs::create_dir(dir.join("sub").as_std_path()).await.unwrap();

        let tree = DiskTree::new();
        let canon = tree.canonicalize(&dir).await.unwrap().unwrap();
        let entries = tree.read_dir(&canon).await.unwrap();

        let names: Vec<_> = entries
            .iter()
            .map(|e| e.path.file_name().unwrap())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "sub"]);
        assert_eq!(entries[0].kind, EntryKind::File);
        assert_eq!(entries[2].kind, EntryKind::Directory);

        cleanup(&dir).await;
    }

    #[tokio::test]
    async fn canonicalize_missing_is_none() {
        let dir = setup().await;
        let tree = DiskTree::new();

        assert!(tree
            .canonicalize(&dir.join("missing"))
            .await
            .unwrap()
            .is_none());

        cleanup(&dir).await;
    }

    #[tokio::test]
    async fn canonicalize_resolves_dots() {
        let dir = setup().await;
        fs::create_dir(dir.join("sub").as_std_path()).await.unwrap();
        fs::write(dir.join("f.txt").as_std_path(), b"x").await.unwrap();

        let tree = DiskTree::new();
        let direct = tree.canonicalize(&dir.join("f.txt")).await.unwrap().unwrap();
        let dotted = tree
            .canonicalize(&dir.join("sub/../f.txt"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(direct, dotted);

        cleanup(&dir).await;
    }

    #[tokio::test]
    async fn read_dir_failure_is_io() {
        let tree = DiskTree::new();
        let result = tree.read_dir(Utf8Path::new("/definitely/not/a/dir")).await;
        assert!(matches!(result, Err(Error::Io { .. })));
    }
}
