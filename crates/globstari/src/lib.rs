//! globstari: glob + globstar + ignores.
//!
//! Selective hierarchical traversal of a tree of named entries (typically
//! files and directories). Provides:
//! - **GlobSet**: a finalized set of EditorConfig-style globs, including
//!   brace alternation and `{n..m}` numeric ranges
//! - **Matcher**: layered include/exclude glob sets with delegation,
//!   answering included / excluded / unknown
//! - **Traverser** / [`globstari`]: breadth-first walk over a [`FileTree`],
//!   honouring `.eignore` files inherited from ancestor directories
//! - **DiskTree** / **MemoryTree**: adapters for the host filesystem and
//!   for in-memory trees
//!
//! The walk is generic over [`FileTree`], a minimal read-only hierarchy
//! trait. Consumers implement `FileTree` to traverse anything that looks
//! like a directory tree, and [`ProcessEntry`] to receive matches.
//!
//! Path entries are separated by `/` (forward slash) on all platforms.

pub mod disk;
pub mod glob;
mod ignore;
pub mod matcher;
pub mod memory;
pub mod walker;

pub use disk::DiskTree;
pub use glob::GlobSet;
pub use matcher::{Matcher, PathCheck, Polarity};
pub use memory::MemoryTree;
pub use walker::{globstari, Traverser};

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// Errors from glob compilation, matching, and traversal.
#[derive(Debug, Error)]
pub enum Error {
    /// A caller-supplied value was unusable (empty glob, empty needle,
    /// relative path where an absolute one is required, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation was called in the wrong lifecycle state, e.g.
    /// querying a set before `finalize()` or adding to one after.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// A glob compiled into a regex the engine rejected.
    #[error("glob compilation failed: {0}")]
    Compile(#[from] regex::Error),

    /// An adapter operation failed.
    #[error("io error at {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An error raised by a [`ProcessEntry`] implementation, passed
    /// through unchanged.
    #[error(transparent)]
    Client(#[from] anyhow::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// What kind of node an [`Entry`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A leaf; never descended into.
    File,
    /// A node the traversal may descend into.
    Directory,
}

/// A single node found during traversal.
///
/// Adapters may attach opaque per-entry data via `userdata`; the traversal
/// carries it through untouched.
#[derive(Clone)]
pub struct Entry {
    pub kind: EntryKind,
    /// Canonical path of this entry.
    pub path: Utf8PathBuf,
    /// Distance from the traversal root; the root itself is 0. Adapters
    /// may leave this 0; the traverser overwrites it while descending.
    pub depth: usize,
    /// Opaque adapter data, never inspected by the traversal.
    pub userdata: Option<Arc<dyn Any + Send + Sync>>,
}

impl Entry {
    /// A file entry at depth 0 with no userdata.
    pub fn file(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            kind: EntryKind::File,
            path: path.into(),
            depth: 0,
            userdata: None,
        }
    }

    /// A directory entry at depth 0 with no userdata.
    pub fn dir(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            kind: EntryKind::Directory,
            path: path.into(),
            depth: 0,
            userdata: None,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("kind", &self.kind)
            .field("path", &self.path)
            .field("depth", &self.depth)
            .field("userdata", &self.userdata.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Abstract read-only access to a named hierarchy.
///
/// Implement this to let [`Traverser`] walk anything tree-shaped: the real
/// filesystem ([`DiskTree`]), an in-memory tree ([`MemoryTree`]), an
/// archive, a remote store. All paths handed to the trait are canonical
/// unless noted otherwise.
#[async_trait]
pub trait FileTree: Send + Sync {
    /// List the children of a directory, excluding `.` and `..`.
    ///
    /// The `depth` field of returned entries may be left 0; the traverser
    /// assigns it. Must not return the directory itself or its parent.
    async fn read_dir(&self, dir: &Utf8Path) -> Result<Vec<Entry>>;

    /// Read the full contents of a file.
    ///
    /// Used for loading ignore files. Any error means "unreadable" and, in
    /// that context, the candidate is skipped.
    async fn read_file(&self, path: &Utf8Path) -> Result<Vec<u8>>;

    /// Canonicalize a path: absolute, `/`-separated, no `.` or `..`,
    /// symlinks resolved where the hierarchy has them.
    ///
    /// Returns `Ok(None)` when the path does not exist. Other failures
    /// propagate.
    async fn canonicalize(&self, path: &Utf8Path) -> Result<Option<Utf8PathBuf>>;

    /// Ignore-file candidates for a directory.
    ///
    /// Relative entries are resolved against the directory; absolute
    /// entries are used verbatim.
    fn ignores_for(&self, dir: &Utf8Path) -> Vec<Utf8PathBuf> {
        let _ = dir;
        vec![Utf8PathBuf::from(".eignore")]
    }

    /// The entry value for the starting directory of a traversal.
    fn root_entry(&self, canonical: &Utf8Path) -> Entry {
        Entry::dir(canonical)
    }
}

/// What a [`ProcessEntry`] tells the traversal to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep going; descend if the entry is a directory.
    Continue,
    /// For a directory, do not descend into it. For a file, same as
    /// `Continue`.
    Skip,
    /// Do not process any more entries at all.
    Stop,
}

/// Receiver for matched entries.
///
/// The traverser preserves call order across dequeues; the relative order
/// of siblings follows the adapter's `read_dir`. Errors propagate out of
/// the traversal unchanged.
#[async_trait]
pub trait ProcessEntry: Send {
    async fn process(&mut self, entry: &Entry) -> Result<Flow>;
}

/// Plain closures work as processors when no state or fallibility is
/// needed.
#[async_trait]
impl<F> ProcessEntry for F
where
    F: FnMut(&Entry) -> Flow + Send,
{
    async fn process(&mut self, entry: &Entry) -> Result<Flow> {
        Ok(self(entry))
    }
}
