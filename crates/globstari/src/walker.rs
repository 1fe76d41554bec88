//! Breadth-first traversal over a [`FileTree`] with inherited ignores.
//!
//! The traverser owns a work queue seeded with the canonicalized root.
//! For each dequeued entry it consults the ignore chain inherited from
//! ancestor directories, then the needle matcher, and hands hits to the
//! [`ProcessEntry`] client. Descending into a directory composes that
//! directory's ignore files on top of the inherited ones.
//!
//! Scheduling is single-threaded and cooperative: one adapter call is in
//! flight at a time, and cancellation is expressed by returning
//! [`Flow::Stop`] from the client.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};

use crate::ignore;
use crate::matcher::{Matcher, PathCheck};
use crate::{Entry, Error, FileTree, Flow, ProcessEntry, Result};

/// An entry and the ignore chain it inherited.
///
/// The ignores are never absent: the root starts with an empty matcher.
struct WorkItem {
    entry: Entry,
    ignores: Arc<Matcher>,
}

/// One traversal of a [`FileTree`].
///
/// Construction canonicalizes the base path and compiles the needle;
/// [`run`](Traverser::run) performs the walk. A traverser runs once;
/// build a fresh one per traversal. Most callers want the [`globstari`]
/// convenience function instead.
pub struct Traverser<'a, T: FileTree, P: ProcessEntry> {
    tree: &'a T,
    client: &'a mut P,
    queue: VecDeque<WorkItem>,
    needle: Matcher,
    max_depth: Option<usize>,
    seen: HashSet<Utf8PathBuf>,
    traversed: bool,
}

impl<'a, T: FileTree, P: ProcessEntry> Traverser<'a, T, P> {
    /// Prepare a traversal of `tree` rooted at `base`.
    ///
    /// `needle` is the list of globs to find, anchored at the
    /// canonicalized base; it must be non-empty. `max_depth` of `None`
    /// means unlimited; `Some(0)` processes only the root.
    pub async fn new<S: AsRef<str>>(
        tree: &'a T,
        client: &'a mut P,
        base: &Utf8Path,
        needle: &[S],
        max_depth: Option<usize>,
    ) -> Result<Self> {
        if needle.is_empty() {
            return Err(Error::InvalidInput("needle must not be empty".into()));
        }

        let root = tree
            .canonicalize(base)
            .await?
            .ok_or_else(|| Error::InvalidInput(format!("base path does not exist: {base}")))?;

        let mut matcher = Matcher::new();
        for glob in needle {
            matcher.add_anchored(glob.as_ref(), root.as_str())?;
        }
        matcher.finalize()?;

        let mut root_entry = tree.root_entry(&root);
        root_entry.depth = 0;

        // The root's inherited ignores start out empty, so the root
        // itself is never ignored.
        let mut queue = VecDeque::new();
        queue.push_back(WorkItem {
            entry: root_entry,
            ignores: Arc::new(Matcher::new()),
        });

        Ok(Self {
            tree,
            client,
            queue,
            needle: matcher,
            max_depth,
            seen: HashSet::new(),
            traversed: false,
        })
    }

    /// Run the traversal. Fails with `InvalidState` on a second call.
    pub async fn run(&mut self) -> Result<()> {
        if self.traversed {
            return Err(Error::InvalidState("a traverser can only run once"));
        }
        self.traversed = true;

        while let Some(item) = self.queue.pop_front() {
            let path = item.entry.path.clone();

            if !self.seen.insert(path.clone()) {
                tracing::trace!(%path, "already seen, skipping");
                continue;
            }

            if let Some(max) = self.max_depth {
                if item.entry.depth > max {
                    tracing::trace!(%path, depth = item.entry.depth, "max depth exceeded, skipping");
                    continue;
                }
            }

            // A hit in the inherited ignores means "this entry is ignored".
            if item.ignores.contains(path.as_str())? {
                tracing::trace!(%path, "ignored, skipping");
                continue;
            }

            let verdict = self.needle.check(path.as_str())?;
            tracing::trace!(%path, ?verdict, "needle check");

            match verdict {
                PathCheck::Excluded => continue,

                PathCheck::Included => match self.client.process(&item.entry).await? {
                    Flow::Continue => {
                        if item.entry.is_dir() {
                            self.descend(&item.entry, &item.ignores).await?;
                        }
                    }
                    Flow::Skip => {}
                    Flow::Stop => return Ok(()),
                },

                PathCheck::Unknown => {
                    // A directory not named by the needle may still hold
                    // entries that are; a file may not.
                    if item.entry.is_dir() {
                        self.descend(&item.entry, &item.ignores).await?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Compose the directory's ignore files onto the inherited chain and
    /// enqueue its children.
    async fn descend(&mut self, entry: &Entry, parent_ignores: &Arc<Matcher>) -> Result<()> {
        let ignores =
            ignore::load_for_dir(self.tree, &entry.path, Arc::clone(parent_ignores)).await?;

        let children = self.tree.read_dir(&entry.path).await?;
        for mut child in children {
            child.depth = entry.depth + 1;
            self.queue.push_back(WorkItem {
                entry: child,
                ignores: Arc::clone(&ignores),
            });
        }

        Ok(())
    }
}

/// Find entries under `base` matching `needle`, reporting each hit to
/// `client`.
///
/// `needle` is a non-empty list of EditorConfig-style globs, `!`-prefixed
/// for exclusion, anchored at the canonicalized base. `max_depth` of
/// `None` disables the depth cap; `Some(0)` processes only the root.
///
/// Glob checks run against canonicalized paths, so `**/*` matches
/// everything; dot files are not special. The starting directory itself
/// is checked against the needle like any other entry.
///
/// # Examples
/// ```ignore
/// let mut found = Vec::new();
/// globstari(
///     &DiskTree::new(),
///     &mut |entry: &Entry| {
///         found.push(entry.path.clone());
///         Flow::Continue
///     },
///     Utf8Path::new("/some/project"),
///     &["*.rs", "!target"],
///     None,
/// )
/// .await?;
/// ```
pub async fn globstari<T, P, S>(
    tree: &T,
    client: &mut P,
    base: impl AsRef<Utf8Path>,
    needle: &[S],
    max_depth: Option<usize>,
) -> Result<()>
where
    T: FileTree,
    P: ProcessEntry,
    S: AsRef<str>,
{
    Traverser::new(tree, client, base.as_ref(), needle, max_depth)
        .await?
        .run()
        .await
}
