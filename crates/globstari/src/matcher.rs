//! Layered include/exclude matching over glob sets.
//!
//! A [`Matcher`] is built iteratively from any number of glob patterns.
//! Patterns are grouped into [`GlobSet`] layers of uniform [`Polarity`];
//! a polarity change starts a new layer. For example
//!
//! ```text
//! *.bak
//! *.swp
//! !*.foo
//! *.bar
//! ```
//!
//! produces an include layer matching `*.{bak,swp}`, an exclude layer
//! matching `*.foo`, and an include layer matching `*.bar`. Layers are
//! consulted **back to front**, so later patterns override earlier ones:
//! `*.txt` followed by `!*.txt` excludes.

use std::sync::Arc;

use crate::glob::{GlobSet, SPECIAL_CHARS};
use crate::{Error, Result};

/// Polarity of a glob: include, or exclude (`!`-prefixed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Include,
    Exclude,
}

/// The state of a path with respect to a [`Matcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathCheck {
    /// Matched by an include layer.
    Included,
    /// Matched by an exclude layer.
    Excluded,
    /// Not matched by any layer (nor by the delegate, if any).
    Unknown,
}

#[derive(Debug)]
struct Layer {
    set: GlobSet,
    polarity: Polarity,
}

/// Ordered include/exclude glob layers plus an optional delegate.
///
/// When no layer matches a path, the delegate (typically the matcher of a
/// parent directory) is consulted; without one the answer is
/// [`PathCheck::Unknown`].
///
/// Invariant: while the matcher is being built, every layer except the
/// last is finalized; after [`finalize`](Matcher::finalize) all layers
/// are. A matcher is [`ready`](Matcher::ready) iff every layer is
/// finalized; the empty matcher is ready.
///
/// # Examples
/// ```
/// use globstari::{Matcher, PathCheck};
///
/// let mut m = Matcher::new();
/// m.add_anchored("*.txt", "/notes").unwrap();
/// m.add_anchored("!draft.txt", "/notes").unwrap();
/// m.finalize().unwrap();
///
/// assert_eq!(m.check("/notes/a.txt").unwrap(), PathCheck::Included);
/// assert_eq!(m.check("/notes/draft.txt").unwrap(), PathCheck::Excluded);
/// assert_eq!(m.check("/notes/a.bin").unwrap(), PathCheck::Unknown);
/// ```
#[derive(Debug, Default)]
pub struct Matcher {
    layers: Vec<Layer>,
    delegate: Option<Arc<Matcher>>,
}

impl Matcher {
    /// Create an empty matcher with no delegate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty matcher that defers to `delegate` for paths it
    /// does not match itself.
    pub fn with_delegate(delegate: Arc<Matcher>) -> Self {
        Self {
            layers: Vec::new(),
            delegate: Some(delegate),
        }
    }

    /// Build and finalize a matcher from globs anchored at `anchor`.
    pub fn anchored<S: AsRef<str>>(
        globs: impl IntoIterator<Item = S>,
        anchor: &str,
    ) -> Result<Self> {
        let mut matcher = Self::new();
        for glob in globs {
            matcher.add_anchored(glob.as_ref(), anchor)?;
        }
        matcher.finalize()?;
        Ok(matcher)
    }

    /// Add a single glob. A leading `!` marks exclusion.
    pub fn add(&mut self, glob: &str) -> Result<()> {
        if glob.is_empty() {
            return Err(Error::InvalidInput("cannot add an empty glob".into()));
        }

        let (polarity, bare) = match glob.strip_prefix('!') {
            Some(rest) => (Polarity::Exclude, rest),
            None => (Polarity::Include, glob),
        };

        let start_new = self.layers.last().is_none_or(|l| l.polarity != polarity);
        if start_new {
            if let Some(last) = self.layers.last_mut() {
                last.set.finalize()?;
            }
            self.layers.push(Layer {
                set: GlobSet::new(),
                polarity,
            });
        }

        let back = self.layers.len() - 1;
        self.layers[back].set.add(bare)
    }

    /// Add a single glob anchored at a directory.
    ///
    /// `anchor` must be non-empty; a trailing `/` is accepted and
    /// ignored. The combined glob is:
    /// - `anchor/**/glob` when the glob contains no `/` (so `*.txt`
    ///   under `/foo` matches at any depth below `/foo`),
    /// - `anchor` + glob when the glob starts with `/`,
    /// - `anchor/glob` otherwise.
    ///
    /// Glob-special characters in the anchor itself are escaped, so a
    /// directory named `f[o]o` matches literally.
    pub fn add_anchored(&mut self, glob: &str, anchor: impl AsRef<str>) -> Result<()> {
        let anchor = anchor.as_ref();
        if glob.is_empty() {
            return Err(Error::InvalidInput("cannot add an empty glob".into()));
        }
        if anchor.is_empty() {
            return Err(Error::InvalidInput(
                "anchor path must be non-empty".into(),
            ));
        }
        let anchor = anchor.strip_suffix('/').unwrap_or(anchor);

        let (negated, bare) = match glob.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, glob),
        };

        let mut full = String::with_capacity(anchor.len() + glob.len() + 5);
        if negated {
            full.push('!');
        }
        for c in anchor.chars() {
            if SPECIAL_CHARS.contains(c) {
                full.push('\\');
            }
            full.push(c);
        }
        if !bare.contains('/') {
            full.push_str("/**/");
        } else if !bare.starts_with('/') {
            full.push('/');
        }
        full.push_str(bare);

        tracing::trace!(glob, anchor, full = %full, "anchored glob");
        self.add(&full)
    }

    /// Finalize the last layer. Call once all globs have been added.
    pub fn finalize(&mut self) -> Result<()> {
        if let Some(last) = self.layers.last_mut() {
            last.set.finalize()?;
        }
        Ok(())
    }

    /// Whether [`check`](Matcher::check) may be called.
    pub fn ready(&self) -> bool {
        self.layers.last().is_none_or(|l| l.set.finalized())
    }

    /// Whether the matcher holds no layers of its own.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// True iff [`check`](Matcher::check) yields [`PathCheck::Included`].
    pub fn contains(&self, path: &str) -> Result<bool> {
        Ok(self.check(path)? == PathCheck::Included)
    }

    /// Check whether `path` is included, excluded, or unknown.
    ///
    /// `path` must be empty (always `Unknown`) or absolute; a relative
    /// path fails with `InvalidInput`, and an un-finalized matcher with
    /// `InvalidState`. Layers are consulted back to front; the first
    /// matching layer decides. When nothing matches, the delegate (if
    /// any) is consulted.
    pub fn check(&self, path: &str) -> Result<PathCheck> {
        if !self.ready() {
            return Err(Error::InvalidState(
                "matcher is not ready; call finalize() after adding globs",
            ));
        }
        if path.is_empty() {
            return Ok(PathCheck::Unknown);
        }
        if !path.starts_with('/') {
            return Err(Error::InvalidInput(format!(
                "path must be absolute (start with /): {path}"
            )));
        }

        for layer in self.layers.iter().rev() {
            if layer.set.contains(path)? {
                return Ok(match layer.polarity {
                    Polarity::Include => PathCheck::Included,
                    Polarity::Exclude => PathCheck::Excluded,
                });
            }
        }

        match &self.delegate {
            Some(delegate) => delegate.check(path),
            None => Ok(PathCheck::Unknown),
        }
    }
}
