//! Ignore-file loading and parsing.
//!
//! Each visited directory may carry ignore files (`.eignore` by default;
//! the [`FileTree`] adapter chooses the candidates). Their patterns are
//! anchored at the directory and compiled into a [`Matcher`] that
//! delegates to the parent directory's matcher, forming a per-branch
//! chain shared between siblings.
//!
//! File format: UTF-8 text, one glob per line. Leading/trailing
//! whitespace is stripped; blank lines and lines starting with `#` are
//! skipped; an unescaped interior `#` starts a trailing comment and `\#`
//! is a literal `#`; a `!` prefix un-ignores.

use std::sync::Arc;

use camino::Utf8Path;

use crate::matcher::Matcher;
use crate::{FileTree, Result};

/// Extract the glob patterns from ignore-file contents.
pub(crate) fn parse_lines(contents: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(contents);
    let mut patterns = Vec::new();

    for line in text.lines() {
        let mut pattern = line.trim();
        if pattern.is_empty() || pattern.starts_with('#') {
            continue;
        }

        let mut prev = '\0';
        for (idx, c) in pattern.char_indices() {
            if idx > 0 && c == '#' && prev != '\\' {
                pattern = pattern[..idx].trim_end();
                break;
            }
            prev = c;
        }

        patterns.push(pattern.to_string());
    }

    patterns
}

/// Build the ignore matcher for one directory, chained to its parent's.
///
/// Missing or unreadable candidates are normal and skipped with a log;
/// canonicalization failures and malformed patterns propagate.
pub(crate) async fn load_for_dir<T: FileTree>(
    tree: &T,
    dir: &Utf8Path,
    parent: Arc<Matcher>,
) -> Result<Arc<Matcher>> {
    let mut matcher = Matcher::with_delegate(parent);

    for candidate in tree.ignores_for(dir) {
        let canonical = if candidate.is_absolute() {
            candidate
        } else {
            match tree.canonicalize(&dir.join(&candidate)).await? {
                Some(path) => path,
                None => {
                    tracing::trace!(%dir, %candidate, "ignore-file candidate does not exist");
                    continue;
                }
            }
        };

        let contents = match tree.read_file(&canonical).await {
            Ok(contents) => contents,
            Err(err) => {
                tracing::debug!(%canonical, %err, "skipping unreadable ignore-file candidate");
                continue;
            }
        };

        for pattern in parse_lines(&contents) {
            matcher.add_anchored(&pattern, dir.as_str())?;
        }
    }

    matcher.finalize()?;
    Ok(Arc::new(matcher))
}
