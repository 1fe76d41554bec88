//! EditorConfig-style glob compilation and glob sets.
//!
//! Implements the [EditorConfig](https://editorconfig.org) glob dialect:
//! - `?` matches exactly one non-`/` character
//! - `*` matches zero or more non-`/` characters
//! - `**` matches zero or more characters, including `/`
//! - `/**/` matches one or more path components
//! - `[abc]`, `[a-z]`, `[!abc]` character classes; a `/` inside a bracket
//!   turns the whole token into a literal
//! - `{a,b,c}` alternation, nesting allowed; unpaired braces are literal
//! - `{n..m}` numeric range (integers, optional sign); candidates with a
//!   leading zero never match
//! - `\X` matches the literal character `X`
//!
//! Each glob compiles to a regex fragment plus a list of numeric-range
//! constraints; a [`GlobSet`] combines many globs into one queryable unit.

use std::collections::{BTreeSet, HashSet};

use regex::Regex;

use crate::{Error, Result};

/// Characters that are special in globs, escaped when a literal path is
/// spliced into a glob (see `Matcher::add_anchored`).
pub(crate) const SPECIAL_CHARS: &str = "?[]\\*-{},";

/// An inclusive numeric range attached to a `{n..m}` capture group.
pub(crate) type RangePair = (i64, i64);

/// Append `c` to `src` as a literal, escaping it when the regex engine
/// would otherwise give it meaning.
fn push_literal(src: &mut String, c: char) {
    if c.is_ascii_punctuation() {
        src.push('\\');
    }
    src.push(c);
}

/// Parse a `{n..m}` token into its bounds, or `None` if the token is not
/// a numeric range (alphabetic "ranges" like `{aa..bb}` stay literal).
fn parse_numeric_range(token: &str) -> Option<RangePair> {
    let inner = token.strip_prefix('{')?.strip_suffix('}')?;
    let (lo, hi) = inner.split_once("..")?;
    let is_int = |s: &str| {
        let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
    };
    if !is_int(lo) || !is_int(hi) {
        return None;
    }
    Some((lo.parse().ok()?, hi.parse().ok()?))
}

/// Translate one glob into a regex fragment, appending any numeric-range
/// constraints to `ranges`. Pure; compilation of the fragment happens in
/// [`GlobSet::finalize`].
fn glob_to_regex_src(glob: &str, ranges: &mut Vec<RangePair>) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let n = chars.len();
    let mut src = String::with_capacity(glob.len() * 2);

    // Whether every `{` has a matching `}` (counting skips `\`-escaped
    // braces). Unpaired braces are emitted as literals.
    let braces_paired = {
        let mut left = 0usize;
        let mut right = 0usize;
        let mut paired = true;
        let mut i = 0;
        while i < n {
            match chars[i] {
                '\\' if i + 1 < n => i += 1,
                '{' => left += 1,
                '}' => right += 1,
                _ => {}
            }
            if right > left {
                paired = false;
                break;
            }
            i += 1;
        }
        paired && left == right
    };

    // Positions that must be emitted as escaped literals regardless of
    // their usual handling: the `}` of a non-numeric `{single}` token.
    let mut force_escape: HashSet<usize> = HashSet::new();

    let mut in_bracket = false;
    let mut brace_level = 0usize;
    let mut i = 0;

    while i < n {
        let c = chars[i];

        if force_escape.contains(&i) {
            src.push('\\');
            src.push(c);
            i += 1;
            continue;
        }

        match c {
            '\\' => {
                if i + 1 < n {
                    push_literal(&mut src, chars[i + 1]);
                    i += 1;
                } else {
                    // trailing backslash matches itself
                    src.push_str("\\\\");
                }
            }

            '?' => src.push_str("[^/]"),

            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    src.push_str(".*");
                    i += 1;
                } else {
                    src.push_str("[^/]*");
                }
            }

            '[' if in_bracket => src.push_str("\\["),

            '[' => {
                // Find the closing bracket, noting unescaped slashes.
                let mut close = None;
                let mut has_slash = false;
                let mut j = i + 1;
                while j < n {
                    match chars[j] {
                        '\\' if j + 1 < n => j += 2,
                        ']' => {
                            close = Some(j);
                            break;
                        }
                        '/' => {
                            has_slash = true;
                            j += 1;
                        }
                        _ => j += 1,
                    }
                }

                match close {
                    Some(_) if !has_slash => {
                        in_bracket = true;
                        if chars.get(i + 1) == Some(&'!') {
                            src.push_str("[^");
                            i += 1;
                        } else {
                            src.push('[');
                        }
                    }
                    _ => {
                        // A slash inside the brackets, or no closing
                        // bracket at all: the whole token is literal.
                        src.push_str("\\[");
                        let end = close.unwrap_or(n);
                        let mut k = i + 1;
                        while k < end {
                            if chars[k] == '\\' && k + 1 < end {
                                push_literal(&mut src, chars[k + 1]);
                                k += 2;
                            } else {
                                push_literal(&mut src, chars[k]);
                                k += 1;
                            }
                        }
                        if close.is_some() {
                            src.push_str("\\]");
                        }
                        i = end;
                    }
                }
            }

            ']' => {
                if in_bracket {
                    in_bracket = false;
                    src.push(']');
                } else {
                    src.push_str("\\]");
                }
            }

            '-' => {
                if in_bracket {
                    src.push('-');
                } else {
                    src.push_str("\\-");
                }
            }

            '{' if !braces_paired => src.push_str("\\{"),

            '{' => {
                // A `{...}` block with no top-level comma is "single":
                // either a numeric range or a pair of literal braces.
                let mut close = None;
                let mut single = true;
                let mut j = i + 1;
                while j < n {
                    match chars[j] {
                        '\\' if j + 1 < n => j += 2,
                        '}' => {
                            close = Some(j);
                            break;
                        }
                        ',' => {
                            single = false;
                            break;
                        }
                        _ => j += 1,
                    }
                }

                match close {
                    Some(close) if single => {
                        let token: String = chars[i..=close].iter().collect();
                        if let Some(pair) = parse_numeric_range(&token) {
                            ranges.push(pair);
                            src.push_str("([+-]?\\d+)");
                            i = close;
                        } else {
                            src.push_str("\\{");
                            force_escape.insert(close);
                        }
                    }
                    _ => {
                        brace_level += 1;
                        src.push_str("(?:");
                    }
                }
            }

            '}' => {
                if !braces_paired {
                    src.push_str("\\}");
                } else {
                    brace_level = brace_level.saturating_sub(1);
                    src.push(')');
                }
            }

            ',' => {
                if brace_level > 0 {
                    src.push('|');
                } else {
                    src.push_str("\\,");
                }
            }

            '/' => {
                // `/**/` matches a single `/` or `/anything/`. The group
                // is non-capturing so numeric-range capture indices stay
                // aligned with `ranges`.
                if chars[i..].starts_with(&['/', '*', '*', '/']) {
                    src.push_str("(?:/|/.*/)");
                    i += 3;
                } else {
                    src.push('/');
                }
            }

            _ => push_literal(&mut src, c),
        }

        i += 1;
    }

    src
}

/// One compiled matching unit: a regex plus the numeric ranges its capture
/// groups must satisfy.
#[derive(Debug)]
struct Criterion {
    regex: Regex,
    ranges: Vec<RangePair>,
}

impl Criterion {
    fn accepts(&self, path: &str) -> bool {
        if self.ranges.is_empty() {
            return self.regex.is_match(path);
        }

        let Some(caps) = self.regex.captures(path) else {
            return false;
        };

        for (idx, (lo, hi)) in self.ranges.iter().enumerate() {
            let Some(m) = caps.get(idx + 1) else {
                // this capture group was not part of the match
                continue;
            };
            let text = m.as_str();
            // Leading-zero numbers such as 010 are not considered matched.
            if text.starts_with('0') {
                return false;
            }
            let Ok(num) = text.parse::<i64>() else {
                return false;
            };
            if num < *lo || num > *hi {
                return false;
            }
        }

        true
    }
}

/// A set of globs, compiled together and queried as one.
///
/// - Each glob must match the entire string: `*.txt` matches `foo.txt`
///   but not `foo/bar.txt`.
/// - Dot files are not special: `*foo` matches both `foo` and `.foo`.
/// - No glob set matches the empty string.
///
/// A set is *open* (accepting [`add`](GlobSet::add)) until
/// [`finalize`](GlobSet::finalize) compiles it; only a finalized set can
/// answer [`contains`](GlobSet::contains). The transition is one-way.
///
/// # Examples
/// ```
/// use globstari::GlobSet;
///
/// let mut set = GlobSet::new();
/// set.add("*.{txt,md}").unwrap();
/// set.add("{1..10}").unwrap();
/// set.finalize().unwrap();
///
/// assert!(set.contains("notes.md").unwrap());
/// assert!(set.contains("7").unwrap());
/// assert!(!set.contains("11").unwrap());
/// ```
#[derive(Debug, Default)]
pub struct GlobSet {
    globs: BTreeSet<String>,
    criteria: Vec<Criterion>,
    finalized: bool,
}

impl GlobSet {
    /// Create an empty, open glob set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single glob to the set.
    ///
    /// Fails with `InvalidInput` for an empty glob and `InvalidState`
    /// once the set is finalized.
    pub fn add(&mut self, glob: impl Into<String>) -> Result<()> {
        let glob = glob.into();
        if glob.is_empty() {
            return Err(Error::InvalidInput("cannot add an empty glob".into()));
        }
        if self.finalized {
            return Err(Error::InvalidState(
                "glob set already finalized; cannot add more globs",
            ));
        }
        self.globs.insert(glob);
        Ok(())
    }

    /// Compile the set. Finalizing an empty set is not an error; it
    /// yields a set that matches nothing.
    ///
    /// Globs without numeric ranges are merged into a single anchored
    /// alternation. Each glob *with* ranges becomes its own criterion:
    /// they cannot share a regex because every number in the input would
    /// be captured by the first range group, so later alternatives could
    /// never match.
    pub fn finalize(&mut self) -> Result<()> {
        let mut non_range: Vec<String> = Vec::new();
        let mut criteria: Vec<Criterion> = Vec::new();

        for glob in &self.globs {
            let mut ranges = Vec::new();
            let frag = glob_to_regex_src(glob, &mut ranges);
            tracing::trace!(glob = %glob, regex = %frag, ranges = ranges.len(), "compiled glob");

            if ranges.is_empty() {
                non_range.push(frag);
            } else {
                let regex = Regex::new(&format!("^(?:{frag})$"))?;
                criteria.push(Criterion { regex, ranges });
            }
        }

        if !non_range.is_empty() {
            let alternation = non_range
                .iter()
                .map(|f| format!("(?:{f})"))
                .collect::<Vec<_>>()
                .join("|");
            let regex = Regex::new(&format!("^(?:{alternation})$"))?;
            // Check the merged non-range regex first: one pass disposes
            // of the common case.
            criteria.insert(
                0,
                Criterion {
                    regex,
                    ranges: Vec::new(),
                },
            );
        }

        self.criteria = criteria;
        self.finalized = true;
        Ok(())
    }

    /// Whether [`finalize`](GlobSet::finalize) has been called.
    pub fn finalized(&self) -> bool {
        self.finalized
    }

    /// Whether the set holds no globs.
    pub fn is_empty(&self) -> bool {
        self.globs.is_empty()
    }

    /// Returns true if any glob in the set matches `path`.
    ///
    /// The empty path never matches. Relative paths are accepted here;
    /// `Matcher` enforces absoluteness separately. Fails with
    /// `InvalidState` before [`finalize`](GlobSet::finalize).
    pub fn contains(&self, path: &str) -> Result<bool> {
        if !self.finalized {
            return Err(Error::InvalidState("glob set was not finalized"));
        }
        if path.is_empty() {
            return Ok(false);
        }
        Ok(self.criteria.iter().any(|c| c.accepts(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn set_of(globs: &[&str]) -> GlobSet {
        let mut gs = GlobSet::new();
        for g in globs {
            gs.add(*g).unwrap();
        }
        gs.finalize().unwrap();
        gs
    }

    #[test]
    fn empty_set_matches_nothing() {
        let mut gs = GlobSet::new();
        assert!(matches!(gs.contains("foo"), Err(Error::InvalidState(_))));
        gs.finalize().unwrap();
        assert!(!gs.contains("").unwrap());
        assert!(!gs.contains("foo").unwrap());
    }

    #[test]
    fn invalid_adds() {
        let mut gs = GlobSet::new();
        assert!(matches!(gs.add(""), Err(Error::InvalidInput(_))));
        gs.finalize().unwrap();
        assert!(matches!(gs.add("*"), Err(Error::InvalidState(_))));
    }

    #[rstest]
    #[case("foo", true)]
    #[case("dir/foo", false)]
    #[case("fooo", false)]
    #[case("f", false)]
    #[case("oo", false)]
    #[case("", false)]
    #[case("bar", false)]
    fn exact_match(#[case] path: &str, #[case] expected: bool) {
        let gs = set_of(&["foo"]);
        assert_eq!(gs.contains(path).unwrap(), expected);
    }

    #[rstest]
    #[case("foo.txt", true)]
    #[case("fooo.txt", true)]
    #[case(".txt", true)] // '*' can match zero characters
    #[case(".txt.txt", true)]
    #[case("foo/bar.txt", false)] // '*' does not cross '/'
    #[case(".txt.", false)]
    #[case(".txt.bak", false)]
    #[case("foo", false)]
    #[case("", false)]
    fn extension(#[case] path: &str, #[case] expected: bool) {
        let gs = set_of(&["*.txt"]);
        assert_eq!(gs.contains(path).unwrap(), expected);
    }

    #[test]
    fn name_prefix() {
        let gs = set_of(&["file*"]);
        for hit in ["file", "file1", "filez", "file.txt", "file1.txt"] {
            assert!(gs.contains(hit).unwrap(), "{hit}");
        }
        assert!(!gs.contains(".file").unwrap());
        assert!(!gs.contains("").unwrap());
    }

    #[test]
    fn question_single_non_slash() {
        let gs = set_of(&["fo?.txt"]);
        assert!(gs.contains("foo.txt").unwrap());
        assert!(!gs.contains("fo.txt").unwrap());
        assert!(!gs.contains("fooo.txt").unwrap());
        assert!(!gs.contains("fo/.txt").unwrap());
    }

    #[rstest]
    #[case('a', true)]
    #[case('b', true)]
    #[case('c', true)]
    #[case('d', false)]
    #[case('e', true)]
    #[case('f', true)]
    #[case('g', true)]
    #[case('h', false)]
    #[case('o', true)]
    #[case('s', true)]
    #[case('t', true)]
    #[case('z', false)]
    fn bracket_classes(#[case] c: char, #[case] expected: bool) {
        let gs = set_of(&["fo[o].txt", "fo[st].txt", "fo[a-c].txt", "fo[ef-g].txt"]);
        assert_eq!(gs.contains(&format!("fo{c}.txt")).unwrap(), expected);
    }

    #[test]
    fn bracket_never_matches_slash() {
        let gs = set_of(&["fo[o].txt"]);
        assert!(!gs.contains("fo/.txt").unwrap());
    }

    #[test]
    fn brace_alternation() {
        let gs = set_of(&["*.{txt,pl}"]);
        assert!(gs.contains(".txt").unwrap());
        assert!(gs.contains("foo.txt").unwrap());
        assert!(gs.contains(".pl").unwrap());
        assert!(gs.contains("foo.pl").unwrap());
        assert!(!gs.contains("foo.txt.bak").unwrap());
    }

    #[rstest]
    #[case("", false)]
    #[case("foo", false)]
    #[case("0", false)]
    #[case("1", true)]
    #[case("10", true)]
    #[case("11", false)]
    #[case("99", false)]
    #[case("100", true)]
    #[case("109", true)]
    #[case("110", false)]
    fn multiple_numeric_ranges(#[case] path: &str, #[case] expected: bool) {
        // Two range globs in one set must be evaluated independently.
        let gs = set_of(&["{1..10}", "{100..109}"]);
        assert_eq!(gs.contains(path).unwrap(), expected);
    }

    #[test]
    fn duplicate_numeric_range() {
        let gs = set_of(&["{1..10}", "{1..10}"]);
        assert!(gs.contains("1").unwrap());
        assert!(gs.contains("10").unwrap());
        assert!(!gs.contains("11").unwrap());
        assert!(!gs.contains("0").unwrap());
    }

    #[test]
    fn signed_numeric_range() {
        let gs = set_of(&["{-5..5}"]);
        assert!(gs.contains("-3").unwrap());
        assert!(gs.contains("+3").unwrap());
        assert!(gs.contains("5").unwrap());
        assert!(!gs.contains("-6").unwrap());
        assert!(!gs.contains("6").unwrap());
        // leading zeros never match
        assert!(!gs.contains("03").unwrap());
    }

    #[test]
    fn range_next_to_text() {
        let gs = set_of(&["log.{1..31}.txt"]);
        assert!(gs.contains("log.7.txt").unwrap());
        assert!(gs.contains("log.31.txt").unwrap());
        assert!(!gs.contains("log.32.txt").unwrap());
        assert!(!gs.contains("log.07.txt").unwrap());
        assert!(!gs.contains("log..txt").unwrap());
    }

    #[test]
    fn globstar_crosses_slashes() {
        let gs = set_of(&["**.txt"]);
        assert!(gs.contains("foo.txt").unwrap());
        assert!(gs.contains(".txt").unwrap());
        assert!(gs.contains("dir/foo.txt").unwrap());
        assert!(!gs.contains(".txt.bak").unwrap());
        assert!(!gs.contains("foo").unwrap());
        assert!(!gs.contains("").unwrap());

        let gs2 = set_of(&["**/*.txt"]);
        assert!(gs2.contains("/foo.txt").unwrap());
        assert!(gs2.contains("/foo/bar.txt").unwrap());
        assert!(gs2.contains("/foo/bar/bat.txt").unwrap());
        assert!(gs2.contains("dir/foo.txt").unwrap());
        assert!(gs2.contains("/.txt").unwrap());
        // a slash is required by the `**/*` form
        assert!(!gs2.contains("fooo.txt").unwrap());
        assert!(!gs2.contains("/foo/bar/bat.txt.old").unwrap());
    }

    #[test]
    fn slash_star_star_slash_is_one_or_more_components() {
        let gs = set_of(&["a/**/b"]);
        assert!(gs.contains("a/b").unwrap());
        assert!(gs.contains("a/x/b").unwrap());
        assert!(gs.contains("a/x/y/b").unwrap());
        assert!(!gs.contains("ab").unwrap());
        assert!(!gs.contains("a/b/c").unwrap());
    }

    #[test]
    fn utf8_globs() {
        let gs = set_of(&["コンニチハ*"]);
        assert!(gs.contains("コンニチハ").unwrap());
        assert!(gs.contains("コンニチハ to you as well!").unwrap());
        assert!(!gs.contains("コンニチ").unwrap());
    }

    #[test]
    fn escapes_are_literal() {
        // `\d` is a literal d, not a digit class
        let gs = set_of(&["\\d.txt"]);
        assert!(gs.contains("d.txt").unwrap());
        assert!(!gs.contains("1.txt").unwrap());

        let gs = set_of(&["a\\*b"]);
        assert!(gs.contains("a*b").unwrap());
        assert!(!gs.contains("axb").unwrap());
    }

    #[test]
    fn unterminated_bracket_is_literal() {
        let gs = set_of(&["ab[cd"]);
        assert!(gs.contains("ab[cd").unwrap());
        assert!(!gs.contains("abc").unwrap());
        assert!(!gs.contains("abd").unwrap());
    }

    #[test]
    fn numeric_token_parsing() {
        assert_eq!(parse_numeric_range("{1..10}"), Some((1, 10)));
        assert_eq!(parse_numeric_range("{-3..+4}"), Some((-3, 4)));
        assert_eq!(parse_numeric_range("{aardvark..antelope}"), None);
        assert_eq!(parse_numeric_range("{1.5..2}"), None);
        assert_eq!(parse_numeric_range("{1..2..3}"), None);
        assert_eq!(parse_numeric_range("{..}"), None);
        assert_eq!(parse_numeric_range("{}"), None);
    }
}
