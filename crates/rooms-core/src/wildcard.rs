//! Room-name pattern matching capability.
//!
//! Names are split into `.`-separated segments. A pattern segment of `*`
//! matches any single segment; a `*` inside a segment matches any run of
//! characters within that segment.

/// Matches room names against patterns
pub trait WildcardMatcher: Send + Sync {
    /// Whether `name` matches `pattern`
    fn matches(&self, pattern: &str, name: &str) -> bool;

    /// Names from `names` that match `pattern`, in input order
    fn filter(&self, pattern: &str, names: &[String]) -> Vec<String> {
        names
            .iter()
            .filter(|name| self.matches(pattern, name))
            .cloned()
            .collect()
    }
}

/// Segment-based matcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentWildcard {
    separator: char,
}

impl SegmentWildcard {
    #[must_use]
    pub fn new(separator: char) -> Self {
        Self { separator }
    }
}

impl Default for SegmentWildcard {
    fn default() -> Self {
        Self::new('.')
    }
}

impl WildcardMatcher for SegmentWildcard {
    fn matches(&self, pattern: &str, name: &str) -> bool {
        let mut patterns = pattern.split(self.separator);
        let mut names = name.split(self.separator);

        loop {
            match (patterns.next(), names.next()) {
                (None, None) => return true,
                (Some(p), Some(n)) => {
                    if !segment_matches(p, n) {
                        return false;
                    }
                }
                _ => return false,
            }
        }
    }
}

/// Glob match of a single segment where `*` is the only metacharacter
fn segment_matches(pattern: &str, segment: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == segment;
    }

    let first = parts[0];
    let last = parts[parts.len() - 1];
    if !segment.starts_with(first) || segment.len() < first.len() + last.len() {
        return false;
    }

    let mut rest = &segment[first.len()..];
    for middle in &parts[1..parts.len() - 1] {
        match rest.find(middle) {
            Some(idx) => rest = &rest[idx + middle.len()..],
            None => return false,
        }
    }

    rest.ends_with(last)
}
