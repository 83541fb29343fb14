//! Serializable glob patterns for request paths.

use std::fmt;
use std::sync::OnceLock;

use globset::{GlobBuilder, GlobMatcher};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A glob pattern matched against request paths.
///
/// Segments are separated by `/`. A single `*` matches within one segment, `**` matches any
/// number of segments, and `?` matches a single character within a segment.
///
/// The pattern is compiled lazily on first use. Patterns that fail to compile never match, so a
/// broken rule cannot reject valid input.
///
/// ```
/// use evlog_common::PathPattern;
///
/// let pattern = PathPattern::new("/api/*/orders");
/// assert!(pattern.is_match("/api/v1/orders"));
/// assert!(!pattern.is_match("/api/v1/admin/orders"));
///
/// let pattern = PathPattern::new("/api/**");
/// assert!(pattern.is_match("/api/v1/admin/orders"));
/// ```
#[derive(Clone, Default)]
pub struct PathPattern {
    raw: String,
    compiled: OnceLock<Option<GlobMatcher>>,
}

impl PathPattern {
    /// Creates a new pattern from its source string.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            raw: pattern.into(),
            compiled: OnceLock::new(),
        }
    }

    /// Returns the source string of this pattern.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns `true` if the pattern compiles.
    pub fn is_valid(&self) -> bool {
        self.matcher().is_some()
    }

    /// Returns `true` if the pattern matches the given path.
    ///
    /// Empty paths never match.
    pub fn is_match(&self, path: &str) -> bool {
        if path.is_empty() {
            return false;
        }

        match self.matcher() {
            Some(matcher) => matcher.is_match(path),
            None => false,
        }
    }

    fn matcher(&self) -> Option<&GlobMatcher> {
        self.compiled
            .get_or_init(|| compile(&self.raw))
            .as_ref()
    }
}

fn compile(pattern: &str) -> Option<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .backslash_escape(true)
        .build();

    match glob {
        Ok(glob) => Some(glob.compile_matcher()),
        Err(error) => {
            evlog_log::debug!(pattern, %error, "invalid path pattern, rule never matches");
            None
        }
    }
}

impl fmt::Debug for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.raw.fmt(f)
    }
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Serialize for PathPattern {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PathPattern {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(PathPattern::new(raw))
    }
}

/// A list of [`PathPattern`]s.
#[derive(Clone, Default, PartialEq)]
pub struct PathPatterns {
    patterns: Vec<PathPattern>,
}

impl PathPatterns {
    /// Creates a new list from pattern strings.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(PathPattern::new).collect(),
        }
    }

    /// Returns `true` if the list of patterns is empty.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Returns `true` if any of the patterns match the given path.
    pub fn is_match(&self, path: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(path))
    }
}

impl fmt::Debug for PathPatterns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.patterns.fmt(f)
    }
}

impl Serialize for PathPatterns {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.patterns.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PathPatterns {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let patterns = Deserialize::deserialize(deserializer)?;
        Ok(PathPatterns { patterns })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_glob {
        ($value:expr, $pat:expr, $is_match:expr) => {{
            let pattern = PathPattern::new($pat);
            assert!(
                pattern.is_match($value) == $is_match,
                "expected that {} {} {}",
                $pat,
                if $is_match { "matches" } else { "does not match" },
                $value,
            );
        }};
    }

    #[test]
    fn test_path_globs() {
        test_glob!("/api/test/drain", "/api/test/drain", true);
        test_glob!("/api/test/drainage", "/api/test/drain", false);
        test_glob!("/api/users/42", "/api/users/*", true);
        test_glob!("/api/users/42/orders", "/api/users/*", false);
        test_glob!("/api/users/42/orders", "/api/users/**", true);
        test_glob!("/api/test/tail-sampling/slow", "/api/test/tail-sampling/**", true);
        test_glob!("/health", "/api/**", false);
        test_glob!("/api/v1/orders", "/api/*/orders", true);
        test_glob!("/api/v1", "/api/v?", true);
    }

    #[test]
    fn test_empty_path() {
        test_glob!("", "**", false);
    }

    #[test]
    fn test_invalid_pattern_never_matches() {
        let pattern = PathPattern::new("/api/[unclosed");
        assert!(!pattern.is_valid());
        assert!(!pattern.is_match("/api/[unclosed"));
        assert!(!pattern.is_match("/api/x"));
    }

    #[test]
    fn test_patterns_match_any() {
        let patterns = PathPatterns::new(["/api/auth/**", "/admin/*"]);
        assert!(patterns.is_match("/api/auth/login"));
        assert!(patterns.is_match("/admin/users"));
        assert!(!patterns.is_match("/admin/users/1"));
        assert!(!patterns.is_match("/health"));
    }

    #[test]
    fn test_serde_roundtrip_keeps_source() {
        let patterns: PathPatterns = serde_json::from_str(r#"["/api/**", "/a/*"]"#).unwrap();
        assert!(patterns.is_match("/a/b"));
        assert_eq!(
            serde_json::to_string(&patterns).unwrap(),
            r#"["/api/**","/a/*"]"#
        );
    }
}
