//! Tail sampling rules.
//!
//! The root type is [`KeepRule`], evaluated against an [`Outcome`].

use evlog_common::PathPattern;
use evlog_event::{DrainContext, WideEvent};
use serde::{Deserialize, Serialize};

/// The final outcome of a unit of work, known only after it finished.
///
/// Every field is optional. A missing value never matches a rule that inspects it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Outcome<'a> {
    /// The HTTP response status.
    pub status: Option<u16>,
    /// The duration of the unit of work in milliseconds.
    pub duration_ms: Option<u64>,
    /// The request path.
    pub path: Option<&'a str>,
    /// The request method.
    pub method: Option<&'a str>,
}

impl<'a> Outcome<'a> {
    /// Reads the outcome from the well-known fields of an event.
    pub fn from_event(event: &'a WideEvent) -> Self {
        Self {
            status: event.status(),
            duration_ms: event.duration_ms(),
            path: event.path(),
            method: event.get("method").and_then(|v| v.as_str()),
        }
    }

    /// Reads the outcome from a drain context, preferring its request metadata.
    pub fn from_context(context: &'a DrainContext) -> Self {
        Self {
            path: context.path(),
            method: context.method(),
            ..Self::from_event(&context.event)
        }
    }

    /// Overrides the response status.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Overrides the duration.
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Overrides the path.
    pub fn with_path(mut self, path: &'a str) -> Self {
        self.path = Some(path);
        self
    }
}

/// A structural rule that forces an event to be kept.
///
/// Each condition stands on its own: the rule matches if any of its configured conditions
/// matches. A rule without conditions never matches.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepRule {
    /// Matches if the response status is greater than or equal to this value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Matches if the duration in milliseconds is greater than or equal to this value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    /// Matches if the request path matches this glob pattern.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathPattern>,
}

impl KeepRule {
    /// Creates a rule matching `status >= threshold`.
    pub fn status(threshold: u16) -> Self {
        Self {
            status: Some(threshold),
            ..Default::default()
        }
    }

    /// Creates a rule matching `durationMs >= threshold`.
    pub fn duration(threshold: u64) -> Self {
        Self {
            duration: Some(threshold),
            ..Default::default()
        }
    }

    /// Creates a rule matching paths against a glob pattern.
    pub fn path(pattern: impl Into<String>) -> Self {
        Self {
            path: Some(PathPattern::new(pattern)),
            ..Default::default()
        }
    }

    /// Returns `true` if the rule matches the outcome.
    pub fn matches(&self, outcome: &Outcome<'_>) -> bool {
        let status = matches!(
            (self.status, outcome.status),
            (Some(threshold), Some(status)) if status >= threshold
        );

        let duration = matches!(
            (self.duration, outcome.duration_ms),
            (Some(threshold), Some(duration)) if duration >= threshold
        );

        let path = match (&self.path, outcome.path) {
            (Some(pattern), Some(path)) => pattern.is_match(path),
            _ => false,
        };

        status || duration || path
    }
}

#[cfg(test)]
mod tests {
    use evlog_event::Level;

    use super::*;

    #[test]
    fn test_status_threshold() {
        let rule = KeepRule::status(400);
        assert!(rule.matches(&Outcome::default().with_status(400)));
        assert!(rule.matches(&Outcome::default().with_status(503)));
        assert!(!rule.matches(&Outcome::default().with_status(399)));
    }

    #[test]
    fn test_duration_threshold() {
        let rule = KeepRule::duration(500);
        assert!(rule.matches(&Outcome::default().with_duration_ms(600)));
        assert!(rule.matches(&Outcome::default().with_duration_ms(500)));
        assert!(!rule.matches(&Outcome::default().with_duration_ms(499)));
    }

    #[test]
    fn test_path_pattern() {
        let rule = KeepRule::path("/api/test/critical/**");
        assert!(rule.matches(&Outcome::default().with_path("/api/test/critical/important")));
        assert!(!rule.matches(&Outcome::default().with_path("/api/test/success")));
    }

    #[test]
    fn test_missing_values_never_match() {
        let outcome = Outcome::default();
        assert!(!KeepRule::status(100).matches(&outcome));
        assert!(!KeepRule::duration(0).matches(&outcome));
        assert!(!KeepRule::path("**").matches(&outcome));
        assert!(!KeepRule::default().matches(&outcome.with_status(500)));
    }

    #[test]
    fn test_malformed_pattern_does_not_match() {
        let rule = KeepRule::path("/api/[");
        assert!(!rule.matches(&Outcome::default().with_path("/api/[")));
    }

    #[test]
    fn test_combined_rule_matches_any() {
        let rule: KeepRule = serde_json::from_str(r#"{"status": 500, "path": "/slow/*"}"#).unwrap();
        assert!(rule.matches(&Outcome::default().with_path("/slow/query")));
        assert!(rule.matches(&Outcome::default().with_status(500)));
        assert!(!rule.matches(&Outcome::default().with_status(404).with_path("/fast")));
    }

    #[test]
    fn test_outcome_from_context() {
        let event = WideEvent::new(Level::Info, "api", "test")
            .with_field("status", 404)
            .with_field("duration", "1.2s")
            .with_field("path", "/event/path");
        let context = DrainContext::new(event)
            .with_request(evlog_event::RequestInfo::new("GET", "/request/path"));

        let outcome = Outcome::from_context(&context);
        assert_eq!(outcome.status, Some(404));
        assert_eq!(outcome.duration_ms, Some(1200));
        assert_eq!(outcome.path, Some("/request/path"));
        assert_eq!(outcome.method, Some("GET"));
    }
}
