use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Level;

/// Field names stored in the typed fields of [`WideEvent`].
pub const RESERVED_FIELDS: &[&str] = &["timestamp", "level", "service", "environment"];

/// A single structured record summarizing one unit of work.
///
/// The four well-known fields are always present. Everything else the request-scoped logger
/// attaches ends up in [`fields`](Self::fields), which is flattened into the same JSON object on
/// serialization. Setting one of the [`RESERVED_FIELDS`] updates the typed field, so a key never
/// appears twice.
///
/// Events are not mutated after they have been handed to a pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WideEvent {
    /// ISO-8601 timestamp of the event.
    pub timestamp: String,
    /// Severity of the event.
    pub level: Level,
    /// Name of the service emitting the event.
    pub service: String,
    /// Deployment environment, for example `production`.
    pub environment: String,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl WideEvent {
    /// Creates an event stamped with the current time.
    pub fn new(level: Level, service: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level,
            service: service.into(),
            environment: environment.into(),
            fields: Map::new(),
        }
    }

    /// Replaces the timestamp.
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Adds a caller-defined field, replacing a previous value of the same name.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Sets a caller-defined field, replacing a previous value of the same name.
    ///
    /// The [`RESERVED_FIELDS`] are written to their typed fields instead. They only accept strings,
    /// and `level` must name a [`Level`]. Other values are ignored.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();

        if !RESERVED_FIELDS.contains(&key.as_str()) {
            self.fields.insert(key, value);
            return;
        }

        let Value::String(value) = value else {
            evlog_log::debug!(field = %key, "ignoring non-string value for reserved field");
            return;
        };

        match key.as_str() {
            "timestamp" => self.timestamp = value,
            "service" => self.service = value,
            "environment" => self.environment = value,
            _ => match value.parse::<Level>() {
                Ok(level) => self.level = level,
                Err(error) => {
                    evlog_log::debug!(
                        error = &error as &dyn std::error::Error,
                        "ignoring invalid event level"
                    );
                }
            },
        }
    }

    /// Returns all caller-defined fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Returns a caller-defined field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns the HTTP response status recorded in the `status` field.
    pub fn status(&self) -> Option<u16> {
        self.get("status")
            .and_then(Value::as_u64)
            .and_then(|status| u16::try_from(status).ok())
    }

    /// Returns the duration of the unit of work in milliseconds.
    ///
    /// Reads `durationMs` as a number, then `duration` either as a number of milliseconds or as a
    /// string with an `ms` or `s` suffix, e.g. `"250ms"` or `"1.5s"`.
    pub fn duration_ms(&self) -> Option<u64> {
        if let Some(ms) = self.get("durationMs").and_then(as_millis) {
            return Some(ms);
        }

        match self.get("duration")? {
            Value::String(s) => parse_duration_ms(s),
            value => as_millis(value),
        }
    }

    /// Returns the request path recorded in the `path` field.
    pub fn path(&self) -> Option<&str> {
        self.get("path").and_then(Value::as_str)
    }
}

fn as_millis(value: &Value) -> Option<u64> {
    let ms = value.as_f64()?;
    (ms.is_finite() && ms >= 0.0).then(|| ms.round() as u64)
}

/// Parses a human readable duration such as `"250ms"` or `"1.5 s"` into milliseconds.
pub fn parse_duration_ms(s: &str) -> Option<u64> {
    let s = s.trim();

    let (number, factor) = if let Some(number) = s.strip_suffix("ms") {
        (number, 1.0)
    } else if let Some(number) = s.strip_suffix('s') {
        (number, 1000.0)
    } else {
        return None;
    };

    let number = number.trim_end();
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }

    let value: f64 = number.parse().ok()?;
    Some((value * factor).round() as u64)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn event() -> WideEvent {
        WideEvent::new(Level::Info, "api", "test").with_timestamp("2025-01-01T00:00:00.000Z")
    }

    #[test]
    fn test_serialize_flat() {
        let event = event()
            .with_field("path", "/api/checkout")
            .with_field("status", 201)
            .with_field("user", json!({"id": "u_1", "premium": true}));

        insta::assert_json_snapshot!(event, @r###"
        {
          "timestamp": "2025-01-01T00:00:00.000Z",
          "level": "info",
          "service": "api",
          "environment": "test",
          "path": "/api/checkout",
          "status": 201,
          "user": {
            "id": "u_1",
            "premium": true
          }
        }
        "###);
    }

    #[test]
    fn test_deserialize_collects_fields() {
        let event: WideEvent = serde_json::from_value(json!({
            "timestamp": "2025-01-01T00:00:00.000Z",
            "level": "error",
            "service": "api",
            "environment": "prod",
            "status": 500,
            "error": {"message": "boom"}
        }))
        .unwrap();

        assert_eq!(event.level, Level::Error);
        assert_eq!(event.status(), Some(500));
        assert_eq!(event.get("error"), Some(&json!({"message": "boom"})));
        assert!(event.get("service").is_none());
    }

    #[test]
    fn test_reserved_fields_update_typed_fields() {
        let event = event()
            .with_field("service", "checkout")
            .with_field("level", "ERROR")
            .with_field("environment", "staging")
            .with_field("status", 500);

        assert_eq!(event.service, "checkout");
        assert_eq!(event.level, Level::Error);
        assert!(event.get("service").is_none());

        let json = serde_json::to_string(&event).unwrap();
        let parsed: WideEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
        assert_eq!(parsed.service, "checkout");
        assert_eq!(parsed.level, Level::Error);
        assert_eq!(parsed.environment, "staging");
    }

    #[test]
    fn test_reserved_fields_reject_invalid_values() {
        let event = event()
            .with_field("level", "fatal")
            .with_field("service", 42)
            .with_field("timestamp", json!({"at": 0}));

        assert_eq!(event.level, Level::Info);
        assert_eq!(event.service, "api");
        assert_eq!(event.timestamp, "2025-01-01T00:00:00.000Z");
        assert!(event.fields().is_empty());
    }

    #[test]
    fn test_status_out_of_range() {
        assert_eq!(event().with_field("status", 70000).status(), None);
        assert_eq!(event().with_field("status", "404").status(), None);
    }

    #[test]
    fn test_duration_sources() {
        assert_eq!(event().with_field("durationMs", 600).duration_ms(), Some(600));
        assert_eq!(event().with_field("duration", 12.4).duration_ms(), Some(12));
        assert_eq!(event().with_field("duration", "250ms").duration_ms(), Some(250));
        assert_eq!(event().with_field("duration", "1.5s").duration_ms(), Some(1500));
        assert_eq!(event().with_field("duration", "2 s").duration_ms(), Some(2000));
        assert_eq!(event().with_field("duration", "soon").duration_ms(), None);
        assert_eq!(event().with_field("durationMs", -5).duration_ms(), None);
        assert_eq!(event().duration_ms(), None);
    }

    #[test]
    fn test_duration_ms_takes_precedence() {
        let event = event()
            .with_field("durationMs", 10)
            .with_field("duration", "5s");
        assert_eq!(event.duration_ms(), Some(10));
    }

    #[test]
    fn test_new_timestamp_format() {
        let event = WideEvent::new(Level::Debug, "api", "dev");
        assert!(event.timestamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&event.timestamp).is_ok());
    }
}
