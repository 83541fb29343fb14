//! Sampling configuration.

use evlog_event::Level;
use serde::{Deserialize, Serialize};

use crate::condition::KeepRule;

/// Head sampling rates per [`Level`], as integer percentages.
///
/// A missing rate keeps every event of that level. Values are clamped to `0..=100` when
/// evaluated, so `0` or less drops every event at the head stage and `100` or more keeps all.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleRates {
    /// Rate for [`Level::Debug`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<i32>,
    /// Rate for [`Level::Info`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<i32>,
    /// Rate for [`Level::Warn`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warn: Option<i32>,
    /// Rate for [`Level::Error`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<i32>,
}

impl SampleRates {
    /// Returns the configured rate for a level.
    pub fn get(&self, level: Level) -> Option<i32> {
        match level {
            Level::Debug => self.debug,
            Level::Info => self.info,
            Level::Warn => self.warn,
            Level::Error => self.error,
        }
    }

    /// Sets the rate for a level.
    pub fn set(&mut self, level: Level, rate: i32) {
        let slot = match level {
            Level::Debug => &mut self.debug,
            Level::Info => &mut self.info,
            Level::Warn => &mut self.warn,
            Level::Error => &mut self.error,
        };
        *slot = Some(rate);
    }

    /// Returns the effective percentage for a level, defaulting to `100`.
    pub fn effective(&self, level: Level) -> u8 {
        self.get(level).unwrap_or(100).clamp(0, 100) as u8
    }
}

/// Configuration of the sampling engine.
///
/// ```
/// let config: evlog_sampling::SamplingConfig = serde_json::from_str(r#"{
///     "rates": {"info": 10},
///     "keep": [{"status": 400}, {"duration": 500}, {"path": "/api/critical/**"}]
/// }"#).unwrap();
///
/// assert_eq!(config.rates.info, Some(10));
/// assert_eq!(config.keep.len(), 3);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SamplingConfig {
    /// Head sampling rates per level.
    pub rates: SampleRates,

    /// Ordered tail sampling rules.
    ///
    /// An event matching any of these rules is kept even if head sampling dropped it.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keep: Vec<KeepRule>,
}

impl SamplingConfig {
    /// Returns `true` if this configuration keeps every event.
    pub fn keeps_all(&self) -> bool {
        Level::ALL
            .into_iter()
            .all(|level| self.rates.effective(level) == 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_rates_default_to_100() {
        let rates = SampleRates::default();
        for level in Level::ALL {
            assert_eq!(rates.effective(level), 100);
        }
    }

    #[test]
    fn test_rates_are_clamped() {
        let rates = SampleRates {
            debug: Some(-5),
            info: Some(250),
            ..Default::default()
        };

        assert_eq!(rates.effective(Level::Debug), 0);
        assert_eq!(rates.effective(Level::Info), 100);
    }

    #[test]
    fn test_set_rate() {
        let mut rates = SampleRates::default();
        rates.set(Level::Warn, 50);
        assert_eq!(rates.get(Level::Warn), Some(50));
        assert_eq!(rates.get(Level::Error), None);
    }

    #[test]
    fn test_keeps_all() {
        assert!(SamplingConfig::default().keeps_all());

        let mut config = SamplingConfig::default();
        config.rates.info = Some(10);
        assert!(!config.keeps_all());
    }

    #[test]
    fn test_deserialize_yaml() {
        let config: SamplingConfig = serde_yaml::from_str(
            r#"
rates:
  info: 10
  debug: 0
keep:
  - status: 400
  - duration: 500
  - path: /api/test/tail-sampling/**
"#,
        )
        .unwrap();

        insta::assert_debug_snapshot!(config, @r###"
        SamplingConfig {
            rates: SampleRates {
                debug: Some(
                    0,
                ),
                info: Some(
                    10,
                ),
                warn: None,
                error: None,
            },
            keep: [
                KeepRule {
                    status: Some(
                        400,
                    ),
                    duration: None,
                    path: None,
                },
                KeepRule {
                    status: None,
                    duration: Some(
                        500,
                    ),
                    path: None,
                },
                KeepRule {
                    status: None,
                    duration: None,
                    path: Some(
                        "/api/test/tail-sampling/**",
                    ),
                },
            ],
        }
        "###);
    }
}
