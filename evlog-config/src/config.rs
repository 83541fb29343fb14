use std::env;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

use evlog_drain::PipelineConfig;
use evlog_log::LogConfig;
use evlog_sampling::{RoutesConfig, SamplingConfig};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigErrorKind};

/// Supported file formats, detected by file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "yml" | "yaml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Values that can be overridden from the environment.
///
/// Values are kept as strings and parsed in [`Config::apply_override`], so that parse errors are
/// reported with the name of the field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OverridableConfig {
    /// `EVLOG_LOG_LEVEL`: the log level.
    pub log_level: Option<String>,
    /// `EVLOG_BATCH_SIZE`: the number of events per flush trigger.
    pub batch_size: Option<String>,
    /// `EVLOG_FLUSH_INTERVAL_MS`: the maximum wait before a partial batch flushes.
    pub flush_interval_ms: Option<String>,
    /// `EVLOG_MAX_BUFFER_SIZE`: the hard cap on buffered events.
    pub max_buffer_size: Option<String>,
    /// `EVLOG_RETRY_MAX_ATTEMPTS`: the number of attempts per batch.
    pub retry_max_attempts: Option<String>,
}

impl OverridableConfig {
    /// Reads overrides from `EVLOG_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads overrides through a lookup function for variable names.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            log_level: lookup("EVLOG_LOG_LEVEL"),
            batch_size: lookup("EVLOG_BATCH_SIZE"),
            flush_interval_ms: lookup("EVLOG_FLUSH_INTERVAL_MS"),
            max_buffer_size: lookup("EVLOG_MAX_BUFFER_SIZE"),
            retry_max_attempts: lookup("EVLOG_RETRY_MAX_ATTEMPTS"),
        }
    }

    /// Returns `true` if no override is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// The complete evlog configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Internal logging of evlog itself.
    pub logging: LogConfig,
    /// Head and tail sampling.
    pub sampling: SamplingConfig,
    /// Batching, retries and buffer bounds.
    pub drain: PipelineConfig,
    /// Route filtering and service names.
    pub routes: RoutesConfig,
}

impl Config {
    /// Loads and validates a config file.
    ///
    /// Files ending in `.yml` or `.yaml` are parsed as YAML, files ending in `.json` as JSON.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| ConfigError::new(ConfigErrorKind::UnknownFormat).file(path))?;

        let file = fs::File::open(path)
            .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::CouldNotOpenFile).file(path))?;
        let reader = io::BufReader::new(file);

        let config: Self = match format {
            ConfigFormat::Yaml => serde_yaml::from_reader(reader)
                .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::BadYaml).file(path))?,
            ConfigFormat::Json => serde_json::from_reader(reader)
                .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::BadJson).file(path))?,
        };

        config.validate().map_err(|e| e.file(path))?;
        evlog_log::debug!(path = %path.display(), "loaded config");

        Ok(config)
    }

    /// Parses and validates a config from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(s).map_err(|e| ConfigError::wrap(e, ConfigErrorKind::BadYaml))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a config from a JSON value.
    ///
    /// This is mostly useful for tests.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_value(value)
            .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::BadJson))?;
        config.validate()?;
        Ok(config)
    }

    /// Override configuration with values coming from other sources, such as environment
    /// variables.
    pub fn apply_override(
        &mut self,
        overrides: OverridableConfig,
    ) -> Result<&mut Self, ConfigError> {
        if let Some(level) = overrides.log_level {
            self.logging.level = parse_field(&level, "logging.level")?;
        }

        let drain = &mut self.drain;

        if let Some(size) = overrides.batch_size {
            drain.batch.size = parse_field(&size, "drain.batch.size")?;
        }

        if let Some(interval) = overrides.flush_interval_ms {
            drain.batch.interval_ms = parse_field(&interval, "drain.batch.intervalMs")?;
        }

        if let Some(size) = overrides.max_buffer_size {
            drain.max_buffer_size = parse_field(&size, "drain.maxBufferSize")?;
        }

        if let Some(attempts) = overrides.retry_max_attempts {
            drain.retry.max_attempts = parse_field(&attempts, "drain.retry.maxAttempts")?;
        }

        self.validate()?;
        Ok(self)
    }

    /// Checks that all sizes, intervals and counts are positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.drain
            .validate()
            .map_err(|e| ConfigError::for_field(e, &format!("drain.{}", e.field())))
    }

    /// Serializes the config to YAML.
    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::wrap(e, ConfigErrorKind::BadYaml))
    }
}

fn parse_field<T>(value: &str, field: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .map_err(|e| ConfigError::for_field(e, field))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use evlog_drain::Backoff;
    use similar_asserts::assert_eq;

    use super::*;

    fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn overrides(vars: &[(&str, &str)]) -> OverridableConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        OverridableConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let file = write_config(".yml", "{}\n");
        let config = Config::from_path(file.path()).unwrap();

        assert_eq!(config.drain, PipelineConfig::default());
        assert_eq!(config.sampling, SamplingConfig::default());
        assert_eq!(config.routes, RoutesConfig::default());
        assert_eq!(config.logging.level, evlog_log::Level::Info);
    }

    #[test]
    fn test_load_yaml() {
        let file = write_config(
            ".yaml",
            r#"
logging:
  level: debug
sampling:
  rates:
    info: 10
  keep:
    - status: 400
drain:
  batch:
    size: 50
  retry:
    backoff: exponential
routes:
  exclude: ["/health"]
"#,
        );

        let config = Config::from_path(file.path()).unwrap();
        assert_eq!(config.logging.level, evlog_log::Level::Debug);
        assert_eq!(config.sampling.rates.info, Some(10));
        assert_eq!(config.sampling.keep.len(), 1);
        assert_eq!(config.drain.batch.size, 50);
        assert_eq!(config.drain.batch.interval_ms, 2000);
        assert_eq!(config.drain.retry.backoff, Backoff::Exponential);
        assert!(!config.routes.filter.should_log("/health"));
    }

    #[test]
    fn test_load_json() {
        let file = write_config(
            ".json",
            r#"{"drain": {"maxBufferSize": 10}, "sampling": {"rates": {"debug": 0}}}"#,
        );

        let config = Config::from_path(file.path()).unwrap();
        assert_eq!(config.drain.max_buffer_size, 10);
        assert_eq!(config.sampling.rates.debug, Some(0));
    }

    #[test]
    fn test_reject_zero_batch_size() {
        let file = write_config(".yml", "drain:\n  batch:\n    size: 0\n");
        let error = Config::from_path(file.path()).unwrap_err();

        assert_eq!(error.kind(), ConfigErrorKind::InvalidValue);
        assert_eq!(error.path(), Some(file.path()));
        assert_eq!(error.field_name(), Some("drain.batch.size"));
    }

    #[test]
    fn test_bad_yaml() {
        let file = write_config(".yml", "drain: [unclosed\n");
        let error = Config::from_path(file.path()).unwrap_err();
        assert_eq!(error.kind(), ConfigErrorKind::BadYaml);
    }

    #[test]
    fn test_bad_json() {
        let file = write_config(".json", "{\"drain\": ");
        let error = Config::from_path(file.path()).unwrap_err();
        assert_eq!(error.kind(), ConfigErrorKind::BadJson);
    }

    #[test]
    fn test_unknown_format() {
        let file = write_config(".toml", "[drain]\n");
        let error = Config::from_path(file.path()).unwrap_err();
        assert_eq!(error.kind(), ConfigErrorKind::UnknownFormat);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let error = Config::from_path(dir.path().join("missing.yml")).unwrap_err();
        assert_eq!(error.kind(), ConfigErrorKind::CouldNotOpenFile);
    }

    #[test]
    fn test_apply_override() {
        let mut config = Config::default();
        config
            .apply_override(overrides(&[
                ("EVLOG_LOG_LEVEL", "trace"),
                ("EVLOG_BATCH_SIZE", "10"),
                ("EVLOG_FLUSH_INTERVAL_MS", " 500 "),
                ("EVLOG_MAX_BUFFER_SIZE", "100"),
                ("EVLOG_RETRY_MAX_ATTEMPTS", "5"),
            ]))
            .unwrap();

        assert_eq!(config.logging.level, evlog_log::Level::Trace);
        assert_eq!(config.drain.batch.size, 10);
        assert_eq!(config.drain.batch.interval_ms, 500);
        assert_eq!(config.drain.max_buffer_size, 100);
        assert_eq!(config.drain.retry.max_attempts, 5);
    }

    #[test]
    fn test_override_parse_error_names_field() {
        let mut config = Config::default();
        let error = config
            .apply_override(overrides(&[("EVLOG_BATCH_SIZE", "many")]))
            .unwrap_err();

        assert_eq!(error.kind(), ConfigErrorKind::InvalidValue);
        assert_eq!(error.field_name(), Some("drain.batch.size"));
    }

    #[test]
    fn test_override_rejects_zero() {
        let mut config = Config::default();
        let error = config
            .apply_override(overrides(&[("EVLOG_RETRY_MAX_ATTEMPTS", "0")]))
            .unwrap_err();
        assert_eq!(error.kind(), ConfigErrorKind::InvalidValue);
        assert_eq!(error.field_name(), Some("drain.retry.maxAttempts"));
    }

    #[test]
    fn test_no_overrides() {
        assert!(overrides(&[]).is_empty());
        assert!(!overrides(&[("EVLOG_BATCH_SIZE", "1")]).is_empty());
    }

    #[test]
    fn test_from_json_value() {
        let config = Config::from_json_value(serde_json::json!({
            "routes": {"services": {"/api/auth/**": {"service": "auth"}}}
        }))
        .unwrap();

        assert_eq!(config.routes.services.service_for("/api/auth/me"), Some("auth"));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = Config::from_yaml_str("drain:\n  maxBufferSize: 5\n").unwrap();
        let yaml = config.to_yaml_string().unwrap();
        assert!(yaml.contains("maxBufferSize: 5"));
        assert!(yaml.contains("intervalMs: 2000"));

        let parsed = Config::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed.drain, config.drain);
        assert_eq!(parsed.sampling, config.sampling);
    }
}
