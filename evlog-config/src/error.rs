use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

/// The kind of a [`ConfigError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ConfigErrorKind {
    /// Failed to open the file.
    #[error("could not open config file")]
    CouldNotOpenFile,
    /// Parsing YAML failed.
    #[error("could not parse yaml config file")]
    BadYaml,
    /// Parsing JSON failed.
    #[error("could not parse json config file")]
    BadJson,
    /// The file extension is neither YAML nor JSON.
    #[error("unknown config file format")]
    UnknownFormat,
    /// A value is out of range or cannot be parsed.
    #[error("invalid config value")]
    InvalidValue,
}

/// Where a config error originated.
#[derive(Debug, Default)]
enum ConfigErrorSource {
    /// An error occurring independently.
    #[default]
    None,
    /// An error originating from a configuration file.
    File(PathBuf),
    /// An error originating in a field override.
    FieldOverride(String),
    /// An error originating in a field of a configuration file.
    FileField(PathBuf, String),
}

/// Indicates config related errors.
#[derive(Debug)]
pub struct ConfigError {
    origin: ConfigErrorSource,
    kind: ConfigErrorKind,
    cause: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl ConfigError {
    pub(crate) fn new(kind: ConfigErrorKind) -> Self {
        Self {
            origin: ConfigErrorSource::None,
            kind,
            cause: None,
        }
    }

    pub(crate) fn wrap<E>(cause: E, kind: ConfigErrorKind) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            cause: Some(Box::new(cause)),
            ..Self::new(kind)
        }
    }

    pub(crate) fn for_field<E>(cause: E, field: &str) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::wrap(cause, ConfigErrorKind::InvalidValue).field(field)
    }

    /// Attaches the file, keeping a field origin if one is set.
    pub(crate) fn file(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        self.origin = match std::mem::take(&mut self.origin) {
            ConfigErrorSource::FieldOverride(name) | ConfigErrorSource::FileField(_, name) => {
                ConfigErrorSource::FileField(path, name)
            }
            ConfigErrorSource::None | ConfigErrorSource::File(_) => ConfigErrorSource::File(path),
        };
        self
    }

    pub(crate) fn field(mut self, name: &str) -> Self {
        self.origin = ConfigErrorSource::FieldOverride(name.to_owned());
        self
    }

    /// Returns the error kind of the error.
    pub fn kind(&self) -> ConfigErrorKind {
        self.kind
    }

    /// Returns the file that caused the error, if any.
    pub fn path(&self) -> Option<&Path> {
        match self.origin {
            ConfigErrorSource::File(ref path) | ConfigErrorSource::FileField(ref path, _) => {
                Some(path)
            }
            _ => None,
        }
    }

    /// Returns the name of the field that caused the error, if any.
    pub fn field_name(&self) -> Option<&str> {
        match self.origin {
            ConfigErrorSource::FieldOverride(ref name)
            | ConfigErrorSource::FileField(_, ref name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            ConfigErrorSource::None => self.kind.fmt(f),
            ConfigErrorSource::File(path) => write!(f, "{} (file {})", self.kind, path.display()),
            ConfigErrorSource::FieldOverride(name) => write!(f, "{} (field {name})", self.kind),
            ConfigErrorSource::FileField(path, name) => {
                write!(f, "{} (file {}, field {name})", self.kind, path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_ref().map(|cause| cause.as_ref() as &(dyn Error + 'static))
    }
}
