//! Per-route filtering and service naming.

use std::fmt;

use evlog_common::{PathPattern, PathPatterns};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Decides whether events of a request path are logged at all.
///
/// Exclusions take precedence over inclusions. An empty include list includes every path.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteFilter {
    /// Paths to log. Empty means all paths.
    #[serde(skip_serializing_if = "PathPatterns::is_empty")]
    pub include: PathPatterns,
    /// Paths never to log.
    #[serde(skip_serializing_if = "PathPatterns::is_empty")]
    pub exclude: PathPatterns,
}

impl RouteFilter {
    /// Returns `true` if events for this path should be logged.
    pub fn should_log(&self, path: &str) -> bool {
        if self.exclude.is_match(path) {
            evlog_log::trace!(path, "route excluded");
            return false;
        }

        self.include.is_empty() || self.include.is_match(path)
    }
}

/// The service configured for a route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteService {
    /// Name overriding the `service` of events on this route.
    pub service: String,
}

/// Maps route patterns to service names.
///
/// Deserializes from a mapping of pattern to route config. Declaration order is kept and the
/// first matching pattern wins:
///
/// ```
/// use evlog_sampling::RouteServices;
///
/// let services: RouteServices = serde_json::from_str(r#"{
///     "/api/auth/**": {"service": "auth-service"},
///     "/api/**": {"service": "api"}
/// }"#).unwrap();
///
/// assert_eq!(services.service_for("/api/auth/login"), Some("auth-service"));
/// assert_eq!(services.service_for("/api/orders"), Some("api"));
/// assert_eq!(services.service_for("/health"), None);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RouteServices {
    routes: Vec<(PathPattern, RouteService)>,
}

impl RouteServices {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a route. Earlier routes take precedence.
    pub fn insert(&mut self, pattern: impl Into<String>, service: impl Into<String>) {
        self.routes.push((
            PathPattern::new(pattern),
            RouteService {
                service: service.into(),
            },
        ));
    }

    /// Returns `true` if no routes are configured.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Returns the service of the first route matching the path.
    pub fn service_for(&self, path: &str) -> Option<&str> {
        self.routes
            .iter()
            .find(|(pattern, _)| pattern.is_match(path))
            .map(|(_, route)| route.service.as_str())
    }
}

impl Serialize for RouteServices {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.routes.len()))?;
        for (pattern, route) in &self.routes {
            map.serialize_entry(pattern, route)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RouteServices {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RoutesVisitor;

        impl<'de> Visitor<'de> for RoutesVisitor {
            type Value = RouteServices;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a mapping from route pattern to route config")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut routes = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((pattern, route)) = map.next_entry::<PathPattern, RouteService>()? {
                    routes.push((pattern, route));
                }
                Ok(RouteServices { routes })
            }
        }

        deserializer.deserialize_map(RoutesVisitor)
    }
}

/// Route configuration: which paths are logged and which service names they carry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutesConfig {
    /// Include and exclude patterns.
    #[serde(flatten)]
    pub filter: RouteFilter,
    /// Service names per route.
    #[serde(skip_serializing_if = "RouteServices::is_empty")]
    pub services: RouteServices,
}
