use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::WideEvent;

/// Request headers that never leave the process.
///
/// Names are compared lowercase.
pub const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "proxy-authorization",
    "set-cookie",
    "x-api-key",
    "x-auth-token",
    "x-csrf-token",
];

/// Transport metadata of the request that produced an event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestInfo {
    /// The HTTP method, for example `GET`.
    pub method: String,
    /// The request path without query string.
    pub path: String,
    /// Identifier correlating the event with the request, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl RequestInfo {
    /// Creates request info without a request id.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            request_id: None,
        }
    }

    /// Attaches a request id.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// A [`WideEvent`] together with the transport metadata of its request.
///
/// This is the unit that pipelines buffer and hand to sinks. Headers are always sanitized: names
/// are lowercase and [`SENSITIVE_HEADERS`] are removed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrainContext {
    /// The event.
    pub event: WideEvent,
    /// The request that produced the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestInfo>,
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "deserialize_headers"
    )]
    headers: BTreeMap<String, String>,
}

impl DrainContext {
    /// Wraps an event without transport metadata.
    pub fn new(event: WideEvent) -> Self {
        Self {
            event,
            request: None,
            headers: BTreeMap::new(),
        }
    }

    /// Attaches request info.
    pub fn with_request(mut self, request: RequestInfo) -> Self {
        self.request = Some(request);
        self
    }

    /// Attaches request headers, dropping sensitive ones.
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        self.headers = filter_safe_headers(headers);
        self
    }

    /// Returns the sanitized request headers.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Returns the request path, falling back to the `path` field of the event.
    pub fn path(&self) -> Option<&str> {
        match self.request {
            Some(ref request) if !request.path.is_empty() => Some(&request.path),
            _ => self.event.path(),
        }
    }

    /// Returns the request method, falling back to the `method` field of the event.
    pub fn method(&self) -> Option<&str> {
        match self.request {
            Some(ref request) if !request.method.is_empty() => Some(&request.method),
            _ => self.event.get("method").and_then(|v| v.as_str()),
        }
    }

    /// Borrows the event mutably together with the read-only transport metadata.
    pub fn parts_mut(
        &mut self,
    ) -> (
        &mut WideEvent,
        Option<&RequestInfo>,
        &BTreeMap<String, String>,
    ) {
        (&mut self.event, self.request.as_ref(), &self.headers)
    }
}

impl From<WideEvent> for DrainContext {
    fn from(event: WideEvent) -> Self {
        Self::new(event)
    }
}

/// Lowercases header names and removes [`SENSITIVE_HEADERS`].
pub fn filter_safe_headers<I, K, V>(headers: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    headers
        .into_iter()
        .filter_map(|(name, value)| {
            let name = name.as_ref().to_ascii_lowercase();
            if SENSITIVE_HEADERS.contains(&name.as_str()) {
                None
            } else {
                Some((name, value.into()))
            }
        })
        .collect()
}

fn deserialize_headers<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let headers = BTreeMap::<String, String>::deserialize(deserializer)?;
    Ok(filter_safe_headers(headers))
}
