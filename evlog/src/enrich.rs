//! Enrichment of kept events.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use evlog_event::{RequestInfo, WideEvent};
use regex::Regex;
use serde_json::{Map, Value, json};

use crate::RequestOutcome;

/// Everything an [`Enricher`] can read, and the event it may extend.
#[derive(Debug)]
pub struct EnrichContext<'a> {
    /// The kept event.
    pub event: &'a mut WideEvent,
    /// The request that produced the event.
    pub request: Option<&'a RequestInfo>,
    /// Sanitized request headers with lowercase names.
    pub headers: &'a BTreeMap<String, String>,
    /// The outcome reported for the request.
    pub outcome: &'a RequestOutcome,
}

impl EnrichContext<'_> {
    /// Returns a request header by lowercase name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Adds derived fields to a kept event before it enters the pipeline.
///
/// Closures taking `&mut EnrichContext` implement this trait.
pub trait Enricher: Send + Sync {
    /// Extends the event in `ctx`.
    fn enrich(&self, ctx: &mut EnrichContext<'_>);
}

impl<F> Enricher for F
where
    F: Fn(&mut EnrichContext<'_>) + Send + Sync,
{
    fn enrich(&self, ctx: &mut EnrichContext<'_>) {
        self(ctx)
    }
}

type Rules = Vec<(&'static str, Regex)>;

fn compile(rules: &[(&'static str, &str)]) -> Rules {
    rules
        .iter()
        .map(|&(name, pattern)| {
            let regex = Regex::new(pattern).expect("invalid user agent pattern");
            (name, regex)
        })
        .collect()
}

/// Browsers by name, checked in order. The first group captures the version.
static BROWSERS: LazyLock<Rules> = LazyLock::new(|| {
    compile(&[
        ("Edge", r"Edg(?:e|A|iOS)?/([\d.]+)"),
        ("Opera", r"(?:OPR|Opera)/([\d.]+)"),
        ("Samsung Internet", r"SamsungBrowser/([\d.]+)"),
        ("Chrome", r"(?:Chrome|CriOS)/([\d.]+)"),
        ("Firefox", r"(?:Firefox|FxiOS)/([\d.]+)"),
        ("Safari", r"Version/([\d.]+).*Safari/"),
    ])
});

/// Operating systems by name, checked in order. iOS agents also claim `Mac OS X`.
static OPERATING_SYSTEMS: LazyLock<Rules> = LazyLock::new(|| {
    compile(&[
        ("Windows", r"Windows NT ([\d.]+)"),
        ("iOS", r"(?:iPhone|CPU) OS (\d+(?:_\d+)*)"),
        ("macOS", r"Mac OS X (\d+(?:[_.]\d+)*)"),
        ("Android", r"Android ([\d.]+)"),
        ("Linux", r"Linux()"),
    ])
});

static BOTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)bot\b|crawler|spider|slurp|facebookexternalhit")
        .expect("invalid bot pattern")
});

static TABLETS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"iPad|Tablet").expect("invalid tablet pattern"));

static MOBILES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Mobi|iPhone|Android").expect("invalid mobile pattern"));

/// Returns `{name, version}` of the first matching rule.
fn detect(rules: &Rules, user_agent: &str) -> Option<Value> {
    rules.iter().find_map(|(name, regex)| {
        let captures = regex.captures(user_agent)?;
        let mut detected = json!({ "name": name });
        if let Some(version) = captures.get(1).filter(|v| !v.is_empty()) {
            detected["version"] = version.as_str().replace('_', ".").into();
        }
        Some(detected)
    })
}

fn device_type(user_agent: &str) -> &'static str {
    if BOTS.is_match(user_agent) {
        "bot"
    } else if TABLETS.is_match(user_agent) {
        "tablet"
    } else if MOBILES.is_match(user_agent) {
        "mobile"
    } else {
        "desktop"
    }
}

/// Adds a `userAgent` object with browser, OS and device type parsed from `user-agent`.
///
/// Detection covers common browsers only. Unknown agents still get `raw` and a device type.
#[derive(Clone, Copy, Debug, Default)]
pub struct UserAgentEnricher;

impl Enricher for UserAgentEnricher {
    fn enrich(&self, ctx: &mut EnrichContext<'_>) {
        let Some(user_agent) = ctx.header("user-agent").filter(|ua| !ua.trim().is_empty()) else {
            return;
        };

        let mut info = Map::new();
        info.insert("raw".to_owned(), user_agent.into());
        if let Some(browser) = detect(&BROWSERS, user_agent) {
            info.insert("browser".to_owned(), browser);
        }
        if let Some(os) = detect(&OPERATING_SYSTEMS, user_agent) {
            info.insert("os".to_owned(), os);
        }
        info.insert("device".to_owned(), json!({ "type": device_type(user_agent) }));

        ctx.event.set("userAgent", info);
    }
}

/// Geo headers set by CDNs and hosting platforms, by output field.
const GEO_HEADERS: &[(&str, &[&str])] = &[
    ("country", &["cf-ipcountry", "x-vercel-ip-country"]),
    ("region", &["cf-region", "x-vercel-ip-country-region"]),
    ("regionCode", &["cf-region-code"]),
    ("city", &["cf-city", "x-vercel-ip-city"]),
    ("latitude", &["cf-iplatitude", "x-vercel-ip-latitude"]),
    ("longitude", &["cf-iplongitude", "x-vercel-ip-longitude"]),
];

/// Adds a `geo` object from CDN geolocation headers.
#[derive(Clone, Copy, Debug, Default)]
pub struct GeoEnricher;

impl Enricher for GeoEnricher {
    fn enrich(&self, ctx: &mut EnrichContext<'_>) {
        let mut geo = Map::new();

        for (field, headers) in GEO_HEADERS {
            let value = headers.iter().find_map(|name| ctx.header(name));
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                geo.insert((*field).to_owned(), Value::from(value));
            }
        }

        if !geo.is_empty() {
            ctx.event.set("geo", geo);
        }
    }
}

/// Adds a `requestSize` object from the request and response `content-length`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestSizeEnricher;

impl Enricher for RequestSizeEnricher {
    fn enrich(&self, ctx: &mut EnrichContext<'_>) {
        let request_bytes = ctx
            .header("content-length")
            .and_then(|v| v.trim().parse::<u64>().ok());
        let response_bytes = ctx.outcome.response_bytes;

        let mut size = Map::new();
        if let Some(bytes) = request_bytes {
            size.insert("requestBytes".to_owned(), bytes.into());
        }
        if let Some(bytes) = response_bytes {
            size.insert("responseBytes".to_owned(), bytes.into());
        }

        if !size.is_empty() {
            ctx.event.set("requestSize", size);
        }
    }
}

/// Adds `traceId`, `spanId` and `traceContext` from W3C trace context headers.
///
/// Malformed `traceparent` headers are ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct TraceContextEnricher;

impl Enricher for TraceContextEnricher {
    fn enrich(&self, ctx: &mut EnrichContext<'_>) {
        let Some(traceparent) = ctx.header("traceparent") else {
            return;
        };
        let Some((trace_id, span_id)) = parse_traceparent(traceparent) else {
            evlog_log::trace!(traceparent, "ignoring malformed traceparent");
            return;
        };

        let mut trace_context = json!({ "traceparent": traceparent });
        if let Some(tracestate) = ctx.header("tracestate") {
            trace_context["tracestate"] = tracestate.into();
        }

        let (trace_id, span_id) = (trace_id.to_owned(), span_id.to_owned());
        ctx.event.set("traceId", trace_id);
        ctx.event.set("spanId", span_id);
        ctx.event.set("traceContext", trace_context);
    }
}

/// Splits `version-traceid-spanid-flags` into trace and span id.
fn parse_traceparent(value: &str) -> Option<(&str, &str)> {
    let mut parts = value.trim().split('-');
    let version = parts.next()?;
    let trace_id = parts.next()?;
    let span_id = parts.next()?;
    let flags = parts.next()?;

    let is_hex = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_hexdigit());
    let valid = is_hex(version, 2)
        && is_hex(trace_id, 32)
        && is_hex(span_id, 16)
        && is_hex(flags, 2)
        && trace_id.bytes().any(|b| b != b'0')
        && span_id.bytes().any(|b| b != b'0');

    valid.then_some((trace_id, span_id))
}
