//! The data model flowing through evlog.
//!
//! A [`WideEvent`] is one structured record summarizing a single unit of work, for instance one
//! HTTP request. It always carries a timestamp, a [`Level`], the service and the environment, and
//! an open set of caller-defined fields that are accumulated while the work runs.
//!
//! Once an event is finished and kept by sampling, it is wrapped in a [`DrainContext`] together
//! with optional transport metadata. The drain context is the unit that is buffered, batched and
//! handed to sinks.
//!
//! ```
//! use evlog_event::{DrainContext, Level, RequestInfo, WideEvent};
//!
//! let event = WideEvent::new(Level::Info, "checkout", "production")
//!     .with_field("status", 200)
//!     .with_field("durationMs", 42);
//!
//! let context = DrainContext::new(event)
//!     .with_request(RequestInfo::new("POST", "/api/checkout"))
//!     .with_headers([("Authorization", "Bearer secret"), ("User-Agent", "curl/8.0")]);
//!
//! assert_eq!(context.event.status(), Some(200));
//! assert!(context.headers().get("authorization").is_none());
//! ```
#![warn(missing_docs)]

mod context;
mod event;
mod level;

pub use self::context::*;
pub use self::event::*;
pub use self::level::*;
