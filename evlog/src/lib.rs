//! Sampling and batched delivery of wide events.
//!
//! A wide event is one structured record summarizing an entire unit of work, such as an HTTP
//! request. This crate connects the pieces that decide what happens to such an event once the
//! work has finished:
//!
//!  1. [`RouteFilter`] drops events for paths that should not be logged at all.
//!  2. [`RouteServices`] attributes the event to a service based on its path.
//!  3. [`SamplingEngine`] decides whether the event is kept.
//!  4. [`Enricher`]s add derived fields to kept events.
//!  5. The [`Pipeline`] buffers the event and hands it to a [`Sink`] in batches.
//!
//! # Example
//!
//! ```
//! use evlog::{Evlog, RequestOutcome};
//! use evlog::config::Config;
//! use evlog::event::{DrainContext, Level, RequestInfo, WideEvent};
//! use evlog::drain::{Sink, SinkError};
//!
//! struct Discard;
//!
//! #[evlog::drain::async_trait]
//! impl Sink for Discard {
//!     async fn send(&self, _batch: &[DrainContext]) -> Result<(), SinkError> {
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let config = Config::from_yaml_str("sampling:\n  rates:\n    info: 10\n").unwrap();
//! let evlog = Evlog::from_config(&config, Discard);
//!
//! let context = DrainContext::new(WideEvent::new(Level::Info, "shop", "production"))
//!     .with_request(RequestInfo::new("GET", "/api/products"));
//! evlog.emit(context, RequestOutcome::new().with_status(500));
//!
//! evlog.shutdown().await;
//! # }
//! ```
#![warn(missing_docs)]

mod emit;
mod enrich;
mod setup;

pub use self::emit::*;
pub use self::enrich::*;
pub use self::setup::*;

pub use evlog_config as config;
pub use evlog_drain::{Pipeline, Sink, SinkError};
pub use evlog_event::{DrainContext, Level, WideEvent};
pub use evlog_sampling::{RouteFilter, RouteServices, SamplingDecision, SamplingEngine};

/// The drain pipeline and its traits.
pub mod drain {
    pub use evlog_drain::*;

    #[doc(no_inline)]
    pub use async_trait::async_trait;
}

/// The wide event data model.
pub mod event {
    pub use evlog_event::*;
}

/// Head and tail sampling.
pub mod sampling {
    pub use evlog_sampling::*;
}
