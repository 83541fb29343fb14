//! Sampling of wide events.
//!
//! Sampling decides for every finished event whether it is kept and handed to the drain
//! pipeline. It combines two stages:
//!
//!  - **Head sampling** keeps a random percentage of events per [`Level`](evlog_event::Level),
//!    configured through [`SampleRates`]. It does not need to know anything about the outcome of
//!    the work.
//!  - **Tail sampling** runs after the outcome is known. Every [`KeepRule`] and the optional
//!    [`KeepCallback`] are evaluated, and if any of them match, the event is kept even if head
//!    sampling dropped it.
//!
//! The entry point is [`SamplingEngine::decide`]. The engine holds no global state, and the
//! source of randomness is injected via [`RandomSource`].
//!
//! In addition, [`RouteFilter`] and [`RouteServices`] decide per request path whether events are
//! logged at all and which service they are attributed to.
//!
//! # Example
//!
//! ```yaml
//! rates:
//!   info: 10
//!   warn: 50
//! keep:
//!   - status: 400
//!   - duration: 1000
//!   - path: /api/checkout/**
//! ```
#![warn(missing_docs)]

pub mod condition;
pub mod config;
pub mod evaluation;
pub mod random;
pub mod routes;

pub use self::condition::*;
pub use self::config::*;
pub use self::evaluation::*;
pub use self::random::*;
pub use self::routes::*;
