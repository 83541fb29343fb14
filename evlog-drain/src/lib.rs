//! Buffering and delivery of kept events.
//!
//! A [`Pipeline`] accepts [`DrainContext`](evlog_event::DrainContext)s that passed sampling and
//! hands them to a [`Sink`] in batches. The pipeline is an explicitly constructed object: each
//! instance owns its buffer, its flush timer and its in-flight guard, so independent pipelines
//! never share state.
//!
//! # Flushing
//!
//! A flush is triggered by one of:
//!
//!  - the number of pending events reaching `batch.size`,
//!  - `batch.intervalMs` elapsing after the first event was buffered,
//!  - an explicit [`Pipeline::flush`] or [`Pipeline::stop`].
//!
//! Triggers that coincide coalesce into a single flush. A flush sends the pending events in
//! batches of at most `batch.size`, one batch at a time and in push order.
//!
//! # Failure handling
//!
//! A batch that fails to send is retried up to `retry.maxAttempts` times in total, waiting
//! according to [`Backoff`] in between. Once attempts are exhausted, the batch is passed to the
//! [`DropObserver`] together with the last [`SinkError`]. Sink errors never reach the caller of
//! [`Pipeline::push`].
//!
//! The buffer holds at most `maxBufferSize` events. When it is full, the oldest events are evicted
//! and reported to the observer without an error.
#![warn(missing_docs)]

mod config;
mod observer;
mod pipeline;
mod sink;
mod sleep_handle;

pub use self::config::*;
pub use self::observer::*;
pub use self::pipeline::*;
pub use self::sink::*;
pub use self::sleep_handle::*;
