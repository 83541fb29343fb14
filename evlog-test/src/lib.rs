//! Helpers for testing sampling and draining.
//!
//! When writing tests, keep the following points in mind:
//!
//!  - In every test, call [`setup`]. This will set up the logger so that all console output is
//!    captured by the test runner. All logs emitted with [`evlog_log`] will show up for test
//!    failures or when run with `--nocapture`.
//!  - Pipelines spawn a worker task. Use `#[tokio::test(start_paused = true)]` and drive time
//!    explicitly with [`tokio::time::advance`], then call [`settle`] to let the worker run.
//!
//! # Example
//!
//! ```no_run
//! #[test]
//! fn my_test() {
//!     evlog_test::setup();
//!
//!     evlog_log::debug!("hello, world!");
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use evlog_drain::{DropObserver, Sink, SinkError};
use evlog_event::{DrainContext, Level, WideEvent};
use parking_lot::Mutex;

/// Setup the test environment.
///
///  - Initializes logs: The logger only captures logs from this crate and mutes all other logs.
pub fn setup() {
    evlog_log::init_test!();
}

/// Yields to the runtime until spawned tasks had a chance to process their wake-ups.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Creates a drain context whose event carries `seq` as sequence number.
pub fn numbered(seq: u64) -> DrainContext {
    let event = WideEvent::new(Level::Info, "test", "test").with_field("seq", seq);
    DrainContext::new(event)
}

/// Returns the sequence numbers of events created with [`numbered`].
pub fn seqs(events: &[DrainContext]) -> Vec<u64> {
    events
        .iter()
        .filter_map(|context| context.event.get("seq").and_then(|v| v.as_u64()))
        .collect()
}

#[derive(Debug, Default)]
struct Recorded {
    calls: AtomicUsize,
    batches: Mutex<Vec<Vec<DrainContext>>>,
}

/// A sink that records every batch it successfully receives.
///
/// Clones share their records.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    recorded: Arc<Recorded>,
    delay: Option<Duration>,
}

impl RecordingSink {
    /// Creates a sink that accepts batches immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink that takes `delay` to accept each batch.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Returns the number of calls to `send`, successful or not.
    pub fn calls(&self) -> usize {
        self.recorded.calls.load(Ordering::SeqCst)
    }

    /// Returns all received batches in order.
    pub fn batches(&self) -> Vec<Vec<DrainContext>> {
        self.recorded.batches.lock().clone()
    }

    /// Returns the sizes of all received batches.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.recorded.batches.lock().iter().map(Vec::len).collect()
    }

    /// Returns all received events, flattened in order.
    pub fn events(&self) -> Vec<DrainContext> {
        self.recorded.batches.lock().concat()
    }

    async fn record(&self, batch: &[DrainContext]) {
        self.recorded.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.recorded.batches.lock().push(batch.to_vec());
    }
}

#[async_trait]
impl Sink for RecordingSink {
    async fn send(&self, batch: &[DrainContext]) -> Result<(), SinkError> {
        self.record(batch).await;
        Ok(())
    }
}

/// A sink that fails a fixed number of times before it accepts batches.
///
/// Clones share their state.
#[derive(Clone, Debug)]
pub struct FlakySink {
    failures_left: Arc<AtomicUsize>,
    attempts: Arc<AtomicUsize>,
    inner: RecordingSink,
}

impl FlakySink {
    /// Creates a sink failing the first `failures` calls.
    pub fn new(failures: usize) -> Self {
        Self {
            failures_left: Arc::new(AtomicUsize::new(failures)),
            attempts: Arc::new(AtomicUsize::new(0)),
            inner: RecordingSink::new(),
        }
    }

    /// Creates a sink that never accepts a batch.
    pub fn always_failing() -> Self {
        Self::new(usize::MAX)
    }

    /// Returns the number of calls to `send`, successful or not.
    pub fn calls(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Returns the batches that were accepted.
    pub fn accepted(&self) -> Vec<Vec<DrainContext>> {
        self.inner.batches()
    }
}

#[async_trait]
impl Sink for FlakySink {
    async fn send(&self, batch: &[DrainContext]) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                left.checked_sub(1)
            })
            .is_ok();

        if failed {
            return Err(SinkError::new("simulated sink failure"));
        }

        self.inner.send(batch).await
    }
}

/// One notification received by a [`DropRecorder`].
#[derive(Clone, Debug)]
pub struct RecordedDrop {
    /// The dropped events.
    pub events: Vec<DrainContext>,
    /// The message of the terminal send error, if the drop was caused by one.
    pub error: Option<String>,
}

/// A drop observer recording every notification.
///
/// Clones share their records.
#[derive(Clone, Debug, Default)]
pub struct DropRecorder {
    drops: Arc<Mutex<Vec<RecordedDrop>>>,
}

impl DropRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all notifications in order.
    pub fn drops(&self) -> Vec<RecordedDrop> {
        self.drops.lock().clone()
    }

    /// Returns the number of notifications.
    pub fn count(&self) -> usize {
        self.drops.lock().len()
    }

    /// Returns all dropped events, flattened in order.
    pub fn events(&self) -> Vec<DrainContext> {
        self.drops
            .lock()
            .iter()
            .flat_map(|drop| drop.events.iter().cloned())
            .collect()
    }
}

impl DropObserver for DropRecorder {
    fn on_dropped(&self, events: &[DrainContext], error: Option<&SinkError>) {
        self.drops.lock().push(RecordedDrop {
            events: events.to_vec(),
            error: error.map(|error| error.message().to_owned()),
        });
    }
}
