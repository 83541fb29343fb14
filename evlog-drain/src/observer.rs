use evlog_event::DrainContext;

use crate::SinkError;

/// Receives events that the pipeline gives up on.
///
/// Events are dropped for two reasons:
///
///  - The buffer is full. The oldest pending event is evicted and reported without an error.
///  - Sending a batch failed on every attempt. The batch is reported with the last error.
///
/// Observers run on the thread that drops the events and must not block.
pub trait DropObserver: Send + Sync {
    /// Called with the dropped events and the terminal send error, if any.
    fn on_dropped(&self, events: &[DrainContext], error: Option<&SinkError>);
}

impl<F> DropObserver for F
where
    F: Fn(&[DrainContext], Option<&SinkError>) + Send + Sync,
{
    fn on_dropped(&self, events: &[DrainContext], error: Option<&SinkError>) {
        self(events, error)
    }
}

/// Ignores dropped events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl DropObserver for NoopObserver {
    fn on_dropped(&self, _events: &[DrainContext], _error: Option<&SinkError>) {}
}
