use std::error::Error;
use std::fmt;

use async_trait::async_trait;
use evlog_event::DrainContext;

type BoxedError = Box<dyn Error + Send + Sync + 'static>;

/// A failed attempt to send a batch.
///
/// The pipeline does not classify errors. Every error is retried until the attempts are exhausted.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct SinkError {
    message: String,
    #[source]
    source: Option<BoxedError>,
}

impl SinkError {
    /// Creates an error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error wrapping the underlying cause.
    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxedError>,
    {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the message of this error, without its cause.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Transmits batches of events to an external destination.
///
/// The sink owns encoding, transport and timeouts. A sink that never resolves stalls the pipeline
/// that calls it.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Sends one batch. Events are in push order.
    async fn send(&self, batch: &[DrainContext]) -> Result<(), SinkError>;
}

#[async_trait]
impl<S> Sink for std::sync::Arc<S>
where
    S: Sink + ?Sized,
{
    async fn send(&self, batch: &[DrainContext]) -> Result<(), SinkError> {
        (**self).send(batch).await
    }
}

impl fmt::Debug for dyn Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Sink")
    }
}
