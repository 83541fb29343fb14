use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use evlog_event::DrainContext;
use evlog_log::LogError;
use parking_lot::Mutex;
use tokio::sync::{Notify, mpsc, oneshot};

use crate::config::PipelineConfig;
use crate::observer::{DropObserver, NoopObserver};
use crate::sink::Sink;
use crate::sleep_handle::SleepHandle;

/// State shared between all handles of a pipeline and its worker.
struct Shared {
    config: PipelineConfig,
    queue: Mutex<VecDeque<DrainContext>>,
    wakeup: Notify,
    flushing: AtomicBool,
    stopped: AtomicBool,
    observer: Box<dyn DropObserver>,
}

impl Shared {
    fn drop_events(&self, events: &[DrainContext]) {
        self.observer.on_dropped(events, None);
    }

    /// Removes the next batch from the front of the queue.
    fn take_batch(&self) -> Vec<DrainContext> {
        let mut queue = self.queue.lock();
        let size = queue.len().min(self.config.batch.size.max(1));
        queue.drain(..size).collect()
    }
}

enum Request {
    Flush(oneshot::Sender<()>),
    Stop(oneshot::Sender<()>),
}

/// A handle to a running drain pipeline.
///
/// The pipeline buffers pushed events and hands them to a [`Sink`] in batches. A flush is
/// triggered when the number of pending events reaches the batch size, when the flush interval
/// elapses after the first pending event, or when [`flush`](Self::flush) is called. At most one
/// send is in flight at any time, and batches preserve the push order of their events.
///
/// Failed sends are retried according to the retry configuration. Batches that fail on every
/// attempt, as well as events evicted from a full buffer, are reported to the [`DropObserver`].
///
/// Handles are cheap to clone. Every call to [`start`](Self::start) creates an independent
/// pipeline. If all handles are dropped without calling [`stop`](Self::stop), the worker flushes
/// the remaining events and exits.
///
/// ```
/// use evlog_drain::{Pipeline, PipelineConfig, Sink, SinkError};
/// use evlog_event::{DrainContext, Level, WideEvent};
///
/// struct Stdout;
///
/// #[async_trait::async_trait]
/// impl Sink for Stdout {
///     async fn send(&self, batch: &[DrainContext]) -> Result<(), SinkError> {
///         let _ = batch;
///         Ok(())
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let pipeline = Pipeline::start(PipelineConfig::default(), Stdout);
/// pipeline.push(DrainContext::new(WideEvent::new(Level::Info, "api", "dev")));
/// pipeline.stop().await;
/// # }
/// ```
#[derive(Clone)]
pub struct Pipeline {
    shared: Arc<Shared>,
    tx: mpsc::UnboundedSender<Request>,
}

impl Pipeline {
    /// Spawns a pipeline that ignores dropped events.
    ///
    /// Must be called within a Tokio runtime.
    pub fn start<S>(config: PipelineConfig, sink: S) -> Self
    where
        S: Sink + 'static,
    {
        Self::start_with_observer(config, sink, NoopObserver)
    }

    /// Spawns a pipeline reporting dropped events to `observer`.
    ///
    /// An invalid config is logged as an error and its zero values are replaced with defaults, see
    /// [`PipelineConfig::sanitized`].
    ///
    /// Must be called within a Tokio runtime.
    pub fn start_with_observer<S, O>(config: PipelineConfig, sink: S, observer: O) -> Self
    where
        S: Sink + 'static,
        O: DropObserver + 'static,
    {
        let config = match config.validate() {
            Ok(()) => config,
            Err(error) => {
                evlog_log::error!(
                    error = &error as &dyn std::error::Error,
                    "invalid pipeline config, falling back to defaults"
                );
                config.sanitized()
            }
        };

        let shared = Arc::new(Shared {
            config,
            queue: Mutex::new(VecDeque::new()),
            wakeup: Notify::new(),
            flushing: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            observer: Box::new(observer),
        });

        let (tx, rx) = mpsc::unbounded_channel();

        let worker = Worker {
            shared: Arc::clone(&shared),
            sink: Box::new(sink),
            rx,
            flush_handle: SleepHandle::idle(),
        };
        tokio::spawn(worker.run());

        Self { shared, tx }
    }

    /// Appends an event to the pending queue.
    ///
    /// Never blocks on the sink. If the buffer is full, the oldest pending event is evicted and
    /// reported to the drop observer.
    pub fn push(&self, context: DrainContext) {
        let shared = &self.shared;

        let mut evicted = Vec::new();
        let pending = {
            let mut queue = shared.queue.lock();
            if shared.stopped.load(Ordering::Acquire) {
                drop(queue);
                evlog_log::warn!("drain pipeline stopped, dropping event");
                shared.drop_events(std::slice::from_ref(&context));
                return;
            }

            queue.push_back(context);
            while queue.len() > shared.config.max_buffer_size {
                evicted.extend(queue.pop_front());
            }
            queue.len()
        };

        if !evicted.is_empty() {
            evlog_log::warn!(
                evicted = evicted.len(),
                max_buffer_size = shared.config.max_buffer_size,
                "drain buffer full, dropping oldest events"
            );
            for event in &evicted {
                shared.drop_events(std::slice::from_ref(event));
            }
        }

        if pending == 1 || pending >= shared.config.batch.size {
            shared.wakeup.notify_one();
        }
    }

    /// Requests a flush of everything pending.
    ///
    /// The flush is requested immediately. The returned future resolves once the worker has
    /// drained the queue, or immediately if the pipeline has stopped. If a flush is already in
    /// progress, this one runs after it and picks up everything pushed in the meantime.
    pub fn flush(&self) -> impl Future<Output = ()> + Send + 'static {
        let (done_tx, done_rx) = oneshot::channel();
        let sent = self.tx.send(Request::Flush(done_tx)).is_ok();

        async move {
            if sent {
                done_rx.await.ok();
            }
        }
    }

    /// Flushes all pending events and stops the worker.
    ///
    /// Resolves once the worker has exited. Events pushed afterwards are reported to the drop
    /// observer.
    pub async fn stop(&self) {
        {
            // Under the lock, so every accepted push is part of the final flush.
            let _queue = self.shared.queue.lock();
            self.shared.stopped.store(true, Ordering::Release);
        }

        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Request::Stop(done_tx)).is_ok() {
            done_rx.await.ok();
        }
    }

    /// Returns the number of buffered events that have not been handed to the sink.
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Returns `true` while a batch is being sent.
    pub fn is_flushing(&self) -> bool {
        self.shared.flushing.load(Ordering::Acquire)
    }

    /// Returns the configuration of this pipeline.
    pub fn config(&self) -> &PipelineConfig {
        &self.shared.config
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.shared.config)
            .field("pending", &self.pending())
            .field("flushing", &self.is_flushing())
            .finish()
    }
}

/// Owns the sink and the flush timer of one pipeline.
struct Worker {
    shared: Arc<Shared>,
    sink: Box<dyn Sink>,
    rx: mpsc::UnboundedReceiver<Request>,
    /// An optional timeout to the next scheduled flush.
    flush_handle: SleepHandle,
}

impl Worker {
    async fn run(mut self) {
        evlog_log::debug!("drain pipeline started");

        loop {
            tokio::select! {
                // Timer and explicit requests first, so wake-ups from pushes cannot starve them.
                biased;

                () = &mut self.flush_handle => self.flush().await,
                request = self.rx.recv() => match request {
                    Some(Request::Flush(done)) => {
                        self.flush().await;
                        done.send(()).ok();
                    }
                    Some(Request::Stop(done)) => {
                        self.flush().await;
                        evlog_log::debug!("drain pipeline stopped");
                        done.send(()).ok();
                        return;
                    }
                    None => break,
                },
                () = self.shared.wakeup.notified() => self.handle_wakeup().await,
            }
        }

        // All handles are gone, nothing can be pushed anymore.
        self.flush().await;
        evlog_log::debug!("drain pipeline stopped");
    }

    async fn handle_wakeup(&mut self) {
        let pending = self.shared.queue.lock().len();

        if pending >= self.shared.config.batch.size {
            self.flush().await;
        } else if pending > 0 && self.flush_handle.is_idle() {
            self.flush_handle.set(self.shared.config.flush_interval());
        }
    }

    /// Sends batches until the queue is empty.
    async fn flush(&mut self) {
        self.flush_handle.reset();
        self.shared.flushing.store(true, Ordering::Release);

        loop {
            let batch = self.shared.take_batch();
            if batch.is_empty() {
                break;
            }
            self.send(batch).await;
        }

        self.shared.flushing.store(false, Ordering::Release);

        // Events pushed during the last send and not yet sent keep the timer running.
        if !self.shared.queue.lock().is_empty() && self.flush_handle.is_idle() {
            self.flush_handle.set(self.shared.config.flush_interval());
        }
    }

    async fn send(&self, batch: Vec<DrainContext>) {
        let retry = &self.shared.config.retry;
        let max_attempts = retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            evlog_log::trace!(batch_size = batch.len(), attempt, "sending batch");

            let error = match self.sink.send(&batch).await {
                Ok(()) => {
                    evlog_log::debug!(batch_size = batch.len(), attempt, "flushed batch");
                    return;
                }
                Err(error) => error,
            };

            if attempt >= max_attempts {
                evlog_log::warn!(
                    batch_size = batch.len(),
                    attempts = attempt,
                    "dropping batch after failed attempts: {}",
                    LogError(&error)
                );
                self.shared.observer.on_dropped(&batch, Some(&error));
                return;
            }

            let delay = retry.delay(attempt);
            evlog_log::warn!(
                batch_size = batch.len(),
                attempt,
                delay = ?delay,
                "failed to send batch, retrying: {}",
                LogError(&error)
            );

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
