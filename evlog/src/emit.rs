use std::fmt;

use evlog_config::Config;
use evlog_drain::{DropObserver, NoopObserver, Pipeline, Sink};
use evlog_event::DrainContext;
use evlog_sampling::{Outcome, RoutesConfig, SamplingDecision, SamplingEngine};

use crate::enrich::{EnrichContext, Enricher};

/// The outcome of a finished request, reported alongside its event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequestOutcome {
    /// The HTTP response status.
    pub status: Option<u16>,
    /// The duration of the request in milliseconds.
    pub duration_ms: Option<u64>,
    /// The size of the response body in bytes.
    pub response_bytes: Option<u64>,
}

impl RequestOutcome {
    /// Creates an empty outcome.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the response status.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the duration.
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Sets the response size.
    pub fn with_response_bytes(mut self, bytes: u64) -> Self {
        self.response_bytes = Some(bytes);
        self
    }
}

/// Routes finished events through sampling and enrichment into a drain pipeline.
///
/// This is the entry point called by request-scoped loggers once a unit of work has finished.
pub struct Evlog {
    engine: SamplingEngine,
    pipeline: Pipeline,
    routes: RoutesConfig,
    enrichers: Vec<Box<dyn Enricher>>,
}

impl Evlog {
    /// Creates an instance from an engine and a running pipeline.
    pub fn new(engine: SamplingEngine, pipeline: Pipeline) -> Self {
        Self {
            engine,
            pipeline,
            routes: RoutesConfig::default(),
            enrichers: Vec::new(),
        }
    }

    /// Starts a pipeline draining into `sink` and builds an instance from the config.
    ///
    /// Configs loaded through [`Config::from_path`] are already validated. For a hand-built config
    /// with zero drain sizes, the pipeline logs an error and uses defaults for those values.
    ///
    /// Must be called within a Tokio runtime.
    pub fn from_config<S>(config: &Config, sink: S) -> Self
    where
        S: Sink + 'static,
    {
        Self::from_config_with_observer(config, sink, NoopObserver)
    }

    /// Like [`from_config`](Self::from_config), reporting dropped events to `observer`.
    pub fn from_config_with_observer<S, O>(config: &Config, sink: S, observer: O) -> Self
    where
        S: Sink + 'static,
        O: DropObserver + 'static,
    {
        let engine = SamplingEngine::new(config.sampling.clone());
        let pipeline = Pipeline::start_with_observer(config.drain, sink, observer);
        Self::new(engine, pipeline).with_routes(config.routes.clone())
    }

    /// Sets route filtering and service names.
    pub fn with_routes(mut self, routes: RoutesConfig) -> Self {
        self.routes = routes;
        self
    }

    /// Appends an enricher. Enrichers run in the order they were added.
    pub fn with_enricher(mut self, enricher: impl Enricher + 'static) -> Self {
        self.enrichers.push(Box::new(enricher));
        self
    }

    /// Replaces the sampling engine.
    pub fn with_engine(mut self, engine: SamplingEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Returns the sampling engine.
    pub fn engine(&self) -> &SamplingEngine {
        &self.engine
    }

    /// Returns the drain pipeline.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Decides on a finished event and, if kept, pushes it into the pipeline.
    ///
    /// The outcome is written to the event as `status` and `durationMs` before sampling. Returns
    /// `None` if the route filter excludes the request path, otherwise the sampling decision.
    pub fn emit(&self, mut context: DrainContext, outcome: RequestOutcome) -> Option<SamplingDecision> {
        if let Some(path) = context.path() {
            if !self.routes.filter.should_log(path) {
                evlog_log::trace!(path, "skipping event for filtered route");
                return None;
            }
        }

        let service = context
            .path()
            .and_then(|path| self.routes.services.service_for(path));
        if let Some(service) = service {
            context.event.service = service.to_owned();
        }

        if let Some(status) = outcome.status {
            context.event.set("status", status);
        }
        if let Some(duration_ms) = outcome.duration_ms {
            context.event.set("durationMs", duration_ms);
        }

        let decision = self
            .engine
            .decide(&context.event, &Outcome::from_context(&context));

        if decision.is_dropped() {
            return Some(decision);
        }

        if !self.enrichers.is_empty() {
            let (event, request, headers) = context.parts_mut();
            let mut ctx = EnrichContext {
                event,
                request,
                headers,
                outcome: &outcome,
            };
            for enricher in &self.enrichers {
                enricher.enrich(&mut ctx);
            }
        }

        self.pipeline.push(context);
        Some(decision)
    }

    /// Flushes all pending events.
    pub async fn flush(&self) {
        self.pipeline.flush().await
    }

    /// Flushes all pending events and stops the pipeline.
    pub async fn shutdown(&self) {
        self.pipeline.stop().await;
        evlog_log::debug!("evlog shut down");
    }
}

impl fmt::Debug for Evlog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evlog")
            .field("engine", &self.engine)
            .field("pipeline", &self.pipeline)
            .field("routes", &self.routes)
            .field("enrichers", &self.enrichers.len())
            .finish()
    }
}
