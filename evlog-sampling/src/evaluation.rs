//! Evaluation of head and tail sampling.

use std::fmt;
use std::sync::Arc;

use evlog_event::{Level, WideEvent};
use serde_json::{Map, Value};

use crate::condition::Outcome;
use crate::config::SamplingConfig;
use crate::random::{RandomSource, ThreadRandom};

/// The context passed to a [`KeepCallback`].
///
/// Grants read access to the outcome and the fields accumulated on the event. The only thing a
/// callback can change is [`should_keep`](Self::should_keep).
#[derive(Debug)]
pub struct TailSamplingContext<'a> {
    outcome: Outcome<'a>,
    context: &'a Map<String, Value>,
    /// Set to `true` to force the event to be kept.
    pub should_keep: bool,
}

impl<'a> TailSamplingContext<'a> {
    /// Creates a context with `should_keep` unset.
    pub fn new(outcome: Outcome<'a>, context: &'a Map<String, Value>) -> Self {
        Self {
            outcome,
            context,
            should_keep: false,
        }
    }

    /// The HTTP response status.
    pub fn status(&self) -> Option<u16> {
        self.outcome.status
    }

    /// The duration of the unit of work in milliseconds.
    pub fn duration_ms(&self) -> Option<u64> {
        self.outcome.duration_ms
    }

    /// The request path.
    pub fn path(&self) -> Option<&'a str> {
        self.outcome.path
    }

    /// The request method.
    pub fn method(&self) -> Option<&'a str> {
        self.outcome.method
    }

    /// The fields accumulated on the event.
    pub fn context(&self) -> &'a Map<String, Value> {
        self.context
    }
}

/// A custom tail sampling rule.
///
/// Closures taking `&mut TailSamplingContext` implement this trait.
pub trait KeepCallback: Send + Sync {
    /// Inspects the context and sets `should_keep` to force keeping the event.
    fn keep(&self, ctx: &mut TailSamplingContext<'_>);
}

impl<F> KeepCallback for F
where
    F: Fn(&mut TailSamplingContext<'_>) + Send + Sync,
{
    fn keep(&self, ctx: &mut TailSamplingContext<'_>) {
        self(ctx)
    }
}

/// Why an event was kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeepReason {
    /// Head sampling kept the event.
    HeadSampled,
    /// The keep rule at this index matched.
    Rule(usize),
    /// The custom keep callback requested the event.
    Custom,
}

/// The result of [`SamplingEngine::decide`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SamplingDecision {
    /// The event is kept and should be drained.
    Keep(KeepReason),
    /// The event is dropped.
    Drop,
}

impl SamplingDecision {
    /// Returns `true` if the event is kept.
    pub fn is_kept(&self) -> bool {
        matches!(self, Self::Keep(_))
    }

    /// Returns `true` if the event is dropped.
    pub fn is_dropped(&self) -> bool {
        !self.is_kept()
    }
}

/// Decides for every finished event whether it is kept.
///
/// Evaluation runs in two stages:
///
///  1. **Head sampling** draws a random number per event and keeps it with the probability
///     configured for its level in [`SampleRates`](crate::SampleRates).
///  2. **Tail sampling** evaluates every [`KeepRule`](crate::KeepRule) and the custom
///     [`KeepCallback`] against the outcome. Any match forces the event to be kept.
///
/// Tail sampling can only upgrade a drop to a keep. The engine is immutable and can be shared
/// across threads.
///
/// ```
/// use evlog_event::{Level, WideEvent};
/// use evlog_sampling::{KeepRule, Outcome, SamplingConfig, SamplingEngine};
///
/// let mut config = SamplingConfig::default();
/// config.rates.info = Some(0);
/// config.keep.push(KeepRule::status(400));
///
/// let engine = SamplingEngine::new(config);
/// let event = WideEvent::new(Level::Info, "api", "prod");
///
/// assert!(engine.decide(&event, &Outcome::default().with_status(200)).is_dropped());
/// assert!(engine.decide(&event, &Outcome::default().with_status(404)).is_kept());
/// ```
#[derive(Clone)]
pub struct SamplingEngine {
    config: SamplingConfig,
    random: Arc<dyn RandomSource>,
    custom_keep: Option<Arc<dyn KeepCallback>>,
}

impl SamplingEngine {
    /// Creates an engine drawing from [`ThreadRandom`].
    pub fn new(config: SamplingConfig) -> Self {
        Self {
            config,
            random: Arc::new(ThreadRandom),
            custom_keep: None,
        }
    }

    /// Replaces the source of randomness.
    pub fn with_random(mut self, random: impl RandomSource + 'static) -> Self {
        self.random = Arc::new(random);
        self
    }

    /// Sets a closure as custom keep rule.
    pub fn with_keep<F>(self, callback: F) -> Self
    where
        F: Fn(&mut TailSamplingContext<'_>) + Send + Sync + 'static,
    {
        self.with_keep_callback(Arc::new(callback))
    }

    /// Sets the custom keep rule.
    pub fn with_keep_callback(mut self, callback: Arc<dyn KeepCallback>) -> Self {
        self.custom_keep = Some(callback);
        self
    }

    /// Returns the configuration of this engine.
    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    /// Runs head sampling for a level.
    pub fn head_sample(&self, level: Level) -> bool {
        let rate = self.config.rates.effective(level);

        match rate {
            0 => false,
            100 => true,
            rate => {
                let random_number = self.random.draw();
                evlog_log::trace!(
                    %level,
                    rate,
                    random_number,
                    "applying head sampling"
                );
                random_number < f64::from(rate)
            }
        }
    }

    /// Runs tail sampling, returning the reason if the event must be kept.
    pub fn tail_sample(&self, event: &WideEvent, outcome: &Outcome<'_>) -> Option<KeepReason> {
        let rule = self
            .config
            .keep
            .iter()
            .position(|rule| rule.matches(outcome))
            .map(KeepReason::Rule);

        let custom = self.custom_keep.as_ref().and_then(|callback| {
            let mut ctx = TailSamplingContext::new(*outcome, event.fields());
            callback.keep(&mut ctx);
            ctx.should_keep.then_some(KeepReason::Custom)
        });

        rule.or(custom)
    }

    /// Decides whether to keep an event.
    ///
    /// The accumulated context passed to the custom keep rule is the set of fields on the event.
    pub fn decide(&self, event: &WideEvent, outcome: &Outcome<'_>) -> SamplingDecision {
        let head = self.head_sample(event.level);
        let tail = self.tail_sample(event, outcome);

        let decision = match (head, tail) {
            (true, _) => SamplingDecision::Keep(KeepReason::HeadSampled),
            (false, Some(reason)) => SamplingDecision::Keep(reason),
            (false, None) => SamplingDecision::Drop,
        };

        evlog_log::trace!(?decision, level = %event.level, "sampling decision");
        decision
    }
}

impl fmt::Debug for SamplingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SamplingEngine")
            .field("config", &self.config)
            .field("custom_keep", &self.custom_keep.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for SamplingEngine {
    fn default() -> Self {
        Self::new(SamplingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::condition::KeepRule;
    use crate::random::{FixedRandom, SeededRandom};

    fn event(level: Level) -> WideEvent {
        WideEvent::new(level, "api", "test")
    }

    fn engine_with_info_rate(rate: i32) -> SamplingEngine {
        let mut config = SamplingConfig::default();
        config.rates.info = Some(rate);
        SamplingEngine::new(config)
    }

    #[test]
    fn test_rate_zero_drops_all() {
        let engine = engine_with_info_rate(0);
        let info = event(Level::Info);
        for _ in 0..1_000 {
            assert!(engine.decide(&info, &Outcome::default()).is_dropped());
        }
    }

    #[test]
    fn test_rate_hundred_keeps_all() {
        let engine = engine_with_info_rate(100);
        let info = event(Level::Info);
        for _ in 0..1_000 {
            assert_eq!(
                engine.decide(&info, &Outcome::default()),
                SamplingDecision::Keep(KeepReason::HeadSampled)
            );
        }
    }

    #[test]
    fn test_rate_ten_is_close_to_ten_percent() {
        let engine = engine_with_info_rate(10).with_random(SeededRandom::new(1234));
        let info = event(Level::Info);

        let kept = (0..10_000)
            .filter(|_| engine.decide(&info, &Outcome::default()).is_kept())
            .count();

        assert!((800..=1200).contains(&kept), "kept {kept} of 10000");
    }

    #[test]
    fn test_draw_boundary() {
        let info = event(Level::Info);

        let engine = engine_with_info_rate(10).with_random(FixedRandom(9.999));
        assert!(engine.decide(&info, &Outcome::default()).is_kept());

        let engine = engine_with_info_rate(10).with_random(FixedRandom(10.0));
        assert!(engine.decide(&info, &Outcome::default()).is_dropped());
    }

    #[test]
    fn test_unset_levels_are_kept() {
        let engine = engine_with_info_rate(0);
        for level in [Level::Debug, Level::Warn, Level::Error] {
            assert!(engine.decide(&event(level), &Outcome::default()).is_kept());
        }
    }

    #[test]
    fn test_tail_status_rescues_head_drop() {
        let mut config = SamplingConfig::default();
        config.rates.info = Some(0);
        config.keep.push(KeepRule::status(400));
        let engine = SamplingEngine::new(config);

        let decision = engine.decide(&event(Level::Info), &Outcome::default().with_status(404));
        assert_eq!(decision, SamplingDecision::Keep(KeepReason::Rule(0)));
    }

    #[test]
    fn test_tail_duration_rescues_head_drop() {
        let mut config = SamplingConfig::default();
        config.rates.info = Some(0);
        config.keep.push(KeepRule::status(400));
        config.keep.push(KeepRule::duration(500));
        let engine = SamplingEngine::new(config);

        let info = event(Level::Info);
        let decision = engine.decide(&info, &Outcome::default().with_duration_ms(600));
        assert_eq!(decision, SamplingDecision::Keep(KeepReason::Rule(1)));

        let decision = engine.decide(&info, &Outcome::default().with_duration_ms(100));
        assert_eq!(decision, SamplingDecision::Drop);
    }

    #[test]
    fn test_tail_never_downgrades() {
        let mut config = SamplingConfig::default();
        config.keep.push(KeepRule::status(500));
        let engine = SamplingEngine::new(config).with_keep(|ctx| ctx.should_keep = false);

        let decision = engine.decide(&event(Level::Info), &Outcome::default().with_status(200));
        assert_eq!(decision, SamplingDecision::Keep(KeepReason::HeadSampled));
    }

    #[test]
    fn test_custom_keep_reads_context() {
        let engine = engine_with_info_rate(0).with_keep(|ctx| {
            let premium = ctx
                .context()
                .get("user")
                .and_then(|user| user.get("premium"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if premium {
                ctx.should_keep = true;
            }
        });

        let premium = event(Level::Info).with_field("user", json!({"premium": true}));
        let regular = event(Level::Info).with_field("user", json!({"premium": false}));

        assert_eq!(
            engine.decide(&premium, &Outcome::default()),
            SamplingDecision::Keep(KeepReason::Custom)
        );
        assert!(engine.decide(&regular, &Outcome::default()).is_dropped());
    }

    #[test]
    fn test_custom_keep_sees_outcome() {
        let engine = engine_with_info_rate(0).with_keep(|ctx| {
            if ctx.path() == Some("/checkout") && ctx.method() == Some("POST") {
                ctx.should_keep = true;
            }
        });

        let info = event(Level::Info);
        let outcome = Outcome {
            path: Some("/checkout"),
            method: Some("POST"),
            ..Default::default()
        };
        assert!(engine.decide(&info, &outcome).is_kept());
        assert!(engine.decide(&info, &outcome.with_path("/cart")).is_dropped());
    }

    #[test]
    fn test_rules_take_precedence_in_reason() {
        let mut config = SamplingConfig::default();
        config.rates.info = Some(0);
        config.keep.push(KeepRule::path("/api/**"));
        let engine = SamplingEngine::new(config).with_keep(|ctx| ctx.should_keep = true);

        let decision = engine.decide(&event(Level::Info), &Outcome::default().with_path("/api/x"));
        assert_eq!(decision, SamplingDecision::Keep(KeepReason::Rule(0)));
    }
}
