// Middleware wrappers for interpreters
//
// Each wrapper adds one cross-cutting concern around any Interpreter
// without touching the algebra's own handlers. Wrappers nest, so a
// registered interpreter can be traced, counted, and recorded at once:
//
//   registry.register(Trace::new(Metrics::new(algebra)))
//
// Wrappers move into the registry at registration. Metrics and Recording
// therefore hand out shared read-side views (MetricsHandle, RecordingLog)
// that stay usable afterwards.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::algebra::interpreter::{HandlerResult, Interpreter};
use crate::program::Args;
use crate::step::StepKind;

/// Tracing middleware: emits a structured event for every interpret call
/// with its outcome kind and latency.
pub struct Trace<I> {
    inner: I,
}

impl<I> Trace<I> {
    /// Wraps `inner` with tracing.
    pub fn new(inner: I) -> Self {
        Self { inner }
    }
}

impl<I: Interpreter> Interpreter for Trace<I> {
    fn algebra(&self) -> &str {
        self.inner.algebra()
    }

    fn has_operation(&self, operation: &str) -> bool {
        self.inner.has_operation(operation)
    }

    fn interpret(&self, operation: &str, args: Args) -> HandlerResult {
        let start = Instant::now();
        trace!(
            algebra = self.inner.algebra(),
            operation,
            args = args.len(),
            "interpret"
        );
        let result = self.inner.interpret(operation, args);
        let elapsed = start.elapsed();
        match &result {
            Ok(step) => debug!(
                algebra = self.inner.algebra(),
                operation,
                kind = %step.kind(),
                ?elapsed,
                "interpreted"
            ),
            Err(error) => warn!(
                algebra = self.inner.algebra(),
                operation,
                %error,
                ?elapsed,
                "handler failed"
            ),
        }
        result
    }
}

#[derive(Default)]
struct Counters {
    continues: AtomicU64,
    suspends: AtomicU64,
    redirects: AtomicU64,
    failures: AtomicU64,
}

/// Metrics middleware: counts interpreted steps by outcome kind.
pub struct Metrics<I> {
    inner: I,
    counters: Arc<Counters>,
}

impl<I> Metrics<I> {
    /// Wraps `inner` with step counters.
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            counters: Arc::new(Counters::default()),
        }
    }

    /// A read-side handle that stays usable after the wrapper moves into
    /// a registry.
    pub fn handle(&self) -> MetricsHandle {
        MetricsHandle {
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<I: Interpreter> Interpreter for Metrics<I> {
    fn algebra(&self) -> &str {
        self.inner.algebra()
    }

    fn has_operation(&self, operation: &str) -> bool {
        self.inner.has_operation(operation)
    }

    fn interpret(&self, operation: &str, args: Args) -> HandlerResult {
        let result = self.inner.interpret(operation, args);
        let counter = match &result {
            Ok(step) => match step.kind() {
                StepKind::Continue => &self.counters.continues,
                StepKind::Suspend => &self.counters.suspends,
                StepKind::Redirect => &self.counters.redirects,
            },
            Err(_) => &self.counters.failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        result
    }
}

/// Read-side view of [`Metrics`] counters.
#[derive(Clone)]
pub struct MetricsHandle {
    counters: Arc<Counters>,
}

impl MetricsHandle {
    /// Steps that yielded a pure value.
    pub fn continues(&self) -> u64 {
        self.counters.continues.load(Ordering::Relaxed)
    }

    /// Steps that suspended on a deferred action.
    pub fn suspends(&self) -> u64 {
        self.counters.suspends.load(Ordering::Relaxed)
    }

    /// Steps that redirected the program.
    pub fn redirects(&self) -> u64 {
        self.counters.redirects.load(Ordering::Relaxed)
    }

    /// Handler calls that returned an error.
    pub fn failures(&self) -> u64 {
        self.counters.failures.load(Ordering::Relaxed)
    }

    /// All successfully interpreted steps.
    pub fn steps(&self) -> u64 {
        self.continues() + self.suspends() + self.redirects()
    }
}

/// One captured interpret call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    /// The handler returned a step of the given kind.
    Interpreted {
        /// Operation that was interpreted.
        operation: String,
        /// Kind of step the handler returned.
        kind: StepKind,
    },
    /// The handler returned an error.
    Failed {
        /// Operation whose handler failed.
        operation: String,
    },
}

/// Recording middleware: captures every interpret call for later
/// verification.
pub struct Recording<I> {
    inner: I,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl<I> Recording<I> {
    /// Wraps `inner` with call recording.
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A shared view of the captured calls that stays usable after the
    /// wrapper moves into a registry.
    pub fn log(&self) -> RecordingLog {
        RecordingLog {
            calls: Arc::clone(&self.calls),
        }
    }
}

impl<I: Interpreter> Interpreter for Recording<I> {
    fn algebra(&self) -> &str {
        self.inner.algebra()
    }

    fn has_operation(&self, operation: &str) -> bool {
        self.inner.has_operation(operation)
    }

    fn interpret(&self, operation: &str, args: Args) -> HandlerResult {
        let result = self.inner.interpret(operation, args);
        let call = match &result {
            Ok(step) => RecordedCall::Interpreted {
                operation: operation.to_owned(),
                kind: step.kind(),
            },
            Err(_) => RecordedCall::Failed {
                operation: operation.to_owned(),
            },
        };
        self.calls.lock().unwrap().push(call);
        result
    }
}

/// Shared view of a [`Recording`] wrapper's captured calls.
#[derive(Clone)]
pub struct RecordingLog {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl RecordingLog {
    /// All captured calls, in interpret order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of captured calls.
    pub fn len(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Whether nothing has been captured yet.
    pub fn is_empty(&self) -> bool {
        self.calls.lock().unwrap().is_empty()
    }

    /// Discards all captured calls.
    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

/// Fault injection middleware for testing.
///
/// With probability `failure_rate`, the wrapped handler is bypassed and
/// the step becomes a deferred action that fails when performed, which
/// is how a flaky backend looks to the executor. Optionally every
/// surviving step is delayed by a fixed duration. Requires the
/// `test-utils` feature.
#[cfg(feature = "test-utils")]
pub struct FaultInjection<I> {
    inner: I,
    failure_rate: f32,
    delay: Option<std::time::Duration>,
    rng: Mutex<rand::rngs::StdRng>,
}

#[cfg(feature = "test-utils")]
impl<I> FaultInjection<I> {
    /// Wraps `inner`, failing roughly `failure_rate` of all calls.
    pub fn new(inner: I, failure_rate: f32) -> Self {
        use rand::SeedableRng;
        Self {
            inner,
            failure_rate,
            delay: None,
            rng: Mutex::new(rand::rngs::StdRng::from_entropy()),
        }
    }

    /// Like [`FaultInjection::new`] but deterministic across runs.
    pub fn with_seed(inner: I, failure_rate: f32, seed: u64) -> Self {
        use rand::SeedableRng;
        Self {
            inner,
            failure_rate,
            delay: None,
            rng: Mutex::new(rand::rngs::StdRng::seed_from_u64(seed)),
        }
    }

    /// Delays every surviving action and pure step by `delay`.
    #[must_use]
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[cfg(feature = "test-utils")]
impl<I: Interpreter> Interpreter for FaultInjection<I> {
    fn algebra(&self) -> &str {
        self.inner.algebra()
    }

    fn has_operation(&self, operation: &str) -> bool {
        self.inner.has_operation(operation)
    }

    fn interpret(&self, operation: &str, args: Args) -> HandlerResult {
        use rand::Rng;

        use crate::step::{ActionError, Step};

        let roll: f32 = self.rng.lock().unwrap().gen();
        if roll < self.failure_rate {
            debug!(
                algebra = self.inner.algebra(),
                operation, "injecting failure"
            );
            return Ok(Step::defer(async {
                Err(ActionError::Failed(anyhow::anyhow!("injected fault")))
            }));
        }

        let step = self.inner.interpret(operation, args)?;
        match (self.delay, step) {
            (Some(delay), Step::Continue(value)) => Ok(Step::defer(async move {
                tokio::time::sleep(delay).await;
                Ok(value)
            })),
            (Some(delay), Step::Suspend(action)) => Ok(Step::defer(async move {
                tokio::time::sleep(delay).await;
                action.perform().await
            })),
            // Redirects describe control flow, not work; never delayed.
            (_, step) => Ok(step),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use crate::algebra::interpreter::Algebra;
    use crate::step::Step;

    use super::*;

    fn echo() -> Algebra {
        Algebra::new("echo")
            .operation("yield", |args| {
                Ok(Step::pure(
                    args.get("value").cloned().unwrap_or(Value::Null),
                ))
            })
            .operation("boom", |_| Err(anyhow::anyhow!("boom")))
    }

    #[test]
    fn trace_is_transparent() {
        let traced = Trace::new(echo());
        assert_eq!(traced.algebra(), "echo");
        assert!(traced.has_operation("yield"));
        let step = traced.interpret("yield", Args::new()).unwrap();
        assert_eq!(step.kind(), StepKind::Continue);
    }

    #[test]
    fn metrics_count_outcomes() {
        let metrics = Metrics::new(echo());
        let handle = metrics.handle();

        metrics.interpret("yield", Args::new()).unwrap();
        metrics.interpret("yield", Args::new()).unwrap();
        metrics.interpret("boom", Args::new()).unwrap_err();

        assert_eq!(handle.continues(), 2);
        assert_eq!(handle.failures(), 1);
        assert_eq!(handle.steps(), 2);
    }

    #[test]
    fn recording_captures_in_order() {
        let recording = Recording::new(echo());
        let log = recording.log();

        recording.interpret("yield", Args::new()).unwrap();
        recording.interpret("boom", Args::new()).unwrap_err();

        assert_eq!(
            log.calls(),
            vec![
                RecordedCall::Interpreted {
                    operation: "yield".to_owned(),
                    kind: StepKind::Continue,
                },
                RecordedCall::Failed {
                    operation: "boom".to_owned(),
                },
            ]
        );

        log.clear();
        assert!(log.is_empty());
    }
}
