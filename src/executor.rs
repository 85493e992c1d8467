//! The composite-program executor.
//!
//! [`Executor::run`] drives one program from its first instruction to a
//! final value with an explicit trampoline: take the next instruction,
//! resolve and interpret it, then fold the returned [`Step`] back into
//! the walk. A pure value is recorded, a deferred action is awaited at
//! exactly this point, and a redirect swaps out everything not yet
//! consumed. The loop is the only writer of run state, so handlers never
//! see or touch a mutable controller.

use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, debug_span, trace, Instrument};
use uuid::Uuid;

use crate::program::{Effect, Instruction, Program};
use crate::registry::{Registry, ResolveError};
use crate::step::{ActionError, Step};

/// Errors that terminate a program run.
///
/// Every variant is fatal to the run that produced it. Program meaning
/// depends on strict step ordering, so a step that cannot resolve,
/// interpret, or complete is never skipped over; the run stops with the
/// failing step named.
#[derive(Debug, Error)]
pub enum RunError {
    /// An instruction named an unregistered algebra or operation.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// A handler returned an error instead of a step.
    #[error("handler {algebra}/{operation} failed: {source}")]
    Handler {
        /// Algebra of the failing step.
        algebra: String,
        /// Operation of the failing step.
        operation: String,
        /// The handler's error.
        #[source]
        source: anyhow::Error,
    },
    /// A deferred action reported failure instead of completing.
    #[error("action {algebra}/{operation} failed: {source}")]
    Action {
        /// Algebra of the suspended step.
        algebra: String,
        /// Operation of the suspended step.
        operation: String,
        /// The action's error.
        #[source]
        source: anyhow::Error,
    },
    /// A deferred action's completion signal was dropped before firing.
    #[error("run cancelled while suspended on {algebra}/{operation}")]
    Cancelled {
        /// Algebra of the suspended step.
        algebra: String,
        /// Operation of the suspended step.
        operation: String,
    },
    /// The opt-in step budget ran out. See
    /// [`Executor::with_step_limit`].
    #[error("step limit of {limit} exceeded")]
    StepLimitExceeded {
        /// The configured budget.
        limit: usize,
    },
}

/// Drives composite programs against a frozen [`Registry`].
///
/// The executor holds no per-run state: `run` borrows it immutably, so
/// one executor serves any number of concurrent runs, and cloning it is
/// cheap (the registry is behind an `Arc`).
///
/// # Examples
///
/// ```
/// use remoulade::{Algebra, Effect, Executor, Program, RegistryBuilder, Step};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = RegistryBuilder::new()
///     .register(Algebra::new("math").operation("double", |args| {
///         let n = args.get("n").and_then(|v| v.as_i64()).unwrap_or(0);
///         Ok(Step::pure(n * 2))
///     }))?
///     .build();
///
/// let executor = Executor::new(registry);
/// let program = Program::new().then(Effect::new("math", "double").arg("n", 21));
/// let result = futures::executor::block_on(executor.run(program))?;
/// assert_eq!(result, 42);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Executor {
    registry: Arc<Registry>,
    step_limit: Option<usize>,
}

impl Executor {
    /// Creates an executor owning its registry.
    pub fn new(registry: Registry) -> Self {
        Self::shared(Arc::new(registry))
    }

    /// Creates an executor over an already-shared registry.
    pub fn shared(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            step_limit: None,
        }
    }

    /// Caps the number of instructions a single run may execute.
    ///
    /// Redirects make unbounded programs expressible (a step can always
    /// redirect back to itself), so long-running services put a ceiling
    /// on runs built from untrusted programs. Unlimited by default.
    #[must_use]
    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = Some(limit);
        self
    }

    /// The registry this executor dispatches against.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Runs `program` to completion and returns its final value.
    ///
    /// The final value is the running result left by the last executed
    /// instruction; an empty program yields `Value::Null`. The program
    /// is consumed: rerunning requires a clone, and every rerun
    /// re-performs its actions.
    pub async fn run(&self, program: Program) -> Result<Value, RunError> {
        let run_id = Uuid::new_v4();
        let span = debug_span!("run", %run_id);
        self.run_inner(program).instrument(span).await
    }

    async fn run_inner(&self, program: Program) -> Result<Value, RunError> {
        let mut state = RunState::new(program);
        debug!(instructions = state.remaining(), "run started");

        while let Some(instruction) = state.next() {
            state.charge(self.step_limit)?;
            match instruction {
                Instruction::Value(value) => {
                    trace!("literal step");
                    state.record(value);
                }
                Instruction::Effect(effect) => self.execute(effect, &mut state).await?,
            }
        }

        debug!(steps = state.executed(), "run finished");
        Ok(state.into_result())
    }

    async fn execute(&self, effect: Effect, state: &mut RunState) -> Result<(), RunError> {
        let Effect {
            algebra,
            operation,
            args,
        } = effect;

        let interpreter = self.registry.resolve(&algebra, &operation)?;
        let step = interpreter
            .interpret(&operation, args)
            .map_err(|source| RunError::Handler {
                algebra: algebra.clone(),
                operation: operation.clone(),
                source,
            })?;

        match step {
            Step::Continue(value) => {
                trace!(%algebra, %operation, "step continued");
                state.record(value);
            }
            Step::Suspend(action) => {
                trace!(%algebra, %operation, "step suspended");
                let value = action.perform().await.map_err(|error| match error {
                    ActionError::Cancelled => RunError::Cancelled {
                        algebra: algebra.clone(),
                        operation: operation.clone(),
                    },
                    ActionError::Failed(source) => RunError::Action {
                        algebra: algebra.clone(),
                        operation: operation.clone(),
                        source,
                    },
                })?;
                trace!(%algebra, %operation, "action completed");
                state.record(value);
            }
            Step::Redirect(replacement) => {
                debug!(
                    %algebra,
                    %operation,
                    replaced = state.remaining(),
                    with = replacement.len(),
                    "step redirected"
                );
                state.redirect(replacement);
            }
        }
        Ok(())
    }
}

/// State owned by one run: the remaining instruction queue, the running
/// result, and the number of instructions executed so far.
struct RunState {
    queue: VecDeque<Instruction>,
    result: Value,
    executed: usize,
}

impl RunState {
    fn new(program: Program) -> Self {
        Self {
            queue: program.into_iter().collect(),
            result: Value::Null,
            executed: 0,
        }
    }

    fn next(&mut self) -> Option<Instruction> {
        self.queue.pop_front()
    }

    fn remaining(&self) -> usize {
        self.queue.len()
    }

    fn executed(&self) -> usize {
        self.executed
    }

    fn record(&mut self, value: Value) {
        self.result = value;
    }

    fn redirect(&mut self, replacement: Program) {
        self.queue = replacement.into_iter().collect();
    }

    fn charge(&mut self, limit: Option<usize>) -> Result<(), RunError> {
        self.executed += 1;
        match limit {
            Some(limit) if self.executed > limit => Err(RunError::StepLimitExceeded { limit }),
            _ => Ok(()),
        }
    }

    fn into_result(self) -> Value {
        self.result
    }
}
