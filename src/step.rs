//! Step outcomes and deferred actions.
//!
//! Handlers *describe*, the executor *performs*. A handler returns a
//! [`Step`] telling the executor how the walk proceeds, and any side
//! effect it wants performed travels inside an [`Action`]: an inert
//! future that does nothing until the executor polls it. This split keeps
//! handler code synchronous and testable while the executor stays the
//! single place real effects happen.

use std::fmt;
use std::future::Future;

use futures::channel::oneshot;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use thiserror::Error;

use crate::program::{Instruction, Program};

/// Outcome of interpreting one program step.
///
/// The three variants are the full control-flow vocabulary of a run:
/// yield a value and advance, suspend on a deferred action, or replace
/// the rest of the program. A handler picks exactly one per step; there
/// is no way to both redirect and yield, so conflicting outcomes are
/// unrepresentable rather than checked at runtime.
pub enum Step {
    /// A pure value. It becomes the running result and the walk advances.
    Continue(Value),
    /// A deferred side effect. The executor awaits it before advancing,
    /// and its completion value becomes the running result.
    Suspend(Action),
    /// Replaces the remainder of the current program. Already-consumed
    /// steps are unaffected; the running result carries over until a
    /// later step changes it.
    Redirect(Program),
}

impl Step {
    /// A pure, already-known result.
    pub fn pure(value: impl Into<Value>) -> Self {
        Step::Continue(value.into())
    }

    /// A deferred side effect built from a future.
    ///
    /// The future is not polled here; nothing happens until the executor
    /// reaches this step and awaits it.
    pub fn defer<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, ActionError>> + Send + 'static,
    {
        Step::Suspend(Action::from_future(future))
    }

    /// A deferred side effect from an already-built [`Action`], such as
    /// the action half of an [`Action::completion`] pair.
    pub fn suspend(action: Action) -> Self {
        Step::Suspend(action)
    }

    /// Replaces the rest of the program with `program`.
    pub fn redirect(program: impl Into<Program>) -> Self {
        Step::Redirect(program.into())
    }

    /// Ends the run with `value` as its final result.
    ///
    /// Sugar for redirecting to a one-step program whose only instruction
    /// is the literal `value`. This is the early-exit shape error
    /// algebras use to cut a program short with a terminal response.
    pub fn finish(value: impl Into<Value>) -> Self {
        Step::Redirect(Program::new().then(Instruction::Value(value.into())))
    }

    /// Which kind of step this is, for middleware and instrumentation.
    pub fn kind(&self) -> StepKind {
        match self {
            Step::Continue(_) => StepKind::Continue,
            Step::Suspend(_) => StepKind::Suspend,
            Step::Redirect(_) => StepKind::Redirect,
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Continue(value) => f.debug_tuple("Continue").field(value).finish(),
            Step::Suspend(action) => f.debug_tuple("Suspend").field(action).finish(),
            Step::Redirect(program) => f.debug_tuple("Redirect").field(program).finish(),
        }
    }
}

/// Discriminant of [`Step`], cheap to carry through logs and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// The step yielded a pure value.
    Continue,
    /// The step suspended on a deferred action.
    Suspend,
    /// The step replaced the remaining program.
    Redirect,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepKind::Continue => "continue",
            StepKind::Suspend => "suspend",
            StepKind::Redirect => "redirect",
        };
        f.write_str(name)
    }
}

/// Why a deferred action produced no value.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The action ran and reported failure.
    #[error("action failed: {0}")]
    Failed(#[from] anyhow::Error),
    /// The completion signal was dropped before it fired.
    #[error("action cancelled before completion")]
    Cancelled,
}

/// A deferred, one-shot side effect.
///
/// Constructing an action performs nothing: the wrapped future stays
/// inert until polled, and the executor is the only poller during a run.
/// An action resolves to the value the run continues with, or to an
/// [`ActionError`] that fails the run.
pub struct Action {
    future: BoxFuture<'static, Result<Value, ActionError>>,
}

impl Action {
    /// Wraps a future as a deferred action.
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, ActionError>> + Send + 'static,
    {
        Self {
            future: future.boxed(),
        }
    }

    /// An action resolved from outside through a [`Completion`] signal.
    ///
    /// This is the bridge for callback-shaped interfaces: hand the
    /// completion to whatever will eventually produce the value and
    /// return the action from the handler. Dropping the completion
    /// without firing it resolves the action to
    /// [`ActionError::Cancelled`].
    pub fn completion() -> (Self, Completion) {
        let (tx, rx) = oneshot::channel();
        let action = Self::from_future(async move {
            match rx.await {
                Ok(result) => result,
                Err(oneshot::Canceled) => Err(ActionError::Cancelled),
            }
        });
        (action, Completion { tx })
    }

    /// Runs the action to completion.
    ///
    /// The executor calls this at the suspension point of a run. It is
    /// also the way a unit test performs a described action on purpose.
    pub async fn perform(self) -> Result<Value, ActionError> {
        self.future.await
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action").finish_non_exhaustive()
    }
}

/// One-shot completion signal paired with an [`Action::completion`]
/// action.
pub struct Completion {
    tx: oneshot::Sender<Result<Value, ActionError>>,
}

impl Completion {
    /// Resolves the paired action with `value`.
    pub fn succeed(self, value: impl Into<Value>) {
        let _ = self.tx.send(Ok(value.into()));
    }

    /// Fails the paired action.
    pub fn fail(self, error: impl Into<anyhow::Error>) {
        let _ = self.tx.send(Err(ActionError::Failed(error.into())));
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use futures::executor::block_on;
    use serde_json::json;

    use super::*;

    #[test]
    fn kinds_match_variants() {
        assert_eq!(Step::pure(1).kind(), StepKind::Continue);
        assert_eq!(
            Step::defer(async { Ok(Value::Null) }).kind(),
            StepKind::Suspend
        );
        assert_eq!(Step::redirect(Program::new()).kind(), StepKind::Redirect);
        assert_eq!(Step::finish(json!({"status": 401})).kind(), StepKind::Redirect);
    }

    #[test]
    fn finish_builds_a_single_literal_step() {
        match Step::finish(json!({"status": 401})) {
            Step::Redirect(program) => {
                assert_eq!(program.len(), 1);
            }
            other => panic!("expected redirect, got {other:?}"),
        }
    }

    #[test]
    fn deferred_action_is_inert_until_performed() {
        let touched = Arc::new(AtomicBool::new(false));
        let probe = Arc::clone(&touched);
        let action = Action::from_future(async move {
            probe.store(true, Ordering::SeqCst);
            Ok(json!("done"))
        });

        assert!(!touched.load(Ordering::SeqCst));
        let value = block_on(action.perform()).unwrap();
        assert!(touched.load(Ordering::SeqCst));
        assert_eq!(value, "done");
    }

    #[test]
    fn completion_resolves_the_action() {
        let (action, completion) = Action::completion();
        completion.succeed(json!({"rows": 1}));
        let value = block_on(action.perform()).unwrap();
        assert_eq!(value["rows"], 1);
    }

    #[test]
    fn dropped_completion_cancels() {
        let (action, completion) = Action::completion();
        drop(completion);
        assert!(matches!(
            block_on(action.perform()),
            Err(ActionError::Cancelled)
        ));
    }

    #[test]
    fn failed_completion_carries_the_error() {
        let (action, completion) = Action::completion();
        completion.fail(anyhow::anyhow!("backend unreachable"));
        match block_on(action.perform()) {
            Err(ActionError::Failed(error)) => {
                assert!(error.to_string().contains("unreachable"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
