//! Remoulade is an interpreter runtime for composite effect programs.
//!
//! A *composite program* is an ordered sequence of instructions, most of
//! them [`Effect`] descriptors: an *algebra* name (a capability domain
//! such as authorization, logging, or storage), an operation within it,
//! and an argument bag. Programs carry no behavior of their own. A
//! [`Registry`] of [`Interpreter`]s supplies behavior per algebra, and an
//! [`Executor`] walks the program, folding each step's outcome back into
//! the run. The same program means different things under different
//! registries, which is the point: domain logic stays declarative while
//! interpreters swap between production, test, and replay wirings.
//!
//! Handlers *describe*, the executor *performs*. A handler returns a
//! [`Step`] and never does I/O itself:
//!
//! * [`Step::Continue`] yields a pure value that becomes the running
//!   result.
//! * [`Step::Suspend`] carries an [`Action`], an inert future the
//!   executor alone awaits; its completion value becomes the running
//!   result.
//! * [`Step::Redirect`] replaces every instruction not yet consumed,
//!   which is how error algebras cut a program short with a terminal
//!   response ([`Step::finish`]).
//!
//! The final value of a run is the running result after the last
//! instruction; an empty program yields `Value::Null`.
//!
//! # Example
//!
//! ```
//! use remoulade::{Algebra, Effect, Executor, Program, RegistryBuilder, Step};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = RegistryBuilder::new()
//!     .register(Algebra::new("accounts").operation("describe", |args| {
//!         let id = args.get("id").cloned().unwrap_or_default();
//!         Ok(Step::pure(json!({ "id": id, "plan": "free" })))
//!     }))?
//!     .register(Algebra::new("audit").operation("note", |args| {
//!         let line = args.get("line").cloned().unwrap_or_default();
//!         // Describe the write; the executor performs it.
//!         Ok(Step::defer(async move {
//!             // A real interpreter would append to a store here.
//!             Ok(line)
//!         }))
//!     }))?
//!     .build();
//!
//! let program = Program::new()
//!     .then(Effect::new("audit", "note").arg("line", "lookup requested"))
//!     .then(Effect::new("accounts", "describe").arg("id", "a-113"));
//!
//! let executor = Executor::new(registry);
//! let result = futures::executor::block_on(executor.run(program))?;
//! assert_eq!(result["plan"], "free");
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! A [`Registry`] is frozen at build time and an [`Executor`] keeps no
//! per-run state, so one executor (or one `Arc<Registry>` behind many)
//! serves concurrent runs without locking. Within a single run,
//! execution is strictly sequential: a suspended step completes before
//! the next instruction is even interpreted.

pub mod algebra;
pub mod executor;
pub mod program;
pub mod registry;
pub mod step;

#[cfg(feature = "test-utils")]
pub use algebra::FaultInjection;
pub use algebra::{
    Algebra, Handler, HandlerResult, Interpreter, Metrics, MetricsHandle, NullAlgebra,
    RecordedCall, Recording, RecordingLog, Trace,
};
pub use executor::{Executor, RunError};
pub use program::{Args, Effect, Instruction, Program};
pub use registry::{Registry, RegistryBuilder, RegistryError, ResolveError};
pub use step::{Action, ActionError, Completion, Step, StepKind};

/// Dynamic value type threaded through programs, arguments, and results.
///
/// Re-exported so downstream code does not need a direct `serde_json`
/// dependency for the common cases.
pub use serde_json::Value;
