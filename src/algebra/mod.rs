//! Algebras: named capability domains and the interpreters that serve
//! them.
//!
//! The open set of algebra names is given meaning entirely by
//! registration. Nothing here is hard-wired to authorization, storage, or
//! any other concrete domain; consumers define their own algebras as
//! closure tables ([`Algebra`]) or as [`Interpreter`] implementations,
//! and stack middleware on top.

/// The [`Interpreter`] trait and the closure-table [`Algebra`].
pub mod interpreter;
/// Composable wrappers adding cross-cutting concerns to interpreters.
pub mod middleware;

#[cfg(feature = "test-utils")]
pub use middleware::FaultInjection;
pub use interpreter::{Algebra, Handler, HandlerResult, Interpreter, NullAlgebra};
pub use middleware::{Metrics, MetricsHandle, RecordedCall, Recording, RecordingLog, Trace};
