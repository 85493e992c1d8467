//! Effect descriptors, the unit instruction of a composite program.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Argument bag carried by an [`Effect`]: string keys to arbitrary values.
pub type Args = serde_json::Map<String, Value>;

/// A single dispatched instruction of a composite program.
///
/// An effect names an *algebra* (a capability domain such as `"log"` or
/// `"userRecords"`), an *operation* within that algebra, and an argument
/// bag. It describes *what* should happen; the interpreter registered for
/// the algebra decides *how*, and the executor decides *when*.
///
/// Effects are plain data. They serialize to
/// `{"algebra": …, "operation": …, "args": {…}}` and are immutable once
/// built: the builder produces them, the executor consumes them.
///
/// At execution time `(algebra, operation)` must resolve to exactly one
/// registered handler, otherwise the whole run fails with a
/// [`ResolveError`](crate::registry::ResolveError).
///
/// # Examples
///
/// ```
/// use remoulade::Effect;
///
/// let effect = Effect::new("log", "warn").arg("message", "low disk space");
/// assert_eq!(effect.algebra, "log");
/// assert_eq!(effect.args["message"], "low disk space");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    /// Name of the algebra this effect belongs to.
    pub algebra: String,
    /// Operation within the algebra.
    pub operation: String,
    /// Arguments handed to the operation's handler.
    #[serde(default, skip_serializing_if = "Args::is_empty")]
    pub args: Args,
}

impl Effect {
    /// Creates an effect with an empty argument bag.
    pub fn new(algebra: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            algebra: algebra.into(),
            operation: operation.into(),
            args: Args::new(),
        }
    }

    /// Adds one argument, returning the effect for chaining.
    #[must_use]
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Replaces the whole argument bag.
    #[must_use]
    pub fn with_args(mut self, args: Args) -> Self {
        self.args = args;
        self
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.algebra, self.operation)
    }
}
