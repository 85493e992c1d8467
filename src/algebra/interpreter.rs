// Interpreter trait and the closure-table algebra
//
// An algebra is a named capability domain; an interpreter supplies
// behavior for every operation in one algebra. Interpretation is the
// describe phase: synchronous, effect-free, returning a Step that tells
// the executor what to do next. Anything that actually touches the world
// belongs in the Action a step carries.

use std::collections::HashMap;
use std::fmt;

use anyhow::anyhow;
use serde_json::Value;

use crate::program::Args;
use crate::step::Step;

/// What a handler produces: a [`Step`], or an author-defined error that
/// is fatal to the enclosing run.
pub type HandlerResult = anyhow::Result<Step>;

/// Handler bound to one `(algebra, operation)` pair.
pub type Handler = Box<dyn Fn(Args) -> HandlerResult + Send + Sync>;

/// Supplies behavior for one algebra.
///
/// Registered interpreters are shared across concurrent runs, so
/// `interpret` takes `&self` and must not rely on registration-time
/// mutability. Side effects belong in returned [`Action`]s, never in the
/// interpret call itself.
///
/// [`Action`]: crate::Action
pub trait Interpreter: Send + Sync {
    /// Name of the algebra this interpreter serves.
    fn algebra(&self) -> &str;

    /// Whether `operation` is one of this interpreter's operations.
    fn has_operation(&self, operation: &str) -> bool;

    /// Interprets one operation applied to an argument bag.
    fn interpret(&self, operation: &str, args: Args) -> HandlerResult;
}

/// The closure-table interpreter: a named algebra with one handler per
/// operation.
///
/// This is the everyday way to define an algebra. Operations are plain
/// closures from an argument bag to a [`Step`]; re-registering an
/// operation name replaces the previous handler.
///
/// # Examples
///
/// ```
/// use remoulade::{Algebra, Interpreter, Step};
///
/// let math = Algebra::new("math")
///     .operation("double", |args| {
///         let n = args.get("n").and_then(|v| v.as_i64()).unwrap_or(0);
///         Ok(Step::pure(n * 2))
///     });
/// assert!(math.has_operation("double"));
/// ```
pub struct Algebra {
    name: String,
    operations: HashMap<String, Handler>,
}

impl Algebra {
    /// Creates an empty algebra named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operations: HashMap::new(),
        }
    }

    /// Binds `handler` to `name`, returning the algebra for chaining.
    #[must_use]
    pub fn operation<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Args) -> HandlerResult + Send + Sync + 'static,
    {
        self.operations.insert(name.into(), Box::new(handler));
        self
    }

    /// The registered operation names, in no particular order.
    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }
}

impl Interpreter for Algebra {
    fn algebra(&self) -> &str {
        &self.name
    }

    fn has_operation(&self, operation: &str) -> bool {
        self.operations.contains_key(operation)
    }

    fn interpret(&self, operation: &str, args: Args) -> HandlerResult {
        match self.operations.get(operation) {
            Some(handler) => handler(args),
            // The registry resolves before interpreting, so this only
            // fires when an interpreter is driven directly.
            None => Err(anyhow!(
                "algebra {:?} has no operation {:?}",
                self.name,
                operation
            )),
        }
    }
}

impl fmt::Debug for Algebra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Algebra")
            .field("name", &self.name)
            .field("operations", &self.operations.len())
            .finish()
    }
}

/// Interpreter that answers every operation with `Step::pure(Value::Null)`.
///
/// Useful to satisfy wiring in tests that only exercise program
/// structure, and as a stand-in while a real algebra is under
/// construction.
#[derive(Debug, Clone)]
pub struct NullAlgebra {
    name: String,
}

impl NullAlgebra {
    /// Creates a null interpreter for the algebra named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Interpreter for NullAlgebra {
    fn algebra(&self) -> &str {
        &self.name
    }

    fn has_operation(&self, _operation: &str) -> bool {
        true
    }

    fn interpret(&self, _operation: &str, _args: Args) -> HandlerResult {
        Ok(Step::pure(Value::Null))
    }
}
