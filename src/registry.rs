//! The algebra registry: validated registration, then read-only dispatch.
//!
//! Registration and execution are separate phases with separate types.
//! [`RegistryBuilder`] is the only place interpreters are added and the
//! only place registration can fail; [`Registry`] is frozen, so sharing
//! it across concurrent runs needs no locking.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::algebra::Interpreter;

/// Registration-time errors, surfaced while a [`RegistryBuilder`] is
/// still being assembled.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// An interpreter for this algebra name is already registered.
    #[error("algebra {algebra:?} is already registered")]
    DuplicateAlgebra {
        /// The contested algebra name.
        algebra: String,
    },
}

/// Dispatch-time resolution errors. Fatal to the run that hit them: a
/// step that cannot resolve is never skipped over.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No interpreter is registered under the requested algebra name.
    #[error("no algebra {algebra:?} is registered")]
    UnknownAlgebra {
        /// The unresolved algebra name.
        algebra: String,
    },
    /// The algebra exists but does not offer the requested operation.
    #[error("algebra {algebra:?} has no operation {operation:?}")]
    UnknownOperation {
        /// The algebra that was found.
        algebra: String,
        /// The operation it does not offer.
        operation: String,
    },
}

/// Builder for a [`Registry`].
///
/// Each interpreter registers under its own algebra name, exactly once;
/// a second registration under the same name is rejected rather than
/// silently shadowed. `build` freezes the set.
///
/// # Examples
///
/// ```
/// use remoulade::{Algebra, RegistryBuilder, Step};
///
/// # fn main() -> Result<(), remoulade::RegistryError> {
/// let registry = RegistryBuilder::new()
///     .register(Algebra::new("greet").operation("hello", |_| Ok(Step::pure("hi"))))?
///     .build();
/// assert!(registry.contains("greet"));
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct RegistryBuilder {
    algebras: HashMap<String, Box<dyn Interpreter>>,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `interpreter` under its own algebra name.
    pub fn register(
        mut self,
        interpreter: impl Interpreter + 'static,
    ) -> Result<Self, RegistryError> {
        let algebra = interpreter.algebra().to_owned();
        if self.algebras.contains_key(&algebra) {
            return Err(RegistryError::DuplicateAlgebra { algebra });
        }
        self.algebras.insert(algebra, Box::new(interpreter));
        Ok(self)
    }

    /// Freezes the registered set into an immutable [`Registry`].
    pub fn build(self) -> Registry {
        Registry {
            algebras: self.algebras,
        }
    }
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("algebras", &self.algebras.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Read-only mapping from algebra name to interpreter.
///
/// Built once via [`RegistryBuilder`], then shared freely: resolution
/// only reads, so one `Arc<Registry>` serves any number of concurrent
/// runs.
pub struct Registry {
    algebras: HashMap<String, Box<dyn Interpreter>>,
}

impl Registry {
    /// Resolves `(algebra, operation)` to its registered interpreter.
    ///
    /// Distinguishes a missing algebra from a missing operation so
    /// callers can tell a wiring mistake from a typo in one step.
    pub fn resolve(
        &self,
        algebra: &str,
        operation: &str,
    ) -> Result<&dyn Interpreter, ResolveError> {
        let interpreter = self
            .algebras
            .get(algebra)
            .ok_or_else(|| ResolveError::UnknownAlgebra {
                algebra: algebra.to_owned(),
            })?;
        if !interpreter.has_operation(operation) {
            return Err(ResolveError::UnknownOperation {
                algebra: algebra.to_owned(),
                operation: operation.to_owned(),
            });
        }
        Ok(interpreter.as_ref())
    }

    /// Whether an interpreter is registered under `algebra`.
    pub fn contains(&self, algebra: &str) -> bool {
        self.algebras.contains_key(algebra)
    }

    /// Registered algebra names, in no particular order.
    pub fn algebra_names(&self) -> impl Iterator<Item = &str> {
        self.algebras.keys().map(String::as_str)
    }

    /// Number of registered algebras.
    pub fn len(&self) -> usize {
        self.algebras.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.algebras.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("algebras", &self.algebras.keys().collect::<Vec<_>>())
            .finish()
    }
}
