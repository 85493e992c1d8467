//! Composite programs: ordered instruction sequences consumed by the
//! executor.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::effect::Effect;

/// One step of a [`Program`].
///
/// Most steps are [`Effect`]s dispatched through the registry. A step may
/// also be a literal [`Value`], which becomes the running result without
/// touching the registry at all. Literal steps are how the
/// redirect-and-finish pattern works: an error handler replaces the rest
/// of a program with a single literal carrying the terminal response (see
/// [`Step::finish`](crate::Step::finish)).
///
/// The untagged wire form mirrors the program model itself: a JSON object
/// with `algebra` and `operation` fields is an effect, anything else is a
/// literal. A literal object that happens to carry both field names would
/// round-trip as an effect, so avoid those key names in literal payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Instruction {
    /// Dispatch an effect through the registry.
    Effect(Effect),
    /// Yield a value directly, with no dispatch and no side effects.
    Value(Value),
}

impl From<Effect> for Instruction {
    fn from(effect: Effect) -> Self {
        Instruction::Effect(effect)
    }
}

impl From<Value> for Instruction {
    fn from(value: Value) -> Self {
        Instruction::Value(value)
    }
}

/// An ordered sequence of [`Instruction`]s.
///
/// A program is built by a caller, handed to the executor, and consumed
/// exactly once, front to back. During execution the only way the
/// sequence changes is a wholesale replacement of the remaining tail via
/// [`Step::Redirect`]; consumed steps are never revisited.
///
/// Programs are plain data and serialize transparently as a JSON array,
/// so they can be stored, transported, and replayed.
///
/// [`Step::Redirect`]: crate::Step::Redirect
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    /// Creates an empty program. Running it yields `Value::Null`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one instruction.
    pub fn push(&mut self, instruction: impl Into<Instruction>) {
        self.instructions.push(instruction.into());
    }

    /// Appends one instruction, returning the program for chaining.
    #[must_use]
    pub fn then(mut self, instruction: impl Into<Instruction>) -> Self {
        self.push(instruction);
        self
    }

    /// The instructions in execution order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of remaining instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the program has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

impl From<Vec<Instruction>> for Program {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }
}

impl From<Vec<Effect>> for Program {
    fn from(effects: Vec<Effect>) -> Self {
        effects.into_iter().collect()
    }
}

impl From<Effect> for Program {
    fn from(effect: Effect) -> Self {
        Self {
            instructions: vec![Instruction::Effect(effect)],
        }
    }
}

impl FromIterator<Instruction> for Program {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        Self {
            instructions: iter.into_iter().collect(),
        }
    }
}

impl FromIterator<Effect> for Program {
    fn from_iter<T: IntoIterator<Item = Effect>>(iter: T) -> Self {
        iter.into_iter().map(Instruction::Effect).collect()
    }
}

impl IntoIterator for Program {
    type Item = Instruction;
    type IntoIter = std::vec::IntoIter<Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.into_iter()
    }
}
