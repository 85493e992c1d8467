//! The program model: effect descriptors and the composite sequences that
//! carry them.
//!
//! Programs are inert data. Nothing in this module performs anything;
//! behavior enters the picture only when an
//! [`Executor`](crate::Executor) walks a program against a
//! [`Registry`](crate::Registry).

pub mod composite;
pub mod effect;

pub use composite::{Instruction, Program};
pub use effect::{Args, Effect};
