//! IR object model for coverage-mapping emission.
//!
//! This crate models the slice of a compiler IR that coverage emission
//! touches: global variables, constant initializers, function declarations
//! and call sites. Emission code talks to it through the [`IrEmitter`]
//! trait; [`Module`] is the in-memory implementation.

mod constant;
mod emitter;
mod function;
mod global;
mod module;
mod types;

pub use constant::*;
pub use emitter::*;
pub use function::*;
pub use global::*;
pub use module::*;
pub use types::*;

use thiserror::Error;

/// IR construction errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IrError {
    #[error("symbol `{0}` is already defined")]
    DuplicateSymbol(String),
    #[error("function `{name}` already declared with a different signature")]
    SignatureMismatch { name: String },
    #[error("initializer of `{name}` has type {actual}, expected {expected}")]
    InitializerType {
        name: String,
        expected: Type,
        actual: Type,
    },
    #[error("unknown global #{0}")]
    UnknownGlobal(u32),
    #[error("unknown function #{0}")]
    UnknownFunction(u32),
}

pub type Result<T> = std::result::Result<T, IrError>;
