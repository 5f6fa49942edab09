//! Coverage section and profiling IR emission.
//!
//! Turns encoded function mapping records into the module-level
//! `__llvm_coverage_mapping` global, and creates the per-function IR the
//! profiling runtime needs (name variables, the increment intrinsic, the
//! unused-names array).

mod config;
mod filenames;
mod intrinsic;
mod names;
mod record;
mod section;

pub use config::*;
pub use filenames::*;
pub use intrinsic::*;
pub use names::*;
pub use record::*;
pub use section::*;

use covmap_ir::IrError;
use covmap_mapping::MappingError;
use thiserror::Error;

/// Emission errors. Everything except `Ir` is a contract violation by the
/// caller; no partial section is ever emitted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmitError {
    #[error("IR error: {0}")]
    Ir(#[from] IrError),
    #[error("mapping error: {0}")]
    Mapping(#[from] MappingError),
    #[error("{what}: expected {expected} entries, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("filename index {index} is outside the table of {len} filenames")]
    FilenameIndexOutOfRange { index: u32, len: usize },
    #[error("filename index {0} is assigned twice")]
    DuplicateFilenameIndex(u32),
    #[error("function record references unknown filename index {0}")]
    UnknownFilenameIndex(u32),
    #[error("function record {index} declares {declared} mapping bytes, coverage has {actual}")]
    RecordSizeMismatch {
        index: usize,
        declared: u32,
        actual: usize,
    },
    #[error("{0} does not fit in 32 bits")]
    SectionTooLarge(&'static str),
    #[error("coverage mapping alignment {0} is not a power of two")]
    InvalidAlignment(u32),
    #[error("unknown function #{0}")]
    UnknownFunction(u32),
}

pub type Result<T> = std::result::Result<T, EmitError>;
