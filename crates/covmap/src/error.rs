//! Coverage error types.

use thiserror::Error;

use covmap_emit::EmitError;
use covmap_ir::IrError;
use covmap_mapping::MappingError;

/// Coverage errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("IR error: {0}")]
    Ir(#[from] IrError),
    #[error("mapping error: {0}")]
    Mapping(#[from] MappingError),
    #[error("emit error: {0}")]
    Emit(#[from] EmitError),
    #[error("region references file {0:?} which has no collected regions")]
    UnknownFile(String),
    #[error("{symbol}: region {index} out of range ({len} regions)")]
    RegionOutOfRange {
        symbol: String,
        index: u32,
        len: u32,
    },
    #[error("{0} does not fit in 32 bits")]
    TooLarge(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
