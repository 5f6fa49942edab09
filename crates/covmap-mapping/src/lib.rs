//! Coverage-mapping encoder.
//!
//! Builds counter expressions and serializes a function's source regions
//! into the LLVM coverage-mapping record format (`Version3` layout: region
//! kinds in the counter tag, gap regions flagged in the end column).
//!
//! ```ignore
//! use covmap_mapping::{CounterExpressionBuilder, Region, write_coverage_region_mapping};
//!
//! let mut builder = CounterExpressionBuilder::new();
//! let sum = builder.add_counters(0, 1);
//! let regions = [Region::code(0, (10, 1), (12, 5), sum)];
//! let record = write_coverage_region_mapping(&[0], &regions, &builder)?;
//! ```

mod builder;
mod counter;
pub mod leb128;
#[cfg(any(test, feature = "reader"))]
mod reader;
mod region;
mod writer;

pub use builder::*;
pub use counter::*;
#[cfg(any(test, feature = "reader"))]
pub use reader::*;
pub use region::*;
pub use writer::*;

use thiserror::Error;

/// Coverage-mapping errors. All but the decoding variants are contract
/// violations by the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("expression #{index} belongs to another counter expression builder")]
    ForeignExpression { index: u32 },
    #[error("expression #{index} is out of range (builder holds {len})")]
    UnknownExpression { index: u32, len: usize },
    #[error("file id {0} is not in the file id mapping")]
    UnknownFileId(u32),
    #[error("file id {0} appears more than once in the file id mapping")]
    DuplicateFileId(u32),
    #[error("region starts at {start:?} after it ends at {end:?}")]
    InvertedRegion { start: (u32, u32), end: (u32, u32) },
    #[error("column {0} does not fit in 31 bits")]
    ColumnOverflow(u32),
    #[error("counter or expression id {0} does not fit in the counter encoding")]
    CounterOverflow(u32),
    #[error("mapping record truncated")]
    Truncated,
    #[error("LEB128 value exceeds 64 bits")]
    VarintOverflow,
    #[error("malformed mapping record: {0}")]
    Malformed(&'static str),
}

pub type Result<T> = std::result::Result<T, MappingError>;
