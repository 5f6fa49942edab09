//! Covmap - source-based code coverage for compiler backends
//!
//! Collects per-function source regions, places counter increments while
//! code is generated, and writes the module's `__llvm_coverage_mapping`
//! section so `llvm-cov` can map profile counters back to source.
//!
//! # Example
//!
//! ```ignore
//! use covmap::{CoverageConfig, CoverageManager, Module, ObjectFormat};
//!
//! let mut manager = CoverageManager::new(CoverageConfig::new("main"));
//! manager.collect_regions(files);
//! let mut module = Module::new("main", ObjectFormat::Elf);
//! if let Some(inst) = manager.instrumentation(&mut module, "main")? {
//!     let call = inst.increment(0)?;
//! }
//! manager.write_region_info(&mut module)?;
//! ```

// Re-export from sub-crates
pub use covmap_emit::{
    COVERAGE_MAPPING_VAR_NAME, COVERAGE_MAPPING_VERSION, COVERAGE_UNUSED_NAMES_VAR_NAME,
    CoverageConfig, CoverageSection, EmitError, FunctionRecord, INSTRPROF_INCREMENT,
    PGO_NAME_VAR_PREFIX, add_function_mapping_record, add_function_names_global, coverage_emit,
    covmap_section_name, create_pgo_function_name_var, instr_prof_increment,
};
pub use covmap_ir::{
    CallSite, Constant, Function, FunctionId, GlobalId, GlobalVar, IrEmitter, IrError, Linkage,
    Module, ObjectFormat, Operand, Signature, Type, Visibility,
};
pub use covmap_mapping::{
    Counter, CounterExpressionBuilder, FunctionCoverage, MappingError, Region, RegionKind,
    write_coverage_region_mapping,
};

mod error;
mod instrumentation;
mod manager;
pub mod metrics;
mod region;
mod writer;

pub use error::*;
pub use instrumentation::*;
pub use manager::*;
pub use region::*;
pub use writer::*;
