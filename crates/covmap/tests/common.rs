#![allow(dead_code)]

use covmap::{COVERAGE_MAPPING_VAR_NAME, CoverageSection, IrEmitter, Module};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

/// Route library logs to the test output (`RUST_LOG=covmap=debug`).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_test_writer()
        .try_init();
}

/// Parsed `__llvm_coverage_mapping` of a module.
pub fn coverage_section(module: &Module) -> CoverageSection<'_> {
    let id = module
        .global_by_name(COVERAGE_MAPPING_VAR_NAME)
        .expect("coverage mapping global missing");
    let global = module.global(id).expect("dangling global id");
    CoverageSection::parse(&global.initializer).expect("malformed coverage mapping")
}
