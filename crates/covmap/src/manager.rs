//! Coverage manager.

use covmap_emit::CoverageConfig;
use covmap_ir::{GlobalId, IrEmitter};
use rustc_hash::FxHashSet;
use tracing::{debug, enabled, Level};

use crate::Result;
use crate::instrumentation::FunctionInstrumentation;
use crate::region::{FileRegionInfo, FunctionRegions};
use crate::writer::CoverageWriter;

/// Entry point for coverage in a compilation: collects regions, hands out
/// per-function instrumentation and writes the mapping section.
#[derive(Debug, Default)]
pub struct CoverageManager {
    config: CoverageConfig,
    files: Vec<FileRegionInfo>,
    instrumented: FxHashSet<String>,
}

impl CoverageManager {
    pub fn new(config: CoverageConfig) -> Self {
        Self {
            config,
            files: Vec::new(),
            instrumented: FxHashSet::default(),
        }
    }

    pub const fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub const fn config(&self) -> &CoverageConfig {
        &self.config
    }

    /// Files collected so far.
    pub fn files(&self) -> &[FileRegionInfo] {
        &self.files
    }

    /// Keep the files that belong to a covered module.
    ///
    /// Does nothing when coverage is disabled.
    pub fn collect_regions(&mut self, files: impl IntoIterator<Item = FileRegionInfo>) {
        if !self.enabled() {
            return;
        }
        for info in files {
            if !self.config.covers(&info.module) {
                debug!(file = %info.file, module = %info.module, "skipping uncovered file");
                continue;
            }
            if enabled!(Level::DEBUG) {
                for function in &info.functions {
                    debug!("{}", function.dump());
                }
            }
            self.files.push(info);
        }
    }

    /// Collected regions of the function with PGO name `symbol`.
    pub fn function_regions(&self, symbol: &str) -> Option<&FunctionRegions> {
        self.files
            .iter()
            .flat_map(|info| &info.functions)
            .find(|function| function.symbol == symbol)
    }

    /// Instrumentation for `symbol`, or `None` when coverage is disabled or
    /// the function has no collected regions.
    pub fn instrumentation<M: IrEmitter + ?Sized>(
        &mut self,
        module: &mut M,
        symbol: &str,
    ) -> Result<Option<FunctionInstrumentation>> {
        if !self.enabled() {
            return Ok(None);
        }
        let Some(regions) = self
            .files
            .iter()
            .flat_map(|info| &info.functions)
            .find(|function| function.symbol == symbol)
        else {
            return Ok(None);
        };
        let instrumentation = FunctionInstrumentation::new(module, regions)?;
        self.instrumented.insert(symbol.to_string());
        Ok(Some(instrumentation))
    }

    /// Add `__llvm_coverage_mapping` to the module.
    pub fn write_region_info<M: IrEmitter + ?Sized>(&self, module: &mut M) -> Result<Option<GlobalId>> {
        if !self.enabled() {
            return Ok(None);
        }
        CoverageWriter::new(&self.config, &self.files)
            .with_instrumented(&self.instrumented)
            .write(module)
    }
}
