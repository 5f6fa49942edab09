//! Module coverage section writer.

use covmap_emit::{
    CoverageConfig, add_function_mapping_record, add_function_names_global, coverage_emit,
};
use covmap_ir::{GlobalId, IrEmitter};
use covmap_mapping::{
    Counter, CounterExpressionBuilder, FunctionCoverage, Region, RegionKind,
    write_coverage_region_mapping,
};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, debug_span};

use crate::instrumentation::function_name_var;
use crate::region::{FileRegionInfo, FunctionRegions, SourceRegion, SourceRegionKind};
use crate::{Error, Result};

/// Writes the coverage mapping of every collected function into a module.
pub struct CoverageWriter<'a> {
    config: &'a CoverageConfig,
    files: &'a [FileRegionInfo],
    /// Symbols that received counter increments.
    instrumented: Option<&'a FxHashSet<String>>,
    /// File name -> module file index (position in `files`).
    files_index: FxHashMap<&'a str, u32>,
}

impl<'a> CoverageWriter<'a> {
    pub fn new(config: &'a CoverageConfig, files: &'a [FileRegionInfo]) -> Self {
        let mut files_index = FxHashMap::default();
        for (index, info) in files.iter().enumerate() {
            files_index.entry(info.file.as_str()).or_insert(index as u32);
        }
        Self {
            config,
            files,
            instrumented: None,
            files_index,
        }
    }

    /// Functions not in `instrumented` are listed in `__llvm_coverage_names`
    /// (when the config asks for it).
    #[must_use]
    pub const fn with_instrumented(mut self, instrumented: &'a FxHashSet<String>) -> Self {
        self.instrumented = Some(instrumented);
        self
    }

    /// Emit `__llvm_coverage_mapping` and mark it used.
    ///
    /// Returns `None` without touching the module when no files were
    /// collected.
    pub fn write<M: IrEmitter + ?Sized>(&self, module: &mut M) -> Result<Option<GlobalId>> {
        if self.files.is_empty() {
            return Ok(None);
        }
        let _span = debug_span!("write_coverage", files = self.files.len()).entered();

        let functions: Vec<&FunctionRegions> =
            self.files.iter().flat_map(|info| &info.functions).collect();
        let mut records = Vec::with_capacity(functions.len());
        let mut coverages = Vec::with_capacity(functions.len());
        for function in &functions {
            let coverage = self.function_coverage(function)?;
            records.push(add_function_mapping_record(
                &*module,
                &function.symbol,
                function.structural_hash,
                &coverage,
            )?);
            crate::metrics::record_function(function.regions.len(), coverage.len());
            coverages.push(coverage);
        }

        let filenames: Vec<&str> = self.files.iter().map(|info| info.file.as_str()).collect();
        let indices: Vec<u32> = (0..filenames.len())
            .map(|index| u32::try_from(index).map_err(|_| Error::TooLarge("file count")))
            .collect::<Result<_>>()?;
        let section = coverage_emit(
            module,
            self.config,
            &records,
            &filenames,
            &indices,
            &coverages,
        )?;
        module.mark_used(section);
        crate::metrics::record_section();

        if self.config.emit_unused_names {
            self.write_unused_names(module, &functions)?;
        }
        Ok(Some(section))
    }

    /// Encode one function's regions against the module file index.
    pub fn function_coverage(&self, function: &FunctionRegions) -> Result<FunctionCoverage> {
        let builder = CounterExpressionBuilder::new();
        let regions = function
            .regions
            .iter()
            .enumerate()
            .map(|(index, region)| self.lower_region(region, index))
            .collect::<Result<Vec<_>>>()?;

        // Region files first, then files only reached through expansions.
        let mut file_ids = Vec::new();
        let mut seen = FxHashSet::default();
        let expanded = regions.iter().filter_map(|region| match region.kind {
            RegionKind::Expansion { expanded_file_id } => Some(expanded_file_id),
            _ => None,
        });
        for file_id in regions.iter().map(|region| region.file_id).chain(expanded) {
            if seen.insert(file_id) {
                file_ids.push(file_id);
            }
        }

        let coverage = write_coverage_region_mapping(&file_ids, &regions, &builder)?;
        debug!(
            symbol = %function.symbol,
            regions = regions.len(),
            files = file_ids.len(),
            bytes = coverage.len(),
            "encoded function coverage"
        );
        Ok(coverage)
    }

    fn lower_region(&self, region: &SourceRegion, index: usize) -> Result<Region> {
        let file_id = self.file_index(&region.file)?;
        let counter = Counter::Raw(u32::try_from(index).map_err(|_| Error::TooLarge("region count"))?);
        let kind = match &region.kind {
            SourceRegionKind::Code => RegionKind::Code,
            SourceRegionKind::Gap => RegionKind::Gap,
            SourceRegionKind::Expansion { expanded_file } => RegionKind::Expansion {
                expanded_file_id: self.file_index(expanded_file)?,
            },
        };
        Ok(Region::new(
            file_id,
            (region.line_start, region.column_start),
            (region.line_end, region.column_end),
            counter,
            kind,
        ))
    }

    fn file_index(&self, file: &str) -> Result<u32> {
        self.files_index
            .get(file)
            .copied()
            .ok_or_else(|| Error::UnknownFile(file.to_string()))
    }

    fn write_unused_names<M: IrEmitter + ?Sized>(
        &self,
        module: &mut M,
        functions: &[&FunctionRegions],
    ) -> Result<()> {
        let unused: Vec<&FunctionRegions> = functions
            .iter()
            .copied()
            .filter(|f| !self.instrumented.is_some_and(|set| set.contains(&f.symbol)))
            .collect();
        if unused.is_empty() {
            return Ok(());
        }
        let names = unused
            .into_iter()
            .map(|function| function_name_var(module, function))
            .collect::<Result<Vec<_>>>()?;
        add_function_names_global(module, &names)?;
        Ok(())
    }
}
