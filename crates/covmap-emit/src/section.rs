//! Module coverage mapping section.

use covmap_ir::{Constant, GlobalId, GlobalVar, IrEmitter, Linkage, ObjectFormat};
use covmap_mapping::FunctionCoverage;
use covmap_mapping::leb128::{read_uleb128, write_uleb128};
use tracing::{debug, debug_span};

use crate::config::{COVMAP_VAR_ALIGN_BYTES, CoverageConfig};
use crate::filenames::FilenameTable;
use crate::record::FunctionRecord;
use crate::{EmitError, Result};

/// Symbol of the module coverage mapping global.
pub const COVERAGE_MAPPING_VAR_NAME: &str = "__llvm_coverage_mapping";

/// Version field of the section header. Versions are stored zero-based,
/// so `2` is format version 3 (gap regions, MD5 name references).
pub const COVERAGE_MAPPING_VERSION: u32 = 2;

/// Size of the `{ i32, i32, i32, i32 }` section header.
pub const COVERAGE_HEADER_SIZE: usize = 16;

/// Section holding the coverage mapping for an object format.
pub const fn covmap_section_name(format: ObjectFormat) -> &'static str {
    match format {
        ObjectFormat::Elf => "__llvm_covmap",
        ObjectFormat::MachO => "__LLVM_COV,__llvm_covmap",
        ObjectFormat::Coff => ".lcovmap$M",
    }
}

/// Emit the module coverage mapping global.
///
/// `records[i]` must describe `coverages[i]`. Filenames are placed in the
/// module table by `filename_indices` (see [`FilenameTable::new`]), and the
/// file ids at the front of every coverage record are re-based from those
/// slot indices to table positions. The global is laid out as
/// `{ header, [n x record], [m x i8] filenames ++ mappings ++ padding }`.
///
/// The byte blob is always padded to 8 bytes, which readers rely on when
/// sections of several objects are concatenated. The global's alignment is
/// `config.covmap_alignment` raised to at least 8; it must be a power of two.
pub fn coverage_emit<M, S>(
    module: &mut M,
    config: &CoverageConfig,
    records: &[FunctionRecord],
    filenames: &[S],
    filename_indices: &[u32],
    coverages: &[FunctionCoverage],
) -> Result<GlobalId>
where
    M: IrEmitter + ?Sized,
    S: AsRef<str>,
{
    let _span = debug_span!("coverage_emit", functions = records.len()).entered();

    if !config.covmap_alignment.is_power_of_two() {
        return Err(EmitError::InvalidAlignment(config.covmap_alignment));
    }
    let alignment = config.covmap_alignment.max(COVMAP_VAR_ALIGN_BYTES);

    if records.len() != coverages.len() {
        return Err(EmitError::LengthMismatch {
            what: "function coverages",
            expected: records.len(),
            actual: coverages.len(),
        });
    }

    let table = FilenameTable::new(filenames, filename_indices)?;
    let mut data = table.encode();
    let filenames_size = data.len();

    let mut function_records = Vec::with_capacity(records.len());
    for (index, (record, coverage)) in records.iter().zip(coverages).enumerate() {
        if record.data_size as usize != coverage.len() {
            return Err(EmitError::RecordSizeMismatch {
                index,
                declared: record.data_size,
                actual: coverage.len(),
            });
        }
        let before = data.len();
        rebase_record(coverage.as_bytes(), &table, &mut data)?;
        let data_size = u32::try_from(data.len() - before)
            .map_err(|_| EmitError::SectionTooLarge("function mapping data"))?;
        function_records.push(
            FunctionRecord {
                data_size,
                ..*record
            }
            .to_constant(),
        );
    }

    let padding = data.len().next_multiple_of(COVMAP_VAR_ALIGN_BYTES as usize) - data.len();
    data.resize(data.len() + padding, 0);
    let coverage_size = data.len() - filenames_size;

    let header = Constant::structure(
        vec![
            Constant::i32(to_u32(function_records.len(), "function record count")?),
            Constant::i32(to_u32(filenames_size, "filenames size")?),
            Constant::i32(to_u32(coverage_size, "coverage size")?),
            Constant::i32(COVERAGE_MAPPING_VERSION),
        ],
        false,
    );
    let value = Constant::structure(
        vec![
            header,
            Constant::array(FunctionRecord::ty(), function_records),
            Constant::bytes(data),
        ],
        false,
    );

    let section = covmap_section_name(module.object_format());
    let global = GlobalVar::constant(COVERAGE_MAPPING_VAR_NAME, value, Linkage::Internal)
        .with_section(section)
        .with_alignment(alignment);
    let id = module.add_global(global)?;

    debug!(
        filenames = table.len(),
        filenames_size,
        coverage_size,
        section,
        "emitted coverage mapping"
    );
    Ok(id)
}

/// Append `record` to `out`, rewriting its file id list through `table`.
pub fn rebase_record(record: &[u8], table: &FilenameTable, out: &mut Vec<u8>) -> Result<()> {
    let mut pos = 0;
    let num_files = read_uleb128(record, &mut pos)?;
    write_uleb128(out, num_files);
    for _ in 0..num_files {
        let slot = read_uleb128(record, &mut pos)?;
        let slot = u32::try_from(slot).map_err(|_| EmitError::UnknownFilenameIndex(u32::MAX))?;
        let position = table
            .resolve(slot)
            .ok_or(EmitError::UnknownFilenameIndex(slot))?;
        write_uleb128(out, u64::from(position));
    }
    out.extend_from_slice(&record[pos..]);
    Ok(())
}

fn to_u32(value: usize, what: &'static str) -> Result<u32> {
    u32::try_from(value).map_err(|_| EmitError::SectionTooLarge(what))
}

/// Read back the parts of an emitted coverage mapping global.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoverageSection<'a> {
    pub version: u32,
    pub records: Vec<FunctionRecord>,
    pub filenames: Vec<String>,
    /// Per-record mapping bytes, in record order.
    pub mappings: Vec<&'a [u8]>,
}

impl<'a> CoverageSection<'a> {
    /// Split the initializer of a coverage mapping global.
    pub fn parse(value: &'a Constant) -> Option<Self> {
        let [header, records, data] = value.fields()? else {
            return None;
        };
        let header = header.fields()?;
        let field = |i: usize| header.get(i).and_then(Constant::as_int);
        let filenames_size = usize::try_from(field(1)?).ok()?;
        let version = u32::try_from(field(3)?).ok()?;

        let records = records
            .elements()?
            .iter()
            .map(|record| {
                let f = record.fields()?;
                Some(FunctionRecord {
                    name_ref: f.first()?.as_int()?,
                    data_size: u32::try_from(f.get(1)?.as_int()?).ok()?,
                    func_hash: f.get(2)?.as_int()?,
                })
            })
            .collect::<Option<Vec<_>>>()?;

        let data = data.as_bytes()?;
        let (filenames, consumed) = FilenameTable::decode(data.get(..filenames_size)?).ok()?;
        if consumed != filenames_size {
            return None;
        }
        let mut mappings = Vec::with_capacity(records.len());
        let mut pos = filenames_size;
        for record in &records {
            let end = pos + record.data_size as usize;
            mappings.push(data.get(pos..end)?);
            pos = end;
        }

        Some(Self {
            version,
            records,
            filenames,
            mappings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::add_function_mapping_record;
    use covmap_ir::Module;
    use covmap_mapping::{
        Counter, CounterExpressionBuilder, Region, RegionKind, read_function_mapping,
        write_coverage_region_mapping,
    };

    fn emit(
        module: &mut Module,
        names: &[&str],
        indices: &[u32],
        functions: &[(&str, FunctionCoverage)],
    ) -> Result<GlobalId> {
        let records = functions
            .iter()
            .map(|(name, coverage)| add_function_mapping_record(module, name, 7, coverage))
            .collect::<Result<Vec<_>>>()?;
        let coverages: Vec<_> = functions.iter().map(|(_, c)| c.clone()).collect();
        coverage_emit(
            module,
            &CoverageConfig::default(),
            &records,
            names,
            indices,
            &coverages,
        )
    }

    #[test]
    fn test_empty_module_has_only_filenames() {
        let mut module = Module::default();
        let id = emit(&mut module, &[], &[], &[]).unwrap();
        let global = module.global(id).unwrap();
        assert_eq!(global.name, COVERAGE_MAPPING_VAR_NAME);
        assert_eq!(global.section.as_deref(), Some("__llvm_covmap"));
        assert_eq!(global.alignment, Some(8));
        assert_eq!(global.linkage, Linkage::Internal);

        let fields = global.initializer.fields().unwrap();
        let header: Vec<_> = fields[0]
            .fields()
            .unwrap()
            .iter()
            .map(|f| f.as_int().unwrap())
            .collect();
        // One filename-count byte, padded to 8.
        assert_eq!(header, [0, 1, 7, 2]);
        assert_eq!(fields[1].elements().map(<[Constant]>::len), Some(0));
        assert_eq!(fields[2].as_bytes(), Some(&[0u8; 8][..]));
    }

    #[test]
    fn test_section_layout() {
        let mut module = Module::new("m", ObjectFormat::MachO);
        let builder = CounterExpressionBuilder::new();
        let regions = [Region::code(0, (1, 1), (2, 1), Counter::Raw(0))];
        let coverage = write_coverage_region_mapping(&[0], &regions, &builder).unwrap();
        let id = emit(&mut module, &["a.kt"], &[0], &[("f", coverage.clone())]).unwrap();

        let global = module.global(id).unwrap();
        assert_eq!(global.section.as_deref(), Some("__LLVM_COV,__llvm_covmap"));
        let section = CoverageSection::parse(&global.initializer).unwrap();
        assert_eq!(section.version, COVERAGE_MAPPING_VERSION);
        assert_eq!(section.filenames, ["a.kt"]);
        assert_eq!(section.records.len(), 1);
        assert_eq!(section.records[0].func_hash, 7);
        assert_eq!(section.records[0].name_ref, module.name_hash("f"));
        assert_eq!(section.mappings, [coverage.as_bytes()]);

        let data = global.initializer.fields().unwrap()[2].as_bytes().unwrap();
        assert_eq!(data.len() % 8, 0);
    }

    #[test]
    fn test_record_file_ids_rebased() {
        let mut module = Module::default();
        let builder = CounterExpressionBuilder::new();
        // Slots 0 and 2 hold the same file; the function uses slots 2 and 1.
        let regions = [
            Region::code(2, (1, 1), (1, 5), Counter::Raw(0)),
            Region::expansion(2, (3, 1), (3, 4), 1),
            Region::code(1, (7, 1), (8, 1), Counter::Raw(1)),
        ];
        let coverage = write_coverage_region_mapping(&[2, 1], &regions, &builder).unwrap();
        let id = emit(
            &mut module,
            &["main.kt", "macro.kt", "main.kt"],
            &[0, 1, 2],
            &[("f", coverage)],
        )
        .unwrap();

        let section = CoverageSection::parse(&module.global(id).unwrap().initializer).unwrap();
        assert_eq!(section.filenames, ["main.kt", "macro.kt"]);
        let decoded = read_function_mapping(section.mappings[0]).unwrap();
        assert_eq!(decoded.file_ids, [0, 1]);

        let expansion = decoded
            .regions
            .iter()
            .find_map(|r| match r.kind {
                RegionKind::Expansion { expanded_file_id } => Some(expanded_file_id),
                _ => None,
            })
            .unwrap();
        let module_file = decoded.file_ids[expansion as usize];
        assert_eq!(section.filenames[module_file as usize], "macro.kt");
    }

    #[test]
    fn test_unknown_filename_index_rejected() {
        let mut module = Module::default();
        let builder = CounterExpressionBuilder::new();
        let regions = [Region::code(4, (1, 1), (1, 2), Counter::Raw(0))];
        let coverage = write_coverage_region_mapping(&[4], &regions, &builder).unwrap();
        assert_eq!(
            emit(&mut module, &["a.kt"], &[0], &[("f", coverage)]),
            Err(EmitError::UnknownFilenameIndex(4))
        );
        assert!(module.global_by_name(COVERAGE_MAPPING_VAR_NAME).is_none());
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let mut module = Module::default();
        let result = coverage_emit(
            &mut module,
            &CoverageConfig::default(),
            &[],
            &["a.kt"],
            &[0],
            &[FunctionCoverage::from_bytes(vec![0, 0])],
        );
        assert!(matches!(result, Err(EmitError::LengthMismatch { .. })));
    }

    #[test]
    fn test_record_size_mismatch_rejected() {
        let mut module = Module::default();
        let record = FunctionRecord {
            name_ref: 0,
            data_size: 5,
            func_hash: 0,
        };
        let result = coverage_emit(
            &mut module,
            &CoverageConfig::default(),
            &[record],
            &["a.kt"],
            &[0],
            &[FunctionCoverage::from_bytes(vec![0, 0])],
        );
        assert_eq!(
            result,
            Err(EmitError::RecordSizeMismatch {
                index: 0,
                declared: 5,
                actual: 2
            })
        );
    }

    fn emit_with_alignment(alignment: u32) -> (Module, Result<GlobalId>) {
        let mut module = Module::default();
        let builder = CounterExpressionBuilder::new();
        let regions = [Region::code(0, (1, 1), (2, 1), Counter::Raw(0))];
        let coverage = write_coverage_region_mapping(&[0], &regions, &builder).unwrap();
        let record = add_function_mapping_record(&module, "f", 0, &coverage).unwrap();
        let config = CoverageConfig {
            covmap_alignment: alignment,
            ..CoverageConfig::default()
        };
        let result = coverage_emit(&mut module, &config, &[record], &["a.kt"], &[0], &[coverage]);
        (module, result)
    }

    #[test]
    fn test_small_alignment_still_pads_to_eight() {
        for alignment in [1, 2, 4] {
            let (module, result) = emit_with_alignment(alignment);
            let global = module.global(result.unwrap()).unwrap();
            assert_eq!(global.alignment, Some(8));
            let fields = global.initializer.fields().unwrap();
            let coverage_size = fields[0].fields().unwrap()[2].as_int().unwrap();
            assert_eq!(coverage_size % 8, 0, "alignment {alignment}");
            assert_eq!(fields[2].as_bytes().unwrap().len() % 8, 0, "alignment {alignment}");
        }
    }

    #[test]
    fn test_larger_alignment_kept_on_global() {
        let (module, result) = emit_with_alignment(16);
        let global = module.global(result.unwrap()).unwrap();
        assert_eq!(global.alignment, Some(16));
        let data = global.initializer.fields().unwrap()[2].as_bytes().unwrap();
        assert_eq!(data.len() % 8, 0);
    }

    #[test]
    fn test_invalid_alignment_rejected() {
        for alignment in [0, 6] {
            let (module, result) = emit_with_alignment(alignment);
            assert_eq!(result, Err(EmitError::InvalidAlignment(alignment)));
            assert!(module.global_by_name(COVERAGE_MAPPING_VAR_NAME).is_none());
        }
    }

    #[test]
    fn test_rebase_keeps_tail() {
        let table = FilenameTable::new(&["x", "y", "x"], &[0, 1, 2]).unwrap();
        let mut out = vec![0xff];
        rebase_record(&[2, 2, 1, 9, 9], &table, &mut out).unwrap();
        assert_eq!(out, [0xff, 2, 0, 1, 9, 9]);
    }
}
