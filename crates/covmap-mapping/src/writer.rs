//! Function mapping record writer.

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::builder::CounterExpressionBuilder;
use crate::counter::{
    Counter, CounterExpression, ENCODING_COUNTER_TAG_AND_EXPANSION_REGION_TAG_BITS,
    ENCODING_TAG_BITS, MAX_COUNTER_ID, TAG_COUNTER, TAG_EXPRESSION, TAG_ZERO,
};
use crate::leb128::write_uleb128;
use crate::region::{Region, RegionKind};
use crate::{MappingError, Result};

/// Bit set in the encoded end column of a gap region.
pub const GAP_REGION_BIT: u32 = 1 << 31;
/// Flag following the counter tag that marks an expansion region.
pub const EXPANSION_REGION_BIT: u64 = 1 << ENCODING_TAG_BITS;
/// Region kind stored above the tag bits for skipped regions.
pub const SKIPPED_REGION_KIND: u64 = 2;
/// Largest local file index an expansion region can reference.
pub const MAX_EXPANDED_FILE_ID: u32 = u32::MAX >> ENCODING_COUNTER_TAG_AND_EXPANSION_REGION_TAG_BITS;

/// Encoded coverage mapping of one function.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct FunctionCoverage {
    data: Vec<u8>,
}

impl FunctionCoverage {
    /// Wrap an already encoded record.
    pub const fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Encoded record bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Size of the encoded record in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Serialize a function's regions into a coverage mapping record.
///
/// `file_id_mapping` lists the distinct file ids the regions use; a
/// region's file (and an expansion's target) is encoded as its position in
/// that list, and the list itself is written at the front of the record.
/// Regions may arrive in any order and are sorted per file.
pub fn write_coverage_region_mapping(
    file_id_mapping: &[u32],
    regions: &[Region],
    builder: &CounterExpressionBuilder,
) -> Result<FunctionCoverage> {
    MappingWriter::new(file_id_mapping, builder)?.write(regions)
}

/// Region with its file ids re-based to mapping positions.
#[derive(Clone, Copy)]
struct LocalRegion<'r> {
    file: u32,
    expanded_file: Option<u32>,
    region: &'r Region,
}

struct MappingWriter<'a> {
    file_id_mapping: &'a [u32],
    local_ids: FxHashMap<u32, u32>,
    builder: &'a CounterExpressionBuilder,
    /// Builder index -> index in the written expression list.
    adjusted: FxHashMap<u32, u32>,
    used: Vec<CounterExpression>,
}

impl<'a> MappingWriter<'a> {
    fn new(file_id_mapping: &'a [u32], builder: &'a CounterExpressionBuilder) -> Result<Self> {
        let mut local_ids = FxHashMap::default();
        for (local, &file_id) in file_id_mapping.iter().enumerate() {
            if local_ids.insert(file_id, local as u32).is_some() {
                return Err(MappingError::DuplicateFileId(file_id));
            }
        }
        Ok(Self {
            file_id_mapping,
            local_ids,
            builder,
            adjusted: FxHashMap::default(),
            used: Vec::new(),
        })
    }

    fn write(mut self, regions: &[Region]) -> Result<FunctionCoverage> {
        if regions.is_empty() {
            // No files, no expressions.
            return Ok(FunctionCoverage::from_bytes(vec![0, 0]));
        }

        let mut local = regions
            .iter()
            .map(|region| self.localize(region))
            .collect::<Result<Vec<_>>>()?;
        local.sort_by(|a, b| a.file.cmp(&b.file).then_with(|| a.region.cmp_position(b.region)));

        for r in &local {
            if matches!(r.region.kind, RegionKind::Code | RegionKind::Gap) {
                self.gather(r.region.counter)?;
            }
        }

        let mut out = Vec::new();
        write_uleb128(&mut out, self.file_id_mapping.len() as u64);
        for &file_id in self.file_id_mapping {
            write_uleb128(&mut out, u64::from(file_id));
        }

        write_uleb128(&mut out, self.used.len() as u64);
        for expr in &self.used {
            let lhs = self.encode_counter(expr.lhs)?;
            let rhs = self.encode_counter(expr.rhs)?;
            write_uleb128(&mut out, lhs);
            write_uleb128(&mut out, rhs);
        }

        let mut rest = local.as_slice();
        for file in 0..self.file_id_mapping.len() as u32 {
            let count = rest.iter().take_while(|r| r.file == file).count();
            let (in_file, tail) = rest.split_at(count);
            rest = tail;

            write_uleb128(&mut out, count as u64);
            let mut prev_line_start = 0;
            for r in in_file {
                self.write_region(&mut out, r, prev_line_start)?;
                prev_line_start = r.region.line_start;
            }
        }

        debug!(
            files = self.file_id_mapping.len(),
            regions = regions.len(),
            expressions = self.used.len(),
            bytes = out.len(),
            "wrote function coverage mapping"
        );
        Ok(FunctionCoverage::from_bytes(out))
    }

    fn localize<'r>(&self, region: &'r Region) -> Result<LocalRegion<'r>> {
        let file = self.local_id(region.file_id)?;
        if region.start() > region.end() {
            return Err(MappingError::InvertedRegion {
                start: region.start(),
                end: region.end(),
            });
        }
        if region.column_end & GAP_REGION_BIT != 0 {
            return Err(MappingError::ColumnOverflow(region.column_end));
        }
        let expanded_file = match region.kind {
            RegionKind::Expansion { expanded_file_id } => {
                let local = self.local_id(expanded_file_id)?;
                if local > MAX_EXPANDED_FILE_ID {
                    return Err(MappingError::CounterOverflow(local));
                }
                Some(local)
            }
            RegionKind::Code | RegionKind::Gap => {
                self.builder.check(region.counter)?;
                None
            }
            RegionKind::Skip => None,
        };
        Ok(LocalRegion {
            file,
            expanded_file,
            region,
        })
    }

    fn local_id(&self, file_id: u32) -> Result<u32> {
        self.local_ids
            .get(&file_id)
            .copied()
            .ok_or(MappingError::UnknownFileId(file_id))
    }

    /// Number reachable expressions in pre-order, parents before operands.
    fn gather(&mut self, counter: Counter) -> Result<()> {
        let mut stack = vec![counter];
        while let Some(counter) = stack.pop() {
            let Counter::Expression(id) = counter else {
                continue;
            };
            if self.adjusted.contains_key(&id.index()) {
                continue;
            }
            let expr = *self.builder.expression(id)?;
            let index = self.used.len() as u32;
            if index > MAX_COUNTER_ID {
                return Err(MappingError::CounterOverflow(index));
            }
            self.adjusted.insert(id.index(), index);
            self.used.push(expr);
            stack.push(expr.rhs);
            stack.push(expr.lhs);
        }
        Ok(())
    }

    fn encode_counter(&self, counter: Counter) -> Result<u64> {
        match counter {
            Counter::Zero => Ok(TAG_ZERO),
            Counter::Raw(id) => {
                if id > MAX_COUNTER_ID {
                    return Err(MappingError::CounterOverflow(id));
                }
                Ok((u64::from(id) << ENCODING_TAG_BITS) | TAG_COUNTER)
            }
            Counter::Expression(id) => {
                let kind = self.builder.expression(id)?.kind;
                let index = self.adjusted.get(&id.index()).copied().ok_or(
                    MappingError::UnknownExpression {
                        index: id.index(),
                        len: self.used.len(),
                    },
                )?;
                Ok((u64::from(index) << ENCODING_TAG_BITS) | (TAG_EXPRESSION + kind as u64))
            }
        }
    }

    fn write_region(&self, out: &mut Vec<u8>, r: &LocalRegion<'_>, prev_line_start: u32) -> Result<()> {
        let region = r.region;
        let mut column_end = region.column_end;
        let tag = match region.kind {
            RegionKind::Code => self.encode_counter(region.counter)?,
            RegionKind::Gap => {
                column_end |= GAP_REGION_BIT;
                self.encode_counter(region.counter)?
            }
            RegionKind::Expansion { .. } => {
                let expanded = u64::from(r.expanded_file.unwrap_or_default());
                EXPANSION_REGION_BIT
                    | (expanded << ENCODING_COUNTER_TAG_AND_EXPANSION_REGION_TAG_BITS)
            }
            RegionKind::Skip => {
                SKIPPED_REGION_KIND << ENCODING_COUNTER_TAG_AND_EXPANSION_REGION_TAG_BITS
            }
        };
        trace!(region = %region, tag, "encoding region");

        write_uleb128(out, tag);
        write_uleb128(out, u64::from(region.line_start - prev_line_start));
        write_uleb128(out, u64::from(region.column_start));
        write_uleb128(out, u64::from(region.line_end - region.line_start));
        write_uleb128(out, u64::from(column_end));
        Ok(())
    }
}
