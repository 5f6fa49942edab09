//! Flat decoder for function mapping records.

use crate::counter::{
    ENCODING_COUNTER_TAG_AND_EXPANSION_REGION_TAG_BITS, ENCODING_TAG_BITS, ENCODING_TAG_MASK,
    ExprKind, TAG_COUNTER, TAG_ZERO,
};
use crate::leb128::read_uleb128;
use crate::region::RegionKind;
use crate::writer::{EXPANSION_REGION_BIT, GAP_REGION_BIT, SKIPPED_REGION_KIND};
use crate::{MappingError, Result};

/// Counter reference as stored in a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodedCounter {
    Zero,
    Raw(u32),
    Expression { kind: ExprKind, index: u32 },
}

/// Stored expression operands. The kind lives on the referencing counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedExpression {
    pub lhs: DecodedCounter,
    pub rhs: DecodedCounter,
}

/// Region as stored; file ids are positions in the record's file mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedRegion {
    pub file: u32,
    pub counter: DecodedCounter,
    pub kind: RegionKind,
    pub line_start: u32,
    pub column_start: u32,
    pub line_end: u32,
    pub column_end: u32,
}

impl DecodedRegion {
    pub const fn start(&self) -> (u32, u32) {
        (self.line_start, self.column_start)
    }

    pub const fn end(&self) -> (u32, u32) {
        (self.line_end, self.column_end)
    }
}

/// Decoded function mapping record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedMapping {
    pub file_ids: Vec<u32>,
    pub expressions: Vec<DecodedExpression>,
    /// Regions in stored order.
    pub regions: Vec<DecodedRegion>,
}

impl DecodedMapping {
    /// Render a counter with its expression tree, e.g. `expr(add,0,1)`.
    pub fn describe(&self, counter: DecodedCounter) -> String {
        self.describe_bounded(counter, self.expressions.len())
    }

    fn describe_bounded(&self, counter: DecodedCounter, depth: usize) -> String {
        match counter {
            DecodedCounter::Zero => "zero".to_string(),
            DecodedCounter::Raw(id) => id.to_string(),
            DecodedCounter::Expression { kind, index } => {
                match (depth, self.expressions.get(index as usize)) {
                    (1.., Some(expr)) => format!(
                        "expr({},{},{})",
                        kind.name(),
                        self.describe_bounded(expr.lhs, depth - 1),
                        self.describe_bounded(expr.rhs, depth - 1)
                    ),
                    _ => format!("expr#{index}"),
                }
            }
        }
    }

    /// Regions stored for one local file.
    pub fn regions_in(&self, file: u32) -> impl Iterator<Item = &DecodedRegion> {
        self.regions.iter().filter(move |r| r.file == file)
    }
}

/// Decode a complete function mapping record.
pub fn read_function_mapping(data: &[u8]) -> Result<DecodedMapping> {
    let mut reader = RecordReader { data, pos: 0 };

    let num_files = reader.read_len()?;
    let file_ids = (0..num_files)
        .map(|_| reader.read_u32())
        .collect::<Result<Vec<_>>>()?;

    let num_expressions = reader.read_len()?;
    let mut expressions = Vec::with_capacity(num_expressions);
    for _ in 0..num_expressions {
        let lhs = reader.read_counter(num_expressions)?;
        let rhs = reader.read_counter(num_expressions)?;
        expressions.push(DecodedExpression { lhs, rhs });
    }

    let mut regions = Vec::new();
    for file in 0..num_files as u32 {
        let num_regions = reader.read_len()?;
        let mut line_start = 0u32;
        for _ in 0..num_regions {
            let raw = reader.read()?;
            let (counter, mut kind) = if raw & ENCODING_TAG_MASK == TAG_ZERO {
                if raw & EXPANSION_REGION_BIT != 0 {
                    let expanded = narrow(raw >> ENCODING_COUNTER_TAG_AND_EXPANSION_REGION_TAG_BITS)?;
                    if expanded as usize >= num_files {
                        return Err(MappingError::Malformed("expansion targets an unknown file"));
                    }
                    (
                        DecodedCounter::Zero,
                        RegionKind::Expansion {
                            expanded_file_id: expanded,
                        },
                    )
                } else {
                    match raw >> ENCODING_COUNTER_TAG_AND_EXPANSION_REGION_TAG_BITS {
                        0 => (DecodedCounter::Zero, RegionKind::Code),
                        SKIPPED_REGION_KIND => (DecodedCounter::Zero, RegionKind::Skip),
                        _ => return Err(MappingError::Malformed("unknown region kind")),
                    }
                }
            } else {
                (decode_counter(raw, num_expressions)?, RegionKind::Code)
            };

            line_start = line_start
                .checked_add(reader.read_u32()?)
                .ok_or(MappingError::Malformed("line overflow"))?;
            let column_start = reader.read_u32()?;
            let line_end = line_start
                .checked_add(reader.read_u32()?)
                .ok_or(MappingError::Malformed("line overflow"))?;
            let mut column_end = reader.read_u32()?;
            if column_end & GAP_REGION_BIT != 0 {
                kind = RegionKind::Gap;
                column_end &= !GAP_REGION_BIT;
            }

            regions.push(DecodedRegion {
                file,
                counter,
                kind,
                line_start,
                column_start,
                line_end,
                column_end,
            });
        }
    }

    if reader.pos != data.len() {
        return Err(MappingError::Malformed("trailing bytes after mapping record"));
    }

    Ok(DecodedMapping {
        file_ids,
        expressions,
        regions,
    })
}

struct RecordReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl RecordReader<'_> {
    fn read(&mut self) -> Result<u64> {
        read_uleb128(self.data, &mut self.pos)
    }

    fn read_u32(&mut self) -> Result<u32> {
        narrow(self.read()?)
    }

    /// Element count; bounded by the remaining input so corrupt counts fail
    /// before allocating.
    fn read_len(&mut self) -> Result<usize> {
        let len = self.read()?;
        if len > (self.data.len() - self.pos) as u64 {
            return Err(MappingError::Truncated);
        }
        Ok(len as usize)
    }

    fn read_counter(&mut self, num_expressions: usize) -> Result<DecodedCounter> {
        let raw = self.read()?;
        decode_counter(raw, num_expressions)
    }
}

fn narrow(value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| MappingError::Malformed("value exceeds 32 bits"))
}

fn decode_counter(raw: u64, num_expressions: usize) -> Result<DecodedCounter> {
    let id = narrow(raw >> ENCODING_TAG_BITS)?;
    match raw & ENCODING_TAG_MASK {
        TAG_ZERO => Ok(DecodedCounter::Zero),
        TAG_COUNTER => Ok(DecodedCounter::Raw(id)),
        tag => {
            if id as usize >= num_expressions {
                return Err(MappingError::Malformed("expression index out of range"));
            }
            let kind = if tag == 2 { ExprKind::Subtract } else { ExprKind::Add };
            Ok(DecodedCounter::Expression { kind, index: id })
        }
    }
}
