//! Module filename table.

use covmap_mapping::MappingError;
use covmap_mapping::leb128::{read_uleb128, write_uleb128};
use rustc_hash::FxHashMap;

use crate::{EmitError, Result};

/// Deduplicated filenames referenced by a module's coverage records.
///
/// Callers number their files with slot indices; the table keeps the slot
/// order and maps every slot to the position of its (first) filename.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilenameTable {
    names: Vec<String>,
    /// Slot index -> table position.
    positions: Vec<u32>,
}

impl FilenameTable {
    /// Place `filenames[i]` at slot `indices[i]`.
    ///
    /// The indices must be a permutation of `0..filenames.len()`.
    pub fn new<S: AsRef<str>>(filenames: &[S], indices: &[u32]) -> Result<Self> {
        if filenames.len() != indices.len() {
            return Err(EmitError::LengthMismatch {
                what: "filename indices",
                expected: filenames.len(),
                actual: indices.len(),
            });
        }

        let mut slots: Vec<Option<&str>> = vec![None; filenames.len()];
        for (name, &index) in filenames.iter().zip(indices) {
            let slot = slots
                .get_mut(index as usize)
                .ok_or(EmitError::FilenameIndexOutOfRange {
                    index,
                    len: filenames.len(),
                })?;
            if slot.replace(name.as_ref()).is_some() {
                return Err(EmitError::DuplicateFilenameIndex(index));
            }
        }

        let mut names = Vec::new();
        let mut seen: FxHashMap<&str, u32> = FxHashMap::default();
        let positions = slots
            .into_iter()
            .map(|slot| {
                // Every slot is filled: n distinct indices below n.
                let name = slot.unwrap_or_default();
                *seen.entry(name).or_insert_with(|| {
                    names.push(name.to_string());
                    (names.len() - 1) as u32
                })
            })
            .collect();

        Ok(Self { names, positions })
    }

    /// Table position of a caller slot index.
    pub fn resolve(&self, index: u32) -> Option<u32> {
        self.positions.get(index as usize).copied()
    }

    /// Filenames in table order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Encode as `uleb(count) { uleb(len) bytes }*`.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_uleb128(&mut out, self.names.len() as u64);
        for name in &self.names {
            write_uleb128(&mut out, name.len() as u64);
            out.extend_from_slice(name.as_bytes());
        }
        out
    }

    /// Decode an encoded table; returns the names and the bytes consumed.
    pub fn decode(data: &[u8]) -> Result<(Vec<String>, usize)> {
        let mut pos = 0;
        let count = read_uleb128(data, &mut pos)?;
        let mut names = Vec::new();
        for _ in 0..count {
            let len = read_uleb128(data, &mut pos)? as usize;
            let bytes = data
                .get(pos..pos.saturating_add(len))
                .ok_or(MappingError::Truncated)?;
            let name = std::str::from_utf8(bytes)
                .map_err(|_| MappingError::Malformed("filename is not valid UTF-8"))?;
            names.push(name.to_string());
            pos += len;
        }
        Ok((names, pos))
    }
}
