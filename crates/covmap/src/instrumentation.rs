//! Counter increments for an instrumented function.

use covmap_emit::{create_pgo_function_name_var, create_pgo_name_var, instr_prof_increment};
use covmap_ir::{CallSite, FunctionId, GlobalId, IrEmitter, Linkage, Operand};
use tracing::trace;

use crate::region::FunctionRegions;
use crate::{Error, Result};

/// Name variable of a function: linked to its definition when known,
/// otherwise private.
pub(crate) fn function_name_var<M: IrEmitter + ?Sized>(
    module: &mut M,
    regions: &FunctionRegions,
) -> Result<GlobalId> {
    let id = match regions.function {
        Some(function) => create_pgo_function_name_var(module, function, &regions.symbol)?,
        None => create_pgo_name_var(module, Linkage::Internal, &regions.symbol)?,
    };
    Ok(id)
}

/// Produces the `llvm.instrprof.increment` calls for one function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionInstrumentation {
    symbol: String,
    name_var: GlobalId,
    intrinsic: FunctionId,
    hash: u64,
    num_regions: u32,
}

impl FunctionInstrumentation {
    /// Create the function's name variable and declare the intrinsic.
    pub fn new<M: IrEmitter + ?Sized>(module: &mut M, regions: &FunctionRegions) -> Result<Self> {
        let num_regions =
            u32::try_from(regions.regions.len()).map_err(|_| Error::TooLarge("region count"))?;
        let name_var = function_name_var(module, regions)?;
        let intrinsic = instr_prof_increment(module)?;
        Ok(Self {
            symbol: regions.symbol.clone(),
            name_var,
            intrinsic,
            hash: regions.structural_hash,
            num_regions,
        })
    }

    /// Call bumping the counter of region `index`:
    /// `increment(name_var, hash, num_regions, index)`.
    pub fn increment(&self, index: u32) -> Result<CallSite> {
        if index >= self.num_regions {
            return Err(Error::RegionOutOfRange {
                symbol: self.symbol.clone(),
                index,
                len: self.num_regions,
            });
        }
        trace!(symbol = %self.symbol, index, "region increment");
        Ok(CallSite::new(
            self.intrinsic,
            vec![
                Operand::Global(self.name_var),
                Operand::I64(self.hash),
                Operand::I32(self.num_regions),
                Operand::I32(index),
            ],
        ))
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub const fn name_var(&self) -> GlobalId {
        self.name_var
    }

    pub const fn intrinsic(&self) -> FunctionId {
        self.intrinsic
    }

    pub const fn num_regions(&self) -> u32 {
        self.num_regions
    }
}
