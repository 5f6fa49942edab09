//! Profiling runtime intrinsics.

use covmap_ir::{FunctionId, IrEmitter, Linkage, Signature, Type};

use crate::Result;

/// Intrinsic that bumps one counter of a function's counter array.
pub const INSTRPROF_INCREMENT: &str = "llvm.instrprof.increment";

/// `void (ptr name, i64 hash, i32 num_counters, i32 index)`.
pub fn instr_prof_increment_signature() -> Signature {
    Signature::new(vec![Type::Ptr, Type::I64, Type::I32, Type::I32], Type::Void)
}

/// Declare (or fetch) the counter increment intrinsic.
pub fn instr_prof_increment<M: IrEmitter + ?Sized>(module: &mut M) -> Result<FunctionId> {
    Ok(module.get_or_insert_function(
        INSTRPROF_INCREMENT,
        instr_prof_increment_signature(),
        Linkage::External,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use covmap_ir::Module;

    #[test]
    fn test_declared_once() {
        let mut module = Module::default();
        let first = instr_prof_increment(&mut module).unwrap();
        let second = instr_prof_increment(&mut module).unwrap();
        assert_eq!(first, second);
        let function = module.function(first).unwrap();
        assert!(function.intrinsic);
        assert_eq!(function.signature.params.len(), 4);
    }
}
