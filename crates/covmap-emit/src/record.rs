//! Per-function coverage records.

use covmap_ir::{Constant, IrEmitter, Type};
use covmap_mapping::FunctionCoverage;
use tracing::debug;

use crate::{EmitError, Result};

/// Entry of the function record array in the coverage mapping global:
/// packed `<{ i64 name_ref, i32 data_size, i64 func_hash }>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FunctionRecord {
    /// Hash of the function's PGO name.
    pub name_ref: u64,
    /// Length of the function's mapping data in bytes.
    pub data_size: u32,
    /// Structural hash of the function body.
    pub func_hash: u64,
}

impl FunctionRecord {
    /// IR type of one record.
    pub fn ty() -> Type {
        Type::structure(vec![Type::I64, Type::I32, Type::I64], true)
    }

    pub fn to_constant(&self) -> Constant {
        Constant::structure(
            vec![
                Constant::i64(self.name_ref),
                Constant::i32(self.data_size),
                Constant::i64(self.func_hash),
            ],
            true,
        )
    }
}

/// Build the function record pairing `name` and `hash` with the encoded
/// mapping produced for that function.
pub fn add_function_mapping_record<M: IrEmitter + ?Sized>(
    module: &M,
    name: &str,
    hash: u64,
    coverage: &FunctionCoverage,
) -> Result<FunctionRecord> {
    let data_size =
        u32::try_from(coverage.len()).map_err(|_| EmitError::SectionTooLarge("function mapping data"))?;
    let record = FunctionRecord {
        name_ref: module.name_hash(name),
        data_size,
        func_hash: hash,
    };
    debug!(
        function = name,
        name_ref = format!("{:#018x}", record.name_ref),
        data_size,
        "added function mapping record"
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use covmap_ir::{
        Function, FunctionId, GlobalId, GlobalVar, Linkage, Module, ObjectFormat, Signature,
    };

    /// Module whose name references come from a fixed table, standing in for
    /// a backend that supplies MD5 name hashes.
    struct FixedHashModule {
        inner: Module,
        hashes: &'static [(&'static str, u64)],
    }

    impl IrEmitter for FixedHashModule {
        fn object_format(&self) -> ObjectFormat {
            self.inner.object_format()
        }

        fn add_global(&mut self, global: GlobalVar) -> covmap_ir::Result<GlobalId> {
            self.inner.add_global(global)
        }

        fn global(&self, id: GlobalId) -> Option<&GlobalVar> {
            self.inner.global(id)
        }

        fn global_by_name(&self, name: &str) -> Option<GlobalId> {
            self.inner.global_by_name(name)
        }

        fn function(&self, id: FunctionId) -> Option<&Function> {
            self.inner.function(id)
        }

        fn get_or_insert_function(
            &mut self,
            name: &str,
            signature: Signature,
            linkage: Linkage,
        ) -> covmap_ir::Result<FunctionId> {
            self.inner.get_or_insert_function(name, signature, linkage)
        }

        fn mark_used(&mut self, id: GlobalId) {
            self.inner.mark_used(id);
        }

        fn name_hash(&self, name: &str) -> u64 {
            self.hashes
                .iter()
                .find(|(n, _)| *n == name)
                .map_or(0, |(_, hash)| *hash)
        }
    }

    #[test]
    fn test_record_fields() {
        let module = Module::default();
        let coverage = FunctionCoverage::from_bytes(vec![0, 0]);
        let record = add_function_mapping_record(&module, "main", 42, &coverage).unwrap();
        assert_eq!(record.name_ref, module.name_hash("main"));
        assert_eq!(record.data_size, 2);
        assert_eq!(record.func_hash, 42);
    }

    #[test]
    fn test_name_ref_comes_from_emitter() {
        let module = FixedHashModule {
            inner: Module::default(),
            hashes: &[("main", 0x5eed_0000_0000_0001)],
        };
        let coverage = FunctionCoverage::from_bytes(vec![0, 0]);
        let record = add_function_mapping_record(&module, "main", 42, &coverage).unwrap();
        assert_eq!(record.name_ref, 0x5eed_0000_0000_0001);
        assert_ne!(record.name_ref, Module::default().name_hash("main"));
    }

    #[test]
    fn test_constant_layout() {
        let record = FunctionRecord {
            name_ref: 1,
            data_size: 2,
            func_hash: 3,
        };
        let constant = record.to_constant();
        assert_eq!(constant.ty(), FunctionRecord::ty());
        assert_eq!(FunctionRecord::ty().store_size(), 20);
        let fields = constant.fields().unwrap();
        assert_eq!(fields[1].as_int(), Some(2));
    }
}
