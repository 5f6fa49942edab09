//! IR emission interface used by coverage emission.

use crate::Result;
use crate::function::{Function, FunctionId, Signature};
use crate::global::{GlobalId, GlobalVar, Linkage};

/// Object file format of the module being built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ObjectFormat {
    #[default]
    Elf,
    MachO,
    Coff,
}

/// The module-building operations coverage emission needs.
///
/// Implemented by [`crate::Module`]; a backend bound to a real compiler IR
/// implements it over its own module type.
pub trait IrEmitter {
    /// Object format the module targets.
    fn object_format(&self) -> ObjectFormat;

    /// Add a global variable. Names are unique within a module.
    fn add_global(&mut self, global: GlobalVar) -> Result<GlobalId>;

    /// Look up a global.
    fn global(&self, id: GlobalId) -> Option<&GlobalVar>;

    /// Look up a global by symbol name.
    fn global_by_name(&self, name: &str) -> Option<GlobalId>;

    /// Look up a function.
    fn function(&self, id: FunctionId) -> Option<&Function>;

    /// Return the function named `name`, declaring it first if needed.
    fn get_or_insert_function(
        &mut self,
        name: &str,
        signature: Signature,
        linkage: Linkage,
    ) -> Result<FunctionId>;

    /// Keep a global alive through linker dead-stripping.
    fn mark_used(&mut self, id: GlobalId);

    /// 64-bit hash of a PGO function name, used as a function record's name
    /// reference. llvm-cov matches it against the low 64 bits of the name's
    /// MD5 digest.
    fn name_hash(&self, name: &str) -> u64;
}
