//! In-memory module.

use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHasher};

use crate::emitter::{IrEmitter, ObjectFormat};
use crate::function::{Function, FunctionId, Signature};
use crate::global::{GlobalId, GlobalVar, Linkage};
use crate::{IrError, Result};

/// In-memory IR module.
///
/// Function name references are FxHash values: deterministic for a given
/// name, but not the MD5 of the name that llvm-cov looks up. Records built
/// against this module only resolve against profiles produced by the same
/// hashing. A backend whose output is read by llvm-cov supplies the MD5
/// through its own [`IrEmitter::name_hash`].
#[derive(Clone, Debug, Default)]
pub struct Module {
    /// Module identifier.
    pub name: String,
    /// Target object format.
    pub format: ObjectFormat,
    globals: Vec<GlobalVar>,
    functions: Vec<Function>,
    /// Symbol name -> global.
    global_names: FxHashMap<String, GlobalId>,
    /// Symbol name -> function.
    function_names: FxHashMap<String, FunctionId>,
    /// Globals listed in `llvm.used`.
    used: Vec<GlobalId>,
}

impl Module {
    /// Create an empty module.
    pub fn new(name: impl Into<String>, format: ObjectFormat) -> Self {
        Self {
            name: name.into(),
            format,
            ..Default::default()
        }
    }

    /// Define a function, failing if the name is taken.
    pub fn add_function(&mut self, function: Function) -> Result<FunctionId> {
        if self.function_names.contains_key(&function.name) {
            return Err(IrError::DuplicateSymbol(function.name));
        }
        let id = FunctionId(self.functions.len() as u32);
        self.function_names.insert(function.name.clone(), id);
        self.functions.push(function);
        Ok(id)
    }

    /// Look up a function by name.
    pub fn function_by_name(&self, name: &str) -> Option<FunctionId> {
        self.function_names.get(name).copied()
    }

    /// All globals in definition order.
    pub fn globals(&self) -> impl Iterator<Item = (GlobalId, &GlobalVar)> {
        self.globals
            .iter()
            .enumerate()
            .map(|(i, g)| (GlobalId(i as u32), g))
    }

    /// All functions in definition order.
    pub fn functions(&self) -> impl Iterator<Item = (FunctionId, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .map(|(i, f)| (FunctionId(i as u32), f))
    }

    /// Globals kept alive through `llvm.used`.
    pub fn used_globals(&self) -> &[GlobalId] {
        &self.used
    }
}

impl IrEmitter for Module {
    fn object_format(&self) -> ObjectFormat {
        self.format
    }

    fn add_global(&mut self, global: GlobalVar) -> Result<GlobalId> {
        if self.global_names.contains_key(&global.name) {
            return Err(IrError::DuplicateSymbol(global.name));
        }
        let actual = global.initializer.ty();
        if actual != global.ty {
            return Err(IrError::InitializerType {
                name: global.name,
                expected: global.ty,
                actual,
            });
        }
        let id = GlobalId(self.globals.len() as u32);
        self.global_names.insert(global.name.clone(), id);
        self.globals.push(global);
        Ok(id)
    }

    fn global(&self, id: GlobalId) -> Option<&GlobalVar> {
        self.globals.get(id.0 as usize)
    }

    fn global_by_name(&self, name: &str) -> Option<GlobalId> {
        self.global_names.get(name).copied()
    }

    fn function(&self, id: FunctionId) -> Option<&Function> {
        self.functions.get(id.0 as usize)
    }

    fn get_or_insert_function(
        &mut self,
        name: &str,
        signature: Signature,
        linkage: Linkage,
    ) -> Result<FunctionId> {
        if let Some(id) = self.function_by_name(name) {
            if self.functions[id.0 as usize].signature != signature {
                return Err(IrError::SignatureMismatch {
                    name: name.to_string(),
                });
            }
            return Ok(id);
        }
        self.add_function(Function::new(name, signature, linkage))
    }

    fn mark_used(&mut self, id: GlobalId) {
        if !self.used.contains(&id) {
            self.used.push(id);
        }
    }

    /// FxHash of `name`. Not MD5; see [`Module`].
    fn name_hash(&self, name: &str) -> u64 {
        let mut hasher = FxHasher::default();
        name.hash(&mut hasher);
        hasher.finish()
    }
}
