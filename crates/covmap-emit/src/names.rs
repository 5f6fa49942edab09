//! Function name globals for the profiling runtime.

use covmap_ir::{
    Constant, FunctionId, GlobalId, GlobalVar, IrEmitter, IrError, Linkage, Type, Visibility,
};
use tracing::debug;

use crate::{EmitError, Result};

/// Prefix of per-function PGO name variables.
pub const PGO_NAME_VAR_PREFIX: &str = "__profn_";
/// Array of names of functions that have coverage but no emitted body.
pub const COVERAGE_UNUSED_NAMES_VAR_NAME: &str = "__llvm_coverage_names";

/// Characters replaced in local name variable symbols.
const INVALID_SYMBOL_CHARS: &[char] = &['-', ':', '<', '>', '/', '"', '\''];

/// Linkage for a name variable of a function with `linkage`.
///
/// Weak and available-externally linkage become link-once so every object
/// keeps a copy; internal and external functions get a private name.
pub const fn name_var_linkage(linkage: Linkage) -> Linkage {
    match linkage {
        Linkage::ExternalWeak => Linkage::LinkOnceAny,
        Linkage::AvailableExternally => Linkage::LinkOnceOdr,
        Linkage::Internal | Linkage::External => Linkage::Private,
        other => other,
    }
}

/// Symbol of the name variable for `pgo_name` with (final) `linkage`.
pub fn name_var_symbol(pgo_name: &str, linkage: Linkage) -> String {
    let name = format!("{PGO_NAME_VAR_PREFIX}{pgo_name}");
    if linkage.is_local() {
        name.replace(INVALID_SYMBOL_CHARS, "_")
    } else {
        name
    }
}

/// Create the private global holding `pgo_name` for `function`.
pub fn create_pgo_function_name_var<M: IrEmitter + ?Sized>(
    module: &mut M,
    function: FunctionId,
    pgo_name: &str,
) -> Result<GlobalId> {
    let linkage = module
        .function(function)
        .ok_or(EmitError::UnknownFunction(function.0))?
        .linkage;
    create_pgo_name_var(module, linkage, pgo_name)
}

/// Create the global holding `pgo_name` for a function with `linkage`.
///
/// The name bytes are stored without a terminator. Calling this again for
/// the same name returns the existing global.
pub fn create_pgo_name_var<M: IrEmitter + ?Sized>(
    module: &mut M,
    linkage: Linkage,
    pgo_name: &str,
) -> Result<GlobalId> {
    let linkage = name_var_linkage(linkage);
    let symbol = name_var_symbol(pgo_name, linkage);
    if let Some(existing) = module.global_by_name(&symbol) {
        return Ok(existing);
    }

    let mut global = GlobalVar::constant(&symbol, Constant::bytes(pgo_name.as_bytes()), linkage);
    if !linkage.is_local() {
        global = global.with_visibility(Visibility::Hidden);
    }
    if linkage.is_link_once() {
        global = global.with_comdat(&symbol);
    }
    let id = module.add_global(global)?;
    debug!(symbol = %symbol, ?linkage, "created PGO name variable");
    Ok(id)
}

/// Create `__llvm_coverage_names`, an array of pointers to name variables.
pub fn add_function_names_global<M: IrEmitter + ?Sized>(
    module: &mut M,
    names: &[GlobalId],
) -> Result<GlobalId> {
    for &name in names {
        if module.global(name).is_none() {
            return Err(IrError::UnknownGlobal(name.0).into());
        }
    }
    let elems = names.iter().map(|&id| Constant::GlobalAddr(id)).collect();
    let global = GlobalVar::constant(
        COVERAGE_UNUSED_NAMES_VAR_NAME,
        Constant::array(Type::Ptr, elems),
        Linkage::Internal,
    );
    let id = module.add_global(global)?;
    debug!(count = names.len(), "added coverage names global");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use covmap_ir::{Function, Module, Signature};

    fn module_with(linkage: Linkage) -> (Module, FunctionId) {
        let mut module = Module::default();
        let f = module
            .add_function(Function::new(
                "f",
                Signature::new(vec![], Type::Void),
                linkage,
            ))
            .unwrap();
        (module, f)
    }

    #[test]
    fn test_external_function_gets_private_name() {
        let (mut module, f) = module_with(Linkage::External);
        let id = create_pgo_function_name_var(&mut module, f, "pkg/file.kt:f").unwrap();
        let global = module.global(id).unwrap();
        assert_eq!(global.name, "__profn_pkg_file.kt_f");
        assert_eq!(global.linkage, Linkage::Private);
        assert_eq!(global.visibility, Visibility::Default);
        assert_eq!(global.initializer.as_bytes(), Some(&b"pkg/file.kt:f"[..]));
        assert!(global.constant);
    }

    #[test]
    fn test_weak_function_gets_hidden_link_once_name() {
        let (mut module, f) = module_with(Linkage::ExternalWeak);
        let id = create_pgo_function_name_var(&mut module, f, "a:b").unwrap();
        let global = module.global(id).unwrap();
        assert_eq!(global.name, "__profn_a:b");
        assert_eq!(global.linkage, Linkage::LinkOnceAny);
        assert_eq!(global.visibility, Visibility::Hidden);
        assert_eq!(global.comdat.as_deref(), Some("__profn_a:b"));
    }

    #[test]
    fn test_name_var_reused() {
        let (mut module, f) = module_with(Linkage::Internal);
        let first = create_pgo_function_name_var(&mut module, f, "f").unwrap();
        let second = create_pgo_function_name_var(&mut module, f, "f").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_function() {
        let mut module = Module::default();
        assert_eq!(
            create_pgo_function_name_var(&mut module, FunctionId(3), "f"),
            Err(EmitError::UnknownFunction(3))
        );
    }

    #[test]
    fn test_names_global() {
        let (mut module, f) = module_with(Linkage::External);
        let name = create_pgo_function_name_var(&mut module, f, "f").unwrap();
        let id = add_function_names_global(&mut module, &[name]).unwrap();
        let global = module.global(id).unwrap();
        assert_eq!(global.name, COVERAGE_UNUSED_NAMES_VAR_NAME);
        assert_eq!(global.linkage, Linkage::Internal);
        assert_eq!(global.ty, Type::array(Type::Ptr, 1));
        assert_eq!(global.initializer.elements(), Some(&[Constant::GlobalAddr(name)][..]));
    }

    #[test]
    fn test_names_global_rejects_unknown_global() {
        let mut module = Module::default();
        assert_eq!(
            add_function_names_global(&mut module, &[GlobalId(9)]),
            Err(EmitError::Ir(IrError::UnknownGlobal(9)))
        );
    }
}
