//! Function declarations and call sites.

use crate::global::{GlobalId, Linkage};
use crate::types::Type;

/// Handle to a function inside a module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub u32);

/// Function signature.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signature {
    pub params: Vec<Type>,
    pub ret: Type,
}

impl Signature {
    pub const fn new(params: Vec<Type>, ret: Type) -> Self {
        Self { params, ret }
    }
}

/// Function declaration or definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub signature: Signature,
    pub linkage: Linkage,
    /// Compiler intrinsic (lowered by the backend, never linked).
    pub intrinsic: bool,
}

impl Function {
    pub fn new(name: impl Into<String>, signature: Signature, linkage: Linkage) -> Self {
        let name = name.into();
        let intrinsic = name.starts_with("llvm.");
        Self {
            name,
            signature,
            linkage,
            intrinsic,
        }
    }
}

/// Call operand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    Global(GlobalId),
    I32(u32),
    I64(u64),
}

impl Operand {
    pub const fn ty(&self) -> Type {
        match self {
            Self::Global(_) => Type::Ptr,
            Self::I32(_) => Type::I32,
            Self::I64(_) => Type::I64,
        }
    }
}

/// A call the code generator should place at an instrumentation point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallSite {
    pub callee: FunctionId,
    pub args: Vec<Operand>,
}

impl CallSite {
    pub const fn new(callee: FunctionId, args: Vec<Operand>) -> Self {
        Self { callee, args }
    }

    /// Check argument types against a signature.
    pub fn matches(&self, signature: &Signature) -> bool {
        self.args.len() == signature.params.len()
            && self
                .args
                .iter()
                .zip(&signature.params)
                .all(|(arg, param)| arg.ty() == *param)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intrinsic_detection() {
        let sig = Signature::new(vec![], Type::Void);
        assert!(Function::new("llvm.instrprof.increment", sig.clone(), Linkage::External).intrinsic);
        assert!(!Function::new("main", sig, Linkage::External).intrinsic);
    }

    #[test]
    fn test_call_site_matches() {
        let sig = Signature::new(vec![Type::Ptr, Type::I64], Type::Void);
        let call = CallSite::new(
            FunctionId(0),
            vec![Operand::Global(GlobalId(1)), Operand::I64(9)],
        );
        assert!(call.matches(&sig));
        let bad = CallSite::new(FunctionId(0), vec![Operand::I32(1)]);
        assert!(!bad.matches(&sig));
    }
}
