//! Constant initializers.

use crate::global::GlobalId;
use crate::types::Type;

/// Constant value used as a global initializer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Constant {
    /// Integer with bit width.
    Int { bits: u32, value: u64 },
    /// Raw byte string, typed `[n x i8]`.
    Bytes(Vec<u8>),
    Array { elem: Type, elems: Vec<Constant> },
    Struct { fields: Vec<Constant>, packed: bool },
    /// Address of a global.
    GlobalAddr(GlobalId),
}

impl Constant {
    pub const fn i32(value: u32) -> Self {
        Self::Int {
            bits: 32,
            value: value as u64,
        }
    }

    pub const fn i64(value: u64) -> Self {
        Self::Int { bits: 64, value }
    }

    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(data.into())
    }

    pub const fn array(elem: Type, elems: Vec<Self>) -> Self {
        Self::Array { elem, elems }
    }

    pub const fn structure(fields: Vec<Self>, packed: bool) -> Self {
        Self::Struct { fields, packed }
    }

    /// Type of this constant.
    pub fn ty(&self) -> Type {
        match self {
            Self::Int { bits, .. } => Type::Int(*bits),
            Self::Bytes(data) => Type::array(Type::I8, data.len() as u64),
            Self::Array { elem, elems } => Type::array(elem.clone(), elems.len() as u64),
            Self::Struct { fields, packed } => {
                Type::structure(fields.iter().map(Self::ty).collect(), *packed)
            }
            Self::GlobalAddr(_) => Type::Ptr,
        }
    }

    /// Integer value, if this is an integer constant.
    pub const fn as_int(&self) -> Option<u64> {
        match self {
            Self::Int { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Byte contents, if this is a byte string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(data) => Some(data),
            _ => None,
        }
    }

    /// Struct fields, if this is a struct.
    pub fn fields(&self) -> Option<&[Self]> {
        match self {
            Self::Struct { fields, .. } => Some(fields),
            _ => None,
        }
    }

    /// Array elements, if this is an array.
    pub fn elements(&self) -> Option<&[Self]> {
        match self {
            Self::Array { elems, .. } => Some(elems),
            _ => None,
        }
    }
}
