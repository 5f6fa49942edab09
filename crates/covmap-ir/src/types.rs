//! IR types.

use std::fmt;

/// First-class IR type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    /// Integer of the given bit width.
    Int(u32),
    /// Opaque pointer.
    Ptr,
    Array {
        elem: Box<Type>,
        len: u64,
    },
    Struct {
        fields: Vec<Type>,
        packed: bool,
    },
}

impl Type {
    pub const I8: Self = Self::Int(8);
    pub const I32: Self = Self::Int(32);
    pub const I64: Self = Self::Int(64);

    /// Create an array type.
    pub fn array(elem: Self, len: u64) -> Self {
        Self::Array {
            elem: Box::new(elem),
            len,
        }
    }

    /// Create a struct type.
    pub const fn structure(fields: Vec<Self>, packed: bool) -> Self {
        Self::Struct { fields, packed }
    }

    /// Byte size of a value of this type (pointers are 8 bytes).
    ///
    /// Non-packed structs align each field to its natural alignment and pad
    /// the tail to the struct alignment.
    pub fn store_size(&self) -> u64 {
        match self {
            Self::Void => 0,
            Self::Int(bits) => u64::from(bits.div_ceil(8)),
            Self::Ptr => 8,
            Self::Array { elem, len } => elem.store_size() * len,
            Self::Struct { fields, packed } => {
                let mut size = 0u64;
                for field in fields {
                    if !packed {
                        size = size.next_multiple_of(field.align());
                    }
                    size += field.store_size();
                }
                if *packed { size } else { size.next_multiple_of(self.align()) }
            }
        }
    }

    /// Natural alignment in bytes.
    pub fn align(&self) -> u64 {
        match self {
            Self::Void => 1,
            Self::Int(_) => self.store_size().next_power_of_two().clamp(1, 8),
            Self::Ptr => 8,
            Self::Array { elem, .. } => elem.align(),
            Self::Struct { fields, packed } => {
                if *packed {
                    1
                } else {
                    fields.iter().map(Self::align).max().unwrap_or(1)
                }
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => write!(f, "void"),
            Self::Int(bits) => write!(f, "i{bits}"),
            Self::Ptr => write!(f, "ptr"),
            Self::Array { elem, len } => write!(f, "[{len} x {elem}]"),
            Self::Struct { fields, packed } => {
                if *packed {
                    write!(f, "<")?;
                }
                write!(f, "{{ ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{field}")?;
                }
                write!(f, " }}")?;
                if *packed {
                    write!(f, ">")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let record = Type::structure(vec![Type::I64, Type::I32, Type::I64], true);
        assert_eq!(record.to_string(), "<{ i64, i32, i64 }>");
        assert_eq!(Type::array(Type::I8, 3).to_string(), "[3 x i8]");
    }

    #[test]
    fn test_store_size_packed_vs_natural() {
        let fields = vec![Type::I64, Type::I32, Type::I64];
        assert_eq!(Type::structure(fields.clone(), true).store_size(), 20);
        assert_eq!(Type::structure(fields, false).store_size(), 24);
    }

    #[test]
    fn test_store_size_header() {
        let header = Type::structure(vec![Type::I32; 4], false);
        assert_eq!(header.store_size(), 16);
        assert_eq!(header.align(), 4);
    }
}
