//! Counters and counter expressions.

use std::fmt;

/// Bits of an encoded counter taken by its tag.
pub const ENCODING_TAG_BITS: u32 = 2;
/// Mask of the counter tag.
pub const ENCODING_TAG_MASK: u64 = 0x3;
/// Counter tag plus the expansion-region flag bit.
pub const ENCODING_COUNTER_TAG_AND_EXPANSION_REGION_TAG_BITS: u32 = ENCODING_TAG_BITS + 1;

/// Tag of a zero counter.
pub const TAG_ZERO: u64 = 0;
/// Tag of a physical counter reference.
pub const TAG_COUNTER: u64 = 1;
/// Base tag of an expression reference; the expression kind is added on top.
pub const TAG_EXPRESSION: u64 = 2;

/// Largest raw counter id or expression index the encoding can carry.
pub const MAX_COUNTER_ID: u32 = u32::MAX >> ENCODING_TAG_BITS;

/// Identity of a [`crate::CounterExpressionBuilder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BuilderId(pub(crate) u32);

/// Handle to an expression in the builder that created it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExpressionId {
    pub(crate) builder: BuilderId,
    pub(crate) index: u32,
}

impl ExpressionId {
    /// Position in the owning builder's table.
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Builder that owns this expression.
    pub const fn builder(self) -> BuilderId {
        self.builder
    }
}

/// Execution count source for a region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Counter {
    /// Always zero.
    #[default]
    Zero,
    /// Physical counter incremented at runtime.
    Raw(u32),
    /// Derived from other counters.
    Expression(ExpressionId),
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero => write!(f, "zero"),
            Self::Raw(id) => write!(f, "#{id}"),
            Self::Expression(id) => write!(f, "expr#{}", id.index),
        }
    }
}

/// Counter arithmetic. Discriminants follow the on-disk encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExprKind {
    Subtract = 0,
    Add = 1,
}

impl ExprKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Subtract => "sub",
            Self::Add => "add",
        }
    }
}

/// `lhs + rhs` or `lhs - rhs`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CounterExpression {
    pub kind: ExprKind,
    pub lhs: Counter,
    pub rhs: Counter,
}

impl CounterExpression {
    pub const fn new(kind: ExprKind, lhs: Counter, rhs: Counter) -> Self {
        Self { kind, lhs, rhs }
    }
}
