//! Counter expression builder.

use std::sync::atomic::{AtomicU32, Ordering};

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::counter::{BuilderId, Counter, CounterExpression, ExprKind, ExpressionId, MAX_COUNTER_ID};
use crate::{MappingError, Result};

static NEXT_BUILDER_ID: AtomicU32 = AtomicU32::new(0);

/// Interning table of counter expressions for one function.
///
/// Structurally identical expressions share one index, and indices are
/// handed out in insertion order. Expression handles carry the builder's
/// identity, so a handle presented to any other builder is rejected.
/// Dropping the builder releases the table.
#[derive(Debug)]
pub struct CounterExpressionBuilder {
    id: BuilderId,
    expressions: Vec<CounterExpression>,
    interned: FxHashMap<CounterExpression, u32>,
}

impl Default for CounterExpressionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterExpressionBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            id: BuilderId(NEXT_BUILDER_ID.fetch_add(1, Ordering::Relaxed)),
            expressions: Vec::new(),
            interned: FxHashMap::default(),
        }
    }

    /// Intern `first + second` over two physical counters.
    pub fn add_counters(&mut self, first: u32, second: u32) -> Counter {
        self.intern(CounterExpression::new(
            ExprKind::Add,
            Counter::Raw(first),
            Counter::Raw(second),
        ))
    }

    /// Intern `lhs + rhs`.
    pub fn add(&mut self, lhs: Counter, rhs: Counter) -> Result<Counter> {
        self.check(lhs)?;
        self.check(rhs)?;
        Ok(self.intern(CounterExpression::new(ExprKind::Add, lhs, rhs)))
    }

    /// Intern `lhs - rhs`.
    pub fn subtract(&mut self, lhs: Counter, rhs: Counter) -> Result<Counter> {
        self.check(lhs)?;
        self.check(rhs)?;
        Ok(self.intern(CounterExpression::new(ExprKind::Subtract, lhs, rhs)))
    }

    /// Resolve an expression handle.
    pub fn expression(&self, id: ExpressionId) -> Result<&CounterExpression> {
        if id.builder != self.id {
            return Err(MappingError::ForeignExpression { index: id.index });
        }
        self.expressions
            .get(id.index as usize)
            .ok_or(MappingError::UnknownExpression {
                index: id.index,
                len: self.expressions.len(),
            })
    }

    /// Validate a counter against this builder.
    pub fn check(&self, counter: Counter) -> Result<()> {
        match counter {
            Counter::Zero => Ok(()),
            Counter::Raw(id) if id > MAX_COUNTER_ID => Err(MappingError::CounterOverflow(id)),
            Counter::Raw(_) => Ok(()),
            Counter::Expression(id) => self.expression(id).map(|_| ()),
        }
    }

    /// Whether `counter` is an expression owned by this builder.
    pub fn owns(&self, counter: Counter) -> bool {
        matches!(counter, Counter::Expression(id) if id.builder == self.id)
    }

    /// All expressions in insertion order.
    pub fn expressions(&self) -> &[CounterExpression] {
        &self.expressions
    }

    /// Number of interned expressions.
    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    /// Whether no expression has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    fn intern(&mut self, expr: CounterExpression) -> Counter {
        let index = match self.interned.get(&expr) {
            Some(&index) => index,
            None => {
                let index = self.expressions.len() as u32;
                trace!(
                    index,
                    kind = expr.kind.name(),
                    lhs = %expr.lhs,
                    rhs = %expr.rhs,
                    "interned counter expression"
                );
                self.expressions.push(expr);
                self.interned.insert(expr, index);
                index
            }
        };
        Counter::Expression(ExpressionId {
            builder: self.id,
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_counters_deduplicates() {
        let mut builder = CounterExpressionBuilder::new();
        let a = builder.add_counters(0, 1);
        for _ in 0..10 {
            assert_eq!(builder.add_counters(0, 1), a);
        }
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn test_operand_order_matters() {
        let mut builder = CounterExpressionBuilder::new();
        let a = builder.add_counters(0, 1);
        let b = builder.add_counters(1, 0);
        assert_ne!(a, b);
        assert_eq!(builder.len(), 2);
    }

    #[test]
    fn test_kind_distinguishes_expressions() {
        let mut builder = CounterExpressionBuilder::new();
        let sum = builder.add(Counter::Raw(2), Counter::Raw(3)).unwrap();
        let diff = builder.subtract(Counter::Raw(2), Counter::Raw(3)).unwrap();
        assert_ne!(sum, diff);
        let Counter::Expression(id) = diff else {
            panic!("expected expression");
        };
        assert_eq!(builder.expression(id).unwrap().kind, ExprKind::Subtract);
    }

    #[test]
    fn test_nested_expressions() {
        let mut builder = CounterExpressionBuilder::new();
        let sum = builder.add_counters(0, 1);
        let rest = builder.subtract(sum, Counter::Raw(2)).unwrap();
        assert_eq!(builder.subtract(sum, Counter::Raw(2)).unwrap(), rest);
        assert_eq!(builder.len(), 2);
        assert!(builder.owns(rest));
    }

    #[test]
    fn test_indices_in_insertion_order() {
        let mut builder = CounterExpressionBuilder::new();
        let ids: Vec<u32> = (0..4)
            .map(|i| match builder.add_counters(i, i + 1) {
                Counter::Expression(id) => id.index(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(ids, [0, 1, 2, 3]);
    }

    #[test]
    fn test_foreign_handle_rejected() {
        let mut first = CounterExpressionBuilder::new();
        let mut second = CounterExpressionBuilder::new();
        let foreign = first.add_counters(0, 1);
        assert!(!second.owns(foreign));
        assert_eq!(
            second.add(foreign, Counter::Raw(0)),
            Err(MappingError::ForeignExpression { index: 0 })
        );
        assert!(second.is_empty());
    }

    #[test]
    fn test_handle_invalid_after_drop() {
        let stale = {
            let mut scoped = CounterExpressionBuilder::new();
            scoped.add_counters(4, 5)
        };
        let fresh = CounterExpressionBuilder::new();
        assert!(fresh.check(stale).is_err());
    }

    #[test]
    fn test_counter_overflow() {
        let mut builder = CounterExpressionBuilder::new();
        assert_eq!(
            builder.add(Counter::Raw(u32::MAX), Counter::Zero),
            Err(MappingError::CounterOverflow(u32::MAX))
        );
    }
}
