use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Resumption position computed from the last row of a non-terminal batch
/// (§3 Data Model: Cursor Tuple; GLOSSARY: Compound cursor predicate).
///
/// `inc` is the value of the incremental column (or the first upsert column when
/// the job declares none); `tie` is the value of the tie-breaker (always the first
/// upsert column). Carrying both lets the engine resume across ties without
/// skipping or repeating rows (I2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorTuple {
    pub inc: Value,
    pub tie: Value,
}

impl CursorTuple {
    pub fn new(inc: Value, tie: Value) -> Self {
        Self { inc, tie }
    }

    /// True iff `self` is strictly greater than `other` under the composite
    /// ordering `(inc ASC, tie ASC)` (P7: cursor monotonicity).
    pub fn strictly_after(&self, other: &CursorTuple) -> bool {
        use std::cmp::Ordering::*;
        match self.inc.compare(&other.inc) {
            Some(Greater) => true,
            Some(Equal) => matches!(self.tie.compare(&other.tie), Some(Greater)),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tie_broken_by_second_component() {
        let a = CursorTuple::new(Value::Int(5), Value::Int(1));
        let b = CursorTuple::new(Value::Int(5), Value::Int(2));
        assert!(b.strictly_after(&a));
        assert!(!a.strictly_after(&b));
    }

    #[test]
    fn advances_on_incremental_column() {
        let a = CursorTuple::new(Value::Int(5), Value::Int(9));
        let b = CursorTuple::new(Value::Int(6), Value::Int(1));
        assert!(b.strictly_after(&a));
    }
}
