use serde::{Deserialize, Serialize};

use crate::error::FlowError;
use crate::value::Scalar;

/// Comparison operators usable in branch conditions. Numeric kinds support
/// all six; boolean, string and object kinds only support equality, and any
/// ordering operator on those kinds degrades to not-equals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompareOperator {
    Equals,
    NotEquals,
    LessThan,
    GreaterThan,
    LessThanOrEquals,
    GreaterThanOrEquals,
}

impl CompareOperator {
    /// The operator such that `evaluate(op, a, b) == evaluate(op.invert(), b, a)`.
    pub fn invert(self) -> Self {
        match self {
            Self::Equals => Self::Equals,
            Self::NotEquals => Self::NotEquals,
            Self::LessThan => Self::GreaterThan,
            Self::GreaterThan => Self::LessThan,
            Self::LessThanOrEquals => Self::GreaterThanOrEquals,
            Self::GreaterThanOrEquals => Self::LessThanOrEquals,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Equals => "==",
            Self::NotEquals => "!=",
            Self::LessThan => "<",
            Self::GreaterThan => ">",
            Self::LessThanOrEquals => "<=",
            Self::GreaterThanOrEquals => ">=",
        }
    }
}

fn compare_ordered<T: PartialOrd>(op: CompareOperator, lhs: T, rhs: T) -> bool {
    match op {
        CompareOperator::Equals => lhs == rhs,
        CompareOperator::NotEquals => lhs != rhs,
        CompareOperator::LessThan => lhs < rhs,
        CompareOperator::GreaterThan => lhs > rhs,
        CompareOperator::LessThanOrEquals => lhs <= rhs,
        CompareOperator::GreaterThanOrEquals => lhs >= rhs,
    }
}

fn compare_equatable<T: PartialEq>(op: CompareOperator, lhs: T, rhs: T) -> bool {
    match op {
        CompareOperator::Equals => lhs == rhs,
        _ => lhs != rhs,
    }
}

/// Evaluates `lhs op rhs`. Both operands must be of the same kind; a kind
/// mismatch is a configuration error surfaced to the caller.
pub fn evaluate(op: CompareOperator, lhs: &Scalar, rhs: &Scalar) -> Result<bool, FlowError> {
    match (lhs, rhs) {
        (Scalar::Boolean(l), Scalar::Boolean(r)) => Ok(compare_equatable(op, l, r)),
        (Scalar::Integer(l), Scalar::Integer(r)) => Ok(compare_ordered(op, l, r)),
        (Scalar::Float(l), Scalar::Float(r)) => Ok(compare_ordered(op, l, r)),
        (Scalar::Str(l), Scalar::Str(r)) => Ok(compare_equatable(op, l, r)),
        (Scalar::Object(l), Scalar::Object(r)) => Ok(compare_equatable(op, l, r)),
        _ => Err(FlowError::new(
            "COMPARE_KIND_MISMATCH",
            format!(
                "Cannot compare {} against {}.",
                lhs.kind().name(),
                rhs.kind().name()
            ),
        )),
    }
}
