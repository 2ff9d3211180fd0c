// Query Module
//
// The operator-level pieces the storage engine exposes: aggregation
// over tuple streams and histogram-based selectivity estimation.

pub mod executor;
pub mod planner;

use thiserror::Error;

use crate::catalog::FieldType;
use crate::query::executor::aggregate::AggregateOp;
use crate::query::executor::predicate::Op;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("aggregate {0:?} is not supported over string fields")]
    UnsupportedAggregate(AggregateOp),

    #[error("operator {0:?} is not supported by histogram estimation")]
    UnsupportedPredicate(Op),

    #[error("group-by field type mismatch: expected {expected:?}, found {found:?}")]
    GroupTypeMismatch {
        expected: FieldType,
        found: Option<FieldType>,
    },

    #[error("aggregate field must be an integer")]
    AggregateTypeMismatch,

    #[error("tuple has no field {0}")]
    MissingField(usize),

    #[error("value {value} outside histogram range [{min}, {max}]")]
    ValueOutOfRange { value: i32, min: i32, max: i32 },
}
