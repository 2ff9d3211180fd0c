// Aggregation Operators
//
// Group-by aggregation over tuple streams. Groups are keyed by the
// stringified group-by value (or a sentinel when no grouping is
// configured) and kept in insertion order so output is deterministic.
// Each group carries one closed GroupState variant with a uniform merge
// step instead of a per-operator handler hierarchy.

use std::sync::Arc;

use linked_hash_map::LinkedHashMap;

use crate::catalog::{FieldType, TupleDesc};
use crate::query::executor::TupleIterator;
use crate::query::QueryError;
use crate::storage::tuple::{Field, Tuple};

/// Group-by field index meaning "no grouping".
pub const NO_GROUPING: i32 = -1;

const NO_GROUPING_KEY: &str = "NO_GROUPING_KEY";

/// The supported aggregation operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

/// Running aggregate for one group.
#[derive(Debug, Clone, Copy)]
enum GroupState {
    Min(i32),
    Max(i32),
    Sum(i32),
    Count(i32),
    Avg { sum: i32, count: i32 },
}

impl GroupState {
    fn init(op: AggregateOp, v: i32) -> Self {
        match op {
            AggregateOp::Min => GroupState::Min(v),
            AggregateOp::Max => GroupState::Max(v),
            AggregateOp::Sum => GroupState::Sum(v),
            AggregateOp::Count => GroupState::Count(1),
            AggregateOp::Avg => GroupState::Avg { sum: v, count: 1 },
        }
    }

    fn merge(&mut self, v: i32) {
        match self {
            GroupState::Min(m) => *m = (*m).min(v),
            GroupState::Max(m) => *m = (*m).max(v),
            GroupState::Sum(s) => *s += v,
            GroupState::Count(c) => *c += 1,
            GroupState::Avg { sum, count } => {
                *sum += v;
                *count += 1;
            }
        }
    }

    fn value(&self) -> i32 {
        match self {
            GroupState::Min(v) | GroupState::Max(v) | GroupState::Sum(v) | GroupState::Count(v) => {
                *v
            }
            // count is at least 1 by construction
            GroupState::Avg { sum, count } => sum / count,
        }
    }
}

struct Group {
    // Original group-by value, kept for output; None when ungrouped.
    key_field: Option<Field>,
    state: GroupState,
}

/// Merge-then-iterate aggregation over a tuple stream.
pub trait Aggregator {
    /// Fold one tuple into its group.
    fn merge(&mut self, tuple: &Tuple) -> Result<(), QueryError>;

    /// Results as `(groupVal, aggregateVal)` tuples, or `(aggregateVal)`
    /// when ungrouped. The aggregate column is always an integer.
    fn iterator(&self) -> TupleIterator;
}

// Resolve the group key of a tuple: the stringified group-by value, or
// the sentinel when grouping is off. Checks the configured group type.
fn group_key(
    tuple: &Tuple,
    gb_field: i32,
    gb_field_type: Option<FieldType>,
) -> Result<(String, Option<Field>), QueryError> {
    if gb_field == NO_GROUPING {
        return Ok((NO_GROUPING_KEY.to_string(), None));
    }
    let idx = gb_field as usize;
    let field = tuple
        .field(idx)
        .ok_or(QueryError::MissingField(idx))?;
    if let Some(expected) = gb_field_type {
        let found = tuple.tuple_desc().field_type(idx);
        if found != Some(expected) {
            return Err(QueryError::GroupTypeMismatch { expected, found });
        }
    }
    Ok((field.to_string(), Some(field.clone())))
}

fn output_field_type(field: &Field) -> FieldType {
    match field {
        Field::Int(_) => FieldType::Int,
        Field::Str(s) => FieldType::String(s.len()),
    }
}

// Build the output tuples shared by both aggregators.
fn result_iterator(
    gb_field: i32,
    gb_field_type: Option<FieldType>,
    groups: &LinkedHashMap<String, Group>,
) -> TupleIterator {
    if gb_field == NO_GROUPING {
        let td = Arc::new(TupleDesc::with_names(
            vec![FieldType::Int],
            vec![Some("aggregateVal".to_string())],
        ));
        let tuples = groups
            .values()
            .map(|g| Tuple::new(td.clone(), vec![Field::Int(g.state.value())]))
            .collect();
        return TupleIterator::new(td, tuples);
    }

    let group_type = gb_field_type
        .or_else(|| {
            groups
                .values()
                .find_map(|g| g.key_field.as_ref().map(output_field_type))
        })
        .unwrap_or(FieldType::Int);
    let td = Arc::new(TupleDesc::with_names(
        vec![group_type, FieldType::Int],
        vec![
            Some("groupVal".to_string()),
            Some("aggregateVal".to_string()),
        ],
    ));
    let tuples = groups
        .iter()
        .map(|(key, g)| {
            let group_val = match &g.key_field {
                Some(field) => field.clone(),
                None => Field::Str(key.clone()),
            };
            Tuple::new(td.clone(), vec![group_val, Field::Int(g.state.value())])
        })
        .collect();
    TupleIterator::new(td, tuples)
}

/// Aggregator over integer fields; supports MIN, MAX, SUM, AVG, COUNT.
pub struct IntegerAggregator {
    gb_field: i32,
    gb_field_type: Option<FieldType>,
    a_field: usize,
    op: AggregateOp,
    groups: LinkedHashMap<String, Group>,
}

impl IntegerAggregator {
    /// `gb_field` is the 0-based group-by index or `NO_GROUPING`;
    /// `a_field` is the 0-based index of the aggregated integer column.
    pub fn new(
        gb_field: i32,
        gb_field_type: Option<FieldType>,
        a_field: usize,
        op: AggregateOp,
    ) -> Self {
        IntegerAggregator {
            gb_field,
            gb_field_type,
            a_field,
            op,
            groups: LinkedHashMap::new(),
        }
    }
}

impl Aggregator for IntegerAggregator {
    fn merge(&mut self, tuple: &Tuple) -> Result<(), QueryError> {
        let (key, key_field) = group_key(tuple, self.gb_field, self.gb_field_type)?;
        let value = match tuple.field(self.a_field) {
            Some(Field::Int(v)) => *v,
            Some(_) => return Err(QueryError::AggregateTypeMismatch),
            None => return Err(QueryError::MissingField(self.a_field)),
        };
        match self.groups.get_mut(&key) {
            Some(group) => group.state.merge(value),
            None => {
                self.groups.insert(
                    key,
                    Group {
                        key_field,
                        state: GroupState::init(self.op, value),
                    },
                );
            }
        }
        Ok(())
    }

    fn iterator(&self) -> TupleIterator {
        result_iterator(self.gb_field, self.gb_field_type, &self.groups)
    }
}

/// Aggregator over string fields; COUNT is the only supported operator.
pub struct StringAggregator {
    gb_field: i32,
    gb_field_type: Option<FieldType>,
    a_field: usize,
    groups: LinkedHashMap<String, Group>,
}

impl StringAggregator {
    /// Fails with `UnsupportedAggregate` for any operator but COUNT.
    pub fn new(
        gb_field: i32,
        gb_field_type: Option<FieldType>,
        a_field: usize,
        op: AggregateOp,
    ) -> Result<Self, QueryError> {
        if op != AggregateOp::Count {
            return Err(QueryError::UnsupportedAggregate(op));
        }
        Ok(StringAggregator {
            gb_field,
            gb_field_type,
            a_field,
            groups: LinkedHashMap::new(),
        })
    }
}

impl Aggregator for StringAggregator {
    fn merge(&mut self, tuple: &Tuple) -> Result<(), QueryError> {
        let (key, key_field) = group_key(tuple, self.gb_field, self.gb_field_type)?;
        if tuple.field(self.a_field).is_none() {
            return Err(QueryError::MissingField(self.a_field));
        }
        match self.groups.get_mut(&key) {
            Some(group) => group.state.merge(0),
            None => {
                self.groups.insert(
                    key,
                    Group {
                        key_field,
                        state: GroupState::init(AggregateOp::Count, 0),
                    },
                );
            }
        }
        Ok(())
    }

    fn iterator(&self) -> TupleIterator {
        result_iterator(self.gb_field, self.gb_field_type, &self.groups)
    }
}
