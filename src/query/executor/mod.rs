pub mod aggregate;
pub mod predicate;

pub use aggregate::{Aggregator, AggregateOp, IntegerAggregator, StringAggregator, NO_GROUPING};
pub use predicate::Op;

use std::sync::Arc;

use crate::catalog::TupleDesc;
use crate::storage::tuple::Tuple;

/// A materialized tuple stream with a fixed schema. Restartable via
/// `rewind`; `next` on a closed iterator yields `None`.
pub struct TupleIterator {
    td: Arc<TupleDesc>,
    tuples: Vec<Tuple>,
    cursor: Option<usize>,
}

impl TupleIterator {
    pub fn new(td: Arc<TupleDesc>, tuples: Vec<Tuple>) -> Self {
        TupleIterator {
            td,
            tuples,
            cursor: None,
        }
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.td
    }

    pub fn open(&mut self) {
        self.cursor = Some(0);
    }

    pub fn next(&mut self) -> Option<Tuple> {
        let pos = self.cursor.as_mut()?;
        let tuple = self.tuples.get(*pos)?.clone();
        *pos += 1;
        Some(tuple)
    }

    pub fn rewind(&mut self) {
        self.close();
        self.open();
    }

    pub fn close(&mut self) {
        self.cursor = None;
    }
}
