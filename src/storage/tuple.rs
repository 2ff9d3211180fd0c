// Tuple Module
//
// Field values, record identifiers and tuples. A tuple carries its
// descriptor and, once placed on a page, the record id of its slot.

use std::fmt;
use std::sync::Arc;

use crate::catalog::TupleDesc;
use crate::storage::page::PageId;

/// A single field value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    Int(i32),
    Str(String),
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{}", v),
            Field::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Location of a tuple: a page and a slot index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pid: PageId,
    tuple_no: usize,
}

impl RecordId {
    pub fn new(pid: PageId, tuple_no: usize) -> Self {
        RecordId { pid, tuple_no }
    }

    pub fn page_id(&self) -> PageId {
        self.pid
    }

    pub fn tuple_no(&self) -> usize {
        self.tuple_no
    }
}

/// A row of field values matching a TupleDesc.
#[derive(Debug, Clone)]
pub struct Tuple {
    td: Arc<TupleDesc>,
    fields: Vec<Field>,
    rid: Option<RecordId>,
}

impl Tuple {
    pub fn new(td: Arc<TupleDesc>, fields: Vec<Field>) -> Self {
        Tuple { td, fields, rid: None }
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.td
    }

    pub fn field(&self, i: usize) -> Option<&Field> {
        self.fields.get(i)
    }

    pub fn set_field(&mut self, i: usize, field: Field) {
        if let Some(slot) = self.fields.get_mut(i) {
            *slot = field;
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.rid
    }

    pub fn set_record_id(&mut self, rid: Option<RecordId>) {
        self.rid = rid;
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for field in &self.fields {
            if !first {
                write!(f, "\t")?;
            }
            write!(f, "{}", field)?;
            first = false;
        }
        Ok(())
    }
}
