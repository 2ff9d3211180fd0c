// Schema Module
//
// Field types and tuple descriptors. A TupleDesc fixes the on-disk
// width of every tuple stored under it, which is what makes the
// bit-addressed slot directory of a heap page possible.

use std::io;

use byteorder::{BigEndian, ByteOrder};

use crate::storage::tuple::Field;

/// The closed set of field types a tuple may carry.
///
/// `Int` serializes as 4 big-endian bytes. `String(len)` serializes as
/// a 4-byte big-endian length prefix (at most `len`) followed by `len`
/// payload bytes, zero padded past the meaningful prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Int,
    String(usize),
}

impl FieldType {
    /// Fixed on-disk size of a field of this type.
    pub fn size(&self) -> usize {
        match self {
            FieldType::Int => 4,
            FieldType::String(len) => len + 4,
        }
    }

    /// Decode one field of this type from the front of `buf`.
    pub fn parse(&self, buf: &[u8]) -> io::Result<Field> {
        if buf.len() < self.size() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "field extends past the end of the page",
            ));
        }
        match *self {
            FieldType::Int => Ok(Field::Int(BigEndian::read_i32(&buf[..4]))),
            FieldType::String(len) => {
                let used = BigEndian::read_u32(&buf[..4]) as usize;
                if used > len {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("string length prefix {} exceeds field width {}", used, len),
                    ));
                }
                let value = String::from_utf8(buf[4..4 + used].to_vec())
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                Ok(Field::Str(value))
            }
        }
    }

    /// Encode `field` into the front of `buf`, which must hold at least
    /// `self.size()` bytes. Callers validate field/type agreement before
    /// encoding; a mismatched value serializes as an empty slot would.
    pub fn encode(&self, field: &Field, buf: &mut [u8]) {
        match (*self, field) {
            (FieldType::Int, Field::Int(v)) => BigEndian::write_i32(&mut buf[..4], *v),
            (FieldType::String(len), Field::Str(s)) => {
                let bytes = s.as_bytes();
                let used = bytes.len().min(len);
                BigEndian::write_u32(&mut buf[..4], used as u32);
                buf[4..4 + used].copy_from_slice(&bytes[..used]);
                buf[4 + used..4 + len].fill(0);
            }
            _ => buf[..self.size()].fill(0),
        }
    }

    /// Whether `field` is a value of this type.
    pub fn matches(&self, field: &Field) -> bool {
        matches!(
            (self, field),
            (FieldType::Int, Field::Int(_)) | (FieldType::String(_), Field::Str(_))
        )
    }
}

/// One column of a tuple descriptor.
#[derive(Debug, Clone)]
pub struct TdItem {
    pub field_type: FieldType,
    pub name: Option<String>,
}

/// An ordered sequence of typed, optionally named fields.
#[derive(Debug, Clone)]
pub struct TupleDesc {
    items: Vec<TdItem>,
}

impl TupleDesc {
    /// Build a descriptor from field types alone.
    pub fn new(types: Vec<FieldType>) -> Self {
        let items = types
            .into_iter()
            .map(|field_type| TdItem { field_type, name: None })
            .collect();
        TupleDesc { items }
    }

    /// Build a descriptor with one name per field.
    pub fn with_names(types: Vec<FieldType>, names: Vec<Option<String>>) -> Self {
        let items = types
            .into_iter()
            .zip(names)
            .map(|(field_type, name)| TdItem { field_type, name })
            .collect();
        TupleDesc { items }
    }

    pub fn num_fields(&self) -> usize {
        self.items.len()
    }

    pub fn field_type(&self, i: usize) -> Option<FieldType> {
        self.items.get(i).map(|item| item.field_type)
    }

    pub fn field_name(&self, i: usize) -> Option<&str> {
        self.items.get(i).and_then(|item| item.name.as_deref())
    }

    /// Fixed on-disk width of a tuple under this descriptor.
    pub fn size(&self) -> usize {
        self.items.iter().map(|item| item.field_type.size()).sum()
    }

    /// Whether `fields` is a well-typed row under this descriptor.
    pub fn matches(&self, fields: &[Field]) -> bool {
        self.items.len() == fields.len()
            && self
                .items
                .iter()
                .zip(fields)
                .all(|(item, field)| item.field_type.matches(field))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TdItem> {
        self.items.iter()
    }
}

// Two descriptors are compatible when their field types agree; names do
// not participate in schema equality.
impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(other.items.iter())
                .all(|(a, b)| a.field_type == b.field_type)
    }
}

impl Eq for TupleDesc {}
