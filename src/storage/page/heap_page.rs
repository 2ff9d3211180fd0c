// Heap Page
//
// In-memory image of one disk page. The serialized layout is a slot
// occupancy header (one bit per slot, LSB first within each byte)
// followed by the fixed-width tuple slots and zero padding out to the
// page size. Empty slots still occupy their full width on disk, as
// zeros, so the page image is byte exact in both directions.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::catalog::TupleDesc;
use crate::common::types::page_size;
use crate::storage::page::{PageError, PageId};
use crate::storage::tuple::{RecordId, Tuple};
use crate::transaction::TransactionId;

pub struct HeapPage {
    pid: PageId,
    td: Arc<TupleDesc>,
    header: Vec<u8>,
    tuples: Vec<Option<Tuple>>,
    num_slots: usize,
    dirtier: Option<TransactionId>,
    // Serialized bytes as of the last checkpoint. Guarded separately so
    // the clean image stays readable while the page itself is mutated.
    before_image: Mutex<Vec<u8>>,
}

/// Number of slots a page holds under `td`: each slot costs its tuple
/// width in bits plus one header bit.
pub fn num_slots_for(td: &TupleDesc) -> usize {
    (page_size() * 8) / (td.size() * 8 + 1)
}

fn header_size(num_slots: usize) -> usize {
    (num_slots + 7) / 8
}

impl HeapPage {
    /// Parse a page from its on-disk image. The freshly parsed state
    /// becomes the initial before-image.
    pub fn new(pid: PageId, td: Arc<TupleDesc>, data: &[u8]) -> Result<Self, PageError> {
        if data.len() != page_size() {
            return Err(PageError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("page image is {} bytes, expected {}", data.len(), page_size()),
            )));
        }

        let num_slots = num_slots_for(&td);
        let header_len = header_size(num_slots);
        let header = data[..header_len].to_vec();
        let tuple_size = td.size();

        let mut tuples = Vec::with_capacity(num_slots);
        for slot in 0..num_slots {
            if header[slot / 8] >> (slot % 8) & 1 == 0 {
                tuples.push(None);
                continue;
            }
            let offset = header_len + slot * tuple_size;
            let mut fields = Vec::with_capacity(td.num_fields());
            let mut pos = offset;
            for item in td.iter() {
                fields.push(item.field_type.parse(&data[pos..])?);
                pos += item.field_type.size();
            }
            let mut tuple = Tuple::new(td.clone(), fields);
            tuple.set_record_id(Some(RecordId::new(pid, slot)));
            tuples.push(Some(tuple));
        }

        let page = HeapPage {
            pid,
            td,
            header,
            tuples,
            num_slots,
            dirtier: None,
            before_image: Mutex::new(Vec::new()),
        };
        *page.before_image.lock() = page.page_data();
        Ok(page)
    }

    /// An all-zero page image, used to extend a heap file.
    pub fn empty_page_data() -> Vec<u8> {
        vec![0; page_size()]
    }

    /// Serialize the page. Feeding the result back through `new`
    /// reproduces the page field for field.
    pub fn page_data(&self) -> Vec<u8> {
        let mut data = vec![0u8; page_size()];
        let header_len = self.header.len();
        data[..header_len].copy_from_slice(&self.header);

        let tuple_size = self.td.size();
        for (slot, tuple) in self.tuples.iter().enumerate() {
            let tuple = match tuple {
                Some(t) => t,
                None => continue, // empty slots stay zero
            };
            let mut pos = header_len + slot * tuple_size;
            for (item, field) in self.td.iter().zip(tuple.fields()) {
                item.field_type.encode(field, &mut data[pos..]);
                pos += item.field_type.size();
            }
        }
        data
    }

    pub fn id(&self) -> PageId {
        self.pid
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.td
    }

    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    pub fn is_slot_used(&self, slot: usize) -> bool {
        slot < self.num_slots && self.header[slot / 8] >> (slot % 8) & 1 == 1
    }

    fn mark_slot(&mut self, slot: usize, used: bool) {
        let bit = 1u8 << (slot % 8);
        if used {
            self.header[slot / 8] |= bit;
        } else {
            self.header[slot / 8] &= !bit;
        }
    }

    pub fn num_empty_slots(&self) -> usize {
        (0..self.num_slots).filter(|&s| !self.is_slot_used(s)).count()
    }

    /// Place `tuple` in the lowest-indexed empty slot, stamping its
    /// record id.
    pub fn insert_tuple(&mut self, mut tuple: Tuple) -> Result<(), PageError> {
        if tuple.tuple_desc().as_ref() != self.td.as_ref()
            || !self.td.matches(tuple.fields())
        {
            return Err(PageError::SchemaMismatch);
        }
        let slot = (0..self.num_slots)
            .find(|&s| !self.is_slot_used(s))
            .ok_or(PageError::PageFull)?;

        tuple.set_record_id(Some(RecordId::new(self.pid, slot)));
        self.mark_slot(slot, true);
        self.tuples[slot] = Some(tuple);
        Ok(())
    }

    /// Clear the slot referenced by `tuple`'s record id.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<(), PageError> {
        let rid = tuple.record_id().ok_or(PageError::TupleMismatch)?;
        let slot = rid.tuple_no();
        if slot >= self.num_slots {
            return Err(PageError::TupleMismatch);
        }
        if !self.is_slot_used(slot) {
            return Err(PageError::SlotEmpty);
        }
        let occupant = self.tuples[slot].as_ref().ok_or(PageError::SlotEmpty)?;
        if occupant.record_id() != Some(rid) {
            return Err(PageError::TupleMismatch);
        }
        self.mark_slot(slot, false);
        self.tuples[slot] = None;
        Ok(())
    }

    pub fn mark_dirty(&mut self, dirtier: Option<TransactionId>) {
        self.dirtier = dirtier;
    }

    /// The transaction that last dirtied this page, or None if clean.
    pub fn is_dirty(&self) -> Option<TransactionId> {
        self.dirtier
    }

    /// Snapshot the current serialized state as the new before-image.
    pub fn set_before_image(&self) {
        *self.before_image.lock() = self.page_data();
    }

    /// The raw before-image bytes, for write-ahead logging.
    pub fn before_image_data(&self) -> Vec<u8> {
        self.before_image.lock().clone()
    }

    /// A parsed view of the page as of the last checkpoint.
    pub fn before_image(&self) -> Result<HeapPage, PageError> {
        let data = self.before_image_data();
        HeapPage::new(self.pid, self.td.clone(), &data)
    }

    /// Occupied tuples in ascending slot order. Single pass; reopen by
    /// calling again.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.iter().filter_map(|t| t.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldType;
    use crate::storage::tuple::Field;

    fn int_desc() -> Arc<TupleDesc> {
        Arc::new(TupleDesc::new(vec![FieldType::Int]))
    }

    fn int_tuple(td: &Arc<TupleDesc>, v: i32) -> Tuple {
        Tuple::new(td.clone(), vec![Field::Int(v)])
    }

    #[test]
    fn test_slot_count_law() {
        let td = int_desc();
        let n = num_slots_for(&td);
        let bits = page_size() * 8;
        let per_slot = td.size() * 8 + 1;
        assert!(n * per_slot <= bits);
        assert!((n + 1) * per_slot > bits);
    }

    #[test]
    fn test_empty_page_round_trip() {
        let td = int_desc();
        let pid = PageId::new(1, 0);
        let page = HeapPage::new(pid, td.clone(), &HeapPage::empty_page_data()).unwrap();
        assert_eq!(page.num_empty_slots(), page.num_slots());
        assert_eq!(page.page_data(), HeapPage::empty_page_data());
    }

    #[test]
    fn test_insert_then_round_trip() {
        let td = int_desc();
        let pid = PageId::new(1, 0);
        let mut page = HeapPage::new(pid, td.clone(), &HeapPage::empty_page_data()).unwrap();
        for v in 0..10 {
            page.insert_tuple(int_tuple(&td, v)).unwrap();
        }

        let reparsed = HeapPage::new(pid, td.clone(), &page.page_data()).unwrap();
        let values: Vec<i32> = reparsed
            .iter()
            .map(|t| match t.field(0) {
                Some(Field::Int(v)) => *v,
                _ => panic!("expected int field"),
            })
            .collect();
        assert_eq!(values, (0..10).collect::<Vec<_>>());
        for slot in 0..page.num_slots() {
            assert_eq!(page.is_slot_used(slot), reparsed.is_slot_used(slot));
        }
    }

    #[test]
    fn test_insert_fills_lowest_slot() {
        let td = int_desc();
        let mut page =
            HeapPage::new(PageId::new(1, 0), td.clone(), &HeapPage::empty_page_data()).unwrap();
        for v in 0..5 {
            page.insert_tuple(int_tuple(&td, v)).unwrap();
        }
        // delete slot 2, the next insert must land there
        let victim = page.iter().nth(2).unwrap().clone();
        page.delete_tuple(&victim).unwrap();
        assert!(!page.is_slot_used(2));

        page.insert_tuple(int_tuple(&td, 99)).unwrap();
        assert!(page.is_slot_used(2));
        let t = page.iter().nth(2).unwrap();
        assert_eq!(t.field(0), Some(&Field::Int(99)));
        assert_eq!(t.record_id().map(|r| r.tuple_no()), Some(2));
    }

    #[test]
    fn test_page_full_and_schema_mismatch() {
        let td = int_desc();
        let mut page =
            HeapPage::new(PageId::new(1, 0), td.clone(), &HeapPage::empty_page_data()).unwrap();
        for v in 0..page.num_slots() as i32 {
            page.insert_tuple(int_tuple(&td, v)).unwrap();
        }
        assert!(matches!(
            page.insert_tuple(int_tuple(&td, -1)),
            Err(PageError::PageFull)
        ));

        let wide = Arc::new(TupleDesc::new(vec![FieldType::Int, FieldType::Int]));
        let mut fresh =
            HeapPage::new(PageId::new(1, 1), td.clone(), &HeapPage::empty_page_data()).unwrap();
        let mismatched = Tuple::new(wide, vec![Field::Int(1), Field::Int(2)]);
        assert!(matches!(
            fresh.insert_tuple(mismatched),
            Err(PageError::SchemaMismatch)
        ));
    }

    #[test]
    fn test_delete_errors() {
        let td = int_desc();
        let pid = PageId::new(1, 0);
        let mut page = HeapPage::new(pid, td.clone(), &HeapPage::empty_page_data()).unwrap();
        page.insert_tuple(int_tuple(&td, 42)).unwrap();

        // no record id at all
        let floating = int_tuple(&td, 42);
        assert!(matches!(
            page.delete_tuple(&floating),
            Err(PageError::TupleMismatch)
        ));

        // empty slot
        let mut phantom = int_tuple(&td, 42);
        phantom.set_record_id(Some(RecordId::new(pid, 5)));
        assert!(matches!(
            page.delete_tuple(&phantom),
            Err(PageError::SlotEmpty)
        ));

        // wrong page in the record id
        let mut elsewhere = int_tuple(&td, 42);
        elsewhere.set_record_id(Some(RecordId::new(PageId::new(1, 9), 0)));
        assert!(matches!(
            page.delete_tuple(&elsewhere),
            Err(PageError::TupleMismatch)
        ));

        // the real one deletes cleanly, and only once
        let stored = page.iter().next().unwrap().clone();
        page.delete_tuple(&stored).unwrap();
        assert!(matches!(
            page.delete_tuple(&stored),
            Err(PageError::SlotEmpty)
        ));
        assert_eq!(page.num_empty_slots(), page.num_slots());
    }

    #[test]
    fn test_dirty_tracking_and_before_image() {
        let td = int_desc();
        let mut page =
            HeapPage::new(PageId::new(1, 0), td.clone(), &HeapPage::empty_page_data()).unwrap();
        assert!(page.is_dirty().is_none());

        let clean_bytes = page.before_image_data();
        page.insert_tuple(int_tuple(&td, 7)).unwrap();
        let tid = TransactionId::new();
        page.mark_dirty(Some(tid));
        assert_eq!(page.is_dirty(), Some(tid));

        // before-image still reflects the pre-insert state
        assert_eq!(page.before_image_data(), clean_bytes);
        assert_eq!(page.before_image().unwrap().iter().count(), 0);

        page.set_before_image();
        assert_eq!(page.before_image().unwrap().iter().count(), 1);

        page.mark_dirty(None);
        assert!(page.is_dirty().is_none());
    }
}
