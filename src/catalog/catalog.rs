// Catalog
//
// Registry of table files, keyed by table id. The catalog is plain
// shared state handed around as an Arc; construction happens once at
// database startup and nothing here is global.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::catalog::TupleDesc;
use crate::common::types::TableId;
use crate::storage::DbFile;

struct TableEntry {
    file: Arc<dyn DbFile>,
    name: String,
}

pub struct Catalog {
    tables: RwLock<HashMap<TableId, TableEntry>>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog {
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Register `file` under `name`, returning its table id. A second
    /// registration for the same id replaces the first.
    pub fn add_table(&self, file: Arc<dyn DbFile>, name: impl Into<String>) -> TableId {
        let id = file.id();
        self.tables.write().insert(
            id,
            TableEntry {
                file,
                name: name.into(),
            },
        );
        id
    }

    /// Look up the file behind `table_id`.
    pub fn database_file(&self, table_id: TableId) -> Option<Arc<dyn DbFile>> {
        self.tables.read().get(&table_id).map(|e| e.file.clone())
    }

    /// Look up the schema of `table_id`.
    pub fn tuple_desc(&self, table_id: TableId) -> Option<Arc<TupleDesc>> {
        self.tables
            .read()
            .get(&table_id)
            .map(|e| e.file.tuple_desc())
    }

    /// Resolve a table name to its id.
    pub fn table_id(&self, name: &str) -> Option<TableId> {
        self.tables
            .read()
            .iter()
            .find(|(_, e)| e.name == name)
            .map(|(id, _)| *id)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
