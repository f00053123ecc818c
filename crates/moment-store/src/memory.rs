use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Result, bail};
use uuid::Uuid;

use crate::blob::{Blob, BlobStore};
use crate::cell::Cell;
use crate::tabular::TabularStore;

type Tables = HashMap<String, Vec<Vec<Cell>>>;

/// In-memory tabular store. Backs the handler tests; also handy for local
/// experiments that should not touch disk.
#[derive(Default)]
pub struct MemoryTabularStore {
    tables: Mutex<Tables>,
}

impl MemoryTabularStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows currently held by a table, header included. 0 if absent.
    pub fn row_count(&self, name: &str) -> usize {
        self.tables
            .lock()
            .map(|tables| tables.get(name).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|e| anyhow::anyhow!("tabular lock poisoned: {}", e))
    }
}

impl TabularStore for MemoryTabularStore {
    fn table_exists(&self, name: &str) -> Result<bool> {
        Ok(self.lock()?.contains_key(name))
    }

    fn create_table(&self, name: &str, header: &[Cell]) -> Result<()> {
        let mut tables = self.lock()?;
        if tables.contains_key(name) {
            bail!("table already exists: {name}");
        }
        tables.insert(name.to_string(), vec![header.to_vec()]);
        Ok(())
    }

    fn append_row(&self, name: &str, row: &[Cell]) -> Result<()> {
        let mut tables = self.lock()?;
        let Some(table) = tables.get_mut(name) else {
            bail!("no such table: {name}");
        };
        table.push(row.to_vec());
        Ok(())
    }

    fn scan(&self, name: &str) -> Result<Vec<Vec<Cell>>> {
        Ok(self.lock()?.get(name).cloned().unwrap_or_default())
    }
}

/// In-memory blob store, same test-double role as [`MemoryTabularStore`].
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Blob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.lock().map(|blobs| blobs.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Blob>>> {
        self.blobs
            .lock()
            .map_err(|e| anyhow::anyhow!("blob lock poisoned: {}", e))
    }
}

impl BlobStore for MemoryBlobStore {
    fn store(&self, name: &str, mime: &str, bytes: &[u8]) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.lock()?.insert(
            id.clone(),
            Blob {
                name: name.to_string(),
                mime: mime.to_string(),
                shared: false,
                bytes: bytes.to_vec(),
            },
        );
        Ok(id)
    }

    fn set_public(&self, id: &str) -> Result<()> {
        let mut blobs = self.lock()?;
        let Some(blob) = blobs.get_mut(id) else {
            bail!("no such blob: {id}");
        };
        blob.shared = true;
        Ok(())
    }

    fn fetch(&self, id: &str) -> Result<Option<Blob>> {
        Ok(self.lock()?.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_tabular_matches_port_contract() {
        let store = MemoryTabularStore::new();
        assert!(!store.table_exists("Moments").unwrap());
        assert_eq!(store.row_count("Moments"), 0);
        assert!(store.scan("Moments").unwrap().is_empty());
        assert!(store.append_row("Moments", &[Cell::Int(1)]).is_err());

        store.create_table("Moments", &[Cell::text("ID")]).unwrap();
        store.append_row("Moments", &[Cell::Int(1)]).unwrap();
        assert_eq!(store.row_count("Moments"), 2);
        assert!(store.create_table("Moments", &[Cell::text("ID")]).is_err());
    }

    #[test]
    fn memory_blob_tracks_sharing() {
        let store = MemoryBlobStore::new();
        let id = store.store("a.jpg", "image/jpeg", b"x").unwrap();
        assert!(!store.fetch(&id).unwrap().unwrap().shared);
        store.set_public(&id).unwrap();
        assert!(store.fetch(&id).unwrap().unwrap().shared);
        assert_eq!(store.blob_count(), 1);
    }
}
