use super::engine::{BeanStore, StoreWriter};
use crate::core::{BeanId, Result};
use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, RwLock};

type Entries = Arc<RwLock<HashMap<BeanId, Vec<u8>>>>;

/// Process-local bean store.
///
/// Writes go straight into the shared map, so an uncommitted or failed write
/// leaves its partial bytes visible until the entry is removed.
#[derive(Clone, Default)]
pub struct InMemoryBeanStore {
    entries: Entries,
}

impl InMemoryBeanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw bytes of an entry, for inspection in tests and tools.
    pub fn entry(&self, id: &BeanId) -> Option<Vec<u8>> {
        self.entries.read().ok()?.get(id).cloned()
    }
}

impl BeanStore for InMemoryBeanStore {
    fn open_for_write(&self, id: &BeanId) -> Result<Box<dyn StoreWriter>> {
        self.entries.write()?.insert(id.clone(), Vec::new());
        Ok(Box::new(MemoryWriter {
            id: id.clone(),
            entries: self.entries.clone(),
        }))
    }

    fn open_for_read(&self, id: &BeanId) -> Result<Option<Box<dyn Read + Send>>> {
        let entries = self.entries.read()?;
        Ok(entries
            .get(id)
            .map(|bytes| Box::new(Cursor::new(bytes.clone())) as Box<dyn Read + Send>))
    }

    fn remove(&self, id: &BeanId) -> Result<bool> {
        Ok(self.entries.write()?.remove(id).is_some())
    }

    fn contains(&self, id: &BeanId) -> Result<bool> {
        Ok(self.entries.read()?.contains_key(id))
    }

    fn list(&self) -> Result<Vec<BeanId>> {
        let mut ids: Vec<BeanId> = self.entries.read()?.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

struct MemoryWriter {
    id: BeanId,
    entries: Entries,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| io::Error::other(e.to_string()))?;
        entries
            .entry(self.id.clone())
            .or_default()
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl StoreWriter for MemoryWriter {
    fn commit(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_remove() {
        let store = InMemoryBeanStore::new();
        let id = BeanId::from("bean-1");

        store.write_bytes(&id, b"frame").unwrap();
        assert!(store.contains(&id).unwrap());
        assert_eq!(store.read_bytes(&id).unwrap(), Some(b"frame".to_vec()));

        assert!(store.remove(&id).unwrap());
        assert!(!store.remove(&id).unwrap());
        assert_eq!(store.read_bytes(&id).unwrap(), None);
    }

    #[test]
    fn test_uncommitted_write_is_visible() {
        let store = InMemoryBeanStore::new();
        let id = BeanId::from("bean-2");

        let mut writer = store.open_for_write(&id).unwrap();
        writer.write_all(b"part").unwrap();
        drop(writer);

        assert_eq!(store.entry(&id), Some(b"part".to_vec()));
    }

    #[test]
    fn test_compressed_wrappers_round_trip() {
        let store = InMemoryBeanStore::new();
        let id = BeanId::from("bean-3");

        let mut writer = store.open_compressed_writer(&id, 6).unwrap();
        writer.write_all(&[42u8; 1000]).unwrap();
        writer.finish().unwrap();
        assert!(store.entry(&id).unwrap().len() < 1000);

        let mut reader = store.open_decompressed_reader(&id).unwrap().unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, vec![42u8; 1000]);
    }
}
