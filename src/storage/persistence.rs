//! File-backed bean store: one file per passivated bean in a single directory.

use super::engine::{BeanStore, StoreWriter};
use crate::core::{BeanId, PassivationError, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const FRAME_FILE_EXTENSION: &str = "sfsb";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurabilityMode {
    /// Entries are fsynced before commit returns.
    #[default]
    Sync,
    /// Entries are flushed to the OS only.
    Async,
}

pub struct FileBeanStore {
    dir: PathBuf,
    durability: DurabilityMode,
}

impl FileBeanStore {
    pub fn open<P: AsRef<Path>>(dir: P, durability: DurabilityMode) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            PassivationError::store(&format!("create store directory {}", dir.display()), e)
        })?;
        Ok(Self { dir, durability })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn durability(&self) -> DurabilityMode {
        self.durability
    }

    pub fn path_for(&self, id: &BeanId) -> PathBuf {
        self.dir
            .join(format!("{}.{}", id.to_file_stem(), FRAME_FILE_EXTENSION))
    }
}

impl BeanStore for FileBeanStore {
    fn open_for_write(&self, id: &BeanId) -> Result<Box<dyn StoreWriter>> {
        let temp = NamedTempFile::new_in(&self.dir)
            .map_err(|e| PassivationError::store(&format!("open entry {} for write", id), e))?;
        Ok(Box::new(FileWriter {
            temp: BufWriter::new(temp),
            target: self.path_for(id),
            durability: self.durability,
        }))
    }

    fn open_for_read(&self, id: &BeanId) -> Result<Option<Box<dyn Read + Send>>> {
        match File::open(self.path_for(id)) {
            Ok(file) => Ok(Some(Box::new(io::BufReader::new(file)))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PassivationError::store(
                &format!("open entry {} for read", id),
                e,
            )),
        }
    }

    fn remove(&self, id: &BeanId) -> Result<bool> {
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PassivationError::store(&format!("remove entry {}", id), e)),
        }
    }

    fn contains(&self, id: &BeanId) -> Result<bool> {
        Ok(self.path_for(id).exists())
    }

    fn list(&self) -> Result<Vec<BeanId>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            PassivationError::store(&format!("list {}", self.dir.display()), e)
        })?;

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| PassivationError::store("list store directory", e))?
                .path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(FRAME_FILE_EXTENSION) {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(BeanId::from_file_stem)
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Writes into a temp file in the store directory and renames it into place
/// on commit. A dropped writer deletes its temp file.
struct FileWriter {
    temp: BufWriter<NamedTempFile>,
    target: PathBuf,
    durability: DurabilityMode,
}

impl Write for FileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.temp.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.temp.flush()
    }
}

impl StoreWriter for FileWriter {
    fn commit(self: Box<Self>) -> Result<()> {
        let FileWriter {
            temp,
            target,
            durability,
        } = *self;

        let temp = temp
            .into_inner()
            .map_err(|e| PassivationError::store("flush entry", e.error()))?;
        if durability == DurabilityMode::Sync {
            temp.as_file()
                .sync_all()
                .map_err(|e| PassivationError::store("sync entry", e))?;
        }
        temp.persist(&target).map_err(|e| {
            PassivationError::store(&format!("rename entry into {}", target.display()), e.error)
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBeanStore::open(temp_dir.path(), DurabilityMode::Sync).unwrap();
        let id = BeanId::from("orders/cart#7");

        store.write_bytes(&id, b"compressed frame").unwrap();
        assert!(store.path_for(&id).exists());
        assert_eq!(store.read_bytes(&id).unwrap(), Some(b"compressed frame".to_vec()));
        assert_eq!(store.list().unwrap(), vec![id.clone()]);

        assert!(store.remove(&id).unwrap());
        assert!(!store.contains(&id).unwrap());
        assert_eq!(store.read_bytes(&id).unwrap(), None);
    }

    #[test]
    fn test_dropped_writer_leaves_no_entry() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBeanStore::open(temp_dir.path(), DurabilityMode::Async).unwrap();
        let id = BeanId::from("bean-1");

        let mut writer = store.open_for_write(&id).unwrap();
        writer.write_all(b"half a frame").unwrap();
        drop(writer);

        assert!(!store.contains(&id).unwrap());
        assert!(store.list().unwrap().is_empty());
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_list_skips_foreign_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBeanStore::open(temp_dir.path(), DurabilityMode::Async).unwrap();
        let id = BeanId::from("bean-1");
        store.write_bytes(&id, b"frame").unwrap();

        fs::write(temp_dir.path().join("a\u{e9}b.sfsb"), b"stray").unwrap();
        fs::write(temp_dir.path().join("\u{e9}\u{e9}.sfsb"), b"stray").unwrap();
        fs::write(temp_dir.path().join("not-hex.sfsb"), b"stray").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), b"stray").unwrap();

        assert_eq!(store.list().unwrap(), vec![id]);
    }

    #[test]
    fn test_rewrite_replaces_entry() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBeanStore::open(temp_dir.path(), DurabilityMode::Sync).unwrap();
        let id = BeanId::from("bean-1");

        store.write_bytes(&id, b"first").unwrap();
        store.write_bytes(&id, b"second").unwrap();
        assert_eq!(store.read_bytes(&id).unwrap(), Some(b"second".to_vec()));
    }
}
