use crate::codec::{compressing_writer, decompressing_reader};
use crate::core::{BeanId, PassivationError, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{self, Read, Write};

/// Open write handle on a store entry.
///
/// Dropping a writer without committing closes the handle; whether partial
/// bytes stay visible is up to the store, so callers remove the entry on
/// failure.
pub trait StoreWriter: Write + Send {
    fn commit(self: Box<Self>) -> Result<()>;
}

/// Durable key/value byte store keyed by bean identifier.
pub trait BeanStore: Send + Sync {
    /// Opens the entry for writing, truncating any previous content.
    fn open_for_write(&self, id: &BeanId) -> Result<Box<dyn StoreWriter>>;

    /// Returns `None` when no entry exists.
    fn open_for_read(&self, id: &BeanId) -> Result<Option<Box<dyn Read + Send>>>;

    /// Returns whether an entry was removed.
    fn remove(&self, id: &BeanId) -> Result<bool>;

    fn contains(&self, id: &BeanId) -> Result<bool>;

    fn list(&self) -> Result<Vec<BeanId>>;

    /// Write handle that gzip-compresses everything written through it.
    fn open_compressed_writer(&self, id: &BeanId, level: u32) -> Result<CompressedStoreWriter> {
        let inner = self.open_for_write(id)?;
        Ok(CompressedStoreWriter {
            encoder: compressing_writer(inner, level),
        })
    }

    /// Read handle that transparently decompresses the entry.
    fn open_decompressed_reader(
        &self,
        id: &BeanId,
    ) -> Result<Option<GzDecoder<Box<dyn Read + Send>>>> {
        Ok(self.open_for_read(id)?.map(decompressing_reader))
    }

    fn write_bytes(&self, id: &BeanId, bytes: &[u8]) -> Result<()> {
        let mut writer = self.open_for_write(id)?;
        writer
            .write_all(bytes)
            .map_err(|e| PassivationError::store(&format!("write entry {}", id), e))?;
        writer.commit()
    }

    fn read_bytes(&self, id: &BeanId) -> Result<Option<Vec<u8>>> {
        let Some(mut reader) = self.open_for_read(id)? else {
            return Ok(None);
        };
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| PassivationError::store(&format!("read entry {}", id), e))?;
        Ok(Some(bytes))
    }
}

pub struct CompressedStoreWriter {
    encoder: GzEncoder<Box<dyn StoreWriter>>,
}

impl CompressedStoreWriter {
    /// Writes the gzip trailer and commits the underlying entry.
    pub fn finish(self) -> Result<()> {
        let inner = self
            .encoder
            .finish()
            .map_err(|e| PassivationError::store("finish compressed entry", e))?;
        inner.commit()
    }
}

impl Write for CompressedStoreWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.encoder.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.encoder.flush()
    }
}
