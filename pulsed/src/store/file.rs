//! File-backed storage medium.

use std::io::SeekFrom;
use std::path::Path;

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use super::Storage;

/// Storage capability backed by a regular file, the daemon's stand-in for
/// EEPROM. Writes are synced to disk so the record survives power loss.
pub struct FileStorage {
    file: File,
}

impl FileStorage {
    /// Open (or create) the backing file.
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .await?;
        Ok(Self { file })
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
        self.file.seek(SeekFrom::Start(offset)).await?;
        // A short or empty file reads as UnexpectedEof, which the store
        // treats as an uninitialized record.
        self.file.read_exact(buf).await?;
        Ok(())
    }

    async fn write_at(&mut self, offset: u64, bytes: &[u8]) -> std::io::Result<()> {
        self.file.seek(SeekFrom::Start(offset)).await?;
        self.file.write_all(bytes).await?;
        self.file.sync_data().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CounterStore, PersistedRecord, RECORD_MAGIC, RECORD_SIZE};

    #[tokio::test]
    async fn should_initialize_and_restore_across_reopen() {
        let dir = std::env::temp_dir().join("pulsed-file-storage-test");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join(format!("count-{}.bin", std::process::id()));
        let _ = tokio::fs::remove_file(&path).await;

        // First boot: empty file, count starts at zero.
        let storage = FileStorage::open(&path).await.unwrap();
        let (mut store, count) = CounterStore::load_or_init(storage, 0).await;
        assert_eq!(count, 0);
        assert!(store.save_if_changed(41).await);
        drop(store);

        // Reboot: the count comes back.
        let storage = FileStorage::open(&path).await.unwrap();
        let (_store, count) = CounterStore::load_or_init(storage, 0).await;
        assert_eq!(count, 41);

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn should_read_back_written_record() {
        let dir = std::env::temp_dir().join("pulsed-file-storage-test");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join(format!("raw-{}.bin", std::process::id()));
        let _ = tokio::fs::remove_file(&path).await;

        let mut storage = FileStorage::open(&path).await.unwrap();
        let record = PersistedRecord {
            magic: RECORD_MAGIC,
            count: 7,
        };
        storage.write_at(0, &record.to_bytes()).await.unwrap();

        let mut bytes = [0u8; RECORD_SIZE];
        storage.read_at(0, &mut bytes).await.unwrap();
        assert_eq!(PersistedRecord::from_bytes(bytes), record);

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
