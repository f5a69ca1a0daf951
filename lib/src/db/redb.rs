//! Database storage based on `redb`.
//!
//! `redb` design document: https://github.com/cberner/redb/blob/master/docs/design.md

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};

use crate::db::{decode_record, encode, Identifiable, Store};
use crate::{ErrorKind, ImageRecord, Result};

const IMAGES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("images");
const FILENAMES: TableDefinition<&str, &[u8]> = TableDefinition::new("images_by_filename");

#[derive(Clone)]
pub struct ReDb {
    db: Arc<Database>,
}

impl std::fmt::Debug for ReDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReDb").finish_non_exhaustive()
    }
}

impl ReDb {
    /// Opens (or creates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_db(Database::create(path)?)
    }

    /// Opens a database living entirely in memory.
    pub fn temporary() -> Result<Self> {
        let db = redb::Builder::new()
            .create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::with_db(db)
    }

    fn with_db(db: Database) -> Result<Self> {
        // Tables must exist before the first read transaction touches them.
        let wx = db.begin_write()?;
        wx.open_table(IMAGES)?;
        wx.open_table(FILENAMES)?;
        wx.commit()?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl Store for ReDb {
    fn ping(&self) -> Result<()> {
        let rx = self.db.begin_read()?;
        rx.open_table(IMAGES)?;
        Ok(())
    }

    fn insert(&self, record: &ImageRecord) -> Result<()> {
        let encoded = encode(record)?;

        let wx = self.db.begin_write()?;
        {
            let mut filenames = wx.open_table(FILENAMES)?;
            if filenames.get(record.filename.as_str())?.is_some() {
                // Dropping the transaction without committing rolls it back.
                return Err(ErrorKind::DuplicateFilename(record.filename.clone()).into());
            }
            filenames.insert(record.filename.as_str(), record.get_id().as_bytes().as_slice())?;

            let mut images = wx.open_table(IMAGES)?;
            images.insert(record.get_id().as_bytes().as_slice(), encoded.as_slice())?;
        }
        wx.commit()?;

        Ok(())
    }

    fn records(&self) -> Result<Vec<ImageRecord>> {
        let rx = self.db.begin_read()?;
        let table = rx.open_table(IMAGES)?;

        let mut out = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            if let Some(record) = decode_record(key.value(), value.value()) {
                out.push(record);
            }
        }
        Ok(out)
    }

    fn remove_by_filename(&self, filename: &str) -> Result<bool> {
        let wx = self.db.begin_write()?;
        let removed = {
            let mut filenames = wx.open_table(FILENAMES)?;
            let id = filenames.remove(filename)?.map(|id| id.value().to_vec());
            match id {
                Some(id) => {
                    let mut images = wx.open_table(IMAGES)?;
                    images.remove(id.as_slice())?;
                    true
                }
                None => false,
            }
        };
        wx.commit()?;

        Ok(removed)
    }

    fn flush(&self) -> Result<()> {
        // Committed write transactions are already durable.
        Ok(())
    }
}
