use std::path::Path;

use sled::transaction::{abort, TransactionError, TransactionResult};
use sled::{Transactional, Tree};

use crate::db::{decode_record, encode, Collectable, Identifiable, Store};
use crate::{error::ErrorKind, ImageRecord, Result};

/// Secondary index mapping filenames to record ids.
const FILENAME_INDEX: &str = "images_by_filename";

#[derive(Clone, Debug)]
pub struct SledDb {
    inner: sled::Db,
    images: Tree,
    filenames: Tree,
}

impl SledDb {
    /// Opens (or creates) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let inner = sled::Config::default().path(path).open()?;
        Self::with_db(inner)
    }

    /// Opens a database that is removed once dropped.
    pub fn temporary() -> Result<Self> {
        let inner = sled::Config::new().temporary(true).open()?;
        Self::with_db(inner)
    }

    fn with_db(inner: sled::Db) -> Result<Self> {
        let images = inner.open_tree(ImageRecord::get_collection_name())?;
        let filenames = inner.open_tree(FILENAME_INDEX)?;
        Ok(Self {
            inner,
            images,
            filenames,
        })
    }
}

impl Store for SledDb {
    fn ping(&self) -> Result<()> {
        self.inner.size_on_disk()?;
        Ok(())
    }

    fn insert(&self, record: &ImageRecord) -> Result<()> {
        let encoded = encode(record)?;
        let id = record.get_id().as_bytes().to_vec();

        let result: TransactionResult<(), ErrorKind> =
            (&self.images, &self.filenames).transaction(|(images, filenames)| {
                if filenames.get(record.filename.as_bytes())?.is_some() {
                    return abort(ErrorKind::DuplicateFilename(record.filename.clone()));
                }
                filenames.insert(record.filename.as_bytes(), id.as_slice())?;
                images.insert(id.as_slice(), encoded.as_slice())?;
                Ok(())
            });

        match result {
            Ok(()) => Ok(()),
            Err(TransactionError::Abort(kind)) => Err(kind.into()),
            Err(TransactionError::Storage(e)) => Err(e.into()),
        }
    }

    fn records(&self) -> Result<Vec<ImageRecord>> {
        let mut out = Vec::new();
        for entry in self.images.iter() {
            let (key, value) = entry?;
            if let Some(record) = decode_record(&key, &value) {
                out.push(record);
            }
        }
        Ok(out)
    }

    fn remove_by_filename(&self, filename: &str) -> Result<bool> {
        let result: TransactionResult<bool, ()> =
            (&self.images, &self.filenames).transaction(|(images, filenames)| {
                match filenames.remove(filename.as_bytes())? {
                    Some(id) => {
                        images.remove(id)?;
                        Ok(true)
                    }
                    None => Ok(false),
                }
            });

        match result {
            Ok(removed) => Ok(removed),
            Err(TransactionError::Abort(())) => Ok(false),
            Err(TransactionError::Storage(e)) => Err(e.into()),
        }
    }

    fn flush(&self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn record(filename: &str) -> ImageRecord {
        ImageRecord {
            id: Uuid::new_v4(),
            filename: filename.to_string(),
            original_filename: "original.png".to_string(),
            url: format!("http://localhost:8000/static/{filename}"),
            latitude: 52.52,
            longitude: 13.405,
            description: Some("brandenburg gate".to_string()),
            uploaded_at: Utc::now(),
            file_size: 42,
            content_type: Some("image/png".to_string()),
        }
    }

    #[test]
    fn insert_and_read_back() {
        let db = SledDb::temporary().unwrap();
        let rec = record("20240101000000_deadbeef.png");
        db.insert(&rec).unwrap();

        let records = db.records().unwrap();
        assert_eq!(records, vec![rec]);
        assert_eq!(db.images.len(), 1);
    }

    #[test]
    fn duplicate_filename_is_rejected() {
        let db = SledDb::temporary().unwrap();
        db.insert(&record("same.png")).unwrap();

        let err = db.insert(&record("same.png")).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::DuplicateFilename(_)));
        assert_eq!(db.images.len(), 1);
    }

    #[test]
    fn remove_by_filename_clears_both_trees() {
        let db = SledDb::temporary().unwrap();
        db.insert(&record("a.png")).unwrap();
        db.insert(&record("b.png")).unwrap();

        assert!(db.remove_by_filename("a.png").unwrap());
        assert!(!db.remove_by_filename("a.png").unwrap());

        let names = db
            .records()
            .unwrap()
            .into_iter()
            .map(|r| r.filename)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["b.png".to_string()]);

        // the filename can be claimed again once released
        db.insert(&record("a.png")).unwrap();
    }

    #[test]
    fn undecodable_entries_are_skipped() {
        let db = SledDb::temporary().unwrap();
        db.insert(&record("ok.png")).unwrap();
        db.images
            .insert(Uuid::new_v4().as_bytes(), b"not pot".to_vec())
            .unwrap();

        let records = db.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].filename, "ok.png");
    }

    #[test]
    fn ping_succeeds_on_open_db() {
        let db = SledDb::temporary().unwrap();
        assert!(db.ping().is_ok());
        assert!(db.flush().is_ok());
    }
}
