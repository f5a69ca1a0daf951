//! Metadata store.
//!
//! The backend is picked at compile time: `sled` (default) or `redb`. Both are
//! embedded, so "connecting" means opening the database files once at startup
//! and sharing the handle for the lifetime of the process.

#[cfg(feature = "redb")]
mod redb;
#[cfg(feature = "sled")]
mod sled;

use uuid::Uuid;

use crate::{ImageRecord, Result};

#[cfg(all(feature = "redb", not(feature = "sled")))]
pub use self::redb::ReDb as Database;
#[cfg(feature = "sled")]
pub use self::sled::SledDb as Database;

#[cfg(feature = "redb")]
pub use self::redb::ReDb;
#[cfg(feature = "sled")]
pub use self::sled::SledDb;

pub trait Identifiable {
    fn get_id(&self) -> Uuid;
}

pub trait Collectable {
    fn get_collection_name() -> &'static str;
}

/// Operations the gallery needs from a metadata store.
///
/// Implementations are shared between request handlers, hence the `Send +
/// Sync` bound.
pub trait Store: Send + Sync + std::fmt::Debug {
    /// Checks that the store is reachable and usable.
    fn ping(&self) -> Result<()>;

    /// Inserts a new record. Fails with `ErrorKind::DuplicateFilename` if
    /// another record already claims the same filename.
    fn insert(&self, record: &ImageRecord) -> Result<()>;

    /// Returns all records in no particular order.
    ///
    /// Entries that fail to decode are skipped and logged.
    fn records(&self) -> Result<Vec<ImageRecord>>;

    /// Removes the record stored under `filename`. Returns false if there was
    /// no such record.
    fn remove_by_filename(&self, filename: &str) -> Result<bool>;

    /// Persists pending writes.
    fn flush(&self) -> Result<()>;
}

pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let t: T = pot::from_slice(bytes)?;
    Ok(t)
}

pub fn encode<T: serde::Serialize>(item: &T) -> Result<Vec<u8>> {
    let bytes = pot::to_vec(item)?;
    Ok(bytes)
}

/// Decodes a stored record, logging and discarding anything malformed.
fn decode_record(key: &[u8], bytes: &[u8]) -> Option<ImageRecord> {
    match decode::<ImageRecord>(bytes) {
        Ok(record) => Some(record),
        Err(e) => {
            let key = Uuid::from_slice(key)
                .map(|id| id.to_string())
                .unwrap_or_else(|_| String::from_utf8_lossy(key).into_owned());
            tracing::warn!(
                key = %key,
                "skipping undecodable {} entry: {}",
                ImageRecord::get_collection_name(),
                e
            );
            None
        }
    }
}
