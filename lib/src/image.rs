//! Image metadata records and the helpers deriving their stored names and
//! public urls.

use std::path::Path;

use chrono::{DateTime, Utc};
use image::ImageFormat;

use crate::db::{Collectable, Identifiable};
use crate::error::ErrorKind;
use crate::{routes, Result};

pub type ImageId = uuid::Uuid;

/// Metadata of a single uploaded image.
///
/// All fields are required when decoding. Records are never updated once
/// stored.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ImageRecord {
    /// Storage identity, independent of the filename.
    pub id: ImageId,
    /// Generated name under which the bytes live in the content store.
    /// Unique across all records.
    pub filename: String,
    /// Name supplied by the client, informational only.
    pub original_filename: String,
    pub url: String,

    pub latitude: f64,
    pub longitude: f64,
    pub description: Option<String>,

    pub uploaded_at: DateTime<Utc>,
    pub file_size: u64,
    /// Content type as reported by the client.
    pub content_type: Option<String>,
}

impl Collectable for ImageRecord {
    fn get_collection_name() -> &'static str {
        "images"
    }
}

impl Identifiable for ImageRecord {
    fn get_id(&self) -> uuid::Uuid {
        self.id
    }
}

/// Identifies the image format from the leading bytes of `bytes`.
///
/// The filename extension plays no part in this.
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat> {
    image::guess_format(bytes)
        .map_err(|_| ErrorKind::BadInput("File is not a valid image".to_string()).into())
}

/// Builds a unique content store name in the form
/// `<%Y%m%d%H%M%S>_<8 hex chars><extension>`.
///
/// The timestamp only makes names roughly sortable, the random suffix is what
/// keeps uploads within the same second apart.
pub fn generate_filename(now: DateTime<Utc>, original_filename: &str) -> String {
    format!(
        "{}_{:08x}{}",
        now.format("%Y%m%d%H%M%S"),
        rand::random::<u32>(),
        extension(original_filename)
    )
}

/// Returns the extension of `filename` including the leading dot, or an empty
/// string.
pub fn extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

/// Derives the public url of a stored file.
pub fn public_url(host_url: &str, filename: &str) -> String {
    format!(
        "{}{}/{}",
        host_url.trim_end_matches('/'),
        routes::STATIC,
        filename
    )
}
