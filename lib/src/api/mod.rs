//! Request and response bodies of the http api.

use chrono::{DateTime, Utc};

use crate::gallery::DEFAULT_LIMIT;
use crate::geo::DEFAULT_MAX_DISTANCE_KM;
use crate::ImageRecord;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
}

/// Response sent back from the `/upload` endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub status: String,
    pub message: String,
    pub url: String,
    /// Identity of the stored record.
    pub id: String,
}

/// Generic `{status, message}` acknowledgement.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

impl StatusResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }
}

/// Image metadata as exposed to clients. Mirrors `ImageRecord` minus the
/// internal id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageEntry {
    pub filename: String,
    pub original_filename: String,
    pub url: String,
    pub latitude: f64,
    pub longitude: f64,
    pub description: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub file_size: u64,
    pub content_type: Option<String>,
}

impl From<ImageRecord> for ImageEntry {
    fn from(r: ImageRecord) -> Self {
        Self {
            filename: r.filename,
            original_filename: r.original_filename,
            url: r.url,
            latitude: r.latitude,
            longitude: r.longitude,
            description: r.description,
            uploaded_at: r.uploaded_at,
            file_size: r.file_size,
            content_type: r.content_type,
        }
    }
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub skip: usize,
    pub limit: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct NearbyQuery {
    pub latitude: f64,
    pub longitude: f64,
    /// Search distance in kilometers.
    #[serde(default = "default_max_distance")]
    pub max_distance: f64,
}

fn default_max_distance() -> f64 {
    DEFAULT_MAX_DISTANCE_KM
}
