//! Gallery operations: the upload pipeline plus the listing, proximity,
//! deletion and health queries.
//!
//! Everything here works against a `Store` handle and the content store
//! directory from `Config`, without any knowledge of http.

use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ErrorKind;
use crate::geo::BoundingBox;
use crate::image::{detect_format, generate_filename, public_url};
use crate::{Config, ImageRecord, Result, Store};

/// Default page size for listings.
pub const DEFAULT_LIMIT: usize = 100;

/// Raw upload as received from the client.
#[derive(Clone, Debug, Default)]
pub struct Upload {
    pub bytes: Vec<u8>,
    /// Filename as supplied by the client, may be empty.
    pub original_filename: String,
    pub content_type: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub description: Option<String>,
}

/// Validates and stores an uploaded image, returning the new record.
///
/// Bytes are written to the content store first, then the record is inserted.
/// A failing insert leaves the written file behind.
pub async fn upload(upload: Upload, config: &Config, db: &dyn Store) -> Result<ImageRecord> {
    let format = detect_format(&upload.bytes)?;
    check_size(upload.bytes.len() as u64, config.max_file_size)?;
    debug!(
        "accepted {:?} upload of {} bytes",
        format,
        upload.bytes.len()
    );

    persist(upload, config, db)
        .await
        .map_err(|e| e.context("Upload failed"))
}

fn check_size(len: u64, max_file_size: u64) -> Result<()> {
    if len > max_file_size {
        return Err(size_limit_error(max_file_size));
    }
    Ok(())
}

/// Limit is reported in MiB, always with a fractional part, e.g. `(5.0MB)`.
pub(crate) fn size_limit_error(max_file_size: u64) -> crate::Error {
    let max_size_mb = max_file_size as f64 / (1024.0 * 1024.0);
    ErrorKind::BadInput(format!("File size exceeds the limit ({max_size_mb:?}MB)")).into()
}

async fn persist(upload: Upload, config: &Config, db: &dyn Store) -> Result<ImageRecord> {
    let now = Utc::now();
    let filename = generate_filename(now, &upload.original_filename);
    let path = config.upload_dir.join(&filename);

    tokio::fs::write(&path, &upload.bytes).await?;

    let record = ImageRecord {
        id: Uuid::new_v4(),
        url: public_url(&config.host_url, &filename),
        filename,
        original_filename: upload.original_filename,
        latitude: upload.latitude,
        longitude: upload.longitude,
        description: upload.description,
        uploaded_at: now,
        file_size: upload.bytes.len() as u64,
        content_type: upload.content_type,
    };
    if let Err(e) = db.insert(&record) {
        warn!(filename = %record.filename, "record insert failed, leaving orphaned file");
        return Err(e);
    }

    info!(
        filename = %record.filename,
        latitude = record.latitude,
        longitude = record.longitude,
        "stored image"
    );

    Ok(record)
}

/// Lists records newest first, skipping `skip` and returning at most `limit`.
pub fn list(db: &dyn Store, skip: usize, limit: usize) -> Result<Vec<ImageRecord>> {
    let mut records = db.records()?;
    records.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
    Ok(records.into_iter().skip(skip).take(limit).collect())
}

/// Returns records whose coordinates fall within the bounding box spanning
/// `max_distance` kilometers around the given point. The result is unordered.
pub fn nearby(
    db: &dyn Store,
    latitude: f64,
    longitude: f64,
    max_distance: f64,
) -> Result<Vec<ImageRecord>> {
    let bbox = BoundingBox::around(latitude, longitude, max_distance);
    debug!("nearby query within {:?}", bbox);

    Ok(db
        .records()?
        .into_iter()
        .filter(|r| bbox.contains(r.latitude, r.longitude))
        .collect())
}

/// Deletes the record stored under `filename` along with its file.
///
/// Fails with `ErrorKind::BadInput` if `filename` is anything but a bare file
/// name, and with `ErrorKind::NotFound` if there's no such record. A file
/// that's already gone is not an error. The content store is only touched
/// once the record is gone.
pub async fn delete(filename: &str, config: &Config, db: &dyn Store) -> Result<()> {
    let path = content_path(&config.upload_dir, filename)?;

    let removed = db
        .remove_by_filename(filename)
        .map_err(|e| e.context("Failed to delete image"))?;
    if !removed {
        return Err(ErrorKind::NotFound("Image not found".to_string()).into());
    }

    let existed = remove_file(&path)
        .await
        .map_err(|e| e.context("Failed to delete image"))?;
    if !existed {
        warn!(%filename, "record removed but file was already missing");
    }

    info!(%filename, "deleted image");
    Ok(())
}

/// Resolves `filename` inside the content store directory, refusing anything
/// that could point outside of it.
fn content_path(dir: &Path, filename: &str) -> Result<PathBuf> {
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == filename => Ok(dir.join(name)),
        _ => Err(ErrorKind::BadInput(format!("invalid filename `{filename}`")).into()),
    }
}

/// Returns false if there was no file to remove.
async fn remove_file(path: &Path) -> Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseStatus {
    Connected,
    Disconnected,
}

/// Health report. Failures are carried as data, never as errors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub status: HealthStatus,
    pub database: DatabaseStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

pub fn health(db: &dyn Store) -> Health {
    match db.ping() {
        Ok(()) => Health {
            status: HealthStatus::Healthy,
            database: DatabaseStatus::Connected,
            error: None,
        },
        Err(e) => {
            warn!("health check failed: {}", e.kind);
            Health {
                status: HealthStatus::Unhealthy,
                database: DatabaseStatus::Disconnected,
                error: Some(e.kind.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    use super::*;
    use crate::Database;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01\x08\x06\0\0\0";

    /// Store that can't be reached.
    #[derive(Debug)]
    struct Unreachable;

    impl Store for Unreachable {
        fn ping(&self) -> Result<()> {
            Err(ErrorKind::DbError("connection refused".to_string()).into())
        }
        fn insert(&self, _: &ImageRecord) -> Result<()> {
            Err(ErrorKind::DbError("connection refused".to_string()).into())
        }
        fn records(&self) -> Result<Vec<ImageRecord>> {
            Err(ErrorKind::DbError("connection refused".to_string()).into())
        }
        fn remove_by_filename(&self, _: &str) -> Result<bool> {
            Err(ErrorKind::DbError("connection refused".to_string()).into())
        }
        fn flush(&self) -> Result<()> {
            Ok(())
        }
    }

    fn setup() -> (Config, Database, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            database_url: "unused".to_string(),
            upload_dir: dir.path().to_path_buf(),
            max_file_size: 1024,
            ..Default::default()
        };
        (config, Database::temporary().unwrap(), dir)
    }

    fn png_upload(latitude: f64, longitude: f64) -> Upload {
        Upload {
            bytes: PNG.to_vec(),
            original_filename: "pic.png".to_string(),
            content_type: Some("image/png".to_string()),
            latitude,
            longitude,
            description: Some("test".to_string()),
        }
    }

    fn record_at(filename: &str, latitude: f64, longitude: f64, minutes_ago: i64) -> ImageRecord {
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        ImageRecord {
            id: Uuid::new_v4(),
            filename: filename.to_string(),
            original_filename: filename.to_string(),
            url: public_url("http://localhost:8000", filename),
            latitude,
            longitude,
            description: None,
            uploaded_at: base - Duration::minutes(minutes_ago),
            file_size: 1,
            content_type: None,
        }
    }

    fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn upload_stores_file_and_record() {
        let (config, db, dir) = setup();

        let record = upload(png_upload(40.0, -74.0), &config, &db).await.unwrap();

        assert_eq!(record.file_size, PNG.len() as u64);
        assert_eq!(record.original_filename, "pic.png");
        assert!(record.filename.ends_with(".png"));
        assert_eq!(
            record.url,
            format!("http://localhost:8000/static/{}", record.filename)
        );

        let stored = std::fs::read(dir.path().join(&record.filename)).unwrap();
        assert_eq!(stored, PNG);
        assert_eq!(db.records().unwrap(), vec![record]);
    }

    #[tokio::test]
    async fn upload_accepts_out_of_range_coordinates() {
        let (config, db, _dir) = setup();
        let record = upload(png_upload(123.0, -500.0), &config, &db).await.unwrap();
        assert_eq!(record.latitude, 123.0);
        assert_eq!(record.longitude, -500.0);
    }

    #[tokio::test]
    async fn upload_rejects_non_image_without_side_effects() {
        let (config, db, dir) = setup();
        let upload_ = Upload {
            bytes: b"just some text pretending to be a png".to_vec(),
            original_filename: "fake.png".to_string(),
            ..png_upload(0.0, 0.0)
        };

        let err = upload(upload_, &config, &db).await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::BadInput(_)));
        assert_eq!(err.kind.to_string(), "File is not a valid image");
        assert_eq!(file_count(dir.path()), 0);
        assert!(db.records().unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_rejects_oversized_images() {
        let (config, db, dir) = setup();
        let mut bytes = PNG.to_vec();
        bytes.resize(config.max_file_size as usize + 1, 0);
        let upload_ = Upload {
            bytes,
            ..png_upload(0.0, 0.0)
        };

        let err = upload(upload_, &config, &db).await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::BadInput(_)));
        assert_eq!(
            err.kind.to_string(),
            "File size exceeds the limit (0.0009765625MB)"
        );
        assert_eq!(file_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn upload_at_exact_limit_is_accepted() {
        let (config, db, _dir) = setup();
        let mut bytes = PNG.to_vec();
        bytes.resize(config.max_file_size as usize, 0);
        let upload_ = Upload {
            bytes,
            ..png_upload(0.0, 0.0)
        };
        let record = upload(upload_, &config, &db).await.unwrap();
        assert_eq!(record.file_size, config.max_file_size);
    }

    #[tokio::test]
    async fn upload_failure_in_store_is_internal() {
        let (config, _db, _dir) = setup();
        let err = upload(png_upload(0.0, 0.0), &config, &Unreachable)
            .await
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Internal(_)));
        assert!(err.kind.to_string().starts_with("Upload failed: "));
    }

    #[tokio::test]
    async fn upload_into_missing_directory_is_internal() {
        let (mut config, db, dir) = setup();
        config.upload_dir = dir.path().join("does/not/exist");
        let err = upload(png_upload(0.0, 0.0), &config, &db).await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Internal(_)));
        assert!(db.records().unwrap().is_empty());
    }

    #[test]
    fn list_is_newest_first_and_paged() {
        let db = Database::temporary().unwrap();
        for (i, minutes_ago) in [30, 10, 50, 0, 20].iter().enumerate() {
            db.insert(&record_at(&format!("{i}.png"), 0.0, 0.0, *minutes_ago))
                .unwrap();
        }

        let all = list(&db, 0, DEFAULT_LIMIT).unwrap();
        let names = all.iter().map(|r| r.filename.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["3.png", "1.png", "4.png", "0.png", "2.png"]);
        assert!(all
            .windows(2)
            .all(|w| w[0].uploaded_at >= w[1].uploaded_at));

        let page = list(&db, 1, 2).unwrap();
        let names = page.iter().map(|r| r.filename.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["1.png", "4.png"]);

        assert!(list(&db, 10, 5).unwrap().is_empty());
        assert!(list(&db, 0, 0).unwrap().is_empty());
    }

    #[test]
    fn nearby_uses_bounding_box() {
        let db = Database::temporary().unwrap();
        db.insert(&record_at("close.png", 40.05, -73.95, 0)).unwrap();
        db.insert(&record_at("far.png", 40.0, -70.0, 0)).unwrap();
        db.insert(&record_at("exact.png", 40.0, -74.0, 0)).unwrap();

        let mut names = nearby(&db, 40.0, -74.0, 10.0)
            .unwrap()
            .into_iter()
            .map(|r| r.filename)
            .collect::<Vec<_>>();
        names.sort();
        assert_eq!(names, vec!["close.png".to_string(), "exact.png".to_string()]);

        let exact = nearby(&db, 40.0, -74.0, 0.0).unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].filename, "exact.png");
    }

    #[tokio::test]
    async fn delete_removes_record_and_file_once() {
        let (config, db, dir) = setup();
        let record = upload(png_upload(1.0, 2.0), &config, &db).await.unwrap();

        delete(&record.filename, &config, &db).await.unwrap();
        assert!(!dir.path().join(&record.filename).exists());
        assert!(list(&db, 0, DEFAULT_LIMIT).unwrap().is_empty());

        let err = delete(&record.filename, &config, &db).await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::NotFound(_)));
        assert_eq!(err.kind.to_string(), "Image not found");
    }

    #[tokio::test]
    async fn delete_unknown_filename_is_not_found() {
        let (config, db, _dir) = setup();
        let err = delete("19700101000000_00000000.png", &config, &db)
            .await
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_tolerates_missing_file() {
        let (config, db, dir) = setup();
        let record = upload(png_upload(1.0, 2.0), &config, &db).await.unwrap();
        std::fs::remove_file(dir.path().join(&record.filename)).unwrap();

        delete(&record.filename, &config, &db).await.unwrap();
        assert!(db.records().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_leaves_file_alone_when_store_fails() {
        let (config, _db, dir) = setup();
        let path = dir.path().join("kept.png");
        std::fs::write(&path, PNG).unwrap();

        let err = delete("kept.png", &config, &Unreachable).await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Internal(_)));
        assert!(err.kind.to_string().starts_with("Failed to delete image: "));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn delete_refuses_paths_outside_upload_dir() {
        let root = tempfile::tempdir().unwrap();
        let upload_dir = root.path().join("uploads");
        std::fs::create_dir(&upload_dir).unwrap();
        let victim = root.path().join("victim.txt");
        std::fs::write(&victim, b"keep me").unwrap();
        let config = Config {
            database_url: "unused".to_string(),
            upload_dir,
            ..Default::default()
        };

        for name in ["../victim.txt", "sub/../../victim.txt", "/etc/passwd", "", ".", ".."] {
            let err = delete(name, &config, &Unreachable).await.unwrap_err();
            assert!(matches!(err.kind, ErrorKind::BadInput(_)), "{name}: {err}");
        }
        let db = Database::temporary().unwrap();
        let err = delete("../victim.txt", &config, &db).await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::BadInput(_)));
        assert!(victim.exists());
    }

    #[test]
    fn health_reports_connected_store() {
        let db = Database::temporary().unwrap();
        let health = health(&db);
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.database, DatabaseStatus::Connected);
        assert!(health.error.is_none());
    }

    #[test]
    fn health_reports_unreachable_store_as_data() {
        let health = health(&Unreachable);
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert_eq!(health.database, DatabaseStatus::Disconnected);
        assert_eq!(health.error.as_deref(), Some("db error: connection refused"));

        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["status"], "unhealthy");
        assert_eq!(json["database"], "disconnected");
    }
}
