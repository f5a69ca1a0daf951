use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, Path, Query};
use axum::routing::{delete, get, post};
use axum::{Extension, Json};
use http::StatusCode;

use crate::api::{
    ImageEntry, ListQuery, NearbyQuery, RootResponse, StatusResponse, UploadResponse,
};
use crate::error::ErrorKind;
use crate::{gallery, routes, Health, Result, Upload};

use super::{ConfigExt, DbExt, Router};

pub fn router() -> Router {
    Router::new()
        .route(routes::HOME, get(root))
        .route(routes::UPLOAD, post(upload))
        .route(routes::IMAGES, get(images))
        .route(routes::IMAGES_NEARBY, get(nearby))
        .route(routes::IMAGE, delete(delete_image))
        .route(routes::HEALTH, get(health))
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Smart Image Gallery API is running".to_string(),
    })
}

/// Accepts a multipart form with `file`, `latitude`, `longitude` and an
/// optional `description`.
pub async fn upload(
    Extension(config): ConfigExt,
    Extension(db): DbExt,
    multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let upload = read_upload(multipart, config.max_file_size).await?;
    let record = gallery::upload(upload, &config, db.as_ref()).await?;

    Ok(Json(UploadResponse {
        status: "success".to_string(),
        message: "Image uploaded successfully".to_string(),
        url: record.url,
        id: record.id.to_string(),
    }))
}

async fn read_upload(mut multipart: Multipart, max_file_size: u64) -> Result<Upload> {
    let mut bytes = None;
    let mut original_filename = String::new();
    let mut content_type = None;
    let mut latitude = None;
    let mut longitude = None;
    let mut description = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_file_size))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                original_filename = field.file_name().unwrap_or_default().to_string();
                content_type = field.content_type().map(|c| c.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, max_file_size))?;
                bytes = Some(data.to_vec());
            }
            "latitude" => {
                let text = field_text(field, max_file_size).await?;
                latitude = Some(parse_coordinate("latitude", &text)?);
            }
            "longitude" => {
                let text = field_text(field, max_file_size).await?;
                longitude = Some(parse_coordinate("longitude", &text)?);
            }
            "description" => description = Some(field_text(field, max_file_size).await?),
            _ => (),
        }
    }

    Ok(Upload {
        bytes: bytes.ok_or_else(|| missing_field("file"))?,
        original_filename,
        content_type,
        latitude: latitude.ok_or_else(|| missing_field("latitude"))?,
        longitude: longitude.ok_or_else(|| missing_field("longitude"))?,
        description,
    })
}

async fn field_text(field: Field<'_>, max_file_size: u64) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| multipart_error(e, max_file_size))
}

/// Multipart failures are the client's fault. Bodies cut off by the request
/// size limit are reported the same way as oversized files.
fn multipart_error(e: MultipartError, max_file_size: u64) -> crate::Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        gallery::size_limit_error(max_file_size)
    } else {
        ErrorKind::BadInput(format!("failed reading multipart form: {}", e.body_text())).into()
    }
}

fn parse_coordinate(name: &str, text: &str) -> Result<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| ErrorKind::BadInput(format!("`{name}` must be a number, got `{text}`")).into())
}

fn missing_field(name: &str) -> crate::Error {
    ErrorKind::BadInput(format!("missing form field `{name}`")).into()
}

pub async fn images(
    Query(query): Query<ListQuery>,
    Extension(db): DbExt,
) -> Result<Json<Vec<ImageEntry>>> {
    let records = gallery::list(db.as_ref(), query.skip, query.limit)
        .map_err(|e| e.context("Failed to retrieve images"))?;
    Ok(Json(records.into_iter().map(ImageEntry::from).collect()))
}

pub async fn nearby(
    Query(query): Query<NearbyQuery>,
    Extension(db): DbExt,
) -> Result<Json<Vec<ImageEntry>>> {
    let records = gallery::nearby(
        db.as_ref(),
        query.latitude,
        query.longitude,
        query.max_distance,
    )
    .map_err(|e| e.context("Failed to retrieve nearby images"))?;
    Ok(Json(records.into_iter().map(ImageEntry::from).collect()))
}

pub async fn delete_image(
    Path(filename): Path<String>,
    Extension(config): ConfigExt,
    Extension(db): DbExt,
) -> Result<Json<StatusResponse>> {
    gallery::delete(&filename, &config, db.as_ref()).await?;
    Ok(Json(StatusResponse::success("Image deleted successfully")))
}

pub async fn health(Extension(db): DbExt) -> Json<Health> {
    Json(gallery::health(db.as_ref()))
}
