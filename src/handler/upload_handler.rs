use crate::handler::json_response;
use crate::service::error::ServiceError;
use crate::service::upload_service::{MAX_FILE_BYTES, MAX_FILES, UploadRequest, UploadService};
use axum::{
    Router,
    extract::{
        DefaultBodyLimit, Multipart,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::Response,
    routing::post,
};
use serde::Serialize;

type MultipartBody = Result<Multipart, MultipartRejection>;

/// A full batch plus room for the multipart framing. Replaces the app-wide
/// body limit on the upload routes.
pub(crate) const UPLOAD_BODY_LIMIT: usize = MAX_FILES * MAX_FILE_BYTES + 1024 * 1024;

#[derive(Serialize)]
struct Uploaded {
    filename: String,
}

#[derive(Serialize)]
struct UploadedMany {
    filenames: Vec<String>,
}

pub(crate) fn router(service: UploadService) -> Router {
    let single_service = service.clone();
    let many_service = service;

    Router::new()
        .route(
            "/upload",
            post(move |multipart: MultipartBody| upload_image(single_service.clone(), multipart)),
        )
        .route(
            "/upload/multiple",
            post(move |multipart: MultipartBody| upload_images(many_service.clone(), multipart)),
        )
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
}

fn multipart_error(error: MultipartError) -> ServiceError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::payload_too_large("Upload is too large")
    } else {
        ServiceError::bad_request(format!("invalid multipart payload: {}", error.body_text()))
    }
}

/// Collects every file sent under `field_name`; other fields are ignored.
async fn parse_upload_files(
    multipart: MultipartBody,
    field_name: &str,
) -> Result<Vec<UploadRequest>, ServiceError> {
    let mut multipart =
        multipart.map_err(|rejection| ServiceError::bad_request(rejection.body_text()))?;

    let mut uploads = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(field_name) {
            continue;
        }

        let original_filename = field.file_name().map(str::to_owned);
        let mime_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await.map_err(multipart_error)?;

        uploads.push(UploadRequest {
            original_filename,
            mime_type,
            bytes: bytes.to_vec(),
        });
    }

    Ok(uploads)
}

async fn upload_image(
    service: UploadService,
    multipart: MultipartBody,
) -> Result<Response, ServiceError> {
    let uploads = parse_upload_files(multipart, "image").await?;
    let filename = service.upload_single(uploads).await?;
    Ok(json_response(StatusCode::OK, Uploaded { filename }))
}

async fn upload_images(
    service: UploadService,
    multipart: MultipartBody,
) -> Result<Response, ServiceError> {
    let uploads = parse_upload_files(multipart, "images").await?;
    let filenames = service.upload_many(uploads).await?;
    Ok(json_response(StatusCode::OK, UploadedMany { filenames }))
}
