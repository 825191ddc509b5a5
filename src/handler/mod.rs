mod error_mapper;
pub(crate) mod property_handler;
pub(crate) mod upload_handler;

use crate::service::{property_service::PropertyService, upload_service::UploadService};
use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use site_http::health_check;

/// Everything mounted under `/api`.
pub(crate) fn api_router(properties: PropertyService, uploads: UploadService) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(property_handler::router(properties))
        .merge(upload_handler::router(uploads))
}

pub(super) fn json_response<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(data)).into_response()
}
