use crate::service::error::{ServiceError, ServiceErrorKind};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use site_http::ErrorBody;

fn status_code_for(kind: ServiceErrorKind) -> StatusCode {
    match kind {
        ServiceErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ServiceErrorKind::NotFound => StatusCode::NOT_FOUND,
        ServiceErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ServiceErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = status_code_for(self.kind());
        ErrorBody::new(self.message()).with_status(status)
    }
}
