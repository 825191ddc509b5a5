use crate::repository::image_repository::ImageError;
use crate::repository::property_repository::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ServiceErrorKind {
    BadRequest,
    NotFound,
    PayloadTooLarge,
    Internal,
}

#[derive(Debug, Clone)]
pub(crate) struct ServiceError {
    kind: ServiceErrorKind,
    message: String,
}

impl ServiceError {
    pub(crate) fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::BadRequest, message)
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::NotFound, message)
    }

    pub(crate) fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::PayloadTooLarge, message)
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Internal, message)
    }

    pub(crate) fn kind(&self) -> ServiceErrorKind {
        self.kind
    }

    pub(crate) fn message(&self) -> &str {
        &self.message
    }
}

pub(crate) fn map_store_error(error: StoreError) -> ServiceError {
    tracing::error!(error = %error, "property store failure");
    ServiceError::internal("Failed to access property store")
}

/// Bad inline images are the caller's fault; anything touching the disk is
/// logged and reported generically.
pub(crate) fn map_image_error(error: ImageError) -> ServiceError {
    match error {
        ImageError::MalformedDataUrl | ImageError::InvalidBase64(_) => {
            ServiceError::bad_request(error.to_string())
        }
        ImageError::UnsafeName(_) | ImageError::Io { .. } => {
            tracing::error!(error = %error, "image storage failure");
            ServiceError::internal("Failed to store image")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn inline_image_problems_are_bad_requests() {
        let error = map_image_error(ImageError::MalformedDataUrl);
        assert_eq!(error.kind(), ServiceErrorKind::BadRequest);
        assert!(error.message().contains("data:image"));
    }

    #[test]
    fn disk_failures_hide_paths() {
        let error = map_image_error(ImageError::Io {
            path: "/srv/data/uploads/a.jpg".into(),
            source: io::Error::other("disk full"),
        });
        assert_eq!(error.kind(), ServiceErrorKind::Internal);
        assert!(!error.message().contains("/srv"));

        let error = map_store_error(StoreError::Io {
            path: "/srv/data/properties.json".into(),
            source: io::Error::other("disk full"),
        });
        assert_eq!(error.kind(), ServiceErrorKind::Internal);
        assert!(!error.message().contains("/srv"));
    }
}
