use crate::repository::image_repository::ImageRepository;
use crate::service::error::{ServiceError, map_image_error};
use std::{path::Path, sync::Arc};

pub(crate) const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;
pub(crate) const MAX_FILES: usize = 20;

pub(crate) struct UploadRequest {
    pub(crate) original_filename: Option<String>,
    pub(crate) mime_type: Option<String>,
    pub(crate) bytes: Vec<u8>,
}

impl UploadRequest {
    /// Extension to store the file under: the uploaded name's when it has a
    /// usable one, otherwise derived from the content type.
    fn extension(&self) -> String {
        let from_name = self
            .original_filename
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|extension| extension.to_str())
            .filter(|extension| {
                !extension.is_empty() && extension.chars().all(|c| c.is_ascii_alphanumeric())
            });

        match (from_name, self.mime_type.as_deref()) {
            (Some(extension), _) => extension.to_string(),
            (None, Some("image/jpeg")) => "jpg".to_string(),
            (None, Some("image/png")) => "png".to_string(),
            (None, Some("image/webp")) => "webp".to_string(),
            (None, _) => String::new(),
        }
    }

    fn is_allowed_image(&self) -> bool {
        matches!(
            self.mime_type.as_deref(),
            Some("image/jpeg" | "image/png" | "image/webp")
        )
    }
}

#[derive(Clone)]
pub(crate) struct UploadService {
    images: Arc<ImageRepository>,
}

impl UploadService {
    pub(crate) fn new(images: Arc<ImageRepository>) -> Self {
        Self { images }
    }

    pub(crate) async fn upload_single(
        &self,
        uploads: Vec<UploadRequest>,
    ) -> Result<String, ServiceError> {
        let Some(upload) = accepted(uploads)?.into_iter().next() else {
            return Err(ServiceError::bad_request("No image provided"));
        };

        let filename = self
            .images
            .save_bytes(&upload.extension(), &upload.bytes)
            .await
            .map_err(map_image_error)?;
        tracing::info!(filename = %filename, bytes = upload.bytes.len(), "image uploaded");
        Ok(filename)
    }

    pub(crate) async fn upload_many(
        &self,
        uploads: Vec<UploadRequest>,
    ) -> Result<Vec<String>, ServiceError> {
        let uploads = accepted(uploads)?;
        if uploads.is_empty() {
            return Err(ServiceError::bad_request("No images provided"));
        }
        if uploads.len() > MAX_FILES {
            return Err(ServiceError::bad_request(format!(
                "At most {MAX_FILES} images can be uploaded at once"
            )));
        }

        let mut filenames = Vec::with_capacity(uploads.len());
        for upload in &uploads {
            match self
                .images
                .save_bytes(&upload.extension(), &upload.bytes)
                .await
            {
                Ok(filename) => filenames.push(filename),
                Err(error) => {
                    self.discard(&filenames).await;
                    return Err(map_image_error(error));
                }
            }
        }

        tracing::info!(count = filenames.len(), "images uploaded");
        Ok(filenames)
    }

    /// Removes the files of a batch that failed part way. Keeps going past
    /// files it cannot remove.
    async fn discard(&self, filenames: &[String]) {
        for filename in filenames {
            if let Err(error) = self.images.delete(filename).await {
                tracing::warn!(
                    error = %error,
                    filename = %filename,
                    "failed to remove partially uploaded image"
                );
            }
        }
    }
}

/// Drops files that are not JPEG, PNG or WebP and enforces the per-file size
/// limit on the rest.
fn accepted(uploads: Vec<UploadRequest>) -> Result<Vec<UploadRequest>, ServiceError> {
    let mut images = Vec::with_capacity(uploads.len());
    for upload in uploads {
        if !upload.is_allowed_image() {
            tracing::debug!(
                filename = upload.original_filename.as_deref().unwrap_or_default(),
                mime_type = upload.mime_type.as_deref().unwrap_or_default(),
                "skipping non-image upload"
            );
            continue;
        }
        if upload.bytes.len() > MAX_FILE_BYTES {
            return Err(ServiceError::payload_too_large(format!(
                "Images must be at most {} MB",
                MAX_FILE_BYTES / (1024 * 1024)
            )));
        }
        images.push(upload);
    }
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::error::ServiceErrorKind;

    fn upload(name: &str, mime_type: &str, len: usize) -> UploadRequest {
        UploadRequest {
            original_filename: Some(name.to_string()),
            mime_type: Some(mime_type.to_string()),
            bytes: vec![0xAB; len],
        }
    }

    async fn service(dir: &Path) -> UploadService {
        UploadService::new(Arc::new(ImageRepository::open(dir).await.unwrap()))
    }

    #[test]
    fn extension_comes_from_name_then_type() {
        assert_eq!(upload("frente.JPG", "image/jpeg", 1).extension(), "JPG");
        assert_eq!(upload("frente", "image/jpeg", 1).extension(), "jpg");
        assert_eq!(upload("weird.p/g", "image/webp", 1).extension(), "webp");
    }

    #[tokio::test]
    async fn single_upload_keeps_the_original_extension() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path()).await;

        let filename = service
            .upload_single(vec![upload("living.png", "image/png", 16)])
            .await
            .unwrap();

        assert!(filename.ends_with(".png"));
        assert_eq!(std::fs::read(dir.path().join(&filename)).unwrap().len(), 16);
    }

    #[tokio::test]
    async fn non_images_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path()).await;

        let error = service
            .upload_single(vec![upload("notes.pdf", "application/pdf", 4)])
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ServiceErrorKind::BadRequest);
        assert_eq!(error.message(), "No image provided");

        let filenames = service
            .upload_many(vec![
                upload("a.gif", "image/gif", 4),
                upload("b.webp", "image/webp", 4),
            ])
            .await
            .unwrap();
        assert_eq!(filenames.len(), 1);
        assert!(filenames[0].ends_with(".webp"));
    }

    #[tokio::test]
    async fn discard_continues_past_files_it_cannot_remove() {
        let dir = tempfile::tempdir().unwrap();
        let images = Arc::new(ImageRepository::open(dir.path().join("uploads")).await.unwrap());
        let first = images.save_bytes("png", b"one").await.unwrap();
        let last = images.save_bytes("png", b"two").await.unwrap();
        let service = UploadService::new(images);

        service
            .discard(&[first, "../escape.png".to_string(), last])
            .await;

        assert_eq!(std::fs::read_dir(dir.path().join("uploads")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn empty_batches_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path()).await;

        let error = service.upload_many(Vec::new()).await.unwrap_err();

        assert_eq!(error.message(), "No images provided");
    }

    #[tokio::test]
    async fn oversized_files_fail_before_anything_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path()).await;

        let error = service
            .upload_many(vec![
                upload("ok.jpg", "image/jpeg", 8),
                upload("huge.jpg", "image/jpeg", MAX_FILE_BYTES + 1),
            ])
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ServiceErrorKind::PayloadTooLarge);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn batches_are_capped() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path()).await;
        let uploads = (0..=MAX_FILES)
            .map(|i| upload(&format!("{i}.png"), "image/png", 1))
            .collect();

        let error = service.upload_many(uploads).await.unwrap_err();

        assert_eq!(error.kind(), ServiceErrorKind::BadRequest);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
