use crate::persistence::ImageRef;
use base64::Engine;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ImageError {
    #[error("image must be a data:image/<type>;base64 URL")]
    MalformedDataUrl,
    #[error("image data is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("refusing image name {0:?}: not a plain file name")]
    UnsafeName(String),
    #[error("failed to access image {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Image files referenced by listings, stored flat in one directory under
/// random names.
pub(crate) struct ImageRepository {
    dir: PathBuf,
}

impl ImageRepository {
    pub(crate) async fn open(dir: impl Into<PathBuf>) -> Result<Self, ImageError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| ImageError::Io {
                path: dir.clone(),
                source,
            })?;
        Ok(Self { dir })
    }

    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `bytes` as `<uuid>.<extension>` (no extension when empty) and
    /// returns the file name.
    pub(crate) async fn save_bytes(
        &self,
        extension: &str,
        bytes: &[u8],
    ) -> Result<String, ImageError> {
        let id = Uuid::new_v4();
        let filename = if extension.is_empty() {
            id.to_string()
        } else {
            format!("{id}.{extension}")
        };

        let path = self.dir.join(&filename);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| ImageError::Io { path, source })?;
        Ok(filename)
    }

    /// Decodes an inline `data:image/<type>;base64,<data>` image to disk.
    pub(crate) async fn save_data_url(&self, data_url: &str) -> Result<String, ImageError> {
        let (extension, payload) = parse_data_url(data_url)?;
        let bytes = base64::engine::general_purpose::STANDARD.decode(payload)?;
        self.save_bytes(&extension, &bytes).await
    }

    /// Removes a local image. External URLs and inline data are ignored and a
    /// file that is already gone is not an error. Returns whether a file was
    /// removed.
    pub(crate) async fn delete(&self, reference: &str) -> Result<bool, ImageError> {
        let name = match ImageRef::classify(reference) {
            Some(ImageRef::Local(name)) => name,
            Some(ImageRef::External(url)) => {
                tracing::debug!(url, "leaving external image alone");
                return Ok(false);
            }
            Some(ImageRef::Inline(_)) | None => return Ok(false),
        };

        let path = self.local_path(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(ImageError::Io { path, source }),
        }
    }

    fn local_path(&self, name: &str) -> Result<PathBuf, ImageError> {
        let plain = !name.contains(['/', '\\']) && name != "." && name != "..";
        if !plain {
            return Err(ImageError::UnsafeName(name.to_string()));
        }
        Ok(self.dir.join(name))
    }
}

/// Splits a data URL into the file extension to store it under and its
/// base64 payload. `jpeg` is stored as `jpg`.
fn parse_data_url(data_url: &str) -> Result<(String, &str), ImageError> {
    let rest = data_url
        .trim()
        .strip_prefix("data:image/")
        .ok_or(ImageError::MalformedDataUrl)?;
    let (subtype, payload) = rest
        .split_once(";base64,")
        .ok_or(ImageError::MalformedDataUrl)?;

    let valid_subtype = !subtype.is_empty()
        && subtype
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid_subtype || payload.is_empty() {
        return Err(ImageError::MalformedDataUrl);
    }

    let extension = match subtype.to_ascii_lowercase().as_str() {
        "jpeg" => "jpg".to_string(),
        other => other.to_string(),
    };
    Ok((extension, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    // PNG signature bytes.
    const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgo=";

    #[test]
    fn parses_data_urls() {
        let (extension, payload) = parse_data_url("data:image/jpeg;base64,AAAA").unwrap();
        assert_eq!(extension, "jpg");
        assert_eq!(payload, "AAAA");

        for bad in [
            "data:text/plain;base64,AAAA",
            "data:image/png,AAAA",
            "data:image/svg+xml;base64,AAAA",
            "data:image/png;base64,",
        ] {
            assert!(
                matches!(parse_data_url(bad), Err(ImageError::MalformedDataUrl)),
                "{bad} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn data_url_becomes_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let images = ImageRepository::open(dir.path().join("uploads")).await.unwrap();

        let filename = images.save_data_url(PNG_DATA_URL).await.unwrap();

        assert!(filename.ends_with(".png"));
        let bytes = std::fs::read(images.dir().join(&filename)).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[tokio::test]
    async fn invalid_base64_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let images = ImageRepository::open(dir.path()).await.unwrap();

        let result = images.save_data_url("data:image/png;base64,@@not-base64@@").await;

        assert!(matches!(result, Err(ImageError::InvalidBase64(_))));
    }

    #[tokio::test]
    async fn delete_only_touches_local_files() {
        let dir = tempfile::tempdir().unwrap();
        let images = ImageRepository::open(dir.path()).await.unwrap();
        let filename = images.save_bytes("webp", b"RIFF").await.unwrap();

        assert!(images.delete(&filename).await.unwrap());
        assert!(!images.dir().join(&filename).exists());
        assert!(!images.delete(&filename).await.unwrap());
        assert!(!images.delete("https://cdn.example/a.jpg").await.unwrap());
        assert!(!images.delete(PNG_DATA_URL).await.unwrap());
        assert!(!images.delete("").await.unwrap());
    }

    #[tokio::test]
    async fn delete_refuses_paths_outside_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let images = ImageRepository::open(dir.path().join("uploads")).await.unwrap();
        std::fs::write(dir.path().join("properties.json"), "[]").unwrap();

        let result = images.delete("../properties.json").await;

        assert!(matches!(result, Err(ImageError::UnsafeName(_))));
        assert!(dir.path().join("properties.json").exists());
    }
}
