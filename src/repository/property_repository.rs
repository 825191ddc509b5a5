use crate::persistence::Property;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub(crate) enum StoreError {
    #[error("failed to access property store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("property store {path} is not a JSON array of properties: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode properties: {0}")]
    Encode(#[source] serde_json::Error),
}

/// The whole store is one pretty-printed JSON array, newest listing first.
pub(crate) struct PropertyRepository {
    path: PathBuf,
}

impl PropertyRepository {
    /// Opens the store at `path`, creating the directory and an empty array
    /// file when they do not exist yet.
    pub(crate) async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let io_error = |source: io::Error| StoreError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }

        if !tokio::fs::try_exists(&path).await.map_err(io_error)? {
            tokio::fs::write(&path, b"[]").await.map_err(io_error)?;
        }

        Ok(Self { path })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) async fn load(&self) -> Result<Vec<Property>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Replaces the file contents. Writes a sibling temp file first and
    /// renames it over the store so readers never see a half-written array.
    pub(crate) async fn save(&self, properties: &[Property]) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec_pretty(properties).map_err(StoreError::Encode)?;

        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        let io_error = |source: io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        tokio::fs::write(&staging, &encoded)
            .await
            .map_err(io_error)?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(io_error)
    }
}

/// `1` for an empty store, otherwise one past the highest id. `None` once
/// the highest id is `u64::MAX`.
pub(crate) fn next_id(properties: &[Property]) -> Option<u64> {
    match properties.iter().map(|property| property.id).max() {
        Some(max) => max.checked_add(1),
        None => Some(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn property(id: u64) -> Property {
        serde_json::from_value(json!({"id": id, "title": format!("Listing {id}")})).unwrap()
    }

    #[test]
    fn next_id_starts_at_one_and_follows_the_max() {
        assert_eq!(next_id(&[]), Some(1));
        assert_eq!(next_id(&[property(3), property(9), property(4)]), Some(10));
    }

    #[test]
    fn next_id_stops_at_the_largest_id() {
        assert_eq!(next_id(&[property(1), property(u64::MAX)]), None);
    }

    #[tokio::test]
    async fn open_creates_an_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("properties.json");

        let repository = PropertyRepository::open(&path).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
        assert!(repository.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_then_load_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let repository = PropertyRepository::open(dir.path().join("properties.json"))
            .await
            .unwrap();

        repository
            .save(&[property(2), property(1)])
            .await
            .unwrap();

        let ids: Vec<u64> = repository
            .load()
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![2, 1]);
        assert!(!dir.path().join("properties.json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error_not_an_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("properties.json");
        std::fs::write(&path, "{not json").unwrap();

        let repository = PropertyRepository::open(&path).await.unwrap();

        assert!(matches!(
            repository.load().await,
            Err(StoreError::Corrupt { .. })
        ));
    }
}
