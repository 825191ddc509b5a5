use crate::persistence::{ImageRef, Property};
use crate::repository::image_repository::ImageRepository;
use crate::repository::property_repository::{PropertyRepository, next_id};
use crate::service::error::{ServiceError, map_image_error, map_store_error};
use chrono::Utc;
use serde_json::{Map, Value};
use site_kit::ListingFilter;
use std::{collections::HashSet, sync::Arc};
use tokio::sync::Mutex;

const NOT_FOUND: &str = "Property not found";

/// Keys the server owns; clients cannot set them.
const SERVER_FIELDS: [&str; 2] = ["id", "createdAt"];

#[derive(Clone)]
pub(crate) struct PropertyService {
    store: Arc<PropertyRepository>,
    images: Arc<ImageRepository>,
    // Held across each load/save cycle so concurrent writers cannot drop
    // each other's changes.
    lock: Arc<Mutex<()>>,
}

impl PropertyService {
    pub(crate) fn new(store: Arc<PropertyRepository>, images: Arc<ImageRepository>) -> Self {
        Self {
            store,
            images,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub(crate) async fn list(&self, filter: &ListingFilter) -> Result<Vec<Property>, ServiceError> {
        let _guard = self.lock.lock().await;
        let mut properties = self.store.load().await.map_err(map_store_error)?;
        if !filter.is_empty() {
            properties.retain(|property| filter.matches(property));
        }
        Ok(properties)
    }

    pub(crate) async fn get(&self, id: u64) -> Result<Property, ServiceError> {
        let _guard = self.lock.lock().await;
        self.store
            .load()
            .await
            .map_err(map_store_error)?
            .into_iter()
            .find(|property| property.id == id)
            .ok_or_else(|| ServiceError::not_found(NOT_FOUND))
    }

    pub(crate) async fn create(&self, payload: Value) -> Result<Property, ServiceError> {
        let fields = client_fields(payload)?;
        let _guard = self.lock.lock().await;

        let mut written = Vec::new();
        match self.insert(fields, &mut written).await {
            Ok(property) => {
                tracing::info!(id = property.id, images = written.len(), "property created");
                Ok(property)
            }
            Err(error) => {
                self.discard(&written).await;
                Err(error)
            }
        }
    }

    pub(crate) async fn update(&self, id: u64, payload: Value) -> Result<Property, ServiceError> {
        let fields = client_fields(payload)?;
        let _guard = self.lock.lock().await;

        let mut written = Vec::new();
        match self.replace(id, fields, &mut written).await {
            Ok((property, obsolete)) => {
                self.discard(&obsolete).await;
                tracing::info!(
                    id,
                    added = written.len(),
                    removed = obsolete.len(),
                    "property updated"
                );
                Ok(property)
            }
            Err(error) => {
                self.discard(&written).await;
                Err(error)
            }
        }
    }

    pub(crate) async fn delete(&self, id: u64) -> Result<(), ServiceError> {
        let _guard = self.lock.lock().await;

        let mut properties = self.store.load().await.map_err(map_store_error)?;
        let index = position(&properties, id)?;
        let removed = properties.remove(index);
        self.store
            .save(&properties)
            .await
            .map_err(map_store_error)?;

        let files: Vec<String> = removed.image_refs().map(str::to_string).collect();
        self.discard(&files).await;
        tracing::info!(id, "property deleted");
        Ok(())
    }

    async fn insert(
        &self,
        mut fields: Map<String, Value>,
        written: &mut Vec<String>,
    ) -> Result<Property, ServiceError> {
        let mut properties = self.store.load().await.map_err(map_store_error)?;

        self.store_inline_images(&mut fields, written).await?;
        let id = next_id(&properties).ok_or_else(|| {
            tracing::error!("property ids exhausted");
            ServiceError::internal("No property ids left")
        })?;
        fields.insert("id".to_string(), Value::from(id));
        fields.insert(
            "createdAt".to_string(),
            Value::String(Utc::now().date_naive().to_string()),
        );

        let property = into_property(fields)?;
        properties.insert(0, property.clone());
        self.store
            .save(&properties)
            .await
            .map_err(map_store_error)?;
        Ok(property)
    }

    /// Returns the merged record and the local files it no longer uses.
    async fn replace(
        &self,
        id: u64,
        mut fields: Map<String, Value>,
        written: &mut Vec<String>,
    ) -> Result<(Property, Vec<String>), ServiceError> {
        let mut properties = self.store.load().await.map_err(map_store_error)?;
        let index = position(&properties, id)?;
        let current = &properties[index];

        let mut obsolete = Vec::new();
        if let Some(cover) = fields.get("coverImage")
            && cover.as_str() != current.cover_image.as_deref()
        {
            obsolete.extend(current.cover_image.clone());
        }
        if let Some(Value::Array(entries)) = fields.get("images") {
            let kept: HashSet<&str> = entries.iter().filter_map(Value::as_str).collect();
            obsolete.extend(
                current
                    .images
                    .iter()
                    .filter(|image| !kept.contains(image.as_str()))
                    .cloned(),
            );
        }

        self.store_inline_images(&mut fields, written).await?;

        let mut merged = match serde_json::to_value(current) {
            Ok(Value::Object(merged)) => merged,
            Ok(_) => return Err(ServiceError::internal("Failed to update property")),
            Err(error) => {
                tracing::error!(error = %error, id, "failed to encode stored property");
                return Err(ServiceError::internal("Failed to update property"));
            }
        };
        merged.extend(fields);
        let updated = into_property(merged)?;

        // A file can move from the gallery to the cover or back.
        obsolete.retain(|old| !updated.image_refs().any(|reference| reference == old));

        properties[index] = updated.clone();
        self.store
            .save(&properties)
            .await
            .map_err(map_store_error)?;
        Ok((updated, obsolete))
    }

    /// Writes `data:` images in `coverImage` and `images` to disk and puts
    /// their file names in their place. Blank and null gallery entries are
    /// dropped.
    async fn store_inline_images(
        &self,
        fields: &mut Map<String, Value>,
        written: &mut Vec<String>,
    ) -> Result<(), ServiceError> {
        if let Some(Value::String(cover)) = fields.get_mut("coverImage")
            && let Some(ImageRef::Inline(data_url)) = ImageRef::classify(cover.as_str())
        {
            let filename = self
                .images
                .save_data_url(data_url)
                .await
                .map_err(map_image_error)?;
            written.push(filename.clone());
            *cover = filename;
        }

        match fields.get_mut("images") {
            Some(Value::Array(entries)) => {
                let mut kept = Vec::with_capacity(entries.len());
                for entry in std::mem::take(entries) {
                    let reference = match entry {
                        Value::String(reference) => reference,
                        Value::Null => continue,
                        // Left for deserialization to reject.
                        other => {
                            kept.push(other);
                            continue;
                        }
                    };

                    let stored = match ImageRef::classify(&reference) {
                        None => continue,
                        Some(ImageRef::Inline(data_url)) => Some(
                            self.images
                                .save_data_url(data_url)
                                .await
                                .map_err(map_image_error)?,
                        ),
                        Some(_) => None,
                    };

                    match stored {
                        Some(filename) => {
                            written.push(filename.clone());
                            kept.push(Value::String(filename));
                        }
                        None => kept.push(Value::String(reference)),
                    }
                }
                *entries = kept;
            }
            Some(images) if images.is_null() => *images = Value::Array(Vec::new()),
            _ => {}
        }

        Ok(())
    }

    /// Best-effort removal; the record change already happened.
    async fn discard(&self, references: &[String]) {
        for reference in references {
            if let Err(error) = self.images.delete(reference).await {
                tracing::warn!(error = %error, reference = %reference, "failed to remove image file");
            }
        }
    }
}

fn client_fields(payload: Value) -> Result<Map<String, Value>, ServiceError> {
    let Value::Object(mut fields) = payload else {
        return Err(ServiceError::bad_request("Property must be a JSON object"));
    };
    for key in SERVER_FIELDS {
        fields.remove(key);
    }
    Ok(fields)
}

fn into_property(fields: Map<String, Value>) -> Result<Property, ServiceError> {
    serde_json::from_value(Value::Object(fields))
        .map_err(|error| ServiceError::bad_request(format!("Invalid property: {error}")))
}

fn position(properties: &[Property], id: u64) -> Result<usize, ServiceError> {
    properties
        .iter()
        .position(|property| property.id == id)
        .ok_or_else(|| ServiceError::not_found(NOT_FOUND))
}
