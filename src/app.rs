use crate::config::ApiSettings;
use crate::handler::api_router;
use crate::repository::{image_repository::ImageRepository, property_repository::PropertyRepository};
use crate::service::{property_service::PropertyService, upload_service::UploadService};
use site_http::{AppBuilder, Server, init_logging};
use std::sync::Arc;

fn build_server(
    settings: &ApiSettings,
    properties: PropertyService,
    uploads: UploadService,
) -> Server {
    let app_builder = AppBuilder::new(settings.app_config())
        .nest("/api", api_router(properties, uploads))
        .serve_dir("/uploads", settings.uploads_dir());

    Server::new(settings.server_config(), app_builder)
}

async fn open_services(
    settings: &ApiSettings,
) -> Result<(PropertyService, UploadService), Box<dyn std::error::Error>> {
    let store = PropertyRepository::open(settings.properties_file()).await?;
    let images = Arc::new(ImageRepository::open(settings.uploads_dir()).await?);

    tracing::info!(
        store = %store.path().display(),
        uploads = %images.dir().display(),
        "Data directory ready"
    );

    Ok((
        PropertyService::new(Arc::new(store), images.clone()),
        UploadService::new(images),
    ))
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = ApiSettings::from_env()?;
    init_logging(&settings.logging_config())?;

    let (properties, uploads) = open_services(&settings).await?;
    build_server(&settings, properties, uploads).start().await
}
