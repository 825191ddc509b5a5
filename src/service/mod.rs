pub(crate) mod error;
pub(crate) mod property_service;
pub(crate) mod upload_service;
