pub(crate) mod image_repository;
pub(crate) mod property_repository;
