mod entity;

pub(crate) use entity::{ImageRef, Model};
