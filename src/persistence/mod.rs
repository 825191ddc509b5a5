mod property;

pub(crate) use crate::persistence::property::{ImageRef, Model as Property};
