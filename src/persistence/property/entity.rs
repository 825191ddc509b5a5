use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use site_kit::Listing;

/// One listing as stored in `properties.json`.
///
/// Only the id and the image references have a fixed shape. Everything else
/// the admin form sends (title, price, location, features, ...) is kept as
/// given in `attributes` and read leniently through [`Listing`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Model {
    pub(crate) id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) cover_image: Option<String>,
    #[serde(default)]
    pub(crate) images: Vec<String>,
    #[serde(flatten)]
    pub(crate) attributes: Map<String, Value>,
}

impl Model {
    /// Every image reference the listing holds, cover first.
    pub(crate) fn image_refs(&self) -> impl Iterator<Item = &str> {
        self.cover_image
            .as_deref()
            .into_iter()
            .chain(self.images.iter().map(String::as_str))
    }

    /// A top-level attribute, when it is a string.
    pub(crate) fn text(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    fn location_text(&self, key: &str) -> Option<&str> {
        self.attributes
            .get("location")
            .and_then(|location| location.get(key))
            .and_then(Value::as_str)
    }
}

impl Listing for Model {
    fn operation(&self) -> Option<&str> {
        self.text("operation")
    }

    fn property_type(&self) -> Option<&str> {
        self.text("type")
    }

    fn neighborhood(&self) -> Option<&str> {
        self.location_text("neighborhood")
    }

    /// Numbers, or strings holding a number (`"150000"`). Anything else,
    /// such as `"consultar"`, counts as unpriced.
    fn price(&self) -> Option<f64> {
        let price: Option<f64> = match self.attributes.get("price")? {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        };
        price.filter(|price| price.is_finite())
    }

    fn search_text(&self) -> Vec<&str> {
        [
            self.text("title"),
            self.location_text("address"),
            self.location_text("neighborhood"),
            self.location_text("city"),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Where an image reference points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ImageRef<'a> {
    /// `data:image/...;base64,...` sent by the admin form, not yet on disk.
    Inline(&'a str),
    /// Hosted elsewhere (`http://`, `https://`); never touched.
    External(&'a str),
    /// File name inside the uploads directory.
    Local(&'a str),
}

impl<'a> ImageRef<'a> {
    pub(crate) fn classify(reference: &'a str) -> Option<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            None
        } else if reference.starts_with("data:") {
            Some(Self::Inline(reference))
        } else if reference.starts_with("http") {
            Some(Self::External(reference))
        } else {
            Some(Self::Local(reference))
        }
    }
}
