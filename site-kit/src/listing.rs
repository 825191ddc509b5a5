//! Real-estate listing filters and price display.

use crate::text::normalize_text;
use serde::{Deserialize, Deserializer, de};
use std::{fmt, str::FromStr};

/// Value the search tabs and type selector use for "no constraint".
pub const ANY: &str = "todos";

/// Read access to the attributes listing searches look at.
pub trait Listing {
    fn operation(&self) -> Option<&str>;
    fn property_type(&self) -> Option<&str>;
    fn neighborhood(&self) -> Option<&str>;
    fn price(&self) -> Option<f64>;
    /// Free text matched by the `q` parameter (title, address, ...).
    fn search_text(&self) -> Vec<&str>;
}

/// Search form state. Blank values, and `todos` for operation and type,
/// mean the criterion is not applied.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingFilter {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub operation: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "blank_as_none")]
    pub property_type: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub neighborhood: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub min_price: Option<f64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub max_price: Option<f64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub q: Option<String>,
}

fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text.parse().map(Some).map_err(de::Error::custom),
    }
}

fn constrained(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| *value != ANY)
}

impl ListingFilter {
    pub fn is_empty(&self) -> bool {
        constrained(&self.operation).is_none()
            && constrained(&self.property_type).is_none()
            && self.neighborhood.is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
            && self.q.as_deref().is_none_or(|q| normalize_text(q).is_empty())
    }

    pub fn matches<L: Listing + ?Sized>(&self, listing: &L) -> bool {
        if let Some(operation) = constrained(&self.operation)
            && listing.operation() != Some(operation)
        {
            return false;
        }

        if let Some(property_type) = constrained(&self.property_type)
            && listing.property_type() != Some(property_type)
        {
            return false;
        }

        if let Some(neighborhood) = self.neighborhood.as_deref()
            && listing.neighborhood() != Some(neighborhood)
        {
            return false;
        }

        // Unpriced listings ("consultar") never satisfy a price bound.
        if self.min_price.is_some() || self.max_price.is_some() {
            let Some(price) = listing.price() else {
                return false;
            };
            if self.min_price.is_some_and(|min| price < min) {
                return false;
            }
            if self.max_price.is_some_and(|max| price > max) {
                return false;
            }
        }

        if let Some(q) = self.q.as_deref() {
            let term = normalize_text(q);
            if !term.is_empty()
                && !listing
                    .search_text()
                    .iter()
                    .any(|text| normalize_text(text).contains(&term))
            {
                return false;
            }
        }

        true
    }
}

pub fn filter_listings<'a, L: Listing>(listings: &'a [L], filter: &ListingFilter) -> Vec<&'a L> {
    listings
        .iter()
        .filter(|listing| filter.matches(*listing))
        .collect()
}

/// Formats a price the way the listing cards show it: `USD 150.000` for
/// dollars, `$ 85.000` for pesos. Rounded to whole units.
pub fn format_price(price: f64, currency: Option<&str>) -> String {
    let rounded = price.round() as i64;
    let digits = rounded.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }
    if rounded < 0 {
        grouped.insert(0, '-');
    }

    match currency {
        Some(code) if code.eq_ignore_ascii_case("USD") => format!("USD {grouped}"),
        _ => format!("$ {grouped}"),
    }
}
