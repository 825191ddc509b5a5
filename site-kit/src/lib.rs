//! Browser-independent pieces of the client sites.
//!
//! The sites themselves are static HTML; what lives here is the logic that
//! does not depend on a DOM: accent-insensitive search, catalog and listing
//! filters, `wa.me` links, contact form checks and carousel arithmetic.

pub mod carousel;
pub mod catalog;
pub mod contact;
pub mod listing;
pub mod text;
pub mod whatsapp;

pub use carousel::Carousel;
pub use catalog::{CatalogFilter, Product, filter_products};
pub use contact::{ContactField, ContactForm, FieldError, is_valid_email};
pub use listing::{Listing, ListingFilter, filter_listings, format_price};
pub use text::{escape_html, normalize_text};
pub use whatsapp::{WhatsAppError, WhatsAppLink, encode_uri_component};
