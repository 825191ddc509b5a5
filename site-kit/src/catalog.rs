//! Product catalog search for the building-materials site.
//!
//! Products come from a static `products.json` with Spanish keys. Search is
//! accent- and case-insensitive and looks at every descriptive field.

use crate::text::normalize_text;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "codigo", default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(rename = "medida", default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(rename = "categoria")]
    pub category: String,
    #[serde(rename = "subcategoria", default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(rename = "imagen", default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Product {
    fn searchable_fields(&self) -> impl Iterator<Item = &str> {
        [
            Some(self.name.as_str()),
            self.code.as_deref(),
            self.size.as_deref(),
            self.subcategory.as_deref(),
            Some(self.category.as_str()),
        ]
        .into_iter()
        .flatten()
        .filter(|field| !field.is_empty())
    }
}

/// Search box plus category selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    term: String,
    category: Option<String>,
}

impl CatalogFilter {
    pub fn new(search: &str, category: Option<&str>) -> Self {
        Self {
            term: normalize_text(search),
            category: category
                .filter(|category| !category.is_empty())
                .map(str::to_string),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.term.is_empty() || self.category.is_some()
    }

    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = &self.category
            && &product.category != category
        {
            return false;
        }

        if self.term.is_empty() {
            return true;
        }

        product
            .searchable_fields()
            .any(|field| normalize_text(field).contains(&self.term))
    }
}

pub fn filter_products<'a>(products: &'a [Product], filter: &CatalogFilter) -> Vec<&'a Product> {
    products
        .iter()
        .filter(|product| filter.matches(product))
        .collect()
}

/// Distinct categories in alphabetical order, for the category selector.
pub fn categories(products: &[Product]) -> Vec<String> {
    products
        .iter()
        .map(|product| product.category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn results_summary(showing: usize, total: usize) -> String {
    if showing == total {
        format!("Mostrando {total} productos")
    } else if showing == 0 {
        "No se encontraron productos".to_string()
    } else {
        format!("Mostrando {showing} de {total} productos")
    }
}

pub fn product_inquiry_message(name: &str, code: Option<&str>) -> String {
    let mut message = format!("Hola, quiero consultar por el producto: {name}");
    if let Some(code) = code.filter(|code| !code.is_empty()) {
        message.push_str(&format!(" (Código: {code})"));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Product> {
        serde_json::from_str(
            r#"[
                {"nombre": "Caño PVC", "codigo": "PVC-110", "medida": "110mm", "categoria": "Sanitarios", "subcategoria": "Cañerías"},
                {"nombre": "Ladrillo hueco", "codigo": "LH-12", "medida": "12x18x33", "categoria": "Construcción"},
                {"nombre": "Cemento portland", "categoria": "Construcción", "subcategoria": "Áridos y cementos"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn no_active_filter_returns_everything() {
        let products = catalog();
        let filter = CatalogFilter::new("   ", None);
        assert!(!filter.is_active());
        assert_eq!(filter_products(&products, &filter).len(), products.len());
    }

    #[test]
    fn unmatched_search_returns_nothing() {
        let products = catalog();
        let filter = CatalogFilter::new("pintura", None);
        assert!(filter_products(&products, &filter).is_empty());
    }

    #[test]
    fn search_ignores_accents_and_checks_all_fields() {
        let products = catalog();

        let by_subcategory = filter_products(&products, &CatalogFilter::new("CANERIAS", None));
        assert_eq!(by_subcategory.len(), 1);
        assert_eq!(by_subcategory[0].name, "Caño PVC");

        let by_code = filter_products(&products, &CatalogFilter::new("lh-12", None));
        assert_eq!(by_code[0].name, "Ladrillo hueco");

        let by_category = filter_products(&products, &CatalogFilter::new("construccion", None));
        assert_eq!(by_category.len(), 2);
    }

    #[test]
    fn category_and_search_combine() {
        let products = catalog();
        let filter = CatalogFilter::new("cemento", Some("Construcción"));
        assert_eq!(filter_products(&products, &filter).len(), 1);

        let filter = CatalogFilter::new("cemento", Some("Sanitarios"));
        assert!(filter_products(&products, &filter).is_empty());
    }

    #[test]
    fn categories_are_unique_and_sorted() {
        assert_eq!(categories(&catalog()), vec!["Construcción", "Sanitarios"]);
    }

    #[test]
    fn summary_wording() {
        assert_eq!(results_summary(3, 3), "Mostrando 3 productos");
        assert_eq!(results_summary(1, 3), "Mostrando 1 de 3 productos");
        assert_eq!(results_summary(0, 3), "No se encontraron productos");
    }

    #[test]
    fn inquiry_message_mentions_code_when_known() {
        assert_eq!(
            product_inquiry_message("Caño PVC", Some("PVC-110")),
            "Hola, quiero consultar por el producto: Caño PVC (Código: PVC-110)"
        );
        assert_eq!(
            product_inquiry_message("Arena", None),
            "Hola, quiero consultar por el producto: Arena"
        );
    }
}
