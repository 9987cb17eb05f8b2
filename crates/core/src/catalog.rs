use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::domain::product::{ProductId, ProductRef};
use crate::errors::CatalogError;

/// Read access to the full product set owned by the catalog collaborator.
pub trait Catalog {
    fn products(&self) -> &[ProductRef];

    fn find(&self, id: &ProductId) -> Option<&ProductRef> {
        self.products().iter().find(|product| &product.id == id)
    }
}

impl Catalog for [ProductRef] {
    fn products(&self) -> &[ProductRef] {
        self
    }
}

impl Catalog for Vec<ProductRef> {
    fn products(&self) -> &[ProductRef] {
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StaticCatalog {
    products: Vec<ProductRef>,
}

impl StaticCatalog {
    pub fn new(products: Vec<ProductRef>) -> Self {
        Self { products }
    }

    /// Loads a JSON array of products. Product ids must be unique.
    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| CatalogError::ReadFile { path: path.to_path_buf(), source })?;
        let products: Vec<ProductRef> = serde_json::from_str(&raw)
            .map_err(|source| CatalogError::ParseFile { path: path.to_path_buf(), source })?;

        let mut seen = HashSet::with_capacity(products.len());
        for product in &products {
            if !seen.insert(product.id.as_str()) {
                return Err(CatalogError::DuplicateProduct(product.id.0.clone()));
            }
        }

        Ok(Self { products })
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl Catalog for StaticCatalog {
    fn products(&self) -> &[ProductRef] {
        &self.products
    }
}
