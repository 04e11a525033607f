// 🏷️ Category Catalog - ordered, unique, append-only
//
// Category names are compared exactly (case-sensitive). Insertion order is
// the display order and never changes; nothing is ever removed.

use serde::{Deserialize, Serialize};

/// Categories every fresh process starts with
pub const DEFAULT_CATEGORIES: [&str; 5] = ["Groceries", "Transportation", "Shopping", "Utilities", "Other"];

/// Fallback category for anything no rule recognises
pub const FALLBACK_CATEGORY: &str = "Other";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryCatalog {
    names: Vec<String>,
}

impl CategoryCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        CategoryCatalog { names: Vec::new() }
    }

    /// Create a catalog pre-loaded with `DEFAULT_CATEGORIES`
    pub fn with_defaults() -> Self {
        Self::from_names(DEFAULT_CATEGORIES)
    }

    /// Build from a list of names, dropping duplicates (first occurrence wins)
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut catalog = CategoryCatalog::new();
        for name in names {
            catalog.ensure(name);
        }
        catalog
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Append `name` if it is not already present.
    ///
    /// Returns `true` when the catalog grew.
    pub fn ensure(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.names.push(name);
        true
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of a category in display order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_in_order() {
        let catalog = CategoryCatalog::with_defaults();
        assert_eq!(
            catalog.names(),
            &["Groceries", "Transportation", "Shopping", "Utilities", "Other"]
        );
    }

    #[test]
    fn test_ensure_appends_once_at_end() {
        let mut catalog = CategoryCatalog::with_defaults();

        assert!(catalog.ensure("Pharmacy"));
        assert!(!catalog.ensure("Pharmacy"));

        assert_eq!(catalog.len(), 6);
        assert_eq!(catalog.position("Pharmacy"), Some(5));
    }

    #[test]
    fn test_contains_is_case_sensitive() {
        let catalog = CategoryCatalog::with_defaults();
        assert!(catalog.contains("Groceries"));
        assert!(!catalog.contains("GROCERIES"));
        assert!(!catalog.contains(" Groceries"));
    }

    #[test]
    fn test_from_names_dedups() {
        let catalog = CategoryCatalog::from_names(["Food", "Rent", "Food"]);
        assert_eq!(catalog.names(), &["Food", "Rent"]);
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let catalog = CategoryCatalog::from_names(["Food", "Rent"]);
        assert_eq!(serde_json::to_string(&catalog).unwrap(), r#"["Food","Rent"]"#);
    }
}
