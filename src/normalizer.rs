// 🧮 Receipt Normalizer
// Raw receipt lines → categorized, priced records ready to become expenses
//
// Two entry points share one tail (`assign_categories`):
// - keyword path: `normalize` / `normalize_with`, never fails
// - text-generation path: `parse_extraction` + `normalize_extraction`,
//   fails closed on anything that is not the expected JSON shape

use crate::catalog::{CategoryCatalog, FALLBACK_CATEGORY};
use crate::error::{AppError, AppResult};
use crate::models::{number_or_zero, NormalizedItem, ReceiptItem};
use crate::rules::RuleEngine;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// KEYWORD PATH
// ============================================================================

/// Categorize and price receipt items with the default keyword table.
///
/// New categories are appended to `catalog`. Output order matches input order.
pub fn normalize(items: &[ReceiptItem], catalog: &mut CategoryCatalog) -> Vec<NormalizedItem> {
    normalize_with(items, catalog, &RuleEngine::receipt_defaults())
}

/// Same as `normalize`, with a caller-supplied rule table.
pub fn normalize_with(
    items: &[ReceiptItem],
    catalog: &mut CategoryCatalog,
    engine: &RuleEngine,
) -> Vec<NormalizedItem> {
    let categories = items
        .iter()
        .map(|item| engine.classify(&item.description).to_string())
        .collect();
    assign_categories(items, categories, catalog)
}

/// Attach one category per item, grow the catalog, compute line totals.
///
/// `categories` must have the same length as `items`; classifiers guarantee
/// this before calling. Extra entries on either side are ignored.
pub fn assign_categories(
    items: &[ReceiptItem],
    categories: Vec<String>,
    catalog: &mut CategoryCatalog,
) -> Vec<NormalizedItem> {
    debug_assert_eq!(items.len(), categories.len());

    items
        .iter()
        .zip(categories)
        .map(|(item, category)| {
            if catalog.ensure(category.clone()) {
                tracing::info!(category = %category, "new category discovered");
            }

            NormalizedItem {
                date: item.date.clone(),
                description: item.description.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                price: item.quantity * item.unit_price,
                category,
            }
        })
        .collect()
}

// ============================================================================
// TEXT-GENERATION PATH
// ============================================================================

/// One line of a text-generation extraction. `amount` is the unit price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedItem {
    pub category: String,
    pub description: String,
    pub quantity: f64,
    pub amount: f64,
}

/// Validated `{ items: [...], total_amount }` reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extraction {
    pub items: Vec<ExtractedItem>,
    pub total_amount: Option<f64>,
}

impl Extraction {
    /// Sum of `quantity * amount` over all items
    pub fn computed_total(&self) -> f64 {
        self.items.iter().map(|i| i.quantity * i.amount).sum()
    }
}

/// Remove a surrounding triple-backtick fence (with optional language tag).
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        text = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }

    text.trim()
}

/// Parse and validate a text-generation reply.
///
/// The whole reply is validated before anything is returned, so a bad item
/// anywhere rejects the reply as a unit.
pub fn parse_extraction(raw: &str) -> AppResult<Extraction> {
    let body = strip_code_fences(raw);

    let value: Value = serde_json::from_str(body)
        .map_err(|e| AppError::malformed(format!("reply is not valid JSON: {}", e)))?;

    let object = value
        .as_object()
        .ok_or_else(|| AppError::malformed("reply is not a JSON object"))?;

    let raw_items = object
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::malformed("reply has no 'items' array"))?;

    let items = raw_items
        .iter()
        .enumerate()
        .map(|(index, raw_item)| parse_extracted_item(index, raw_item))
        .collect::<AppResult<Vec<_>>>()?;

    let total_amount = match object.get("total_amount") {
        None | Some(Value::Null) => None,
        Some(v) => Some(number_or_zero(v)),
    };

    Ok(Extraction { items, total_amount })
}

fn parse_extracted_item(index: usize, value: &Value) -> AppResult<ExtractedItem> {
    let fields = value
        .as_object()
        .ok_or_else(|| AppError::malformed(format!("item {} is not an object", index)))?;

    let text = |key: &str| {
        fields
            .get(key)
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };

    let category = match text("category") {
        c if c.is_empty() => FALLBACK_CATEGORY.to_string(),
        c => c,
    };

    // A line without a quantity is a single unit
    let quantity = match fields.get("quantity") {
        None | Some(Value::Null) => 1.0,
        Some(v) => number_or_zero(v),
    };

    Ok(ExtractedItem {
        category,
        description: text("description"),
        quantity,
        amount: fields.get("amount").map(number_or_zero).unwrap_or(0.0),
    })
}

/// Turn a validated extraction into normalized items dated `date`.
pub fn normalize_extraction(
    extraction: &Extraction,
    date: &str,
    catalog: &mut CategoryCatalog,
) -> Vec<NormalizedItem> {
    let items: Vec<ReceiptItem> = extraction
        .items
        .iter()
        .map(|e| ReceiptItem::new(date, &e.description, e.quantity, e.amount))
        .collect();
    let categories = extraction.items.iter().map(|e| e.category.clone()).collect();

    assign_categories(&items, categories, catalog)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_milk_example() {
        let mut catalog = CategoryCatalog::with_defaults();
        let items = vec![ReceiptItem::new("2025-01-01", "Milk", 2.0, 1.5)];

        let out = normalize(&items, &mut catalog);

        assert_eq!(
            out,
            vec![NormalizedItem {
                date: "2025-01-01".to_string(),
                description: "Milk".to_string(),
                quantity: 2.0,
                unit_price: 1.5,
                price: 3.0,
                category: "Groceries".to_string(),
            }]
        );
        assert_eq!(catalog, CategoryCatalog::with_defaults());
    }

    #[test]
    fn test_normalize_empty_input() {
        let mut catalog = CategoryCatalog::from_names(["Food"]);
        let out = normalize(&[], &mut catalog);

        assert!(out.is_empty());
        assert_eq!(catalog.names(), &["Food"]);
    }

    #[test]
    fn test_normalize_preserves_order_and_prices() {
        let mut catalog = CategoryCatalog::with_defaults();
        let items = vec![
            ReceiptItem::new("2025-01-01", "Shirt", 3.0, 7.25),
            ReceiptItem::new("2025-01-01", "Bus fare", 2.0, 0.5),
            ReceiptItem::new("2025-01-01", "Lamp", 1.0, 20.0),
            ReceiptItem::new("2025-01-01", "Cereal", 0.0, 4.0),
        ];

        let out = normalize(&items, &mut catalog);

        let summary: Vec<(&str, f64, &str)> = out
            .iter()
            .map(|n| (n.description.as_str(), n.price, n.category.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Shirt", 21.75, "Shopping"),
                ("Bus fare", 1.0, "Transportation"),
                ("Lamp", 20.0, "Other"),
                ("Cereal", 0.0, "Groceries"),
            ]
        );
        for (item, normalized) in items.iter().zip(&out) {
            assert_eq!(normalized.price, item.quantity * item.unit_price);
        }
    }

    #[test]
    fn test_new_category_appended_once() {
        // Catalog without "Other": the first unmatched item adds it, the second doesn't
        let mut catalog = CategoryCatalog::from_names(["Groceries"]);
        let items = vec![
            ReceiptItem::new("2025-01-01", "Lamp", 1.0, 20.0),
            ReceiptItem::new("2025-01-01", "Chair", 1.0, 45.0),
            ReceiptItem::new("2025-01-01", "Milk", 1.0, 1.0),
        ];

        normalize(&items, &mut catalog);
        normalize(&items, &mut catalog);

        assert_eq!(catalog.names(), &["Groceries", "Other"]);
    }

    #[test]
    fn test_every_category_in_catalog_after_normalize() {
        let mut catalog = CategoryCatalog::new();
        let items = vec![
            ReceiptItem::new("2025-01-01", "taxi", 1.0, 9.0),
            ReceiptItem::new("2025-01-01", "tv", 1.0, 300.0),
        ];

        let out = normalize(&items, &mut catalog);
        for item in &out {
            assert!(catalog.contains(&item.category));
        }
        assert_eq!(catalog.names(), &["Transportation", "Shopping"]);
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_extraction_fenced() {
        let raw = "```json\n{\n  \"items\": [\n    {\"category\": \"Groceries\", \"description\": \"Milk\", \"quantity\": 2, \"amount\": 1.5},\n    {\"category\": \"Pharmacy\", \"description\": \"Aspirin\", \"amount\": \"4.00\"}\n  ],\n  \"total_amount\": 7.0\n}\n```";

        let extraction = parse_extraction(raw).unwrap();

        assert_eq!(extraction.items.len(), 2);
        assert_eq!(extraction.items[0].quantity, 2.0);
        assert_eq!(extraction.items[1].quantity, 1.0);
        assert_eq!(extraction.items[1].amount, 4.0);
        assert_eq!(extraction.total_amount, Some(7.0));
        assert_eq!(extraction.computed_total(), 7.0);
    }

    #[test]
    fn test_parse_extraction_rejects_bad_shapes() {
        let cases = [
            "I could not read this receipt.",
            "[1, 2, 3]",
            "{\"total_amount\": 3}",
            "{\"items\": \"Milk\"}",
            "{\"items\": [{\"description\": \"Milk\"}, 42]}",
        ];

        for raw in cases {
            let err = parse_extraction(raw).unwrap_err();
            assert!(
                matches!(err, AppError::MalformedExternalResponse(_)),
                "expected malformed for {:?}, got {:?}",
                raw,
                err
            );
        }
    }

    #[test]
    fn test_parse_extraction_blank_category_falls_back() {
        let extraction =
            parse_extraction(r#"{"items": [{"category": "  ", "description": "Lamp", "quantity": 1, "amount": 20}]}"#)
                .unwrap();
        assert_eq!(extraction.items[0].category, "Other");
        assert_eq!(extraction.total_amount, None);
    }

    #[test]
    fn test_normalize_extraction_grows_catalog() {
        let mut catalog = CategoryCatalog::with_defaults();
        let extraction = parse_extraction(
            r#"{"items": [
                {"category": "Pharmacy", "description": "Aspirin", "quantity": 2, "amount": 3.5},
                {"category": "Groceries", "description": "Bread", "quantity": 1, "amount": 2}
            ], "total_amount": 9}"#,
        )
        .unwrap();

        let out = normalize_extraction(&extraction, "2025-02-01", &mut catalog);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].price, 7.0);
        assert_eq!(out[0].date, "2025-02-01");
        assert_eq!(out[1].category, "Groceries");
        assert_eq!(catalog.names().last().map(String::as_str), Some("Pharmacy"));
        assert_eq!(catalog.len(), 6);
    }
}
