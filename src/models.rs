// 🧾 Receipt & Expense Models
// Wire types shared by the normalizer, the store, the API and the CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::io::Read;
use std::path::Path;

// ============================================================================
// RECEIPT ITEM (input)
// ============================================================================

/// One purchased line extracted from a receipt.
///
/// Deserialization is permissive: every field may be missing, and the
/// numeric fields accept numbers or numeric strings. Anything else
/// decodes as `0` so the price multiplication never sees an absent value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReceiptItem {
    #[serde(default)]
    pub date: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, deserialize_with = "lenient_number")]
    pub quantity: f64,

    #[serde(default, deserialize_with = "lenient_number")]
    pub unit_price: f64,
}

impl ReceiptItem {
    pub fn new(date: &str, description: &str, quantity: f64, unit_price: f64) -> Self {
        ReceiptItem {
            date: date.to_string(),
            description: description.to_string(),
            quantity,
            unit_price,
        }
    }
}

/// Decode a JSON value as a number, falling back to `0.0`.
pub(crate) fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(number_or_zero(&value))
}

pub(crate) fn number_or_zero(value: &serde_json::Value) -> f64 {
    match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

// ============================================================================
// NORMALIZED ITEM (normalizer output)
// ============================================================================

/// A receipt item after categorization and pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedItem {
    pub date: String,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    /// Total price for the line (`quantity * unit_price`)
    pub price: f64,
    pub category: String,
}

// ============================================================================
// EXPENSE (stored record)
// ============================================================================

/// A recorded expense. `amount` is always the line total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: u64,
    pub date: String,
    pub category: String,
    pub description: String,
    pub amount: f64,
    pub quantity: f64,
}

/// A validated expense that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub date: String,
    pub category: String,
    pub description: String,
    pub amount: f64,
    pub quantity: f64,
}

impl From<&NormalizedItem> for NewExpense {
    fn from(item: &NormalizedItem) -> Self {
        NewExpense {
            date: item.date.clone(),
            category: item.category.clone(),
            description: item.description.clone(),
            amount: item.price,
            quantity: item.quantity,
        }
    }
}

impl NewExpense {
    pub fn with_id(self, id: u64) -> Expense {
        Expense {
            id,
            date: self.date,
            category: self.category,
            description: self.description,
            amount: self.amount,
            quantity: self.quantity,
        }
    }
}

// ============================================================================
// LOADERS
// ============================================================================

/// Read receipt items from CSV with a `date,description,quantity,unit_price` header.
pub fn load_receipt_items_csv<R: Read>(reader: R) -> Result<Vec<ReceiptItem>> {
    let mut rdr = csv::Reader::from_reader(reader);

    let mut items = Vec::new();
    for (index, result) in rdr.deserialize::<CsvReceiptRow>().enumerate() {
        let row = result.with_context(|| format!("Failed to deserialize receipt row {}", index + 1))?;
        items.push(row.into());
    }

    Ok(items)
}

/// Read receipt items from a `.csv` or `.json` file (JSON: array or `{"receipt_items": [...]}`).
pub fn load_receipt_items_path(path: &Path) -> Result<Vec<ReceiptItem>> {
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read receipt file: {:?}", path))?;
        return parse_receipt_items_json(&content);
    }

    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open receipt file: {:?}", path))?;
    load_receipt_items_csv(file)
}

pub fn parse_receipt_items_json(content: &str) -> Result<Vec<ReceiptItem>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Payload {
        Wrapped { receipt_items: Vec<ReceiptItem> },
        Bare(Vec<ReceiptItem>),
    }

    let payload: Payload =
        serde_json::from_str(content).context("Failed to parse receipt items JSON")?;
    Ok(match payload {
        Payload::Wrapped { receipt_items } => receipt_items,
        Payload::Bare(items) => items,
    })
}

// CSV cells are always strings, so numbers go through the same lenient path.
#[derive(Debug, Deserialize)]
struct CsvReceiptRow {
    #[serde(default)]
    date: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    quantity: String,
    #[serde(default)]
    unit_price: String,
}

impl From<CsvReceiptRow> for ReceiptItem {
    fn from(row: CsvReceiptRow) -> Self {
        ReceiptItem {
            date: row.date,
            description: row.description,
            quantity: row.quantity.trim().parse().unwrap_or(0.0),
            unit_price: row.unit_price.trim().parse().unwrap_or(0.0),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_item_missing_numbers_default_to_zero() {
        let item: ReceiptItem =
            serde_json::from_str(r#"{"date":"2025-01-01","description":"Milk"}"#).unwrap();
        assert_eq!(item.quantity, 0.0);
        assert_eq!(item.unit_price, 0.0);
    }

    #[test]
    fn test_receipt_item_lenient_numbers() {
        let item: ReceiptItem = serde_json::from_str(
            r#"{"date":"2025-01-01","description":"Bread","quantity":"3","unit_price":null}"#,
        )
        .unwrap();
        assert_eq!(item.quantity, 3.0);
        assert_eq!(item.unit_price, 0.0);

        let item: ReceiptItem =
            serde_json::from_str(r#"{"description":"Book","quantity":true,"unit_price":"abc"}"#)
                .unwrap();
        assert_eq!(item.quantity, 0.0);
        assert_eq!(item.unit_price, 0.0);
        assert_eq!(item.date, "");
    }

    #[test]
    fn test_expense_from_normalized_uses_price_as_amount() {
        let item = NormalizedItem {
            date: "2025-01-01".to_string(),
            description: "Milk".to_string(),
            quantity: 2.0,
            unit_price: 1.5,
            price: 3.0,
            category: "Groceries".to_string(),
        };

        let expense = NewExpense::from(&item).with_id(7);
        assert_eq!(expense.id, 7);
        assert_eq!(expense.amount, 3.0);
        assert_eq!(expense.quantity, 2.0);
        assert_eq!(expense.category, "Groceries");
    }

    #[test]
    fn test_load_receipt_items_csv() {
        let data = "date,description,quantity,unit_price\n\
                    2025-01-01,Milk,2,1.5\n\
                    2025-01-02,Taxi ride,1,12\n\
                    2025-01-03,Mystery,,oops\n";

        let items = load_receipt_items_csv(data.as_bytes()).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], ReceiptItem::new("2025-01-01", "Milk", 2.0, 1.5));
        assert_eq!(items[1].unit_price, 12.0);
        assert_eq!(items[2].quantity, 0.0);
        assert_eq!(items[2].unit_price, 0.0);
    }

    #[test]
    fn test_parse_receipt_items_json_accepts_both_shapes() {
        let bare = r#"[{"date":"2025-01-01","description":"Milk","quantity":2,"unit_price":1.5}]"#;
        let wrapped = r#"{"receipt_items":[{"date":"2025-01-01","description":"Milk","quantity":2,"unit_price":1.5}]}"#;

        assert_eq!(parse_receipt_items_json(bare).unwrap().len(), 1);
        assert_eq!(parse_receipt_items_json(wrapped).unwrap().len(), 1);
        assert!(parse_receipt_items_json("{\"oops\": 1}").is_err());
    }
}
