// 📊 Spending Summary
// Budget, total spent and per-category totals for the dashboard

use crate::catalog::CategoryCatalog;
use crate::models::Expense;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub budget: f64,
    pub total_expenses: f64,
    pub remaining_balance: f64,
    pub by_category: Vec<CategoryTotal>,
}

/// Aggregate expenses against a budget.
///
/// Rows follow catalog order (including categories with nothing spent),
/// then any category only seen on expenses, in first-seen order.
pub fn summarize(expenses: &[Expense], catalog: &CategoryCatalog, budget: f64) -> Summary {
    let mut by_category: Vec<CategoryTotal> = catalog
        .names()
        .iter()
        .map(|name| CategoryTotal {
            category: name.clone(),
            total: 0.0,
            count: 0,
        })
        .collect();

    for expense in expenses {
        let index = match by_category.iter().position(|row| row.category == expense.category) {
            Some(index) => index,
            None => {
                by_category.push(CategoryTotal {
                    category: expense.category.clone(),
                    total: 0.0,
                    count: 0,
                });
                by_category.len() - 1
            }
        };

        by_category[index].total += expense.amount;
        by_category[index].count += 1;
    }

    let total_expenses: f64 = expenses.iter().map(|e| e.amount).sum();

    Summary {
        budget,
        total_expenses,
        remaining_balance: budget - total_expenses,
        by_category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expense(id: u64, category: &str, amount: f64) -> Expense {
        Expense {
            id,
            date: "2025-09-01".to_string(),
            category: category.to_string(),
            description: "-".to_string(),
            amount,
            quantity: 1.0,
        }
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize(&[], &CategoryCatalog::with_defaults(), 100.0);

        assert_eq!(summary.total_expenses, 0.0);
        assert_eq!(summary.remaining_balance, 100.0);
        assert_eq!(summary.by_category.len(), 5);
        assert!(summary.by_category.iter().all(|row| row.count == 0));
    }

    #[test]
    fn test_totals_and_ordering() {
        let catalog = CategoryCatalog::from_names(["Groceries", "Transportation"]);
        let expenses = vec![
            expense(1, "Transportation", 4000.0),
            expense(2, "ENTERTAINMENT", 4500.0),
            expense(3, "Groceries", 12000.0),
            expense(4, "Transportation", 500.0),
        ];

        let summary = summarize(&expenses, &catalog, 120_000.0);

        assert_eq!(summary.total_expenses, 21_000.0);
        assert_eq!(summary.remaining_balance, 99_000.0);

        let rows: Vec<(&str, f64, usize)> = summary
            .by_category
            .iter()
            .map(|r| (r.category.as_str(), r.total, r.count))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("Groceries", 12000.0, 1),
                ("Transportation", 4500.0, 2),
                ("ENTERTAINMENT", 4500.0, 1),
            ]
        );
    }

    #[test]
    fn test_overspent_budget_goes_negative() {
        let summary = summarize(&[expense(1, "Other", 150.0)], &CategoryCatalog::new(), 100.0);
        assert_eq!(summary.remaining_balance, -50.0);
    }
}
