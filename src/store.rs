// 🗄️ Expense Store - volatile, single-writer
//
// Owns the expense list, the id counter and the category catalog.
// Everything resets on restart. The server wraps it in `Arc<Mutex<_>>`
// and hands it to handlers; it is never shared across processes.

use crate::catalog::CategoryCatalog;
use crate::error::{AppError, AppResult};
use crate::models::{Expense, NewExpense, NormalizedItem};
use tracing::info;

#[derive(Debug, Clone)]
pub struct ExpenseStore {
    expenses: Vec<Expense>,
    next_id: u64,
    catalog: CategoryCatalog,
}

impl ExpenseStore {
    pub fn new(catalog: CategoryCatalog) -> Self {
        ExpenseStore {
            expenses: Vec::new(),
            next_id: 1,
            catalog,
        }
    }

    /// Reserve the next id; ids start at 1 and only go up
    pub fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Store a validated expense under a fresh id
    pub fn append(&mut self, expense: NewExpense) -> Expense {
        let id = self.next_id();
        let expense = expense.with_id(id);
        self.expenses.push(expense.clone());
        expense
    }

    /// Store every normalized item as its own expense (amount = line total)
    pub fn record_normalized(&mut self, items: &[NormalizedItem]) -> Vec<Expense> {
        items
            .iter()
            .map(|item| self.append(NewExpense::from(item)))
            .collect()
    }

    pub fn list(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut CategoryCatalog {
        &mut self.catalog
    }

    /// Add a user-supplied category name (trimmed, exact-match duplicates rejected)
    pub fn add_category(&mut self, raw: &str) -> AppResult<String> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(AppError::validation("Category name is required."));
        }
        if !self.catalog.ensure(name) {
            return Err(AppError::conflict("Category already exists."));
        }

        info!(category = %name, "added category");
        Ok(name.to_string())
    }
}

impl Default for ExpenseStore {
    fn default() -> Self {
        Self::new(CategoryCatalog::with_defaults())
    }
}
