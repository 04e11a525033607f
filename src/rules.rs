// 🏷️ Keyword Rules - Rules as Data
// Ordered keyword table mapping receipt descriptions to categories

use crate::catalog::FALLBACK_CATEGORY;
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================================================
// RULE DEFINITION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule {
    /// Rule ID for tracking
    pub id: String,

    /// Any of these substrings (case-insensitive) triggers the rule
    pub keywords: Vec<String>,

    /// Category to assign
    pub category: String,

    /// Priority (higher = checked first; ties keep table order)
    #[serde(default)]
    pub priority: i32,
}

impl KeywordRule {
    pub fn new(id: &str, keywords: &[&str], category: &str) -> Self {
        KeywordRule {
            id: id.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            category: category.to_string(),
            priority: 0,
        }
    }

    /// Check if any keyword occurs in the lower-cased text
    pub fn matches(&self, text_lower: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| !k.is_empty() && text_lower.contains(&k.to_lowercase()))
    }
}

// ============================================================================
// RULE ENGINE
// ============================================================================

/// First-match-wins keyword classifier.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: Vec<KeywordRule>,
    fallback: String,
}

impl RuleEngine {
    /// Create an engine with no rules; everything falls back to `Other`
    pub fn new() -> Self {
        RuleEngine {
            rules: Vec::new(),
            fallback: FALLBACK_CATEGORY.to_string(),
        }
    }

    /// The receipt table: groceries, then transportation, then shopping.
    pub fn receipt_defaults() -> Self {
        RuleEngine::from_rules(vec![
            KeywordRule::new("groceries", &["milk", "bread", "cereal"], "Groceries"),
            KeywordRule::new("transportation", &["taxi", "bus"], "Transportation"),
            KeywordRule::new("shopping", &["tv", "shirt", "book"], "Shopping"),
        ])
    }

    /// Load rules from a JSON array file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read rules file: {:?}", path.as_ref()))?;

        let rules: Vec<KeywordRule> =
            serde_json::from_str(&content).context("Failed to parse rules JSON")?;

        Ok(RuleEngine::from_rules(rules))
    }

    /// Create engine from a list of rules
    pub fn from_rules(mut rules: Vec<KeywordRule>) -> Self {
        // Stable: equal priorities keep their table order
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        RuleEngine {
            rules,
            fallback: FALLBACK_CATEGORY.to_string(),
        }
    }

    /// Add a single rule
    pub fn add_rule(&mut self, rule: KeywordRule) {
        self.rules.push(rule);
        self.rules.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Category for a description; the fallback when nothing matches
    pub fn classify(&self, description: &str) -> &str {
        let text_lower = description.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&text_lower))
            .map(|rule| rule.category.as_str())
            .unwrap_or(&self.fallback)
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Get number of rules loaded
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::receipt_defaults()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let engine = RuleEngine::receipt_defaults();

        assert_eq!(engine.classify("Milk"), "Groceries");
        assert_eq!(engine.classify("Whole wheat BREAD"), "Groceries");
        assert_eq!(engine.classify("Corn cereal"), "Groceries");
        assert_eq!(engine.classify("Taxi to airport"), "Transportation");
        assert_eq!(engine.classify("City bus pass"), "Transportation");
        assert_eq!(engine.classify("Samsung TV"), "Shopping");
        assert_eq!(engine.classify("T-shirt"), "Shopping");
        assert_eq!(engine.classify("Notebook"), "Shopping");
        assert_eq!(engine.classify("Electricity token"), "Other");
        assert_eq!(engine.classify(""), "Other");
    }

    #[test]
    fn test_first_rule_wins() {
        let engine = RuleEngine::receipt_defaults();
        assert_eq!(engine.classify("milk and taxi"), "Groceries");
        assert_eq!(engine.classify("bus ticket and book"), "Transportation");
    }

    #[test]
    fn test_substring_matching_is_literal() {
        // "tv" hides inside other words; the table is plain substring containment
        let engine = RuleEngine::receipt_defaults();
        assert_eq!(engine.classify("Netflix subscription"), "Other");
        assert_eq!(engine.classify("HBO TVPlus"), "Shopping");
    }

    #[test]
    fn test_priority_overrides_table_order() {
        let mut engine = RuleEngine::receipt_defaults();
        let mut fuel = KeywordRule::new("fuel", &["milk"], "Dairy");
        fuel.priority = 10;
        engine.add_rule(fuel);

        assert_eq!(engine.classify("milk"), "Dairy");
        assert_eq!(engine.rule_count(), 4);
    }

    #[test]
    fn test_rules_from_json() {
        let json = r#"[
            {"id": "pharmacy", "keywords": ["aspirin", "Bandage"], "category": "Health"},
            {"id": "rent", "keywords": ["rent"], "category": "Housing", "priority": 5}
        ]"#;
        let rules: Vec<KeywordRule> = serde_json::from_str(json).unwrap();
        let engine = RuleEngine::from_rules(rules);

        assert_eq!(engine.rules()[0].id, "rent");
        assert_eq!(engine.classify("bandage roll"), "Health");
        assert_eq!(engine.classify("October rent"), "Housing");
        assert_eq!(engine.classify("apples"), "Other");
    }

    #[test]
    fn test_empty_engine_falls_back() {
        let engine = RuleEngine::new();
        assert_eq!(engine.classify("milk"), engine.fallback());
    }
}
