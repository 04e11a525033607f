// 🧠 Classifiers - pluggable category inference
//
// The normalizer only needs "one category per item". Where that category
// comes from (keyword table or text generation) is chosen by configuration.

use crate::catalog::CategoryCatalog;
use crate::config::{AppConfig, ClassifierKind};
use crate::error::{AppError, AppResult};
use crate::models::ReceiptItem;
use crate::normalizer::parse_extraction;
use crate::providers::{GeminiClient, TextGenerator};
use crate::rules::RuleEngine;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fmt::Write;
use std::sync::Arc;

#[async_trait]
pub trait Classifier: Send + Sync {
    fn name(&self) -> &'static str;

    /// One category per item, in input order.
    async fn categorize(&self, items: &[ReceiptItem], catalog: &CategoryCatalog) -> AppResult<Vec<String>>;
}

/// Build the classifier selected by `cfg.classifier`.
pub fn from_config(cfg: &AppConfig) -> Result<Arc<dyn Classifier>> {
    match cfg.classifier {
        ClassifierKind::Keyword => {
            let engine = match &cfg.rules_path {
                Some(path) => RuleEngine::from_file(path)?,
                None => RuleEngine::receipt_defaults(),
            };
            Ok(Arc::new(KeywordClassifier::new(engine)))
        }
        ClassifierKind::RemoteLlm => {
            let key = cfg
                .llm_api_key()
                .context("classifier 'remote-llm' needs an LLM API key")?;
            let generator = GeminiClient::new(&cfg.llm, key)?;
            Ok(Arc::new(RemoteLlmClassifier::new(Arc::new(generator))))
        }
    }
}

// ============================================================================
// KEYWORD
// ============================================================================

pub struct KeywordClassifier {
    engine: RuleEngine,
}

impl KeywordClassifier {
    pub fn new(engine: RuleEngine) -> Self {
        KeywordClassifier { engine }
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(RuleEngine::receipt_defaults())
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    fn name(&self) -> &'static str {
        "keyword"
    }

    async fn categorize(&self, items: &[ReceiptItem], _catalog: &CategoryCatalog) -> AppResult<Vec<String>> {
        Ok(items
            .iter()
            .map(|item| self.engine.classify(&item.description).to_string())
            .collect())
    }
}

// ============================================================================
// REMOTE LLM
// ============================================================================

pub struct RemoteLlmClassifier {
    generator: Arc<dyn TextGenerator>,
}

impl RemoteLlmClassifier {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        RemoteLlmClassifier { generator }
    }
}

#[async_trait]
impl Classifier for RemoteLlmClassifier {
    fn name(&self) -> &'static str {
        "remote-llm"
    }

    async fn categorize(&self, items: &[ReceiptItem], catalog: &CategoryCatalog) -> AppResult<Vec<String>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let prompt = build_prompt(catalog, &render_items(items));
        let reply = self.generator.generate(&prompt).await?;
        let extraction = parse_extraction(&reply)?;

        if extraction.items.len() != items.len() {
            return Err(AppError::malformed(format!(
                "expected {} categorized items, got {}",
                items.len(),
                extraction.items.len()
            )));
        }

        Ok(extraction.items.into_iter().map(|e| e.category).collect())
    }
}

/// Receipt lines as plain text, one per line, for the prompt.
pub fn render_items(items: &[ReceiptItem]) -> String {
    let mut text = String::new();
    for item in items {
        let _ = writeln!(text, "{} x{} @ {}", item.description, item.quantity, item.unit_price);
    }
    text
}

/// Prompt asking for `{ items: [{category, description, quantity, amount}], total_amount }`.
pub fn build_prompt(catalog: &CategoryCatalog, receipt_text: &str) -> String {
    let categories = catalog
        .names()
        .iter()
        .map(|c| format!("\"{}\"", c))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are an expense assistant. Read the receipt text below and list every purchased item.\n\
         For each item choose a category from this list: [{categories}].\n\
         If none fits, infer a short new category name.\n\
         Reply with JSON only, exactly in this shape:\n\
         {{\"items\": [{{\"category\": string, \"description\": string, \"quantity\": number, \"amount\": number}}], \"total_amount\": number}}\n\
         where \"amount\" is the price of ONE unit of the item.\n\
         Keep the items in the order they appear on the receipt.\n\n\
         Receipt text:\n{receipt_text}"
    )
}

// ============================================================================
// TESTS
// ============================================================================
