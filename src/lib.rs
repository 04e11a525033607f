// Expense Tracker - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod error;
pub mod models;
pub mod catalog;
pub mod rules;          // Keyword classification table
pub mod normalizer;     // Receipt lines → categorized, priced items
pub mod providers;      // OCR + text-generation HTTP clients
pub mod classifier;     // Keyword / remote-llm category inference
pub mod scanner;        // Image → OCR → extraction
pub mod store;
pub mod summary;
pub mod config;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use error::{AppError, AppResult};
pub use models::{
    Expense, NewExpense, NormalizedItem, ReceiptItem,
    load_receipt_items_csv, load_receipt_items_path, parse_receipt_items_json,
};
pub use catalog::{CategoryCatalog, DEFAULT_CATEGORIES, FALLBACK_CATEGORY};
pub use rules::{KeywordRule, RuleEngine};
pub use normalizer::{
    Extraction, ExtractedItem,
    assign_categories, normalize, normalize_extraction, normalize_with, parse_extraction, strip_code_fences,
};
pub use providers::{GeminiClient, OcrProvider, TextGenerator, VisionClient, extract_total_amount};
pub use classifier::{Classifier, KeywordClassifier, RemoteLlmClassifier};
pub use scanner::{ReceiptScanner, ScannedReceipt};
pub use store::ExpenseStore;
pub use summary::{CategoryTotal, Summary, summarize};
pub use config::{AppConfig, ClassifierKind, LoggingSection};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured filter. Safe to call twice; the
/// second call is a no-op.
pub fn init_tracing(logging: &LoggingSection) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = if logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };
}
