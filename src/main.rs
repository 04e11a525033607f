// Expense Tracker - CLI
// Offline receipt normalization and one-shot receipt scans

use anyhow::{bail, Context, Result};
use base64::Engine;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

use expense_tracker::{
    init_tracing, load_receipt_items_path, normalize_extraction, normalize_with, AppConfig, CategoryCatalog,
    NormalizedItem, ReceiptScanner, RuleEngine,
};

#[derive(Parser, Debug)]
#[command(name = "expense-tracker", version, about = "Receipt normalization and expense tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Categorize and price receipt lines from a CSV or JSON file
    Normalize {
        /// Receipt file (.json with `receipt_items`, anything else is read as CSV)
        file: PathBuf,

        /// JSON keyword rules replacing the built-in table
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Print the active keyword rules in evaluation order
    Rules {
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// OCR a receipt image and extract items (needs VISION_API_KEY and GEMINI_API_KEY)
    Scan {
        image: PathBuf,

        /// TOML config file (defaults to $EXPENSE_TRACKER_CONFIG)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Date stamped on every extracted item (default: today)
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Serialize)]
struct NormalizeOutput<'a> {
    items: &'a [NormalizedItem],
    categories: &'a [String],
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Normalize { file, rules } => run_normalize(&file, rules.as_deref())?,
        Command::Rules { rules } => run_rules(rules.as_deref())?,
        Command::Scan { image, config, date } => run_scan(&image, config.as_deref(), date).await?,
    }

    Ok(())
}

fn load_engine(rules: Option<&Path>) -> Result<RuleEngine> {
    match rules {
        Some(path) => RuleEngine::from_file(path),
        None => Ok(RuleEngine::receipt_defaults()),
    }
}

fn run_normalize(file: &Path, rules: Option<&Path>) -> Result<()> {
    if !file.exists() {
        bail!("Receipt file not found: {}", file.display());
    }

    let engine = load_engine(rules)?;
    let items = load_receipt_items_path(file).with_context(|| format!("loading {}", file.display()))?;

    let mut catalog = CategoryCatalog::with_defaults();
    let normalized = normalize_with(&items, &mut catalog, &engine);

    let output = NormalizeOutput {
        items: &normalized,
        categories: catalog.names(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn run_rules(rules: Option<&Path>) -> Result<()> {
    let engine = load_engine(rules)?;

    println!("📋 {} keyword rules", engine.rule_count());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for rule in engine.rules() {
        println!("{:<16} → {:<16} {}", rule.id, rule.category, rule.keywords.join(", "));
    }
    println!("(no match)       → {}", engine.fallback());

    Ok(())
}

async fn run_scan(image: &Path, config: Option<&Path>, date: Option<String>) -> Result<()> {
    let cfg = AppConfig::load(config)?;
    init_tracing(&cfg.logging);

    let Some(scanner) = ReceiptScanner::from_config(&cfg)? else {
        bail!("Receipt scanning needs both VISION_API_KEY and GEMINI_API_KEY");
    };

    let bytes = std::fs::read(image).with_context(|| format!("reading {}", image.display()))?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);

    let mut catalog = CategoryCatalog::from_names(cfg.seed_categories.iter().cloned());
    let scanned = scanner.scan(&encoded, &catalog).await?;

    let date = date.unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
    let normalized = normalize_extraction(&scanned.extraction, &date, &mut catalog);

    let output = NormalizeOutput {
        items: &normalized,
        categories: catalog.names(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    eprintln!("🧾 computed total: {:.2}", scanned.extraction.computed_total());
    if let Some(total) = scanned.extraction.total_amount {
        eprintln!("   reported total: {:.2}", total);
    }
    if let Some(total) = scanned.ocr_total {
        eprintln!("   OCR total:      {:.2}", total);
    }

    Ok(())
}
