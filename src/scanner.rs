// 📷 Receipt Scanner - image → OCR text → text generation → extraction
//
// The two provider calls run strictly one after the other. Nothing is
// returned unless both succeeded and the reply validated.

use crate::catalog::CategoryCatalog;
use crate::classifier::build_prompt;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::normalizer::{parse_extraction, Extraction};
use crate::providers::{extract_total_amount, GeminiClient, OcrProvider, TextGenerator, VisionClient};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of a successful scan; not yet normalized or stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedReceipt {
    pub extraction: Extraction,
    /// Last amount found in the OCR text, if any
    pub ocr_total: Option<f64>,
}

pub struct ReceiptScanner {
    ocr: Arc<dyn OcrProvider>,
    generator: Arc<dyn TextGenerator>,
}

impl ReceiptScanner {
    pub fn new(ocr: Arc<dyn OcrProvider>, generator: Arc<dyn TextGenerator>) -> Self {
        ReceiptScanner { ocr, generator }
    }

    /// Scanner backed by Vision + Gemini, or `None` unless both API keys are set.
    pub fn from_config(cfg: &AppConfig) -> Result<Option<Self>> {
        let (Some(ocr_key), Some(llm_key)) = (cfg.ocr_api_key(), cfg.llm_api_key()) else {
            return Ok(None);
        };

        let ocr = VisionClient::new(&cfg.ocr, ocr_key)?;
        let generator = GeminiClient::new(&cfg.llm, llm_key)?;
        Ok(Some(ReceiptScanner::new(Arc::new(ocr), Arc::new(generator))))
    }

    pub async fn scan(&self, image_base64: &str, catalog: &CategoryCatalog) -> AppResult<ScannedReceipt> {
        let text = self.ocr.detect_text(image_base64).await?;
        if text.trim().is_empty() {
            return Err(AppError::malformed("no text detected on the receipt image"));
        }
        info!(provider = self.ocr.name(), chars = text.len(), "receipt text detected");

        self.extract(&text, catalog).await
    }

    /// Run the text-generation half on already-recognised receipt text.
    pub async fn extract(&self, text: &str, catalog: &CategoryCatalog) -> AppResult<ScannedReceipt> {
        let prompt = build_prompt(catalog, text);
        let reply = self.generator.generate(&prompt).await?;
        debug!(provider = self.generator.name(), reply = %reply, "text generation reply");

        let extraction = parse_extraction(&reply)?;
        info!(items = extraction.items.len(), "receipt items extracted");

        Ok(ScannedReceipt {
            extraction,
            ocr_total: extract_total_amount(text),
        })
    }
}
