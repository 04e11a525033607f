// 🌐 External Providers - OCR and text generation
//
// Both are black boxes behind a trait so the normalizer never sees a URL.
// One request per call: no retries, timeout comes from configuration.

use crate::config::{LlmSection, OcrSection};
use crate::error::{AppError, AppResult};
use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

// ============================================================================
// CAPABILITIES
// ============================================================================

/// Prompt in, free-form completion out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &'static str;
    async fn generate(&self, prompt: &str) -> AppResult<String>;
}

/// Base64 image in, full detected text out (empty when nothing was found).
#[async_trait]
pub trait OcrProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn detect_text(&self, image_base64: &str) -> AppResult<String>;
}

fn http_client(timeout_secs: u64) -> AppResult<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("build HTTP client")?;
    Ok(client)
}

async fn send_json<B: Serialize + ?Sized>(
    client: &reqwest::Client,
    provider: &str,
    url: &str,
    key: &str,
    body: &B,
) -> AppResult<reqwest::Response> {
    let resp = client
        .post(url)
        .query(&[("key", key)])
        .json(body)
        .send()
        .await
        .map_err(|e| AppError::provider(format!("{} request failed: {}", provider, e)))?;

    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        return Err(AppError::provider(format!("{} error: {} {}", provider, status, txt)));
    }

    Ok(resp)
}

// ============================================================================
// GEMINI (text generation)
// ============================================================================

pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(section: &LlmSection, api_key: &str) -> AppResult<Self> {
        Ok(GeminiClient {
            client: http_client(section.timeout_secs)?,
            base_url: section.base_url.trim_end_matches('/').to_string(),
            model: section.model.clone(),
            api_key: api_key.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<GenerateContent<'a>>,
}

#[derive(Serialize)]
struct GenerateContent<'a> {
    parts: Vec<GeneratePart<'a>>,
}

#[derive(Serialize)]
struct GeneratePart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> AppResult<String> {
        let body = GenerateRequest {
            contents: vec![GenerateContent {
                parts: vec![GeneratePart { text: prompt }],
            }],
        };

        let resp = send_json(&self.client, "gemini", &self.endpoint(), &self.api_key, &body).await?;
        let out: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| AppError::malformed(format!("gemini response: {}", e)))?;

        let content = out
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or_else(|| AppError::malformed("gemini returned no candidates"))?;

        let mut s = String::new();
        for part in content.parts {
            if let Some(t) = part.text {
                s.push_str(&t);
            }
        }
        Ok(s.trim().to_string())
    }
}

// ============================================================================
// VISION (OCR)
// ============================================================================

pub struct VisionClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl VisionClient {
    pub fn new(section: &OcrSection, api_key: &str) -> AppResult<Self> {
        Ok(VisionClient {
            client: http_client(section.timeout_secs)?,
            base_url: section.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    requests: Vec<AnnotateImageRequest<'a>>,
}

#[derive(Serialize)]
struct AnnotateImageRequest<'a> {
    image: AnnotateImage<'a>,
    features: Vec<AnnotateFeature>,
}

#[derive(Serialize)]
struct AnnotateImage<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct AnnotateFeature {
    #[serde(rename = "type")]
    t: &'static str,
}

#[derive(Deserialize)]
struct AnnotateResponse {
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    text_annotations: Vec<TextAnnotation>,
}

#[derive(Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    description: String,
}

#[async_trait]
impl OcrProvider for VisionClient {
    fn name(&self) -> &'static str {
        "vision"
    }

    async fn detect_text(&self, image_base64: &str) -> AppResult<String> {
        let body = AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: AnnotateImage { content: image_base64 },
                features: vec![AnnotateFeature { t: "TEXT_DETECTION" }],
            }],
        };

        let url = format!("{}/v1/images:annotate", self.base_url);
        let resp = send_json(&self.client, "vision", &url, &self.api_key, &body).await?;
        let out: AnnotateResponse = resp
            .json()
            .await
            .map_err(|e| AppError::malformed(format!("vision response: {}", e)))?;

        // The first annotation holds the full text; the rest are single words
        let text = out
            .responses
            .into_iter()
            .next()
            .ok_or_else(|| AppError::malformed("vision returned no responses"))?
            .text_annotations
            .into_iter()
            .next()
            .map(|a| a.description)
            .unwrap_or_default();

        Ok(text)
    }
}

// ============================================================================
// OCR HEURISTICS
// ============================================================================

fn amount_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$?\d+\.\d{2}").expect("static amount pattern"))
}

/// Last currency-like amount in OCR text, usually the receipt total.
pub fn extract_total_amount(text: &str) -> Option<f64> {
    amount_pattern()
        .find_iter(text)
        .last()
        .and_then(|m| m.as_str().trim_start_matches('$').parse().ok())
}

// ============================================================================
// TESTS
// ============================================================================
