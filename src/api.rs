// 🌐 REST API with Axum
// In-memory expense tracker: expenses, receipt processing, categories

use crate::catalog::CategoryCatalog;
use crate::classifier::{self, Classifier};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::models::{Expense, NewExpense, ReceiptItem};
use crate::normalizer::{assign_categories, normalize_extraction};
use crate::scanner::ReceiptScanner;
use crate::store::ExpenseStore;
use crate::summary::{summarize, Summary};
use anyhow::anyhow;
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Receipt images arrive base64-encoded in JSON
const SCAN_BODY_LIMIT: usize = 10 * 1024 * 1024;

const INTERNAL_ERROR_MESSAGE: &str = "An internal server error occurred.";

// ============================================================================
// Shared state
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<ExpenseStore>>,
    classifier: Arc<dyn Classifier>,
    scanner: Option<Arc<ReceiptScanner>>,
    budget: f64,
}

impl AppState {
    pub fn new(store: ExpenseStore, classifier: Arc<dyn Classifier>, budget: f64) -> Self {
        AppState {
            store: Arc::new(Mutex::new(store)),
            classifier,
            scanner: None,
            budget,
        }
    }

    pub fn with_scanner(mut self, scanner: ReceiptScanner) -> Self {
        self.scanner = Some(Arc::new(scanner));
        self
    }

    /// Wire store, classifier and (if both API keys are present) scanner from config
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let store = ExpenseStore::new(CategoryCatalog::from_names(cfg.seed_categories.iter().cloned()));
        let classifier = classifier::from_config(cfg)?;
        let state = AppState::new(store, classifier, cfg.budget);

        Ok(match ReceiptScanner::from_config(cfg)? {
            Some(scanner) => state.with_scanner(scanner),
            None => state,
        })
    }

    pub fn classifier_name(&self) -> &'static str {
        self.classifier.name()
    }

    pub fn scanning_enabled(&self) -> bool {
        self.scanner.is_some()
    }

    // Never hold the guard across an `.await`
    fn store(&self) -> AppResult<MutexGuard<'_, ExpenseStore>> {
        self.store
            .lock()
            .map_err(|_| AppError::Internal(anyhow!("expense store lock poisoned")))
    }
}

// ============================================================================
// Error mapping
// ============================================================================

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::MalformedExternalResponse(_) | AppError::Provider(_) => StatusCode::BAD_GATEWAY,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::Internal(e) => {
                error!(error = %format!("{:#}", e), "internal error");
                INTERNAL_ERROR_MESSAGE.to_string()
            }
            AppError::Provider(detail) => {
                error!(error = %detail, "receipt provider failed");
                "The receipt processing service is unavailable.".to_string()
            }
            other => {
                warn!(status = status.as_u16(), error = %other, "request rejected");
                other.to_string()
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

fn invalid_body(rejection: JsonRejection) -> AppError {
    AppError::validation(format!("Invalid JSON body: {}", rejection.body_text()))
}

fn handle_panic(_err: Box<dyn Any + Send + 'static>) -> Response {
    AppError::Internal(anyhow!("request handler panicked")).into_response()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

// ============================================================================
// Request / response schemas
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AddExpenseRequest {
    pub date: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub quantity: Option<f64>,
}

impl AddExpenseRequest {
    /// All five fields are required; empty strings count as missing
    pub fn validate(self) -> AppResult<NewExpense> {
        let date = non_empty(self.date);
        let category = non_empty(self.category);
        let description = non_empty(self.description);

        match (date, category, description, self.amount, self.quantity) {
            (Some(date), Some(category), Some(description), Some(amount), Some(quantity)) => Ok(NewExpense {
                date,
                category,
                description,
                amount,
                quantity,
            }),
            (date, category, description, amount, quantity) => {
                let missing: Vec<&str> = [
                    ("date", date.is_none()),
                    ("category", category.is_none()),
                    ("description", description.is_none()),
                    ("amount", amount.is_none()),
                    ("quantity", quantity.is_none()),
                ]
                .into_iter()
                .filter(|(_, absent)| *absent)
                .map(|(name, _)| name)
                .collect();

                Err(AppError::validation(format!(
                    "Missing required fields: {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProcessReceiptRequest {
    pub receipt_items: Option<Vec<ReceiptItem>>,
}

#[derive(Debug, Deserialize)]
pub struct ScanReceiptRequest {
    pub image_base64: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub category: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    classifier: &'static str,
    scanning: bool,
}

#[derive(Serialize)]
struct ExpenseCreatedResponse {
    message: &'static str,
    expense: Expense,
}

#[derive(Serialize)]
struct ExpensesResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    expenses: Vec<Expense>,
}

#[derive(Serialize)]
struct ScanReceiptResponse {
    message: &'static str,
    expenses: Vec<Expense>,
    total_amount: Option<f64>,
    computed_total: f64,
    ocr_total: Option<f64>,
}

#[derive(Serialize)]
struct CategoryCreatedResponse {
    message: &'static str,
    category: String,
}

#[derive(Serialize)]
struct CategoriesResponse {
    categories: Vec<String>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: crate::VERSION,
        classifier: state.classifier_name(),
        scanning: state.scanning_enabled(),
    })
}

/// POST /api/add-expense - Manually add an expense
async fn add_expense(
    State(state): State<AppState>,
    payload: Result<Json<AddExpenseRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(request) = payload.map_err(invalid_body)?;
    // Validate before touching the store so a rejected request never burns an id
    let new_expense = request.validate()?;

    let expense = state.store()?.append(new_expense);
    info!(id = expense.id, category = %expense.category, amount = expense.amount, "added expense");

    Ok((
        StatusCode::CREATED,
        Json(ExpenseCreatedResponse {
            message: "Expense added successfully",
            expense,
        }),
    ))
}

/// GET /api/expenses - All stored expenses
async fn list_expenses(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let expenses = state.store()?.list().to_vec();
    info!(count = expenses.len(), "fetching all expenses");

    Ok(Json(ExpensesResponse {
        message: None,
        expenses,
    }))
}

/// POST /api/process-receipt - Normalize receipt items and store them as expenses
async fn process_receipt(
    State(state): State<AppState>,
    payload: Result<Json<ProcessReceiptRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(request) = payload.map_err(invalid_body)?;
    let items = request
        .receipt_items
        .ok_or_else(|| AppError::validation("No 'receipt_items' in JSON data received."))?;
    info!(count = items.len(), classifier = state.classifier_name(), "processing receipt items");

    let catalog = state.store()?.catalog().clone();
    let categories = state.classifier.categorize(&items, &catalog).await?;
    if categories.len() != items.len() {
        return Err(AppError::malformed(format!(
            "classifier returned {} categories for {} items",
            categories.len(),
            items.len()
        )));
    }

    let mut store = state.store()?;
    let normalized = assign_categories(&items, categories, store.catalog_mut());
    let expenses = store.record_normalized(&normalized);
    info!(count = expenses.len(), "processed receipt");

    Ok((
        StatusCode::CREATED,
        Json(ExpensesResponse {
            message: Some("Receipt processed and expenses added successfully"),
            expenses,
        }),
    ))
}

/// POST /api/scan-receipt - OCR + text generation on a receipt image
async fn scan_receipt(
    State(state): State<AppState>,
    payload: Result<Json<ScanReceiptRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let scanner = state
        .scanner
        .clone()
        .ok_or_else(|| AppError::Unavailable("Receipt scanning is not configured.".to_string()))?;

    let Json(request) = payload.map_err(invalid_body)?;
    let image = non_empty(request.image_base64)
        .ok_or_else(|| AppError::validation("No 'image_base64' in JSON data received."))?;
    let image = strip_data_url(&image);
    base64::engine::general_purpose::STANDARD
        .decode(image)
        .map_err(|_| AppError::validation("'image_base64' is not valid base64."))?;

    let date = non_empty(request.date).unwrap_or_else(today);

    let catalog = state.store()?.catalog().clone();
    let scanned = scanner.scan(image, &catalog).await?;

    let mut store = state.store()?;
    let normalized = normalize_extraction(&scanned.extraction, &date, store.catalog_mut());
    let expenses = store.record_normalized(&normalized);
    info!(count = expenses.len(), "scanned receipt");

    if let (Some(reported), Some(ocr)) = (scanned.extraction.total_amount, scanned.ocr_total) {
        if (reported - ocr).abs() > 0.01 {
            warn!(reported, ocr, "extracted total disagrees with OCR total");
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(ScanReceiptResponse {
            message: "Receipt scanned and expenses added successfully",
            expenses,
            total_amount: scanned.extraction.total_amount,
            computed_total: scanned.extraction.computed_total(),
            ocr_total: scanned.ocr_total,
        }),
    ))
}

/// POST /api/categories - Create a category
async fn create_category(
    State(state): State<AppState>,
    payload: Result<Json<CategoryRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(request) = payload.map_err(invalid_body)?;
    let raw = non_empty(request.category).ok_or_else(|| AppError::validation("Category name is required."))?;

    let category = state.store()?.add_category(&raw)?;

    Ok((
        StatusCode::CREATED,
        Json(CategoryCreatedResponse {
            message: "Category added successfully",
            category,
        }),
    ))
}

/// GET /api/categories - All known categories in catalog order
async fn list_categories(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let categories = state.store()?.catalog().names().to_vec();
    Ok(Json(CategoriesResponse { categories }))
}

/// GET /api/summary - Budget and per-category totals
async fn get_summary(State(state): State<AppState>) -> AppResult<Json<Summary>> {
    let store = state.store()?;
    Ok(Json(summarize(store.list(), store.catalog(), state.budget)))
}

/// Accept both raw base64 and `data:image/...;base64,` URLs
fn strip_data_url(image: &str) -> &str {
    match image.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(rest),
        None => image,
    }
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

// ============================================================================
// Router
// ============================================================================

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/expenses", get(list_expenses))
        .route("/add-expense", post(add_expense))
        .route("/process-receipt", post(process_receipt))
        .route(
            "/scan-receipt",
            post(scan_receipt).layer(DefaultBodyLimit::max(SCAN_BODY_LIMIT)),
        )
        .route("/categories", get(list_categories).post(create_category))
        .route("/summary", get(get_summary))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ============================================================================
// TESTS
// ============================================================================
