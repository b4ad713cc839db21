use crate::config::ApiConfig;
use axum::{
    extract::{DefaultBodyLimit, Json, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use pdfstitch::operations::{merge_and_stamp, MergeOptions};
use pdfstitch::{
    generate_pdf, save_output, GenerateOptions, PdfError, StampOptions, TemplateDirectory,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Template rendered by `GET /TestGeneratePDF`
pub const TEST_TEMPLATE: &str = "greeting-template";
/// File written by `GET /TestGeneratePDF`
pub const TEST_OUTPUT_FILE: &str = "test_output.pdf";

/// Request payload for `POST /GeneratePDF`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePdfRequest {
    pub template_name: String,
    #[serde(default)]
    pub template_data_object: Value,
    pub header_text: Option<String>,
    /// Stamp "page i of N" on every page (defaults to true)
    pub has_page_number: Option<bool>,
    pub save_as_file: Option<bool>,
    pub output_file_name: Option<String>,
}

/// Request payload for `POST /MergePDF`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergePdfRequest {
    /// Base64-encoded PDFs, in output order
    pub documents: Vec<String>,
    pub header_text: Option<String>,
    /// Stamp "page i of N" across the merged result (only when explicitly true)
    pub has_page_number: Option<bool>,
    pub save_as_file: Option<bool>,
    pub output_file_name: Option<String>,
}

/// Envelope for every JSON response
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status_code: u16,
    pub success: bool,
    pub message: String,
    /// Base64-encoded PDF
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<String>,
}

impl ApiResponse {
    pub fn success(pdf: &[u8]) -> Self {
        Self {
            status_code: StatusCode::OK.as_u16(),
            success: true,
            message: "Success".to_string(),
            data: Some(STANDARD.encode(pdf)),
        }
    }

    pub fn failure(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// Application-specific error types for the API
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Engine failures, propagated unchanged
    #[error(transparent)]
    Pdf(#[from] PdfError),
    /// Request payload problems caught before reaching the engine
    #[error("{0}")]
    BadRequest(String),
    /// A worker task panicked or was cancelled
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Pdf(PdfError::TemplateNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Pdf(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            AppError::Pdf(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        (status, Json(ApiResponse::failure(status, self.to_string()))).into_response()
    }
}

/// Shared, read-only handler state
#[derive(Debug, Clone)]
pub struct AppState {
    config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }
}

/// Build the application router with all routes configured
pub fn app(config: ApiConfig) -> Router {
    let body_limit = config.max_body_bytes;
    Router::new()
        .route("/GeneratePDF", post(generate_pdf_handler))
        .route("/TestGeneratePDF", get(test_generate_pdf))
        .route("/MergePDF", post(merge_pdf_handler))
        .route("/api/health", get(health_check))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState::new(config))
}

/// Run blocking engine work off the async executor
async fn run_blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
}

fn stamp_options(has_page_number: Option<bool>, header_text: Option<String>) -> Option<StampOptions> {
    let page_numbers = has_page_number.unwrap_or(false);
    let header_text = header_text.filter(|h| !h.is_empty());
    (page_numbers || header_text.is_some()).then(|| StampOptions {
        page_numbers,
        header_text,
        ..StampOptions::default()
    })
}

/// Render a template, stamp it and return it as base64
pub async fn generate_pdf_handler(
    State(state): State<AppState>,
    Json(request): Json<GeneratePdfRequest>,
) -> Result<Json<ApiResponse>, AppError> {
    tracing::info!(template = %request.template_name, "generate requested");

    let bytes = run_blocking(move || {
        let config = state.config();
        let adapter = TemplateDirectory::new(&config.template_dir);
        let options = GenerateOptions {
            header_text: request.header_text.clone(),
            page_numbers: request.has_page_number.unwrap_or(true),
            ..GenerateOptions::default()
        };
        let bytes = generate_pdf(
            &adapter,
            &request.template_name,
            &request.template_data_object,
            &options,
        )?;
        if request.save_as_file.unwrap_or(false) {
            save_output(&config.output_dir, request.output_file_name.as_deref(), &bytes)?;
        }
        Ok(bytes)
    })
    .await?;

    Ok(Json(ApiResponse::success(&bytes)))
}

/// Data bound into the greeting template by `GET /TestGeneratePDF`
pub fn sample_greetings() -> Value {
    let greetings: Vec<Value> = [
        ("French", "Bonjour", Some("Salut")),
        ("Spanish", "Hola", Some("¿Qué tal? (What’s up?)")),
        ("Italian", "Buongiorno", Some("Ciao")),
        ("Chinese", "你好!", None),
        ("Bulgarian", "Здравейте!", Some("Здравей!")),
        ("Japanese", "こんにちは!", Some("おっす!")),
        ("Hebrew", "!שלום", None),
        ("Hindi", "नमस्ते", None),
        ("Korean", "안녕하세요", None),
        ("Thai", "สวัสดี", None),
    ]
    .into_iter()
    .map(|(language, formal, informal)| {
        serde_json::json!({
            "language": language,
            "formal": formal,
            "informal": informal,
        })
    })
    .collect();
    serde_json::json!({ "Greetings": greetings })
}

/// Render the greeting template with sample data and return the PDF itself
pub async fn test_generate_pdf(State(state): State<AppState>) -> Result<Response, AppError> {
    let bytes = run_blocking(move || {
        let config = state.config();
        let data = sample_greetings();
        let adapter = TemplateDirectory::new(&config.template_dir);
        let bytes = generate_pdf(&adapter, TEST_TEMPLATE, &data, &GenerateOptions::default())?;
        save_output(&config.output_dir, Some(TEST_OUTPUT_FILE), &bytes)?;
        Ok(bytes)
    })
    .await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{TEST_OUTPUT_FILE}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Merge base64-encoded PDFs in order and stamp the result
pub async fn merge_pdf_handler(
    State(state): State<AppState>,
    Json(request): Json<MergePdfRequest>,
) -> Result<Json<ApiResponse>, AppError> {
    tracing::info!(documents = request.documents.len(), "merge requested");

    let inputs = request
        .documents
        .iter()
        .enumerate()
        .map(|(i, encoded)| {
            STANDARD
                .decode(encoded.trim())
                .map_err(|e| AppError::BadRequest(format!("document {} is not valid base64: {e}", i + 1)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let stamp = stamp_options(request.has_page_number, request.header_text);
    let save_as_file = request.save_as_file.unwrap_or(false);
    let output_file_name = request.output_file_name;

    let bytes = run_blocking(move || {
        let bytes = merge_and_stamp(&inputs, MergeOptions::default(), stamp)?;
        if save_as_file {
            save_output(&state.config().output_dir, output_file_name.as_deref(), &bytes)?;
        }
        Ok(bytes)
    })
    .await?;

    Ok(Json(ApiResponse::success(&bytes)))
}

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "pdfstitch API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
