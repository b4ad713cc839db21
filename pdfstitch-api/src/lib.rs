//! # pdfstitch-api
//!
//! HTTP front end for pdfstitch: template generation, merging and page
//! numbering.
//!
//! | Route | Method | Body |
//! |-------|--------|------|
//! | `/GeneratePDF` | POST | [`GeneratePdfRequest`] |
//! | `/TestGeneratePDF` | GET | - |
//! | `/MergePDF` | POST | [`MergePdfRequest`] |
//! | `/api/health` | GET | - |

mod api;
mod config;

pub use api::{
    app, generate_pdf_handler, health_check, merge_pdf_handler, test_generate_pdf, ApiResponse,
    AppError, AppState, GeneratePdfRequest, MergePdfRequest, TEST_OUTPUT_FILE, TEST_TEMPLATE,
};
pub use config::{ApiConfig, DEFAULT_MAX_BODY_BYTES};
