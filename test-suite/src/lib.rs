//! Test Suite for pdfstitch
//!
//! Independent PDF producers and broken-input samples used to exercise the
//! parser, merger and stamper on files they did not write themselves.

pub mod generators;

pub use generators::{PdfVersion, TestPdfBuilder};

/// Common test utilities
pub mod utils {
    use std::path::PathBuf;

    /// Directory generated fixtures are written to
    pub fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Create a temporary directory for test outputs
    pub fn create_test_output_dir() -> anyhow::Result<tempfile::TempDir> {
        Ok(tempfile::tempdir()?)
    }
}
