use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default request body limit: merged inputs arrive base64-encoded in JSON
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Server settings, read from `PDFSTITCH_*` environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub bind: SocketAddr,
    /// Where `TemplateDirectory` looks up templates
    pub template_dir: PathBuf,
    /// Where `saveAsFile` requests are written
    pub output_dir: PathBuf,
    pub max_body_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            template_dir: PathBuf::from("templates"),
            output_dir: PathBuf::from("output"),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(bind) = lookup("PDFSTITCH_BIND") {
            config.bind = bind
                .parse()
                .with_context(|| format!("PDFSTITCH_BIND is not a socket address: {bind}"))?;
        }
        if let Some(dir) = lookup("PDFSTITCH_TEMPLATE_DIR") {
            config.template_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("PDFSTITCH_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(limit) = lookup("PDFSTITCH_MAX_BODY_BYTES") {
            config.max_body_bytes = limit
                .parse()
                .with_context(|| format!("PDFSTITCH_MAX_BODY_BYTES is not a number: {limit}"))?;
        }
        Ok(config)
    }
}
