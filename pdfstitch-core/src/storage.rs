//! Saving assembled documents to disk

use crate::error::Result;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// File name used when the caller does not supply one
pub const DEFAULT_OUTPUT_NAME: &str = "output.pdf";

/// Write `bytes` to `dir/file_name` and return the final path.
///
/// The directory is created when missing. The data goes to a temporary file
/// next to the target first and is renamed into place, so readers never see
/// a partially written PDF. Concurrent saves to the same name are not
/// coordinated; the last rename wins.
pub fn save_output(dir: impl AsRef<Path>, file_name: Option<&str>, bytes: &[u8]) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let name = file_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_OUTPUT_NAME);
    validate_file_name(name)?;

    std::fs::create_dir_all(dir)?;
    let target = dir.join(name);

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(&target).map_err(|e| e.error)?;

    tracing::info!(path = %target.display(), bytes = bytes.len(), "saved output");
    Ok(target)
}

fn validate_file_name(name: &str) -> io::Result<()> {
    if name == "." || name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid output file name '{name}'"),
        ));
    }
    Ok(())
}
