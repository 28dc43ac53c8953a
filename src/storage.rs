//! Durable storage for original upload bytes.
//!
//! Each upload is written under a generated stored filename that is unique per
//! process: UTC timestamp, a uuid-v4 prefix, then the original name. Database
//! rows reference the stored filename, so a collision must fail loudly rather
//! than overwrite an earlier upload.

use std::path::PathBuf;

use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{Error, Result};

/// True when `filename` ends with an allow-listed extension (case-insensitive).
pub fn allowed_file(filename: &str, allowed: &[String]) -> bool {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_lowercase();
            allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext))
        }
        _ => false,
    }
}

/// Builds a stored filename for an upload, e.g.
/// `20260829_120000_a1b2c3d4_report.pdf`.
pub fn stored_filename(original: &str) -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let token = Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", timestamp, &token[..8], original)
}

/// Writes `bytes` into the upload directory under `filename`.
///
/// Uses create-new semantics: if the name already exists the write fails with
/// [`Error::Persistence`] instead of replacing the file.
pub fn save_upload(config: &StorageConfig, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(&config.upload_dir)?;
    let path = config.upload_dir.join(filename);

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                Error::Persistence(format!("stored filename collision: {}", filename))
            } else {
                Error::Io(e)
            }
        })?;

    use std::io::Write;
    file.write_all(bytes)?;
    Ok(path)
}
