//! Ingestion pipeline: validate → extract → persist, as one unit.
//!
//! The original bytes go to the upload directory first, then the document row
//! and its full chunk set commit in a single transaction. A failed extraction
//! persists nothing. A failed database write can leave the stored file behind
//! (logged as an orphan for operational cleanup); the database never references
//! a file that was not written.

use sqlx::SqlitePool;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::extract;
use crate::models::{Document, NewDocument};
use crate::storage;
use crate::store;

/// Ingests one uploaded PDF for `owner` and returns the persisted document.
///
/// Steps, in order:
/// 1. extension allow-list check on `filename`,
/// 2. per-page text extraction over `bytes`,
/// 3. write `bytes` to durable storage under a generated unique name,
/// 4. atomic insert of the document row plus one chunk per page.
pub async fn ingest(
    pool: &SqlitePool,
    config: &Config,
    bytes: &[u8],
    filename: &str,
    owner: &str,
) -> Result<Document> {
    if !storage::allowed_file(filename, &config.storage.allowed_extensions) {
        return Err(Error::UnsupportedFileType);
    }

    let pages = extract::extract_pages(bytes)?;

    let stored = storage::stored_filename(filename);
    storage::save_upload(&config.storage, &stored, bytes)?;

    let new_doc = NewDocument {
        title: filename.to_string(),
        filename: stored.clone(),
        total_pages: pages.len() as i64,
        size: bytes.len() as i64,
        uploaded_by: owner.to_string(),
        upload_date: chrono::Utc::now().timestamp(),
    };

    let document = match store::create_document_with_chunks(pool, &new_doc, &pages).await {
        Ok(doc) => doc,
        Err(e) => {
            tracing::warn!(
                stored_filename = %stored,
                "document insert failed after file write; stored file is orphaned"
            );
            return Err(e);
        }
    };

    tracing::info!(
        document_id = document.id,
        pages = document.total_pages,
        owner = %owner,
        "ingested {}",
        filename
    );

    Ok(document)
}
