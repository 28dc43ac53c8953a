//! Core data models for documents and their per-page text chunks.

use serde::Serialize;

/// Metadata record for one uploaded PDF.
///
/// `upload_date` is stored as a unix timestamp and rendered as ISO8601 at the
/// row-mapping boundary, so every surface (CLI, HTTP) shows the same string.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: i64,
    /// Display name; the original upload filename. May repeat across documents.
    pub title: String,
    /// Generated stored filename, unique per upload.
    pub filename: String,
    pub total_pages: i64,
    /// Byte size of the uploaded file.
    pub size: i64,
    pub uploaded_by: String,
    /// ISO8601 UTC, e.g. `2026-08-29T12:00:00Z`.
    pub upload_date: String,
}

/// Fields of a document known before the store assigns an id.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub filename: String,
    pub total_pages: i64,
    pub size: i64,
    pub uploaded_by: String,
    /// Unix timestamp.
    pub upload_date: i64,
}

/// The extracted text of a single page of a document.
#[derive(Debug, Clone, Serialize)]
pub struct Chunk {
    pub id: i64,
    pub document_id: i64,
    /// 1-based, contiguous within a document.
    pub page_number: i64,
    /// Empty string when the page had no extractable text; never null.
    pub content: String,
}

/// One page of extractor output, before persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    /// 1-based page number.
    pub number: u32,
    pub text: String,
}

pub(crate) fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
