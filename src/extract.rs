//! Per-page text extraction for PDF uploads.
//!
//! Takes the raw upload bytes and returns one entry per page, in page order.
//! A page whose text cannot be decoded contributes an empty string rather than
//! failing the whole document; only an unreadable PDF structure is an error.

use lopdf::Document;

use crate::error::{Error, Result};
use crate::models::PageText;

/// Extracts the text of every page of `bytes`, 1-based and contiguous.
///
/// Fails with [`Error::MalformedPdf`] when the buffer is not a parseable PDF
/// (bad header, broken xref). Same bytes in, same pages out.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<PageText>> {
    let document = Document::load_mem(bytes).map_err(|e| Error::MalformedPdf(e.to_string()))?;

    let page_ids = document.get_pages();
    let mut pages = Vec::with_capacity(page_ids.len());

    // get_pages returns a BTreeMap keyed by page number, so iteration is in
    // page order. Renumber from the index anyway: chunk rows must be 1..=N
    // with no gaps even if the map keys are unusual.
    for (index, (page_no, _object_id)) in page_ids.iter().enumerate() {
        let text = document
            .extract_text(&[*page_no])
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        pages.push(PageText {
            number: (index + 1) as u32,
            text,
        });
    }

    Ok(pages)
}
