//! Pagination validation and response shaping over the document store.
//!
//! The store assumes validated inputs; this layer is the caller-facing bounds
//! check plus the `{items, total, page, size, pages}` envelope every listing
//! and search endpoint returns. No state of its own.

use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::{Error, Result};
use crate::models::{Chunk, Document};
use crate::store;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Validated offset-pagination parameters.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub page: i64,
    pub size: i64,
}

impl Pagination {
    /// Accepts `page >= 1` and `size` in `1..=100`; `None` falls back to the
    /// defaults (page 1, size 10).
    pub fn new(page: Option<i64>, size: Option<i64>) -> Result<Self> {
        let page = page.unwrap_or(1);
        let size = size.unwrap_or(DEFAULT_PAGE_SIZE);

        if page < 1 {
            return Err(Error::InvalidParameter(format!(
                "page must be >= 1, got {}",
                page
            )));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&size) {
            return Err(Error::InvalidParameter(format!(
                "size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, size
            )));
        }

        // Reject pages whose offset would not fit in an i64; size is capped
        // above, so this bounds `page` at i64::MAX / size.
        if (page - 1).checked_mul(size).is_none() {
            return Err(Error::InvalidParameter(format!(
                "page {} is out of range",
                page
            )));
        }

        Ok(Self { page, size })
    }

    pub fn offset(&self) -> i64 {
        // In range: `new` rejected any (page, size) pair that would overflow.
        (self.page - 1) * self.size
    }
}

/// The pagination envelope shared by every listing and search response.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
    /// `ceil(total / size)`; 0 when there are no results.
    pub pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, pagination: Pagination) -> Self {
        Self {
            items,
            total,
            page: pagination.page,
            size: pagination.size,
            pages: (total + pagination.size - 1) / pagination.size,
        }
    }
}

/// Paginated listing of the owner's documents.
pub async fn documents(
    pool: &SqlitePool,
    owner: &str,
    pagination: Pagination,
    search: Option<&str>,
) -> Result<Page<Document>> {
    let (items, total) =
        store::list_documents(pool, owner, search, pagination.size, pagination.offset()).await?;
    Ok(Page::new(items, total, pagination))
}

/// Paginated chunks of one document. The ownership check happens here, before
/// any chunk row is read.
pub async fn document_chunks(
    pool: &SqlitePool,
    owner: &str,
    document_id: i64,
    pagination: Pagination,
    search: Option<&str>,
) -> Result<Page<Chunk>> {
    store::get_document(pool, document_id, owner).await?;
    let (items, total) =
        store::list_chunks(pool, document_id, search, pagination.size, pagination.offset()).await?;
    Ok(Page::new(items, total, pagination))
}

/// Paginated cross-document chunk search, owner-scoped.
pub async fn chunk_search(
    pool: &SqlitePool,
    owner: &str,
    query_text: &str,
    document_id: Option<i64>,
    pagination: Pagination,
) -> Result<Page<Chunk>> {
    let (items, total) = store::search_chunks(
        pool,
        owner,
        query_text,
        document_id,
        pagination.size,
        pagination.offset(),
    )
    .await?;
    Ok(Page::new(items, total, pagination))
}
