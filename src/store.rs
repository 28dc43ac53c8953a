//! Transactional persistence boundary over SQLite.
//!
//! Every write is a single transaction: a document row and its full chunk set
//! commit together or not at all. Reads are always owner-scoped; an id that
//! exists under a different owner is reported as not found, exactly like a
//! missing id. Pagination inputs arrive pre-validated from the query layer.

use sqlx::{Row, SqlitePool};

use crate::error::{Error, Result};
use crate::models::{format_ts_iso, Chunk, Document, NewDocument, PageText};

/// Inserts one document and all of its chunks atomically.
///
/// A constraint violation on any chunk (duplicate page number, broken foreign
/// key) rolls the whole transaction back and surfaces as [`Error::Persistence`];
/// no partial rows are ever visible to readers.
pub async fn create_document_with_chunks(
    pool: &SqlitePool,
    new_doc: &NewDocument,
    pages: &[PageText],
) -> Result<Document> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO documents (title, filename, total_pages, size, upload_date, uploaded_by)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&new_doc.title)
    .bind(&new_doc.filename)
    .bind(new_doc.total_pages)
    .bind(new_doc.size)
    .bind(new_doc.upload_date)
    .bind(&new_doc.uploaded_by)
    .execute(&mut *tx)
    .await
    .map_err(|e| Error::Persistence(e.to_string()))?;

    let document_id = result.last_insert_rowid();

    for page in pages {
        sqlx::query("INSERT INTO chunks (document_id, page_number, content) VALUES (?, ?, ?)")
            .bind(document_id)
            .bind(page.number as i64)
            .bind(&page.text)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Persistence(e.to_string()))?;
    }

    tx.commit().await.map_err(|e| Error::Persistence(e.to_string()))?;

    Ok(Document {
        id: document_id,
        title: new_doc.title.clone(),
        filename: new_doc.filename.clone(),
        total_pages: new_doc.total_pages,
        size: new_doc.size,
        uploaded_by: new_doc.uploaded_by.clone(),
        upload_date: format_ts_iso(new_doc.upload_date),
    })
}

/// Fetches one document, owner-checked.
pub async fn get_document(pool: &SqlitePool, id: i64, owner: &str) -> Result<Document> {
    let row = sqlx::query(
        r#"
        SELECT id, title, filename, total_pages, size, upload_date, uploaded_by
        FROM documents
        WHERE id = ? AND uploaded_by = ?
        "#,
    )
    .bind(id)
    .bind(owner)
    .fetch_optional(pool)
    .await?;

    row.map(document_from_row)
        .ok_or(Error::NotFound("document"))
}

/// Lists the owner's documents with an optional case-insensitive substring
/// filter on title or stored filename. Ordered by id ascending (insertion
/// order), standard offset pagination. Returns the page plus the unpaginated
/// total.
pub async fn list_documents(
    pool: &SqlitePool,
    owner: &str,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Document>, i64)> {
    let pattern = search.map(like_pattern);

    let total: i64 = match &pattern {
        Some(p) => {
            sqlx::query_scalar(
                r#"
                SELECT COUNT(*) FROM documents
                WHERE uploaded_by = ?
                  AND (LOWER(title) LIKE ? OR LOWER(filename) LIKE ?)
                "#,
            )
            .bind(owner)
            .bind(p)
            .bind(p)
            .fetch_one(pool)
            .await?
        }
        None => {
            sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE uploaded_by = ?")
                .bind(owner)
                .fetch_one(pool)
                .await?
        }
    };

    let rows = match &pattern {
        Some(p) => {
            sqlx::query(
                r#"
                SELECT id, title, filename, total_pages, size, upload_date, uploaded_by
                FROM documents
                WHERE uploaded_by = ?
                  AND (LOWER(title) LIKE ? OR LOWER(filename) LIKE ?)
                ORDER BY id ASC
                LIMIT ? OFFSET ?
                "#,
            )
            .bind(owner)
            .bind(p)
            .bind(p)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                r#"
                SELECT id, title, filename, total_pages, size, upload_date, uploaded_by
                FROM documents
                WHERE uploaded_by = ?
                ORDER BY id ASC
                LIMIT ? OFFSET ?
                "#,
            )
            .bind(owner)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
    };

    Ok((rows.into_iter().map(document_from_row).collect(), total))
}

/// Lists one document's chunks in page order, optionally filtered by a
/// case-insensitive substring on content. The caller is responsible for the
/// ownership check on the document itself.
pub async fn list_chunks(
    pool: &SqlitePool,
    document_id: i64,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Chunk>, i64)> {
    let pattern = search.map(like_pattern);

    let total: i64 = match &pattern {
        Some(p) => {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM chunks WHERE document_id = ? AND LOWER(content) LIKE ?",
            )
            .bind(document_id)
            .bind(p)
            .fetch_one(pool)
            .await?
        }
        None => {
            sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE document_id = ?")
                .bind(document_id)
                .fetch_one(pool)
                .await?
        }
    };

    let rows = match &pattern {
        Some(p) => {
            sqlx::query(
                r#"
                SELECT id, document_id, page_number, content
                FROM chunks
                WHERE document_id = ? AND LOWER(content) LIKE ?
                ORDER BY page_number ASC
                LIMIT ? OFFSET ?
                "#,
            )
            .bind(document_id)
            .bind(p)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                r#"
                SELECT id, document_id, page_number, content
                FROM chunks
                WHERE document_id = ?
                ORDER BY page_number ASC
                LIMIT ? OFFSET ?
                "#,
            )
            .bind(document_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
    };

    Ok((rows.into_iter().map(chunk_from_row).collect(), total))
}

/// Substring search over chunk content across all of the owner's documents,
/// optionally narrowed to one document id. Ordered by document id then page
/// number for deterministic pagination.
pub async fn search_chunks(
    pool: &SqlitePool,
    owner: &str,
    query_text: &str,
    document_id: Option<i64>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Chunk>, i64)> {
    let pattern = like_pattern(query_text);

    let total: i64 = match document_id {
        Some(doc_id) => {
            sqlx::query_scalar(
                r#"
                SELECT COUNT(*)
                FROM chunks c
                JOIN documents d ON d.id = c.document_id
                WHERE d.uploaded_by = ? AND c.document_id = ? AND LOWER(c.content) LIKE ?
                "#,
            )
            .bind(owner)
            .bind(doc_id)
            .bind(&pattern)
            .fetch_one(pool)
            .await?
        }
        None => {
            sqlx::query_scalar(
                r#"
                SELECT COUNT(*)
                FROM chunks c
                JOIN documents d ON d.id = c.document_id
                WHERE d.uploaded_by = ? AND LOWER(c.content) LIKE ?
                "#,
            )
            .bind(owner)
            .bind(&pattern)
            .fetch_one(pool)
            .await?
        }
    };

    let rows = match document_id {
        Some(doc_id) => {
            sqlx::query(
                r#"
                SELECT c.id, c.document_id, c.page_number, c.content
                FROM chunks c
                JOIN documents d ON d.id = c.document_id
                WHERE d.uploaded_by = ? AND c.document_id = ? AND LOWER(c.content) LIKE ?
                ORDER BY c.document_id ASC, c.page_number ASC
                LIMIT ? OFFSET ?
                "#,
            )
            .bind(owner)
            .bind(doc_id)
            .bind(&pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                r#"
                SELECT c.id, c.document_id, c.page_number, c.content
                FROM chunks c
                JOIN documents d ON d.id = c.document_id
                WHERE d.uploaded_by = ? AND LOWER(c.content) LIKE ?
                ORDER BY c.document_id ASC, c.page_number ASC
                LIMIT ? OFFSET ?
                "#,
            )
            .bind(owner)
            .bind(&pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
    };

    Ok((rows.into_iter().map(chunk_from_row).collect(), total))
}

/// Fetches one chunk, checking ownership through the owning document.
pub async fn get_chunk(pool: &SqlitePool, chunk_id: i64, owner: &str) -> Result<Chunk> {
    let row = sqlx::query(
        r#"
        SELECT c.id, c.document_id, c.page_number, c.content
        FROM chunks c
        JOIN documents d ON d.id = c.document_id
        WHERE c.id = ? AND d.uploaded_by = ?
        "#,
    )
    .bind(chunk_id)
    .bind(owner)
    .fetch_optional(pool)
    .await?;

    row.map(chunk_from_row).ok_or(Error::NotFound("chunk"))
}

fn like_pattern(term: &str) -> String {
    format!("%{}%", term.to_lowercase())
}

fn document_from_row(row: sqlx::sqlite::SqliteRow) -> Document {
    let upload_date: i64 = row.get("upload_date");
    Document {
        id: row.get("id"),
        title: row.get("title"),
        filename: row.get("filename"),
        total_pages: row.get("total_pages"),
        size: row.get("size"),
        uploaded_by: row.get("uploaded_by"),
        upload_date: format_ts_iso(upload_date),
    }
}

fn chunk_from_row(row: sqlx::sqlite::SqliteRow) -> Chunk {
    Chunk {
        id: row.get("id"),
        document_id: row.get("document_id"),
        page_number: row.get("page_number"),
        content: row.get("content"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        // One connection so every query sees the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        pool
    }

    fn new_doc(filename: &str, owner: &str, pages: i64) -> NewDocument {
        NewDocument {
            title: "Annual Report".to_string(),
            filename: filename.to_string(),
            total_pages: pages,
            size: 1024,
            uploaded_by: owner.to_string(),
            upload_date: 1_700_000_000,
        }
    }

    fn page(n: u32, text: &str) -> PageText {
        PageText {
            number: n,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn create_persists_document_and_contiguous_chunks() {
        let pool = memory_pool().await;
        let pages = vec![page(1, "alpha"), page(2, "bravo"), page(3, "")];

        let doc = create_document_with_chunks(&pool, &new_doc("a.pdf", "a@x.com", 3), &pages)
            .await
            .unwrap();
        assert_eq!(doc.total_pages, 3);

        let (chunks, total) = list_chunks(&pool, doc.id, None, 10, 0).await.unwrap();
        assert_eq!(total, 3);
        let numbers: Vec<i64> = chunks.iter().map(|c| c.page_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(chunks.iter().all(|c| c.document_id == doc.id));
        // Page 3 had no extractable text: empty string, not a missing row.
        assert_eq!(chunks[2].content, "");
    }

    #[tokio::test]
    async fn duplicate_page_number_rolls_back_everything() {
        let pool = memory_pool().await;
        let pages = vec![page(1, "alpha"), page(1, "dupe")];

        let err = create_document_with_chunks(&pool, &new_doc("b.pdf", "a@x.com", 2), &pages)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));

        let docs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&pool)
            .await
            .unwrap();
        let chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!((docs, chunks), (0, 0));
    }

    #[tokio::test]
    async fn duplicate_stored_filename_is_persistence_error() {
        let pool = memory_pool().await;
        let pages = vec![page(1, "alpha")];
        create_document_with_chunks(&pool, &new_doc("same.pdf", "a@x.com", 1), &pages)
            .await
            .unwrap();

        let err = create_document_with_chunks(&pool, &new_doc("same.pdf", "a@x.com", 1), &pages)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
    }

    #[tokio::test]
    async fn listing_is_owner_scoped() {
        let pool = memory_pool().await;
        let pages = vec![page(1, "alpha")];
        create_document_with_chunks(&pool, &new_doc("a.pdf", "a@x.com", 1), &pages)
            .await
            .unwrap();
        create_document_with_chunks(&pool, &new_doc("b.pdf", "b@x.com", 1), &pages)
            .await
            .unwrap();

        let (docs, total) = list_documents(&pool, "a@x.com", None, 10, 0).await.unwrap();
        assert_eq!(total, 1);
        assert!(docs.iter().all(|d| d.uploaded_by == "a@x.com"));

        let (none, total) = list_documents(&pool, "c@x.com", None, 10, 0).await.unwrap();
        assert_eq!(total, 0);
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn title_search_is_case_insensitive() {
        let pool = memory_pool().await;
        let pages = vec![page(1, "alpha")];
        create_document_with_chunks(&pool, &new_doc("report.pdf", "a@x.com", 1), &pages)
            .await
            .unwrap();

        for term in ["annual", "REPORT", "Annual Report"] {
            let (docs, total) = list_documents(&pool, "a@x.com", Some(term), 10, 0)
                .await
                .unwrap();
            assert_eq!(total, 1, "search term {:?} should match", term);
            assert_eq!(docs.len(), 1);
        }

        let (_, total) = list_documents(&pool, "a@x.com", Some("missing"), 10, 0)
            .await
            .unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn pagination_offsets_are_stable() {
        let pool = memory_pool().await;
        let pages = vec![page(1, "alpha")];
        for i in 0..5 {
            create_document_with_chunks(
                &pool,
                &new_doc(&format!("doc{}.pdf", i), "a@x.com", 1),
                &pages,
            )
            .await
            .unwrap();
        }

        let (first, total) = list_documents(&pool, "a@x.com", None, 2, 0).await.unwrap();
        let (second, _) = list_documents(&pool, "a@x.com", None, 2, 2).await.unwrap();
        let (last, _) = list_documents(&pool, "a@x.com", None, 2, 4).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        assert_eq!(last.len(), 1);

        let mut ids: Vec<i64> = first
            .iter()
            .chain(second.iter())
            .chain(last.iter())
            .map(|d| d.id)
            .collect();
        let sorted = ids.clone();
        ids.sort();
        assert_eq!(ids, sorted, "pages walk ids in ascending order");
    }

    #[tokio::test]
    async fn cross_owner_get_looks_like_missing() {
        let pool = memory_pool().await;
        let pages = vec![page(1, "alpha")];
        let doc = create_document_with_chunks(&pool, &new_doc("a.pdf", "a@x.com", 1), &pages)
            .await
            .unwrap();

        assert!(get_document(&pool, doc.id, "a@x.com").await.is_ok());
        assert!(matches!(
            get_document(&pool, doc.id, "b@x.com").await.unwrap_err(),
            Error::NotFound(_)
        ));
        assert!(matches!(
            get_document(&pool, 9999, "a@x.com").await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn chunk_search_scopes_and_narrows() {
        let pool = memory_pool().await;
        let doc_a = create_document_with_chunks(
            &pool,
            &new_doc("a.pdf", "a@x.com", 2),
            &[page(1, "the quick brown fox"), page(2, "carbon emissions data")],
        )
        .await
        .unwrap();
        let doc_b = create_document_with_chunks(
            &pool,
            &new_doc("b.pdf", "b@x.com", 1),
            &[page(1, "carbon pricing report")],
        )
        .await
        .unwrap();

        // Only owner a's chunk matches, despite owner b's matching content.
        let (hits, total) = search_chunks(&pool, "a@x.com", "CARBON", None, 10, 0)
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(hits[0].document_id, doc_a.id);
        assert_eq!(hits[0].page_number, 2);

        // Narrowed to a document that has no match.
        let (_, total) = search_chunks(&pool, "a@x.com", "carbon", Some(doc_b.id), 10, 0)
            .await
            .unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn chunk_fetch_checks_ownership_via_document() {
        let pool = memory_pool().await;
        let doc = create_document_with_chunks(
            &pool,
            &new_doc("a.pdf", "a@x.com", 1),
            &[page(1, "alpha")],
        )
        .await
        .unwrap();
        let (chunks, _) = list_chunks(&pool, doc.id, None, 10, 0).await.unwrap();
        let chunk_id = chunks[0].id;

        assert!(get_chunk(&pool, chunk_id, "a@x.com").await.is_ok());
        assert!(matches!(
            get_chunk(&pool, chunk_id, "b@x.com").await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn chunk_listing_filters_on_content() {
        let pool = memory_pool().await;
        let doc = create_document_with_chunks(
            &pool,
            &new_doc("a.pdf", "a@x.com", 3),
            &[page(1, "alpha"), page(2, "Bravo Section"), page(3, "charlie")],
        )
        .await
        .unwrap();

        let (chunks, total) = list_chunks(&pool, doc.id, Some("bravo"), 10, 0)
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(chunks[0].page_number, 2);
    }
}
