//! HTTP API over the ingestion pipeline and query layer.
//!
//! Every data route requires a bearer token; the handler resolves it to an
//! owner identity up front and everything below the handler works with that
//! string alone. Listing and search responses share the pagination envelope
//! `{items, total, page, size, pages}`.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/auth/login` | Exchange demo credentials for an access token |
//! | `POST` | `/upload` (alias `/pdf/upload`) | Multipart PDF upload |
//! | `GET`  | `/pdfs` (alias `/pdf/documents`) | Paginated document listing |
//! | `GET`  | `/pdf/documents/{id}` | Single document |
//! | `GET`  | `/pdf/documents/{id}/chunks` (alias `/pdf_chunks/{id}`) | One document's chunks |
//! | `GET`  | `/pdf/search/chunks` | Cross-document chunk search |
//! | `GET`  | `/pdf/chunks/{chunk_id}` | Single chunk |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "document not found" } }
//! ```
//!
//! Codes: `bad_request`, `unsupported_file_type`, `malformed_pdf` (400),
//! `unauthorized` (401), `not_found` (404), `persistence_error`, `internal` (500).
//! Cross-owner access is reported as `not_found`, indistinguishable from a
//! missing id.

use axum::{
    extract::{DefaultBodyLimit, FromRequestParts, Multipart, Path, Query, State},
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::config::Config;
use crate::error::Error;
use crate::ingest;
use crate::migrate;
use crate::models::{Chunk, Document};
use crate::query::{self, Page, Pagination};
use crate::store;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    pool: SqlitePool,
}

/// Starts the HTTP server on the configured bind address.
///
/// Runs the (idempotent) schema migrations first, so `shelf serve` works
/// against a fresh database without a separate `init`.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::connect(config).await?;
    migrate::run_migrations(&pool).await?;

    let bind_addr = config.server.bind.clone();
    let state = AppState {
        config: Arc::new(config.clone()),
        pool,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/auth/login", post(handle_login))
        .route("/upload", post(handle_upload))
        .route("/pdf/upload", post(handle_upload))
        .route("/pdfs", get(handle_list_documents))
        .route("/pdf/documents", get(handle_list_documents))
        .route("/pdf/documents/{id}", get(handle_get_document))
        .route("/pdf/documents/{id}/chunks", get(handle_document_chunks))
        .route("/pdf_chunks/{id}", get(handle_document_chunks))
        .route("/pdf/search/chunks", get(handle_search_chunks))
        .route("/pdf/chunks/{chunk_id}", get(handle_get_chunk))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(state.config.storage.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    tracing::info!("listening on http://{}", bind_addr);
    println!("shelf listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"not_found"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let (status, code) = match &err {
            Error::UnsupportedFileType => (StatusCode::BAD_REQUEST, "unsupported_file_type"),
            Error::MalformedPdf(_) => (StatusCode::BAD_REQUEST, "malformed_pdf"),
            Error::InvalidParameter(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Error::Auth(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "persistence_error"),
            Error::Io(_) | Error::Database(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };

        if status.is_server_error() {
            tracing::error!("request failed: {}", err);
        }

        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

/// Query-string extractor whose rejection speaks the JSON error contract.
///
/// Axum's stock `Query` rejection is plain text; a non-numeric `page` or a
/// missing `query_text` must still come back as `{"error": {code, message}}`.
struct Params<T>(T);

impl<S, T> FromRequestParts<S> for Params<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Params(value)),
            Err(rejection) => Err(bad_request(rejection.body_text())),
        }
    }
}

/// Resolves the `Authorization` header to an owner identity.
fn require_user(state: &AppState, headers: &HeaderMap) -> Result<String, AppError> {
    let value = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::from(Error::Auth("not authenticated")))?;

    let token = auth::bearer_token(value)?;
    Ok(auth::authenticate(&state.config.auth, token)?)
}

// ============ POST /auth/login ============

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
}

async fn handle_login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, AppError> {
    auth::verify_login(&state.config.auth, &form.username, &form.password)?;
    let token = auth::issue_token(&state.config.auth, &form.username);
    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}

// ============ POST /upload ============

#[derive(Serialize)]
struct UploadResponse {
    message: String,
    pdf_meta: Document,
}

async fn handle_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let owner = require_user(&state, &headers)?;

    // Take the first field that carries a filename; the UI sends it as `file`.
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("could not read multipart field: {}", e)))?
    {
        if let Some(filename) = field.file_name().map(|s| s.to_string()) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| bad_request(format!("could not read file: {}", e)))?;
            upload = Some((filename, bytes.to_vec()));
            break;
        }
    }

    let (filename, bytes) = upload.ok_or_else(|| bad_request("no file provided"))?;

    let document = ingest::ingest(&state.pool, &state.config, &bytes, &filename, &owner).await?;

    Ok(Json(UploadResponse {
        message: "File uploaded and processed successfully".to_string(),
        pdf_meta: document,
    }))
}

// ============ GET /pdfs ============

#[derive(Deserialize)]
struct ListParams {
    page: Option<i64>,
    size: Option<i64>,
    /// Older clients send `per_page`; `size` wins when both are present.
    per_page: Option<i64>,
    search: Option<String>,
}

async fn handle_list_documents(
    State(state): State<AppState>,
    headers: HeaderMap,
    Params(params): Params<ListParams>,
) -> Result<Json<Page<Document>>, AppError> {
    let owner = require_user(&state, &headers)?;
    let pagination = Pagination::new(params.page, params.size.or(params.per_page))?;

    let page = query::documents(&state.pool, &owner, pagination, params.search.as_deref()).await?;
    Ok(Json(page))
}

// ============ GET /pdf/documents/{id} ============

async fn handle_get_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Document>, AppError> {
    let owner = require_user(&state, &headers)?;
    let document = store::get_document(&state.pool, id, &owner).await?;
    Ok(Json(document))
}

// ============ GET /pdf/documents/{id}/chunks ============

async fn handle_document_chunks(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Params(params): Params<ListParams>,
) -> Result<Json<Page<Chunk>>, AppError> {
    let owner = require_user(&state, &headers)?;
    let pagination = Pagination::new(params.page, params.size.or(params.per_page))?;

    let page = query::document_chunks(
        &state.pool,
        &owner,
        id,
        pagination,
        params.search.as_deref(),
    )
    .await?;
    Ok(Json(page))
}

// ============ GET /pdf/search/chunks ============

#[derive(Deserialize)]
struct SearchParams {
    query_text: String,
    page: Option<i64>,
    size: Option<i64>,
    document_id: Option<i64>,
}

async fn handle_search_chunks(
    State(state): State<AppState>,
    headers: HeaderMap,
    Params(params): Params<SearchParams>,
) -> Result<Json<Page<Chunk>>, AppError> {
    let owner = require_user(&state, &headers)?;
    let pagination = Pagination::new(params.page, params.size)?;

    let page = query::chunk_search(
        &state.pool,
        &owner,
        &params.query_text,
        params.document_id,
        pagination,
    )
    .await?;
    Ok(Json(page))
}

// ============ GET /pdf/chunks/{chunk_id} ============

async fn handle_get_chunk(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(chunk_id): Path<i64>,
) -> Result<Json<Chunk>, AppError> {
    let owner = require_user(&state, &headers)?;
    let chunk = store::get_chunk(&state.pool, chunk_id, &owner).await?;
    Ok(Json(chunk))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
