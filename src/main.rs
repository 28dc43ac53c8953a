//! # PDF Shelf CLI (`shelf`)
//!
//! Commands for database initialization, local ingestion, browsing, search,
//! and running the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! shelf --config ./config/shelf.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `shelf init` | Create the SQLite database and run schema migrations |
//! | `shelf ingest <file>` | Extract a local PDF and store it |
//! | `shelf list` | Paginated listing of the owner's documents |
//! | `shelf search "<text>"` | Substring search over extracted page text |
//! | `shelf get <id>` | Show one document and its chunks |
//! | `shelf serve` | Start the HTTP API server |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use pdf_shelf::config::{load_config, Config};
use pdf_shelf::models::Document;
use pdf_shelf::query::{self, Pagination};
use pdf_shelf::{db, ingest, migrate, server, store};

/// PDF Shelf — upload PDFs, extract their text per page, and search it.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/shelf.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "shelf",
    about = "PDF Shelf — upload PDFs, extract their text per page, and search it",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/shelf.toml")]
    config: PathBuf,

    /// Owner identity for CLI operations; defaults to the configured demo user.
    #[arg(long, global = true)]
    owner: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the documents/chunks tables.
    /// Idempotent — running it multiple times is safe.
    Init,

    /// Ingest a local PDF file.
    ///
    /// Validates the extension, extracts text page by page, copies the file
    /// into the upload directory, and commits the document together with all
    /// of its page chunks in one transaction.
    Ingest {
        /// Path to the PDF file.
        file: PathBuf,
    },

    /// List the owner's documents.
    List {
        /// Page number (1-based).
        #[arg(long)]
        page: Option<i64>,

        /// Items per page (1-100).
        #[arg(long)]
        size: Option<i64>,

        /// Case-insensitive substring filter on title or stored filename.
        #[arg(long)]
        search: Option<String>,
    },

    /// Search extracted page text across the owner's documents.
    Search {
        /// Text to look for (case-insensitive substring).
        query_text: String,

        /// Narrow the search to one document id.
        #[arg(long)]
        document: Option<i64>,

        /// Page number (1-based).
        #[arg(long)]
        page: Option<i64>,

        /// Items per page (1-100).
        #[arg(long)]
        size: Option<i64>,
    },

    /// Show one document and its chunks.
    Get {
        /// Document id.
        id: i64,

        /// Page number for the chunk listing (1-based).
        #[arg(long)]
        page: Option<i64>,

        /// Chunks per page (1-100).
        #[arg(long)]
        size: Option<i64>,
    },

    /// Start the HTTP API server.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let owner = cli
        .owner
        .clone()
        .unwrap_or_else(|| config.auth.demo_username.clone());

    match cli.command {
        Commands::Init => migrate::run_init(&config).await,
        Commands::Ingest { file } => run_ingest(&config, &file, &owner).await,
        Commands::List { page, size, search } => {
            run_list(&config, &owner, page, size, search.as_deref()).await
        }
        Commands::Search {
            query_text,
            document,
            page,
            size,
        } => run_search(&config, &owner, &query_text, document, page, size).await,
        Commands::Get { id, page, size } => run_get(&config, &owner, id, page, size).await,
        Commands::Serve => server::run_server(&config).await,
    }
}

async fn run_ingest(config: &Config, file: &PathBuf, owner: &str) -> Result<()> {
    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("path has no file name: {}", file.display()))?;
    let bytes = std::fs::read(file)?;

    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;

    let document = ingest::ingest(&pool, config, &bytes, filename, owner).await?;
    pool.close().await;

    println!("ingested {}", filename);
    println!("  id:       {}", document.id);
    println!("  stored:   {}", document.filename);
    println!("  pages:    {}", document.total_pages);
    println!("  size:     {} bytes", document.size);
    println!("  owner:    {}", document.uploaded_by);
    println!("ok");
    Ok(())
}

async fn run_list(
    config: &Config,
    owner: &str,
    page: Option<i64>,
    size: Option<i64>,
    search: Option<&str>,
) -> Result<()> {
    let pagination = Pagination::new(page, size)?;
    let pool = db::connect(config).await?;
    let listing = query::documents(&pool, owner, pagination, search).await?;
    pool.close().await;

    if listing.items.is_empty() {
        println!("No documents.");
        return Ok(());
    }

    for doc in &listing.items {
        print_document(doc);
    }
    println!(
        "page {}/{} ({} total)",
        listing.page, listing.pages, listing.total
    );
    Ok(())
}

async fn run_search(
    config: &Config,
    owner: &str,
    query_text: &str,
    document: Option<i64>,
    page: Option<i64>,
    size: Option<i64>,
) -> Result<()> {
    let pagination = Pagination::new(page, size)?;
    let pool = db::connect(config).await?;
    let results = query::chunk_search(&pool, owner, query_text, document, pagination).await?;
    pool.close().await;

    if results.items.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for chunk in &results.items {
        let excerpt: String = chunk.content.chars().take(120).collect();
        println!(
            "document {} page {}: \"{}\"",
            chunk.document_id,
            chunk.page_number,
            excerpt.replace('\n', " ")
        );
    }
    println!(
        "page {}/{} ({} total)",
        results.page, results.pages, results.total
    );
    Ok(())
}

async fn run_get(
    config: &Config,
    owner: &str,
    id: i64,
    page: Option<i64>,
    size: Option<i64>,
) -> Result<()> {
    let pagination = Pagination::new(page, size)?;
    let pool = db::connect(config).await?;

    let document = match store::get_document(&pool, id, owner).await {
        Ok(doc) => doc,
        Err(e) => {
            pool.close().await;
            return Err(e.into());
        }
    };
    let chunks = query::document_chunks(&pool, owner, id, pagination, None).await?;
    pool.close().await;

    println!("--- Document ---");
    print_document(&document);
    println!();
    println!("--- Chunks ({} of {}) ---", chunks.items.len(), chunks.total);
    for chunk in &chunks.items {
        println!("[page {}]", chunk.page_number);
        println!("{}", chunk.content);
        println!();
    }
    Ok(())
}

fn print_document(doc: &Document) {
    println!(
        "{}. {} ({} pages, {} bytes, uploaded {} by {}) -> {}",
        doc.id, doc.title, doc.total_pages, doc.size, doc.upload_date, doc.uploaded_by, doc.filename
    );
}
