//! Crate-wide error type.
//!
//! Variants map one-to-one onto the HTTP error contract; the CLI prints their
//! `Display` form directly.

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    /// The upload's extension is not on the allow-list.
    #[error("only PDF files are allowed")]
    UnsupportedFileType,

    /// The bytes could not be parsed as a PDF.
    #[error("could not read PDF: {0}")]
    MalformedPdf(String),

    /// A write to durable storage or the database failed mid-operation.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The resource does not exist for this owner. Cross-owner access is
    /// reported with this variant, indistinguishable from a missing id.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Login or token validation failed.
    #[error("{0}")]
    Auth(&'static str),

    /// A request parameter failed validation (pagination bounds, etc.).
    #[error("{0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
