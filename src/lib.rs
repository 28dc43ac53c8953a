//! # PDF Shelf
//!
//! A small authenticated service for uploading PDF documents, extracting their
//! text page by page, and browsing or substring-searching the result.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌──────────┐
//! │  Upload  │──▶│  Ingestion   │──▶│  SQLite   │
//! │ (PDF)    │   │ Extract+Tx  │   │ docs+pages│
//! └──────────┘   └─────────────┘   └────┬─────┘
//!                                       │
//!                   ┌───────────────────┤
//!                   ▼                   ▼
//!              ┌──────────┐       ┌──────────┐
//!              │   CLI    │       │   HTTP   │
//!              │ (shelf)  │       │  (axum)  │
//!              └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! shelf init                    # create database
//! shelf ingest report.pdf       # extract and store a PDF
//! shelf search "emissions"      # substring search over page text
//! shelf serve                   # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Crate-wide error type |
//! | [`models`] | Core data types |
//! | [`extract`] | Per-page PDF text extraction |
//! | [`storage`] | Durable storage for original upload bytes |
//! | [`store`] | Transactional document/chunk persistence |
//! | [`ingest`] | Upload validation → extraction → atomic persist |
//! | [`query`] | Pagination validation and response envelopes |
//! | [`auth`] | Demo login and bearer-token authentication |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod query;
pub mod server;
pub mod storage;
pub mod store;
