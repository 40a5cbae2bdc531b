//! Barcode scan history store.
//!
//! Keeps a newest-first history of scans, binds operator metadata to scanned
//! content so repeat scans pick it up again, persists both as a single JSON
//! snapshot in SQLite and exports the history as CSV.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
