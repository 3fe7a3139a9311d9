//! # Tessera Storage Layer
//!
//! RocksDB-backed persistence for Tessera subsystems that own a dedicated
//! database, such as the evidence pool.
//!
//! The [`Database`] wrapper exposes the sorted key/value contract those
//! subsystems rely on: point lookups, durable (`sync`) writes, and prefix
//! iteration in ascending key order.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod db;

pub use db::{Database, DatabaseConfig, DbIterator};

use thiserror::Error;

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;
