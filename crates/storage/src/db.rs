//! RocksDB wrapper for subsystem-owned databases.
//!
//! Unlike a full node database there are no column families here: a
//! subsystem that owns its database (the evidence pool owns its handle for
//! its whole lifetime) namespaces its keys with its own prefixes, and the
//! flat keyspace keeps prefix iteration trivially correct.

use rocksdb::{
    DBIteratorWithThreadMode, DBWithThreadMode, Direction, IteratorMode, MultiThreaded, Options,
    WriteOptions,
};
use std::path::Path;
use tracing::{debug, info};

use crate::{Result, StorageError};

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the database directory
    pub path: String,
    /// Enable compression (LZ4)
    pub enable_compression: bool,
    /// Maximum number of open files
    pub max_open_files: i32,
    /// Write buffer size in bytes
    pub write_buffer_size: usize,
    /// Maximum number of write buffers
    pub max_write_buffer_number: i32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: String::from("./data/tessera"),
            enable_compression: true,
            max_open_files: 512,
            write_buffer_size: 16 * 1024 * 1024, // 16 MB
            max_write_buffer_number: 4,
        }
    }
}

/// Iterator over database entries in ascending key order.
///
/// When constructed with a prefix, iteration stops at the first key outside
/// the prefix.
pub struct DbIterator<'a> {
    inner: DBIteratorWithThreadMode<'a, DBWithThreadMode<MultiThreaded>>,
    prefix: Option<Vec<u8>>,
    done: bool,
}

impl Iterator for DbIterator<'_> {
    type Item = Result<(Box<[u8]>, Box<[u8]>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.inner.next() {
            Some(Ok((key, value))) => {
                if let Some(prefix) = &self.prefix {
                    if !key.starts_with(prefix) {
                        self.done = true;
                        return None;
                    }
                }
                Some(Ok((key, value)))
            }
            Some(Err(e)) => {
                self.done = true;
                Some(Err(StorageError::Database(e.to_string())))
            }
            None => None,
        }
    }
}

/// RocksDB wrapper with a flat keyspace.
pub struct Database {
    inner: DBWithThreadMode<MultiThreaded>,
    config: DatabaseConfig,
}

impl Database {
    /// Open or create a database at the configured path.
    pub fn open(config: DatabaseConfig) -> Result<Self> {
        info!(path = %config.path, "opening database");

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_max_open_files(config.max_open_files);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(config.max_write_buffer_number);

        if config.enable_compression {
            opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        }

        let db = DBWithThreadMode::<MultiThreaded>::open(&opts, Path::new(&config.path))
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(Self { inner: db, config })
    }

    /// Open a database with default configuration at the given path.
    pub fn open_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = DatabaseConfig {
            path: path.as_ref().to_string_lossy().to_string(),
            ..Default::default()
        };
        Self::open(config)
    }

    /// Get a value by key.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.inner
            .get(key)
            .map_err(|e| StorageError::Database(e.to_string()))
    }

    /// Put a key-value pair.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.inner
            .put(key, value)
            .map_err(|e| StorageError::Database(e.to_string()))
    }

    /// Put a key-value pair and fsync before returning.
    ///
    /// Used for records that must survive a crash at any later point, such
    /// as on-disk format markers.
    pub fn put_sync(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(true);
        self.inner
            .put_opt(key, value, &write_opts)
            .map_err(|e| StorageError::Database(e.to_string()))
    }

    /// Delete a key.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.inner
            .delete(key)
            .map_err(|e| StorageError::Database(e.to_string()))
    }

    /// Check if a key exists.
    pub fn exists(&self, key: &[u8]) -> Result<bool> {
        self.get(key).map(|v| v.is_some())
    }

    /// Iterate over all entries in ascending key order.
    pub fn iterator(&self) -> DbIterator<'_> {
        DbIterator {
            inner: self.inner.iterator(IteratorMode::Start),
            prefix: None,
            done: false,
        }
    }

    /// Iterate over entries whose keys start with `prefix`, in ascending
    /// key order.
    pub fn prefix_iterator(&self, prefix: &[u8]) -> DbIterator<'_> {
        DbIterator {
            inner: self
                .inner
                .iterator(IteratorMode::From(prefix, Direction::Forward)),
            prefix: Some(prefix.to_vec()),
            done: false,
        }
    }

    /// Check whether the database holds no entries at all.
    pub fn is_empty(&self) -> Result<bool> {
        match self.inner.iterator(IteratorMode::Start).next() {
            Some(Ok(_)) => Ok(false),
            Some(Err(e)) => Err(StorageError::Database(e.to_string())),
            None => Ok(true),
        }
    }

    /// Flush memtables to disk.
    pub fn flush(&self) -> Result<()> {
        self.inner
            .flush()
            .map_err(|e| StorageError::Database(e.to_string()))
    }

    /// Get the path to the database.
    pub fn path(&self) -> &str {
        &self.config.path
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        debug!(path = %self.config.path, "closing database");
    }
}
