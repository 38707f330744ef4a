//! `DuckDB` connection pool management.
//!
//! Every pooled connection is a clone of one root connection, so all of them
//! share a single database instance (file-backed or in-memory).

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ::duckdb::Connection;

struct PoolInner {
    db_path: Option<PathBuf>,
    max_pool_size: usize,
    root: Mutex<Connection>,
    idle: Mutex<Vec<Connection>>,
}

/// A connection pool manager for `DuckDB` connections.
#[derive(Clone)]
pub struct DuckDbConnectionManager {
    inner: Arc<PoolInner>,
}

impl DuckDbConnectionManager {
    /// Open the database file and create a pool around it.
    ///
    /// # Errors
    /// Returns an error if the database file cannot be opened or configured.
    pub fn open(path: impl Into<PathBuf>, max_pool_size: usize) -> Result<Self, ::duckdb::Error> {
        let path = path.into();
        let root = Connection::open(path.as_path())?;
        configure_connection(&root)?;
        Ok(Self::from_root(Some(path), root, max_pool_size))
    }

    /// Create a pool backed by a private in-memory database.
    ///
    /// # Errors
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory(max_pool_size: usize) -> Result<Self, ::duckdb::Error> {
        let root = Connection::open_in_memory()?;
        configure_connection(&root)?;
        Ok(Self::from_root(None, root, max_pool_size))
    }

    fn from_root(db_path: Option<PathBuf>, root: Connection, max_pool_size: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                db_path,
                max_pool_size: max_pool_size.max(1),
                root: Mutex::new(root),
                idle: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Acquire a connection from the pool.
    ///
    /// # Errors
    /// Returns an error if a new connection cannot be cloned from the root.
    ///
    /// # Panics
    /// Panics if a pool mutex is poisoned (indicating a previous panic
    /// while holding the lock).
    pub fn acquire(&self) -> Result<PooledConnection, ::duckdb::Error> {
        let idle = self
            .inner
            .idle
            .lock()
            .expect("duckdb connection pool mutex poisoned")
            .pop();

        let connection = match idle {
            Some(connection) => connection,
            None => {
                let root = self
                    .inner
                    .root
                    .lock()
                    .expect("duckdb root connection mutex poisoned");
                let connection = root.try_clone()?;
                configure_connection(&connection)?;
                connection
            }
        };

        Ok(PooledConnection {
            pool: Arc::clone(&self.inner),
            connection: Some(connection),
        })
    }

    /// Path to the database file, `None` for in-memory databases.
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.inner.db_path.as_deref()
    }
}

/// A pooled connection that returns to the pool when dropped.
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    connection: Option<Connection>,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        self.connection
            .as_ref()
            .expect("pooled connection unexpectedly missing")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection
            .as_mut()
            .expect("pooled connection unexpectedly missing")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        let mut idle = self
            .pool
            .idle
            .lock()
            .expect("duckdb connection pool mutex poisoned");
        if idle.len() < self.pool.max_pool_size {
            idle.push(connection);
        }
    }
}

fn configure_connection(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch("PRAGMA disable_progress_bar;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pooled_connections_share_one_in_memory_database() {
        let manager = DuckDbConnectionManager::open_in_memory(2).expect("open");

        {
            let writer = manager.acquire().expect("writer");
            writer
                .execute_batch("CREATE TABLE t (v INTEGER); INSERT INTO t VALUES (7);")
                .expect("write");
        }

        let first = manager.acquire().expect("first");
        let second = manager.acquire().expect("second");
        let value: i64 = second
            .query_row("SELECT v FROM t", [], |row| row.get(0))
            .expect("read");
        assert_eq!(value, 7);
        drop(first);
        drop(second);

        assert!(manager.db_path().is_none());
    }
}
