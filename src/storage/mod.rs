mod comments;
mod engagement;
mod follows;
mod notifications;
mod posts;
mod reports;
mod search;
mod users;

use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use thiserror::Error;

use crate::state::DbPool;

pub(crate) use self::notifications::insert_notification;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(&'static str),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage access layer. Every entity operation goes through here; each
/// multi-statement mutation runs in a single immediate transaction so
/// association rows and their denormalized counters never diverge.
#[derive(Clone)]
pub struct Storage {
    pool: DbPool,
}

impl Storage {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    fn conn(&self) -> StorageResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Run `f` inside a `BEGIN IMMEDIATE` transaction, committing on `Ok`.
    fn write<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Escape LIKE wildcards so user input matches literally (`ESCAPE '\'`).
pub(crate) fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn exists(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> StorageResult<bool> {
    Ok(conn.query_row(sql, params, |row| row.get(0))?)
}

fn optional<T>(result: rusqlite::Result<T>) -> StorageResult<Option<T>> {
    Ok(result.optional()?)
}
