//! Statement submission.
//!
//! Provides query execution on a borrowed connection, independent of how
//! the resulting rows are consumed.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::connection::ConnectionHandle;
use crate::error::Result;
use crate::query::RowCursor;

/// Rows requested per fetch unless configured otherwise.
pub const DEFAULT_FETCH_SIZE: usize = 100;

/// Submits statements on an open connection.
pub struct QueryExecutor<'a> {
    handle: &'a ConnectionHandle,
    fetch_size: usize,
}

impl<'a> QueryExecutor<'a> {
    /// Creates a new query executor.
    pub fn new(handle: &'a ConnectionHandle) -> Self {
        Self {
            handle,
            fetch_size: DEFAULT_FETCH_SIZE,
        }
    }

    /// Sets how many rows the engine should return per fetch (at least one).
    pub fn with_fetch_size(mut self, fetch_size: usize) -> Self {
        self.fetch_size = fetch_size.max(1);
        self
    }

    pub fn fetch_size(&self) -> usize {
        self.fetch_size
    }

    /// Submits `sql` and returns a cursor over its results.
    ///
    /// The statement is not validated locally: syntax and execution faults
    /// come back from the engine as query errors. Fails with `ClosedHandle`
    /// if the connection has been closed. Nothing is cached; every call
    /// re-runs the statement remotely.
    pub async fn execute(&self, sql: &str) -> Result<RowCursor> {
        let session = self.handle.session();
        session.ensure_open()?;

        info!("Executing: {}", sql);
        let start = Instant::now();
        let remote = session.engine().submit(sql, self.fetch_size).await?;
        debug!(
            "Statement accepted in {:?} as cursor {} ({} columns)",
            start.elapsed(),
            remote.id,
            remote.columns.len()
        );

        Ok(RowCursor::new(Arc::clone(session), remote))
    }
}
