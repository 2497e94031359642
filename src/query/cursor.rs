//! Row cursor over a submitted statement's results.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use tracing::{debug, warn};

use crate::connection::Session;
use crate::db::{ColumnInfo, RemoteCursor, Row};
use crate::error::{ProbeError, Result};

/// Lifecycle of a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// More rows may be available.
    Active,
    /// The engine reported end of results (or a fetch fault).
    Exhausted,
    /// Released; further reads fail.
    Closed,
}

/// Lazily fetched rows of one statement.
///
/// Rows are pulled from the engine one batch at a time. A cursor cannot be
/// rewound; re-run the statement to read the results again.
pub struct RowCursor {
    session: Arc<Session>,
    remote: RemoteCursor,
    buffer: VecDeque<Row>,
    state: CursorState,
    rows_fetched: usize,
}

impl RowCursor {
    pub(crate) fn new(session: Arc<Session>, remote: RemoteCursor) -> Self {
        Self {
            session,
            remote,
            buffer: VecDeque::new(),
            state: CursorState::Active,
            rows_fetched: 0,
        }
    }

    /// Returns the next row, or `None` once the result set is exhausted.
    ///
    /// Fails with `ClosedHandle` if this cursor or its connection has been
    /// closed. A fetch fault is returned once and leaves the cursor exhausted.
    pub async fn next(&mut self) -> Result<Option<Row>> {
        if self.state == CursorState::Closed {
            return Err(ProbeError::closed("cursor is closed"));
        }
        self.session.ensure_open()?;

        loop {
            if let Some(row) = self.buffer.pop_front() {
                self.rows_fetched += 1;
                return Ok(Some(row));
            }
            if self.state == CursorState::Exhausted {
                return Ok(None);
            }

            match self.session.engine().fetch(&self.remote).await {
                Ok(Some(batch)) => {
                    debug!(
                        "Fetched {} rows from cursor {}",
                        batch.len(),
                        self.remote.id
                    );
                    self.buffer.extend(batch);
                }
                Ok(None) => {
                    debug!(
                        "Cursor {} exhausted after {} rows",
                        self.remote.id, self.rows_fetched
                    );
                    self.state = CursorState::Exhausted;
                }
                Err(e) => {
                    self.state = CursorState::Exhausted;
                    return Err(e);
                }
            }
        }
    }

    /// Adapts the cursor into a stream of rows. The stream ends after the
    /// first error.
    pub fn rows(&mut self) -> BoxStream<'_, Result<Row>> {
        stream::unfold(Some(self), |cursor| async move {
            let cursor = cursor?;
            match cursor.next().await {
                Ok(Some(row)) => Some((Ok(row), Some(cursor))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
        .boxed()
    }

    /// Releases the engine-side cursor. Idempotent.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == CursorState::Closed {
            return Ok(());
        }
        self.state = CursorState::Closed;
        self.buffer.clear();

        // A closed session has already dropped its cursors.
        if self.session.is_closed() {
            return Ok(());
        }
        debug!("Releasing cursor {}", self.remote.id);
        self.session.engine().release(&self.remote).await
    }

    /// Result schema.
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.remote.columns
    }

    /// Number of rows handed out so far.
    pub fn rows_fetched(&self) -> usize {
        self.rows_fetched
    }

    pub fn state(&self) -> CursorState {
        self.state
    }
}

impl Drop for RowCursor {
    fn drop(&mut self) {
        if self.state != CursorState::Closed && !self.session.is_closed() {
            warn!("Cursor {} dropped without being closed", self.remote.id);
        }
    }
}

impl std::fmt::Debug for RowCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowCursor")
            .field("id", &self.remote.id)
            .field("state", &self.state)
            .field("rows_fetched", &self.rows_fetched)
            .finish()
    }
}
