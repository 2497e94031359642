//! Scoped acquisition of a connection and a cursor.
//!
//! `ResourceGuard` runs one statement end to end and releases the cursor and
//! then the connection on every exit path: normal completion, a failing row
//! handler, or an engine error at any stage.

use tracing::{debug, warn};

use crate::config::ConnectionConfig;
use crate::connection::ConnectionHandle;
use crate::credentials::{self, CredentialProvider};
use crate::db::{DriverRegistry, Row};
use crate::error::{ProbeError, Result};
use crate::query::{RowCursor, DEFAULT_FETCH_SIZE};

/// Lifecycle of one client run.
///
/// `Idle -> Connecting -> Connected -> Executing -> Streaming -> Closing -> Closed`,
/// where any live state may jump straight to `Closing` on error. `Closed` is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Idle,
    Connecting,
    Connected,
    Executing,
    Streaming,
    Closing,
    Closed,
}

impl ClientState {
    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: ClientState) -> bool {
        use ClientState::*;
        match (self, next) {
            (Closed, _) | (Closing, Closing) => false,
            (_, Closing) => true,
            (Idle, Connecting)
            | (Connecting, Connected)
            | (Connected, Executing)
            | (Executing, Streaming)
            | (Closing, Closed) => true,
            _ => false,
        }
    }
}

/// Runs a statement with guaranteed, ordered release of its resources.
///
/// A guard is single-use: once it reaches `Closed` it rejects further runs.
/// Errors raised while releasing resources are logged and kept; see
/// [`cleanup_errors`](Self::cleanup_errors).
pub struct ResourceGuard<'r> {
    registry: &'r DriverRegistry,
    fetch_size: usize,
    state: ClientState,
    cleanup_errors: Vec<ProbeError>,
}

impl<'r> ResourceGuard<'r> {
    pub fn new(registry: &'r DriverRegistry) -> Self {
        Self {
            registry,
            fetch_size: DEFAULT_FETCH_SIZE,
            state: ClientState::Idle,
            cleanup_errors: Vec::new(),
        }
    }

    /// Sets how many rows are requested per fetch.
    pub fn with_fetch_size(mut self, fetch_size: usize) -> Self {
        self.fetch_size = fetch_size.max(1);
        self
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Errors raised while closing the cursor or connection that were not
    /// returned to the caller.
    pub fn cleanup_errors(&self) -> &[ProbeError] {
        &self.cleanup_errors
    }

    /// Opens a connection with the configured credential provider, runs
    /// `sql`, and hands each row to `on_row`. Returns the number of rows
    /// handled.
    pub async fn run<F>(&mut self, config: ConnectionConfig, sql: &str, on_row: F) -> Result<usize>
    where
        F: FnMut(&Row) -> Result<()>,
    {
        self.ensure_idle()?;
        let provider =
            match credentials::provider_for(config.credential_provider(), config.credential_args()) {
                Ok(provider) => provider,
                Err(e) => {
                    self.abort();
                    return Err(e);
                }
            };
        self.run_with_provider(config, provider.as_ref(), sql, on_row)
            .await
    }

    /// Like [`run`](Self::run), resolving credentials through `provider`.
    ///
    /// The first error wins. When the run itself succeeded but releasing a
    /// resource failed, that release error is returned instead of the row count.
    pub async fn run_with_provider<F>(
        &mut self,
        config: ConnectionConfig,
        provider: &dyn CredentialProvider,
        sql: &str,
        mut on_row: F,
    ) -> Result<usize>
    where
        F: FnMut(&Row) -> Result<()>,
    {
        self.ensure_idle()?;
        self.enter(ClientState::Connecting);

        let handle = match ConnectionHandle::open_with_provider(self.registry, config, provider).await
        {
            Ok(handle) => handle,
            Err(e) => {
                self.abort();
                return Err(e);
            }
        };
        self.enter(ClientState::Connected);

        let outcome = self.stream(&handle, sql, &mut on_row).await;

        if self.state != ClientState::Closing {
            self.enter(ClientState::Closing);
        }
        if let Err(e) = handle.close().await {
            self.record(e);
        }
        self.enter(ClientState::Closed);

        match outcome {
            Ok(_) if !self.cleanup_errors.is_empty() => Err(self.cleanup_errors.remove(0)),
            other => other,
        }
    }

    async fn stream<F>(&mut self, handle: &ConnectionHandle, sql: &str, on_row: &mut F) -> Result<usize>
    where
        F: FnMut(&Row) -> Result<()>,
    {
        self.enter(ClientState::Executing);
        let mut cursor = handle
            .executor()
            .with_fetch_size(self.fetch_size)
            .execute(sql)
            .await?;
        self.enter(ClientState::Streaming);

        let drained = drain(&mut cursor, on_row).await;

        self.enter(ClientState::Closing);
        if let Err(e) = cursor.close().await {
            self.record(e);
        }
        drained
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.state != ClientState::Idle {
            return Err(ProbeError::closed(format!(
                "resource guard already used (state {:?})",
                self.state
            )));
        }
        Ok(())
    }

    fn abort(&mut self) {
        self.enter(ClientState::Closing);
        self.enter(ClientState::Closed);
    }

    fn enter(&mut self, next: ClientState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal client transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!("Client state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn record(&mut self, err: ProbeError) {
        warn!("Error while releasing resources: {}", err);
        self.cleanup_errors.push(err);
    }
}

async fn drain<F>(cursor: &mut RowCursor, on_row: &mut F) -> Result<usize>
where
    F: FnMut(&Row) -> Result<()>,
{
    let mut count = 0;
    while let Some(row) = cursor.next().await? {
        on_row(&row)?;
        count += 1;
    }
    Ok(count)
}
