//! Connection handle: owns one session against a remote engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ConnectionConfig;
use crate::credentials::{self, CredentialProvider};
use crate::db::{DriverRegistry, QueryEngine};
use crate::error::{ProbeError, Result};
use crate::query::QueryExecutor;

/// Session state shared between a handle and the cursors it produced.
///
/// Cursors hold a clone of the `Arc` but never close the session.
pub(crate) struct Session {
    engine: Box<dyn QueryEngine>,
    closed: AtomicBool,
    endpoint: String,
}

impl Session {
    pub(crate) fn engine(&self) -> &dyn QueryEngine {
        self.engine.as_ref()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Fails with `ClosedHandle` once the connection has been closed.
    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(ProbeError::closed(format!(
                "connection to {} is closed",
                self.endpoint
            )));
        }
        Ok(())
    }
}

/// An open connection to a remote query engine.
///
/// States are Open and Closed; `close` moves to Closed exactly once and is a
/// no-op afterwards. There is no implicit reconnection.
pub struct ConnectionHandle {
    session: Arc<Session>,
    config: ConnectionConfig,
}

impl ConnectionHandle {
    /// Opens a connection using the credential provider named in the config.
    pub async fn open(registry: &DriverRegistry, config: ConnectionConfig) -> Result<Self> {
        let provider =
            credentials::provider_for(config.credential_provider(), config.credential_args())?;
        Self::open_with_provider(registry, config, provider.as_ref()).await
    }

    /// Opens a connection, resolving credentials through `provider`.
    ///
    /// The provider is asked exactly once. An unregistered endpoint scheme,
    /// an unreachable endpoint, or rejected credentials are connection errors;
    /// provider failures surface as credential errors.
    pub async fn open_with_provider(
        registry: &DriverRegistry,
        config: ConnectionConfig,
        provider: &dyn CredentialProvider,
    ) -> Result<Self> {
        let driver = registry.resolve(config.endpoint())?;

        info!("Connecting to {}", config.display_string());
        let credentials = provider.resolve()?;
        debug!(
            "Resolved credentials via '{}' provider (access key {})",
            provider.name(),
            credentials.access_key()
        );

        let engine = driver.connect(&config, &credentials).await?;
        debug!("Connected to {}", config.endpoint());

        Ok(Self {
            session: Arc::new(Session {
                engine,
                closed: AtomicBool::new(false),
                endpoint: config.endpoint().to_string(),
            }),
            config,
        })
    }

    /// Returns an executor for submitting statements on this connection.
    pub fn executor(&self) -> QueryExecutor<'_> {
        QueryExecutor::new(self)
    }

    /// Closes the connection, releasing the remote session.
    ///
    /// Cursors opened on this connection can no longer be advanced. Calling
    /// `close` again is a no-op.
    pub async fn close(&self) -> Result<()> {
        if self.session.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!("Closing connection to {}", self.config.endpoint());
        self.session.engine.close().await
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_closed()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub(crate) fn session(&self) -> &Arc<Session> {
        &self.session
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if !self.session.is_closed() {
            warn!(
                "Connection to {} dropped without being closed",
                self.config.endpoint()
            );
        }
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("endpoint", &self.config.endpoint())
            .field("closed", &self.is_closed())
            .finish()
    }
}
