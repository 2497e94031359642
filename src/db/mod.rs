//! Query engine abstraction layer for db-probe.
//!
//! Provides trait-based interfaces for remote query engines and the drivers
//! that open sessions against them, so engines can be used interchangeably.
//! Drivers are registered by URL scheme at start-up and selected from the
//! configured endpoint.

mod mock;
mod mock_sql;
mod types;

pub use mock::{MockCatalog, MockDriver, MockEngineStats, MockTable, MOCK_SCHEME};
pub use types::{ColumnInfo, Row, Value};

use crate::config::ConnectionConfig;
use crate::credentials::Credentials;
use crate::error::{ProbeError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Engine-side handle for the results of one submitted statement.
#[derive(Debug, Clone)]
pub struct RemoteCursor {
    /// Engine-assigned identifier.
    pub id: u64,

    /// Result schema, shared with every row of the result set.
    pub columns: Arc<[ColumnInfo]>,
}

/// Trait defining an open session against a remote query engine.
///
/// Calls are issued strictly in sequence by the session layer; engines never
/// see overlapping requests from one session.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Submits a statement. Syntax and execution faults are reported here.
    async fn submit(&self, sql: &str, fetch_size: usize) -> Result<RemoteCursor>;

    /// Fetches the next batch of rows, or `None` once the result set is exhausted.
    async fn fetch(&self, cursor: &RemoteCursor) -> Result<Option<Vec<Row>>>;

    /// Releases engine-side resources held by the cursor.
    async fn release(&self, cursor: &RemoteCursor) -> Result<()>;

    /// Closes the session.
    async fn close(&self) -> Result<()>;
}

/// Factory for engine sessions, selected by endpoint URL scheme.
#[async_trait]
pub trait Driver: Send + Sync {
    /// URL scheme this driver serves (e.g. `mock`).
    fn scheme(&self) -> &str;

    /// Opens a session. Unreachable endpoints and rejected credentials are
    /// connection errors.
    async fn connect(
        &self,
        config: &ConnectionConfig,
        credentials: &Credentials,
    ) -> Result<Box<dyn QueryEngine>>;
}

/// Registry of the drivers available to this process.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: BTreeMap<String, Arc<dyn Driver>>,
}

impl DriverRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a driver, replacing any driver previously registered for its scheme.
    pub fn register(&mut self, driver: Arc<dyn Driver>) -> Option<Arc<dyn Driver>> {
        let scheme = driver.scheme().to_lowercase();
        debug!("Registering driver for scheme '{}'", scheme);
        self.drivers.insert(scheme, driver)
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with_driver(mut self, driver: Arc<dyn Driver>) -> Self {
        self.register(driver);
        self
    }

    /// Returns the registered schemes, sorted.
    pub fn schemes(&self) -> Vec<&str> {
        self.drivers.keys().map(String::as_str).collect()
    }

    /// Locates the driver serving the given endpoint URL.
    pub fn resolve(&self, endpoint: &str) -> Result<Arc<dyn Driver>> {
        let url = Url::parse(endpoint)
            .map_err(|e| ProbeError::connection(format!("Invalid endpoint '{endpoint}': {e}")))?;

        self.drivers.get(url.scheme()).cloned().ok_or_else(|| {
            ProbeError::connection(format!(
                "No driver registered for scheme '{}' (available: {})",
                url.scheme(),
                self.schemes().join(", ")
            ))
        })
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_registered_scheme() {
        let registry = DriverRegistry::new().with_driver(Arc::new(MockDriver::default()));
        let driver = registry.resolve("mock://engine").unwrap();
        assert_eq!(driver.scheme(), "mock");
    }

    #[test]
    fn test_resolve_unknown_scheme() {
        let registry = DriverRegistry::new().with_driver(Arc::new(MockDriver::default()));
        let err = registry
            .resolve("jdbc:awsathena://athena.us-east-1.amazonaws.com:443")
            .err()
            .unwrap();
        assert!(matches!(err, ProbeError::Connection(_)));
        assert!(err.to_string().contains("No driver registered for scheme 'jdbc'"));
        assert!(err.to_string().contains("mock"));
    }

    #[test]
    fn test_resolve_invalid_endpoint() {
        let registry = DriverRegistry::new();
        let err = registry.resolve("not a url").err().unwrap();
        assert!(matches!(err, ProbeError::Connection(_)));
    }

    #[test]
    fn test_register_replaces_previous_driver() {
        let mut registry = DriverRegistry::new();
        assert!(registry.register(Arc::new(MockDriver::default())).is_none());
        assert!(registry.register(Arc::new(MockDriver::default())).is_some());
        assert_eq!(registry.schemes(), vec!["mock"]);
    }
}
