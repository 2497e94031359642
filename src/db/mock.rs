//! Mock query engine for testing.
//!
//! Provides an in-memory engine implementation so the client can be exercised
//! end to end without a remote service. Tables are seeded up front; results
//! are handed out in batches like a remote fetch cursor would, and every call
//! is counted so tests can assert on cleanup behaviour.

use super::mock_sql::{self, Plan, Projection};
use super::{ColumnInfo, Driver, QueryEngine, RemoteCursor, Row, Value};
use crate::config::ConnectionConfig;
use crate::credentials::Credentials;
use crate::error::{ProbeError, Result};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// URL scheme served by the mock driver.
pub const MOCK_SCHEME: &str = "mock";

/// An in-memory table.
#[derive(Debug, Clone, Default)]
pub struct MockTable {
    columns: Vec<ColumnInfo>,
    rows: Vec<Vec<Value>>,
}

impl MockTable {
    /// Creates a table, inferring column types from the first non-null value.
    pub fn from_rows(names: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        if let Some(bad) = rows.iter().find(|r| r.len() != names.len()) {
            return Err(ProbeError::config(format!(
                "Row has {} values for {} columns",
                bad.len(),
                names.len()
            )));
        }

        let columns = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| {
                let data_type = rows
                    .iter()
                    .map(|r| &r[idx])
                    .find(|v| !v.is_null())
                    .map(Value::type_name)
                    .unwrap_or("varchar");
                ColumnInfo::new(name, data_type)
            })
            .collect();

        Ok(Self { columns, rows })
    }

    /// Creates a single-column table.
    pub fn single_column<V: Into<Value>>(name: &str, values: impl IntoIterator<Item = V>) -> Self {
        let rows: Vec<Vec<Value>> = values.into_iter().map(|v| vec![v.into()]).collect();
        let data_type = rows
            .iter()
            .map(|r| &r[0])
            .find(|v| !v.is_null())
            .map(Value::type_name)
            .unwrap_or("varchar");
        Self {
            columns: vec![ColumnInfo::new(name, data_type)],
            rows,
        }
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// The set of tables a mock engine serves. Table names are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct MockCatalog {
    tables: BTreeMap<String, MockTable>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a table.
    pub fn with_table(mut self, name: &str, table: MockTable) -> Self {
        self.tables.insert(name.to_lowercase(), table);
        self
    }

    /// Looks a table up by its full name, then by its unqualified name.
    pub fn table(&self, name: &str) -> Option<&MockTable> {
        let name = name.to_lowercase();
        self.tables.get(&name).or_else(|| {
            name.rsplit('.')
                .next()
                .and_then(|short| self.tables.get(short))
        })
    }

    /// Table names, sorted.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// Builds a catalog from a JSON seed document.
    ///
    /// Format: `{"table": [{"column": value, ...}, ...], ...}`. Column order
    /// follows the first row; missing keys in later rows are NULL.
    pub fn from_json(seed: &serde_json::Value) -> Result<Self> {
        let tables = seed
            .as_object()
            .ok_or_else(|| ProbeError::config("Seed must be a JSON object of tables"))?;

        let mut catalog = Self::new();
        for (name, records) in tables {
            let records = records.as_array().ok_or_else(|| {
                ProbeError::config(format!("Seed table '{name}' must be an array of rows"))
            })?;

            let names: Vec<String> = match records.first().and_then(|r| r.as_object()) {
                Some(first) => first.keys().cloned().collect(),
                None if records.is_empty() => Vec::new(),
                None => {
                    return Err(ProbeError::config(format!(
                        "Seed table '{name}' rows must be JSON objects"
                    )))
                }
            };

            let mut rows = Vec::with_capacity(records.len());
            for record in records {
                let record = record.as_object().ok_or_else(|| {
                    ProbeError::config(format!("Seed table '{name}' rows must be JSON objects"))
                })?;
                if let Some(extra) = record.keys().find(|k| !names.contains(k)) {
                    return Err(ProbeError::config(format!(
                        "Seed table '{name}' has unexpected column '{extra}'"
                    )));
                }
                let row = names
                    .iter()
                    .map(|col| match record.get(col) {
                        None => Ok(Value::Null),
                        Some(json) => Value::from_json(json).ok_or_else(|| {
                            ProbeError::config(format!(
                                "Seed table '{name}' column '{col}' holds a nested value"
                            ))
                        }),
                    })
                    .collect::<Result<Vec<_>>>()?;
                rows.push(row);
            }

            catalog = catalog.with_table(name, MockTable::from_rows(names, rows)?);
        }
        Ok(catalog)
    }

    /// Loads a JSON seed file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProbeError::config(format!("Failed to read seed file {}: {e}", path.display()))
        })?;
        let seed: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
            ProbeError::config(format!("Invalid seed file {}: {e}", path.display()))
        })?;
        Self::from_json(&seed)
    }
}

/// Call counters shared by a mock driver and every session it opens.
#[derive(Debug, Clone, Default)]
pub struct MockEngineStats {
    inner: Arc<StatsInner>,
}

#[derive(Debug, Default)]
struct StatsInner {
    connects: AtomicUsize,
    submits: AtomicUsize,
    fetches: AtomicUsize,
    releases: AtomicUsize,
    closes: AtomicUsize,
}

impl MockEngineStats {
    pub fn connects(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    pub fn submits(&self) -> usize {
        self.inner.submits.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.inner.fetches.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.inner.releases.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.inner.closes.load(Ordering::SeqCst)
    }

    fn bump(counter: &AtomicUsize) -> usize {
        counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Driver for `mock://` endpoints.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    catalog: Arc<MockCatalog>,
    required_credentials: Option<(String, String)>,
    unreachable: bool,
    fail_on_fetch: Option<usize>,
    fail_on_close: bool,
    stats: MockEngineStats,
}

impl MockDriver {
    /// Creates a driver serving the given catalog.
    pub fn new(catalog: MockCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            ..Self::default()
        }
    }

    /// Rejects sessions whose credentials differ from these.
    pub fn require_credentials(mut self, access_key: &str, secret_key: &str) -> Self {
        self.required_credentials = Some((access_key.to_string(), secret_key.to_string()));
        self
    }

    /// Makes every connection attempt fail as if the endpoint were down.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Makes the n-th fetch (1-based, counted per session) fail with an engine fault.
    pub fn fail_on_fetch(mut self, n: usize) -> Self {
        self.fail_on_fetch = Some(n);
        self
    }

    /// Makes session close report an error (after releasing its state).
    pub fn fail_on_close(mut self) -> Self {
        self.fail_on_close = true;
        self
    }

    /// Returns a handle on the call counters.
    pub fn stats(&self) -> MockEngineStats {
        self.stats.clone()
    }
}

#[async_trait]
impl Driver for MockDriver {
    fn scheme(&self) -> &str {
        MOCK_SCHEME
    }

    async fn connect(
        &self,
        config: &ConnectionConfig,
        credentials: &Credentials,
    ) -> Result<Box<dyn QueryEngine>> {
        MockEngineStats::bump(&self.stats.inner.connects);

        if self.unreachable {
            return Err(ProbeError::connection(format!(
                "Endpoint {} is unreachable",
                config.endpoint()
            )));
        }

        if let Some((access_key, secret_key)) = &self.required_credentials {
            if credentials.access_key() != access_key
                || credentials.secret_key().expose_secret() != secret_key
            {
                return Err(ProbeError::connection(format!(
                    "Authentication failed for access key '{}'",
                    credentials.access_key()
                )));
            }
        }

        debug!(
            "Mock session opened for {} (staging: {})",
            config.endpoint(),
            config.staging_location()
        );

        Ok(Box::new(MockEngine {
            catalog: Arc::clone(&self.catalog),
            fail_on_fetch: self.fail_on_fetch,
            fail_on_close: self.fail_on_close,
            stats: self.stats.clone(),
            session_fetches: AtomicUsize::new(0),
            next_cursor_id: AtomicU64::new(1),
            results: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }))
    }
}

/// Results held engine-side for one cursor.
struct PendingResult {
    rows: VecDeque<Row>,
    batch_size: usize,
}

/// One open session against the mock engine.
struct MockEngine {
    catalog: Arc<MockCatalog>,
    fail_on_fetch: Option<usize>,
    fail_on_close: bool,
    stats: MockEngineStats,
    session_fetches: AtomicUsize,
    next_cursor_id: AtomicU64,
    results: Mutex<HashMap<u64, PendingResult>>,
    closed: AtomicBool,
}

impl MockEngine {
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ProbeError::closed("mock session"));
        }
        Ok(())
    }

    fn results(&self) -> Result<std::sync::MutexGuard<'_, HashMap<u64, PendingResult>>> {
        self.results
            .lock()
            .map_err(|_| ProbeError::internal("mock engine state poisoned"))
    }

    fn evaluate(&self, plan: Plan) -> Result<(Arc<[ColumnInfo]>, Vec<Vec<Value>>)> {
        match plan {
            Plan::ShowTables => {
                let columns: Arc<[ColumnInfo]> = vec![ColumnInfo::new("tab_name", "varchar")].into();
                let rows = self
                    .catalog
                    .table_names()
                    .into_iter()
                    .map(|name| vec![Value::from(name)])
                    .collect();
                Ok((columns, rows))
            }
            Plan::Select {
                table,
                projection,
                limit,
            } => {
                let source = self.catalog.table(&table).ok_or_else(|| {
                    ProbeError::query(format!("Table '{table}' does not exist"))
                })?;

                let selected: Vec<(usize, ColumnInfo)> = match projection {
                    Projection::All => source.columns.iter().cloned().enumerate().collect(),
                    Projection::Columns(items) => items
                        .into_iter()
                        .map(|(name, output)| -> Result<(usize, ColumnInfo)> {
                            let idx = source.column_index(&name).ok_or_else(|| {
                                ProbeError::query(format!("Column '{name}' cannot be resolved"))
                            })?;
                            Ok((idx, ColumnInfo::new(output, &source.columns[idx].data_type)))
                        })
                        .collect::<Result<_>>()?,
                };

                let columns: Arc<[ColumnInfo]> =
                    selected.iter().map(|(_, c)| c.clone()).collect::<Vec<_>>().into();
                let rows = source
                    .rows
                    .iter()
                    .take(limit.unwrap_or(usize::MAX))
                    .map(|r| selected.iter().map(|(idx, _)| r[*idx].clone()).collect())
                    .collect();
                Ok((columns, rows))
            }
        }
    }
}

#[async_trait]
impl QueryEngine for MockEngine {
    async fn submit(&self, sql: &str, fetch_size: usize) -> Result<RemoteCursor> {
        self.ensure_open()?;
        MockEngineStats::bump(&self.stats.inner.submits);

        let (columns, values) = self.evaluate(mock_sql::plan(sql)?)?;
        let rows = values
            .into_iter()
            .map(|v| Row::new(Arc::clone(&columns), v))
            .collect::<Result<VecDeque<_>>>()?;

        let id = self.next_cursor_id.fetch_add(1, Ordering::SeqCst);
        debug!("Mock cursor {} holds {} rows", id, rows.len());
        self.results()?.insert(
            id,
            PendingResult {
                rows,
                batch_size: fetch_size.max(1),
            },
        );

        Ok(RemoteCursor { id, columns })
    }

    async fn fetch(&self, cursor: &RemoteCursor) -> Result<Option<Vec<Row>>> {
        self.ensure_open()?;
        MockEngineStats::bump(&self.stats.inner.fetches);
        let attempt = MockEngineStats::bump(&self.session_fetches);

        if self.fail_on_fetch == Some(attempt) {
            return Err(ProbeError::query(format!(
                "Engine fault while fetching cursor {} (fetch #{attempt})",
                cursor.id
            )));
        }

        let mut results = self.results()?;
        let pending = results
            .get_mut(&cursor.id)
            .ok_or_else(|| ProbeError::query(format!("Unknown cursor {}", cursor.id)))?;

        if pending.rows.is_empty() {
            return Ok(None);
        }
        let take = pending.batch_size.min(pending.rows.len());
        Ok(Some(pending.rows.drain(..take).collect()))
    }

    async fn release(&self, cursor: &RemoteCursor) -> Result<()> {
        MockEngineStats::bump(&self.stats.inner.releases);
        self.results()?.remove(&cursor.id);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        MockEngineStats::bump(&self.stats.inner.closes);
        self.closed.store(true, Ordering::SeqCst);
        self.results()?.clear();

        if self.fail_on_close {
            return Err(ProbeError::connection("Mock session close reported an error"));
        }
        Ok(())
    }
}
