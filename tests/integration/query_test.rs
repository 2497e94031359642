//! Statement execution and cursor tests.

use super::common::{config, letters, numbers, registry};
use db_probe::connection::ConnectionHandle;
use db_probe::db::{MockCatalog, MockDriver, Value};
use db_probe::error::ProbeError;
use db_probe::query::CursorState;
use futures::TryStreamExt;
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[tokio::test]
async fn test_select_with_limit() {
    let driver = letters();
    let handle = ConnectionHandle::open(&registry(&driver), config()).await.unwrap();
    let mut cursor = handle
        .executor()
        .execute("SELECT name FROM t LIMIT 2")
        .await
        .unwrap();

    let first = cursor.next().await.unwrap().unwrap();
    assert_eq!(first.get_string("name").unwrap(), "a");
    let second = cursor.next().await.unwrap().unwrap();
    assert_eq!(second.get_string("name").unwrap(), "b");
    assert!(cursor.next().await.unwrap().is_none());

    cursor.close().await.unwrap();
    handle.close().await.unwrap();
}

#[tokio::test]
async fn test_row_counts() {
    for n in [0i64, 1, 10] {
        let driver = numbers(n);
        let handle = ConnectionHandle::open(&registry(&driver), config()).await.unwrap();
        let mut cursor = handle
            .executor()
            .with_fetch_size(4)
            .execute("SELECT * FROM numbers")
            .await
            .unwrap();

        let rows: Vec<_> = cursor.rows().try_collect().await.unwrap();
        assert_eq!(rows.len() as i64, n);
        assert!(cursor.next().await.unwrap().is_none());
        assert_eq!(cursor.state(), CursorState::Exhausted);

        cursor.close().await.unwrap();
        handle.close().await.unwrap();
    }
}

#[tokio::test]
async fn test_unknown_column_lookup() {
    let driver = letters();
    let handle = ConnectionHandle::open(&registry(&driver), config()).await.unwrap();
    let mut cursor = handle.executor().execute("SELECT name FROM t").await.unwrap();

    let row = cursor.next().await.unwrap().unwrap();
    let err = row.get("size").unwrap_err();
    assert!(matches!(err, ProbeError::ColumnNotFound { ref column } if column == "size"));

    cursor.close().await.unwrap();
    handle.close().await.unwrap();
}

#[tokio::test]
async fn test_engine_rejects_statement() {
    let driver = letters();
    let handle = ConnectionHandle::open(&registry(&driver), config()).await.unwrap();

    for sql in ["SELEC name FROM t", "SELECT name FROM missing", "SELECT size FROM t"] {
        let err = handle.executor().execute(sql).await.unwrap_err();
        assert!(matches!(err, ProbeError::Query(_)), "{sql}: {err:?}");
    }
    handle.close().await.unwrap();
}

#[tokio::test]
async fn test_show_tables_from_seed_file() {
    let dir = tempfile::tempdir().unwrap();
    let seed = dir.path().join("catalog.json");
    std::fs::write(
        &seed,
        r#"{"sesblog": [{"ip": "10.0.0.1", "bytes": 512}], "elb_logs": []}"#,
    )
    .unwrap();

    let driver = MockDriver::new(MockCatalog::load(&seed).unwrap());
    let registry = db_probe::db::DriverRegistry::new().with_driver(Arc::new(driver));
    let handle = ConnectionHandle::open(&registry, config()).await.unwrap();

    let mut cursor = handle.executor().execute("SHOW TABLES").await.unwrap();
    let mut tables = Vec::new();
    while let Some(row) = cursor.next().await.unwrap() {
        tables.push(row.get_string("tab_name").unwrap());
    }
    tables.sort();
    assert_eq!(tables, vec!["elb_logs", "sesblog"]);

    let mut cursor2 = handle.executor().execute("SELECT bytes FROM sesblog").await.unwrap();
    let row = cursor2.next().await.unwrap().unwrap();
    assert_eq!(row.get("bytes").unwrap(), &Value::Int(512));

    cursor.close().await.unwrap();
    cursor2.close().await.unwrap();
    handle.close().await.unwrap();
}

#[tokio::test]
async fn test_cursor_fails_after_connection_close() {
    let driver = letters();
    let handle = ConnectionHandle::open(&registry(&driver), config()).await.unwrap();
    let mut cursor = handle.executor().execute("SELECT name FROM t").await.unwrap();
    handle.close().await.unwrap();

    assert!(matches!(cursor.next().await, Err(ProbeError::ClosedHandle(_))));
    cursor.close().await.unwrap();
}
