//! End-to-end runs through the resource guard.

use super::common::{config, letters, numbers, registry};
use db_probe::connection::{ClientState, ResourceGuard};
use db_probe::error::ProbeError;
use db_probe::output::{OutputFormat, RowWriter};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_end_to_end_text_output() {
    let driver = letters();
    let registry = registry(&driver);
    let mut guard = ResourceGuard::new(&registry);
    let mut writer = RowWriter::new(Vec::new(), OutputFormat::Text);

    let rows = guard
        .run(config(), "SELECT name FROM t LIMIT 2", |row| writer.write_row(row))
        .await
        .unwrap();

    assert_eq!(rows, 2);
    assert_eq!(guard.state(), ClientState::Closed);
    let out = String::from_utf8(writer.finish().unwrap()).unwrap();
    assert_eq!(out, "name: a\nname: b\n");

    assert_eq!(driver.stats().releases(), 1);
    assert_eq!(driver.stats().closes(), 1);
}

#[tokio::test]
async fn test_projection_of_missing_column_still_cleans_up() {
    let driver = letters();
    let registry = registry(&driver);
    let mut guard = ResourceGuard::new(&registry);
    let mut writer =
        RowWriter::new(Vec::new(), OutputFormat::Json).with_columns(vec!["size".to_string()]);

    let err = guard
        .run(config(), "SELECT name FROM t", |row| writer.write_row(row))
        .await
        .unwrap_err();

    assert!(matches!(err, ProbeError::ColumnNotFound { .. }));
    assert_eq!(writer.rows_written(), 0);
    assert_eq!(driver.stats().releases(), 1);
    assert_eq!(driver.stats().closes(), 1);
}

#[tokio::test]
async fn test_fault_mid_fetch_closes_connection_once() {
    let driver = numbers(10).fail_on_fetch(2);
    let registry = registry(&driver);
    let mut guard = ResourceGuard::new(&registry).with_fetch_size(3);
    let mut seen = Vec::new();

    let err = guard
        .run(config(), "SELECT n FROM numbers", |row| {
            seen.push(row.get("n")?.clone());
            Ok(())
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ProbeError::Query(_)));
    assert_eq!(seen.len(), 3);
    assert_eq!(guard.state(), ClientState::Closed);
    assert!(guard.cleanup_errors().is_empty());
    assert_eq!(driver.stats().closes(), 1);
}

#[tokio::test]
async fn test_close_failure_after_success_is_reported() {
    let driver = letters().fail_on_close();
    let registry = registry(&driver);
    let mut guard = ResourceGuard::new(&registry);

    let err = guard
        .run(config(), "SELECT name FROM t", |_| Ok(()))
        .await
        .unwrap_err();

    assert!(matches!(err, ProbeError::Connection(_)));
    assert_eq!(driver.stats().closes(), 1);
}

#[tokio::test]
async fn test_unreachable_endpoint_leaves_nothing_open() {
    let driver = letters().unreachable();
    let registry = registry(&driver);
    let mut guard = ResourceGuard::new(&registry);

    let err = guard.run(config(), "SELECT name FROM t", |_| Ok(())).await.unwrap_err();
    assert!(matches!(err, ProbeError::Connection(_)));
    assert_eq!(guard.state(), ClientState::Closed);
    assert_eq!(driver.stats().submits(), 0);
    assert_eq!(driver.stats().closes(), 0);
}
