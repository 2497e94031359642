//! Connection lifecycle tests.

use super::common::{config, letters, registry};
use db_probe::config::ConnectionConfig;
use db_probe::connection::ConnectionHandle;
use db_probe::credentials::PROPERTIES_FILE_PROVIDER;
use db_probe::db::DriverRegistry;
use db_probe::error::ProbeError;
use std::io::Write;

#[tokio::test]
async fn test_open_execute_close() {
    let driver = letters();
    let handle = ConnectionHandle::open(&registry(&driver), config()).await.unwrap();
    assert!(!handle.is_closed());
    assert_eq!(handle.config().endpoint(), "mock://engine");

    let mut cursor = handle.executor().execute("SELECT name FROM t").await.unwrap();
    cursor.close().await.unwrap();
    handle.close().await.unwrap();

    assert!(handle.is_closed());
    assert_eq!(driver.stats().connects(), 1);
    assert_eq!(driver.stats().closes(), 1);
}

#[tokio::test]
async fn test_execute_on_closed_handle_fails() {
    let driver = letters();
    let handle = ConnectionHandle::open(&registry(&driver), config()).await.unwrap();
    handle.close().await.unwrap();

    let err = handle.executor().execute("SELECT name FROM t").await.unwrap_err();
    assert!(matches!(err, ProbeError::ClosedHandle(_)));
    assert_eq!(err.category(), "Closed Handle");
}

#[tokio::test]
async fn test_close_twice_has_no_further_effect() {
    let driver = letters();
    let handle = ConnectionHandle::open(&registry(&driver), config()).await.unwrap();

    handle.close().await.unwrap();
    handle.close().await.unwrap();
    assert_eq!(driver.stats().closes(), 1);
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    let driver = letters().unreachable();
    let err = ConnectionHandle::open(&registry(&driver), config()).await.unwrap_err();
    assert!(matches!(err, ProbeError::Connection(_)));
}

#[tokio::test]
async fn test_unregistered_scheme() {
    let config = ConnectionConfig::new("https://athena.us-east-1.amazonaws.com:443", "s3://bucket/")
        .with_credentials("static", "AKIA:secret");
    let err = ConnectionHandle::open(&DriverRegistry::new(), config).await.unwrap_err();
    assert!(matches!(err, ProbeError::Connection(_)));
}

#[tokio::test]
async fn test_properties_file_credentials() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# engine credentials").unwrap();
    writeln!(file, "accessKey = AKIA").unwrap();
    writeln!(file, "secretKey = expected").unwrap();

    let driver = letters().require_credentials("AKIA", "expected");
    let config = ConnectionConfig::new("mock://engine", "mock://bucket/path")
        .with_credentials(PROPERTIES_FILE_PROVIDER, file.path().to_string_lossy());

    let handle = ConnectionHandle::open(&registry(&driver), config).await.unwrap();
    handle.close().await.unwrap();
}

#[tokio::test]
async fn test_missing_properties_file_is_credential_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = ConnectionConfig::new("mock://engine", "")
        .with_credentials(PROPERTIES_FILE_PROVIDER, dir.path().join("absent").to_string_lossy());

    let err = ConnectionHandle::open(&registry(&letters()), config).await.unwrap_err();
    assert!(matches!(err, ProbeError::Credential(_)));
}
