//! Shared fixtures.

use db_probe::config::ConnectionConfig;
use db_probe::db::{DriverRegistry, MockCatalog, MockDriver, MockTable};
use std::sync::Arc;

/// The catalog most tests use: `t(name)` holding a, b, c.
pub fn letters() -> MockDriver {
    MockDriver::new(
        MockCatalog::new().with_table("t", MockTable::single_column("name", ["a", "b", "c"])),
    )
}

pub fn numbers(n: i64) -> MockDriver {
    MockDriver::new(
        MockCatalog::new().with_table("numbers", MockTable::single_column("n", 0..n)),
    )
}

pub fn registry(driver: &MockDriver) -> DriverRegistry {
    DriverRegistry::new().with_driver(Arc::new(driver.clone()))
}

pub fn config() -> ConnectionConfig {
    ConnectionConfig::new("mock://engine", "mock://bucket/path")
        .with_credentials("static", "AKIA:secret")
}
