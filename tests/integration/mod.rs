//! Integration tests for db-probe.

pub mod common;
pub mod connection_test;
pub mod guard_test;
pub mod query_test;
