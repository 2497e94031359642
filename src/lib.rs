//! db-probe - a small client for running SQL against remote query engines.
//!
//! A [`connection::ConnectionHandle`] owns one engine session,
//! [`query::QueryExecutor`] submits statements on it, and
//! [`query::RowCursor`] yields the resulting rows lazily.
//! [`connection::ResourceGuard`] ties the three together and releases
//! everything it opened, whatever the outcome.

pub mod cli;
pub mod config;
pub mod connection;
pub mod credentials;
pub mod db;
pub mod error;
pub mod logging;
pub mod output;
pub mod query;
