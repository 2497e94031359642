//! Error types for db-probe.
//!
//! Defines the main error enum used throughout the client.

use thiserror::Error;

/// Main error type for db-probe operations.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Session could not be opened (endpoint unreachable, auth failed, no driver).
    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement rejected or failed on the remote engine.
    #[error("Query error: {0}")]
    Query(String),

    /// Operation attempted on a cursor or connection that is already closed.
    #[error("Closed handle: {0}")]
    ClosedHandle(String),

    /// Credential provider could not resolve credentials.
    #[error("Credential error: {0}")]
    Credential(String),

    /// Row accessed by a column name it does not carry.
    #[error("Column not found: {column}")]
    ColumnNotFound { column: String },

    /// Configuration errors (invalid config file, missing endpoint, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Output sink errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal errors (illegal lifecycle transitions, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProbeError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a closed-handle error naming the closed resource.
    pub fn closed(resource: impl Into<String>) -> Self {
        Self::ClosedHandle(resource.into())
    }

    pub fn credential(msg: impl Into<String>) -> Self {
        Self::Credential(msg.into())
    }

    /// Creates a column-not-found error for the given column name.
    pub fn column_not_found(column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::ClosedHandle(_) => "Closed Handle",
            Self::Credential(_) => "Credential Error",
            Self::ColumnNotFound { .. } => "Column Not Found",
            Self::Config(_) => "Configuration Error",
            Self::Io(_) => "I/O Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using ProbeError.
pub type Result<T> = std::result::Result<T, ProbeError>;
