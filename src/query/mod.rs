//! Query execution for db-probe.
//!
//! Statement submission and the cursor that streams its results.

pub mod cursor;
pub mod executor;

pub use cursor::{CursorState, RowCursor};
pub use executor::{QueryExecutor, DEFAULT_FETCH_SIZE};
