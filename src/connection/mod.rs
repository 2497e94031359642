//! Connection management for db-probe.
//!
//! Centralizes connection lifecycle and scoped resource release.

pub mod guard;
pub mod handle;

pub use guard::{ClientState, ResourceGuard};
pub use handle::ConnectionHandle;
pub(crate) use handle::Session;
