//! Health reporting toolkit for hybrid Active Directory environments
//!
//! The library surface exists for the `adctl` binary and its integration
//! tests; it is not a stable public API.

pub mod cmd;
pub mod config;
pub mod error;
pub mod graph;
pub mod health;
pub mod report;
