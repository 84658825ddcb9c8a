//! services/client/src/lib.rs
//!
//! Library half of the `client` service: backend adapters, configuration,
//! screens, and the CLI the `carelink` binary runs.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config;
pub mod error;
