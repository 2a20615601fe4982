//! dockle-exporter daemon library.
//!
//! This library exposes internal modules for integration testing.
//! In production, `dockle-exporter` is used as a binary (main.rs).

pub mod api;
pub mod cli;
pub mod exporter;
pub mod logging;
pub mod metrics_server;
