//! Home Server Manager: a terminal dashboard and CLI for the Docker Compose
//! services behind a home server's REST API.
//!
//! This library exposes the core modules for use by the binary and by tests.

pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod reconcile;
pub mod store;
pub mod sw;
#[cfg(test)]
pub mod test_support;
pub mod view;
