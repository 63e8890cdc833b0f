//! HTTP API module.
//!
//! This module provides the HTTP server, response types, and the server
//! event log for the csvbin backend.

pub mod logs;
pub mod server;
pub mod types;

pub use server::start_server;
pub use types::*;
