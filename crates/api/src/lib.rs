//! Bankruptcy prediction HTTP API — library interface for the server
//! binary and integration tests.

pub mod error;
pub mod server;
pub mod validate;
