//! # bp-core
//!
//! Shared plumbing for the bankruptcy prediction service: layered
//! configuration and the tracing subscriber setup used by every binary in
//! the workspace.

pub mod config;
pub mod logging;
