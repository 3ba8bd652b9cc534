//! Shared utilities for stock-crew
//!
//! This crate provides the tracing setup shared by the workspace binaries.

pub mod logging;

pub use logging::{LogFormat, init_tracing, init_tracing_with};
