//! Shared utilities for startup-eval
//!
//! This crate provides common functionality used across the workspace:
//! tracing setup for binaries and helpers for reading environment overrides.

pub mod env;
pub mod logging;

pub use env::{EnvError, env_parse, env_var};
pub use logging::{LogFormat, init_tracing, init_tracing_with};
