//! APM Core - Shared configuration for the APM demo client
//!
//! This crate provides:
//! - The immutable runtime `Configuration` snapshot
//! - Deployment `Environment` names
//! - Error handling for settings loading

pub mod config;
pub mod error;

pub use config::{Configuration, Environment, TelemetrySettings};
pub use error::{ApmError, Result};
