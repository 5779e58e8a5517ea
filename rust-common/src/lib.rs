//! Shared plumbing for the Vault operations client.
//!
//! This crate provides centralized implementations for:
//! - Transport-level error types with retryability classification
//! - HTTP client configuration and building, including TLS trust roots
//! - Tracing subscriber initialization

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod http;
pub mod tracing_config;

pub use error::PlatformError;
pub use http::{HttpConfig, TlsTrust, build_http_client};
pub use tracing_config::{TracingConfig, init_tracing};
