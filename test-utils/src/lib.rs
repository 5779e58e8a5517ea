//! Shared test utilities for the Vault operations workspace.
//!
//! This crate provides:
//! - A stateful fake Vault server built on wiremock
//! - Proptest generators for Vault names, paths and payloads
//! - Fixtures with sample PEM material and policy templates

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use generators::*;
pub use mocks::FakeVault;

use rust_common::{TracingConfig, init_tracing};

/// Install a test subscriber once per process; later calls are no-ops.
pub fn init_test_tracing() {
    let config = TracingConfig::default()
        .with_service_name("vault-ops-tests")
        .with_log_level("warn")
        .with_target_level("vault_client", "debug")
        .with_test_writer();
    let _ = init_tracing(&config);
}
