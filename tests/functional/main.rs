// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Functional tests for the sidecar injection webhook.
//!
//! These tests drive the real axum router end to end WITHOUT a Kubernetes
//! cluster. Template sources are either in-memory stores or a local HTTP
//! server on an ephemeral port.
//!
//! ```bash
//! # Run all functional tests
//! cargo test --test functional
//!
//! # Run specific test
//! cargo test --test functional test_logging_pod_gets_two_sidecars
//! ```

#[path = "../common/mod.rs"]
mod common;

mod transport_tests;
