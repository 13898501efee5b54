//! # Callback Harness Test Suite
//!
//! Cross-crate tests for the receiver → stream → correlator path.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs           # Harness startup, webhook client, payload builders
//! └── integration/
//!     ├── delivery.rs       # Resolution, replay, fan-out, role isolation, teardown
//!     ├── scenarios.rs      # End-to-end flows over real HTTP
//!     └── progression.rs    # request_status steps told apart by exclusive predicates
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p harness-tests
//! cargo test -p harness-tests integration::scenarios::
//! ```
//!
//! Every receiver binds an ephemeral port on loopback, so the suite can run
//! next to a live `callback-harness` process.

#[cfg(test)]
pub mod fixtures;
