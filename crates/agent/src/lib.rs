//! `msel-agent` library crate.
//!
//! Re-exports internal modules for integration testing. The binary
//! entrypoint lives in `main.rs`.

pub mod capabilities;
pub mod config;
pub mod credentials;
pub mod session;
