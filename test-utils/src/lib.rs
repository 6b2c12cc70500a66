//! Shared test utilities for the pact crates.
//!
//! This crate provides:
//! - Proptest generators for pacts, interactions and bodies
//! - An echo provider that answers with each interaction's response
//! - Fixture pacts

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use fixtures::*;
pub use generators::*;
pub use mocks::EchoProvider;
