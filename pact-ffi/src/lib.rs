//! C-compatible boundary for the pact crates.
//!
//! [`PactContext`] is the safe API: pacts and interactions built through
//! handles, mock servers keyed by port, pact file writes, verification. The
//! [`exports`] module exposes it to foreign callers as `pactffi_*` functions
//! returning integer codes and library-owned strings.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod context;
pub mod error;
#[allow(unsafe_code)]
pub mod exports;
pub mod tls;

pub use context::{PactContext, contain, contain_result, init, version};
pub use error::{FfiError, FfiResult, StartCode, WriteCode};
pub use pact_models::{InteractionHandle, InteractionPart, PactHandle};
