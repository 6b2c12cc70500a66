//! Consumer-side mock provider.
//!
//! A [`MockServerManager`] starts one [`MockServer`] per pact. Each server
//! answers requests from the pact's interactions, records how well every
//! request matched in its [`MismatchLedger`] and can write the pact file.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod ledger;
pub mod manager;
pub mod server;

pub use config::MockServerConfig;
pub use error::{MockServerError, MockServerResult};
pub use ledger::{MatchResult, MismatchLedger};
pub use manager::MockServerManager;
pub use server::{MockServer, parse_bind_address};
