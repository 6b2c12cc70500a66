//! Provider verification.
//!
//! Loads pacts from files, directories and URLs, replays each interaction's
//! request against a running provider and matches the provider's responses
//! against the recorded expectations.
//!
//! ```no_run
//! use pact_verifier::{ExitCode, verify};
//!
//! let code = verify("--provider-base-url\nhttp://localhost:8080\n--file\npacts/C-P.json");
//! assert_eq!(code, ExitCode::Success);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod args;
pub mod driver;
pub mod error;
pub mod provider;
pub mod report;
pub mod source;

pub use args::{ReportFormat, VerifierArgs};
pub use driver::{InteractionFilter, Verifier, run_blob, verify};
pub use error::{ExitCode, VerifierError, VerifierResult};
pub use provider::{
    ReplayFailure, StateAction, change_state, request_headers, request_url, send_request, transport_mismatch,
};
pub use report::{InteractionResult, PactResult, VerificationReport};
pub use source::{BrokerAuth, LoadedPact, PactSource, load_all};
