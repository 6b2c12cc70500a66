//! Verifier errors and exit codes.

use pact_common::PactError;
use thiserror::Error;

/// Errors that stop a verification run before any interaction is replayed.
#[derive(Error, Debug)]
pub enum VerifierError {
    /// The argument text could not be parsed
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// No pact source was given
    #[error("no pact source given (use --file, --dir, --url or a positional source)")]
    NoSources,

    /// The HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(#[from] PactError),

    /// The async runtime could not be started
    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

impl VerifierError {
    /// Create an invalid arguments error.
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// The process exit code this error maps to.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidArguments(_) | Self::NoSources => ExitCode::InvalidArguments,
            Self::Client(_) | Self::Runtime(_) => ExitCode::InternalFault,
        }
    }
}

impl From<clap::Error> for VerifierError {
    fn from(err: clap::Error) -> Self {
        Self::InvalidArguments(err.to_string())
    }
}

/// Result type for verifier setup.
pub type VerifierResult<T> = Result<T, VerifierError>;

/// Exit status of a `verify` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Every interaction verified
    Success = 0,
    /// Verification ran and found failures
    Failures = 1,
    /// Missing or unparseable arguments
    InvalidArguments = 2,
    /// Internal fault
    InternalFault = 3,
}

impl ExitCode {
    /// The numeric code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}
