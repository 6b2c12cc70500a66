//! Boundary errors and the integer codes they map to.

use pact_mock_server::MockServerError;
use thiserror::Error;

/// Errors raised by [`crate::PactContext`] operations.
#[derive(Error, Debug)]
pub enum FfiError {
    /// A required argument was null
    #[error("null argument: {0}")]
    NullArgument(&'static str),

    /// A string argument was not valid UTF-8
    #[error("argument {0} is not valid UTF-8")]
    InvalidUtf8(&'static str),

    /// A pact handle does not name a live pact
    #[error("invalid pact handle {0}")]
    InvalidHandle(u32),

    /// The mock server layer failed
    #[error(transparent)]
    MockServer(#[from] MockServerError),

    /// Certificate generation failed
    #[error("certificate generation failed: {0}")]
    Certificate(#[from] rcgen::Error),

    /// The operation panicked
    #[error("panic in {0}")]
    Panic(&'static str),
}

/// Result type for boundary operations.
pub type FfiResult<T> = Result<T, FfiError>;

/// Failure codes of the mock server start operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum StartCode {
    /// A required pointer was null
    NullPointer = -1,
    /// The pact JSON could not be parsed, or the pact handle is invalid
    InvalidPact = -2,
    /// The listener could not be bound or the server could not start
    StartFailed = -3,
    /// The operation panicked
    Panic = -4,
    /// The bind address is invalid
    InvalidAddress = -5,
}

impl StartCode {
    /// The numeric code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl From<&FfiError> for StartCode {
    fn from(err: &FfiError) -> Self {
        match err {
            FfiError::NullArgument(_) => Self::NullPointer,
            FfiError::InvalidUtf8(_) | FfiError::InvalidHandle(_) => Self::InvalidPact,
            FfiError::MockServer(inner) => match inner {
                MockServerError::InvalidPact(_) | MockServerError::Serialization(_) => Self::InvalidPact,
                MockServerError::InvalidAddress(_) => Self::InvalidAddress,
                _ => Self::StartFailed,
            },
            FfiError::Certificate(_) => Self::StartFailed,
            FfiError::Panic(_) => Self::Panic,
        }
    }
}

/// Status codes of the pact file write operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum WriteCode {
    /// The file was written
    Success = 0,
    /// The operation panicked
    Panic = 1,
    /// The file could not be written
    WriteFailed = 2,
    /// No mock server listens on the port
    NoServer = 3,
}

impl WriteCode {
    /// The numeric code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl From<&FfiError> for WriteCode {
    fn from(err: &FfiError) -> Self {
        match err {
            FfiError::MockServer(MockServerError::NotFound(_)) => Self::NoServer,
            FfiError::Panic(_) => Self::Panic,
            _ => Self::WriteFailed,
        }
    }
}
