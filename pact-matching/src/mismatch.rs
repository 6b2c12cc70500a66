//! Mismatch records.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The kind of a [`Mismatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MismatchKind {
    /// HTTP method differs
    MethodMismatch,
    /// Request path differs
    PathMismatch,
    /// Response status differs
    StatusMismatch,
    /// Query parameter missing, unexpected or different
    QueryMismatch,
    /// Header missing or different
    HeaderMismatch,
    /// Expected body content is absent
    BodyMissing,
    /// Body contains content that was not expected
    BodyUnexpected,
    /// Body content differs
    BodyMismatch,
    /// Provider could not be reached
    ProviderUnreachable,
    /// Provider did not answer within the request timeout
    RequestTimeout,
    /// Provider state change call failed
    StateChangeFailed,
}

impl MismatchKind {
    /// Whether the kind describes a transport failure rather than content.
    #[must_use]
    pub const fn is_transport(self) -> bool {
        matches!(
            self,
            Self::ProviderUnreachable | Self::RequestTimeout | Self::StateChangeFailed
        )
    }

    /// Short lowercase label used in text reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::MethodMismatch => "method",
            Self::PathMismatch => "path",
            Self::StatusMismatch => "status",
            Self::QueryMismatch => "query",
            Self::HeaderMismatch => "header",
            Self::BodyMissing => "body-missing",
            Self::BodyUnexpected => "body-unexpected",
            Self::BodyMismatch => "body-value-mismatch",
            Self::ProviderUnreachable => "provider-unreachable",
            Self::RequestTimeout => "timeout",
            Self::StateChangeFailed => "state-change",
        }
    }
}

/// A single comparison failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mismatch {
    /// Mismatch kind
    #[serde(rename = "type")]
    pub kind: MismatchKind,
    /// Body location (`$.a[0]`) for body mismatches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Header or query parameter name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Expected value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
    /// Observed value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,
    /// Human-readable description
    pub mismatch: String,
}

impl Mismatch {
    /// A mismatch without location or values.
    #[must_use]
    pub fn new(kind: MismatchKind, mismatch: impl Into<String>) -> Self {
        Self {
            kind,
            path: None,
            key: None,
            expected: None,
            actual: None,
            mismatch: mismatch.into(),
        }
    }

    /// Attach a body location.
    #[must_use]
    pub fn at(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach a header or parameter name.
    #[must_use]
    pub fn for_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attach the expected and observed values.
    #[must_use]
    pub fn values(mut self, expected: Option<Value>, actual: Option<Value>) -> Self {
        self.expected = expected;
        self.actual = actual;
        self
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind.label())?;
        if let Some(key) = &self.key {
            write!(f, " {key}:")?;
        }
        if let Some(path) = &self.path {
            write!(f, " {path}:")?;
        }
        write!(f, " {}", self.mismatch)
    }
}
