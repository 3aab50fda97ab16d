use serde::{Deserialize, Serialize};

use crate::controller::TableSnapshot;

/// Header set by the provider when a response body could not be serialized.
pub const SERIALIZATION_ERROR: &str = "x-serialization-error";

/// Kinds of responses a route may return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseKind {
    /// A [`SerialResponse`].
    #[default]
    Serial,
    /// A stream of newline-delimited JSON values.
    Stream,
}

impl core::fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Serial => "Serial",
            Self::Stream => "Stream",
        }
        .fmt(f)
    }
}

/// A response carrying the data produced by an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SerialResponse<T>(T);

impl<T> SerialResponse<T> {
    /// Creates a [`SerialResponse`].
    #[must_use]
    pub const fn new(data: T) -> Self {
        Self(data)
    }

    /// Returns the response data.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }

    /// Returns a reference to the response data.
    #[must_use]
    pub const fn data(&self) -> &T {
        &self.0
    }
}

/// Kinds of errors a provider may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The request carried invalid data.
    InvalidData,
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidData => "Invalid Data",
        }
        .fmt(f)
    }
}

/// A response describing an error raised while handling a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error kind.
    pub error: ErrorKind,
    /// Error description.
    pub description: String,
}

impl ErrorResponse {
    /// Creates an [`ErrorResponse`].
    #[must_use]
    pub fn new(error: ErrorKind, description: impl Into<String>) -> Self {
        Self {
            error,
            description: description.into(),
        }
    }
}

impl core::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.error, self.description)
    }
}

/// Final state of an operation invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvocationState {
    /// The operation ran to completion.
    Finished,
    /// The operation was rejected.
    Failed,
}

impl core::fmt::Display for InvocationState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Finished => "Fin",
            Self::Failed => "Fail",
        }
        .fmt(f)
    }
}

/// Information about a single operation invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationInfo {
    /// Identifier of the invocation, unique per provider run.
    pub transaction_id: u64,
    /// Operation name.
    pub operation: String,
    /// Invocation state.
    pub invocation_state: InvocationState,
    /// Failure cause.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub error: Option<String>,
}

/// Body returned by every command route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    /// The invocation of the command.
    pub invocation: InvocationInfo,
    /// Table state right after the command.
    pub snapshot: TableSnapshot,
}
