//! Unified error type for the crate.
//!
//! Modeled on the teacher's `CoreError`/`SparkError` split, collapsed into a
//! single `std`-backed type since this crate has no `no_std` requirement:
//! a stable `&'static` code, a human message, an optional boxed cause and a
//! structured [`ErrorKind`] matching spec §7.

use std::error::Error as StdError;
use std::fmt;

/// The seven error kinds named by the spec.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    InvalidConfig,
    InvalidState,
    BadDescriptor,
    WiringError,
    IoError,
    ContainerFailed,
    Timeout,
}

impl ErrorKind {
    fn code(self) -> &'static str {
        match self {
            ErrorKind::InvalidConfig => "flowdrop.invalid_config",
            ErrorKind::InvalidState => "flowdrop.invalid_state",
            ErrorKind::BadDescriptor => "flowdrop.bad_descriptor",
            ErrorKind::WiringError => "flowdrop.wiring_error",
            ErrorKind::IoError => "flowdrop.io_error",
            ErrorKind::ContainerFailed => "flowdrop.container_failed",
            ErrorKind::Timeout => "flowdrop.timeout",
        }
    }
}

type Cause = Box<dyn StdError + Send + Sync + 'static>;

/// The crate's unified error.
#[derive(Debug)]
pub struct FlowError {
    kind: ErrorKind,
    message: String,
    cause: Option<Cause>,
    /// Only populated for `ContainerFailed`.
    exit_code: Option<i32>,
}

impl FlowError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
            exit_code: None,
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidConfig, message)
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidState, message)
    }

    pub fn bad_descriptor(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadDescriptor, message)
    }

    pub fn wiring(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::WiringError, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IoError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn container_failed(exit_code: i32, logs: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::ContainerFailed,
            message: logs.into(),
            cause: None,
            exit_code: Some(exit_code),
        }
    }

    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Exit code of the failed container process, if this is a `ContainerFailed`.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(
                f,
                "[{}] exit code {}: {}",
                self.kind.code(),
                code,
                self.message
            ),
            None => write!(f, "[{}] {}", self.kind.code(), self.message),
        }
    }
}

impl StdError for FlowError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_ref().map(|c| c.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<std::io::Error> for FlowError {
    fn from(err: std::io::Error) -> Self {
        FlowError::io(err.to_string()).with_cause(err)
    }
}

/// Crate-wide result alias.
pub type Result<T, E = FlowError> = std::result::Result<T, E>;
