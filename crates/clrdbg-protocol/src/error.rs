//! Error codes and the failure envelope.

use serde::{Deserialize, Serialize};

/// Machine-tractable error codes. The taxonomy is closed: every failure an
/// operation can surface maps onto exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Caller-supplied input rejected.
    InvalidParameter,
    InvalidFile,
    InvalidLine,
    InvalidColumn,
    InvalidAddress,
    InvalidPattern,
    InvalidCondition,
    InvalidThread,
    InvalidFrame,
    InvalidReference,
    // State-machine violations.
    NoSession,
    NotPaused,
    AlreadyAttached,
    // Attach/launch failures.
    ProcessNotFound,
    NotDotNetProcess,
    PermissionDenied,
    AttachFailed,
    LaunchFailed,
    // Metadata/registry misses.
    BreakpointNotFound,
    TypeNotFound,
    ModuleNotFound,
    MetadataError,
    EnumerationFailed,
    SearchFailed,
    // Operation failures.
    SizeExceeded,
    MemoryReadFailed,
    StepFailed,
    StackTraceFailed,
    VariablesFailed,
    // Bounded waits.
    Timeout,
    Cancelled,
    // Expression evaluation.
    EvalSyntaxError,
    EvalTimeout,
    EvalException,
    EvalUnavailable,
}

impl ErrorCode {
    /// Stable identifier used in log records and wire payloads.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidParameter => "InvalidParameter",
            ErrorCode::InvalidFile => "InvalidFile",
            ErrorCode::InvalidLine => "InvalidLine",
            ErrorCode::InvalidColumn => "InvalidColumn",
            ErrorCode::InvalidAddress => "InvalidAddress",
            ErrorCode::InvalidPattern => "InvalidPattern",
            ErrorCode::InvalidCondition => "InvalidCondition",
            ErrorCode::InvalidThread => "InvalidThread",
            ErrorCode::InvalidFrame => "InvalidFrame",
            ErrorCode::InvalidReference => "InvalidReference",
            ErrorCode::NoSession => "NoSession",
            ErrorCode::NotPaused => "NotPaused",
            ErrorCode::AlreadyAttached => "AlreadyAttached",
            ErrorCode::ProcessNotFound => "ProcessNotFound",
            ErrorCode::NotDotNetProcess => "NotDotNetProcess",
            ErrorCode::PermissionDenied => "PermissionDenied",
            ErrorCode::AttachFailed => "AttachFailed",
            ErrorCode::LaunchFailed => "LaunchFailed",
            ErrorCode::BreakpointNotFound => "BreakpointNotFound",
            ErrorCode::TypeNotFound => "TypeNotFound",
            ErrorCode::ModuleNotFound => "ModuleNotFound",
            ErrorCode::MetadataError => "MetadataError",
            ErrorCode::EnumerationFailed => "EnumerationFailed",
            ErrorCode::SearchFailed => "SearchFailed",
            ErrorCode::SizeExceeded => "SizeExceeded",
            ErrorCode::MemoryReadFailed => "MemoryReadFailed",
            ErrorCode::StepFailed => "StepFailed",
            ErrorCode::StackTraceFailed => "StackTraceFailed",
            ErrorCode::VariablesFailed => "VariablesFailed",
            ErrorCode::Timeout => "Timeout",
            ErrorCode::Cancelled => "Cancelled",
            ErrorCode::EvalSyntaxError => "EvalSyntaxError",
            ErrorCode::EvalTimeout => "EvalTimeout",
            ErrorCode::EvalException => "EvalException",
            ErrorCode::EvalUnavailable => "EvalUnavailable",
        }
    }
}

/// Failure payload carried by unsuccessful responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Character position, for syntax-class errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
}

impl ErrorBody {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            position: None,
        }
    }

    #[must_use]
    pub fn with_position(mut self, position: u32) -> Self {
        self.position = Some(position);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Response envelope: operation-specific fields on success, an [`ErrorBody`]
/// on failure. The `success` flag is always present.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Outcome<T> {
    Ok {
        success: bool,
        #[serde(flatten)]
        body: T,
    },
    Err {
        success: bool,
        error: ErrorBody,
    },
}

impl<T> Outcome<T> {
    #[must_use]
    pub fn ok(body: T) -> Self {
        Outcome::Ok {
            success: true,
            body,
        }
    }

    #[must_use]
    pub fn err(error: ErrorBody) -> Self {
        Outcome::Err {
            success: false,
            error,
        }
    }
}

impl<T> From<Result<T, ErrorBody>> for Outcome<T> {
    fn from(result: Result<T, ErrorBody>) -> Self {
        match result {
            Ok(body) => Outcome::ok(body),
            Err(error) => Outcome::err(error),
        }
    }
}
