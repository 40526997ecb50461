//! Engine errors.

use clrdbg_protocol::{ErrorBody, ErrorCode};
use thiserror::Error;

/// Closed error taxonomy for every engine operation. Each variant maps 1:1
/// onto a [`ErrorCode`]; syntax-class variants carry a character position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DebugError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid file: {0}")]
    InvalidFile(String),

    #[error("invalid line {0} (lines are 1-based)")]
    InvalidLine(u32),

    #[error("invalid column {0} (columns are 1-based)")]
    InvalidColumn(u32),

    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    #[error("invalid pattern '{0}'")]
    InvalidPattern(String),

    #[error("invalid condition at position {position}: {message}")]
    InvalidCondition { message: String, position: u32 },

    #[error("invalid thread id {0}")]
    InvalidThread(u32),

    #[error("invalid frame index {0}")]
    InvalidFrame(u32),

    #[error("invalid object reference '{0}'")]
    InvalidReference(String),

    #[error("no debug session")]
    NoSession,

    #[error("{0}")]
    NotPaused(String),

    #[error("a session is already attached")]
    AlreadyAttached,

    #[error("process {0} not found")]
    ProcessNotFound(u32),

    #[error("process {0} hosts no managed runtime")]
    NotDotNetProcess(u32),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("attach failed: {0}")]
    AttachFailed(String),

    #[error("launch failed: {0}")]
    LaunchFailed(String),

    #[error("breakpoint {0} not found")]
    BreakpointNotFound(u32),

    #[error("type not found: {0}")]
    TypeNotFound(String),

    #[error("module not found: {0}")]
    ModuleNotFound(String),

    #[error("metadata error: {0}")]
    MetadataError(String),

    #[error("enumeration failed: {0}")]
    EnumerationFailed(String),

    #[error("search failed: {0}")]
    SearchFailed(String),

    #[error("size exceeded: {0}")]
    SizeExceeded(String),

    #[error("memory read failed: {0}")]
    MemoryReadFailed(String),

    #[error("step failed: {0}")]
    StepFailed(String),

    #[error("stack trace failed: {0}")]
    StackTraceFailed(String),

    #[error("variable enumeration failed: {0}")]
    VariablesFailed(String),

    #[error("operation timed out")]
    Timeout,

    #[error("operation cancelled")]
    Cancelled,

    #[error("expression syntax error at position {position}: {message}")]
    EvalSyntax { message: String, position: u32 },

    #[error("evaluation timed out")]
    EvalTimeout,

    #[error("evaluation failed: {0}")]
    EvalException(String),

    #[error("evaluation unavailable: {0}")]
    EvalUnavailable(String),
}

impl DebugError {
    /// The wire code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            DebugError::InvalidParameter(_) => ErrorCode::InvalidParameter,
            DebugError::InvalidFile(_) => ErrorCode::InvalidFile,
            DebugError::InvalidLine(_) => ErrorCode::InvalidLine,
            DebugError::InvalidColumn(_) => ErrorCode::InvalidColumn,
            DebugError::InvalidAddress(_) => ErrorCode::InvalidAddress,
            DebugError::InvalidPattern(_) => ErrorCode::InvalidPattern,
            DebugError::InvalidCondition { .. } => ErrorCode::InvalidCondition,
            DebugError::InvalidThread(_) => ErrorCode::InvalidThread,
            DebugError::InvalidFrame(_) => ErrorCode::InvalidFrame,
            DebugError::InvalidReference(_) => ErrorCode::InvalidReference,
            DebugError::NoSession => ErrorCode::NoSession,
            DebugError::NotPaused(_) => ErrorCode::NotPaused,
            DebugError::AlreadyAttached => ErrorCode::AlreadyAttached,
            DebugError::ProcessNotFound(_) => ErrorCode::ProcessNotFound,
            DebugError::NotDotNetProcess(_) => ErrorCode::NotDotNetProcess,
            DebugError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            DebugError::AttachFailed(_) => ErrorCode::AttachFailed,
            DebugError::LaunchFailed(_) => ErrorCode::LaunchFailed,
            DebugError::BreakpointNotFound(_) => ErrorCode::BreakpointNotFound,
            DebugError::TypeNotFound(_) => ErrorCode::TypeNotFound,
            DebugError::ModuleNotFound(_) => ErrorCode::ModuleNotFound,
            DebugError::MetadataError(_) => ErrorCode::MetadataError,
            DebugError::EnumerationFailed(_) => ErrorCode::EnumerationFailed,
            DebugError::SearchFailed(_) => ErrorCode::SearchFailed,
            DebugError::SizeExceeded(_) => ErrorCode::SizeExceeded,
            DebugError::MemoryReadFailed(_) => ErrorCode::MemoryReadFailed,
            DebugError::StepFailed(_) => ErrorCode::StepFailed,
            DebugError::StackTraceFailed(_) => ErrorCode::StackTraceFailed,
            DebugError::VariablesFailed(_) => ErrorCode::VariablesFailed,
            DebugError::Timeout => ErrorCode::Timeout,
            DebugError::Cancelled => ErrorCode::Cancelled,
            DebugError::EvalSyntax { .. } => ErrorCode::EvalSyntaxError,
            DebugError::EvalTimeout => ErrorCode::EvalTimeout,
            DebugError::EvalException(_) => ErrorCode::EvalException,
            DebugError::EvalUnavailable(_) => ErrorCode::EvalUnavailable,
        }
    }

    /// Character position, for syntax-class errors.
    #[must_use]
    pub fn position(&self) -> Option<u32> {
        match self {
            DebugError::InvalidCondition { position, .. }
            | DebugError::EvalSyntax { position, .. } => Some(*position),
            _ => None,
        }
    }

    /// The wire payload for this error.
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        let mut body = ErrorBody::new(self.code(), self.to_string());
        if let Some(position) = self.position() {
            body = body.with_position(position);
        }
        body
    }
}

impl From<ErrorBody> for DebugError {
    fn from(body: ErrorBody) -> Self {
        let message = body.message;
        match body.code {
            ErrorCode::InvalidFile => DebugError::InvalidFile(message),
            ErrorCode::InvalidLine => DebugError::InvalidLine(0),
            ErrorCode::InvalidColumn => DebugError::InvalidColumn(0),
            ErrorCode::InvalidAddress => DebugError::InvalidAddress(message),
            ErrorCode::InvalidPattern => DebugError::InvalidPattern(message),
            ErrorCode::InvalidCondition => DebugError::InvalidCondition {
                message,
                position: body.position.unwrap_or(0),
            },
            ErrorCode::InvalidReference => DebugError::InvalidReference(message),
            ErrorCode::SizeExceeded => DebugError::SizeExceeded(message),
            ErrorCode::EvalSyntaxError => DebugError::EvalSyntax {
                message,
                position: body.position.unwrap_or(0),
            },
            _ => DebugError::InvalidParameter(message),
        }
    }
}
