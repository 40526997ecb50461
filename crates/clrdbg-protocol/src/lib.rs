//! Typed operation surface for the clrdbg debugging service.
//!
//! This crate carries no behavior: it defines the request and response
//! records every operation exchanges, the closed error-code taxonomy, and
//! the numeric bounds the engine enforces. Transport adapters are free to
//! rename or reshape these records; the engine is not.

mod error;
mod limits;
mod model;
mod requests;

pub use error::{ErrorBody, ErrorCode, Outcome};
pub use limits::*;
pub use model::{
    BindingInfo, BreakpointInfo, BreakpointState, EvaluationValue, ExceptionBreakpointInfo,
    ExceptionInfo, FieldInspection, HitInfo, LaunchMode, LayoutField, MemberInfo, MemberKind,
    MemoryFormat, MemoryReadResult, ModuleInfo, NamespaceSummary, ObjectInspection,
    OutboundReference, PaddingInfo, PaddingReason, PauseReason, ReferenceDirection, ReferenceKind,
    ReferencesResult, ScopeFilter, SearchKind, SearchMatch, SearchMatchKind, SessionInfo,
    SessionState, SourceLocation, StackFrameInfo, StepMode, ThreadInfo, TypeInfo, TypeKind,
    TypeLayout, TypesPage, VariableInfo, VariableScope, Visibility,
};
pub use requests::{
    AttachRequest, BreakpointSetRequest, BreakpointWaitRequest, DisconnectRequest,
    EvaluateRequest, ExceptionBreakpointRequest, LaunchRequest, LayoutRequest,
    MembersGetRequest, MemoryReadRequest, ModulesListRequest, ObjectInspectRequest,
    ReferencesRequest, SearchRequest, StackTraceRequest, StepRequest, TypesGetRequest,
    VariablesRequest,
};
