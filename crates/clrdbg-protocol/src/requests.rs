//! Request records and their bound validation.
//!
//! Validation rejects caller input before any state is touched; every
//! rejection names the offending field in the message.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorBody, ErrorCode};
use crate::limits::{
    MAX_ATTACH_TIMEOUT_MS, MAX_EVAL_TIMEOUT_MS, MAX_INSPECT_DEPTH, MAX_MEMORY_READ,
    MAX_REFERENCE_RESULTS, MAX_SEARCH_RESULTS, MAX_STACK_FRAMES, MAX_TYPE_RESULTS,
    MAX_WAIT_TIMEOUT_MS, MIN_ATTACH_TIMEOUT_MS, MIN_EVAL_TIMEOUT_MS, MIN_INSPECT_DEPTH,
    MIN_MEMORY_READ, MIN_WAIT_TIMEOUT_MS,
};
use crate::model::{
    MemberKind, MemoryFormat, ReferenceDirection, ScopeFilter, SearchKind, StepMode, TypeKind,
    Visibility,
};

fn invalid(code: ErrorCode, message: impl Into<String>) -> ErrorBody {
    ErrorBody::new(code, message)
}

fn check_timeout(
    value: u64,
    min: u64,
    max: u64,
    field: &str,
) -> Result<(), ErrorBody> {
    if value < min || value > max {
        return Err(invalid(
            ErrorCode::InvalidParameter,
            format!("{field} must be within [{min}, {max}] ms, got {value}"),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachRequest {
    pub pid: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl AttachRequest {
    pub fn validate(&self) -> Result<(), ErrorBody> {
        if self.pid == 0 {
            return Err(invalid(ErrorCode::InvalidParameter, "pid must be non-zero"));
        }
        if let Some(timeout) = self.timeout_ms {
            check_timeout(timeout, MIN_ATTACH_TIMEOUT_MS, MAX_ATTACH_TIMEOUT_MS, "timeout_ms")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchRequest {
    pub program: String,
    #[serde(default)]
    pub argv: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub stop_at_entry: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl LaunchRequest {
    pub fn validate(&self) -> Result<(), ErrorBody> {
        if self.program.trim().is_empty() {
            return Err(invalid(ErrorCode::InvalidFile, "program must be non-empty"));
        }
        if let Some(timeout) = self.timeout_ms {
            check_timeout(timeout, MIN_ATTACH_TIMEOUT_MS, MAX_ATTACH_TIMEOUT_MS, "timeout_ms")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectRequest {
    #[serde(default)]
    pub terminate_process: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRequest {
    pub mode: StepMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<u32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTraceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<u32>,
    #[serde(default)]
    pub start_frame: u32,
    pub max_frames: u32,
}

impl StackTraceRequest {
    pub fn validate(&self) -> Result<(), ErrorBody> {
        if self.max_frames == 0 || self.max_frames > MAX_STACK_FRAMES {
            return Err(invalid(
                ErrorCode::InvalidParameter,
                format!("max_frames must be within [1, {MAX_STACK_FRAMES}]"),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<u32>,
    #[serde(default)]
    pub frame_index: u32,
    #[serde(default)]
    pub scope: ScopeFilter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expand: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRequest {
    pub expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<u32>,
    #[serde(default)]
    pub frame_index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl EvaluateRequest {
    pub fn validate(&self) -> Result<(), ErrorBody> {
        if self.expression.is_empty() {
            return Err(
                invalid(ErrorCode::EvalSyntaxError, "expression is empty").with_position(0),
            );
        }
        if let Some(timeout) = self.timeout_ms {
            check_timeout(timeout, MIN_EVAL_TIMEOUT_MS, MAX_EVAL_TIMEOUT_MS, "timeout_ms")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectInspectRequest {
    pub object_ref: String,
    pub depth: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<u32>,
    #[serde(default)]
    pub frame_index: u32,
}

impl ObjectInspectRequest {
    pub fn validate(&self) -> Result<(), ErrorBody> {
        if self.depth < MIN_INSPECT_DEPTH || self.depth > MAX_INSPECT_DEPTH {
            return Err(invalid(
                ErrorCode::InvalidParameter,
                format!("depth must be within [{MIN_INSPECT_DEPTH}, {MAX_INSPECT_DEPTH}]"),
            ));
        }
        if self.object_ref.trim().is_empty() {
            return Err(invalid(ErrorCode::InvalidReference, "object_ref is empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryReadRequest {
    pub address: String,
    pub size: u32,
    #[serde(default)]
    pub format: MemoryFormat,
}

impl MemoryReadRequest {
    pub fn validate(&self) -> Result<(), ErrorBody> {
        if self.size < MIN_MEMORY_READ {
            return Err(invalid(ErrorCode::InvalidParameter, "size must be at least 1"));
        }
        if self.size > MAX_MEMORY_READ {
            return Err(invalid(
                ErrorCode::SizeExceeded,
                format!("size must not exceed {MAX_MEMORY_READ} bytes"),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRequest {
    pub type_name: String,
    #[serde(default)]
    pub include_inherited: bool,
    #[serde(default)]
    pub include_padding: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<u32>,
    #[serde(default)]
    pub frame_index: u32,
}

impl LayoutRequest {
    pub fn validate(&self) -> Result<(), ErrorBody> {
        if self.type_name.trim().is_empty() {
            return Err(invalid(ErrorCode::InvalidParameter, "type_name is empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencesRequest {
    pub object_ref: String,
    #[serde(default)]
    pub direction: ReferenceDirection,
    pub max_results: u32,
    #[serde(default)]
    pub include_arrays: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<u32>,
    #[serde(default)]
    pub frame_index: u32,
}

impl ReferencesRequest {
    pub fn validate(&self) -> Result<(), ErrorBody> {
        if self.max_results == 0 || self.max_results > MAX_REFERENCE_RESULTS {
            return Err(invalid(
                ErrorCode::InvalidParameter,
                format!("max_results must be within [1, {MAX_REFERENCE_RESULTS}]"),
            ));
        }
        if self.object_ref.trim().is_empty() {
            return Err(invalid(ErrorCode::InvalidReference, "object_ref is empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointSetRequest {
    pub file: String,
    pub line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl BreakpointSetRequest {
    pub fn validate(&self) -> Result<(), ErrorBody> {
        if self.file.trim().is_empty() {
            return Err(invalid(ErrorCode::InvalidFile, "file must be non-empty"));
        }
        if self.line == 0 {
            return Err(invalid(ErrorCode::InvalidLine, "line is 1-based"));
        }
        if self.column == Some(0) {
            return Err(invalid(ErrorCode::InvalidColumn, "column is 1-based"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionBreakpointRequest {
    pub exception_type: String,
    #[serde(default)]
    pub first_chance: bool,
    #[serde(default = "default_true")]
    pub second_chance: bool,
    #[serde(default)]
    pub include_subtypes: bool,
}

fn default_true() -> bool {
    true
}

impl ExceptionBreakpointRequest {
    pub fn validate(&self) -> Result<(), ErrorBody> {
        if self.exception_type.trim().is_empty() {
            return Err(invalid(
                ErrorCode::InvalidParameter,
                "exception_type must be non-empty",
            ));
        }
        if !self.first_chance && !self.second_chance {
            return Err(invalid(
                ErrorCode::InvalidParameter,
                "at least one of first_chance/second_chance must be set",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointWaitRequest {
    pub timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakpoint_id: Option<u32>,
}

impl BreakpointWaitRequest {
    pub fn validate(&self) -> Result<(), ErrorBody> {
        check_timeout(self.timeout_ms, MIN_WAIT_TIMEOUT_MS, MAX_WAIT_TIMEOUT_MS, "timeout_ms")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModulesListRequest {
    #[serde(default)]
    pub include_system: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_filter: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypesGetRequest {
    pub module: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<TypeKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    pub max_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
}

impl TypesGetRequest {
    pub fn validate(&self) -> Result<(), ErrorBody> {
        if self.module.trim().is_empty() {
            return Err(invalid(ErrorCode::InvalidParameter, "module must be non-empty"));
        }
        if self.max_results == 0 || self.max_results > MAX_TYPE_RESULTS {
            return Err(invalid(
                ErrorCode::InvalidParameter,
                format!("max_results must be within [1, {MAX_TYPE_RESULTS}]"),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembersGetRequest {
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default)]
    pub include_inherited: bool,
    /// Unset means all kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_kinds: Option<Vec<MemberKind>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(default = "default_true")]
    pub include_static: bool,
    #[serde(default = "default_true")]
    pub include_instance: bool,
}

impl MembersGetRequest {
    pub fn validate(&self) -> Result<(), ErrorBody> {
        if self.type_name.trim().is_empty() {
            return Err(invalid(ErrorCode::InvalidParameter, "type_name must be non-empty"));
        }
        if !self.include_static && !self.include_instance {
            return Err(invalid(
                ErrorCode::InvalidParameter,
                "at least one of include_static/include_instance must be set",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub pattern: String,
    #[serde(default)]
    pub search_type: SearchKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_filter: Option<String>,
    #[serde(default)]
    pub case_sensitive: bool,
    pub max_results: u32,
}

impl SearchRequest {
    pub fn validate(&self) -> Result<(), ErrorBody> {
        if self.pattern.trim().is_empty() {
            return Err(invalid(ErrorCode::InvalidPattern, "pattern must be non-empty"));
        }
        if self.max_results == 0 || self.max_results > MAX_SEARCH_RESULTS {
            return Err(invalid(
                ErrorCode::InvalidParameter,
                format!("max_results must be within [1, {MAX_SEARCH_RESULTS}]"),
            ));
        }
        Ok(())
    }
}
