//! Response records and shared model types.

use serde::{Deserialize, Serialize};

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Disconnected,
    Running,
    Paused,
}

/// Why the target is paused. Populated iff the session is `Paused`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PauseReason {
    Breakpoint,
    Step,
    Exception,
    Pause,
    Entry,
}

/// How the session was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LaunchMode {
    Attach,
    Launch,
}

/// Step granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepMode {
    In,
    Over,
    Out,
}

/// Where a variable lives relative to its frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VariableScope {
    Local,
    Argument,
    This,
    Field,
    Element,
}

/// Scope filter for variable enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScopeFilter {
    #[default]
    All,
    Locals,
    Arguments,
    This,
}

/// Breakpoint lifecycle state. `Disabled` is an orthogonal flag surfaced as
/// a state for display purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BreakpointState {
    Pending,
    Bound,
    Invalid,
    Disabled,
}

/// Immutable source position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_column: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
}

impl SourceLocation {
    /// Placeholder used when debug symbols cannot resolve an event location.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            file: "Unknown".to_string(),
            line: 0,
            column: None,
            end_line: None,
            end_column: None,
            function_name: None,
            module_name: None,
        }
    }
}

/// Snapshot of the attached session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub process_id: u32,
    pub process_name: String,
    pub executable_path: String,
    pub runtime_version: String,
    pub launch_mode: LaunchMode,
    /// Unix milliseconds, UTC.
    pub attached_at_ms: i64,
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pause_reason: Option<PauseReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_thread_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_argv: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_cwd: Option<String>,
}

/// One native binding of a breakpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingInfo {
    pub module_path: String,
    pub method_token: u32,
    pub il_offset: u32,
}

/// A registered code breakpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointInfo {
    pub id: u32,
    pub file: String,
    pub line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    pub enabled: bool,
    /// True once the breakpoint has bound at least once.
    pub verified: bool,
    pub hit_count: u64,
    pub state: BreakpointState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub bindings: Vec<BindingInfo>,
    /// Set on `breakpoint_set` when an identical breakpoint already existed.
    #[serde(default)]
    pub duplicate: bool,
}

/// A registered exception breakpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionBreakpointInfo {
    pub exception_type: String,
    pub include_subtypes: bool,
    pub first_chance: bool,
    pub second_chance: bool,
    pub enabled: bool,
    pub hit_count: u64,
}

/// Exception details attached to a hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionInfo {
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub first_chance: bool,
}

/// A breakpoint hit delivered to awaiters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitInfo {
    /// Absent for anonymous hits (runtime-inserted debug breaks).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakpoint_id: Option<u32>,
    pub thread_id: u32,
    /// Unix milliseconds, UTC.
    pub timestamp_ms: i64,
    pub location: SourceLocation,
    /// Post-increment counter value at the time of the hit.
    pub hit_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionInfo>,
}

/// A target thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadInfo {
    pub id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One stack frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrameInfo {
    pub index: u32,
    pub function_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_token: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub il_offset: Option<u32>,
    pub is_managed: bool,
}

/// A rendered variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub value: String,
    pub scope: VariableScope,
    pub has_children: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Successful expression evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationValue {
    pub value: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub has_children: bool,
}

/// One inspected field of an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldInspection {
    pub name: String,
    pub type_name: String,
    pub value: String,
    pub offset: u32,
    pub size: u32,
    pub has_children: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_count: Option<u32>,
    /// Nested fields, present up to the requested depth.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FieldInspection>,
}

/// Result of walking an object graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectInspection {
    /// Lowercase hex, `0x` prefixed.
    pub address: String,
    pub type_name: String,
    pub size: u32,
    pub fields: Vec<FieldInspection>,
    pub is_null: bool,
    pub has_circular_ref: bool,
    pub truncated: bool,
}

/// Why a padding gap exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaddingReason {
    Alignment,
    Tail,
}

/// A gap between fields, or between the last field and the type end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaddingInfo {
    pub offset: u32,
    pub size: u32,
    pub reason: PaddingReason,
}

/// One field in a type layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutField {
    pub name: String,
    pub type_name: String,
    pub offset: u32,
    pub size: u32,
    pub alignment: u32,
    pub is_reference: bool,
    pub declaring_type: String,
}

/// Physical layout of a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeLayout {
    pub type_name: String,
    pub total_size: u32,
    /// Zero for value types.
    pub header_size: u32,
    pub data_size: u32,
    pub fields: Vec<LayoutField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<Vec<PaddingInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_type: Option<String>,
    pub is_value_type: bool,
}

/// How one object references another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceKind {
    Field,
    ArrayElement,
    Static,
}

/// Direction selector for `references_get`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceDirection {
    #[default]
    Outbound,
    Inbound,
    Both,
}

/// One outbound reference edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundReference {
    pub source_address: String,
    pub source_type: String,
    pub target_address: String,
    pub target_type: String,
    pub path: String,
    pub kind: ReferenceKind,
}

/// Reference-graph walk result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencesResult {
    pub target_address: String,
    pub target_type: String,
    pub outbound: Vec<OutboundReference>,
    pub outbound_count: u32,
    pub truncated: bool,
    /// Present when the request asked for inbound references.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Output format for memory reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MemoryFormat {
    Hex,
    #[default]
    HexAscii,
    Raw,
}

/// Result of a bounded memory read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryReadResult {
    pub address: String,
    pub requested_size: u32,
    pub bytes_read: u32,
    /// Lowercase hex without separators; absent for `raw`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// ASCII rendering with non-printables as `.`; only for `hex_ascii`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ascii: Option<String>,
    /// Raw bytes; only for `raw`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Vec<u8>>,
    /// Populated when the platform returned a partial read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A loaded module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInfo {
    pub name: String,
    pub path: String,
    pub is_system: bool,
    pub is_dynamic: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

/// Type kind per runtime metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeKind {
    Class,
    Interface,
    Struct,
    Enum,
    Delegate,
}

/// Member or type visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Visibility {
    Public,
    Internal,
    Protected,
    Private,
}

/// A type from the metadata catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeInfo {
    pub full_name: String,
    pub namespace: String,
    pub name: String,
    pub kind: TypeKind,
    pub visibility: Visibility,
    pub token: u32,
    pub module: String,
}

/// Direct child-namespace summary for a `types_get` page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSummary {
    pub name: String,
    pub type_count: u32,
}

/// One page of `types_get` results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypesPage {
    pub types: Vec<TypeInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
    pub namespaces: Vec<NamespaceSummary>,
    pub total_matched: u32,
}

/// Member kind selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MemberKind {
    Method,
    Property,
    Field,
    Event,
}

/// A member from the metadata catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    pub name: String,
    pub kind: MemberKind,
    pub visibility: Visibility,
    pub is_static: bool,
    pub declaring_type: String,
    /// Field/property/return type, when metadata carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Getter visibility; present iff the property has a getter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub getter: Option<Visibility>,
    /// Setter visibility; present iff the property has a setter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setter: Option<Visibility>,
}

/// What `modules_search` looks through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchKind {
    #[default]
    Types,
    Methods,
    Both,
}

/// Kind of a single search match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchMatchKind {
    Type,
    Method,
}

/// One wildcard search match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMatch {
    pub kind: SearchMatchKind,
    pub name: String,
    pub full_name: String,
    pub module: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declaring_type: Option<String>,
}
