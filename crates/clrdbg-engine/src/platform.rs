//! The managed-runtime debug primitive, as consumed by the engine.
//!
//! The native debug API is a platform capability, not something this crate
//! re-implements. These traits name exactly what the engine needs from it:
//! attach/launch, one serialized event callback, execution control, frame
//! and object introspection, raw memory, and metadata enumeration.
//!
//! The event handler is registered at attach/launch time and is invoked on
//! the platform's dedicated callback thread, one event at a time. Its
//! return value answers the continuation question synchronously: the
//! target stays frozen until the handler returns.

use std::collections::BTreeMap;

use clrdbg_protocol::{MemberKind, StepMode, TypeKind, Visibility};
use smol_str::SmolStr;
use thiserror::Error;

/// Failures surfaced by the platform primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("process {0} not found")]
    ProcessNotFound(u32),

    #[error("process {0} hosts no managed runtime")]
    NotManaged(u32),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("attach failed: {0}")]
    AttachFailed(String),

    #[error("launch failed: {0}")]
    LaunchFailed(String),

    #[error("native operation timed out")]
    Timeout,

    #[error("target process is gone")]
    TargetGone,

    #[error("thread {0} not found")]
    ThreadNotFound(u32),

    #[error("frame {0} not available")]
    FrameNotAvailable(u32),

    #[error("object at {0:#x} is not available")]
    ObjectUnavailable(u64),

    #[error("type '{0}' not found in metadata")]
    TypeNotFound(String),

    #[error("module '{0}' not found")]
    ModuleNotFound(String),

    #[error("memory at {address:#x} is unreadable")]
    MemoryUnreadable { address: u64 },

    #[error("breakpoint could not be armed: {0}")]
    BindFailed(String),

    #[error("{0}")]
    Other(String),
}

/// How to launch a new process under the debugger.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub program: String,
    pub argv: Vec<String>,
    pub cwd: Option<String>,
    pub env: BTreeMap<String, String>,
    pub stop_at_entry: bool,
}

/// What the pump tells the platform to do with the target after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Resume the target before returning from the callback.
    AutoContinue,
    /// Leave the target stopped.
    RemainPaused,
}

/// Raw debug events, in the categories the native API delivers.
#[derive(Debug, Clone)]
pub enum NativeEvent {
    ProcessCreated,
    AppDomainCreated,
    AppDomainExited,
    AssemblyLoaded,
    AssemblyUnloaded,
    ThreadCreated { thread_id: u32 },
    ThreadExited { thread_id: u32 },
    NameChange,
    LogMessage { message: String },
    LogSwitch,
    SymbolsUpdated,
    EvalComplete,
    EvalException,
    BreakpointSetError { message: String },
    DebuggerError { message: String },
    EditAndContinueRemap,
    ModuleLoaded { path: String },
    ModuleUnloaded { path: String },
    Breakpoint {
        thread_id: u32,
        module_path: String,
        method_token: u32,
        il_offset: u32,
        function_name: Option<String>,
    },
    StepComplete {
        thread_id: u32,
        module_path: Option<String>,
        method_token: u32,
        il_offset: u32,
        function_name: Option<String>,
    },
    Break {
        thread_id: u32,
        module_path: Option<String>,
        method_token: Option<u32>,
        il_offset: Option<u32>,
    },
    Exception {
        thread_id: u32,
        type_name: String,
        message: Option<String>,
        first_chance: bool,
        module_path: Option<String>,
        method_token: Option<u32>,
        il_offset: Option<u32>,
    },
    ProcessExited { exit_code: i32 },
}

/// The serialized event callback. One invocation at a time per session.
pub type EventHandler = Box<dyn FnMut(NativeEvent) -> Continuation + Send>;

/// A thread in the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawThread {
    pub id: u32,
    pub name: Option<SmolStr>,
}

/// A stack frame as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub index: u32,
    pub function_name: SmolStr,
    pub module_path: Option<String>,
    pub method_token: Option<u32>,
    pub il_offset: Option<u32>,
    pub is_managed: bool,
}

/// A value read from the target. Composite values carry the address that
/// further introspection calls take.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null { type_name: SmolStr },
    Bool(bool),
    Int { value: i64, type_name: SmolStr },
    UInt { value: u64, type_name: SmolStr },
    Float { value: f64, type_name: SmolStr },
    Char(char),
    Str(String),
    Object { address: u64, type_name: SmolStr },
    Array { address: u64, element_type: SmolStr, length: u32 },
}

impl RawValue {
    /// Display type name for this value.
    #[must_use]
    pub fn type_name(&self) -> SmolStr {
        match self {
            RawValue::Null { type_name } => type_name.clone(),
            RawValue::Bool(_) => SmolStr::new_static("System.Boolean"),
            RawValue::Int { type_name, .. }
            | RawValue::UInt { type_name, .. }
            | RawValue::Float { type_name, .. } => type_name.clone(),
            RawValue::Char(_) => SmolStr::new_static("System.Char"),
            RawValue::Str(_) => SmolStr::new_static("System.String"),
            RawValue::Object { type_name, .. } => type_name.clone(),
            RawValue::Array { element_type, .. } => SmolStr::new(format!("{element_type}[]")),
        }
    }

    /// True for null references, including zero-address objects.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null { .. })
            || matches!(self, RawValue::Object { address: 0, .. })
            || matches!(self, RawValue::Array { address: 0, .. })
    }

    /// The heap address for composite values.
    #[must_use]
    pub fn address(&self) -> Option<u64> {
        match self {
            RawValue::Object { address, .. } | RawValue::Array { address, .. } if *address != 0 => {
                Some(*address)
            }
            _ => None,
        }
    }
}

/// A named slot in a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSlot {
    pub name: SmolStr,
    pub value: RawValue,
}

/// Locals, arguments and `this` of one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameSlots {
    pub locals: Vec<RawSlot>,
    pub arguments: Vec<RawSlot>,
    pub this: Option<RawValue>,
}

/// One field of an object snapshot, including inherited fields. Fields are
/// ordered most-derived declaration first, then base types in order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawField {
    pub name: SmolStr,
    pub type_name: SmolStr,
    pub declaring_type: SmolStr,
    pub offset: u32,
    pub size: u32,
    pub is_static: bool,
    pub is_reference: bool,
    pub value: RawValue,
}

/// An object read from the target heap.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSnapshot {
    pub address: u64,
    pub type_name: SmolStr,
    pub size: u32,
    pub fields: Vec<RawField>,
    /// Element values when the object is an array.
    pub elements: Vec<RawValue>,
    pub is_array: bool,
}

/// One field in a raw type layout. Offsets are relative to the data area
/// (after the object header for reference types).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLayoutField {
    pub name: SmolStr,
    pub type_name: SmolStr,
    pub offset: u32,
    pub size: u32,
    pub alignment: u32,
    pub is_reference: bool,
    pub declaring_type: SmolStr,
}

/// Physical layout of one type, own fields only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTypeLayout {
    pub type_name: SmolStr,
    pub total_size: u32,
    pub is_value_type: bool,
    pub base_type: Option<SmolStr>,
    pub fields: Vec<RawLayoutField>,
}

/// A loaded module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawModule {
    pub name: String,
    pub path: String,
    pub is_dynamic: bool,
    pub base_address: Option<u64>,
    pub size: Option<u32>,
}

/// A type row from module metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawType {
    pub full_name: SmolStr,
    pub namespace: SmolStr,
    pub name: SmolStr,
    pub kind: TypeKind,
    pub visibility: Visibility,
    pub token: u32,
}

/// A member row from type metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMember {
    pub name: SmolStr,
    pub kind: MemberKind,
    pub visibility: Visibility,
    pub is_static: bool,
    pub declaring_type: SmolStr,
    pub member_type: Option<SmolStr>,
    pub signature: Option<String>,
    /// Getter visibility, for properties that have one.
    pub getter: Option<Visibility>,
    /// Setter visibility, for properties that have one.
    pub setter: Option<Visibility>,
}

/// Entry points into the native debug shim.
pub trait RuntimePlatform: Send + Sync {
    /// Attach to a running process. `events` is the session's single
    /// callback handler; the platform owns it for the target's lifetime.
    fn attach(
        &self,
        pid: u32,
        timeout: std::time::Duration,
        events: EventHandler,
    ) -> Result<std::sync::Arc<dyn TargetProcess>, PlatformError>;

    /// Start a new process under debugger control.
    fn launch(
        &self,
        spec: &LaunchSpec,
        timeout: std::time::Duration,
        events: EventHandler,
    ) -> Result<std::sync::Arc<dyn TargetProcess>, PlatformError>;
}

/// One attached (or launched) process.
pub trait TargetProcess: Send + Sync {
    fn process_id(&self) -> u32;
    fn process_name(&self) -> String;
    fn executable_path(&self) -> String;
    fn runtime_version(&self) -> String;

    /// Resume target execution.
    fn resume(&self) -> Result<(), PlatformError>;
    /// Ask the platform to stop the target; completion is reported through
    /// a `Break` event.
    fn request_pause(&self) -> Result<(), PlatformError>;
    fn detach(&self) -> Result<(), PlatformError>;
    fn terminate(&self) -> Result<(), PlatformError>;

    /// Arm a native code breakpoint; returns an opaque handle.
    fn set_code_breakpoint(
        &self,
        module_path: &str,
        method_token: u32,
        il_offset: u32,
    ) -> Result<u64, PlatformError>;
    fn clear_code_breakpoint(&self, handle: u64) -> Result<(), PlatformError>;

    /// Arm a native step object on a paused thread.
    fn begin_step(&self, thread_id: u32, mode: StepMode) -> Result<(), PlatformError>;

    fn threads(&self) -> Result<Vec<RawThread>, PlatformError>;
    fn stack_frames(
        &self,
        thread_id: u32,
        start: u32,
        max: u32,
    ) -> Result<Vec<RawFrame>, PlatformError>;
    fn frame_slots(&self, thread_id: u32, frame_index: u32) -> Result<FrameSlots, PlatformError>;

    fn object_snapshot(&self, address: u64) -> Result<ObjectSnapshot, PlatformError>;
    fn type_layout(&self, type_name: &str) -> Result<RawTypeLayout, PlatformError>;
    fn is_subtype(&self, derived: &str, base: &str) -> Result<bool, PlatformError>;

    /// Read raw target memory; returns the number of bytes actually read.
    fn read_memory(&self, address: u64, buf: &mut [u8]) -> Result<usize, PlatformError>;

    fn modules(&self) -> Result<Vec<RawModule>, PlatformError>;
    fn module_types(&self, module_path: &str) -> Result<Vec<RawType>, PlatformError>;
    fn type_members(
        &self,
        type_name: &str,
        module_path: Option<&str>,
    ) -> Result<Vec<RawMember>, PlatformError>;
}
