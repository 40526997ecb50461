//! Scripted in-memory platform for tests and embedder smoke-runs.
//!
//! [`FakePlatform`] hands out [`FakeTarget`]s built from a
//! [`ProcessScript`]: modules, threads, frames, object graphs, type
//! layouts, memory regions and metadata. Tests drive the event pump by
//! injecting [`NativeEvent`]s, which run through the session's real
//! handler exactly like native callbacks would.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use clrdbg_protocol::StepMode;
use clrdbg_symbols::{LinePoint, ResolvedSpan, SequencePoint, SpanResolution};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::platform::{
    Continuation, EventHandler, FrameSlots, LaunchSpec, NativeEvent, ObjectSnapshot,
    PlatformError, RawField, RawFrame, RawMember, RawModule, RawThread, RawType, RawValue,
    RuntimePlatform, TargetProcess,
};
use crate::symbols::SymbolIndex;

/// Recorded control call on a fake target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetCall {
    Resume,
    RequestPause,
    Detach,
    Terminate,
    SetBreakpoint {
        module: String,
        method_token: u32,
        il_offset: u32,
    },
    ClearBreakpoint(u64),
    BeginStep {
        thread_id: u32,
        mode: StepMode,
    },
}

/// Scripted description of one debuggable process.
#[derive(Debug, Clone)]
pub struct ProcessScript {
    pub pid: u32,
    pub name: String,
    pub executable: String,
    pub runtime_version: String,
    pub modules: Vec<RawModule>,
    pub threads: Vec<RawThread>,
    pub frames: FxHashMap<u32, Vec<RawFrame>>,
    pub slots: FxHashMap<(u32, u32), FrameSlots>,
    pub objects: FxHashMap<u64, ObjectSnapshot>,
    pub layouts: FxHashMap<String, crate::platform::RawTypeLayout>,
    pub subtypes: Vec<(String, String)>,
    pub memory: Vec<(u64, Vec<u8>)>,
    pub types: FxHashMap<String, Vec<RawType>>,
    pub members: FxHashMap<String, Vec<RawMember>>,
}

impl ProcessScript {
    #[must_use]
    pub fn new(pid: u32) -> Self {
        Self {
            pid,
            name: "FakeTarget".to_string(),
            executable: "/fake/FakeTarget.dll".to_string(),
            runtime_version: "9.0.0-fake".to_string(),
            modules: Vec::new(),
            threads: vec![RawThread {
                id: 1,
                name: Some(SmolStr::new_static("Main")),
            }],
            frames: FxHashMap::default(),
            slots: FxHashMap::default(),
            objects: FxHashMap::default(),
            layouts: FxHashMap::default(),
            subtypes: Vec::new(),
            memory: Vec::new(),
            types: FxHashMap::default(),
            members: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn with_module(mut self, path: &str) -> Self {
        self.modules.push(RawModule {
            name: crate::session::module_basename(path),
            path: path.to_string(),
            is_dynamic: false,
            base_address: None,
            size: None,
        });
        self
    }

    #[must_use]
    pub fn with_thread(mut self, id: u32, name: &str) -> Self {
        self.threads.push(RawThread {
            id,
            name: Some(SmolStr::new(name)),
        });
        self
    }

    #[must_use]
    pub fn with_frames(mut self, thread_id: u32, frames: Vec<RawFrame>) -> Self {
        self.frames.insert(thread_id, frames);
        self
    }

    #[must_use]
    pub fn with_slots(mut self, thread_id: u32, frame_index: u32, slots: FrameSlots) -> Self {
        self.slots.insert((thread_id, frame_index), slots);
        self
    }

    #[must_use]
    pub fn with_object(mut self, snapshot: ObjectSnapshot) -> Self {
        self.objects.insert(snapshot.address, snapshot);
        self
    }

    #[must_use]
    pub fn with_layout(mut self, layout: crate::platform::RawTypeLayout) -> Self {
        self.layouts.insert(layout.type_name.to_string(), layout);
        self
    }

    #[must_use]
    pub fn with_subtype(mut self, derived: &str, base: &str) -> Self {
        self.subtypes.push((derived.to_string(), base.to_string()));
        self
    }

    #[must_use]
    pub fn with_memory(mut self, address: u64, bytes: Vec<u8>) -> Self {
        self.memory.push((address, bytes));
        self
    }

    #[must_use]
    pub fn with_types(mut self, module_path: &str, types: Vec<RawType>) -> Self {
        self.types.insert(module_path.to_string(), types);
        self
    }

    #[must_use]
    pub fn with_members(mut self, type_name: &str, members: Vec<RawMember>) -> Self {
        self.members.insert(type_name.to_string(), members);
        self
    }

    /// Build a standalone target (no platform, no event handler).
    #[must_use]
    pub fn build_target(self) -> FakeTarget {
        FakeTarget::from_script(self)
    }
}

/// Fluent object-graph builder for scripted heaps.
#[derive(Debug)]
pub struct ObjectBuilder {
    snapshot: ObjectSnapshot,
}

impl ObjectBuilder {
    #[must_use]
    pub fn new(address: u64, type_name: &str) -> Self {
        Self {
            snapshot: ObjectSnapshot {
                address,
                type_name: SmolStr::new(type_name),
                size: 24,
                fields: Vec::new(),
                elements: Vec::new(),
                is_array: false,
            },
        }
    }

    /// An array object with scripted elements.
    #[must_use]
    pub fn array(address: u64, element_type: &str, elements: Vec<RawValue>) -> ObjectSnapshot {
        ObjectSnapshot {
            address,
            type_name: SmolStr::new(format!("{element_type}[]")),
            size: 24 + 8 * u32::try_from(elements.len()).unwrap_or(0),
            fields: Vec::new(),
            elements,
            is_array: true,
        }
    }

    #[must_use]
    pub fn size(mut self, size: u32) -> Self {
        self.snapshot.size = size;
        self
    }

    /// Add a field declared on the object's own type.
    #[must_use]
    pub fn field(self, name: &str, value: RawValue) -> Self {
        let declaring = self.snapshot.type_name.clone();
        self.field_of(declaring.as_str(), name, value)
    }

    /// Add a field with an explicit declaring type (inherited fields come
    /// after the derived ones, matching the platform contract).
    #[must_use]
    pub fn field_of(mut self, declaring_type: &str, name: &str, value: RawValue) -> Self {
        let offset = 8 * u32::try_from(self.snapshot.fields.len()).unwrap_or(0);
        let is_reference = matches!(
            value,
            RawValue::Object { .. } | RawValue::Array { .. } | RawValue::Str(_) | RawValue::Null { .. }
        );
        self.snapshot.fields.push(RawField {
            name: SmolStr::new(name),
            type_name: value.type_name(),
            declaring_type: SmolStr::new(declaring_type),
            offset,
            size: 8,
            is_static: false,
            is_reference,
            value,
        });
        self
    }

    #[must_use]
    pub fn build(self) -> ObjectSnapshot {
        self.snapshot
    }
}

struct TargetState {
    script: ProcessScript,
    handler: Option<EventHandler>,
    calls: Vec<TargetCall>,
    next_handle: u64,
}

/// A scripted target process. Cloning shares the underlying state, so a
/// test can keep a handle for event injection while the session owns the
/// `Arc<dyn TargetProcess>`.
#[derive(Clone)]
pub struct FakeTarget {
    state: Arc<Mutex<TargetState>>,
}

impl FakeTarget {
    #[must_use]
    pub fn from_script(script: ProcessScript) -> Self {
        Self {
            state: Arc::new(Mutex::new(TargetState {
                script,
                handler: None,
                calls: Vec::new(),
                next_handle: 1,
            })),
        }
    }

    pub fn set_handler(&self, handler: EventHandler) {
        self.state.lock().expect("fake target poisoned").handler = Some(handler);
    }

    /// Run one event through the registered handler, exactly as the native
    /// callback thread would: serialized, with the target frozen until the
    /// handler answers.
    pub fn inject(&self, event: NativeEvent) -> Continuation {
        let handler = {
            let mut state = self.state.lock().expect("fake target poisoned");
            state.handler.take()
        };
        let Some(mut handler) = handler else {
            return Continuation::AutoContinue;
        };
        let continuation = handler(event);
        self.state.lock().expect("fake target poisoned").handler = Some(handler);
        continuation
    }

    /// Script a module load: the module appears in enumeration, then the
    /// load event runs through the pump.
    pub fn load_module(&self, path: &str) -> Continuation {
        {
            let mut state = self.state.lock().expect("fake target poisoned");
            if !state.script.modules.iter().any(|module| module.path == path) {
                state.script.modules.push(RawModule {
                    name: crate::session::module_basename(path),
                    path: path.to_string(),
                    is_dynamic: false,
                    base_address: None,
                    size: None,
                });
            }
        }
        self.inject(NativeEvent::ModuleLoaded {
            path: path.to_string(),
        })
    }

    /// Script a module unload.
    pub fn unload_module(&self, path: &str) -> Continuation {
        {
            let mut state = self.state.lock().expect("fake target poisoned");
            state.script.modules.retain(|module| module.path != path);
        }
        self.inject(NativeEvent::ModuleUnloaded {
            path: path.to_string(),
        })
    }

    /// Script target exit.
    pub fn exit_process(&self, exit_code: i32) -> Continuation {
        self.inject(NativeEvent::ProcessExited { exit_code })
    }

    #[must_use]
    pub fn calls(&self) -> Vec<TargetCall> {
        self.state
            .lock()
            .expect("fake target poisoned")
            .calls
            .clone()
    }

    #[must_use]
    pub fn resume_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, TargetCall::Resume))
            .count()
    }

    fn record(&self, call: TargetCall) {
        self.state
            .lock()
            .expect("fake target poisoned")
            .calls
            .push(call);
    }
}

impl TargetProcess for FakeTarget {
    fn process_id(&self) -> u32 {
        self.state.lock().expect("fake target poisoned").script.pid
    }

    fn process_name(&self) -> String {
        self.state
            .lock()
            .expect("fake target poisoned")
            .script
            .name
            .clone()
    }

    fn executable_path(&self) -> String {
        self.state
            .lock()
            .expect("fake target poisoned")
            .script
            .executable
            .clone()
    }

    fn runtime_version(&self) -> String {
        self.state
            .lock()
            .expect("fake target poisoned")
            .script
            .runtime_version
            .clone()
    }

    fn resume(&self) -> Result<(), PlatformError> {
        self.record(TargetCall::Resume);
        Ok(())
    }

    fn request_pause(&self) -> Result<(), PlatformError> {
        self.record(TargetCall::RequestPause);
        Ok(())
    }

    fn detach(&self) -> Result<(), PlatformError> {
        self.record(TargetCall::Detach);
        Ok(())
    }

    fn terminate(&self) -> Result<(), PlatformError> {
        self.record(TargetCall::Terminate);
        Ok(())
    }

    fn set_code_breakpoint(
        &self,
        module_path: &str,
        method_token: u32,
        il_offset: u32,
    ) -> Result<u64, PlatformError> {
        let mut state = self.state.lock().expect("fake target poisoned");
        let handle = state.next_handle;
        state.next_handle += 1;
        state.calls.push(TargetCall::SetBreakpoint {
            module: module_path.to_string(),
            method_token,
            il_offset,
        });
        Ok(handle)
    }

    fn clear_code_breakpoint(&self, handle: u64) -> Result<(), PlatformError> {
        self.record(TargetCall::ClearBreakpoint(handle));
        Ok(())
    }

    fn begin_step(&self, thread_id: u32, mode: StepMode) -> Result<(), PlatformError> {
        self.record(TargetCall::BeginStep { thread_id, mode });
        Ok(())
    }

    fn threads(&self) -> Result<Vec<RawThread>, PlatformError> {
        Ok(self
            .state
            .lock()
            .expect("fake target poisoned")
            .script
            .threads
            .clone())
    }

    fn stack_frames(
        &self,
        thread_id: u32,
        start: u32,
        max: u32,
    ) -> Result<Vec<RawFrame>, PlatformError> {
        let state = self.state.lock().expect("fake target poisoned");
        if !state.script.threads.iter().any(|thread| thread.id == thread_id) {
            return Err(PlatformError::ThreadNotFound(thread_id));
        }
        let frames = state.script.frames.get(&thread_id).cloned().unwrap_or_default();
        Ok(frames
            .into_iter()
            .skip(start as usize)
            .take(max as usize)
            .collect())
    }

    fn frame_slots(&self, thread_id: u32, frame_index: u32) -> Result<FrameSlots, PlatformError> {
        let state = self.state.lock().expect("fake target poisoned");
        if !state.script.threads.iter().any(|thread| thread.id == thread_id) {
            return Err(PlatformError::ThreadNotFound(thread_id));
        }
        state
            .script
            .slots
            .get(&(thread_id, frame_index))
            .cloned()
            .ok_or(PlatformError::FrameNotAvailable(frame_index))
    }

    fn object_snapshot(&self, address: u64) -> Result<ObjectSnapshot, PlatformError> {
        self.state
            .lock()
            .expect("fake target poisoned")
            .script
            .objects
            .get(&address)
            .cloned()
            .ok_or(PlatformError::ObjectUnavailable(address))
    }

    fn type_layout(
        &self,
        type_name: &str,
    ) -> Result<crate::platform::RawTypeLayout, PlatformError> {
        self.state
            .lock()
            .expect("fake target poisoned")
            .script
            .layouts
            .get(type_name)
            .cloned()
            .ok_or_else(|| PlatformError::TypeNotFound(type_name.to_string()))
    }

    fn is_subtype(&self, derived: &str, base: &str) -> Result<bool, PlatformError> {
        let state = self.state.lock().expect("fake target poisoned");
        // transitive walk over scripted (derived, base) pairs
        let mut pending = vec![derived.to_string()];
        let mut seen = Vec::new();
        while let Some(current) = pending.pop() {
            if current == base {
                return Ok(true);
            }
            if seen.contains(&current) {
                continue;
            }
            seen.push(current.clone());
            for (sub, sup) in &state.script.subtypes {
                if *sub == current {
                    pending.push(sup.clone());
                }
            }
        }
        Ok(false)
    }

    fn read_memory(&self, address: u64, buf: &mut [u8]) -> Result<usize, PlatformError> {
        let state = self.state.lock().expect("fake target poisoned");
        for (base, bytes) in &state.script.memory {
            let end = base + bytes.len() as u64;
            if address >= *base && address < end {
                let offset = (address - base) as usize;
                let available = bytes.len() - offset;
                let count = available.min(buf.len());
                buf[..count].copy_from_slice(&bytes[offset..offset + count]);
                return Ok(count);
            }
        }
        Err(PlatformError::MemoryUnreadable { address })
    }

    fn modules(&self) -> Result<Vec<RawModule>, PlatformError> {
        Ok(self
            .state
            .lock()
            .expect("fake target poisoned")
            .script
            .modules
            .clone())
    }

    fn module_types(&self, module_path: &str) -> Result<Vec<RawType>, PlatformError> {
        Ok(self
            .state
            .lock()
            .expect("fake target poisoned")
            .script
            .types
            .get(module_path)
            .cloned()
            .unwrap_or_default())
    }

    fn type_members(
        &self,
        type_name: &str,
        _module_path: Option<&str>,
    ) -> Result<Vec<RawMember>, PlatformError> {
        self.state
            .lock()
            .expect("fake target poisoned")
            .script
            .members
            .get(type_name)
            .cloned()
            .ok_or_else(|| PlatformError::TypeNotFound(type_name.to_string()))
    }
}

#[derive(Default)]
struct PlatformInner {
    scripts: FxHashMap<u32, ProcessScript>,
    targets: FxHashMap<u32, FakeTarget>,
    launch_script: Option<ProcessScript>,
    launches: Vec<LaunchSpec>,
    attach_failures: FxHashMap<u32, PlatformError>,
}

/// Scripted platform. Clone it before handing it to the session to keep a
/// handle for event injection and assertions.
#[derive(Clone, Default)]
pub struct FakePlatform {
    inner: Arc<Mutex<PlatformInner>>,
}

impl FakePlatform {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_process(&self, script: ProcessScript) {
        let mut inner = self.inner.lock().expect("fake platform poisoned");
        inner.scripts.insert(script.pid, script);
    }

    pub fn set_launch_script(&self, script: ProcessScript) {
        self.inner
            .lock()
            .expect("fake platform poisoned")
            .launch_script = Some(script);
    }

    /// Script an attach failure for a pid that does have a process.
    pub fn fail_attach(&self, pid: u32, error: PlatformError) {
        self.inner
            .lock()
            .expect("fake platform poisoned")
            .attach_failures
            .insert(pid, error);
    }

    /// The live target for an attached pid.
    #[must_use]
    pub fn target(&self, pid: u32) -> Option<FakeTarget> {
        self.inner
            .lock()
            .expect("fake platform poisoned")
            .targets
            .get(&pid)
            .cloned()
    }

    #[must_use]
    pub fn launches(&self) -> Vec<LaunchSpec> {
        self.inner
            .lock()
            .expect("fake platform poisoned")
            .launches
            .clone()
    }
}

impl RuntimePlatform for FakePlatform {
    fn attach(
        &self,
        pid: u32,
        _timeout: std::time::Duration,
        events: EventHandler,
    ) -> Result<Arc<dyn TargetProcess>, PlatformError> {
        let mut inner = self.inner.lock().expect("fake platform poisoned");
        if let Some(error) = inner.attach_failures.get(&pid) {
            return Err(error.clone());
        }
        let script = inner
            .scripts
            .get(&pid)
            .cloned()
            .ok_or(PlatformError::ProcessNotFound(pid))?;
        let target = FakeTarget::from_script(script);
        target.set_handler(events);
        inner.targets.insert(pid, target.clone());
        Ok(Arc::new(target))
    }

    fn launch(
        &self,
        spec: &LaunchSpec,
        _timeout: std::time::Duration,
        events: EventHandler,
    ) -> Result<Arc<dyn TargetProcess>, PlatformError> {
        let mut inner = self.inner.lock().expect("fake platform poisoned");
        inner.launches.push(spec.clone());
        let script = inner.launch_script.clone().unwrap_or_else(|| {
            let mut script = ProcessScript::new(30_000 + inner.launches.len() as u32);
            script.executable.clone_from(&spec.program);
            script
        });
        let pid = script.pid;
        let target = FakeTarget::from_script(script);
        target.set_handler(events);
        inner.targets.insert(pid, target.clone());
        Ok(Arc::new(target))
    }
}

/// Scripted symbol index: spans registered up front, no file I/O.
#[derive(Default)]
pub struct ScriptedSymbols {
    entries: Mutex<Vec<ScriptedSpan>>,
}

#[derive(Debug, Clone)]
struct ScriptedSpan {
    assembly: PathBuf,
    file: String,
    line: u32,
    method_token: u32,
    il_offset: u32,
}

impl ScriptedSymbols {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one source line → IL mapping.
    pub fn add_span(&self, assembly: &str, file: &str, line: u32, method_token: u32, il_offset: u32) {
        self.entries
            .lock()
            .expect("scripted symbols poisoned")
            .push(ScriptedSpan {
                assembly: PathBuf::from(assembly),
                file: file.to_string(),
                line,
                method_token,
                il_offset,
            });
    }

    fn matching<T>(
        &self,
        assembly: &Path,
        select: impl Fn(&ScriptedSpan) -> Option<T>,
    ) -> Vec<T> {
        self.entries
            .lock()
            .expect("scripted symbols poisoned")
            .iter()
            .filter(|entry| entry.assembly == assembly)
            .filter_map(select)
            .collect()
    }
}

fn file_matches(entry_file: &str, wanted: &str) -> bool {
    let basename = |path: &str| {
        path.replace('\\', "/")
            .rsplit('/')
            .next()
            .unwrap_or(path)
            .to_string()
    };
    entry_file == wanted || basename(entry_file) == basename(wanted)
}

impl SymbolIndex for ScriptedSymbols {
    fn find_il_offset(
        &self,
        assembly: &Path,
        source_file: &str,
        line: u32,
        _column: Option<u32>,
    ) -> Option<SpanResolution> {
        self.matching(assembly, |entry| {
            (file_matches(&entry.file, source_file) && entry.line == line).then(|| SpanResolution {
                method_token: entry.method_token,
                il_offset: entry.il_offset,
                start_line: entry.line,
                start_column: 1,
                end_line: entry.line,
                end_column: 80,
            })
        })
        .into_iter()
        .min_by_key(|span| span.il_offset)
    }

    fn sequence_points_on_line(
        &self,
        assembly: &Path,
        source_file: &str,
        line: u32,
    ) -> Vec<LinePoint> {
        self.matching(assembly, |entry| {
            (file_matches(&entry.file, source_file) && entry.line == line).then(|| LinePoint {
                method_token: entry.method_token,
                point: SequencePoint {
                    il_offset: entry.il_offset,
                    document: 1,
                    start_line: entry.line,
                    start_column: 1,
                    end_line: entry.line,
                    end_column: 80,
                    is_hidden: false,
                },
            })
        })
    }

    fn find_nearest_valid_line(
        &self,
        assembly: &Path,
        source_file: &str,
        requested_line: u32,
        search_range: u32,
    ) -> Option<u32> {
        for distance in 0..=search_range {
            let forward = requested_line.saturating_add(distance);
            if self.find_il_offset(assembly, source_file, forward, None).is_some() {
                return Some(forward);
            }
            if distance > 0 && requested_line > distance {
                let backward = requested_line - distance;
                if self.find_il_offset(assembly, source_file, backward, None).is_some() {
                    return Some(backward);
                }
            }
        }
        None
    }

    fn resolve_offset(
        &self,
        assembly: &Path,
        method_token: u32,
        il_offset: u32,
    ) -> Option<ResolvedSpan> {
        self.matching(assembly, |entry| {
            (entry.method_token == method_token && entry.il_offset <= il_offset).then(|| {
                (
                    entry.il_offset,
                    ResolvedSpan {
                        file: entry.file.clone(),
                        start_line: entry.line,
                        start_column: 1,
                        end_line: entry.line,
                        end_column: 80,
                    },
                )
            })
        })
        .into_iter()
        .max_by_key(|(offset, _)| *offset)
        .map(|(_, span)| span)
    }

    fn has_document(&self, assembly: &Path, source_file: &str) -> bool {
        !self
            .matching(assembly, |entry| {
                file_matches(&entry.file, source_file).then_some(())
            })
            .is_empty()
    }
}
