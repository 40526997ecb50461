//! Session lifecycle and state machine.
//!
//! At most one session exists per engine. The session monitor is the only
//! place session state mutates; every transition publishes a
//! [`DebugEvent::SessionStateChanged`] after the monitor is released, so
//! subscriber callbacks never run under the lock.

use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use clrdbg_protocol::{
    AttachRequest, BreakpointInfo, BreakpointSetRequest, BreakpointWaitRequest,
    EvaluateRequest, EvaluationValue, ExceptionBreakpointInfo, ExceptionBreakpointRequest,
    HitInfo, LaunchMode, LaunchRequest, LayoutRequest, MemberInfo, MembersGetRequest,
    MemoryReadRequest, MemoryReadResult, ModuleInfo, ModulesListRequest, ObjectInspectRequest,
    ObjectInspection, PauseReason, ReferencesRequest, ReferencesResult, SearchMatch,
    SearchRequest, SessionInfo, SessionState, SourceLocation, StackFrameInfo, StackTraceRequest,
    StepRequest, ThreadInfo, TypesGetRequest, TypesPage, VariablesRequest, VariableInfo,
    DEFAULT_ATTACH_TIMEOUT_MS,
};

use crate::breakpoints::BreakpointRegistry;
use crate::cancel::{next_slice, CancelToken};
use crate::catalog;
use crate::error::DebugError;
use crate::inspect;
use crate::platform::{LaunchSpec, PlatformError, RuntimePlatform, TargetProcess};
use crate::pump;
use crate::symbols::SymbolIndex;
use crate::trace::instrument;

// `StepMode` reaches the platform unchanged.
use clrdbg_protocol::StepMode;

/// Typed events delivered to subscribers. Dispatch happens strictly after
/// the session monitor is released; subscribers must not call back into the
/// engine from the receiving thread's dispatch context.
#[derive(Debug, Clone)]
pub enum DebugEvent {
    SessionStateChanged {
        old: SessionState,
        new: SessionState,
        reason: Option<PauseReason>,
        location: Option<SourceLocation>,
        thread_id: Option<u32>,
    },
    ModuleLoaded {
        path: String,
    },
    ModuleUnloaded {
        path: String,
    },
    BreakpointBound {
        breakpoint_id: u32,
        module_path: String,
    },
    BreakpointHit {
        hit: HitInfo,
    },
    TargetExited {
        exit_code: i32,
    },
}

/// Result of a bounded breakpoint wait.
#[derive(Debug, Clone)]
pub enum BreakpointWait {
    Hit(HitInfo),
    TimedOut,
    /// The session ended while waiting.
    Disconnected,
}

#[derive(Debug, Clone)]
pub(crate) struct SessionRecord {
    pub process_id: u32,
    pub process_name: String,
    pub executable_path: String,
    pub runtime_version: String,
    pub launch_mode: LaunchMode,
    pub attached_at_ms: i64,
    pub state: SessionState,
    pub pause_reason: Option<PauseReason>,
    pub location: Option<SourceLocation>,
    pub active_thread_id: Option<u32>,
    pub launch_argv: Option<Vec<String>>,
    pub launch_cwd: Option<String>,
}

impl SessionRecord {
    fn to_info(&self) -> SessionInfo {
        SessionInfo {
            process_id: self.process_id,
            process_name: self.process_name.clone(),
            executable_path: self.executable_path.clone(),
            runtime_version: self.runtime_version.clone(),
            launch_mode: self.launch_mode,
            attached_at_ms: self.attached_at_ms,
            state: self.state,
            pause_reason: self.pause_reason,
            location: self.location.clone(),
            active_thread_id: self.active_thread_id,
            launch_argv: self.launch_argv.clone(),
            launch_cwd: self.launch_cwd.clone(),
        }
    }
}

#[derive(Default)]
pub(crate) struct SessionCore {
    pub record: Option<SessionRecord>,
    pub target: Option<Arc<dyn TargetProcess>>,
    pub pending_step: Option<StepMode>,
    pub entry_pending: bool,
    attach_in_progress: bool,
}

pub(crate) struct SessionInner {
    pub platform: Box<dyn RuntimePlatform>,
    pub core: Mutex<SessionCore>,
    pub condvar: Condvar,
    pub breakpoints: BreakpointRegistry,
    pub symbols: Arc<dyn SymbolIndex>,
    subscribers: Mutex<Vec<Sender<DebugEvent>>>,
}

impl SessionInner {
    /// Deliver an event to every subscriber; closed receivers are pruned.
    /// Never call while holding the session monitor.
    pub(crate) fn dispatch(&self, event: &DebugEvent) {
        let mut subscribers = self.subscribers.lock().expect("subscriber list poisoned");
        subscribers.retain(|sender| sender.send(event.clone()).is_ok());
    }

    pub(crate) fn current_state(&self) -> SessionState {
        let core = self.core.lock().expect("session monitor poisoned");
        core.record
            .as_ref()
            .map_or(SessionState::Disconnected, |record| record.state)
    }

    pub(crate) fn target(&self) -> Option<Arc<dyn TargetProcess>> {
        let core = self.core.lock().expect("session monitor poisoned");
        core.target.clone()
    }

    pub(crate) fn require_target(&self) -> Result<Arc<dyn TargetProcess>, DebugError> {
        self.target().ok_or(DebugError::NoSession)
    }

    /// Target plus the active thread, legal only while paused.
    pub(crate) fn require_paused(
        &self,
    ) -> Result<(Arc<dyn TargetProcess>, Option<u32>), DebugError> {
        let core = self.core.lock().expect("session monitor poisoned");
        let record = core.record.as_ref().ok_or(DebugError::NoSession)?;
        if record.state != SessionState::Paused {
            return Err(DebugError::NotPaused(
                "operation requires a paused target".into(),
            ));
        }
        let target = core.target.clone().ok_or(DebugError::NoSession)?;
        Ok((target, record.active_thread_id))
    }

    /// Transition to `Paused` and publish the change. `extra` events (the
    /// hit that caused the pause) are dispatched first so the pair is
    /// observed against the already-updated state.
    pub(crate) fn mark_paused(
        &self,
        reason: PauseReason,
        location: SourceLocation,
        thread_id: u32,
        extra: Option<DebugEvent>,
    ) {
        let change = {
            let mut core = self.core.lock().expect("session monitor poisoned");
            let Some(record) = core.record.as_mut() else {
                return;
            };
            let old = record.state;
            record.state = SessionState::Paused;
            record.pause_reason = Some(reason);
            record.location = Some(location.clone());
            record.active_thread_id = Some(thread_id);
            self.condvar.notify_all();
            DebugEvent::SessionStateChanged {
                old,
                new: SessionState::Paused,
                reason: Some(reason),
                location: Some(location),
                thread_id: Some(thread_id),
            }
        };
        if let Some(event) = extra {
            self.dispatch(&event);
        }
        self.dispatch(&change);
    }

    /// Clear the session (target exit or forced teardown) and publish the
    /// transition. Idempotent.
    pub(crate) fn clear_session(&self) -> Option<SessionState> {
        let old = {
            let mut core = self.core.lock().expect("session monitor poisoned");
            let record = core.record.take()?;
            core.target = None;
            core.pending_step = None;
            core.entry_pending = false;
            self.condvar.notify_all();
            record.state
        };
        self.breakpoints.drop_all_bindings();
        self.dispatch(&DebugEvent::SessionStateChanged {
            old,
            new: SessionState::Disconnected,
            reason: None,
            location: None,
            thread_id: None,
        });
        Some(old)
    }
}

/// The session manager: single-session lifecycle, execution control, and
/// delegation to breakpoints, inspection and the metadata catalog.
#[derive(Clone)]
pub struct DebugSession {
    inner: Arc<SessionInner>,
}

impl DebugSession {
    #[must_use]
    pub fn new(platform: Box<dyn RuntimePlatform>, symbols: Arc<dyn SymbolIndex>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                platform,
                core: Mutex::new(SessionCore::default()),
                condvar: Condvar::new(),
                breakpoints: BreakpointRegistry::new(),
                symbols,
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Register a subscriber for typed events.
    pub fn subscribe(&self, sender: Sender<DebugEvent>) {
        self.inner
            .subscribers
            .lock()
            .expect("subscriber list poisoned")
            .push(sender);
    }

    /// Current state; `Disconnected` when no session exists.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.current_state()
    }

    /// Snapshot of the session, if one exists.
    #[must_use]
    pub fn session_info(&self) -> Option<SessionInfo> {
        let core = self.inner.core.lock().expect("session monitor poisoned");
        core.record.as_ref().map(SessionRecord::to_info)
    }

    /// Attach to a running process.
    pub fn attach(
        &self,
        request: &AttachRequest,
        cancel: &CancelToken,
    ) -> Result<SessionInfo, DebugError> {
        instrument("attach", || {
            request.validate().map_err(DebugError::from)?;
            if cancel.is_cancelled() {
                return Err(DebugError::Cancelled);
            }
            let timeout =
                Duration::from_millis(request.timeout_ms.unwrap_or(DEFAULT_ATTACH_TIMEOUT_MS));
            self.reserve_slot()?;
            let outcome = self.start_session(SessionStart::Attach { pid: request.pid }, timeout);
            if outcome.is_err() {
                self.release_slot();
            }
            outcome
        })
    }

    /// Launch a new process under debugger control.
    pub fn launch(
        &self,
        request: &LaunchRequest,
        cancel: &CancelToken,
    ) -> Result<SessionInfo, DebugError> {
        instrument("launch", || {
            request.validate().map_err(DebugError::from)?;
            if cancel.is_cancelled() {
                return Err(DebugError::Cancelled);
            }
            let timeout =
                Duration::from_millis(request.timeout_ms.unwrap_or(DEFAULT_ATTACH_TIMEOUT_MS));
            self.reserve_slot()?;
            let outcome = self.start_session(
                SessionStart::Launch {
                    spec: LaunchSpec {
                        program: request.program.clone(),
                        argv: request.argv.clone(),
                        cwd: request.cwd.clone(),
                        env: request.env.clone(),
                        stop_at_entry: request.stop_at_entry,
                    },
                },
                timeout,
            );
            if outcome.is_err() {
                self.release_slot();
            }
            outcome
        })
    }

    /// Disconnect from the target. Idempotent: succeeds with no-op
    /// semantics when already disconnected.
    pub fn disconnect(&self, terminate_process: bool) -> Result<(), DebugError> {
        instrument("disconnect", || {
            let (target, old) = {
                let mut core = self.inner.core.lock().expect("session monitor poisoned");
                let Some(record) = core.record.take() else {
                    return Ok(());
                };
                let target = core.target.take();
                core.pending_step = None;
                core.entry_pending = false;
                self.inner.condvar.notify_all();
                (target, record.state)
            };
            self.inner.breakpoints.drop_all_bindings();
            if let Some(target) = target {
                let result = if terminate_process {
                    target.terminate()
                } else {
                    target.detach()
                };
                if let Err(err) = result {
                    // Forced to Disconnected regardless; the native side may
                    // leak one reference.
                    tracing::warn!(error = %err, "detach_failed_forcing_disconnect");
                }
            }
            self.inner.dispatch(&DebugEvent::SessionStateChanged {
                old,
                new: SessionState::Disconnected,
                reason: None,
                location: None,
                thread_id: None,
            });
            Ok(())
        })
    }

    /// Resume a paused target.
    pub fn resume(&self) -> Result<(), DebugError> {
        instrument("continue", || {
            let target = self.begin_running(None)?;
            if let Err(err) = target.resume() {
                self.force_disconnect("continue");
                return Err(DebugError::AttachFailed(format!(
                    "continue failed and the session was closed: {err}"
                )));
            }
            Ok(())
        })
    }

    /// Step by one statement in the requested mode.
    pub fn step(&self, request: &StepRequest) -> Result<(), DebugError> {
        instrument("step", || {
            let (target, thread_id) = {
                let core = self.inner.core.lock().expect("session monitor poisoned");
                let record = core.record.as_ref().ok_or(DebugError::NoSession)?;
                if record.state != SessionState::Paused {
                    return Err(DebugError::NotPaused("step requires a paused target".into()));
                }
                let thread_id = request
                    .thread_id
                    .or(record.active_thread_id)
                    .ok_or_else(|| DebugError::StepFailed("no active thread".into()))?;
                let target = core.target.clone().ok_or(DebugError::NoSession)?;
                (target, thread_id)
            };

            let frames = target
                .stack_frames(thread_id, 0, 1)
                .map_err(|err| DebugError::StepFailed(err.to_string()))?;
            if !frames.first().is_some_and(|frame| frame.is_managed) {
                return Err(DebugError::StepFailed(
                    "the active frame is not managed code".into(),
                ));
            }
            target
                .begin_step(thread_id, request.mode)
                .map_err(|err| DebugError::StepFailed(err.to_string()))?;

            let target = self.begin_running(Some(request.mode))?;
            if let Err(err) = target.resume() {
                self.force_disconnect("step");
                return Err(DebugError::AttachFailed(format!(
                    "step failed and the session was closed: {err}"
                )));
            }
            Ok(())
        })
    }

    /// Ask the target to stop; completion arrives as a pause event.
    pub fn pause(&self) -> Result<(), DebugError> {
        instrument("pause", || {
            let target = {
                let core = self.inner.core.lock().expect("session monitor poisoned");
                let record = core.record.as_ref().ok_or(DebugError::NoSession)?;
                if record.state != SessionState::Running {
                    return Err(DebugError::NotPaused(
                        "pause requires a running target".into(),
                    ));
                }
                core.target.clone().ok_or(DebugError::NoSession)?
            };
            target
                .request_pause()
                .map_err(|err| DebugError::AttachFailed(format!("pause failed: {err}")))?;
            Ok(())
        })
    }

    /// Block until the session reaches `target` (or disconnects).
    ///
    /// Target exit during the wait is a clean result: `Disconnected` is
    /// returned rather than an error.
    pub fn wait_for_state(
        &self,
        target: SessionState,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<SessionState, DebugError> {
        let deadline = Instant::now() + timeout;
        let mut core = self.inner.core.lock().expect("session monitor poisoned");
        if core.record.is_none() && target != SessionState::Disconnected {
            return Err(DebugError::NoSession);
        }
        loop {
            let current = core
                .record
                .as_ref()
                .map_or(SessionState::Disconnected, |record| record.state);
            if current == target || current == SessionState::Disconnected {
                return Ok(current);
            }
            if cancel.is_cancelled() {
                return Err(DebugError::Cancelled);
            }
            let Some(slice) = next_slice(deadline) else {
                return Err(DebugError::Timeout);
            };
            let (guard, _) = self
                .inner
                .condvar
                .wait_timeout(core, slice)
                .expect("session monitor poisoned");
            core = guard;
        }
    }

    /// Threads of the attached target.
    pub fn threads(&self) -> Result<Vec<ThreadInfo>, DebugError> {
        instrument("threads", || {
            let target = self.inner.require_target()?;
            let threads = target
                .threads()
                .map_err(|err| DebugError::EnumerationFailed(err.to_string()))?;
            Ok(threads
                .into_iter()
                .map(|thread| ThreadInfo {
                    id: thread.id,
                    name: thread.name.map(|name| name.to_string()),
                })
                .collect())
        })
    }

    /// Stack frames of a paused thread, enriched with source locations.
    pub fn stacktrace(
        &self,
        request: &StackTraceRequest,
    ) -> Result<Vec<StackFrameInfo>, DebugError> {
        instrument("stacktrace", || {
            request.validate().map_err(DebugError::from)?;
            let (target, active_thread) = self.inner.require_paused()?;
            let thread_id = request
                .thread_id
                .or(active_thread)
                .ok_or_else(|| DebugError::StackTraceFailed("no active thread".into()))?;
            let frames = target
                .stack_frames(thread_id, request.start_frame, request.max_frames)
                .map_err(|err| match err {
                    PlatformError::ThreadNotFound(id) => DebugError::InvalidThread(id),
                    other => DebugError::StackTraceFailed(other.to_string()),
                })?;
            Ok(frames
                .into_iter()
                .map(|frame| {
                    let location = match (&frame.module_path, frame.method_token, frame.il_offset)
                    {
                        (Some(module), Some(token), Some(offset)) => Some(pump::enrich_location(
                            &*self.inner.symbols,
                            Some(module),
                            token,
                            offset,
                            Some(frame.function_name.as_str()),
                        )),
                        _ => None,
                    };
                    StackFrameInfo {
                        index: frame.index,
                        function_name: frame.function_name.to_string(),
                        module_name: frame.module_path.as_deref().map(module_basename),
                        location,
                        method_token: frame.method_token,
                        il_offset: frame.il_offset,
                        is_managed: frame.is_managed,
                    }
                })
                .collect())
        })
    }

    // ------------------------------------------------------- inspection

    pub fn variables(&self, request: &VariablesRequest) -> Result<Vec<VariableInfo>, DebugError> {
        instrument("variables", || {
            let (target, active_thread) = self.inner.require_paused()?;
            inspect::variables(&*target, active_thread, request)
        })
    }

    pub fn evaluate(
        &self,
        request: &EvaluateRequest,
        cancel: &CancelToken,
    ) -> Result<EvaluationValue, DebugError> {
        instrument("evaluate", || {
            request.validate().map_err(DebugError::from)?;
            if cancel.is_cancelled() {
                return Err(DebugError::Cancelled);
            }
            let (target, active_thread) = self.inner.require_paused()?;
            inspect::evaluate(&*target, active_thread, request)
        })
    }

    pub fn object_inspect(
        &self,
        request: &ObjectInspectRequest,
    ) -> Result<ObjectInspection, DebugError> {
        instrument("object_inspect", || {
            request.validate().map_err(DebugError::from)?;
            let (target, _) = self.inner.require_paused()?;
            inspect::object_inspect(&*target, request)
        })
    }

    pub fn memory_read(&self, request: &MemoryReadRequest) -> Result<MemoryReadResult, DebugError> {
        instrument("memory_read", || {
            request.validate().map_err(DebugError::from)?;
            let target = self.inner.require_target()?;
            inspect::memory_read(&*target, request)
        })
    }

    pub fn layout_get(&self, request: &LayoutRequest) -> Result<clrdbg_protocol::TypeLayout, DebugError> {
        instrument("layout_get", || {
            request.validate().map_err(DebugError::from)?;
            let target = self.inner.require_target()?;
            inspect::layout_get(&*target, request)
        })
    }

    pub fn references_get(
        &self,
        request: &ReferencesRequest,
    ) -> Result<ReferencesResult, DebugError> {
        instrument("references_get", || {
            request.validate().map_err(DebugError::from)?;
            let (target, _) = self.inner.require_paused()?;
            inspect::references_get(&*target, request)
        })
    }

    // ------------------------------------------------------ breakpoints

    pub fn breakpoint_set(
        &self,
        request: &BreakpointSetRequest,
    ) -> Result<BreakpointInfo, DebugError> {
        instrument("breakpoint_set", || {
            request.validate().map_err(DebugError::from)?;
            let target = self.inner.target();
            self.inner
                .breakpoints
                .set(request, target.as_deref(), &*self.inner.symbols)
        })
    }

    pub fn breakpoint_set_exception(
        &self,
        request: &ExceptionBreakpointRequest,
    ) -> Result<ExceptionBreakpointInfo, DebugError> {
        instrument("breakpoint_set_exception", || {
            request.validate().map_err(DebugError::from)?;
            Ok(self.inner.breakpoints.set_exception(request))
        })
    }

    #[must_use]
    pub fn breakpoint_list(&self) -> (Vec<BreakpointInfo>, Vec<ExceptionBreakpointInfo>) {
        self.inner.breakpoints.list()
    }

    pub fn breakpoint_remove(&self, id: u32) -> Result<(), DebugError> {
        instrument("breakpoint_remove", || {
            let target = self.inner.target();
            self.inner.breakpoints.remove(id, target.as_deref())
        })
    }

    pub fn breakpoint_enable(&self, id: u32, enabled: bool) -> Result<BreakpointInfo, DebugError> {
        instrument("breakpoint_enable", || {
            self.inner.breakpoints.set_enabled(id, enabled)
        })
    }

    pub fn breakpoint_clear_all(&self) {
        let target = self.inner.target();
        self.inner.breakpoints.clear_all(target.as_deref());
    }

    pub fn breakpoint_remove_exception(&self, exception_type: &str) -> Result<(), DebugError> {
        instrument("breakpoint_remove_exception", || {
            self.inner.breakpoints.remove_exception(exception_type)
        })
    }

    pub fn breakpoint_enable_exception(
        &self,
        exception_type: &str,
        enabled: bool,
    ) -> Result<(), DebugError> {
        instrument("breakpoint_enable_exception", || {
            self.inner
                .breakpoints
                .set_exception_enabled(exception_type, enabled)
        })
    }

    /// Wait for the next (matching) breakpoint hit.
    pub fn breakpoint_wait(
        &self,
        request: &BreakpointWaitRequest,
        cancel: &CancelToken,
    ) -> Result<BreakpointWait, DebugError> {
        instrument("breakpoint_wait", || {
            request.validate().map_err(DebugError::from)?;
            if self.state() == SessionState::Disconnected {
                return Err(DebugError::NoSession);
            }
            let deadline = Instant::now() + Duration::from_millis(request.timeout_ms);
            self.inner.breakpoints.wait_hit(
                deadline,
                request.breakpoint_id,
                cancel,
                || self.inner.current_state() == SessionState::Disconnected,
            )
        })
    }

    // --------------------------------------------------------- metadata

    pub fn modules_list(&self, request: &ModulesListRequest) -> Result<Vec<ModuleInfo>, DebugError> {
        instrument("modules_list", || {
            let target = self.inner.require_target()?;
            catalog::modules_list(&*target, request)
        })
    }

    pub fn types_get(&self, request: &TypesGetRequest) -> Result<TypesPage, DebugError> {
        instrument("types_get", || {
            request.validate().map_err(DebugError::from)?;
            let target = self.inner.require_target()?;
            catalog::types_get(&*target, request)
        })
    }

    pub fn members_get(&self, request: &MembersGetRequest) -> Result<Vec<MemberInfo>, DebugError> {
        instrument("members_get", || {
            request.validate().map_err(DebugError::from)?;
            let target = self.inner.require_target()?;
            catalog::members_get(&*target, request)
        })
    }

    pub fn modules_search(&self, request: &SearchRequest) -> Result<Vec<SearchMatch>, DebugError> {
        instrument("modules_search", || {
            request.validate().map_err(DebugError::from)?;
            let target = self.inner.require_target()?;
            catalog::search(&*target, request)
        })
    }

    // ---------------------------------------------------------- innards

    fn reserve_slot(&self) -> Result<(), DebugError> {
        let mut core = self.inner.core.lock().expect("session monitor poisoned");
        if core.record.is_some() || core.attach_in_progress {
            return Err(DebugError::AlreadyAttached);
        }
        core.attach_in_progress = true;
        Ok(())
    }

    fn release_slot(&self) {
        let mut core = self.inner.core.lock().expect("session monitor poisoned");
        core.attach_in_progress = false;
    }

    fn start_session(
        &self,
        start: SessionStart,
        timeout: Duration,
    ) -> Result<SessionInfo, DebugError> {
        let handler = pump::make_handler(&self.inner);
        let (target, launch_mode, argv, cwd, stop_at_entry) = match start {
            SessionStart::Attach { pid } => {
                let target = self
                    .inner
                    .platform
                    .attach(pid, timeout, handler)
                    .map_err(map_attach_error)?;
                (target, LaunchMode::Attach, None, None, false)
            }
            SessionStart::Launch { spec } => {
                let target = self
                    .inner
                    .platform
                    .launch(&spec, timeout, handler)
                    .map_err(map_launch_error)?;
                (
                    target,
                    LaunchMode::Launch,
                    Some(spec.argv),
                    spec.cwd,
                    spec.stop_at_entry,
                )
            }
        };

        let record = SessionRecord {
            process_id: target.process_id(),
            process_name: target.process_name(),
            executable_path: target.executable_path(),
            runtime_version: target.runtime_version(),
            launch_mode,
            attached_at_ms: now_ms(),
            state: SessionState::Running,
            pause_reason: None,
            location: None,
            active_thread_id: None,
            launch_argv: argv,
            launch_cwd: cwd,
        };
        let info = record.to_info();
        {
            let mut core = self.inner.core.lock().expect("session monitor poisoned");
            core.attach_in_progress = false;
            core.record = Some(record);
            core.target = Some(Arc::clone(&target));
            core.pending_step = None;
            core.entry_pending = stop_at_entry;
            self.inner.condvar.notify_all();
        }
        self.inner.dispatch(&DebugEvent::SessionStateChanged {
            old: SessionState::Disconnected,
            new: SessionState::Running,
            reason: None,
            location: None,
            thread_id: None,
        });

        self.inner.breakpoints.clear_hits();
        let bound = self
            .inner
            .breakpoints
            .bind_all(&*target, &*self.inner.symbols);
        for (breakpoint_id, module_path) in bound {
            self.inner.dispatch(&DebugEvent::BreakpointBound {
                breakpoint_id,
                module_path,
            });
        }

        if let Err(err) = target.resume() {
            self.force_disconnect("initial resume");
            return Err(match launch_mode {
                LaunchMode::Attach => DebugError::AttachFailed(err.to_string()),
                LaunchMode::Launch => DebugError::LaunchFailed(err.to_string()),
            });
        }
        Ok(info)
    }

    /// Paused → Running transition shared by continue and step.
    fn begin_running(
        &self,
        pending_step: Option<StepMode>,
    ) -> Result<Arc<dyn TargetProcess>, DebugError> {
        let (target, change) = {
            let mut core = self.inner.core.lock().expect("session monitor poisoned");
            let record = core.record.as_mut().ok_or(DebugError::NoSession)?;
            if record.state != SessionState::Paused {
                return Err(DebugError::NotPaused(
                    "continue requires a paused target".into(),
                ));
            }
            let old = record.state;
            record.state = SessionState::Running;
            record.pause_reason = None;
            record.location = None;
            record.active_thread_id = None;
            core.pending_step = pending_step;
            let target = core.target.clone().ok_or(DebugError::NoSession)?;
            self.inner.condvar.notify_all();
            (
                target,
                DebugEvent::SessionStateChanged {
                    old,
                    new: SessionState::Running,
                    reason: None,
                    location: None,
                    thread_id: None,
                },
            )
        };
        self.inner.dispatch(&change);
        Ok(target)
    }

    fn force_disconnect(&self, context: &str) {
        tracing::warn!(context, "session_desync_forcing_disconnect");
        self.inner.clear_session();
    }
}

enum SessionStart {
    Attach { pid: u32 },
    Launch { spec: LaunchSpec },
}

fn map_attach_error(err: PlatformError) -> DebugError {
    match err {
        PlatformError::ProcessNotFound(pid) => DebugError::ProcessNotFound(pid),
        PlatformError::NotManaged(pid) => DebugError::NotDotNetProcess(pid),
        PlatformError::AccessDenied(message) => DebugError::PermissionDenied(message),
        PlatformError::Timeout => DebugError::Timeout,
        other => DebugError::AttachFailed(other.to_string()),
    }
}

fn map_launch_error(err: PlatformError) -> DebugError {
    match err {
        PlatformError::AccessDenied(message) => DebugError::PermissionDenied(message),
        PlatformError::Timeout => DebugError::Timeout,
        other => DebugError::LaunchFailed(other.to_string()),
    }
}

pub(crate) fn module_basename(path: &str) -> String {
    path.rsplit(['/', '\\']).next().unwrap_or(path).to_string()
}

pub(crate) fn now_ms() -> i64 {
    let now = time::OffsetDateTime::now_utc();
    i64::try_from(now.unix_timestamp_nanos() / 1_000_000).unwrap_or(0)
}
