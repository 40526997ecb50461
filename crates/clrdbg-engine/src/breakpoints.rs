//! Breakpoint registry and hit rendezvous.
//!
//! Breakpoints are registered by source position and bind lazily: module
//! loads promote `Pending` breakpoints to `Bound`, module unloads revert
//! them. Hits are evaluated inside the native callback (count, then
//! condition) and delivered to awaiters through a bounded FIFO.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use clrdbg_protocol::{
    BindingInfo, BreakpointInfo, BreakpointSetRequest, BreakpointState,
    ExceptionBreakpointInfo, ExceptionBreakpointRequest, ExceptionInfo, HitInfo, SourceLocation,
    HIT_QUEUE_CAPACITY,
};
use clrdbg_symbols::DEFAULT_NEAREST_RANGE;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::cancel::{next_slice, CancelToken};
use crate::condition::{self, Condition};
use crate::error::DebugError;
use crate::path::{FrameConditionScope, FrameScope};
use crate::platform::TargetProcess;
use crate::session::{now_ms, BreakpointWait};
use crate::symbols::SymbolIndex;

/// Wall-clock budget for one condition evaluation inside the callback.
const CONDITION_EVAL_BUDGET: Duration = Duration::from_secs(1);

/// What the pump should do after a code-breakpoint callback.
#[derive(Debug)]
pub(crate) enum HitOutcome {
    Resume,
    Pause(HitInfo),
}

#[derive(Debug, Clone)]
struct Binding {
    module_path: String,
    method_token: u32,
    il_offset: u32,
    native_handle: u64,
}

#[derive(Debug, Clone)]
struct CodeBreakpoint {
    id: u32,
    file: String,
    line: u32,
    column: Option<u32>,
    condition: Option<Condition>,
    enabled: bool,
    verified: bool,
    hit_count: Arc<AtomicU64>,
    invalid: bool,
    message: Option<String>,
    bindings: Vec<Binding>,
}

impl CodeBreakpoint {
    fn state(&self) -> BreakpointState {
        if !self.enabled {
            BreakpointState::Disabled
        } else if self.invalid {
            BreakpointState::Invalid
        } else if self.bindings.is_empty() {
            BreakpointState::Pending
        } else {
            BreakpointState::Bound
        }
    }

    fn to_info(&self) -> BreakpointInfo {
        BreakpointInfo {
            id: self.id,
            file: self.file.clone(),
            line: self.line,
            column: self.column,
            condition: self.condition.as_ref().map(|cond| cond.source.clone()),
            enabled: self.enabled,
            verified: self.verified,
            hit_count: self.hit_count.load(Ordering::SeqCst),
            state: self.state(),
            message: self.message.clone(),
            bindings: self
                .bindings
                .iter()
                .map(|binding| BindingInfo {
                    module_path: binding.module_path.clone(),
                    method_token: binding.method_token,
                    il_offset: binding.il_offset,
                })
                .collect(),
            duplicate: false,
        }
    }
}

#[derive(Debug, Clone)]
struct ExceptionBreakpoint {
    type_name: String,
    include_subtypes: bool,
    first_chance: bool,
    second_chance: bool,
    enabled: bool,
    hit_count: Arc<AtomicU64>,
}

impl ExceptionBreakpoint {
    fn to_info(&self) -> ExceptionBreakpointInfo {
        ExceptionBreakpointInfo {
            exception_type: self.type_name.clone(),
            include_subtypes: self.include_subtypes,
            first_chance: self.first_chance,
            second_chance: self.second_chance,
            enabled: self.enabled,
            hit_count: self.hit_count.load(Ordering::SeqCst),
        }
    }
}

#[derive(Default)]
struct RegistryState {
    next_id: u32,
    code: IndexMap<u32, CodeBreakpoint>,
    by_key: FxHashMap<(String, u32, Option<u32>), u32>,
    exceptions: Vec<ExceptionBreakpoint>,
}

/// The breakpoint registry. One lock guards the registry; hit counters are
/// atomics incremented without it; the hit FIFO has its own monitor.
pub(crate) struct BreakpointRegistry {
    state: Mutex<RegistryState>,
    hits: HitQueue,
}

impl BreakpointRegistry {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                next_id: 1,
                ..RegistryState::default()
            }),
            hits: HitQueue::default(),
        }
    }

    /// Register (or re-register) a breakpoint. A duplicate `(file, line,
    /// column)` returns the existing breakpoint with `duplicate = true`;
    /// the new condition replaces the old one, including `None`.
    pub(crate) fn set(
        &self,
        request: &BreakpointSetRequest,
        target: Option<&dyn TargetProcess>,
        symbols: &dyn SymbolIndex,
    ) -> Result<BreakpointInfo, DebugError> {
        let condition = match request.condition.as_deref() {
            Some(source) => Some(condition::parse(source).map_err(|err| {
                DebugError::InvalidCondition {
                    message: err.message,
                    position: err.position,
                }
            })?),
            None => None,
        };

        // Enumerate loaded modules before taking the registry lock; only
        // O(1) native calls (arming) happen under it.
        let modules = match target {
            Some(target) => match target.modules() {
                Ok(modules) => modules,
                Err(err) => {
                    tracing::debug!(error = %err, "module_enumeration_failed_on_set");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let key = (
            normalize_file(&request.file),
            request.line,
            request.column,
        );
        let mut state = self.state.lock().expect("breakpoint registry poisoned");
        if let Some(&existing) = state.by_key.get(&key) {
            let breakpoint = state
                .code
                .get_mut(&existing)
                .expect("registry index out of sync");
            breakpoint.condition = condition;
            let mut info = breakpoint.to_info();
            info.duplicate = true;
            return Ok(info);
        }

        let id = state.next_id;
        state.next_id += 1;
        let mut breakpoint = CodeBreakpoint {
            id,
            file: request.file.clone(),
            line: request.line,
            column: request.column,
            condition,
            enabled: true,
            verified: false,
            hit_count: Arc::new(AtomicU64::new(0)),
            invalid: false,
            message: None,
            bindings: Vec::new(),
        };

        // Bind against whatever is already loaded; zero bindings is not a
        // failure, the breakpoint stays pending.
        if let Some(target) = target {
            for module in &modules {
                try_bind(&mut breakpoint, target, symbols, &module.path);
            }
        }

        let info = breakpoint.to_info();
        state.code.insert(id, breakpoint);
        state.by_key.insert(key, id);
        Ok(info)
    }

    pub(crate) fn set_exception(
        &self,
        request: &ExceptionBreakpointRequest,
    ) -> ExceptionBreakpointInfo {
        let mut state = self.state.lock().expect("breakpoint registry poisoned");
        if let Some(existing) = state
            .exceptions
            .iter_mut()
            .find(|entry| entry.type_name == request.exception_type)
        {
            existing.include_subtypes = request.include_subtypes;
            existing.first_chance = request.first_chance;
            existing.second_chance = request.second_chance;
            existing.enabled = true;
            return existing.to_info();
        }
        let entry = ExceptionBreakpoint {
            type_name: request.exception_type.clone(),
            include_subtypes: request.include_subtypes,
            first_chance: request.first_chance,
            second_chance: request.second_chance,
            enabled: true,
            hit_count: Arc::new(AtomicU64::new(0)),
        };
        let info = entry.to_info();
        state.exceptions.push(entry);
        info
    }

    pub(crate) fn list(&self) -> (Vec<BreakpointInfo>, Vec<ExceptionBreakpointInfo>) {
        let state = self.state.lock().expect("breakpoint registry poisoned");
        (
            state.code.values().map(CodeBreakpoint::to_info).collect(),
            state
                .exceptions
                .iter()
                .map(ExceptionBreakpoint::to_info)
                .collect(),
        )
    }

    pub(crate) fn remove(
        &self,
        id: u32,
        target: Option<&dyn TargetProcess>,
    ) -> Result<(), DebugError> {
        let mut state = self.state.lock().expect("breakpoint registry poisoned");
        let Some(breakpoint) = state.code.shift_remove(&id) else {
            return Err(DebugError::BreakpointNotFound(id));
        };
        state
            .by_key
            .retain(|_, mapped| *mapped != id);
        release_bindings(&breakpoint, target);
        Ok(())
    }

    /// Enable/disable; idempotent.
    pub(crate) fn set_enabled(&self, id: u32, enabled: bool) -> Result<BreakpointInfo, DebugError> {
        let mut state = self.state.lock().expect("breakpoint registry poisoned");
        let Some(breakpoint) = state.code.get_mut(&id) else {
            return Err(DebugError::BreakpointNotFound(id));
        };
        breakpoint.enabled = enabled;
        Ok(breakpoint.to_info())
    }

    pub(crate) fn clear_all(&self, target: Option<&dyn TargetProcess>) {
        let mut state = self.state.lock().expect("breakpoint registry poisoned");
        for breakpoint in state.code.values() {
            release_bindings(breakpoint, target);
        }
        state.code.clear();
        state.by_key.clear();
    }

    pub(crate) fn remove_exception(&self, type_name: &str) -> Result<(), DebugError> {
        let mut state = self.state.lock().expect("breakpoint registry poisoned");
        let before = state.exceptions.len();
        state.exceptions.retain(|entry| entry.type_name != type_name);
        if state.exceptions.len() == before {
            return Err(DebugError::TypeNotFound(type_name.to_string()));
        }
        Ok(())
    }

    pub(crate) fn set_exception_enabled(
        &self,
        type_name: &str,
        enabled: bool,
    ) -> Result<(), DebugError> {
        let mut state = self.state.lock().expect("breakpoint registry poisoned");
        let Some(entry) = state
            .exceptions
            .iter_mut()
            .find(|entry| entry.type_name == type_name)
        else {
            return Err(DebugError::TypeNotFound(type_name.to_string()));
        };
        entry.enabled = enabled;
        Ok(())
    }

    /// Bind pending breakpoints against every loaded module (post-attach).
    pub(crate) fn bind_all(
        &self,
        target: &dyn TargetProcess,
        symbols: &dyn SymbolIndex,
    ) -> Vec<(u32, String)> {
        let modules = match target.modules() {
            Ok(modules) => modules,
            Err(err) => {
                tracing::debug!(error = %err, "module_enumeration_failed_on_attach");
                return Vec::new();
            }
        };
        let mut bound = Vec::new();
        for module in modules {
            bound.extend(self.bind_module(target, symbols, &module.path));
        }
        bound
    }

    /// A module loaded: try to bind every pending breakpoint into it.
    /// Returns `(breakpoint_id, module_path)` for each new binding.
    pub(crate) fn bind_module(
        &self,
        target: &dyn TargetProcess,
        symbols: &dyn SymbolIndex,
        module_path: &str,
    ) -> Vec<(u32, String)> {
        let mut state = self.state.lock().expect("breakpoint registry poisoned");
        let mut bound = Vec::new();
        for breakpoint in state.code.values_mut() {
            if !breakpoint.bindings.is_empty() {
                continue;
            }
            if try_bind(breakpoint, target, symbols, module_path) {
                bound.push((breakpoint.id, module_path.to_string()));
            }
        }
        bound
    }

    /// A module unloaded: its bindings are gone; breakpoints with no
    /// remaining bindings revert to pending (still verified).
    pub(crate) fn unbind_module(&self, module_path: &str) {
        let mut state = self.state.lock().expect("breakpoint registry poisoned");
        for breakpoint in state.code.values_mut() {
            breakpoint
                .bindings
                .retain(|binding| binding.module_path != module_path);
        }
    }

    /// All native bindings are gone (disconnect / target exit).
    pub(crate) fn drop_all_bindings(&self) {
        let mut state = self.state.lock().expect("breakpoint registry poisoned");
        for breakpoint in state.code.values_mut() {
            breakpoint.bindings.clear();
        }
    }

    /// Hit callback, invoked synchronously by the pump before it answers
    /// the continuation question.
    pub(crate) fn on_code_breakpoint(
        &self,
        target: &dyn TargetProcess,
        thread_id: u32,
        module_path: &str,
        method_token: u32,
        il_offset: u32,
        location: &SourceLocation,
    ) -> HitOutcome {
        let matched = {
            let state = self.state.lock().expect("breakpoint registry poisoned");
            state
                .code
                .values()
                .find(|breakpoint| {
                    breakpoint.bindings.iter().any(|binding| {
                        binding.module_path == module_path
                            && binding.method_token == method_token
                            && binding.il_offset == il_offset
                    })
                })
                .map(|breakpoint| {
                    (
                        breakpoint.id,
                        breakpoint.enabled,
                        Arc::clone(&breakpoint.hit_count),
                        breakpoint.condition.clone(),
                    )
                })
        };

        let Some((id, enabled, counter, cond)) = matched else {
            // Runtime-inserted debug break with no registered owner: still
            // counts as a hit and still pauses.
            let hit = HitInfo {
                breakpoint_id: None,
                thread_id,
                timestamp_ms: now_ms(),
                location: location.clone(),
                hit_count: 0,
                message: Some("no registered breakpoint at this location".into()),
                exception: None,
            };
            self.hits.push(hit.clone());
            return HitOutcome::Pause(hit);
        };

        if !enabled {
            return HitOutcome::Resume;
        }

        let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
        let mut message = None;
        if let Some(cond) = cond {
            let scope = FrameConditionScope {
                frame: FrameScope {
                    target,
                    thread_id,
                    frame_index: 0,
                    deadline: Some(Instant::now() + CONDITION_EVAL_BUDGET),
                },
                hit_count: count,
            };
            match condition::evaluate(&cond, &scope) {
                Ok(true) => {}
                Ok(false) => return HitOutcome::Resume,
                // Evaluation errors pause so the user can fix the condition.
                Err(err) => message = Some(format!("condition error: {err}")),
            }
        }

        let hit = HitInfo {
            breakpoint_id: Some(id),
            thread_id,
            timestamp_ms: now_ms(),
            location: location.clone(),
            hit_count: count,
            message,
            exception: None,
        };
        self.hits.push(hit.clone());
        HitOutcome::Pause(hit)
    }

    /// Exception callback. First-chance exceptions pause only when a
    /// registered exception breakpoint matches; unhandled ones always do.
    pub(crate) fn on_exception(
        &self,
        type_name: &str,
        message: Option<String>,
        first_chance: bool,
        thread_id: u32,
        location: &SourceLocation,
        target: Option<&dyn TargetProcess>,
    ) -> Option<HitInfo> {
        let mut matched_count = 0u64;
        let mut any_match = false;
        {
            let state = self.state.lock().expect("breakpoint registry poisoned");
            for entry in &state.exceptions {
                if !entry.enabled {
                    continue;
                }
                if first_chance && !entry.first_chance {
                    continue;
                }
                if !first_chance && !entry.second_chance {
                    continue;
                }
                let matches = entry.type_name == type_name
                    || (entry.include_subtypes
                        && target.is_some_and(|target| {
                            target
                                .is_subtype(type_name, &entry.type_name)
                                .unwrap_or(false)
                        }));
                if matches {
                    any_match = true;
                    matched_count = entry.hit_count.fetch_add(1, Ordering::SeqCst) + 1;
                }
            }
        }

        if first_chance && !any_match {
            return None;
        }

        let hit = HitInfo {
            breakpoint_id: None,
            thread_id,
            timestamp_ms: now_ms(),
            location: location.clone(),
            hit_count: matched_count,
            message: None,
            exception: Some(ExceptionInfo {
                type_name: type_name.to_string(),
                message,
                first_chance,
            }),
        };
        self.hits.push(hit.clone());
        Some(hit)
    }

    /// Await the next matching hit. Non-matching hits are left queued for
    /// other waiters (FIFO with non-destructive peek until matched).
    pub(crate) fn wait_hit(
        &self,
        deadline: Instant,
        filter_id: Option<u32>,
        cancel: &CancelToken,
        disconnected: impl Fn() -> bool,
    ) -> Result<BreakpointWait, DebugError> {
        let matches = |hit: &HitInfo| match filter_id {
            None => true,
            Some(id) => hit.breakpoint_id == Some(id),
        };
        loop {
            // A queued hit wins over a concurrent disconnect or cancel.
            {
                let mut queue = self.hits.queue.lock().expect("hit queue poisoned");
                if let Some(position) = queue.iter().position(matches) {
                    if let Some(hit) = queue.remove(position) {
                        return Ok(BreakpointWait::Hit(hit));
                    }
                }
            }
            if cancel.is_cancelled() {
                return Err(DebugError::Cancelled);
            }
            if disconnected() {
                return Ok(BreakpointWait::Disconnected);
            }
            let queue = self.hits.queue.lock().expect("hit queue poisoned");
            if queue.iter().any(matches) {
                continue;
            }
            let Some(slice) = next_slice(deadline) else {
                return Ok(BreakpointWait::TimedOut);
            };
            let (guard, _) = self
                .hits
                .condvar
                .wait_timeout(queue, slice)
                .expect("hit queue poisoned");
            drop(guard);
        }
    }

    /// Discard queued hits (fresh session).
    pub(crate) fn clear_hits(&self) {
        self.hits.queue.lock().expect("hit queue poisoned").clear();
    }
}

#[derive(Default)]
struct HitQueue {
    queue: Mutex<VecDeque<HitInfo>>,
    condvar: Condvar,
}

impl HitQueue {
    fn push(&self, hit: HitInfo) {
        let mut queue = self.queue.lock().expect("hit queue poisoned");
        if queue.len() >= HIT_QUEUE_CAPACITY {
            queue.pop_front();
            tracing::warn!("hit_queue_overflow_dropping_oldest");
        }
        queue.push_back(hit);
        self.condvar.notify_all();
    }
}

fn release_bindings(breakpoint: &CodeBreakpoint, target: Option<&dyn TargetProcess>) {
    let Some(target) = target else {
        return;
    };
    for binding in &breakpoint.bindings {
        if let Err(err) = target.clear_code_breakpoint(binding.native_handle) {
            tracing::debug!(error = %err, "clear_native_breakpoint_failed");
        }
    }
}

/// Attempt to bind one breakpoint into one module. Snaps to the nearest
/// valid line when the requested line carries no sequence point.
fn try_bind(
    breakpoint: &mut CodeBreakpoint,
    target: &dyn TargetProcess,
    symbols: &dyn SymbolIndex,
    module_path: &str,
) -> bool {
    if breakpoint
        .bindings
        .iter()
        .any(|binding| binding.module_path == module_path)
    {
        return false;
    }
    let assembly = Path::new(module_path);
    let mut snapped_line = None;
    let mut span = symbols.find_il_offset(assembly, &breakpoint.file, breakpoint.line, breakpoint.column);
    if span.is_none() {
        if !symbols.has_document(assembly, &breakpoint.file) {
            return false;
        }
        if let Some(nearest) = symbols.find_nearest_valid_line(
            assembly,
            &breakpoint.file,
            breakpoint.line,
            DEFAULT_NEAREST_RANGE,
        ) {
            if nearest != breakpoint.line {
                span = symbols.find_il_offset(assembly, &breakpoint.file, nearest, None);
                if span.is_some() {
                    snapped_line = Some(nearest);
                }
            }
        }
    }
    let Some(span) = span else {
        return false;
    };

    match target.set_code_breakpoint(module_path, span.method_token, span.il_offset) {
        Ok(handle) => {
            breakpoint.bindings.push(Binding {
                module_path: module_path.to_string(),
                method_token: span.method_token,
                il_offset: span.il_offset,
                native_handle: handle,
            });
            breakpoint.verified = true;
            breakpoint.invalid = false;
            if let Some(nearest) = snapped_line {
                breakpoint.message = Some(format!("bound at nearest valid line {nearest}"));
            }
            true
        }
        Err(err) => {
            breakpoint.invalid = true;
            breakpoint.message = Some(format!("native binding failed: {err}"));
            false
        }
    }
}

/// Normalized duplicate-detection key for a source file.
fn normalize_file(file: &str) -> String {
    let normalized = file.replace('\\', "/");
    if cfg!(windows) {
        normalized.to_ascii_lowercase()
    } else {
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{ProcessScript, ScriptedSymbols};
    use clrdbg_protocol::BreakpointSetRequest;

    fn set_request(file: &str, line: u32) -> BreakpointSetRequest {
        BreakpointSetRequest {
            file: file.into(),
            line,
            column: None,
            condition: None,
        }
    }

    #[test]
    fn set_without_target_stays_pending() {
        let registry = BreakpointRegistry::new();
        let symbols = ScriptedSymbols::new();
        let info = registry
            .set(&set_request("Program.cs", 10), None, &symbols)
            .unwrap();
        assert_eq!(info.state, BreakpointState::Pending);
        assert!(!info.verified);
        assert!(info.bindings.is_empty());
    }

    #[test]
    fn duplicate_set_returns_existing_id_and_replaces_condition() {
        let registry = BreakpointRegistry::new();
        let symbols = ScriptedSymbols::new();
        let first = registry
            .set(&set_request("X.cs", 10), None, &symbols)
            .unwrap();
        let mut request = set_request("X.cs", 10);
        request.condition = Some("hit_count == 2".into());
        let second = registry.set(&request, None, &symbols).unwrap();
        assert!(second.duplicate);
        assert_eq!(second.id, first.id);
        assert_eq!(second.condition.as_deref(), Some("hit_count == 2"));

        // And None clears it again.
        let third = registry.set(&set_request("X.cs", 10), None, &symbols).unwrap();
        assert!(third.duplicate);
        assert_eq!(third.condition, None);
    }

    #[test]
    fn invalid_condition_is_rejected_with_position() {
        let registry = BreakpointRegistry::new();
        let symbols = ScriptedSymbols::new();
        let mut request = set_request("X.cs", 10);
        request.condition = Some("hit_count >".into());
        let err = registry.set(&request, None, &symbols).unwrap_err();
        match err {
            DebugError::InvalidCondition { position, .. } => assert_eq!(position, 11),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn module_load_binds_and_unload_reverts_to_pending() {
        let registry = BreakpointRegistry::new();
        let symbols = ScriptedSymbols::new();
        symbols.add_span("/app/App.dll", "Program.cs", 10, 0x0600_0001, 4);
        let script = ProcessScript::new(42).with_module("/app/App.dll");
        let target = script.build_target();

        let info = registry
            .set(&set_request("Program.cs", 10), None, &symbols)
            .unwrap();
        assert_eq!(info.state, BreakpointState::Pending);

        let bound = registry.bind_module(&target, &symbols, "/app/App.dll");
        assert_eq!(bound.len(), 1);
        let (code, _) = registry.list();
        assert_eq!(code[0].state, BreakpointState::Bound);
        assert!(code[0].verified);

        registry.unbind_module("/app/App.dll");
        let (code, _) = registry.list();
        assert_eq!(code[0].state, BreakpointState::Pending);
        assert!(code[0].verified, "verified survives unbinding");
    }

    #[test]
    fn disabled_breakpoint_resumes_without_counting() {
        let registry = BreakpointRegistry::new();
        let symbols = ScriptedSymbols::new();
        symbols.add_span("/app/App.dll", "Program.cs", 10, 0x0600_0001, 4);
        let script = ProcessScript::new(42).with_module("/app/App.dll");
        let target = script.build_target();

        let info = registry
            .set(&set_request("Program.cs", 10), Some(&target), &symbols)
            .unwrap();
        registry.set_enabled(info.id, false).unwrap();

        let outcome = registry.on_code_breakpoint(
            &target,
            1,
            "/app/App.dll",
            0x0600_0001,
            4,
            &SourceLocation::unknown(),
        );
        assert!(matches!(outcome, HitOutcome::Resume));
        let (code, _) = registry.list();
        assert_eq!(code[0].hit_count, 0);
    }

    #[test]
    fn anonymous_hits_pause_and_queue() {
        let registry = BreakpointRegistry::new();
        let script = ProcessScript::new(42).with_module("/app/App.dll");
        let target = script.build_target();

        let outcome = registry.on_code_breakpoint(
            &target,
            7,
            "/app/App.dll",
            0x0600_0009,
            0,
            &SourceLocation::unknown(),
        );
        match outcome {
            HitOutcome::Pause(hit) => assert_eq!(hit.breakpoint_id, None),
            HitOutcome::Resume => panic!("anonymous hit must pause"),
        }
    }

    #[test]
    fn wait_hit_times_out_cleanly() {
        let registry = BreakpointRegistry::new();
        let cancel = CancelToken::new();
        let outcome = registry
            .wait_hit(
                Instant::now() + Duration::from_millis(30),
                None,
                &cancel,
                || false,
            )
            .unwrap();
        assert!(matches!(outcome, BreakpointWait::TimedOut));
    }

    #[test]
    fn filtered_wait_leaves_other_hits_queued() {
        let registry = BreakpointRegistry::new();
        let hit = |id: u32| HitInfo {
            breakpoint_id: Some(id),
            thread_id: 1,
            timestamp_ms: 0,
            location: SourceLocation::unknown(),
            hit_count: 1,
            message: None,
            exception: None,
        };
        registry.hits.push(hit(1));
        registry.hits.push(hit(2));

        let cancel = CancelToken::new();
        let outcome = registry
            .wait_hit(
                Instant::now() + Duration::from_millis(30),
                Some(2),
                &cancel,
                || false,
            )
            .unwrap();
        match outcome {
            BreakpointWait::Hit(hit) => assert_eq!(hit.breakpoint_id, Some(2)),
            other => panic!("unexpected {other:?}"),
        }
        // The non-matching hit is still at the head for other waiters.
        let outcome = registry
            .wait_hit(
                Instant::now() + Duration::from_millis(30),
                None,
                &cancel,
                || false,
            )
            .unwrap();
        match outcome {
            BreakpointWait::Hit(hit) => assert_eq!(hit.breakpoint_id, Some(1)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn exception_breakpoint_gates_first_chance() {
        let registry = BreakpointRegistry::new();
        let script = ProcessScript::new(42)
            .with_subtype("System.ArgumentNullException", "System.ArgumentException");
        let target = script.build_target();

        // Unregistered first-chance: auto-continue.
        assert!(registry
            .on_exception(
                "System.ArgumentException",
                None,
                true,
                1,
                &SourceLocation::unknown(),
                Some(&target),
            )
            .is_none());

        registry.set_exception(&ExceptionBreakpointRequest {
            exception_type: "System.ArgumentException".into(),
            first_chance: true,
            second_chance: true,
            include_subtypes: true,
        });

        let hit = registry
            .on_exception(
                "System.ArgumentNullException",
                Some("value was null".into()),
                true,
                1,
                &SourceLocation::unknown(),
                Some(&target),
            )
            .expect("subtype match must pause");
        assert_eq!(hit.exception.as_ref().unwrap().first_chance, true);
        assert_eq!(hit.hit_count, 1);

        // Unhandled exceptions always pause, registered or not.
        assert!(registry
            .on_exception(
                "System.InvalidOperationException",
                None,
                false,
                1,
                &SourceLocation::unknown(),
                Some(&target),
            )
            .is_some());
    }
}
