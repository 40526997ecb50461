//! Debug event pump.
//!
//! One handler instance per session, invoked on the platform's callback
//! thread, one event at a time. For each event the pump updates session
//! state under the monitor, releases it, dispatches typed events, and
//! answers the continuation question. Unrecognized events auto-continue;
//! anything else would hang the target.

use std::path::Path;
use std::sync::{Arc, Weak};

use clrdbg_protocol::{PauseReason, SourceLocation};

use crate::breakpoints::HitOutcome;
use crate::platform::{Continuation, EventHandler, NativeEvent};
use crate::session::{module_basename, DebugEvent, SessionInner};
use crate::symbols::SymbolIndex;

pub(crate) fn make_handler(inner: &Arc<SessionInner>) -> EventHandler {
    let weak: Weak<SessionInner> = Arc::downgrade(inner);
    Box::new(move |event| match weak.upgrade() {
        Some(inner) => handle_event(&inner, event),
        None => Continuation::AutoContinue,
    })
}

fn handle_event(inner: &SessionInner, event: NativeEvent) -> Continuation {
    match event {
        // Informational events: the target must keep running.
        NativeEvent::ProcessCreated
        | NativeEvent::AppDomainCreated
        | NativeEvent::AppDomainExited
        | NativeEvent::AssemblyLoaded
        | NativeEvent::AssemblyUnloaded
        | NativeEvent::ThreadCreated { .. }
        | NativeEvent::ThreadExited { .. }
        | NativeEvent::NameChange
        | NativeEvent::LogSwitch
        | NativeEvent::SymbolsUpdated
        | NativeEvent::EvalComplete
        | NativeEvent::EvalException
        | NativeEvent::EditAndContinueRemap => Continuation::AutoContinue,

        NativeEvent::LogMessage { message } => {
            tracing::debug!(message, "target_log");
            Continuation::AutoContinue
        }
        NativeEvent::BreakpointSetError { message } | NativeEvent::DebuggerError { message } => {
            tracing::warn!(message, "native_debugger_error");
            Continuation::AutoContinue
        }

        NativeEvent::ModuleLoaded { path } => on_module_loaded(inner, &path),
        NativeEvent::ModuleUnloaded { path } => on_module_unloaded(inner, &path),

        NativeEvent::Breakpoint {
            thread_id,
            module_path,
            method_token,
            il_offset,
            function_name,
        } => on_breakpoint(
            inner,
            thread_id,
            &module_path,
            method_token,
            il_offset,
            function_name.as_deref(),
        ),

        NativeEvent::StepComplete {
            thread_id,
            module_path,
            method_token,
            il_offset,
            function_name,
        } => {
            let mode = {
                let mut core = inner.core.lock().expect("session monitor poisoned");
                core.pending_step.take()
            };
            tracing::debug!(?mode, thread_id, "step_complete");
            let location = enrich_location(
                &*inner.symbols,
                module_path.as_deref(),
                method_token,
                il_offset,
                function_name.as_deref(),
            );
            inner.mark_paused(PauseReason::Step, location, thread_id, None);
            Continuation::RemainPaused
        }

        NativeEvent::Break {
            thread_id,
            module_path,
            method_token,
            il_offset,
        } => {
            let entry = {
                let mut core = inner.core.lock().expect("session monitor poisoned");
                std::mem::take(&mut core.entry_pending)
            };
            let reason = if entry {
                PauseReason::Entry
            } else {
                PauseReason::Pause
            };
            let location = match (module_path.as_deref(), method_token, il_offset) {
                (Some(module), Some(token), Some(offset)) => {
                    enrich_location(&*inner.symbols, Some(module), token, offset, None)
                }
                _ => SourceLocation::unknown(),
            };
            inner.mark_paused(reason, location, thread_id, None);
            Continuation::RemainPaused
        }

        NativeEvent::Exception {
            thread_id,
            type_name,
            message,
            first_chance,
            module_path,
            method_token,
            il_offset,
        } => {
            let location = match (module_path.as_deref(), method_token, il_offset) {
                (Some(module), Some(token), Some(offset)) => {
                    enrich_location(&*inner.symbols, Some(module), token, offset, None)
                }
                _ => SourceLocation::unknown(),
            };
            let hit = inner.breakpoints.on_exception(
                &type_name,
                message,
                first_chance,
                thread_id,
                &location,
                inner.target().as_deref(),
            );
            match hit {
                Some(hit) => {
                    inner.mark_paused(
                        PauseReason::Exception,
                        location,
                        thread_id,
                        Some(DebugEvent::BreakpointHit { hit }),
                    );
                    Continuation::RemainPaused
                }
                None => Continuation::AutoContinue,
            }
        }

        NativeEvent::ProcessExited { exit_code } => {
            inner.clear_session();
            inner.dispatch(&DebugEvent::TargetExited { exit_code });
            Continuation::AutoContinue
        }
    }
}

fn on_module_loaded(inner: &SessionInner, path: &str) -> Continuation {
    if let Some(target) = inner.target() {
        let bound = inner
            .breakpoints
            .bind_module(&*target, &*inner.symbols, path);
        inner.dispatch(&DebugEvent::ModuleLoaded {
            path: path.to_string(),
        });
        for (breakpoint_id, module_path) in bound {
            inner.dispatch(&DebugEvent::BreakpointBound {
                breakpoint_id,
                module_path,
            });
        }
    }
    Continuation::AutoContinue
}

fn on_module_unloaded(inner: &SessionInner, path: &str) -> Continuation {
    inner.breakpoints.unbind_module(path);
    inner.dispatch(&DebugEvent::ModuleUnloaded {
        path: path.to_string(),
    });
    Continuation::AutoContinue
}

fn on_breakpoint(
    inner: &SessionInner,
    thread_id: u32,
    module_path: &str,
    method_token: u32,
    il_offset: u32,
    function_name: Option<&str>,
) -> Continuation {
    let Some(target) = inner.target() else {
        return Continuation::AutoContinue;
    };
    let location = enrich_location(
        &*inner.symbols,
        Some(module_path),
        method_token,
        il_offset,
        function_name,
    );
    match inner.breakpoints.on_code_breakpoint(
        &*target,
        thread_id,
        module_path,
        method_token,
        il_offset,
        &location,
    ) {
        HitOutcome::Resume => Continuation::AutoContinue,
        HitOutcome::Pause(hit) => {
            inner.mark_paused(
                PauseReason::Breakpoint,
                location,
                thread_id,
                Some(DebugEvent::BreakpointHit { hit }),
            );
            Continuation::RemainPaused
        }
    }
}

/// Build a source location for an event: module/function are always kept;
/// file and line come from symbols when the offset resolves, and fall back
/// to the `Unknown`/0 placeholder otherwise.
pub(crate) fn enrich_location(
    symbols: &dyn SymbolIndex,
    module_path: Option<&str>,
    method_token: u32,
    il_offset: u32,
    function_name: Option<&str>,
) -> SourceLocation {
    let mut location = SourceLocation::unknown();
    location.function_name = function_name.map(ToString::to_string);
    if let Some(module) = module_path {
        location.module_name = Some(module_basename(module));
        if let Some(span) = symbols.resolve_offset(Path::new(module), method_token, il_offset) {
            location.file = span.file;
            location.line = span.start_line;
            location.column = Some(span.start_column);
            location.end_line = Some(span.end_line);
            location.end_column = Some(span.end_column);
        }
    }
    location
}
