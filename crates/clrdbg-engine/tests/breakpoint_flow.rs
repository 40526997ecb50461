//! Breakpoint lifecycle end to end: set/bind/hit/wait, conditions,
//! module unload and reload, duplicates, exception breakpoints.

use std::sync::mpsc::channel;
use std::sync::Arc;
use std::time::Duration;

use clrdbg_engine::harness::{FakePlatform, ObjectBuilder, ProcessScript, ScriptedSymbols};
use clrdbg_engine::platform::{Continuation, FrameSlots, NativeEvent, RawSlot, RawValue};
use clrdbg_engine::protocol::{
    AttachRequest, BreakpointSetRequest, BreakpointState, BreakpointWaitRequest,
    ExceptionBreakpointRequest, PauseReason, SessionState,
};
use clrdbg_engine::{
    BreakpointWait, CancelToken, DebugError, DebugEvent, DebugSession, SymbolIndex,
};

const APP_MODULE: &str = "/app/MethodTarget.dll";
const METHOD_TOKEN: u32 = 0x0600_0001;

fn hit_event(il_offset: u32) -> NativeEvent {
    NativeEvent::Breakpoint {
        thread_id: 1,
        module_path: APP_MODULE.to_string(),
        method_token: METHOD_TOKEN,
        il_offset,
        function_name: Some("MethodTarget.SayHello".to_string()),
    }
}

fn set_request(file: &str, line: u32) -> BreakpointSetRequest {
    BreakpointSetRequest {
        file: file.into(),
        line,
        column: None,
        condition: None,
    }
}

fn wait_request(timeout_ms: u64) -> BreakpointWaitRequest {
    BreakpointWaitRequest {
        timeout_ms,
        breakpoint_id: None,
    }
}

fn engine() -> (DebugSession, FakePlatform, Arc<ScriptedSymbols>) {
    let platform = FakePlatform::new();
    platform.add_process(ProcessScript::new(1000).with_module(APP_MODULE));
    let symbols = Arc::new(ScriptedSymbols::new());
    symbols.add_span(APP_MODULE, "MethodTarget.cs", 14, METHOD_TOKEN, 1);
    let session = DebugSession::new(
        Box::new(platform.clone()),
        Arc::clone(&symbols) as Arc<dyn SymbolIndex>,
    );
    (session, platform, symbols)
}

fn attach(session: &DebugSession) {
    session
        .attach(
            &AttachRequest {
                pid: 1000,
                timeout_ms: None,
            },
            &CancelToken::new(),
        )
        .unwrap();
}

#[test]
fn attach_set_hit_continue() {
    let (session, platform, _) = engine();
    attach(&session);

    let breakpoint = session
        .breakpoint_set(&set_request("MethodTarget.cs", 14))
        .unwrap();
    assert!(matches!(
        breakpoint.state,
        BreakpointState::Bound | BreakpointState::Pending
    ));
    assert_eq!(breakpoint.state, BreakpointState::Bound);
    assert!(breakpoint.verified);

    let target = platform.target(1000).unwrap();
    // the waiter blocks on another thread while the "target" hits
    let waiter = {
        let session = session.clone();
        std::thread::spawn(move || {
            session.breakpoint_wait(&wait_request(10_000), &CancelToken::new())
        })
    };
    std::thread::sleep(Duration::from_millis(40));
    let continuation = target.inject(hit_event(1));
    assert_eq!(continuation, Continuation::RemainPaused);

    match waiter.join().unwrap().unwrap() {
        BreakpointWait::Hit(hit) => {
            assert_eq!(hit.breakpoint_id, Some(breakpoint.id));
            assert_eq!(hit.hit_count, 1);
            assert_eq!(hit.location.line, 14);
            assert_eq!(hit.location.file, "MethodTarget.cs");
        }
        other => panic!("expected a hit, got {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Paused);
    let info = session.session_info().unwrap();
    assert_eq!(info.pause_reason, Some(PauseReason::Breakpoint));

    session.resume().unwrap();
    assert_eq!(session.state(), SessionState::Running);
}

#[test]
fn conditional_breakpoint_auto_continues_until_met() {
    let (session, platform, _) = engine();
    attach(&session);

    let mut request = set_request("MethodTarget.cs", 14);
    request.condition = Some("hit_count == 3".into());
    let breakpoint = session.breakpoint_set(&request).unwrap();

    let target = platform.target(1000).unwrap();
    let mut pauses = Vec::new();
    for _ in 0..3 {
        let continuation = target.inject(hit_event(1));
        pauses.push(continuation == Continuation::RemainPaused);
        if continuation == Continuation::RemainPaused {
            break;
        }
        // the session never left Running for the skipped iterations
        assert_eq!(session.state(), SessionState::Running);
    }
    assert_eq!(pauses, vec![false, false, true]);

    match session
        .breakpoint_wait(&wait_request(1_000), &CancelToken::new())
        .unwrap()
    {
        BreakpointWait::Hit(hit) => assert_eq!(hit.hit_count, 3),
        other => panic!("expected hit, got {other:?}"),
    }
    // every matched native hit incremented the counter
    let (list, _) = session.breakpoint_list();
    assert_eq!(list[0].hit_count, 3);
    assert_eq!(list[0].id, breakpoint.id);
}

#[test]
fn condition_evaluation_error_pauses_with_message() {
    let (session, platform, _) = engine();
    // frame scope with no such variable
    platform.add_process(ProcessScript::new(1000).with_module(APP_MODULE).with_slots(
        1,
        0,
        FrameSlots {
            locals: vec![RawSlot {
                name: "i".into(),
                value: RawValue::Int {
                    value: 0,
                    type_name: "System.Int32".into(),
                },
            }],
            arguments: Vec::new(),
            this: None,
        },
    ));
    attach(&session);

    let mut request = set_request("MethodTarget.cs", 14);
    request.condition = Some("missing == 1".into());
    session.breakpoint_set(&request).unwrap();

    let target = platform.target(1000).unwrap();
    assert_eq!(target.inject(hit_event(1)), Continuation::RemainPaused);
    match session
        .breakpoint_wait(&wait_request(1_000), &CancelToken::new())
        .unwrap()
    {
        BreakpointWait::Hit(hit) => {
            let message = hit.message.expect("condition error attached to the hit");
            assert!(message.contains("condition error"));
        }
        other => panic!("expected hit, got {other:?}"),
    }
}

#[test]
fn invalid_condition_is_rejected_at_set_time() {
    let (session, _, _) = engine();
    attach(&session);
    let mut request = set_request("MethodTarget.cs", 14);
    request.condition = Some("hit_count >".into());
    let err = session.breakpoint_set(&request).unwrap_err();
    match err {
        DebugError::InvalidCondition { position, .. } => assert_eq!(position, 11),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn pending_bind_unbind_cycle() {
    let (session, platform, symbols) = engine();
    attach(&session);
    symbols.add_span("/app/Plugin.dll", "Plugin.cs", 8, 0x0600_0002, 0);

    let (tx, rx) = channel();
    session.subscribe(tx);

    // no module carries Plugin.cs yet
    let breakpoint = session.breakpoint_set(&set_request("Plugin.cs", 8)).unwrap();
    assert_eq!(breakpoint.state, BreakpointState::Pending);
    assert!(!breakpoint.verified);

    let target = platform.target(1000).unwrap();
    assert_eq!(target.load_module("/app/Plugin.dll"), Continuation::AutoContinue);
    let (list, _) = session.breakpoint_list();
    assert_eq!(list[0].state, BreakpointState::Bound);
    assert!(list[0].verified);

    // module-unload strictly precedes the revert to Pending
    target.unload_module("/app/Plugin.dll");
    let (list, _) = session.breakpoint_list();
    assert_eq!(list[0].state, BreakpointState::Pending);
    assert!(list[0].verified, "verified survives unbinding");

    // reload re-binds
    target.load_module("/app/Plugin.dll");
    let (list, _) = session.breakpoint_list();
    assert_eq!(list[0].state, BreakpointState::Bound);

    let mut saw_unload = false;
    let mut rebound_after_unload = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            DebugEvent::ModuleUnloaded { .. } => saw_unload = true,
            DebugEvent::BreakpointBound { .. } if saw_unload => rebound_after_unload = true,
            _ => {}
        }
    }
    assert!(rebound_after_unload);
}

#[test]
fn duplicate_set_returns_existing_breakpoint() {
    let (session, _, _) = engine();
    attach(&session);
    let first = session.breakpoint_set(&set_request("X.cs", 10)).unwrap();
    assert!(!first.duplicate);
    let second = session.breakpoint_set(&set_request("X.cs", 10)).unwrap();
    assert!(second.duplicate);
    assert_eq!(second.id, first.id);
    let (list, _) = session.breakpoint_list();
    assert_eq!(list.iter().filter(|bp| bp.file == "X.cs").count(), 1);
}

#[test]
fn list_remove_enable_roundtrip() {
    let (session, _, _) = engine();
    attach(&session);
    let breakpoint = session
        .breakpoint_set(&set_request("MethodTarget.cs", 14))
        .unwrap();

    let (list, _) = session.breakpoint_list();
    assert!(list.iter().any(|bp| bp.id == breakpoint.id));

    // enable is idempotent
    let once = session.breakpoint_enable(breakpoint.id, true).unwrap();
    let twice = session.breakpoint_enable(breakpoint.id, true).unwrap();
    assert_eq!(once.enabled, twice.enabled);

    let disabled = session.breakpoint_enable(breakpoint.id, false).unwrap();
    assert_eq!(disabled.state, BreakpointState::Disabled);

    session.breakpoint_remove(breakpoint.id).unwrap();
    let (list, _) = session.breakpoint_list();
    assert!(list.iter().all(|bp| bp.id != breakpoint.id));
    assert!(matches!(
        session.breakpoint_remove(breakpoint.id).unwrap_err(),
        DebugError::BreakpointNotFound(_)
    ));
}

#[test]
fn clear_all_empties_the_registry() {
    let (session, _, _) = engine();
    attach(&session);
    session.breakpoint_set(&set_request("A.cs", 1)).unwrap();
    session.breakpoint_set(&set_request("B.cs", 2)).unwrap();
    session.breakpoint_clear_all();
    let (list, _) = session.breakpoint_list();
    assert!(list.is_empty());
}

#[test]
fn wait_times_out_and_reports_disconnect() {
    let (session, platform, _) = engine();
    attach(&session);

    match session
        .breakpoint_wait(&wait_request(50), &CancelToken::new())
        .unwrap()
    {
        BreakpointWait::TimedOut => {}
        other => panic!("expected timeout, got {other:?}"),
    }

    let waiter = {
        let session = session.clone();
        std::thread::spawn(move || {
            session.breakpoint_wait(&wait_request(10_000), &CancelToken::new())
        })
    };
    std::thread::sleep(Duration::from_millis(40));
    platform.target(1000).unwrap().exit_process(0);
    match waiter.join().unwrap().unwrap() {
        BreakpointWait::Disconnected => {}
        other => panic!("expected disconnect, got {other:?}"),
    }

    // no session at all → NoSession
    assert!(matches!(
        session
            .breakpoint_wait(&wait_request(10), &CancelToken::new())
            .unwrap_err(),
        DebugError::NoSession
    ));
}

#[test]
fn exception_breakpoints_gate_first_chance_pauses() {
    let (session, platform, _) = engine();
    platform.add_process(
        ProcessScript::new(1000)
            .with_module(APP_MODULE)
            .with_subtype("System.ArgumentNullException", "System.ArgumentException"),
    );
    attach(&session);
    let target = platform.target(1000).unwrap();

    let first_chance = |type_name: &str| NativeEvent::Exception {
        thread_id: 1,
        type_name: type_name.to_string(),
        message: Some("boom".to_string()),
        first_chance: true,
        module_path: None,
        method_token: None,
        il_offset: None,
    };

    // unmatched first-chance exceptions auto-continue
    assert_eq!(
        target.inject(first_chance("System.ArgumentException")),
        Continuation::AutoContinue
    );
    assert_eq!(session.state(), SessionState::Running);

    session
        .breakpoint_set_exception(&ExceptionBreakpointRequest {
            exception_type: "System.ArgumentException".into(),
            first_chance: true,
            second_chance: true,
            include_subtypes: true,
        })
        .unwrap();

    // subtype match pauses with reason Exception
    assert_eq!(
        target.inject(first_chance("System.ArgumentNullException")),
        Continuation::RemainPaused
    );
    let info = session.session_info().unwrap();
    assert_eq!(info.pause_reason, Some(PauseReason::Exception));

    let (_, exceptions) = session.breakpoint_list();
    assert_eq!(exceptions.len(), 1);
    assert_eq!(exceptions[0].hit_count, 1);

    // unhandled exceptions always pause
    session.resume().unwrap();
    let continuation = target.inject(NativeEvent::Exception {
        thread_id: 1,
        type_name: "System.InvalidOperationException".to_string(),
        message: None,
        first_chance: false,
        module_path: None,
        method_token: None,
        il_offset: None,
    });
    assert_eq!(continuation, Continuation::RemainPaused);
}

#[test]
fn anonymous_hit_still_pauses_and_is_delivered() {
    let (session, platform, _) = engine();
    attach(&session);
    let target = platform.target(1000).unwrap();

    // no breakpoint registered at this binding
    assert_eq!(target.inject(hit_event(99)), Continuation::RemainPaused);
    match session
        .breakpoint_wait(&wait_request(1_000), &CancelToken::new())
        .unwrap()
    {
        BreakpointWait::Hit(hit) => assert_eq!(hit.breakpoint_id, None),
        other => panic!("expected hit, got {other:?}"),
    }
}

#[test]
fn hit_and_state_change_are_observed_together() {
    let (session, platform, _) = engine();
    attach(&session);
    session
        .breakpoint_set(&set_request("MethodTarget.cs", 14))
        .unwrap();

    let (tx, rx) = channel();
    session.subscribe(tx);
    platform.target(1000).unwrap().inject(hit_event(1));

    // the hit event arrives first, and the paused state is already
    // queryable at that point
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(matches!(events[0], DebugEvent::BreakpointHit { .. }));
    assert!(matches!(
        events[1],
        DebugEvent::SessionStateChanged {
            new: SessionState::Paused,
            ..
        }
    ));
    assert_eq!(session.state(), SessionState::Paused);
}

#[test]
fn disabled_breakpoint_does_not_pause() {
    let (session, platform, _) = engine();
    attach(&session);
    let breakpoint = session
        .breakpoint_set(&set_request("MethodTarget.cs", 14))
        .unwrap();
    session.breakpoint_enable(breakpoint.id, false).unwrap();

    let target = platform.target(1000).unwrap();
    assert_eq!(target.inject(hit_event(1)), Continuation::AutoContinue);
    assert_eq!(session.state(), SessionState::Running);
    let (list, _) = session.breakpoint_list();
    assert_eq!(list[0].hit_count, 0);
}

#[test]
fn bindings_drop_on_disconnect_but_registry_survives() {
    let (session, _, _) = engine();
    attach(&session);
    let breakpoint = session
        .breakpoint_set(&set_request("MethodTarget.cs", 14))
        .unwrap();
    assert_eq!(breakpoint.state, BreakpointState::Bound);

    session.disconnect(false).unwrap();
    let (list, _) = session.breakpoint_list();
    assert_eq!(list[0].state, BreakpointState::Pending);

    // a fresh attach re-binds the surviving registry entry
    attach(&session);
    let (list, _) = session.breakpoint_list();
    assert_eq!(list[0].state, BreakpointState::Bound);
}

// keeps the import used; the builder is exercised heavily in inspection.rs
#[test]
fn object_builder_smoke() {
    let object = ObjectBuilder::new(0x1000, "App.User")
        .field("_name", RawValue::Str("Ada".into()))
        .build();
    assert_eq!(object.fields.len(), 1);
}
