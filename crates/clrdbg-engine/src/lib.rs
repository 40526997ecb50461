//! Interactive debugging engine for a managed runtime.
//!
//! The engine sits between a structured tool surface (requests and
//! responses from [`clrdbg_protocol`]) and the native managed-debug API
//! (the [`platform`] traits). One [`DebugSession`] owns at most one
//! attached process at a time:
//!
//! - the session state machine (`Disconnected → Running ⇄ Paused`),
//! - the event pump serializing native callbacks onto that state machine,
//! - the breakpoint registry with its pending/bound lifecycle and hit
//!   rendezvous,
//! - inspection (variables, dotted-path evaluation, object graphs, type
//!   layout, references, raw memory),
//! - and the read-only metadata catalog.
//!
//! The [`harness`] module ships a scripted in-memory platform so embedders
//! and tests can drive every flow without a live runtime.

mod breakpoints;
mod cancel;
mod catalog;
mod condition;
mod error;
mod inspect;
mod path;
mod pump;
mod render;
mod session;
mod symbols;
mod trace;

pub mod harness;
pub mod platform;

pub use cancel::CancelToken;
pub use error::DebugError;
pub use session::{BreakpointWait, DebugEvent, DebugSession};
pub use symbols::SymbolIndex;

pub use clrdbg_protocol as protocol;
