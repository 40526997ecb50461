//! Numeric bounds shared by the engine and its callers.

/// Minimum attach/launch timeout.
pub const MIN_ATTACH_TIMEOUT_MS: u64 = 1_000;
/// Maximum attach/launch timeout.
pub const MAX_ATTACH_TIMEOUT_MS: u64 = 300_000;
/// Default attach/launch timeout when the request leaves it unset.
pub const DEFAULT_ATTACH_TIMEOUT_MS: u64 = 30_000;

/// Minimum `breakpoint_wait` timeout.
pub const MIN_WAIT_TIMEOUT_MS: u64 = 1;
/// Maximum `breakpoint_wait` and `wait_for_state` timeout.
pub const MAX_WAIT_TIMEOUT_MS: u64 = 300_000;
/// Default `breakpoint_wait` timeout.
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 30_000;

/// Minimum expression evaluation timeout.
pub const MIN_EVAL_TIMEOUT_MS: u64 = 100;
/// Maximum expression evaluation timeout.
pub const MAX_EVAL_TIMEOUT_MS: u64 = 60_000;
/// Default expression evaluation timeout.
pub const DEFAULT_EVAL_TIMEOUT_MS: u64 = 5_000;

/// Inclusive object-inspection depth bounds.
pub const MIN_INSPECT_DEPTH: u32 = 1;
pub const MAX_INSPECT_DEPTH: u32 = 10;

/// Inclusive memory-read size bounds, in bytes.
pub const MIN_MEMORY_READ: u32 = 1;
pub const MAX_MEMORY_READ: u32 = 65_536;

/// Maximum frames per `stacktrace` page.
pub const MAX_STACK_FRAMES: u32 = 1_000;

/// Maximum results per `types_get` page.
pub const MAX_TYPE_RESULTS: u32 = 1_000;
/// Default `types_get` page size.
pub const DEFAULT_TYPE_RESULTS: u32 = 200;

/// Maximum results for `modules_search`.
pub const MAX_SEARCH_RESULTS: u32 = 100;

/// Maximum results for `references_get`.
pub const MAX_REFERENCE_RESULTS: u32 = 100;

/// Value renderings are truncated to this many characters.
pub const VALUE_RENDER_CAP: usize = 256;

/// Soft cap on total fields emitted by one object inspection.
pub const INSPECT_FIELD_CAP: usize = 1_024;

/// Capacity of the breakpoint-hit FIFO.
pub const HIT_QUEUE_CAPACITY: usize = 1_024;
