//! Portable-PDB reading and source/IL mapping.
//!
//! A debug-symbol sidecar (same basename as the assembly, `.pdb` suffix)
//! maps source `(file, line, column)` positions to `(method_token,
//! il_offset)` pairs and back. Parsed files are cached by `(path, mtime)`;
//! parsing is single-flighted per assembly so concurrent requesters
//! coalesce onto one parse.

mod cache;
mod cursor;
mod error;
mod pdb;
mod resolver;
mod sequence;

#[cfg(test)]
pub(crate) mod test_pdb;

pub use cache::SymbolCache;
pub use error::SymbolError;
pub use pdb::{DocumentInfo, MethodDebugInfo, SymbolFile};
pub use resolver::{
    LinePoint, ResolvedSpan, SpanResolution, SymbolResolver, DEFAULT_NEAREST_RANGE,
};
pub use sequence::SequencePoint;
