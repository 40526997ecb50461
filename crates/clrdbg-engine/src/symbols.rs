//! Symbol lookup capability, as the engine consumes it.

use std::path::Path;

use clrdbg_symbols::{LinePoint, ResolvedSpan, SpanResolution, SymbolResolver};

/// What the breakpoint manager and event pump need from debug symbols.
/// Lookup misses are `None`; the engine never distinguishes "no symbols"
/// from "no match" when deciding whether a breakpoint can bind.
pub trait SymbolIndex: Send + Sync {
    fn find_il_offset(
        &self,
        assembly: &Path,
        source_file: &str,
        line: u32,
        column: Option<u32>,
    ) -> Option<SpanResolution>;

    fn sequence_points_on_line(
        &self,
        assembly: &Path,
        source_file: &str,
        line: u32,
    ) -> Vec<LinePoint>;

    fn find_nearest_valid_line(
        &self,
        assembly: &Path,
        source_file: &str,
        requested_line: u32,
        search_range: u32,
    ) -> Option<u32>;

    fn resolve_offset(
        &self,
        assembly: &Path,
        method_token: u32,
        il_offset: u32,
    ) -> Option<ResolvedSpan>;

    fn has_document(&self, assembly: &Path, source_file: &str) -> bool;
}

impl SymbolIndex for SymbolResolver {
    fn find_il_offset(
        &self,
        assembly: &Path,
        source_file: &str,
        line: u32,
        column: Option<u32>,
    ) -> Option<SpanResolution> {
        log_miss(
            assembly,
            SymbolResolver::find_il_offset(self, assembly, source_file, line, column),
        )
        .flatten()
    }

    fn sequence_points_on_line(
        &self,
        assembly: &Path,
        source_file: &str,
        line: u32,
    ) -> Vec<LinePoint> {
        log_miss(
            assembly,
            SymbolResolver::sequence_points_on_line(self, assembly, source_file, line),
        )
        .unwrap_or_default()
    }

    fn find_nearest_valid_line(
        &self,
        assembly: &Path,
        source_file: &str,
        requested_line: u32,
        search_range: u32,
    ) -> Option<u32> {
        log_miss(
            assembly,
            SymbolResolver::find_nearest_valid_line(
                self,
                assembly,
                source_file,
                requested_line,
                search_range,
            ),
        )
        .flatten()
    }

    fn resolve_offset(
        &self,
        assembly: &Path,
        method_token: u32,
        il_offset: u32,
    ) -> Option<ResolvedSpan> {
        log_miss(
            assembly,
            SymbolResolver::resolve_offset(self, assembly, method_token, il_offset),
        )
        .flatten()
    }

    fn has_document(&self, assembly: &Path, source_file: &str) -> bool {
        log_miss(
            assembly,
            SymbolResolver::has_document(self, assembly, source_file),
        )
        .unwrap_or(false)
    }
}

fn log_miss<T>(
    assembly: &Path,
    result: Result<T, clrdbg_symbols::SymbolError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            if !err.is_not_found() {
                tracing::debug!(assembly = %assembly.display(), error = %err, "symbol_lookup_failed");
            }
            None
        }
    }
}
