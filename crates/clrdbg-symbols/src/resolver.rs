//! Source ↔ IL mapping over cached symbol files.

use std::path::Path;

use crate::cache::SymbolCache;
use crate::error::SymbolError;
use crate::pdb::SymbolFile;
use crate::sequence::SequencePoint;

/// Default outward search range for [`SymbolResolver::find_nearest_valid_line`].
pub const DEFAULT_NEAREST_RANGE: u32 = 8;

/// A forward lookup result: where a source position lands in IL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanResolution {
    pub method_token: u32,
    pub il_offset: u32,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

/// A raw sequence point tagged with its owning method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePoint {
    pub method_token: u32,
    pub point: SequencePoint,
}

/// A reverse lookup result: where an IL offset lands in source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSpan {
    pub file: String,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

/// Symbol resolver over the `(path, mtime)` cache.
#[derive(Debug, Default)]
pub struct SymbolResolver {
    cache: SymbolCache,
}

impl SymbolResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `(source_file, line[, column])` to a method token and IL offset.
    ///
    /// Hidden sequence points never bind. When several points start on the
    /// requested line, a point whose column range contains the requested
    /// column wins; ties break on the smallest IL offset.
    pub fn find_il_offset(
        &self,
        assembly: &Path,
        source_file: &str,
        line: u32,
        column: Option<u32>,
    ) -> Result<Option<SpanResolution>, SymbolError> {
        let file = self.cache.load(assembly)?;
        let documents = matching_documents(&file, source_file);
        if documents.is_empty() {
            return Ok(None);
        }

        let mut candidates: Vec<SpanResolution> = Vec::new();
        for method in &file.methods {
            for point in &method.points {
                if point.is_hidden
                    || !documents.contains(&point.document)
                    || point.start_line != line
                {
                    continue;
                }
                candidates.push(SpanResolution {
                    method_token: method.method_token,
                    il_offset: point.il_offset,
                    start_line: point.start_line,
                    start_column: point.start_column,
                    end_line: point.end_line,
                    end_column: point.end_column,
                });
            }
        }
        if candidates.is_empty() {
            return Ok(None);
        }

        if let Some(column) = column {
            let mut containing: Vec<SpanResolution> = candidates
                .iter()
                .copied()
                .filter(|span| span.start_column <= column && column <= span.end_column)
                .collect();
            if !containing.is_empty() {
                containing.sort_by_key(|span| span.il_offset);
                return Ok(Some(containing[0]));
            }
        }
        candidates.sort_by_key(|span| span.il_offset);
        Ok(Some(candidates[0]))
    }

    /// All sequence points starting on `line`, hidden ones included.
    pub fn sequence_points_on_line(
        &self,
        assembly: &Path,
        source_file: &str,
        line: u32,
    ) -> Result<Vec<LinePoint>, SymbolError> {
        let file = self.cache.load(assembly)?;
        let documents = matching_documents(&file, source_file);
        let mut points = Vec::new();
        for method in &file.methods {
            for point in &method.points {
                if !documents.contains(&point.document) {
                    continue;
                }
                let on_line = if point.is_hidden {
                    // Hidden points carry no line; report them with their
                    // surrounding method when the method touches the line.
                    method
                        .points
                        .iter()
                        .any(|p| !p.is_hidden && p.start_line == line)
                } else {
                    point.start_line == line
                };
                if on_line {
                    points.push(LinePoint {
                        method_token: method.method_token,
                        point: *point,
                    });
                }
            }
        }
        points.sort_by_key(|entry| (entry.method_token, entry.point.il_offset));
        Ok(points)
    }

    /// Walk outwards from `requested_line` (forward first at each distance)
    /// and return the first line with at least one non-hidden point.
    pub fn find_nearest_valid_line(
        &self,
        assembly: &Path,
        source_file: &str,
        requested_line: u32,
        search_range: u32,
    ) -> Result<Option<u32>, SymbolError> {
        let file = self.cache.load(assembly)?;
        let documents = matching_documents(&file, source_file);
        if documents.is_empty() {
            return Ok(None);
        }
        let has_point = |line: u32| {
            file.methods.iter().any(|method| {
                method.points.iter().any(|point| {
                    !point.is_hidden
                        && documents.contains(&point.document)
                        && point.start_line == line
                })
            })
        };
        for distance in 0..=search_range {
            let forward = requested_line.saturating_add(distance);
            if has_point(forward) {
                return Ok(Some(forward));
            }
            if distance > 0 && requested_line > distance {
                let backward = requested_line - distance;
                if has_point(backward) {
                    return Ok(Some(backward));
                }
            }
        }
        Ok(None)
    }

    /// Reverse lookup: the source span covering `il_offset` in a method.
    ///
    /// Selects the non-hidden point with the greatest IL offset not past the
    /// requested one.
    pub fn resolve_offset(
        &self,
        assembly: &Path,
        method_token: u32,
        il_offset: u32,
    ) -> Result<Option<ResolvedSpan>, SymbolError> {
        let file = self.cache.load(assembly)?;
        let Some(method) = file.method(method_token) else {
            return Ok(None);
        };
        let best = method
            .points
            .iter()
            .filter(|point| !point.is_hidden && point.il_offset <= il_offset)
            .max_by_key(|point| point.il_offset);
        let Some(point) = best else {
            return Ok(None);
        };
        let Some(document) = file.document(point.document) else {
            return Ok(None);
        };
        Ok(Some(ResolvedSpan {
            file: document.name.clone(),
            start_line: point.start_line,
            start_column: point.start_column,
            end_line: point.end_line,
            end_column: point.end_column,
        }))
    }

    /// Whether the assembly's symbols mention `source_file` at all.
    pub fn has_document(&self, assembly: &Path, source_file: &str) -> Result<bool, SymbolError> {
        let file = self.cache.load(assembly)?;
        Ok(!matching_documents(&file, source_file).is_empty())
    }

    /// Drop all cached symbol files.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

/// Normalize a path for comparison: forward slashes everywhere, and
/// case-insensitive on Windows only.
fn normalize(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    if cfg!(windows) {
        normalized.to_ascii_lowercase()
    } else {
        normalized
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Document rids matching a source file: full-path equality first, then
/// basename equality as a last resort.
fn matching_documents(file: &SymbolFile, source_file: &str) -> Vec<u32> {
    let wanted = normalize(source_file);
    let mut full: Vec<u32> = Vec::new();
    let mut by_basename: Vec<u32> = Vec::new();
    for (index, document) in file.documents.iter().enumerate() {
        let rid = u32::try_from(index).unwrap_or(u32::MAX).saturating_add(1);
        let name = normalize(&document.name);
        if name == wanted {
            full.push(rid);
        } else if basename(&name) == basename(&wanted) {
            by_basename.push(rid);
        }
    }
    if full.is_empty() {
        by_basename
    } else {
        full
    }
}
