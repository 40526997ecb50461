//! Sequence-point blob decoding.
//!
//! The blob format is the Portable PDB `SequencePoints` encoding: a local
//! signature header, an optional initial document, then delta-compressed
//! records. A record with `delta_lines == 0 && delta_columns == 0` is a
//! hidden sequence point (compiler-generated code with no user source).

use crate::cursor::Cursor;
use crate::error::SymbolError;

/// One sequence point: an IL range start mapped to a source range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencePoint {
    pub il_offset: u32,
    /// 1-based Document rid.
    pub document: u32,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
    pub is_hidden: bool,
}

/// Decode the `SequencePoints` blob of one method.
///
/// `initial_document` is the rid from the `MethodDebugInformation` row; when
/// it is zero the method spans documents and the blob opens with its own
/// document record.
pub(crate) fn decode_sequence_points(
    blob: &[u8],
    initial_document: u32,
) -> Result<Vec<SequencePoint>, SymbolError> {
    let mut cursor = Cursor::new(blob);
    let mut points = Vec::new();
    if blob.is_empty() {
        return Ok(points);
    }

    let _local_signature = cursor.read_compressed_u32()?;
    let mut document = if initial_document == 0 {
        cursor.read_compressed_u32()?
    } else {
        initial_document
    };

    let mut il_offset: u32 = 0;
    let mut start_line: u32 = 0;
    let mut start_column: u32 = 0;
    let mut first_record = true;
    let mut first_non_hidden = true;

    while !cursor.is_at_end() {
        let delta_il = cursor.read_compressed_u32()?;
        if !first_record && delta_il == 0 {
            // document-record: switch documents, no point emitted
            document = cursor.read_compressed_u32()?;
            continue;
        }
        il_offset = if first_record {
            delta_il
        } else {
            il_offset.saturating_add(delta_il)
        };
        first_record = false;

        let delta_lines = cursor.read_compressed_u32()?;
        let delta_columns: i64 = if delta_lines == 0 {
            i64::from(cursor.read_compressed_u32()?)
        } else {
            i64::from(cursor.read_compressed_i32()?)
        };

        if delta_lines == 0 && delta_columns == 0 {
            points.push(SequencePoint {
                il_offset,
                document,
                start_line: 0,
                start_column: 0,
                end_line: 0,
                end_column: 0,
                is_hidden: true,
            });
            continue;
        }

        if first_non_hidden {
            start_line = cursor.read_compressed_u32()?;
            start_column = cursor.read_compressed_u32()?;
            first_non_hidden = false;
        } else {
            start_line = add_delta(start_line, cursor.read_compressed_i32()?);
            start_column = add_delta(start_column, cursor.read_compressed_i32()?);
        }

        let end_line = start_line.saturating_add(delta_lines);
        let end_column = add_delta_i64(start_column, delta_columns);
        points.push(SequencePoint {
            il_offset,
            document,
            start_line,
            start_column,
            end_line,
            end_column,
            is_hidden: false,
        });
    }

    Ok(points)
}

fn add_delta(base: u32, delta: i32) -> u32 {
    add_delta_i64(base, i64::from(delta))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn add_delta_i64(base: u32, delta: i64) -> u32 {
    let result = i64::from(base) + delta;
    if result < 0 {
        0
    } else {
        result.min(i64::from(u32::MAX)) as u32
    }
}
