//! Portable-PDB physical parsing.
//!
//! A standalone portable PDB is an ECMA-335 metadata blob whose `#~` stream
//! carries only the debug table group (`Document`, `MethodDebugInformation`
//! and friends). This reader materializes the two tables the resolver
//! needs and leaves the rest untouched.

use crate::cursor::Cursor;
use crate::error::SymbolError;
use crate::sequence::{decode_sequence_points, SequencePoint};

const METADATA_SIGNATURE: u32 = 0x424A_5342; // "BSJB"

const TABLE_DOCUMENT: u32 = 0x30;
const TABLE_METHOD_DEBUG_INFORMATION: u32 = 0x31;

/// MethodDef token base; `MethodDebugInformation` rid `n` describes the
/// method with token `0x0600_0000 + n`.
const METHODDEF_TOKEN_BASE: u32 = 0x0600_0000;

/// One source document named by the symbol file.
#[derive(Debug, Clone)]
pub struct DocumentInfo {
    /// Reconstructed path, exactly as the compiler recorded it.
    pub name: String,
}

/// Sequence points for one method.
#[derive(Debug, Clone)]
pub struct MethodDebugInfo {
    pub method_token: u32,
    pub points: Vec<SequencePoint>,
}

/// A parsed debug-symbol sidecar.
#[derive(Debug, Clone)]
pub struct SymbolFile {
    /// Documents, indexable by rid - 1.
    pub documents: Vec<DocumentInfo>,
    pub methods: Vec<MethodDebugInfo>,
}

struct Streams<'a> {
    tables: &'a [u8],
    blob: &'a [u8],
}

impl SymbolFile {
    /// Parse a portable-PDB image.
    pub fn parse(data: &[u8]) -> Result<Self, SymbolError> {
        let streams = read_stream_directory(data)?;
        parse_tables(&streams)
    }

    /// Look up a document rid (1-based).
    #[must_use]
    pub fn document(&self, rid: u32) -> Option<&DocumentInfo> {
        if rid == 0 {
            return None;
        }
        self.documents.get(rid as usize - 1)
    }

    /// Sequence points for a method token, if the file covers it.
    #[must_use]
    pub fn method(&self, method_token: u32) -> Option<&MethodDebugInfo> {
        self.methods
            .iter()
            .find(|method| method.method_token == method_token)
    }
}

fn read_stream_directory(data: &[u8]) -> Result<Streams<'_>, SymbolError> {
    let mut cursor = Cursor::new(data);
    if cursor.read_u32()? != METADATA_SIGNATURE {
        return Err(SymbolError::BadSignature);
    }
    let _major = cursor.read_u16()?;
    let _minor = cursor.read_u16()?;
    let _reserved = cursor.read_u32()?;
    let version_length = cursor.read_u32()? as usize;
    cursor.skip(version_length)?;
    let _flags = cursor.read_u16()?;
    let stream_count = cursor.read_u16()?;

    let mut tables: Option<&[u8]> = None;
    let mut blob: Option<&[u8]> = None;
    let mut pdb_seen = false;

    for _ in 0..stream_count {
        let offset = cursor.read_u32()? as usize;
        let size = cursor.read_u32()? as usize;
        let name = read_stream_name(&mut cursor)?;
        let end = offset
            .checked_add(size)
            .ok_or(SymbolError::Truncated(offset))?;
        if end > data.len() {
            return Err(SymbolError::Truncated(offset));
        }
        let body = &data[offset..end];
        match name.as_str() {
            "#~" | "#-" => tables = Some(body),
            "#Blob" => blob = Some(body),
            "#Pdb" => pdb_seen = true,
            _ => {}
        }
    }

    if !pdb_seen {
        return Err(SymbolError::MissingStream("#Pdb"));
    }
    Ok(Streams {
        tables: tables.ok_or(SymbolError::MissingStream("#~"))?,
        blob: blob.ok_or(SymbolError::MissingStream("#Blob"))?,
    })
}

fn read_stream_name(cursor: &mut Cursor<'_>) -> Result<String, SymbolError> {
    // Stream names are zero-terminated and padded to a 4-byte boundary.
    let mut name = String::new();
    let mut read = 0usize;
    loop {
        let byte = cursor.read_u8()?;
        read += 1;
        if byte == 0 {
            break;
        }
        name.push(byte as char);
        if read >= 32 {
            return Err(SymbolError::Unsupported("stream name too long"));
        }
    }
    while read % 4 != 0 {
        cursor.read_u8()?;
        read += 1;
    }
    Ok(name)
}

fn parse_tables(streams: &Streams<'_>) -> Result<SymbolFile, SymbolError> {
    let mut cursor = Cursor::new(streams.tables);
    let _reserved = cursor.read_u32()?;
    let _major = cursor.read_u8()?;
    let _minor = cursor.read_u8()?;
    let heap_sizes = cursor.read_u8()?;
    let _reserved2 = cursor.read_u8()?;
    let valid = cursor.read_u64()?;
    let _sorted = cursor.read_u64()?;

    // A standalone portable PDB carries only the debug table group; a
    // combined image would require row widths for every standard table.
    if valid & ((1u64 << TABLE_DOCUMENT) - 1) != 0 {
        return Err(SymbolError::Unsupported("combined metadata image"));
    }

    let mut row_counts = [0u32; 64];
    for (index, slot) in row_counts.iter_mut().enumerate() {
        if valid & (1u64 << index) != 0 {
            *slot = cursor.read_u32()?;
        }
    }

    let blob_wide = heap_sizes & 0x04 != 0;
    let guid_wide = heap_sizes & 0x02 != 0;
    let document_count = row_counts[TABLE_DOCUMENT as usize];
    let method_count = row_counts[TABLE_METHOD_DEBUG_INFORMATION as usize];
    let document_wide = document_count > 0xFFFF;

    let read_heap_index = |cursor: &mut Cursor<'_>, wide: bool| -> Result<u32, SymbolError> {
        if wide {
            cursor.read_u32()
        } else {
            cursor.read_u16().map(u32::from)
        }
    };

    // Document rows: Name (blob), HashAlgorithm (guid), Hash (blob),
    // Language (guid). The Document table precedes MethodDebugInformation,
    // so no intermediate tables need skipping.
    let mut documents = Vec::with_capacity(document_count as usize);
    for _ in 0..document_count {
        let name_index = read_heap_index(&mut cursor, blob_wide)?;
        let _hash_algorithm = read_heap_index(&mut cursor, guid_wide)?;
        let _hash = read_heap_index(&mut cursor, blob_wide)?;
        let _language = read_heap_index(&mut cursor, guid_wide)?;
        documents.push(DocumentInfo {
            name: decode_document_name(streams.blob, name_index)?,
        });
    }

    let mut methods = Vec::with_capacity(method_count as usize);
    for rid in 1..=method_count {
        let document = read_heap_index(&mut cursor, document_wide)?;
        let points_index = read_heap_index(&mut cursor, blob_wide)?;
        let points = if points_index == 0 {
            Vec::new()
        } else {
            let blob = read_blob(streams.blob, points_index)?;
            decode_sequence_points(blob, document)?
        };
        methods.push(MethodDebugInfo {
            method_token: METHODDEF_TOKEN_BASE + rid,
            points,
        });
    }

    Ok(SymbolFile { documents, methods })
}

fn read_blob(heap: &[u8], index: u32) -> Result<&[u8], SymbolError> {
    let start = index as usize;
    if start >= heap.len() {
        return Err(SymbolError::BadBlob(index));
    }
    let mut cursor = Cursor::new(&heap[start..]);
    let length = cursor.read_compressed_u32()? as usize;
    let data_start = start + cursor.position();
    let data_end = data_start
        .checked_add(length)
        .ok_or(SymbolError::BadBlob(index))?;
    if data_end > heap.len() {
        return Err(SymbolError::BadBlob(index));
    }
    Ok(&heap[data_start..data_end])
}

/// Document names are stored as a separator byte followed by blob indexes
/// of UTF-8 path parts; index zero is the empty part.
fn decode_document_name(heap: &[u8], index: u32) -> Result<String, SymbolError> {
    let blob = read_blob(heap, index)?;
    if blob.is_empty() {
        return Ok(String::new());
    }
    let separator = blob[0] as char;
    let mut cursor = Cursor::new(&blob[1..]);
    let mut parts: Vec<String> = Vec::new();
    while !cursor.is_at_end() {
        let part_index = cursor.read_compressed_u32()?;
        if part_index == 0 {
            parts.push(String::new());
        } else {
            let part = read_blob(heap, part_index)?;
            parts.push(String::from_utf8_lossy(part).into_owned());
        }
    }
    if separator == '\0' {
        Ok(parts.concat())
    } else {
        Ok(parts.join(&separator.to_string()))
    }
}
