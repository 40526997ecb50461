//! Frame, object, layout, reference and memory inspection.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use clrdbg_protocol::{
    EvaluateRequest, EvaluationValue, FieldInspection, LayoutField, LayoutRequest,
    MemoryFormat, MemoryReadRequest, MemoryReadResult, ObjectInspectRequest, ObjectInspection,
    PaddingInfo, PaddingReason, ReferenceDirection, ReferenceKind, ReferencesRequest,
    ReferencesResult, OutboundReference, ScopeFilter, TypeLayout, VariableInfo, VariableScope,
    VariablesRequest, DEFAULT_EVAL_TIMEOUT_MS, INSPECT_FIELD_CAP,
};

use crate::error::DebugError;
use crate::path::FrameScope;
use crate::platform::{ObjectSnapshot, PlatformError, RawValue, TargetProcess};
use crate::render::{children_count, format_address, has_children, render_value};

/// Object header size for reference types on a 64-bit runtime (method
/// table pointer plus object header word). Value types have none.
const OBJECT_HEADER_SIZE: u32 = 16;

const INBOUND_NOT_IMPLEMENTED: &str = "inbound reference walking is not implemented";

/// Enumerate variables of one frame, with an optional one-level expansion.
pub(crate) fn variables(
    target: &dyn TargetProcess,
    active_thread: Option<u32>,
    request: &VariablesRequest,
) -> Result<Vec<VariableInfo>, DebugError> {
    let thread_id = request
        .thread_id
        .or(active_thread)
        .ok_or_else(|| DebugError::VariablesFailed("no active thread".into()))?;
    let slots = target
        .frame_slots(thread_id, request.frame_index)
        .map_err(|err| map_frame_error(err, thread_id, request.frame_index))?;

    let mut variables = Vec::new();
    let scope = request.scope;
    if matches!(scope, ScopeFilter::All | ScopeFilter::Locals) {
        for slot in &slots.locals {
            variables.push(variable(&slot.name, &slot.value, VariableScope::Local));
        }
    }
    if matches!(scope, ScopeFilter::All | ScopeFilter::Arguments) {
        for slot in &slots.arguments {
            variables.push(variable(&slot.name, &slot.value, VariableScope::Argument));
        }
    }
    if matches!(scope, ScopeFilter::All | ScopeFilter::This) {
        if let Some(this) = &slots.this {
            variables.push(variable("this", this, VariableScope::This));
        }
    }

    if let Some(expand) = request.expand.as_deref() {
        let frame = FrameScope {
            target,
            thread_id,
            frame_index: request.frame_index,
            deadline: None,
        };
        let value = frame
            .resolve(expand)
            .map_err(|err| DebugError::VariablesFailed(err.message()))?;
        variables.extend(expand_children(target, expand, &value)?);
    }
    Ok(variables)
}

/// Evaluate a dotted-path expression against a frame.
pub(crate) fn evaluate(
    target: &dyn TargetProcess,
    active_thread: Option<u32>,
    request: &EvaluateRequest,
) -> Result<EvaluationValue, DebugError> {
    let thread_id = request
        .thread_id
        .or(active_thread)
        .ok_or_else(|| DebugError::EvalUnavailable("no active thread".into()))?;
    let timeout = Duration::from_millis(request.timeout_ms.unwrap_or(DEFAULT_EVAL_TIMEOUT_MS));
    let frame = FrameScope {
        target,
        thread_id,
        frame_index: request.frame_index,
        deadline: Some(Instant::now() + timeout),
    };
    let value = frame
        .resolve(&request.expression)
        .map_err(crate::path::PathError::into_eval_error)?;
    Ok(EvaluationValue {
        value: render_value(&value),
        type_name: value.type_name().to_string(),
        has_children: has_children(&value),
    })
}

/// Walk an object graph to a bounded depth with cycle detection.
pub(crate) fn object_inspect(
    target: &dyn TargetProcess,
    request: &ObjectInspectRequest,
) -> Result<ObjectInspection, DebugError> {
    let address = parse_address(&request.object_ref)
        .ok_or_else(|| DebugError::InvalidReference(request.object_ref.clone()))?;
    if address == 0 {
        return Ok(ObjectInspection {
            address: format_address(0),
            type_name: String::new(),
            size: 0,
            fields: Vec::new(),
            is_null: true,
            has_circular_ref: false,
            truncated: false,
        });
    }

    let snapshot = snapshot_of(target, address)?;
    let mut walker = Walker {
        target,
        emitted: 0,
        truncated: false,
        circular: false,
    };
    let fields = walker.walk(&snapshot, request.depth)?;
    Ok(ObjectInspection {
        address: format_address(address),
        type_name: snapshot.type_name.to_string(),
        size: snapshot.size,
        fields,
        is_null: false,
        has_circular_ref: walker.circular,
        truncated: walker.truncated,
    })
}

/// Physical layout of a type, with synthesized padding entries.
pub(crate) fn layout_get(
    target: &dyn TargetProcess,
    request: &LayoutRequest,
) -> Result<TypeLayout, DebugError> {
    let layout = target
        .type_layout(&request.type_name)
        .map_err(map_type_error)?;
    let header_size = if layout.is_value_type {
        0
    } else {
        OBJECT_HEADER_SIZE
    };
    let data_size = layout.total_size.saturating_sub(header_size);

    let mut fields: Vec<LayoutField> = Vec::new();
    if request.include_inherited {
        // Base fields first, in declaration order, at their native offsets.
        let mut chain = Vec::new();
        let mut base = layout.base_type.clone();
        while let Some(base_name) = base {
            let base_layout = target.type_layout(&base_name).map_err(map_type_error)?;
            base = base_layout.base_type.clone();
            chain.push(base_layout);
        }
        for base_layout in chain.into_iter().rev() {
            fields.extend(base_layout.fields.iter().map(layout_field));
        }
    }
    fields.extend(layout.fields.iter().map(layout_field));
    fields.sort_by_key(|field| field.offset);

    let padding = request.include_padding.then(|| {
        let mut padding = Vec::new();
        let mut cursor = 0u32;
        for field in &fields {
            if field.offset > cursor {
                padding.push(PaddingInfo {
                    offset: cursor,
                    size: field.offset - cursor,
                    reason: PaddingReason::Alignment,
                });
            }
            cursor = cursor.max(field.offset + field.size);
        }
        if data_size > cursor {
            padding.push(PaddingInfo {
                offset: cursor,
                size: data_size - cursor,
                reason: PaddingReason::Tail,
            });
        }
        padding
    });

    Ok(TypeLayout {
        type_name: layout.type_name.to_string(),
        total_size: layout.total_size,
        header_size,
        data_size,
        fields,
        padding,
        base_type: layout.base_type.map(|name| name.to_string()),
        is_value_type: layout.is_value_type,
    })
}

/// Outbound reference edges of one object. Inbound walking is a formalized
/// negative: `inbound` alone is rejected, `both` returns outbound plus a
/// note.
pub(crate) fn references_get(
    target: &dyn TargetProcess,
    request: &ReferencesRequest,
) -> Result<ReferencesResult, DebugError> {
    if request.direction == ReferenceDirection::Inbound {
        return Err(DebugError::InvalidParameter(
            INBOUND_NOT_IMPLEMENTED.to_string(),
        ));
    }
    let address = parse_address(&request.object_ref)
        .ok_or_else(|| DebugError::InvalidReference(request.object_ref.clone()))?;
    let snapshot = snapshot_of(target, address)?;

    let mut outbound: Vec<OutboundReference> = Vec::new();
    let mut truncated = false;
    let limit = request.max_results as usize;

    for field in &snapshot.fields {
        let Some(target_address) = field.value.address() else {
            continue;
        };
        if outbound.len() >= limit {
            truncated = true;
            break;
        }
        outbound.push(OutboundReference {
            source_address: format_address(address),
            source_type: snapshot.type_name.to_string(),
            target_address: format_address(target_address),
            target_type: field.value.type_name().to_string(),
            path: field.name.to_string(),
            kind: if field.is_static {
                ReferenceKind::Static
            } else {
                ReferenceKind::Field
            },
        });
    }
    if request.include_arrays && snapshot.is_array && !truncated {
        for (index, element) in snapshot.elements.iter().enumerate() {
            let Some(target_address) = element.address() else {
                continue;
            };
            if outbound.len() >= limit {
                truncated = true;
                break;
            }
            outbound.push(OutboundReference {
                source_address: format_address(address),
                source_type: snapshot.type_name.to_string(),
                target_address: format_address(target_address),
                target_type: element.type_name().to_string(),
                path: format!("[{index}]"),
                kind: ReferenceKind::ArrayElement,
            });
        }
    }

    let note = (request.direction == ReferenceDirection::Both)
        .then(|| INBOUND_NOT_IMPLEMENTED.to_string());
    Ok(ReferencesResult {
        target_address: format_address(address),
        target_type: snapshot.type_name.to_string(),
        outbound_count: u32::try_from(outbound.len()).unwrap_or(u32::MAX),
        outbound,
        truncated,
        note,
    })
}

/// Bounded raw memory read with hex/ASCII rendering.
pub(crate) fn memory_read(
    target: &dyn TargetProcess,
    request: &MemoryReadRequest,
) -> Result<MemoryReadResult, DebugError> {
    let address = parse_address(&request.address)
        .ok_or_else(|| DebugError::InvalidAddress(request.address.clone()))?;
    let mut buf = vec![0u8; request.size as usize];
    let read = target
        .read_memory(address, &mut buf)
        .map_err(|err| DebugError::MemoryReadFailed(err.to_string()))?;
    buf.truncate(read);

    let bytes_read = u32::try_from(read).unwrap_or(u32::MAX);
    let error = (bytes_read < request.size)
        .then(|| format!("partial read: {bytes_read} of {} bytes", request.size));

    let hex = || buf.iter().map(|byte| format!("{byte:02x}")).collect::<String>();
    let (data, ascii, raw) = match request.format {
        MemoryFormat::Hex => (Some(hex()), None, None),
        MemoryFormat::HexAscii => {
            let ascii: String = buf
                .iter()
                .map(|&byte| {
                    if (0x20..0x7f).contains(&byte) {
                        byte as char
                    } else {
                        '.'
                    }
                })
                .collect();
            (Some(hex()), Some(ascii), None)
        }
        MemoryFormat::Raw => (None, None, Some(buf)),
    };

    Ok(MemoryReadResult {
        address: format_address(address),
        requested_size: request.size,
        bytes_read,
        data,
        ascii,
        raw,
        error,
    })
}

// ------------------------------------------------------------------ shared

/// Accepts `0x…` hex or plain decimal.
pub(crate) fn parse_address(text: &str) -> Option<u64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}

struct Walker<'a> {
    target: &'a dyn TargetProcess,
    emitted: usize,
    truncated: bool,
    circular: bool,
}

/// A queued child object: expand `address` into the children of node
/// `node`. `path` is the address chain from the root through this object.
struct PendingExpand {
    node: usize,
    address: u64,
    depth_left: u32,
    path: Vec<u64>,
}

impl Walker<'_> {
    /// Level-order walk: every field of one level is emitted before any
    /// child object is opened, so the field cap truncates by level, never
    /// by exhausting one branch's subtree first.
    fn walk(
        &mut self,
        root: &ObjectSnapshot,
        depth: u32,
    ) -> Result<Vec<FieldInspection>, DebugError> {
        let mut nodes: Vec<Option<FieldInspection>> = Vec::new();
        let mut child_indices: Vec<Vec<usize>> = Vec::new();
        let mut queue: VecDeque<PendingExpand> = VecDeque::new();

        let roots = self.emit_level(
            root,
            depth,
            &[root.address],
            None,
            &mut nodes,
            &mut child_indices,
            &mut queue,
        );
        while let Some(pending) = queue.pop_front() {
            let snapshot = snapshot_of(self.target, pending.address)?;
            self.emit_level(
                &snapshot,
                pending.depth_left,
                &pending.path,
                Some(pending.node),
                &mut nodes,
                &mut child_indices,
                &mut queue,
            );
        }

        // Children always carry larger indices than their parent, so one
        // reverse pass moves every subtree into place.
        for index in (0..nodes.len()).rev() {
            let indices = std::mem::take(&mut child_indices[index]);
            if indices.is_empty() {
                continue;
            }
            let mut children = Vec::with_capacity(indices.len());
            for child in indices {
                if let Some(child) = nodes[child].take() {
                    children.push(child);
                }
            }
            if let Some(node) = nodes[index].as_mut() {
                node.children = children;
            }
        }

        Ok(roots
            .into_iter()
            .filter_map(|index| nodes[index].take())
            .collect())
    }

    /// Emit one object's fields (or elements) as sibling nodes, queueing
    /// expandable children for the next level. Returns the new node
    /// indices.
    #[allow(clippy::too_many_arguments)]
    fn emit_level(
        &mut self,
        snapshot: &ObjectSnapshot,
        depth_left: u32,
        path: &[u64],
        parent: Option<usize>,
        nodes: &mut Vec<Option<FieldInspection>>,
        child_indices: &mut Vec<Vec<usize>>,
        queue: &mut VecDeque<PendingExpand>,
    ) -> Vec<usize> {
        let items: Vec<(String, &RawValue, u32, u32)> = if snapshot.is_array {
            snapshot
                .elements
                .iter()
                .enumerate()
                .map(|(index, element)| {
                    (
                        format!("[{index}]"),
                        element,
                        u32::try_from(index).unwrap_or(u32::MAX),
                        0,
                    )
                })
                .collect()
        } else {
            snapshot
                .fields
                .iter()
                .map(|field| (field.name.to_string(), &field.value, field.offset, field.size))
                .collect()
        };

        let mut level = Vec::new();
        for (name, value, offset, size) in items {
            if self.at_cap() {
                break;
            }
            self.emitted += 1;
            let mut entry = FieldInspection {
                name,
                type_name: value.type_name().to_string(),
                value: render_value(value),
                offset,
                size,
                has_children: has_children(value),
                child_count: children_count(value),
                children: Vec::new(),
            };
            let index = nodes.len();
            if depth_left > 1 && entry.has_children {
                if let Some(address) = value.address() {
                    if path.contains(&address) {
                        entry.value = "<circular>".to_string();
                        self.circular = true;
                    } else {
                        let mut child_path = path.to_vec();
                        child_path.push(address);
                        queue.push_back(PendingExpand {
                            node: index,
                            address,
                            depth_left: depth_left - 1,
                            path: child_path,
                        });
                    }
                }
            }
            nodes.push(Some(entry));
            child_indices.push(Vec::new());
            if let Some(parent) = parent {
                child_indices[parent].push(index);
            }
            level.push(index);
        }
        level
    }

    fn at_cap(&mut self) -> bool {
        if self.emitted >= INSPECT_FIELD_CAP {
            self.truncated = true;
            return true;
        }
        false
    }
}

fn variable(name: &str, value: &RawValue, scope: VariableScope) -> VariableInfo {
    VariableInfo {
        name: name.to_string(),
        type_name: value.type_name().to_string(),
        value: render_value(value),
        scope,
        has_children: has_children(value),
        children_count: children_count(value),
        path: Some(name.to_string()),
    }
}

fn expand_children(
    target: &dyn TargetProcess,
    expand: &str,
    value: &RawValue,
) -> Result<Vec<VariableInfo>, DebugError> {
    let Some(address) = value.address() else {
        return Ok(Vec::new());
    };
    let snapshot = snapshot_of(target, address)?;
    let mut children = Vec::new();
    if snapshot.is_array {
        for (index, element) in snapshot.elements.iter().enumerate() {
            let mut child = variable(&format!("[{index}]"), element, VariableScope::Element);
            child.path = Some(format!("{expand}[{index}]"));
            children.push(child);
        }
    } else {
        for field in &snapshot.fields {
            let mut child = variable(field.name.as_str(), &field.value, VariableScope::Field);
            child.path = Some(format!("{expand}.{}", field.name));
            children.push(child);
        }
    }
    Ok(children)
}

fn snapshot_of(target: &dyn TargetProcess, address: u64) -> Result<ObjectSnapshot, DebugError> {
    target.object_snapshot(address).map_err(|err| match err {
        PlatformError::ObjectUnavailable(address) => {
            DebugError::InvalidReference(format_address(address))
        }
        other => DebugError::MetadataError(other.to_string()),
    })
}

fn map_frame_error(err: PlatformError, thread_id: u32, frame_index: u32) -> DebugError {
    match err {
        PlatformError::ThreadNotFound(_) => DebugError::InvalidThread(thread_id),
        PlatformError::FrameNotAvailable(_) => DebugError::InvalidFrame(frame_index),
        other => DebugError::VariablesFailed(other.to_string()),
    }
}

fn map_type_error(err: PlatformError) -> DebugError {
    match err {
        PlatformError::TypeNotFound(name) => DebugError::TypeNotFound(name),
        other => DebugError::MetadataError(other.to_string()),
    }
}

fn layout_field(field: &crate::platform::RawLayoutField) -> LayoutField {
    LayoutField {
        name: field.name.to_string(),
        type_name: field.type_name.to_string(),
        offset: field.offset,
        size: field.size,
        alignment: field.alignment,
        is_reference: field.is_reference,
        declaring_type: field.declaring_type.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_decimal_addresses() {
        assert_eq!(parse_address("0x1a2b"), Some(0x1A2B));
        assert_eq!(parse_address("4096"), Some(4096));
        assert_eq!(parse_address("0xzz"), None);
        assert_eq!(parse_address(""), None);
        assert_eq!(parse_address("12ab"), None);
    }
}
