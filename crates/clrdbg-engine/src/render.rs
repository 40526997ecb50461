//! Short string rendering of target values.

use clrdbg_protocol::VALUE_RENDER_CAP;

use crate::platform::RawValue;

/// Render a value to a display string of at most [`VALUE_RENDER_CAP`]
/// characters, with `…` truncation.
pub(crate) fn render_value(value: &RawValue) -> String {
    let rendered = match value {
        RawValue::Null { .. } => "null".to_string(),
        RawValue::Bool(value) => {
            if *value {
                "true".to_string()
            } else {
                "false".to_string()
            }
        }
        RawValue::Int { value, .. } => value.to_string(),
        RawValue::UInt { value, .. } => value.to_string(),
        RawValue::Float { value, .. } => format!("{value}"),
        RawValue::Char(value) => format!("'{value}'"),
        RawValue::Str(value) => format!("\"{value}\""),
        RawValue::Object { address: 0, .. } => "null".to_string(),
        RawValue::Object { type_name, address } => format!("{type_name} @ {address:#x}"),
        RawValue::Array { address: 0, .. } => "null".to_string(),
        RawValue::Array { element_type, length, .. } => format!("{element_type}[{length}]"),
    };
    truncate(rendered)
}

/// Whether the value expands to children.
pub(crate) fn has_children(value: &RawValue) -> bool {
    match value {
        RawValue::Object { address, .. } => *address != 0,
        RawValue::Array { address, length, .. } => *address != 0 && *length > 0,
        _ => false,
    }
}

/// Child count, when statically known.
pub(crate) fn children_count(value: &RawValue) -> Option<u32> {
    match value {
        RawValue::Array { address, length, .. } if *address != 0 => Some(*length),
        _ => None,
    }
}

fn truncate(rendered: String) -> String {
    if rendered.chars().count() <= VALUE_RENDER_CAP {
        return rendered;
    }
    let mut out: String = rendered.chars().take(VALUE_RENDER_CAP - 1).collect();
    out.push('…');
    out
}

/// Format a heap address the way every response does: lowercase hex with a
/// `0x` prefix.
pub(crate) fn format_address(address: u64) -> String {
    format!("{address:#x}")
}
