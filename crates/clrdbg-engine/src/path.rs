//! Dotted-path resolution against a frame.
//!
//! Paths are the restricted sublanguage `ident(.ident | [n])*`. The first
//! segment resolves local → argument → implicit `this` member; later
//! segments walk fields (declared, then inherited, then the property's
//! compiler-generated backing field). Index segments apply to arrays only.

use std::time::Instant;

use smol_str::SmolStr;

use crate::condition::{CondValue, ConditionScope};
use crate::error::DebugError;
use crate::platform::{ObjectSnapshot, RawValue, TargetProcess};

/// Typed path-resolution failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PathError {
    UnknownIdentifier { segment: String, position: u32 },
    MemberNotFound { type_name: String, segment: String },
    NullIntermediate { prefix: String },
    InvalidIndex { index: u32, length: u32 },
    Syntax { message: String, position: u32 },
    Timeout,
    Platform(String),
}

impl PathError {
    pub(crate) fn message(&self) -> String {
        match self {
            PathError::UnknownIdentifier { segment, .. } => {
                format!("unknown identifier '{segment}'")
            }
            PathError::MemberNotFound { type_name, segment } => {
                format!("type '{type_name}' has no member '{segment}'")
            }
            PathError::NullIntermediate { prefix } => {
                format!("null value at path prefix '{prefix}'")
            }
            PathError::Syntax { message, .. } => message.clone(),
            PathError::InvalidIndex { index, length } => {
                format!("index {index} out of bounds (length {length})")
            }
            PathError::Timeout => "evaluation timed out".into(),
            PathError::Platform(message) => message.clone(),
        }
    }

    /// Map to the evaluation-operation error taxonomy.
    pub(crate) fn into_eval_error(self) -> DebugError {
        match self {
            PathError::Syntax { message, position } => DebugError::EvalSyntax { message, position },
            PathError::Timeout => DebugError::EvalTimeout,
            PathError::Platform(message) => DebugError::EvalUnavailable(message),
            other => DebugError::EvalException(other.message()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Member(String),
    Index(u32),
}

/// One frame's resolution context.
pub(crate) struct FrameScope<'a> {
    pub target: &'a dyn TargetProcess,
    pub thread_id: u32,
    pub frame_index: u32,
    pub deadline: Option<Instant>,
}

impl FrameScope<'_> {
    /// Resolve a dotted path to a value.
    pub(crate) fn resolve(&self, expression: &str) -> Result<RawValue, PathError> {
        let expression = expression.trim();
        let segments = parse_segments(expression)?;
        let mut iter = segments.into_iter();
        let Some(Segment::Member(first)) = iter.next() else {
            return Err(PathError::Syntax {
                message: "path must start with an identifier".into(),
                position: 0,
            });
        };

        let slots = self
            .target
            .frame_slots(self.thread_id, self.frame_index)
            .map_err(|err| PathError::Platform(err.to_string()))?;

        let mut prefix = first.clone();
        let mut current = if first == "this" {
            slots.this.clone().ok_or(PathError::UnknownIdentifier {
                segment: first,
                position: 0,
            })?
        } else if let Some(slot) = slots.locals.iter().find(|slot| slot.name == first) {
            slot.value.clone()
        } else if let Some(slot) = slots.arguments.iter().find(|slot| slot.name == first) {
            slot.value.clone()
        } else if let Some(value) = self.implicit_this_member(&slots.this, &first)? {
            value
        } else {
            return Err(PathError::UnknownIdentifier {
                segment: first,
                position: 0,
            });
        };

        for segment in iter {
            self.check_deadline()?;
            match segment {
                Segment::Member(name) => {
                    if current.is_null() {
                        return Err(PathError::NullIntermediate { prefix });
                    }
                    let Some(address) = current.address() else {
                        return Err(PathError::MemberNotFound {
                            type_name: current.type_name().to_string(),
                            segment: name,
                        });
                    };
                    let snapshot = self.snapshot(address)?;
                    current = lookup_member(&snapshot, &name)?;
                    prefix.push('.');
                    prefix.push_str(&name);
                }
                Segment::Index(index) => {
                    if current.is_null() {
                        return Err(PathError::NullIntermediate { prefix });
                    }
                    let Some(address) = current.address() else {
                        return Err(PathError::MemberNotFound {
                            type_name: current.type_name().to_string(),
                            segment: format!("[{index}]"),
                        });
                    };
                    let snapshot = self.snapshot(address)?;
                    let length = u32::try_from(snapshot.elements.len()).unwrap_or(u32::MAX);
                    let Some(element) = snapshot.elements.get(index as usize) else {
                        return Err(PathError::InvalidIndex { index, length });
                    };
                    current = element.clone();
                    prefix.push_str(&format!("[{index}]"));
                }
            }
        }
        Ok(current)
    }

    fn implicit_this_member(
        &self,
        this: &Option<RawValue>,
        name: &str,
    ) -> Result<Option<RawValue>, PathError> {
        let Some(this) = this else {
            return Ok(None);
        };
        let Some(address) = this.address() else {
            return Ok(None);
        };
        let snapshot = self.snapshot(address)?;
        match lookup_member(&snapshot, name) {
            Ok(value) => Ok(Some(value)),
            Err(PathError::MemberNotFound { .. }) => Ok(None),
            Err(other) => Err(other),
        }
    }

    fn snapshot(&self, address: u64) -> Result<ObjectSnapshot, PathError> {
        self.check_deadline()?;
        self.target
            .object_snapshot(address)
            .map_err(|err| PathError::Platform(err.to_string()))
    }

    fn check_deadline(&self) -> Result<(), PathError> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(PathError::Timeout),
            _ => Ok(()),
        }
    }
}

/// Field lookup: exact name anywhere in the (derived-first) field list,
/// then the property backing field `<Name>k__BackingField`.
fn lookup_member(snapshot: &ObjectSnapshot, name: &str) -> Result<RawValue, PathError> {
    if let Some(field) = snapshot.fields.iter().find(|field| field.name == name) {
        return Ok(field.value.clone());
    }
    let backing = SmolStr::new(format!("<{name}>k__BackingField"));
    if let Some(field) = snapshot.fields.iter().find(|field| field.name == backing) {
        return Ok(field.value.clone());
    }
    Err(PathError::MemberNotFound {
        type_name: snapshot.type_name.to_string(),
        segment: name.to_string(),
    })
}

fn parse_segments(expression: &str) -> Result<Vec<Segment>, PathError> {
    if expression.is_empty() {
        return Err(PathError::Syntax {
            message: "expression is empty".into(),
            position: 0,
        });
    }
    let bytes = expression.as_bytes();
    let mut segments = Vec::new();
    let mut at = 0usize;

    let mut read_ident = |at: &mut usize| -> Result<String, PathError> {
        let start = *at;
        if *at >= bytes.len() || !(bytes[*at].is_ascii_alphabetic() || bytes[*at] == b'_') {
            return Err(PathError::Syntax {
                message: "expected an identifier".into(),
                position: u32::try_from(start).unwrap_or(u32::MAX),
            });
        }
        while *at < bytes.len() && (bytes[*at].is_ascii_alphanumeric() || bytes[*at] == b'_') {
            *at += 1;
        }
        Ok(expression[start..*at].to_string())
    };

    segments.push(Segment::Member(read_ident(&mut at)?));
    while at < bytes.len() {
        match bytes[at] {
            b'.' => {
                at += 1;
                segments.push(Segment::Member(read_ident(&mut at)?));
            }
            b'[' => {
                let open = at;
                at += 1;
                let start = at;
                while at < bytes.len() && bytes[at].is_ascii_digit() {
                    at += 1;
                }
                if start == at || at >= bytes.len() || bytes[at] != b']' {
                    return Err(PathError::Syntax {
                        message: "expected '[index]'".into(),
                        position: u32::try_from(open).unwrap_or(u32::MAX),
                    });
                }
                let index: u32 = expression[start..at].parse().map_err(|_| PathError::Syntax {
                    message: "index out of range".into(),
                    position: u32::try_from(start).unwrap_or(u32::MAX),
                })?;
                at += 1;
                segments.push(Segment::Index(index));
            }
            _ => {
                return Err(PathError::Syntax {
                    message: "expression is not a plain dotted path".into(),
                    position: u32::try_from(at).unwrap_or(u32::MAX),
                })
            }
        }
    }
    Ok(segments)
}

/// Convert a resolved value into a condition operand.
pub(crate) fn cond_value(value: &RawValue) -> Result<CondValue, String> {
    match value {
        RawValue::Null { .. } => Ok(CondValue::Null),
        RawValue::Bool(value) => Ok(CondValue::Bool(*value)),
        RawValue::Int { value, .. } => Ok(CondValue::Int(*value)),
        RawValue::UInt { value, .. } => Ok(CondValue::UInt(*value)),
        RawValue::Float { .. } => {
            Err("floating-point values cannot be used in conditions".into())
        }
        RawValue::Char(value) => Ok(CondValue::Str(value.to_string())),
        RawValue::Str(value) => Ok(CondValue::Str(value.clone())),
        RawValue::Object { address: 0, .. } | RawValue::Array { address: 0, .. } => {
            Ok(CondValue::Null)
        }
        RawValue::Object { address, .. } | RawValue::Array { address, .. } => {
            Ok(CondValue::Ref(*address))
        }
    }
}

/// A [`ConditionScope`] over a live frame.
pub(crate) struct FrameConditionScope<'a> {
    pub frame: FrameScope<'a>,
    pub hit_count: u64,
}

impl ConditionScope for FrameConditionScope<'_> {
    fn hit_count(&self) -> u64 {
        self.hit_count
    }

    fn resolve(&self, path: &str) -> Result<CondValue, String> {
        let value = self.frame.resolve(path).map_err(|err| err.message())?;
        cond_value(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dotted_paths_with_indexes() {
        let segments = parse_segments("this._users[2].Name").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Member("this".into()),
                Segment::Member("_users".into()),
                Segment::Index(2),
                Segment::Member("Name".into()),
            ]
        );
    }

    #[test]
    fn rejects_operators_in_paths() {
        let err = parse_segments("a + b").unwrap_err();
        assert!(matches!(err, PathError::Syntax { position: 1, .. }));
    }

    #[test]
    fn rejects_trailing_dot() {
        let err = parse_segments("a.b.").unwrap_err();
        assert!(matches!(err, PathError::Syntax { .. }));
    }

    #[test]
    fn null_intermediate_error_carries_prefix() {
        let err = PathError::NullIntermediate {
            prefix: "this._currentUser.WorkAddress".into(),
        };
        assert!(err.message().contains("this._currentUser.WorkAddress"));
        assert!(err.message().contains("null"));
    }
}
