//! Inspection engine and metadata catalog: nested path evaluation,
//! inherited properties, object graphs with cycles, layout padding,
//! references, memory reads, and catalog queries.

use std::sync::Arc;

use clrdbg_engine::harness::{FakePlatform, ObjectBuilder, ProcessScript, ScriptedSymbols};
use clrdbg_engine::platform::{
    FrameSlots, NativeEvent, RawLayoutField, RawMember, RawSlot, RawType, RawTypeLayout, RawValue,
};
use clrdbg_engine::protocol::{
    AttachRequest, ErrorCode, EvaluateRequest, LayoutRequest, MemberKind, MembersGetRequest,
    MemoryFormat, MemoryReadRequest, ModulesListRequest, ObjectInspectRequest, PaddingReason,
    ReferenceDirection, ReferenceKind, ReferencesRequest, ScopeFilter, SearchKind, SearchRequest,
    TypeKind, TypesGetRequest, VariableScope, VariablesRequest, Visibility, INSPECT_FIELD_CAP,
};
use clrdbg_engine::{CancelToken, DebugError, DebugSession};

const APP_MODULE: &str = "/app/App.dll";

fn user_object_graph(script: ProcessScript) -> ProcessScript {
    script
        .with_object(
            ObjectBuilder::new(0x1000, "App.ObjectTarget")
                .field(
                    "_currentUser",
                    RawValue::Object {
                        address: 0x2000,
                        type_name: "App.Models.User".into(),
                    },
                )
                .build(),
        )
        .with_object(
            ObjectBuilder::new(0x2000, "App.Models.User")
                .field("<Name>k__BackingField", RawValue::Str("Ada Lovelace".into()))
                .field(
                    "HomeAddress",
                    RawValue::Object {
                        address: 0x3000,
                        type_name: "App.Models.Address".into(),
                    },
                )
                .field(
                    "WorkAddress",
                    RawValue::Null {
                        type_name: "App.Models.Address".into(),
                    },
                )
                .field_of(
                    "App.Models.Entity",
                    "<Id>k__BackingField",
                    RawValue::Int {
                        value: 42,
                        type_name: "System.Int64".into(),
                    },
                )
                .build(),
        )
        .with_object(
            ObjectBuilder::new(0x3000, "App.Models.Address")
                .field("City", RawValue::Str("London".into()))
                .field("Zip", RawValue::Str("N1 9GU".into()))
                .build(),
        )
        .with_object(ObjectBuilder::array(
            0x4000,
            "System.Int32",
            vec![
                RawValue::Int {
                    value: 1,
                    type_name: "System.Int32".into(),
                },
                RawValue::Int {
                    value: 2,
                    type_name: "System.Int32".into(),
                },
                RawValue::Int {
                    value: 3,
                    type_name: "System.Int32".into(),
                },
            ],
        ))
        .with_slots(
            1,
            0,
            FrameSlots {
                locals: vec![
                    RawSlot {
                        name: "count".into(),
                        value: RawValue::Int {
                            value: 3,
                            type_name: "System.Int32".into(),
                        },
                    },
                    RawSlot {
                        name: "items".into(),
                        value: RawValue::Array {
                            address: 0x4000,
                            element_type: "System.Int32".into(),
                            length: 3,
                        },
                    },
                ],
                arguments: vec![RawSlot {
                    name: "user".into(),
                    value: RawValue::Object {
                        address: 0x2000,
                        type_name: "App.Models.User".into(),
                    },
                }],
                this: Some(RawValue::Object {
                    address: 0x1000,
                    type_name: "App.ObjectTarget".into(),
                }),
            },
        )
}

fn paused_engine(script: ProcessScript) -> (DebugSession, FakePlatform) {
    let platform = FakePlatform::new();
    platform.add_process(script);
    let session = DebugSession::new(
        Box::new(platform.clone()),
        Arc::new(ScriptedSymbols::new()),
    );
    session
        .attach(
            &AttachRequest {
                pid: 1000,
                timeout_ms: None,
            },
            &CancelToken::new(),
        )
        .unwrap();
    platform.target(1000).unwrap().inject(NativeEvent::Break {
        thread_id: 1,
        module_path: None,
        method_token: None,
        il_offset: None,
    });
    (session, platform)
}

fn eval(expression: &str) -> EvaluateRequest {
    EvaluateRequest {
        expression: expression.into(),
        thread_id: None,
        frame_index: 0,
        timeout_ms: None,
    }
}

#[test]
fn nested_path_evaluation_and_null_intermediate() {
    let (session, _) = paused_engine(user_object_graph(ProcessScript::new(1000)));

    // scenario: City through a live chain
    let value = session
        .evaluate(&eval("this._currentUser.HomeAddress.City"), &CancelToken::new())
        .unwrap();
    assert!(value.type_name.contains("String"));
    assert_eq!(value.value, "\"London\"");

    // scenario: null intermediate reports the prefix
    let err = session
        .evaluate(&eval("this._currentUser.WorkAddress.City"), &CancelToken::new())
        .unwrap_err();
    match &err {
        DebugError::EvalException(message) => {
            assert!(message.contains("null"));
            assert!(message.contains("this._currentUser.WorkAddress"));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(err.code(), ErrorCode::EvalException);
}

#[test]
fn inherited_property_resolves_through_backing_field() {
    let (session, _) = paused_engine(user_object_graph(ProcessScript::new(1000)));
    let value = session
        .evaluate(&eval("this._currentUser.Id"), &CancelToken::new())
        .unwrap();
    assert!(value.value.chars().all(|ch| ch.is_ascii_digit()));
    assert_eq!(value.value, "42");
}

#[test]
fn unknown_identifier_and_syntax_errors() {
    let (session, _) = paused_engine(user_object_graph(ProcessScript::new(1000)));

    let err = session
        .evaluate(&eval("nonsense.member"), &CancelToken::new())
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::EvalException);

    let err = session
        .evaluate(&eval("a + b"), &CancelToken::new())
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::EvalSyntaxError);

    let err = session
        .evaluate(&eval(""), &CancelToken::new())
        .unwrap_err();
    assert_eq!(err.to_body().position, Some(0));
}

#[test]
fn variables_enumerates_scopes_and_expands() {
    let (session, _) = paused_engine(user_object_graph(ProcessScript::new(1000)));

    let all = session
        .variables(&VariablesRequest {
            thread_id: None,
            frame_index: 0,
            scope: ScopeFilter::All,
            expand: None,
        })
        .unwrap();
    let names: Vec<&str> = all.iter().map(|var| var.name.as_str()).collect();
    assert_eq!(names, vec!["count", "items", "user", "this"]);
    assert_eq!(all[0].scope, VariableScope::Local);
    assert_eq!(all[2].scope, VariableScope::Argument);
    assert_eq!(all[3].scope, VariableScope::This);
    assert!(all[3].has_children);
    assert_eq!(all[1].children_count, Some(3));

    let locals_only = session
        .variables(&VariablesRequest {
            thread_id: None,
            frame_index: 0,
            scope: ScopeFilter::Locals,
            expand: None,
        })
        .unwrap();
    assert_eq!(locals_only.len(), 2);

    let expanded = session
        .variables(&VariablesRequest {
            thread_id: None,
            frame_index: 0,
            scope: ScopeFilter::This,
            expand: Some("items".into()),
        })
        .unwrap();
    let elements: Vec<&_> = expanded
        .iter()
        .filter(|var| var.scope == VariableScope::Element)
        .collect();
    assert_eq!(elements.len(), 3);
    assert_eq!(elements[0].path.as_deref(), Some("items[0]"));
}

#[test]
fn object_inspection_detects_cycles() {
    let script = ProcessScript::new(1000)
        .with_object(
            ObjectBuilder::new(0x5000, "App.Node")
                .field(
                    "next",
                    RawValue::Object {
                        address: 0x6000,
                        type_name: "App.Node".into(),
                    },
                )
                .build(),
        )
        .with_object(
            ObjectBuilder::new(0x6000, "App.Node")
                .field(
                    "next",
                    RawValue::Object {
                        address: 0x5000,
                        type_name: "App.Node".into(),
                    },
                )
                .build(),
        );
    let (session, _) = paused_engine(script);

    let inspection = session
        .object_inspect(&ObjectInspectRequest {
            object_ref: "0x5000".into(),
            depth: 10,
            thread_id: None,
            frame_index: 0,
        })
        .unwrap();
    assert!(inspection.has_circular_ref);
    assert_eq!(inspection.fields[0].name, "next");
    let back_edge = &inspection.fields[0].children[0];
    assert_eq!(back_edge.value, "<circular>");
    assert!(back_edge.children.is_empty());
}

#[test]
fn object_inspection_truncates_by_level_at_the_field_cap() {
    // One small first level, then a second level far past the cap: every
    // level-one sibling must survive, and the cut lands inside level two.
    let elements: Vec<RawValue> = (0..1_200)
        .map(|value| RawValue::Int {
            value,
            type_name: "System.Int32".into(),
        })
        .collect();
    let script = ProcessScript::new(1000)
        .with_object(
            ObjectBuilder::new(0x9000, "App.Hub")
                .field(
                    "first",
                    RawValue::Array {
                        address: 0xA000,
                        element_type: "System.Int32".into(),
                        length: 1_200,
                    },
                )
                .field(
                    "second",
                    RawValue::Int {
                        value: 7,
                        type_name: "System.Int32".into(),
                    },
                )
                .build(),
        )
        .with_object(ObjectBuilder::array(0xA000, "System.Int32", elements));
    let (session, _) = paused_engine(script);

    let inspection = session
        .object_inspect(&ObjectInspectRequest {
            object_ref: "0x9000".into(),
            depth: 2,
            thread_id: None,
            frame_index: 0,
        })
        .unwrap();
    assert!(inspection.truncated);
    assert!(!inspection.has_circular_ref);

    // A depth-first walk would have drowned in the array and dropped the
    // second top-level field; breadth-first keeps the whole first level.
    assert_eq!(inspection.fields.len(), 2);
    assert_eq!(inspection.fields[0].name, "first");
    assert_eq!(inspection.fields[1].name, "second");

    // The cut is the level-order prefix: cap minus the two level-one
    // fields, taken from the front of the array.
    let children = &inspection.fields[0].children;
    assert_eq!(children.len(), INSPECT_FIELD_CAP - 2);
    assert_eq!(children[0].name, "[0]");
    assert_eq!(children[0].value, "0");
    assert_eq!(
        children[children.len() - 1].name,
        format!("[{}]", INSPECT_FIELD_CAP - 3)
    );
}

#[test]
fn object_inspection_under_the_cap_is_complete() {
    let elements: Vec<RawValue> = (0..10)
        .map(|value| RawValue::Int {
            value,
            type_name: "System.Int32".into(),
        })
        .collect();
    let script = ProcessScript::new(1000)
        .with_object(
            ObjectBuilder::new(0x9000, "App.Hub")
                .field(
                    "first",
                    RawValue::Array {
                        address: 0xA000,
                        element_type: "System.Int32".into(),
                        length: 10,
                    },
                )
                .build(),
        )
        .with_object(ObjectBuilder::array(0xA000, "System.Int32", elements));
    let (session, _) = paused_engine(script);

    let inspection = session
        .object_inspect(&ObjectInspectRequest {
            object_ref: "0x9000".into(),
            depth: 2,
            thread_id: None,
            frame_index: 0,
        })
        .unwrap();
    assert!(!inspection.truncated);
    assert_eq!(inspection.fields[0].children.len(), 10);
}

#[test]
fn object_inspection_depth_and_null() {
    let (session, _) = paused_engine(user_object_graph(ProcessScript::new(1000)));

    let shallow = session
        .object_inspect(&ObjectInspectRequest {
            object_ref: "0x2000".into(),
            depth: 1,
            thread_id: None,
            frame_index: 0,
        })
        .unwrap();
    assert_eq!(shallow.type_name, "App.Models.User");
    assert!(shallow.fields.iter().all(|field| field.children.is_empty()));

    let deep = session
        .object_inspect(&ObjectInspectRequest {
            object_ref: "0x2000".into(),
            depth: 2,
            thread_id: None,
            frame_index: 0,
        })
        .unwrap();
    let home = deep
        .fields
        .iter()
        .find(|field| field.name == "HomeAddress")
        .unwrap();
    assert_eq!(home.children.len(), 2);

    let null = session
        .object_inspect(&ObjectInspectRequest {
            object_ref: "0x0".into(),
            depth: 1,
            thread_id: None,
            frame_index: 0,
        })
        .unwrap();
    assert!(null.is_null);

    let err = session
        .object_inspect(&ObjectInspectRequest {
            object_ref: "garbage".into(),
            depth: 1,
            thread_id: None,
            frame_index: 0,
        })
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidReference);
}

#[test]
fn layout_reports_offsets_header_and_padding() {
    let script = ProcessScript::new(1000)
        .with_layout(RawTypeLayout {
            type_name: "App.Models.Entity".into(),
            total_size: 24,
            is_value_type: false,
            base_type: None,
            fields: vec![RawLayoutField {
                name: "<Id>k__BackingField".into(),
                type_name: "System.Int64".into(),
                offset: 0,
                size: 8,
                alignment: 8,
                is_reference: false,
                declaring_type: "App.Models.Entity".into(),
            }],
        })
        .with_layout(RawTypeLayout {
            type_name: "App.Models.User".into(),
            total_size: 48,
            is_value_type: false,
            base_type: Some("App.Models.Entity".into()),
            fields: vec![
                RawLayoutField {
                    name: "_flags".into(),
                    type_name: "System.Int32".into(),
                    offset: 8,
                    size: 4,
                    alignment: 4,
                    is_reference: false,
                    declaring_type: "App.Models.User".into(),
                },
                RawLayoutField {
                    name: "_name".into(),
                    type_name: "System.String".into(),
                    offset: 16,
                    size: 8,
                    alignment: 8,
                    is_reference: true,
                    declaring_type: "App.Models.User".into(),
                },
            ],
        });
    let (session, _) = paused_engine(script);

    let layout = session
        .layout_get(&LayoutRequest {
            type_name: "App.Models.User".into(),
            include_inherited: true,
            include_padding: true,
            thread_id: None,
            frame_index: 0,
        })
        .unwrap();
    assert_eq!(layout.header_size, 16);
    assert_eq!(layout.data_size, 32);
    assert!(!layout.is_value_type);
    assert_eq!(layout.base_type.as_deref(), Some("App.Models.Entity"));

    let names: Vec<&str> = layout.fields.iter().map(|field| field.name.as_str()).collect();
    assert_eq!(names, vec!["<Id>k__BackingField", "_flags", "_name"]);
    assert_eq!(layout.fields[0].declaring_type, "App.Models.Entity");

    let padding = layout.padding.unwrap();
    assert_eq!(padding.len(), 2);
    assert_eq!(padding[0].offset, 12);
    assert_eq!(padding[0].size, 4);
    assert_eq!(padding[0].reason, PaddingReason::Alignment);
    assert_eq!(padding[1].offset, 24);
    assert_eq!(padding[1].size, 8);
    assert_eq!(padding[1].reason, PaddingReason::Tail);

    let err = session
        .layout_get(&LayoutRequest {
            type_name: "App.Missing".into(),
            include_inherited: false,
            include_padding: false,
            thread_id: None,
            frame_index: 0,
        })
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TypeNotFound);
}

#[test]
fn references_walk_outbound_only() {
    let script = user_object_graph(ProcessScript::new(1000)).with_object(
        ObjectBuilder::array(
            0x8000,
            "App.Models.User",
            vec![
                RawValue::Object {
                    address: 0x2000,
                    type_name: "App.Models.User".into(),
                },
                RawValue::Null {
                    type_name: "App.Models.User".into(),
                },
            ],
        ),
    );
    let (session, _) = paused_engine(script);

    let result = session
        .references_get(&ReferencesRequest {
            object_ref: "0x2000".into(),
            direction: ReferenceDirection::Outbound,
            max_results: 10,
            include_arrays: false,
            thread_id: None,
            frame_index: 0,
        })
        .unwrap();
    assert_eq!(result.outbound_count, 1);
    assert_eq!(result.outbound[0].path, "HomeAddress");
    assert_eq!(result.outbound[0].kind, ReferenceKind::Field);
    assert_eq!(result.outbound[0].target_address, "0x3000");
    assert!(result.note.is_none());

    let array_refs = session
        .references_get(&ReferencesRequest {
            object_ref: "0x8000".into(),
            direction: ReferenceDirection::Both,
            max_results: 10,
            include_arrays: true,
            thread_id: None,
            frame_index: 0,
        })
        .unwrap();
    assert_eq!(array_refs.outbound_count, 1);
    assert_eq!(array_refs.outbound[0].kind, ReferenceKind::ArrayElement);
    assert_eq!(array_refs.outbound[0].path, "[0]");
    assert!(array_refs.note.unwrap().contains("not implemented"));

    let err = session
        .references_get(&ReferencesRequest {
            object_ref: "0x2000".into(),
            direction: ReferenceDirection::Inbound,
            max_results: 10,
            include_arrays: false,
            thread_id: None,
            frame_index: 0,
        })
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidParameter);
}

#[test]
fn memory_read_formats_and_partial_reads() {
    let script = ProcessScript::new(1000).with_memory(0x7000, b"Hello\x01world".to_vec());
    let (session, _) = paused_engine(script);

    let result = session
        .memory_read(&MemoryReadRequest {
            address: "0x7000".into(),
            size: 5,
            format: MemoryFormat::HexAscii,
        })
        .unwrap();
    assert_eq!(result.bytes_read, 5);
    assert_eq!(result.data.as_deref(), Some("48656c6c6f"));
    assert_eq!(result.ascii.as_deref(), Some("Hello"));
    assert!(result.error.is_none());

    // non-printables render as '.'
    let result = session
        .memory_read(&MemoryReadRequest {
            address: "0x7005".into(),
            size: 1,
            format: MemoryFormat::HexAscii,
        })
        .unwrap();
    assert_eq!(result.ascii.as_deref(), Some("."));

    // partial read: region ends before the requested size
    let result = session
        .memory_read(&MemoryReadRequest {
            address: "0x7008".into(),
            size: 64,
            format: MemoryFormat::Raw,
        })
        .unwrap();
    assert_eq!(result.bytes_read, 3);
    assert_eq!(result.raw.as_deref(), Some(&b"rld"[..]));
    assert!(result.error.unwrap().contains("partial"));

    let err = session
        .memory_read(&MemoryReadRequest {
            address: "not-an-address".into(),
            size: 8,
            format: MemoryFormat::Hex,
        })
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidAddress);

    // unmapped memory fails as a read error
    let err = session
        .memory_read(&MemoryReadRequest {
            address: "0x1".into(),
            size: 8,
            format: MemoryFormat::Hex,
        })
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::MemoryReadFailed);
}

// ------------------------------------------------------------- catalog

fn catalog_script() -> ProcessScript {
    let ty = |namespace: &str, name: &str, kind: TypeKind, visibility: Visibility, token: u32| RawType {
        full_name: format!("{namespace}.{name}").into(),
        namespace: namespace.into(),
        name: name.into(),
        kind,
        visibility,
        token,
    };
    ProcessScript::new(1000)
        .with_module(APP_MODULE)
        .with_module("/shared/System.Text.Json.dll")
        .with_types(
            APP_MODULE,
            vec![
                ty("App.Models", "User", TypeKind::Class, Visibility::Public, 0x0200_0001),
                ty("App.Models", "Address", TypeKind::Class, Visibility::Public, 0x0200_0002),
                ty("App.Services", "UserService", TypeKind::Class, Visibility::Public, 0x0200_0003),
                ty("App.Internal", "Secrets", TypeKind::Class, Visibility::Internal, 0x0200_0004),
                ty("App.Models", "Role", TypeKind::Enum, Visibility::Public, 0x0200_0005),
            ],
        )
        .with_members(
            "App.Models.User",
            vec![
                RawMember {
                    name: "GetName".into(),
                    kind: MemberKind::Method,
                    visibility: Visibility::Public,
                    is_static: false,
                    declaring_type: "App.Models.User".into(),
                    member_type: Some("System.String".into()),
                    signature: Some("string GetName()".into()),
                    getter: None,
                    setter: None,
                },
                RawMember {
                    name: "Name".into(),
                    kind: MemberKind::Property,
                    visibility: Visibility::Public,
                    is_static: false,
                    declaring_type: "App.Models.User".into(),
                    member_type: Some("System.String".into()),
                    signature: None,
                    getter: Some(Visibility::Public),
                    setter: Some(Visibility::Private),
                },
                RawMember {
                    name: "_name".into(),
                    kind: MemberKind::Field,
                    visibility: Visibility::Private,
                    is_static: false,
                    declaring_type: "App.Models.User".into(),
                    member_type: Some("System.String".into()),
                    signature: None,
                    getter: None,
                    setter: None,
                },
                RawMember {
                    name: "Create".into(),
                    kind: MemberKind::Method,
                    visibility: Visibility::Public,
                    is_static: true,
                    declaring_type: "App.Models.User".into(),
                    member_type: Some("App.Models.User".into()),
                    signature: Some("static User Create()".into()),
                    getter: None,
                    setter: None,
                },
            ],
        )
        .with_members(
            "App.Models.Entity",
            vec![RawMember {
                name: "Id".into(),
                kind: MemberKind::Property,
                visibility: Visibility::Public,
                is_static: false,
                declaring_type: "App.Models.Entity".into(),
                member_type: Some("System.Int64".into()),
                signature: None,
                getter: Some(Visibility::Public),
                setter: None,
            }],
        )
        .with_layout(RawTypeLayout {
            type_name: "App.Models.User".into(),
            total_size: 48,
            is_value_type: false,
            base_type: Some("App.Models.Entity".into()),
            fields: vec![],
        })
        .with_layout(RawTypeLayout {
            type_name: "App.Models.Entity".into(),
            total_size: 24,
            is_value_type: false,
            base_type: None,
            fields: vec![],
        })
}

#[test]
fn modules_list_filters_system_modules() {
    let (session, _) = paused_engine(catalog_script());

    let user_only = session
        .modules_list(&ModulesListRequest {
            include_system: false,
            name_filter: None,
        })
        .unwrap();
    assert_eq!(user_only.len(), 1);
    assert_eq!(user_only[0].name, "App.dll");
    assert!(!user_only[0].is_system);

    let all = session
        .modules_list(&ModulesListRequest {
            include_system: true,
            name_filter: None,
        })
        .unwrap();
    assert_eq!(all.len(), 2);

    let filtered = session
        .modules_list(&ModulesListRequest {
            include_system: true,
            name_filter: Some("System.*".into()),
        })
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert!(filtered[0].is_system);

    let err = session
        .modules_list(&ModulesListRequest {
            include_system: true,
            name_filter: Some("[".into()),
        })
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidPattern);
}

#[test]
fn types_get_filters_sorts_and_paginates() {
    let (session, _) = paused_engine(catalog_script());

    let request = |max_results: u32, token: Option<String>| TypesGetRequest {
        module: "App.dll".into(),
        namespace_filter: None,
        kind: None,
        visibility: None,
        max_results,
        continuation_token: token,
    };

    let full = session.types_get(&request(1000, None)).unwrap();
    assert_eq!(full.total_matched, 5);
    assert!(full.continuation_token.is_none());
    let sorted: Vec<String> = full.types.iter().map(|t| t.full_name.clone()).collect();
    let mut expected = sorted.clone();
    expected.sort();
    assert_eq!(sorted, expected);

    // pagination closure: concatenating pages equals the single full call
    let mut paged = Vec::new();
    let mut token = None;
    loop {
        let page = session.types_get(&request(2, token.clone())).unwrap();
        paged.extend(page.types.clone());
        match page.continuation_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }
    assert_eq!(paged, full.types);

    // namespace summary counts direct children
    assert!(full
        .namespaces
        .iter()
        .any(|ns| ns.name == "App.Models" && ns.type_count == 3));

    let enums = session
        .types_get(&TypesGetRequest {
            module: "App.dll".into(),
            namespace_filter: Some("App.Models".into()),
            kind: Some(TypeKind::Enum),
            visibility: None,
            max_results: 100,
            continuation_token: None,
        })
        .unwrap();
    assert_eq!(enums.types.len(), 1);
    assert_eq!(enums.types[0].name, "Role");

    let err = session
        .types_get(&TypesGetRequest {
            module: "Nope.dll".into(),
            namespace_filter: None,
            kind: None,
            visibility: None,
            max_results: 10,
            continuation_token: None,
        })
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ModuleNotFound);
}

#[test]
fn members_get_reports_accessors_and_inheritance() {
    let (session, _) = paused_engine(catalog_script());

    let request = MembersGetRequest {
        type_name: "App.Models.User".into(),
        module: None,
        include_inherited: true,
        member_kinds: None,
        visibility: None,
        include_static: true,
        include_instance: true,
    };
    let members = session.members_get(&request).unwrap();
    let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
    assert!(names.contains(&"Name"));
    assert!(names.contains(&"Id"), "inherited property present");

    let name_property = members.iter().find(|m| m.name == "Name").unwrap();
    assert_eq!(name_property.getter, Some(Visibility::Public));
    assert_eq!(name_property.setter, Some(Visibility::Private));
    let id_property = members.iter().find(|m| m.name == "Id").unwrap();
    assert_eq!(id_property.declaring_type, "App.Models.Entity");
    assert!(id_property.setter.is_none());

    // static/instance filters
    let instance_only = session
        .members_get(&MembersGetRequest {
            include_static: false,
            ..request.clone()
        })
        .unwrap();
    assert!(instance_only.iter().all(|m| !m.is_static));

    // kind filter
    let methods_only = session
        .members_get(&MembersGetRequest {
            member_kinds: Some(vec![MemberKind::Method]),
            include_inherited: false,
            ..request.clone()
        })
        .unwrap();
    assert!(methods_only.iter().all(|m| m.kind == MemberKind::Method));

    let err = session
        .members_get(&MembersGetRequest {
            type_name: "App.DoesNotExist".into(),
            ..request
        })
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TypeNotFound);
}

#[test]
fn wildcard_search_finds_types_and_methods() {
    let (session, _) = paused_engine(catalog_script());

    let types = session
        .modules_search(&SearchRequest {
            pattern: "*User*".into(),
            search_type: SearchKind::Types,
            module_filter: None,
            case_sensitive: false,
            max_results: 100,
        })
        .unwrap();
    assert_eq!(types.len(), 2); // User + UserService

    let methods = session
        .modules_search(&SearchRequest {
            pattern: "get*".into(),
            search_type: SearchKind::Methods,
            module_filter: Some("App*".into()),
            case_sensitive: false,
            max_results: 100,
        })
        .unwrap();
    assert_eq!(methods.len(), 1);
    assert_eq!(methods[0].name, "GetName");
    assert_eq!(methods[0].declaring_type.as_deref(), Some("App.Models.User"));

    // case sensitivity
    let none = session
        .modules_search(&SearchRequest {
            pattern: "get*".into(),
            search_type: SearchKind::Methods,
            module_filter: None,
            case_sensitive: true,
            max_results: 100,
        })
        .unwrap();
    assert!(none.is_empty());
}
