//! Metadata catalog: modules, types, members, wildcard search.
//!
//! Every query here is read-only against runtime metadata and runs with
//! the session either Running or Paused; none of them stop the target.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use clrdbg_protocol::{
    MemberInfo, MemberKind, MembersGetRequest, ModuleInfo, ModulesListRequest, NamespaceSummary,
    SearchKind, SearchMatch, SearchMatchKind, SearchRequest, TypeInfo, TypesGetRequest, TypesPage,
};
use rustc_hash::FxHashMap;

use crate::error::DebugError;
use crate::platform::{PlatformError, RawMember, RawModule, RawType, TargetProcess};
use crate::render::format_address;
use crate::session::module_basename;

/// Well-known framework module prefixes excluded by `include_system=false`.
const SYSTEM_PREFIXES: &[&str] = &["System.", "Microsoft.", "mscorlib", "netstandard", "System"];

pub(crate) fn modules_list(
    target: &dyn TargetProcess,
    request: &ModulesListRequest,
) -> Result<Vec<ModuleInfo>, DebugError> {
    let pattern = request
        .name_filter
        .as_deref()
        .map(|filter| wildcard(filter, false))
        .transpose()?;
    let modules = target
        .modules()
        .map_err(|err| DebugError::EnumerationFailed(err.to_string()))?;
    Ok(modules
        .into_iter()
        .filter(|module| request.include_system || !is_system_module(&module.name))
        .filter(|module| {
            pattern
                .as_ref()
                .is_none_or(|pattern| pattern.matches(&module.name.to_ascii_lowercase()))
        })
        .map(module_info)
        .collect())
}

pub(crate) fn types_get(
    target: &dyn TargetProcess,
    request: &TypesGetRequest,
) -> Result<TypesPage, DebugError> {
    let module = find_module(target, &request.module)?;
    let mut types = target
        .module_types(&module.path)
        .map_err(map_metadata_error)?;

    if let Some(filter) = request.namespace_filter.as_deref() {
        types.retain(|row| {
            row.namespace.as_str() == filter
                || row
                    .namespace
                    .as_str()
                    .strip_prefix(filter)
                    .is_some_and(|rest| rest.starts_with('.'))
        });
    }
    if let Some(kind) = request.kind {
        types.retain(|row| row.kind == kind);
    }
    if let Some(visibility) = request.visibility {
        types.retain(|row| row.visibility == visibility);
    }
    types.sort_by(|a, b| a.full_name.cmp(&b.full_name));

    let namespaces = namespace_summary(&types, request.namespace_filter.as_deref());
    let total_matched = u32::try_from(types.len()).unwrap_or(u32::MAX);

    let offset = match request.continuation_token.as_deref() {
        Some(token) => decode_token(token, &request.module)?,
        None => 0,
    };
    let page_end = offset.saturating_add(request.max_results as usize).min(types.len());
    let page_start = offset.min(types.len());
    let continuation_token = (page_end < types.len())
        .then(|| encode_token(&request.module, page_end));

    let page = types[page_start..page_end]
        .iter()
        .map(|row| type_info(row, &module.name))
        .collect();

    Ok(TypesPage {
        types: page,
        continuation_token,
        namespaces,
        total_matched,
    })
}

pub(crate) fn members_get(
    target: &dyn TargetProcess,
    request: &MembersGetRequest,
) -> Result<Vec<MemberInfo>, DebugError> {
    let module_path = match request.module.as_deref() {
        Some(module) => Some(find_module(target, module)?.path),
        None => {
            // The type must be unambiguous across loaded modules.
            let modules = target
                .modules()
                .map_err(|err| DebugError::EnumerationFailed(err.to_string()))?;
            let mut owners = Vec::new();
            for module in modules {
                let types = target
                    .module_types(&module.path)
                    .map_err(map_metadata_error)?;
                if types
                    .iter()
                    .any(|row| row.full_name.as_str() == request.type_name)
                {
                    owners.push(module.path);
                }
            }
            match owners.len() {
                0 => return Err(DebugError::TypeNotFound(request.type_name.clone())),
                1 => Some(owners.remove(0)),
                _ => {
                    return Err(DebugError::TypeNotFound(format!(
                        "'{}' is ambiguous across {} modules; pass a module",
                        request.type_name,
                        owners.len()
                    )))
                }
            }
        }
    };

    let mut members = target
        .type_members(&request.type_name, module_path.as_deref())
        .map_err(map_member_error)?;

    if request.include_inherited {
        let mut base = target
            .type_layout(&request.type_name)
            .ok()
            .and_then(|layout| layout.base_type);
        while let Some(base_name) = base {
            match target.type_members(&base_name, None) {
                Ok(inherited) => members.extend(inherited),
                Err(err) => {
                    tracing::debug!(base = %base_name, error = %err, "inherited_members_unavailable");
                }
            }
            base = target
                .type_layout(&base_name)
                .ok()
                .and_then(|layout| layout.base_type);
        }
    }

    if let Some(kinds) = &request.member_kinds {
        members.retain(|member| kinds.contains(&member.kind));
    }
    if let Some(visibility) = request.visibility {
        members.retain(|member| member.visibility == visibility);
    }
    members.retain(|member| {
        if member.is_static {
            request.include_static
        } else {
            request.include_instance
        }
    });

    Ok(members.iter().map(member_info).collect())
}

pub(crate) fn search(
    target: &dyn TargetProcess,
    request: &SearchRequest,
) -> Result<Vec<SearchMatch>, DebugError> {
    let pattern = wildcard(&request.pattern, request.case_sensitive)?;
    let module_pattern = request
        .module_filter
        .as_deref()
        .map(|filter| wildcard(filter, false))
        .transpose()?;
    let limit = request.max_results as usize;

    let modules = target
        .modules()
        .map_err(|err| DebugError::SearchFailed(err.to_string()))?;
    let mut matches = Vec::new();

    for module in modules {
        if matches.len() >= limit {
            break;
        }
        if let Some(module_pattern) = &module_pattern {
            if !module_pattern.matches(&module.name.to_ascii_lowercase()) {
                continue;
            }
        }
        let types = target
            .module_types(&module.path)
            .map_err(|err| DebugError::SearchFailed(err.to_string()))?;
        for row in types {
            if matches.len() >= limit {
                break;
            }
            let type_matches = matches_pattern(&pattern, request.case_sensitive, &row.full_name)
                || matches_pattern(&pattern, request.case_sensitive, &row.name);
            if matches!(request.search_type, SearchKind::Types | SearchKind::Both) && type_matches {
                matches.push(SearchMatch {
                    kind: SearchMatchKind::Type,
                    name: row.name.to_string(),
                    full_name: row.full_name.to_string(),
                    module: module.name.clone(),
                    declaring_type: None,
                });
            }
            if matches!(request.search_type, SearchKind::Methods | SearchKind::Both) {
                let members = target
                    .type_members(row.full_name.as_str(), Some(&module.path))
                    .unwrap_or_default();
                for member in members {
                    if matches.len() >= limit {
                        break;
                    }
                    if member.kind == MemberKind::Method
                        && matches_pattern(&pattern, request.case_sensitive, &member.name)
                    {
                        matches.push(SearchMatch {
                            kind: SearchMatchKind::Method,
                            name: member.name.to_string(),
                            full_name: format!("{}.{}", row.full_name, member.name),
                            module: module.name.clone(),
                            declaring_type: Some(row.full_name.to_string()),
                        });
                    }
                }
            }
        }
    }
    Ok(matches)
}

// ------------------------------------------------------------------ helpers

fn is_system_module(name: &str) -> bool {
    SYSTEM_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

fn wildcard(pattern: &str, case_sensitive: bool) -> Result<glob::Pattern, DebugError> {
    let normalized = if case_sensitive {
        pattern.to_string()
    } else {
        pattern.to_ascii_lowercase()
    };
    glob::Pattern::new(&normalized).map_err(|_| DebugError::InvalidPattern(pattern.to_string()))
}

fn matches_pattern(pattern: &glob::Pattern, case_sensitive: bool, candidate: &str) -> bool {
    if case_sensitive {
        pattern.matches(candidate)
    } else {
        pattern.matches(&candidate.to_ascii_lowercase())
    }
}

fn find_module(target: &dyn TargetProcess, module: &str) -> Result<RawModule, DebugError> {
    let modules = target
        .modules()
        .map_err(|err| DebugError::EnumerationFailed(err.to_string()))?;
    modules
        .into_iter()
        .find(|candidate| {
            candidate.path == module
                || candidate.name == module
                || module_basename(&candidate.path) == module
        })
        .ok_or_else(|| DebugError::ModuleNotFound(module.to_string()))
}

fn namespace_summary(types: &[RawType], filter: Option<&str>) -> Vec<NamespaceSummary> {
    let mut counts: FxHashMap<String, u32> = FxHashMap::default();
    for row in types {
        let namespace = row.namespace.as_str();
        let child = match filter {
            Some(filter) => match namespace.strip_prefix(filter) {
                Some(rest) => {
                    let rest = rest.strip_prefix('.').unwrap_or(rest);
                    if rest.is_empty() {
                        continue;
                    }
                    let segment = rest.split('.').next().unwrap_or(rest);
                    format!("{filter}.{segment}")
                }
                None => continue,
            },
            None => {
                if namespace.is_empty() {
                    continue;
                }
                namespace.split('.').next().unwrap_or(namespace).to_string()
            }
        };
        *counts.entry(child).or_insert(0) += 1;
    }
    let mut summary: Vec<NamespaceSummary> = counts
        .into_iter()
        .map(|(name, type_count)| NamespaceSummary { name, type_count })
        .collect();
    summary.sort_by(|a, b| a.name.cmp(&b.name));
    summary
}

fn encode_token(module: &str, offset: usize) -> String {
    BASE64_STANDARD.encode(format!("types:{module}:{offset}"))
}

fn decode_token(token: &str, module: &str) -> Result<usize, DebugError> {
    let invalid = || DebugError::InvalidParameter("invalid continuation token".to_string());
    let decoded = BASE64_STANDARD.decode(token).map_err(|_| invalid())?;
    let decoded = String::from_utf8(decoded).map_err(|_| invalid())?;
    let rest = decoded.strip_prefix("types:").ok_or_else(invalid)?;
    let (token_module, offset) = rest.rsplit_once(':').ok_or_else(invalid)?;
    if token_module != module {
        return Err(invalid());
    }
    offset.parse().map_err(|_| invalid())
}

fn module_info(module: RawModule) -> ModuleInfo {
    ModuleInfo {
        is_system: is_system_module(&module.name),
        base_address: module.base_address.map(format_address),
        size: module.size,
        is_dynamic: module.is_dynamic,
        name: module.name,
        path: module.path,
    }
}

fn type_info(row: &RawType, module_name: &str) -> TypeInfo {
    TypeInfo {
        full_name: row.full_name.to_string(),
        namespace: row.namespace.to_string(),
        name: row.name.to_string(),
        kind: row.kind,
        visibility: row.visibility,
        token: row.token,
        module: module_name.to_string(),
    }
}

fn member_info(member: &RawMember) -> MemberInfo {
    MemberInfo {
        name: member.name.to_string(),
        kind: member.kind,
        visibility: member.visibility,
        is_static: member.is_static,
        declaring_type: member.declaring_type.to_string(),
        member_type: member.member_type.as_ref().map(ToString::to_string),
        signature: member.signature.clone(),
        getter: member.getter,
        setter: member.setter,
    }
}

fn map_metadata_error(err: PlatformError) -> DebugError {
    match err {
        PlatformError::ModuleNotFound(name) => DebugError::ModuleNotFound(name),
        other => DebugError::MetadataError(other.to_string()),
    }
}

fn map_member_error(err: PlatformError) -> DebugError {
    match err {
        PlatformError::TypeNotFound(name) => DebugError::TypeNotFound(name),
        other => DebugError::MetadataError(other.to_string()),
    }
}
