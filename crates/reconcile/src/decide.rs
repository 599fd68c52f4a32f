//! Import decisions
//!
//! Pure functions from (policy, incoming identity, remote inventory) to an
//! [`ImportDecision`]. Nothing here performs I/O.
//!
//! Matching rules differ per policy:
//!
//! | Policy              | id match                 | name match                        |
//! |---------------------|--------------------------|-----------------------------------|
//! | `Discard`           | remote id contains it    | remote name contains it           |
//! | `OverwriteById`     | remote id contains it    | n/a                               |
//! | `OverwriteByName`   | n/a                      | remote name equals it             |
//!
//! A missing incoming id or name never matches. An empty one is compared
//! like any other string, so it is contained in every remote value.

use crate::types::{ImportDecision, OverwritePolicy, RemoteEntitySummary, SkipReason};

/// Decide what to do with an incoming object of any kind except scope tags
pub fn decide(
    policy: OverwritePolicy,
    id: Option<&str>,
    name: Option<&str>,
    existing: &[RemoteEntitySummary],
) -> ImportDecision {
    match policy {
        OverwritePolicy::ImportAsDuplicate => ImportDecision::Create,
        OverwritePolicy::Discard => {
            if id_contained(existing, id) {
                ImportDecision::Skip(SkipReason::IdExists)
            } else if name_contained(existing, name) {
                ImportDecision::Skip(SkipReason::NameExists)
            } else {
                ImportDecision::Create
            }
        }
        OverwritePolicy::OverwriteById => match id {
            Some(pid) if id_contained(existing, Some(pid)) => {
                ImportDecision::PatchById(pid.to_string())
            }
            _ => ImportDecision::Create,
        },
        OverwritePolicy::OverwriteByName => name_equal(existing, name)
            .map_or(ImportDecision::Create, |found| {
                ImportDecision::PatchByName(found.id.clone())
            }),
    }
}

/// Decide what to do with an incoming scope tag.
///
/// Independent of the overwrite policy: tags are matched by exact name and
/// only custom tags (`isBuiltIn == false`) are ever created.
pub fn decide_scope_tag(
    name: Option<&str>,
    is_built_in: Option<bool>,
    existing: &[RemoteEntitySummary],
) -> ImportDecision {
    if name_equal(existing, name).is_some() {
        ImportDecision::Skip(SkipReason::ScopeTagNameExists)
    } else if is_built_in == Some(false) {
        ImportDecision::Create
    } else {
        ImportDecision::Skip(SkipReason::BuiltInScopeTag)
    }
}

fn id_contained(existing: &[RemoteEntitySummary], id: Option<&str>) -> bool {
    id.is_some_and(|pid| existing.iter().any(|e| e.id.contains(pid)))
}

fn name_contained(existing: &[RemoteEntitySummary], name: Option<&str>) -> bool {
    name.is_some_and(|pname| existing.iter().any(|e| e.display_name.contains(pname)))
}

fn name_equal<'a>(
    existing: &'a [RemoteEntitySummary],
    name: Option<&str>,
) -> Option<&'a RemoteEntitySummary> {
    let pname = name?;
    existing.iter().find(|e| e.display_name == pname)
}
