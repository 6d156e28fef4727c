use crate::{
    error::PatchError,
    utils::{AssetContainer, ClassId, Record},
};

/// Name markers that disqualify a candidate from substring search when the
/// search is restricted to the given class. Such records can still be found
/// by exact name.
const SUBSTRING_EXCLUSIONS: &[(ClassId, &str)] = &[
    // Shadow-casting meshes reuse the real mesh's suffix ("ShadowMesh_Dress").
    (ClassId::MESH, "ShadowMesh"),
];

pub fn excluded_from_substring_search(class_filter: Option<ClassId>, name: &str) -> bool {
    let Some(class_id) = class_filter else {
        return false;
    };
    SUBSTRING_EXCLUSIONS
        .iter()
        .any(|(excluded, marker)| *excluded == class_id && name.contains(marker))
}

pub fn name_matches(name: &str, search: &str, class_filter: Option<ClassId>, exact: bool) -> bool {
    if exact {
        return name == search;
    }
    !name.is_empty()
        && !excluded_from_substring_search(class_filter, name)
        && name.contains(search)
}

/// First record in container order whose `m_Name` matches `search`.
pub fn find_by_name<'a>(
    container: &'a AssetContainer,
    search: &str,
    class_filter: Option<ClassId>,
    exact: bool,
) -> Option<&'a Record> {
    container
        .records()
        .filter(|record| class_filter.is_none_or(|class_id| record.class_id == class_id))
        .find(|record| {
            record
                .name()
                .is_some_and(|name| name_matches(name, search, class_filter, exact))
        })
}

pub fn require_by_name<'a>(
    container: &'a AssetContainer,
    search: &str,
    class_filter: Option<ClassId>,
    exact: bool,
) -> Result<&'a Record, PatchError> {
    find_by_name(container, search, class_filter, exact).ok_or_else(|| {
        let kind = class_filter
            .map(|c| c.to_string())
            .unwrap_or_else(|| "record".to_string());
        PatchError::LookupFailure(format!("no {kind} named like \"{search}\""))
    })
}
