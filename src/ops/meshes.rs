use serde_json::Value;
use tracing::info;

use super::{PatchOperation, join, json_slot};
use crate::{
    assets::{AssetWorkspace, ReplacementBatch, find_by_name, name_matches, write_patched},
    error::PatchError,
    fields::json::{from_json, to_json},
    parsing::UpdateMeshesParams,
    utils::{AssetContainer, ClassId, Logger},
};

/// Fields that tie a mesh to the bundle's skeleton. They are kept from the
/// mesh being replaced, never taken from the export.
const PRESERVED_MESH_FIELDS: [&str; 3] = ["/m_Name", "/m_RootBoneNameHash", "/m_BoneNameHashes/Array"];

/// Dumps every mesh whose name contains `search_term`, in container order.
pub fn export_meshes(container: &AssetContainer, search_term: &str) -> Vec<(String, Value)> {
    container
        .records_of(ClassId::MESH)
        .filter_map(|record| {
            let name = record.name()?;
            name.contains(search_term)
                .then(|| (name.to_string(), to_json(&record.tree)))
        })
        .collect()
}

/// Stages a replacement for every bundle mesh named like an entry of
/// `meshes_to_update`, built from the matching exported mesh. Entries with
/// no export or no bundle mesh are skipped. Returns the names of the meshes
/// that were staged.
pub fn stage_mesh_updates(
    container: &AssetContainer,
    exported: &[(String, Value)],
    meshes_to_update: &[String],
    batch: &mut ReplacementBatch,
    logger: &Logger,
) -> Result<Vec<String>, PatchError> {
    let mut staged = Vec::new();
    for term in meshes_to_update {
        let Some((source_name, json)) = exported
            .iter()
            .find(|(name, _)| name_matches(name, term, Some(ClassId::MESH), false))
        else {
            logger.log(format!("no exported mesh matches {term}, skipped"));
            continue;
        };
        let Some(target) = find_by_name(container, term, Some(ClassId::MESH), false) else {
            logger.log(format!("mesh {term} not found in the bundle, skipped"));
            continue;
        };

        let current = to_json(&target.tree);
        let mut json = json.clone();
        for pointer in PRESERVED_MESH_FIELDS {
            let kept = current
                .pointer(pointer)
                .ok_or_else(|| PatchError::MissingField(pointer.trim_start_matches('/').to_string()))?
                .clone();
            *json_slot(&mut json, pointer)? = kept;
        }

        let tree = from_json(&target.tree, &json)?;
        let name = target.name().unwrap_or_default().to_string();
        logger.log(format!("mesh {name} replaced from {source_name}"));
        batch.replace(target.path_id, tree);
        staged.push(name);
    }
    Ok(staged)
}

pub struct UpdateMeshesOperation {
    params: UpdateMeshesParams,
    logger: Logger,
}

impl UpdateMeshesOperation {
    pub fn new(params: UpdateMeshesParams, logger: Logger) -> Self {
        Self { params, logger }
    }
}

impl PatchOperation for UpdateMeshesOperation {
    fn name(&self) -> &'static str {
        "update-meshes-from-new-assets"
    }

    fn execute(&mut self) -> Result<(), PatchError> {
        let p = &self.params;
        let new_assets_path = join(&p.base_path, &p.new_assets_file_name);
        let bundle_path = join(&p.base_path, &p.bundle_file_name);
        let output_path = join(&p.base_path, &p.output_bundle_file_name);

        let exported = {
            let source = AssetWorkspace::open(&new_assets_path, false, &self.logger)?;
            export_meshes(source.primary(), &p.new_assets_name_search_term)
        };
        self.logger.log(format!(
            "exported {} meshes from {}",
            exported.len(),
            new_assets_path.display()
        ));

        let bundle = AssetWorkspace::open(&bundle_path, false, &self.logger)?.into_primary();
        let mut batch = ReplacementBatch::new();
        let staged = stage_mesh_updates(
            &bundle,
            &exported,
            &p.meshes_to_update,
            &mut batch,
            &self.logger,
        )?;

        write_patched(&bundle, &batch, &output_path)?;
        info!(
            operation = self.name(),
            meshes = staged.len(),
            output = %output_path.display()
        );
        Ok(())
    }
}
