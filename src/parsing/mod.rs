use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PatchError;

fn default_output_bundle_file_name() -> String {
    "output.bundle".to_string()
}

fn default_source_material_name() -> String {
    "MtDress".to_string()
}

fn default_target_mesh_name() -> String {
    "_Skin".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMeshesParams {
    pub bundle_file_name: String,
    pub new_assets_file_name: String,
    pub new_assets_name_search_term: String,
    pub meshes_to_update: Vec<String>,
    #[serde(default)]
    pub base_path: String,
    #[serde(default = "default_output_bundle_file_name")]
    pub output_bundle_file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddNewMaterialParams {
    pub bundle_file_name: String,
    pub new_material_file_name: String,
    #[serde(default)]
    pub albedo_texture_json_file_name: String,
    #[serde(default)]
    pub normal_texture_json_file_name: String,
    #[serde(default)]
    pub multi_texture_json_file_name: String,
    /// Pixels baked into the new albedo texture.
    #[serde(default)]
    pub albedo_image_file_name: String,
    #[serde(default)]
    pub normal_image_file_name: String,
    #[serde(default)]
    pub multi_image_file_name: String,
    #[serde(default = "default_source_material_name")]
    pub source_material_name: String,
    #[serde(default = "default_target_mesh_name")]
    pub target_mesh_name: String,
    #[serde(default)]
    pub base_path: String,
    #[serde(default = "default_output_bundle_file_name")]
    pub output_bundle_file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBonesParams {
    pub bundle_file_name: String,
    pub new_assets_file_name: String,
    pub root_bone_name: String,
    #[serde(default)]
    pub process_spring_components: bool,
    #[serde(default)]
    pub base_path: String,
    #[serde(default = "default_output_bundle_file_name")]
    pub output_bundle_file_name: String,
}

/// One entry of an operations document, tagged by its `operation` string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
pub enum OperationSpec {
    UpdateMeshesFromNewAssets(UpdateMeshesParams),
    AddNewMaterial(AddNewMaterialParams),
    UpdateBonesFromNewAssets(UpdateBonesParams),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationFile {
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub operations: Vec<OperationSpec>,
}

/// Joins `file` onto `base`. An empty name stays empty so callers can tell
/// an optional file was never given.
pub fn resolve_file(base: &str, file: &str) -> Option<PathBuf> {
    if file.is_empty() {
        None
    } else {
        Some(Path::new(base).join(file))
    }
}

/// Reads an operations document. `.yaml`/`.yml` files are parsed as YAML,
/// anything else as JSON.
pub fn load_operation_file(path: impl AsRef<Path>) -> Result<OperationFile, PatchError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    if is_yaml {
        Ok(serde_yaml::from_str(&text)?)
    } else {
        Ok(serde_json::from_str(&text)?)
    }
}
