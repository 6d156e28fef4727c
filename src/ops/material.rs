//! Adds a material (and up to three textures backing it) to a bundle and
//! hooks it up to a mesh's renderer.
//!
//! Linking runs in two passes. The first imports records from JSON and wires
//! pointers; the second bakes image pixels into the textures it created. The
//! container is reopened from its serialized bytes between the passes.

use std::path::PathBuf;

use serde_json::Value;
use tracing::info;

use super::{PatchOperation, json_slot, read_json};
use crate::{
    assets::{
        AssetWorkspace, PathIdAllocator, ReplacementBatch, require_by_name, texture::bake_texture,
        write_patched,
    },
    error::PatchError,
    fields::{FieldTree, FieldValue, PPtr, json::from_json},
    parsing::{AddNewMaterialParams, resolve_file},
    utils::{AssetContainer, ClassId, Logger},
};

pub const TOON_RAMP_PROPERTY: &str = "_ToonRamp";

/// A material texture property and the name of the existing texture that
/// backs it in the game's own materials.
#[derive(Debug, Clone, Copy)]
pub struct TextureSlot {
    pub property: &'static str,
    pub existing: &'static str,
}

pub const TEXTURE_SLOTS: [TextureSlot; 3] = [
    TextureSlot {
        property: "_BaseMap",
        existing: "_Albedo",
    },
    TextureSlot {
        property: "_BumpMap",
        existing: "_Normal",
    },
    TextureSlot {
        property: "_MultiMap",
        existing: "_Multi",
    },
];

#[derive(Debug, Clone, Default)]
pub struct TextureRequest {
    /// Description of a new texture record. Without one the slot keeps
    /// pointing at the existing texture.
    pub json: Option<Value>,
    pub image: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct MaterialRequest {
    pub material: Value,
    /// In `TEXTURE_SLOTS` order.
    pub textures: [TextureRequest; 3],
    pub source_material_name: String,
    pub target_mesh_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkedTexture {
    pub property: &'static str,
    pub path_id: i64,
    /// False when the slot reuses an existing texture.
    pub created: bool,
    pub image: Option<PathBuf>,
}

/// Result of the structural pass.
#[derive(Debug, Clone)]
pub struct MaterialLink {
    pub container: AssetContainer,
    pub material_path_id: i64,
    pub renderer_path_id: i64,
    pub textures: Vec<LinkedTexture>,
}

fn tex_env_texture(item: &FieldValue) -> Option<PPtr> {
    PPtr::from_value(item.child("second")?.child("m_Texture")?)
}

/// The toon ramp pointer of `material`.
pub fn toon_ramp_of(material: &FieldTree) -> Result<PPtr, PatchError> {
    material
        .array("m_SavedProperties/m_TexEnvs")?
        .items
        .iter()
        .find(|item| item.child("first").and_then(FieldValue::as_str) == Some(TOON_RAMP_PROPERTY))
        .and_then(tex_env_texture)
        .ok_or_else(|| {
            PatchError::LookupFailure(format!(
                "material {} has no {TOON_RAMP_PROPERTY} texture",
                material.name().unwrap_or_default()
            ))
        })
}

/// Points the material JSON's shader, texture slots and toon ramp at records
/// already resolved in the target container.
fn patch_material_json(
    material: &mut Value,
    shader: PPtr,
    toon_ramp: PPtr,
    textures: &[LinkedTexture],
) -> Result<(), PatchError> {
    *json_slot(material, "/m_Shader/m_FileID")? = Value::from(shader.file_id);
    *json_slot(material, "/m_Shader/m_PathID")? = Value::from(shader.path_id);

    let entries = json_slot(material, "/m_SavedProperties/m_TexEnvs/Array")?
        .as_array_mut()
        .ok_or_else(|| PatchError::FieldType {
            path: "m_SavedProperties/m_TexEnvs/Array".to_string(),
            expected: "array",
            found: "non-array",
        })?;

    for entry in entries {
        let Some(property) = entry.get("first").and_then(Value::as_str) else {
            continue;
        };
        let target = if property == TOON_RAMP_PROPERTY {
            toon_ramp
        } else if let Some(linked) = textures.iter().find(|t| t.property == property) {
            PPtr::local(linked.path_id)
        } else {
            continue;
        };
        *json_slot(entry, "/second/m_Texture/m_FileID")? = Value::from(target.file_id);
        *json_slot(entry, "/second/m_Texture/m_PathID")? = Value::from(target.path_id);
    }
    Ok(())
}

/// Structural pass: imports the textures and the material, appends the
/// material to the renderer of the target mesh, and returns the committed
/// container reopened from its bytes.
pub fn link_material<R: rand::RngCore>(
    container: &AssetContainer,
    request: &MaterialRequest,
    allocator: &mut PathIdAllocator<R>,
    logger: &Logger,
) -> Result<MaterialLink, PatchError> {
    let mut batch = ReplacementBatch::new();

    let mut textures = Vec::with_capacity(TEXTURE_SLOTS.len());
    for (slot, wanted) in TEXTURE_SLOTS.iter().zip(&request.textures) {
        let existing = require_by_name(container, slot.existing, Some(ClassId::TEXTURE_2D), false)?;
        let linked = match &wanted.json {
            Some(json) => {
                let tree = from_json(&existing.tree, json)?;
                let path_id = allocator.allocate(container);
                batch.add(path_id, ClassId::TEXTURE_2D, tree);
                logger.log(format!("{}: new texture {path_id}", slot.property));
                LinkedTexture {
                    property: slot.property,
                    path_id,
                    created: true,
                    image: wanted.image.clone(),
                }
            }
            None => {
                logger.log(format!(
                    "{}: reusing {}",
                    slot.property,
                    existing.name().unwrap_or_default()
                ));
                LinkedTexture {
                    property: slot.property,
                    path_id: existing.path_id,
                    created: false,
                    image: None,
                }
            }
        };
        textures.push(linked);
    }

    let source = require_by_name(
        container,
        &request.source_material_name,
        Some(ClassId::MATERIAL),
        false,
    )?;
    let shader = source.tree.pptr("m_Shader")?;
    let toon_ramp = toon_ramp_of(&source.tree)?;

    let mut material_json = request.material.clone();
    patch_material_json(&mut material_json, shader, toon_ramp, &textures)?;
    let material_tree = from_json(&source.tree, &material_json)?;
    let material_path_id = allocator.allocate(container);
    batch.add(material_path_id, ClassId::MATERIAL, material_tree);

    let mesh = require_by_name(
        container,
        &request.target_mesh_name,
        Some(ClassId::MESH),
        false,
    )?;
    let renderer = container
        .records_of(ClassId::SKINNED_MESH_RENDERER)
        .find(|r| r.tree.i64("m_Mesh/m_PathID").ok() == Some(mesh.path_id))
        .ok_or_else(|| {
            PatchError::LookupFailure(format!(
                "no SkinnedMeshRenderer draws mesh {}",
                mesh.name().unwrap_or_default()
            ))
        })?;

    let mut renderer_tree = renderer.tree.clone();
    let materials = renderer_tree.array_mut("m_Materials")?;
    let mut slot = materials
        .items
        .first()
        .map(FieldValue::default_like)
        .unwrap_or_else(|| (*materials.element).clone());
    match slot.child_mut("m_PathID") {
        Some(FieldValue::I64(path_id)) => *path_id = material_path_id,
        _ => {
            return Err(PatchError::Structural(
                "renderer material slots are not pointers".to_string(),
            ));
        }
    }
    materials.items.push(slot);
    batch.replace(renderer.path_id, renderer_tree);

    let committed = batch.commit(container)?;
    let reopened = AssetContainer::from_bytes(&committed.to_bytes()?)?;

    Ok(MaterialLink {
        container: reopened,
        material_path_id,
        renderer_path_id: renderer.path_id,
        textures,
    })
}

/// Pixel pass: bakes the requested images into the textures created by
/// [`link_material`].
pub fn stage_texture_pixels(
    link: &MaterialLink,
    logger: &Logger,
) -> Result<ReplacementBatch, PatchError> {
    let mut batch = ReplacementBatch::new();
    for texture in link.textures.iter().filter(|t| t.created) {
        let Some(image_path) = &texture.image else {
            logger.warn(format!(
                "{} texture {} has no image; it is left without pixel data",
                texture.property, texture.path_id
            ));
            continue;
        };

        let image = image::open(image_path)?;
        let mut tree = batch.current_tree(&link.container, texture.path_id)?;
        let baked = bake_texture(&mut tree, &image, logger)?;
        logger.log(format!(
            "{}: baked {}x{} ({} mips) from {}",
            texture.property,
            baked.width,
            baked.height,
            baked.mip_count,
            image_path.display()
        ));
        batch.replace(texture.path_id, tree);
    }
    Ok(batch)
}

pub struct AddNewMaterialOperation {
    params: AddNewMaterialParams,
    logger: Logger,
    allocator: PathIdAllocator,
}

impl AddNewMaterialOperation {
    pub fn new(params: AddNewMaterialParams, logger: Logger) -> Self {
        Self {
            params,
            logger,
            allocator: PathIdAllocator::new(),
        }
    }

    /// Same as `new` but with reproducible path ids.
    pub fn seeded(params: AddNewMaterialParams, logger: Logger, seed: u64) -> Self {
        Self {
            params,
            logger,
            allocator: PathIdAllocator::seeded(seed),
        }
    }

    fn texture_json(&self, file: &str) -> Result<Option<Value>, PatchError> {
        let Some(path) = resolve_file(&self.params.base_path, file) else {
            return Ok(None);
        };
        if !path.exists() {
            self.logger.warn(format!(
                "texture description {} not found, keeping the existing texture",
                path.display()
            ));
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    fn request(&self) -> Result<MaterialRequest, PatchError> {
        let p = &self.params;
        let material_path = resolve_file(&p.base_path, &p.new_material_file_name)
            .ok_or_else(|| PatchError::message("new_material_file_name is empty"))?;

        let texture = |json: &str, image: &str| -> Result<TextureRequest, PatchError> {
            Ok(TextureRequest {
                json: self.texture_json(json)?,
                image: resolve_file(&p.base_path, image),
            })
        };

        Ok(MaterialRequest {
            material: read_json(&material_path)?,
            textures: [
                texture(&p.albedo_texture_json_file_name, &p.albedo_image_file_name)?,
                texture(&p.normal_texture_json_file_name, &p.normal_image_file_name)?,
                texture(&p.multi_texture_json_file_name, &p.multi_image_file_name)?,
            ],
            source_material_name: p.source_material_name.clone(),
            target_mesh_name: p.target_mesh_name.clone(),
        })
    }
}

impl PatchOperation for AddNewMaterialOperation {
    fn name(&self) -> &'static str {
        "add-new-material"
    }

    fn execute(&mut self) -> Result<(), PatchError> {
        let request = self.request()?;
        let bundle_path = super::join(&self.params.base_path, &self.params.bundle_file_name);
        let output_path =
            super::join(&self.params.base_path, &self.params.output_bundle_file_name);

        let container = AssetWorkspace::open(&bundle_path, false, &self.logger)?.into_primary();
        let link = link_material(&container, &request, &mut self.allocator, &self.logger)?;
        self.logger.log(format!(
            "material {} linked to renderer {}",
            link.material_path_id, link.renderer_path_id
        ));

        let pixels = stage_texture_pixels(&link, &self.logger)?;
        write_patched(&link.container, &pixels, &output_path)?;
        info!(
            operation = self.name(),
            material = link.material_path_id,
            output = %output_path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fields::json::to_json, utils::Record};
    use serde_json::json;

    fn tex_env(name: &str, texture: PPtr) -> FieldValue {
        FieldValue::structure([
            ("first", FieldValue::String(name.to_string())),
            (
                "second",
                FieldValue::structure([
                    ("m_Texture", texture.to_value()),
                    (
                        "m_Scale",
                        FieldValue::structure([
                            ("x", FieldValue::F32(1.0)),
                            ("y", FieldValue::F32(1.0)),
                        ]),
                    ),
                ]),
            ),
        ])
    }

    fn material(name: &str, envs: Vec<FieldValue>) -> FieldTree {
        let prototype = envs[0].clone();
        FieldTree::from_pairs([
            ("m_Name", FieldValue::String(name.to_string())),
            ("m_Shader", FieldValue::pptr(1, 7001)),
            (
                "m_SavedProperties",
                FieldValue::structure([("m_TexEnvs", FieldValue::vector(prototype, envs))]),
            ),
        ])
    }

    fn texture(name: &str) -> FieldTree {
        FieldTree::from_pairs([
            ("m_Name", FieldValue::String(name.to_string())),
            ("m_Width", FieldValue::I32(4)),
        ])
    }

    fn bundle() -> AssetContainer {
        let mut c = AssetContainer::new(0);
        c.add_dependency("shared.assets");
        let records = [
            Record::new(1, ClassId::TEXTURE_2D, texture("c051_Albedo")),
            Record::new(2, ClassId::TEXTURE_2D, texture("c051_Normal")),
            Record::new(3, ClassId::TEXTURE_2D, texture("c051_Multi")),
            Record::new(4, ClassId::TEXTURE_2D, texture("ToonRamp")),
            Record::new(
                5,
                ClassId::MATERIAL,
                material(
                    "MtDress",
                    vec![
                        tex_env("_BaseMap", PPtr::local(1)),
                        tex_env(TOON_RAMP_PROPERTY, PPtr::local(4)),
                    ],
                ),
            ),
            Record::new(
                6,
                ClassId::MESH,
                FieldTree::from_pairs([("m_Name", FieldValue::String("c051_Skin".into()))]),
            ),
            Record::new(
                7,
                ClassId::SKINNED_MESH_RENDERER,
                FieldTree::from_pairs([
                    ("m_Mesh", FieldValue::pptr(0, 6)),
                    (
                        "m_Materials",
                        FieldValue::vector(FieldValue::pptr(0, 0), vec![FieldValue::pptr(0, 5)]),
                    ),
                ]),
            ),
        ];
        for r in records {
            c.insert(r).unwrap();
        }
        c
    }

    fn new_material_json() -> Value {
        json!({
            "m_Name": "MtSkinNew",
            "m_Shader": { "m_FileID": 0, "m_PathID": 0 },
            "m_SavedProperties": { "m_TexEnvs": { "Array": [
                { "first": "_BaseMap", "second": { "m_Texture": { "m_FileID": 0, "m_PathID": 0 }, "m_Scale": { "x": 1.0, "y": 1.0 } } },
                { "first": "_BumpMap", "second": { "m_Texture": { "m_FileID": 0, "m_PathID": 0 }, "m_Scale": { "x": 1.0, "y": 1.0 } } },
                { "first": "_MultiMap", "second": { "m_Texture": { "m_FileID": 0, "m_PathID": 0 }, "m_Scale": { "x": 1.0, "y": 1.0 } } },
                { "first": "_ToonRamp", "second": { "m_Texture": { "m_FileID": 0, "m_PathID": 0 }, "m_Scale": { "x": 1.0, "y": 1.0 } } }
            ] } }
        })
    }

    fn request(albedo: Option<Value>) -> MaterialRequest {
        MaterialRequest {
            material: new_material_json(),
            textures: [
                TextureRequest {
                    json: albedo,
                    image: None,
                },
                TextureRequest::default(),
                TextureRequest::default(),
            ],
            source_material_name: "MtDress".into(),
            target_mesh_name: "_Skin".into(),
        }
    }

    #[test]
    fn links_material_with_shared_pointers() {
        let base = bundle();
        let albedo = to_json(&texture("c051_Albedo_New"));
        let mut ids = PathIdAllocator::seeded(7);
        let link = link_material(&base, &request(Some(albedo)), &mut ids, &Logger::disabled()).unwrap();

        assert_eq!(link.container.len(), base.len() + 2);
        let new = &link.container.record(link.material_path_id).unwrap().tree;
        assert_eq!(new.pptr("m_Shader").unwrap(), PPtr::new(1, 7001));
        assert_eq!(toon_ramp_of(new).unwrap(), PPtr::local(4));

        let base_map = new.pptr("m_SavedProperties/m_TexEnvs/Array/0/second/m_Texture").unwrap();
        assert!(link.textures[0].created);
        assert_eq!(base_map.path_id, link.textures[0].path_id);
        assert!(!base.contains(base_map.path_id));
        assert_eq!(
            new.pptr("m_SavedProperties/m_TexEnvs/Array/1/second/m_Texture").unwrap(),
            PPtr::local(2)
        );

        let renderer = &link.container.record(7).unwrap().tree;
        assert_eq!(
            renderer.pptr("m_Materials/Array/1").unwrap(),
            PPtr::local(link.material_path_id)
        );
    }

    #[test]
    fn missing_toon_ramp_is_a_lookup_failure() {
        let mut base = bundle();
        base.replace_tree(5, material("MtDress", vec![tex_env("_BaseMap", PPtr::local(1))]))
            .unwrap();
        let mut ids = PathIdAllocator::seeded(7);
        assert!(matches!(
            link_material(&base, &request(None), &mut ids, &Logger::disabled()),
            Err(PatchError::LookupFailure(_))
        ));
    }

    #[test]
    fn mesh_without_renderer_is_a_lookup_failure() {
        let mut req = request(None);
        req.target_mesh_name = "_Dress".into();
        let mut base = bundle();
        base.insert(Record::new(
            8,
            ClassId::MESH,
            FieldTree::from_pairs([("m_Name", FieldValue::String("c051_Dress".into()))]),
        ))
        .unwrap();
        let mut ids = PathIdAllocator::seeded(7);
        assert!(matches!(
            link_material(&base, &req, &mut ids, &Logger::disabled()),
            Err(PatchError::LookupFailure(msg)) if msg.contains("c051_Dress")
        ));
    }

    #[test]
    fn textures_without_images_only_warn() {
        let sink = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let logger = Logger::with_sink(false, sink.clone());
        let mut ids = PathIdAllocator::seeded(3);
        let albedo = to_json(&texture("c051_Albedo_New"));
        let link = link_material(&bundle(), &request(Some(albedo)), &mut ids, &logger).unwrap();

        let batch = stage_texture_pixels(&link, &logger).unwrap();
        assert!(batch.is_empty());
        let lines = sink.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("warning: _BaseMap"));
    }
}
