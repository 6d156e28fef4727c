mod common;

use std::path::Path;

use bundlepatch::{
    AssetContainer, ClassId, FieldTree, Logger, PPtr, PatchOperation, Record,
    fields::json::to_json,
    ops::{AddNewMaterialOperation, UpdateBonesOperation, toon_ramp_of},
    parsing::{AddNewMaterialParams, UpdateBonesParams},
    run_operations_file,
};
use common::*;
use image::{Rgba, RgbaImage};
use serde_json::json;
use tempfile::tempdir;

fn record_named<'a>(container: &'a AssetContainer, class_id: ClassId, name: &str) -> &'a Record {
    container
        .records_of(class_id)
        .find(|r| r.name() == Some(name))
        .unwrap_or_else(|| panic!("{name} missing from output"))
}

fn write_albedo_png(path: &Path) {
    let mut img = RgbaImage::new(4, 2);
    for x in 0..4 {
        img.put_pixel(x, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(x, 1, Rgba([0, 255, 0, 255]));
    }
    img.save(path).expect("write png");
}

fn material_params(dir: &Path, bundle: &str, output: &str) -> AddNewMaterialParams {
    serde_json::from_value(json!({
        "bundle_file_name": bundle,
        "new_material_file_name": "MtSkin_Material.json",
        "albedo_texture_json_file_name": "Albedo_Texture.json",
        "normal_texture_json_file_name": "Normal_Texture.json",
        "albedo_image_file_name": "albedo.png",
        "base_path": dir.to_string_lossy(),
        "output_bundle_file_name": output
    }))
    .expect("material params")
}

fn write_material_inputs(dir: &Path) {
    write_json(&dir.join("MtSkin_Material.json"), &new_material_json("MtSkinNew"));
    write_json(&dir.join("Albedo_Texture.json"), &to_json(&texture("c051_Albedo_New")));
    write_albedo_png(&dir.join("albedo.png"));
}

#[test]
fn add_new_material_links_textures_and_renderer() {
    let dir = tempdir().expect("create temp dir");
    let base = character_bundle();
    base.save(dir.path().join("base.bundle")).expect("save bundle");
    write_material_inputs(dir.path());

    let mut op = AddNewMaterialOperation::seeded(
        material_params(dir.path(), "base.bundle", "out.bundle"),
        Logger::disabled(),
        42,
    );
    op.execute().expect("add material");

    let out = AssetContainer::load(dir.path().join("out.bundle")).expect("load output");
    assert_eq!(out.len(), base.len() + 2);
    assert_eq!(out.dependencies(), base.dependencies());
    assert_eq!(out.target_platform(), base.target_platform());
    for record in base.records() {
        if record.path_id != 8 {
            assert_eq!(out.record(record.path_id), Some(record));
        }
    }

    let material = record_named(&out, ClassId::MATERIAL, "MtSkinNew");
    let tree = &material.tree;
    assert_eq!(tree.pptr("m_Shader").unwrap(), PPtr::new(1, 7001));
    assert_eq!(toon_ramp_of(tree).unwrap(), PPtr::local(4));
    assert_eq!(
        tree.pptr("m_SavedProperties/m_TexEnvs/Array/1/second/m_Texture").unwrap(),
        PPtr::local(2)
    );
    assert_eq!(
        tree.pptr("m_SavedProperties/m_TexEnvs/Array/2/second/m_Texture").unwrap(),
        PPtr::local(3)
    );

    let albedo_ptr = tree
        .pptr("m_SavedProperties/m_TexEnvs/Array/0/second/m_Texture")
        .unwrap();
    assert_eq!(albedo_ptr.file_id, 0);
    let albedo = out.record(albedo_ptr.path_id).expect("new albedo texture");
    assert_eq!(albedo.class_id, ClassId::TEXTURE_2D);
    assert_eq!(albedo.name(), Some("c051_Albedo_New"));
    assert_eq!(albedo.tree.i32("m_Width").unwrap(), 4);
    assert_eq!(albedo.tree.i32("m_Height").unwrap(), 2);
    let pixels = albedo.tree.bytes("image data").unwrap();
    assert_eq!(pixels.len(), 4 * 2 * 4);
    assert_eq!(&pixels[..4], &[0, 255, 0, 255]);
    assert_eq!(albedo.tree.u32("m_CompleteImageSize").unwrap(), 32);
    assert_eq!(albedo.tree.u32("m_StreamData/size").unwrap(), 0);
    assert_eq!(albedo.tree.str("m_StreamData/path").unwrap(), "");

    let renderer = &out.record(8).unwrap().tree;
    let slots = renderer.array("m_Materials").unwrap();
    assert_eq!(slots.items.len(), 2);
    assert_eq!(renderer.pptr("m_Materials/Array/0").unwrap(), PPtr::local(5));
    assert_eq!(
        renderer.pptr("m_Materials/Array/1").unwrap(),
        PPtr::local(material.path_id)
    );
}

#[test]
fn add_new_material_fails_without_source_material() {
    let dir = tempdir().expect("create temp dir");
    let mut base = character_bundle();
    base.replace_tree(
        5,
        material("MtCoat", vec![tex_env("_ToonRamp", PPtr::local(4))]),
    )
    .unwrap();
    base.save(dir.path().join("base.bundle")).unwrap();
    write_material_inputs(dir.path());

    let mut op = AddNewMaterialOperation::seeded(
        material_params(dir.path(), "base.bundle", "out.bundle"),
        Logger::disabled(),
        1,
    );
    assert!(op.execute().is_err());
    assert!(!dir.path().join("out.bundle").exists());
}

fn transform_x(container: &AssetContainer, bone: i64) -> f32 {
    container
        .record(10 * bone + 2)
        .unwrap()
        .tree
        .f32("m_LocalPosition/x")
        .unwrap()
}

#[test]
fn update_bones_copies_transforms_and_springs_by_name() {
    let dir = tempdir().expect("create temp dir");
    Skeleton::new()
        .bone(1, "Root", 1.0, &[2], None)
        .bone(2, "Hips", 2.0, &[3], None)
        .bone(3, "Tail", 3.0, &[], Some(0.5))
        .container
        .save(dir.path().join("sharedassets0.assets"))
        .unwrap();

    let bundle = Skeleton::new()
        .bone(1, "Root", 0.0, &[2, 4], None)
        .bone(2, "Hips", 0.0, &[3], None)
        .bone(3, "Tail", 0.0, &[], Some(0.1))
        .bone(4, "Extra", 9.0, &[], None)
        .container;
    bundle.save(dir.path().join("base.bundle")).unwrap();

    let params = UpdateBonesParams {
        bundle_file_name: "base.bundle".into(),
        new_assets_file_name: "sharedassets0.assets".into(),
        root_bone_name: "Root".into(),
        process_spring_components: true,
        base_path: dir.path().to_string_lossy().into_owned(),
        output_bundle_file_name: "out.bundle".into(),
    };
    UpdateBonesOperation::new(params, Logger::disabled())
        .execute()
        .expect("update bones");

    let out = AssetContainer::load(dir.path().join("out.bundle")).unwrap();
    assert_eq!(out.len(), bundle.len());
    assert_eq!(transform_x(&out, 1), 1.0);
    assert_eq!(transform_x(&out, 2), 2.0);
    assert_eq!(transform_x(&out, 3), 3.0);
    assert_eq!(transform_x(&out, 4), 9.0);
    assert_eq!(out.record(33).unwrap().tree.f32("radius").unwrap(), 0.5);
    assert_eq!(out.record(41), bundle.record(41));
}

#[test]
fn operations_document_chains_outputs() {
    let dir = tempdir().expect("create temp dir");
    character_bundle().save(dir.path().join("base.bundle")).unwrap();
    write_material_inputs(dir.path());

    let mut exported = AssetContainer::new(19);
    for record in [
        Record::new(1, ClassId::MESH, mesh("c051_Skin_FIXED", 5, &[5, 6, 7], 400)),
        Record::new(2, ClassId::MESH, mesh("c051_Hair", 5, &[5], 90)),
    ] {
        exported.insert(record).unwrap();
    }
    exported.save(dir.path().join("new.assets")).unwrap();

    let base_path = dir.path().to_string_lossy();
    let doc = format!(
        "verbose: false
operations:
  - operation: update-meshes-from-new-assets
    bundle_file_name: base.bundle
    new_assets_file_name: new.assets
    new_assets_name_search_term: _FIXED
    meshes_to_update: [\"_Skin\"]
    base_path: \"{base_path}\"
    output_bundle_file_name: stage1.bundle
  - operation: add-new-material
    bundle_file_name: stage1.bundle
    new_material_file_name: MtSkin_Material.json
    albedo_texture_json_file_name: Albedo_Texture.json
    albedo_image_file_name: albedo.png
    base_path: \"{base_path}\"
    output_bundle_file_name: final.bundle
"
    );
    let doc_path = dir.path().join("ops.yaml");
    std::fs::write(&doc_path, doc).unwrap();

    run_operations_file(&doc_path, false).expect("run document");

    let stage1 = AssetContainer::load(dir.path().join("stage1.bundle")).unwrap();
    let skin: &FieldTree = &stage1.record(6).unwrap().tree;
    assert_eq!(skin.name(), Some("c051_Skin"));
    assert_eq!(skin.i32("m_VertexCount").unwrap(), 400);
    assert_eq!(skin.u32("m_RootBoneNameHash").unwrap(), 11);
    assert_eq!(skin.array("m_BoneNameHashes").unwrap().items.len(), 2);
    assert_eq!(stage1.record(7), character_bundle().record(7));

    let last = AssetContainer::load(dir.path().join("final.bundle")).unwrap();
    assert_eq!(last.len(), stage1.len() + 2);
    assert_eq!(last.record(6), stage1.record(6));
    record_named(&last, ClassId::MATERIAL, "MtSkinNew");
}

#[test]
fn operations_document_stops_at_first_failure() {
    let dir = tempdir().expect("create temp dir");
    character_bundle().save(dir.path().join("base.bundle")).unwrap();
    write_material_inputs(dir.path());

    let doc = json!({
        "operations": [
            {
                "operation": "update-bones-from-new-assets",
                "bundle_file_name": "base.bundle",
                "new_assets_file_name": "missing.assets",
                "root_bone_name": "Root",
                "base_path": dir.path().to_string_lossy(),
                "output_bundle_file_name": "bones.bundle"
            },
            {
                "operation": "add-new-material",
                "bundle_file_name": "base.bundle",
                "new_material_file_name": "MtSkin_Material.json",
                "base_path": dir.path().to_string_lossy(),
                "output_bundle_file_name": "material.bundle"
            }
        ]
    });
    let doc_path = dir.path().join("ops.json");
    write_json(&doc_path, &doc);

    assert!(run_operations_file(&doc_path, false).is_err());
    assert!(!dir.path().join("bones.bundle").exists());
    assert!(!dir.path().join("material.bundle").exists());
}
