#![allow(dead_code)]

use std::path::Path;

use bundlepatch::{
    AssetContainer, ClassId, FieldTree, FieldValue, PPtr, Record,
    models::SPRING_BONE_SCRIPT,
};
use glam::{Quat, Vec3};
use serde_json::{Value, json};

pub const SPRING_SCRIPT: i64 = 900;

pub fn named(name: &str) -> FieldValue {
    FieldValue::String(name.to_string())
}

pub fn texture(name: &str) -> FieldTree {
    FieldTree::from_pairs([
        ("m_Name", named(name)),
        ("m_Width", FieldValue::I32(0)),
        ("m_Height", FieldValue::I32(0)),
        ("m_CompleteImageSize", FieldValue::U32(0)),
        ("m_TextureFormat", FieldValue::I32(4)),
        ("m_MipCount", FieldValue::I32(1)),
        ("m_MipMap", FieldValue::Bool(false)),
        ("m_PlatformBlob", FieldValue::Bytes(Vec::new())),
        ("image data", FieldValue::Bytes(Vec::new())),
        (
            "m_StreamData",
            FieldValue::structure([
                ("offset", FieldValue::U32(128)),
                ("size", FieldValue::U32(64)),
                ("path", named("archive:/CAB-1/CAB-1.resS")),
            ]),
        ),
    ])
}

pub fn tex_env(property: &str, texture: PPtr) -> FieldValue {
    FieldValue::structure([
        ("first", named(property)),
        (
            "second",
            FieldValue::structure([
                ("m_Texture", texture.to_value()),
                (
                    "m_Scale",
                    FieldValue::structure([("x", FieldValue::F32(1.0)), ("y", FieldValue::F32(1.0))]),
                ),
            ]),
        ),
    ])
}

pub fn material(name: &str, envs: Vec<FieldValue>) -> FieldTree {
    let prototype = envs[0].default_like();
    FieldTree::from_pairs([
        ("m_Name", named(name)),
        ("m_Shader", FieldValue::pptr(1, 7001)),
        (
            "m_SavedProperties",
            FieldValue::structure([("m_TexEnvs", FieldValue::vector(prototype, envs))]),
        ),
    ])
}

pub fn mesh(name: &str, root_hash: u32, hashes: &[u32], vertices: i32) -> FieldTree {
    FieldTree::from_pairs([
        ("m_Name", named(name)),
        (
            "m_BoneNameHashes",
            FieldValue::vector(
                FieldValue::U32(0),
                hashes.iter().map(|h| FieldValue::U32(*h)).collect(),
            ),
        ),
        ("m_RootBoneNameHash", FieldValue::U32(root_hash)),
        ("m_VertexCount", FieldValue::I32(vertices)),
    ])
}

/// A character bundle: three textures plus a toon ramp, the dress material,
/// a skin mesh and the renderer drawing it.
pub fn character_bundle() -> AssetContainer {
    let mut c = AssetContainer::new(19);
    c.add_dependency("archive:/CAB-shared/sharedassets0.assets");
    let records = [
        Record::new(1, ClassId::TEXTURE_2D, texture("c051_Albedo")),
        Record::new(2, ClassId::TEXTURE_2D, texture("c051_Normal")),
        Record::new(3, ClassId::TEXTURE_2D, texture("c051_Multi")),
        Record::new(4, ClassId::TEXTURE_2D, texture("c051_ToonRamp")),
        Record::new(
            5,
            ClassId::MATERIAL,
            material(
                "MtDress",
                vec![
                    tex_env("_BaseMap", PPtr::local(1)),
                    tex_env("_ToonRamp", PPtr::local(4)),
                ],
            ),
        ),
        Record::new(6, ClassId::MESH, mesh("c051_Skin", 11, &[11, 12], 40)),
        Record::new(7, ClassId::MESH, mesh("ShadowMesh_Skin", 11, &[11], 40)),
        Record::new(
            8,
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
    for record in records {
        c.insert(record).expect("insert fixture record");
    }
    c
}

pub fn new_material_json(name: &str) -> Value {
    let slot = |property: &str| {
        json!({
            "first": property,
            "second": {
                "m_Texture": { "m_FileID": 0, "m_PathID": 0 },
                "m_Scale": { "x": 1.0, "y": 1.0 }
            }
        })
    };
    json!({
        "m_Name": name,
        "m_Shader": { "m_FileID": 0, "m_PathID": 0 },
        "m_SavedProperties": {
            "m_TexEnvs": {
                "Array": [slot("_BaseMap"), slot("_BumpMap"), slot("_MultiMap"), slot("_ToonRamp")]
            }
        }
    })
}

pub fn write_json(path: &Path, value: &Value) {
    std::fs::write(path, serde_json::to_vec_pretty(value).expect("encode json"))
        .expect("write json fixture");
}

fn spring_limits() -> FieldValue {
    FieldValue::structure([
        ("active", FieldValue::U8(0)),
        ("min", FieldValue::F32(0.0)),
        ("max", FieldValue::F32(0.0)),
    ])
}

pub fn spring_bone(radius: f32) -> FieldTree {
    FieldTree::from_pairs([
        ("m_Enabled", FieldValue::U8(1)),
        ("m_Script", FieldValue::pptr(0, SPRING_SCRIPT)),
        ("index", FieldValue::I32(0)),
        ("enabledJobSystem", FieldValue::U8(1)),
        ("stiffnessForce", FieldValue::F32(0.01)),
        ("dragForce", FieldValue::F32(0.4)),
        ("springForce", FieldValue::vec3(Vec3::ZERO)),
        ("windInfluence", FieldValue::F32(1.0)),
        ("angularStiffness", FieldValue::F32(100.0)),
        ("yAngleLimits", spring_limits()),
        ("zAngleLimits", spring_limits()),
        ("radius", FieldValue::F32(radius)),
    ])
}

/// Skeleton builder. Bone `i` owns GameObject `10 * i + 1`, Transform
/// `10 * i + 2` and, when it has one, a spring component at `10 * i + 3`.
pub struct Skeleton {
    pub container: AssetContainer,
}

impl Skeleton {
    pub fn new() -> Self {
        let mut container = AssetContainer::new(19);
        container
            .insert(Record::new(
                SPRING_SCRIPT,
                ClassId::MONO_SCRIPT,
                FieldTree::from_pairs([("m_Name", named(SPRING_BONE_SCRIPT))]),
            ))
            .expect("insert script");
        Self { container }
    }

    pub fn bone(mut self, i: i64, name: &str, x: f32, children: &[i64], spring: Option<f32>) -> Self {
        let mut components = vec![FieldValue::structure([(
            "component",
            FieldValue::pptr(0, 10 * i + 2),
        )])];
        if let Some(radius) = spring {
            components.push(FieldValue::structure([(
                "component",
                FieldValue::pptr(0, 10 * i + 3),
            )]));
            self.container
                .insert(Record::new(10 * i + 3, ClassId::MONO_BEHAVIOUR, spring_bone(radius)))
                .expect("insert spring");
        }

        self.container
            .insert(Record::new(
                10 * i + 1,
                ClassId::GAME_OBJECT,
                FieldTree::from_pairs([
                    (
                        "m_Component",
                        FieldValue::vector(
                            FieldValue::structure([("component", FieldValue::pptr(0, 0))]),
                            components,
                        ),
                    ),
                    ("m_Name", named(name)),
                ]),
            ))
            .expect("insert game object");

        let children = children
            .iter()
            .map(|&c| FieldValue::pptr(0, 10 * c + 2))
            .collect();
        self.container
            .insert(Record::new(
                10 * i + 2,
                ClassId::TRANSFORM,
                FieldTree::from_pairs([
                    ("m_GameObject", FieldValue::pptr(0, 10 * i + 1)),
                    ("m_LocalRotation", FieldValue::quat(Quat::IDENTITY)),
                    ("m_LocalPosition", FieldValue::vec3(Vec3::new(x, 0.0, 0.0))),
                    ("m_LocalScale", FieldValue::vec3(Vec3::ONE)),
                    ("m_Children", FieldValue::vector(FieldValue::pptr(0, 0), children)),
                ]),
            ))
            .expect("insert transform");
        self
    }
}
