//! Copies skeleton placement (and optionally spring physics) from freshly
//! exported assets onto an existing bundle, matching bones by name.
//!
//! The exported hierarchy is not guaranteed to have the same shape as the
//! bundle's, so the source tree is flattened to a name map and the target
//! graph is walked on its own terms.

use std::collections::{HashMap, hash_map::Entry};

use tracing::info;

use super::{PatchOperation, join};
use crate::{
    assets::{
        AssetWorkspace, ContainerId, RecordRef, ReplacementBatch, require_by_name, write_patched,
    },
    error::PatchError,
    fields::PPtr,
    models::{FieldModel, SpringComponent, TransformModel, detect_spring_component},
    parsing::UpdateBonesParams,
    utils::{ClassId, Logger},
};

#[derive(Debug, Clone, PartialEq)]
pub struct BoneSnapshot {
    pub name: String,
    pub transform: TransformModel,
    pub spring: Option<SpringComponent>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoneTree {
    pub bone: BoneSnapshot,
    pub children: Vec<BoneTree>,
}

pub type BoneMap = HashMap<String, BoneSnapshot>;

/// What a synchronization pass did, by bone name.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SyncReport {
    pub updated: Vec<String>,
    pub missing: Vec<String>,
    pub components_removed: Vec<String>,
    pub components_updated: Vec<String>,
    pub unsupported: Vec<String>,
}

/// The Transform in component slot 0 of `game_object`.
pub fn transform_of(
    workspace: &AssetWorkspace,
    game_object: RecordRef,
) -> Result<RecordRef, PatchError> {
    let record = workspace.record(game_object)?;
    if record.tree.array("m_Component")?.items.is_empty() {
        return Err(PatchError::Structural(format!(
            "GameObject {} has no components",
            record.name().unwrap_or_default()
        )));
    }

    let at = workspace.follow(game_object, "m_Component/Array/0/component")?;
    let class_id = workspace.record(at)?.class_id;
    if class_id != ClassId::TRANSFORM {
        return Err(PatchError::Structural(format!(
            "GameObject {} has a {class_id} in component slot 0",
            record.name().unwrap_or_default()
        )));
    }
    Ok(at)
}

pub fn game_object_of(
    workspace: &AssetWorkspace,
    transform: RecordRef,
) -> Result<RecordRef, PatchError> {
    workspace.follow(transform, "m_GameObject")
}

/// Transform of the first GameObject in the primary container whose name
/// contains `root_bone_name`.
pub fn find_root_transform(
    workspace: &AssetWorkspace,
    root_bone_name: &str,
) -> Result<RecordRef, PatchError> {
    let root = require_by_name(
        workspace.primary(),
        root_bone_name,
        Some(ClassId::GAME_OBJECT),
        false,
    )?;
    transform_of(workspace, RecordRef::primary(root.path_id))
}

fn children_of(workspace: &AssetWorkspace, transform: RecordRef) -> Result<Vec<RecordRef>, PatchError> {
    let tree = &workspace.record(transform)?.tree;
    tree.array("m_Children")?
        .items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let ptr = PPtr::from_value(item).ok_or_else(|| PatchError::FieldType {
                path: format!("m_Children/Array/{idx}"),
                expected: "pointer",
                found: item.kind(),
            })?;
            workspace.resolve(transform.container, ptr)
        })
        .collect()
}

/// Captures the hierarchy below (and including) `transform`.
pub fn capture_bone_tree(
    workspace: &AssetWorkspace,
    transform: RecordRef,
) -> Result<BoneTree, PatchError> {
    let game_object = game_object_of(workspace, transform)?;
    let name = workspace
        .record(game_object)?
        .tree
        .str("m_Name")?
        .to_string();

    let bone = BoneSnapshot {
        name,
        transform: TransformModel::from_tree(&workspace.record(transform)?.tree)?,
        spring: detect_spring_component(workspace, game_object)?.map(|found| found.model),
    };

    let children = children_of(workspace, transform)?
        .into_iter()
        .map(|child| capture_bone_tree(workspace, child))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BoneTree { bone, children })
}

/// Indexes every bone of `tree` by name. Bone names must be unique.
pub fn flatten_bone_tree(tree: BoneTree) -> Result<BoneMap, PatchError> {
    let mut map = BoneMap::new();
    let mut pending = vec![tree];
    while let Some(node) = pending.pop() {
        match map.entry(node.bone.name.clone()) {
            Entry::Occupied(_) => {
                return Err(PatchError::Structural(format!(
                    "bone name {} appears more than once",
                    node.bone.name
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(node.bone);
            }
        }
        pending.extend(node.children);
    }
    Ok(map)
}

/// Walks the target graph from `root` and stages every change needed to
/// match `bones`. Only records of the primary container are staged.
pub fn apply_bone_map(
    workspace: &AssetWorkspace,
    root: RecordRef,
    bones: &BoneMap,
    process_spring_components: bool,
    batch: &mut ReplacementBatch,
    logger: &Logger,
) -> Result<SyncReport, PatchError> {
    let mut sync = BoneSync {
        workspace,
        bones,
        process_spring_components,
        batch,
        logger,
        report: SyncReport::default(),
    };
    sync.visit(root)?;
    Ok(sync.report)
}

struct BoneSync<'a> {
    workspace: &'a AssetWorkspace,
    bones: &'a BoneMap,
    process_spring_components: bool,
    batch: &'a mut ReplacementBatch,
    logger: &'a Logger,
    report: SyncReport,
}

impl BoneSync<'_> {
    fn visit(&mut self, transform: RecordRef) -> Result<(), PatchError> {
        let workspace = self.workspace;
        let bones = self.bones;
        let game_object = game_object_of(workspace, transform)?;
        let name = workspace.record(game_object)?.tree.str("m_Name")?.to_string();

        match bones.get(&name) {
            None => {
                self.logger
                    .log(format!("bone {name} has no new data, leaving it as is"));
                self.report.missing.push(name);
            }
            Some(_) if transform.container != ContainerId::PRIMARY => {
                self.logger
                    .log(format!("bone {name} lives in a dependency, not rewritten"));
            }
            Some(snapshot) => {
                let mut tree = self
                    .batch
                    .current_tree(workspace.primary(), transform.path_id)?;
                snapshot.transform.write_tree(&mut tree)?;
                if self.process_spring_components {
                    self.reconcile_spring(&name, game_object, snapshot)?;
                }
                self.batch.replace(transform.path_id, tree);
                self.report.updated.push(name);
            }
        }

        for child in children_of(workspace, transform)? {
            self.visit(child)?;
        }
        Ok(())
    }

    fn reconcile_spring(
        &mut self,
        name: &str,
        game_object: RecordRef,
        snapshot: &BoneSnapshot,
    ) -> Result<(), PatchError> {
        let workspace = self.workspace;
        // A slot-1 component that is not a spring script reads as None and is never touched.
        let current = detect_spring_component(workspace, game_object)?;
        let primary = workspace.primary();

        match (current, &snapshot.spring) {
            (None, None) => {}
            (Some(_), None) => {
                if game_object.container != ContainerId::PRIMARY {
                    self.logger.log(format!(
                        "bone {name}: GameObject lives in a dependency, spring component not removed"
                    ));
                    return Ok(());
                }
                let mut tree = self.batch.current_tree(primary, game_object.path_id)?;
                tree.array_mut("m_Component")?.items.remove(1);
                self.batch.replace(game_object.path_id, tree);
                self.report.components_removed.push(name.to_string());
            }
            (None, Some(wanted)) => {
                self.logger.log(format!(
                    "bone {name}: adding a {} component is not supported, skipped",
                    wanted.kind()
                ));
                self.report.unsupported.push(name.to_string());
            }
            (Some(existing), Some(wanted)) => {
                if existing.model.kind() != wanted.kind() {
                    self.logger.log(format!(
                        "bone {name}: cannot turn a {} into a {}, skipped",
                        existing.model.kind(),
                        wanted.kind()
                    ));
                    self.report.unsupported.push(name.to_string());
                    return Ok(());
                }
                if existing.at.container != ContainerId::PRIMARY {
                    self.logger.log(format!(
                        "bone {name}: {} component lives in a dependency, not rewritten",
                        existing.model.kind()
                    ));
                    return Ok(());
                }
                let mut tree = self.batch.current_tree(primary, existing.at.path_id)?;
                wanted.write_tree(&mut tree)?;
                self.batch.replace(existing.at.path_id, tree);
                self.report.components_updated.push(name.to_string());
            }
        }
        Ok(())
    }
}

pub struct UpdateBonesOperation {
    params: UpdateBonesParams,
    logger: Logger,
}

impl UpdateBonesOperation {
    pub fn new(params: UpdateBonesParams, logger: Logger) -> Self {
        Self { params, logger }
    }
}

impl PatchOperation for UpdateBonesOperation {
    fn name(&self) -> &'static str {
        "update-bones-from-new-assets"
    }

    fn execute(&mut self) -> Result<(), PatchError> {
        let p = &self.params;
        let new_assets_path = join(&p.base_path, &p.new_assets_file_name);
        let bundle_path = join(&p.base_path, &p.bundle_file_name);
        let output_path = join(&p.base_path, &p.output_bundle_file_name);

        let source = AssetWorkspace::open(&new_assets_path, true, &self.logger)?;
        let source_root = find_root_transform(&source, &p.root_bone_name)?;
        let bones = flatten_bone_tree(capture_bone_tree(&source, source_root)?)?;
        self.logger.log(format!(
            "captured {} bones from {}",
            bones.len(),
            new_assets_path.display()
        ));

        let target = AssetWorkspace::open(&bundle_path, true, &self.logger)?;
        let target_root = find_root_transform(&target, &p.root_bone_name)?;
        let mut batch = ReplacementBatch::new();
        let report = apply_bone_map(
            &target,
            target_root,
            &bones,
            p.process_spring_components,
            &mut batch,
            &self.logger,
        )?;

        write_patched(target.primary(), &batch, &output_path)?;
        info!(
            operation = self.name(),
            updated = report.updated.len(),
            missing = report.missing.len(),
            output = %output_path.display()
        );
        Ok(())
    }
}
