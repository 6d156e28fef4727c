use glam::Vec3;

use super::FieldModel;
use crate::{
    assets::{AssetWorkspace, RecordRef},
    error::PatchError,
    fields::{FieldTree, PPtr},
};

pub const SPRING_BONE_SCRIPT: &str = "SpringBone";
pub const SPRING_JOB_MANAGER_SCRIPT: &str = "SpringJobManager";

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AngleLimits {
    pub active: bool,
    pub min: f32,
    pub max: f32,
}

impl AngleLimits {
    fn read(tree: &FieldTree, path: &str) -> Result<Self, PatchError> {
        Ok(Self {
            active: tree.bool(&format!("{path}/active"))?,
            min: tree.f32(&format!("{path}/min"))?,
            max: tree.f32(&format!("{path}/max"))?,
        })
    }

    fn write(&self, tree: &mut FieldTree, path: &str) -> Result<(), PatchError> {
        tree.set_bool(&format!("{path}/active"), self.active)?;
        tree.set_f32(&format!("{path}/min"), self.min)?;
        tree.set_f32(&format!("{path}/max"), self.max)
    }
}

/// Per-bone spring physics parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpringBoneModel {
    pub enabled: bool,
    pub index: i32,
    pub enabled_job_system: bool,
    pub stiffness_force: f32,
    pub drag_force: f32,
    pub spring_force: Vec3,
    pub wind_influence: f32,
    pub angular_stiffness: f32,
    pub y_angle_limits: AngleLimits,
    pub z_angle_limits: AngleLimits,
    pub radius: f32,
}

impl FieldModel for SpringBoneModel {
    fn from_tree(tree: &FieldTree) -> Result<Self, PatchError> {
        Ok(Self {
            enabled: tree.bool("m_Enabled")?,
            index: tree.i32("index")?,
            enabled_job_system: tree.bool("enabledJobSystem")?,
            stiffness_force: tree.f32("stiffnessForce")?,
            drag_force: tree.f32("dragForce")?,
            spring_force: tree.vec3("springForce")?,
            wind_influence: tree.f32("windInfluence")?,
            angular_stiffness: tree.f32("angularStiffness")?,
            y_angle_limits: AngleLimits::read(tree, "yAngleLimits")?,
            z_angle_limits: AngleLimits::read(tree, "zAngleLimits")?,
            radius: tree.f32("radius")?,
        })
    }

    fn write_tree(&self, tree: &mut FieldTree) -> Result<(), PatchError> {
        tree.set_bool("m_Enabled", self.enabled)?;
        tree.set_integer("index", self.index as i64)?;
        tree.set_bool("enabledJobSystem", self.enabled_job_system)?;
        tree.set_f32("stiffnessForce", self.stiffness_force)?;
        tree.set_f32("dragForce", self.drag_force)?;
        tree.set_vec3("springForce", self.spring_force)?;
        tree.set_f32("windInfluence", self.wind_influence)?;
        tree.set_f32("angularStiffness", self.angular_stiffness)?;
        self.y_angle_limits.write(tree, "yAngleLimits")?;
        self.z_angle_limits.write(tree, "zAngleLimits")?;
        tree.set_f32("radius", self.radius)
    }
}

/// Simulation-wide settings held by the rig's manager component.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpringJobManagerModel {
    pub enabled: bool,
    pub optimize_transform: bool,
    pub is_paused: bool,
    pub simulation_frame_rate: i32,
    pub dynamic_ratio: f32,
    pub gravity: Vec3,
    pub bounce: f32,
    pub friction: f32,
    pub time: f32,
    pub enable_angle_limits: bool,
    pub enable_collision: bool,
    pub enable_length_limits: bool,
    pub collide_with_ground: bool,
    pub ground_height: f32,
    pub wind_disabled: bool,
    pub wind_influence: f32,
    pub wind_power: Vec3,
    pub wind_dir: Vec3,
    pub distance_rate: Vec3,
    pub automatic_reset: bool,
    pub reset_distance: f32,
    pub reset_angle: f32,
}

impl FieldModel for SpringJobManagerModel {
    fn from_tree(tree: &FieldTree) -> Result<Self, PatchError> {
        Ok(Self {
            enabled: tree.bool("m_Enabled")?,
            optimize_transform: tree.bool("optimizeTransform")?,
            is_paused: tree.bool("isPaused")?,
            simulation_frame_rate: tree.i32("simulationFrameRate")?,
            dynamic_ratio: tree.f32("dynamicRatio")?,
            gravity: tree.vec3("gravity")?,
            bounce: tree.f32("bounce")?,
            friction: tree.f32("friction")?,
            time: tree.f32("time")?,
            enable_angle_limits: tree.bool("enableAngleLimits")?,
            enable_collision: tree.bool("enableCollision")?,
            enable_length_limits: tree.bool("enableLengthLimits")?,
            collide_with_ground: tree.bool("collideWithGround")?,
            ground_height: tree.f32("groundHeight")?,
            wind_disabled: tree.bool("windDisabled")?,
            wind_influence: tree.f32("windInfluence")?,
            wind_power: tree.vec3("windPower")?,
            wind_dir: tree.vec3("windDir")?,
            distance_rate: tree.vec3("distanceRate")?,
            automatic_reset: tree.bool("automaticReset")?,
            reset_distance: tree.f32("resetDistance")?,
            reset_angle: tree.f32("resetAngle")?,
        })
    }

    fn write_tree(&self, tree: &mut FieldTree) -> Result<(), PatchError> {
        tree.set_bool("m_Enabled", self.enabled)?;
        tree.set_bool("optimizeTransform", self.optimize_transform)?;
        tree.set_bool("isPaused", self.is_paused)?;
        tree.set_integer("simulationFrameRate", self.simulation_frame_rate as i64)?;
        tree.set_f32("dynamicRatio", self.dynamic_ratio)?;
        tree.set_vec3("gravity", self.gravity)?;
        tree.set_f32("bounce", self.bounce)?;
        tree.set_f32("friction", self.friction)?;
        tree.set_f32("time", self.time)?;
        tree.set_bool("enableAngleLimits", self.enable_angle_limits)?;
        tree.set_bool("enableCollision", self.enable_collision)?;
        tree.set_bool("enableLengthLimits", self.enable_length_limits)?;
        tree.set_bool("collideWithGround", self.collide_with_ground)?;
        tree.set_f32("groundHeight", self.ground_height)?;
        tree.set_bool("windDisabled", self.wind_disabled)?;
        tree.set_f32("windInfluence", self.wind_influence)?;
        tree.set_vec3("windPower", self.wind_power)?;
        tree.set_vec3("windDir", self.wind_dir)?;
        tree.set_vec3("distanceRate", self.distance_rate)?;
        tree.set_bool("automaticReset", self.automatic_reset)?;
        tree.set_f32("resetDistance", self.reset_distance)?;
        tree.set_f32("resetAngle", self.reset_angle)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpringComponent {
    Bone(SpringBoneModel),
    JobManager(SpringJobManagerModel),
}

impl SpringComponent {
    pub fn kind(&self) -> &'static str {
        match self {
            SpringComponent::Bone(_) => SPRING_BONE_SCRIPT,
            SpringComponent::JobManager(_) => SPRING_JOB_MANAGER_SCRIPT,
        }
    }

    pub fn write_tree(&self, tree: &mut FieldTree) -> Result<(), PatchError> {
        match self {
            SpringComponent::Bone(model) => model.write_tree(tree),
            SpringComponent::JobManager(model) => model.write_tree(tree),
        }
    }
}

/// A spring component found on a GameObject, with the record it lives in.
#[derive(Debug, Clone, PartialEq)]
pub struct SpringAttachment {
    pub at: RecordRef,
    pub model: SpringComponent,
}

/// Reads the spring component in component slot 1 of `game_object`, if any.
///
/// Slot 0 is always the Transform, so a GameObject with a single component
/// has nothing to report. The slot-1 record is recognised by the name of the
/// script its `m_Script` pointer leads to; records without `m_Script`, or
/// with any other script, are not spring components.
pub fn detect_spring_component(
    workspace: &AssetWorkspace,
    game_object: RecordRef,
) -> Result<Option<SpringAttachment>, PatchError> {
    let tree = &workspace.record(game_object)?.tree;
    if tree.array("m_Component")?.items.len() < 2 {
        return Ok(None);
    }

    let at = workspace.resolve(
        game_object.container,
        tree.pptr("m_Component/Array/1/component")?,
    )?;
    let component = &workspace.record(at)?.tree;
    let Some(script_ptr) = component.find("m_Script").and_then(PPtr::from_value) else {
        return Ok(None);
    };
    if script_ptr.is_null() {
        return Ok(None);
    }

    let script = workspace.record(workspace.resolve(at.container, script_ptr)?)?;
    let model = match script.name() {
        Some(SPRING_BONE_SCRIPT) => SpringComponent::Bone(SpringBoneModel::from_tree(component)?),
        Some(SPRING_JOB_MANAGER_SCRIPT) => {
            SpringComponent::JobManager(SpringJobManagerModel::from_tree(component)?)
        }
        _ => return Ok(None),
    };

    Ok(Some(SpringAttachment { at, model }))
}
