use glam::{Quat, Vec3};

use super::FieldModel;
use crate::{error::PatchError, fields::FieldTree};

/// Local placement of a scene-graph node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformModel {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for TransformModel {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl FieldModel for TransformModel {
    fn from_tree(tree: &FieldTree) -> Result<Self, PatchError> {
        Ok(Self {
            position: tree.vec3("m_LocalPosition")?,
            rotation: tree.quat("m_LocalRotation")?,
            scale: tree.vec3("m_LocalScale")?,
        })
    }

    fn write_tree(&self, tree: &mut FieldTree) -> Result<(), PatchError> {
        tree.set_vec3("m_LocalPosition", self.position)?;
        tree.set_quat("m_LocalRotation", self.rotation)?;
        tree.set_vec3("m_LocalScale", self.scale)
    }
}
