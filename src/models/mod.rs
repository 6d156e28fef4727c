pub mod spring;
pub mod transform;

pub use spring::*;
pub use transform::*;

use crate::{error::PatchError, fields::FieldTree};

/// A plain snapshot of the fields a record class is patched through.
///
/// `from_tree` fails on any missing or mistyped field; trees are expected to
/// already carry the class's full layout. `write_tree` touches only the
/// fields the model declares.
pub trait FieldModel: Sized {
    fn from_tree(tree: &FieldTree) -> Result<Self, PatchError>;
    fn write_tree(&self, tree: &mut FieldTree) -> Result<(), PatchError>;
}
