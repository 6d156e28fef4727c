pub mod bones;
pub mod material;
pub mod meshes;

pub use bones::*;
pub use material::*;
pub use meshes::*;

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::info;

use crate::{
    error::PatchError,
    parsing::{OperationFile, OperationSpec},
    utils::Logger,
};

/// One use case run against a bundle.
pub trait PatchOperation {
    /// The discriminator used in operations documents.
    fn name(&self) -> &'static str;
    fn execute(&mut self) -> Result<(), PatchError>;
}

pub fn build_operation(spec: OperationSpec, logger: &Logger) -> Box<dyn PatchOperation> {
    match spec {
        OperationSpec::UpdateMeshesFromNewAssets(params) => {
            Box::new(UpdateMeshesOperation::new(params, logger.clone()))
        }
        OperationSpec::AddNewMaterial(params) => {
            Box::new(AddNewMaterialOperation::new(params, logger.clone()))
        }
        OperationSpec::UpdateBonesFromNewAssets(params) => {
            Box::new(UpdateBonesOperation::new(params, logger.clone()))
        }
    }
}

/// Runs every operation of `file` in order, stopping at the first failure.
pub fn run_operations(file: OperationFile, logger: &Logger) -> Result<(), PatchError> {
    let total = file.operations.len();
    for (idx, spec) in file.operations.into_iter().enumerate() {
        let mut operation = build_operation(spec, logger);
        logger.log(format!("[{}/{total}] {}", idx + 1, operation.name()));
        operation
            .execute()
            .inspect_err(|err| logger.log(format!("{} failed: {err}", operation.name())))?;
        info!(operation = operation.name(), "operation complete");
    }
    Ok(())
}

pub(crate) fn join(base: &str, file: &str) -> PathBuf {
    Path::new(base).join(file)
}

pub(crate) fn read_json(path: &Path) -> Result<Value, PatchError> {
    let text = std::fs::read_to_string(path).map_err(|err| {
        PatchError::message(format!("unable to read {}: {err}", path.display()))
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// Mutable access to the JSON node at `pointer` (RFC 6901, `/a/b/0`).
pub(crate) fn json_slot<'a>(json: &'a mut Value, pointer: &str) -> Result<&'a mut Value, PatchError> {
    json.pointer_mut(pointer)
        .ok_or_else(|| PatchError::MissingField(pointer.trim_start_matches('/').to_string()))
}
