pub mod assets;
pub mod error;
pub mod fields;
pub mod models;
pub mod ops;
pub mod parsing;
pub mod utils;

use std::path::Path;

pub use assets::{AssetWorkspace, PathIdAllocator, RecordRef, ReplacementBatch};
pub use error::{ContainerError, PatchError};
pub use fields::{FieldTree, FieldValue, PPtr};
pub use ops::{PatchOperation, run_operations};
pub use parsing::{OperationFile, OperationSpec, load_operation_file};
pub use utils::{AssetContainer, ClassId, Logger, Record};

////////////////////////////////////////////////
/// Runs an operations document from disk.
/// * Operations run in document order; the first failure stops the run.
/// * Output is verbose when either `verbose` or the document asks for it.
////////////////////////////////////////////////
pub fn run_operations_file(path: impl AsRef<Path>, verbose: bool) -> Result<(), PatchError> {
    let file = load_operation_file(path)?;
    let logger = Logger::stderr(verbose || file.verbose);
    run_operations(file, &logger)
}
