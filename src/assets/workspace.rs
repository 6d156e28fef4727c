use std::path::Path;

use tracing::info;

use crate::{
    error::PatchError,
    fields::PPtr,
    utils::{AssetContainer, Logger, Record},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(usize);

impl ContainerId {
    pub const PRIMARY: ContainerId = ContainerId(0);
}

/// A record addressed by the container that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordRef {
    pub container: ContainerId,
    pub path_id: i64,
}

impl RecordRef {
    pub fn primary(path_id: i64) -> Self {
        Self {
            container: ContainerId::PRIMARY,
            path_id,
        }
    }
}

/// The primary container being patched plus whichever of its dependencies
/// were loaded. Pointers are resolved relative to the container they were
/// read from.
pub struct AssetWorkspace {
    containers: Vec<(String, AssetContainer)>,
}

impl AssetWorkspace {
    pub fn new(primary: AssetContainer) -> Self {
        let name = primary
            .path()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            containers: vec![(name, primary)],
        }
    }

    /// Loads a container and, when asked, every dependency found next to it.
    /// Dependencies that are not on disk stay unresolved; pointers into them
    /// fail when followed.
    pub fn open(
        path: impl AsRef<Path>,
        load_dependencies: bool,
        logger: &Logger,
    ) -> Result<Self, PatchError> {
        let path = path.as_ref();
        logger.log(format!("loading container {}", path.display()));
        let mut workspace = Self::new(AssetContainer::load(path)?);
        if !load_dependencies {
            return Ok(workspace);
        }

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut cursor = 0;
        while cursor < workspace.containers.len() {
            let pending: Vec<String> = workspace.containers[cursor].1.dependencies().to_vec();
            for dependency in pending {
                let file_name = dependency_file_name(&dependency);
                if workspace.find(file_name).is_some() {
                    continue;
                }
                let candidate = base_dir.join(file_name);
                if candidate.exists() {
                    info!(resource = "dependency", entry = %candidate.display(), source = "disk");
                    workspace.attach(file_name, AssetContainer::load(&candidate)?);
                } else {
                    logger.log(format!(
                        "dependency {dependency} not found next to {}",
                        path.display()
                    ));
                }
            }
            cursor += 1;
        }

        Ok(workspace)
    }

    /// Makes `container` resolvable as the dependency called `name`.
    pub fn attach(&mut self, name: &str, container: AssetContainer) -> ContainerId {
        self.containers.push((name.to_string(), container));
        ContainerId(self.containers.len() - 1)
    }

    fn find(&self, file_name: &str) -> Option<ContainerId> {
        self.containers
            .iter()
            .position(|(name, _)| name == file_name)
            .map(ContainerId)
    }

    pub fn primary(&self) -> &AssetContainer {
        &self.containers[0].1
    }

    pub fn into_primary(mut self) -> AssetContainer {
        self.containers.swap_remove(0).1
    }

    pub fn container(&self, id: ContainerId) -> &AssetContainer {
        &self.containers[id.0].1
    }

    pub fn record(&self, at: RecordRef) -> Result<&Record, PatchError> {
        self.container(at.container)
            .record(at.path_id)
            .ok_or_else(|| {
                PatchError::Unresolved(format!(
                    "path id {} is not in {}",
                    at.path_id,
                    self.containers[at.container.0].0
                ))
            })
    }

    /// Follows `ptr` as read from a record of `origin`.
    pub fn resolve(&self, origin: ContainerId, ptr: PPtr) -> Result<RecordRef, PatchError> {
        if ptr.is_null() {
            return Err(PatchError::Unresolved("null pointer".to_string()));
        }

        let container = if ptr.file_id == 0 {
            origin
        } else {
            let dependencies = self.container(origin).dependencies();
            let name = usize::try_from(ptr.file_id - 1)
                .ok()
                .and_then(|idx| dependencies.get(idx))
                .ok_or_else(|| {
                    PatchError::Unresolved(format!("file id {} is not declared", ptr.file_id))
                })?;
            self.find(dependency_file_name(name)).ok_or_else(|| {
                PatchError::Unresolved(format!("dependency {name} is not loaded"))
            })?
        };

        let at = RecordRef {
            container,
            path_id: ptr.path_id,
        };
        self.record(at)?;
        Ok(at)
    }

    /// Reads the pointer at `field` of the record `at` and follows it.
    pub fn follow(&self, at: RecordRef, field: &str) -> Result<RecordRef, PatchError> {
        let ptr = self.record(at)?.tree.pptr(field)?;
        self.resolve(at.container, ptr)
    }
}

/// Dependency names may carry an archive prefix (`archive:/CAB-x/CAB-x`).
fn dependency_file_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}
