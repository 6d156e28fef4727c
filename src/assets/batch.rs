use std::{collections::HashMap, path::Path};

use tracing::info;

use crate::{
    error::PatchError,
    fields::FieldTree,
    utils::{AssetContainer, ClassId, Record},
};

#[derive(Debug, Clone)]
pub enum Staged {
    /// Swap the tree of an existing record.
    Replace { path_id: i64, tree: FieldTree },
    /// A record that is not in the container yet.
    Add(Record),
}

impl Staged {
    pub fn path_id(&self) -> i64 {
        match self {
            Staged::Replace { path_id, .. } => *path_id,
            Staged::Add(record) => record.path_id,
        }
    }

    pub fn tree(&self) -> &FieldTree {
        match self {
            Staged::Replace { tree, .. } => tree,
            Staged::Add(record) => &record.tree,
        }
    }
}

/// Record mutations gathered during one pass and applied together.
///
/// Staging the same path id twice keeps the entry's original position and
/// overwrites its contents, so callers can restage a record after editing it
/// again.
#[derive(Debug, Default)]
pub struct ReplacementBatch {
    entries: Vec<Staged>,
    positions: HashMap<i64, usize>,
}

impl ReplacementBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, path_id: i64, tree: FieldTree) {
        self.stage(Staged::Replace { path_id, tree });
    }

    pub fn add(&mut self, path_id: i64, class_id: ClassId, tree: FieldTree) {
        self.stage(Staged::Add(Record::new(path_id, class_id, tree)));
    }

    fn stage(&mut self, entry: Staged) {
        let path_id = entry.path_id();
        match self.positions.get(&path_id) {
            Some(&idx) => {
                // An added record stays an addition when edited again.
                let merged = match (&self.entries[idx], entry) {
                    (Staged::Add(old), Staged::Replace { tree, .. }) => {
                        Staged::Add(Record::new(path_id, old.class_id, tree))
                    }
                    (_, entry) => entry,
                };
                self.entries[idx] = merged;
            }
            None => {
                self.positions.insert(path_id, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn is_staged(&self, path_id: i64) -> bool {
        self.positions.contains_key(&path_id)
    }

    pub fn staged_tree(&self, path_id: i64) -> Option<&FieldTree> {
        self.positions
            .get(&path_id)
            .map(|&idx| self.entries[idx].tree())
    }

    /// The staged tree if there is one, otherwise a copy of the container's.
    pub fn current_tree(
        &self,
        container: &AssetContainer,
        path_id: i64,
    ) -> Result<FieldTree, PatchError> {
        if let Some(tree) = self.staged_tree(path_id) {
            return Ok(tree.clone());
        }
        container
            .record(path_id)
            .map(|record| record.tree.clone())
            .ok_or_else(|| PatchError::Unresolved(format!("path id {path_id} is not in the container")))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Staged> {
        self.entries.iter()
    }

    /// Applies every staged entry to a copy of `container`.
    ///
    /// Every pointer in a staged tree must land somewhere: local pointers on
    /// a record present after the commit, external ones on a declared
    /// dependency.
    pub fn commit(&self, container: &AssetContainer) -> Result<AssetContainer, PatchError> {
        let mut out = container.clone();
        for entry in &self.entries {
            match entry {
                Staged::Replace { path_id, tree } => out.replace_tree(*path_id, tree.clone())?,
                Staged::Add(record) => out.insert(record.clone())?,
            }
        }

        let dependency_count = out.dependencies().len() as i64;
        for entry in &self.entries {
            for (field, ptr) in entry.tree().pointers() {
                if ptr.is_null() {
                    continue;
                }
                let lands = match ptr.file_id {
                    0 => out.contains(ptr.path_id),
                    n => n > 0 && (n as i64) <= dependency_count,
                };
                if !lands {
                    return Err(PatchError::DanglingPointer {
                        record: entry.path_id(),
                        field,
                        target: ptr.path_id,
                    });
                }
            }
        }

        Ok(out)
    }
}

/// Commits `batch` onto `container` and saves the result to `path`.
pub fn write_patched(
    container: &AssetContainer,
    batch: &ReplacementBatch,
    path: impl AsRef<Path>,
) -> Result<AssetContainer, PatchError> {
    let path = path.as_ref();
    let patched = batch.commit(container)?;
    patched.save(path)?;
    info!(output = %path.display(), staged = batch.len(), "container written");
    Ok(patched)
}
