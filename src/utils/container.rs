use bytemuck::{Pod, Zeroable};
use memmap2::{Mmap, MmapMut};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fmt,
    fs::{File, OpenOptions},
    io::{Seek, SeekFrom},
    path::{Path, PathBuf},
};

use crate::{error::ContainerError, fields::FieldTree};

const MAGIC: [u8; 4] = *b"BPC0";
const VERSION: u16 = 1;

/// Serialized class id of a record (the engine's numbering).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassId(pub i32);

impl ClassId {
    pub const GAME_OBJECT: ClassId = ClassId(1);
    pub const TRANSFORM: ClassId = ClassId(4);
    pub const MATERIAL: ClassId = ClassId(21);
    pub const TEXTURE_2D: ClassId = ClassId(28);
    pub const MESH: ClassId = ClassId(43);
    pub const SHADER: ClassId = ClassId(48);
    pub const MONO_BEHAVIOUR: ClassId = ClassId(114);
    pub const MONO_SCRIPT: ClassId = ClassId(115);
    pub const SKINNED_MESH_RENDERER: ClassId = ClassId(137);

    pub fn name(&self) -> Option<&'static str> {
        Some(match *self {
            ClassId::GAME_OBJECT => "GameObject",
            ClassId::TRANSFORM => "Transform",
            ClassId::MATERIAL => "Material",
            ClassId::TEXTURE_2D => "Texture2D",
            ClassId::MESH => "Mesh",
            ClassId::SHADER => "Shader",
            ClassId::MONO_BEHAVIOUR => "MonoBehaviour",
            ClassId::MONO_SCRIPT => "MonoScript",
            ClassId::SKINNED_MESH_RENDERER => "SkinnedMeshRenderer",
            _ => return None,
        })
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "Class{}", self.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub path_id: i64,
    pub class_id: ClassId,
    pub tree: FieldTree,
}

impl Record {
    pub fn new(path_id: i64, class_id: ClassId, tree: FieldTree) -> Self {
        Self {
            path_id,
            class_id,
            tree,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.tree.name()
    }
}

//////////////////////////////////////////////////////////////////////////////
//////////////////////////////////////////////////////////////////////////////

#[repr(C)]
#[derive(Clone, Copy, Zeroable, Pod)]
struct Header {
    magic: [u8; 4],       // "BPC0"
    version: u16,         // 1
    reserved: u16,        // alignment / future flags
    entry_count: u32,     // number of records
    target_platform: u32, // build target tag, carried through untouched
    manifest_len: u32,    // bincode manifest following the entry table
    reserved2: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Zeroable, Pod)]
struct Entry {
    class_id: i32,
    flags: u32,
    path_id: i64,
    offset: u64, // relative to the start of the data region
    len: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Manifest {
    dependencies: Vec<String>,
}

#[inline]
fn header_size() -> usize {
    std::mem::size_of::<Header>()
}

#[inline]
fn entry_size() -> usize {
    std::mem::size_of::<Entry>()
}

struct EntryIter<'a> {
    bytes: &'a [u8],
    idx: usize,
}

impl<'a> EntryIter<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, idx: 0 }
    }
}

impl<'a> Iterator for EntryIter<'a> {
    type Item = Entry;
    fn next(&mut self) -> Option<Self::Item> {
        let sz = entry_size();
        if self.idx + sz > self.bytes.len() {
            return None;
        }
        let e = bytemuck::pod_read_unaligned::<Entry>(&self.bytes[self.idx..self.idx + sz]);
        self.idx += sz;
        Some(e)
    }
}

/// An open asset container: typed records addressed by path id, plus the
/// ordered list of sibling files that cross-file pointers index into.
#[derive(Debug, Clone, Default)]
pub struct AssetContainer {
    path: Option<PathBuf>,
    target_platform: u32,
    dependencies: Vec<String>,
    records: Vec<Record>,
    index: HashMap<i64, usize>,
}

impl AssetContainer {
    pub fn new(target_platform: u32) -> Self {
        Self {
            target_platform,
            ..Default::default()
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn target_platform(&self) -> u32 {
        self.target_platform
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Declares a sibling file and returns the file-origin tag pointers use for it.
    pub fn add_dependency(&mut self, name: impl Into<String>) -> i32 {
        self.dependencies.push(name.into());
        self.dependencies.len() as i32
    }

    pub fn insert(&mut self, record: Record) -> Result<(), ContainerError> {
        if self.index.contains_key(&record.path_id) {
            return Err(ContainerError::DuplicatePathId(record.path_id));
        }
        self.index.insert(record.path_id, self.records.len());
        self.records.push(record);
        Ok(())
    }

    pub fn replace_tree(&mut self, path_id: i64, tree: FieldTree) -> Result<(), ContainerError> {
        let idx = *self
            .index
            .get(&path_id)
            .ok_or(ContainerError::MissingRecord(path_id))?;
        self.records[idx].tree = tree;
        Ok(())
    }

    pub fn contains(&self, path_id: i64) -> bool {
        self.index.contains_key(&path_id)
    }

    pub fn record(&self, path_id: i64) -> Option<&Record> {
        self.index.get(&path_id).map(|&idx| &self.records[idx])
    }

    /// Records in container order.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn records_of(&self, class_id: ClassId) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(move |r| r.class_id == class_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ContainerError> {
        let manifest = bincode::serialize(&Manifest {
            dependencies: self.dependencies.clone(),
        })?;

        let mut entries = Vec::with_capacity(self.records.len());
        let mut data = Vec::new();
        for record in &self.records {
            let bytes = bincode::serialize(&record.tree)?;
            entries.push(Entry {
                class_id: record.class_id.0,
                flags: 0,
                path_id: record.path_id,
                offset: data.len() as u64,
                len: bytes.len() as u64,
            });
            data.extend_from_slice(&bytes);
        }

        let hdr = Header {
            magic: MAGIC,
            version: VERSION,
            reserved: 0,
            entry_count: entries.len() as u32,
            target_platform: self.target_platform,
            manifest_len: manifest.len() as u32,
            reserved2: 0,
        };

        let mut out = Vec::with_capacity(
            header_size() + entries.len() * entry_size() + manifest.len() + data.len(),
        );
        out.extend_from_slice(bytemuck::bytes_of(&hdr));
        out.extend_from_slice(bytemuck::cast_slice::<Entry, u8>(&entries));
        out.extend_from_slice(&manifest);
        out.extend_from_slice(&data);
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ContainerError> {
        // Sanity checks
        let header_sz = header_size();
        if bytes.len() < header_sz {
            return Err(ContainerError::TooSmall);
        }
        let hdr = bytemuck::pod_read_unaligned::<Header>(&bytes[..header_sz]);
        if hdr.magic != MAGIC || hdr.version != VERSION {
            return Err(ContainerError::BadHeader);
        }

        let entries_end = (hdr.entry_count as usize)
            .checked_mul(entry_size())
            .and_then(|len| len.checked_add(header_sz))
            .ok_or(ContainerError::TooSmall)?;
        let data_start = entries_end
            .checked_add(hdr.manifest_len as usize)
            .ok_or(ContainerError::TooSmall)?;
        if bytes.len() < data_start {
            return Err(ContainerError::TooSmall);
        }

        let manifest: Manifest = bincode::deserialize(&bytes[entries_end..data_start])?;
        let data = &bytes[data_start..];

        let mut container = AssetContainer {
            target_platform: hdr.target_platform,
            dependencies: manifest.dependencies,
            ..Default::default()
        };

        for entry in EntryIter::new(&bytes[header_sz..entries_end]) {
            // Offsets come straight from the file.
            let start = usize::try_from(entry.offset).map_err(|_| ContainerError::TooSmall)?;
            let len = usize::try_from(entry.len).map_err(|_| ContainerError::TooSmall)?;
            let end = start.checked_add(len).ok_or(ContainerError::TooSmall)?;
            if end > data.len() {
                return Err(ContainerError::TooSmall);
            }
            let tree: FieldTree = bincode::deserialize(&data[start..end])?;
            container.insert(Record::new(entry.path_id, ClassId(entry.class_id), tree))?;
        }

        Ok(container)
    }

    /// Save using MmapMut, writing header, entries, manifest and record blobs in one pass.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ContainerError> {
        let bytes = self.to_bytes()?;

        let mut f = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        f.set_len(bytes.len() as u64)?; // extend file to final size
        f.seek(SeekFrom::Start(0))?;

        // Map for writing
        let mut map = unsafe { MmapMut::map_mut(&f)? };
        map[..bytes.len()].copy_from_slice(&bytes);

        // Flush to disk
        map.flush()?;

        Ok(())
    }

    /// Load by mmap, then decode the header, entry table and records from the mapped bytes.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ContainerError> {
        let path = path.as_ref();
        let f = File::open(path)?;
        let map = unsafe { Mmap::map(&f)? };

        let mut container = Self::from_bytes(&map)?;
        container.path = Some(path.to_path_buf());
        Ok(container)
    }
}
