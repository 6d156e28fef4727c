pub mod json;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::PatchError;

/// A node in a record's typed field tree.
///
/// The kinds mirror the primitive set found in serialized asset type trees.
/// Arrays carry a default-valued element prototype so new elements can be
/// synthesized even when the array is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Bool(bool),
    U8(u8),
    I32(i32),
    U32(u32),
    I64(i64),
    F32(f32),
    String(String),
    Bytes(Vec<u8>),
    Array(ArrayValue),
    Struct(Vec<Field>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    pub element: Box<FieldValue>,
    pub items: Vec<FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
}

impl Field {
    pub fn new(name: impl Into<String>, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl FieldValue {
    pub fn structure<'a>(fields: impl IntoIterator<Item = (&'a str, FieldValue)>) -> Self {
        FieldValue::Struct(
            fields
                .into_iter()
                .map(|(name, value)| Field::new(name, value))
                .collect(),
        )
    }

    /// A serialized `vector<T>`: a struct holding a single `Array` child.
    pub fn vector(element: FieldValue, items: Vec<FieldValue>) -> Self {
        FieldValue::structure([(
            "Array",
            FieldValue::Array(ArrayValue {
                element: Box::new(element.default_like()),
                items,
            }),
        )])
    }

    pub fn pptr(file_id: i32, path_id: i64) -> Self {
        PPtr::new(file_id, path_id).to_value()
    }

    pub fn vec3(v: Vec3) -> Self {
        FieldValue::structure([
            ("x", FieldValue::F32(v.x)),
            ("y", FieldValue::F32(v.y)),
            ("z", FieldValue::F32(v.z)),
        ])
    }

    pub fn quat(q: Quat) -> Self {
        let [x, y, z, w] = q.to_array();
        FieldValue::structure([
            ("x", FieldValue::F32(x)),
            ("y", FieldValue::F32(y)),
            ("z", FieldValue::F32(z)),
            ("w", FieldValue::F32(w)),
        ])
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Bool(_) => "bool",
            FieldValue::U8(_) => "u8",
            FieldValue::I32(_) => "i32",
            FieldValue::U32(_) => "u32",
            FieldValue::I64(_) => "i64",
            FieldValue::F32(_) => "f32",
            FieldValue::String(_) => "string",
            FieldValue::Bytes(_) => "bytes",
            FieldValue::Array(_) => "array",
            FieldValue::Struct(_) => "struct",
        }
    }

    /// Returns a zeroed copy with the same shape. Arrays come back empty.
    pub fn default_like(&self) -> FieldValue {
        match self {
            FieldValue::Bool(_) => FieldValue::Bool(false),
            FieldValue::U8(_) => FieldValue::U8(0),
            FieldValue::I32(_) => FieldValue::I32(0),
            FieldValue::U32(_) => FieldValue::U32(0),
            FieldValue::I64(_) => FieldValue::I64(0),
            FieldValue::F32(_) => FieldValue::F32(0.0),
            FieldValue::String(_) => FieldValue::String(String::new()),
            FieldValue::Bytes(_) => FieldValue::Bytes(Vec::new()),
            FieldValue::Array(array) => FieldValue::Array(ArrayValue {
                element: array.element.clone(),
                items: Vec::new(),
            }),
            FieldValue::Struct(fields) => FieldValue::Struct(
                fields
                    .iter()
                    .map(|f| Field::new(f.name.clone(), f.value.default_like()))
                    .collect(),
            ),
        }
    }

    pub fn child(&self, segment: &str) -> Option<&FieldValue> {
        match self {
            FieldValue::Struct(fields) => fields
                .iter()
                .find(|f| f.name == segment)
                .map(|f| &f.value),
            FieldValue::Array(array) => segment
                .parse::<usize>()
                .ok()
                .and_then(|idx| array.items.get(idx)),
            _ => None,
        }
    }

    pub fn child_mut(&mut self, segment: &str) -> Option<&mut FieldValue> {
        match self {
            FieldValue::Struct(fields) => fields
                .iter_mut()
                .find(|f| f.name == segment)
                .map(|f| &mut f.value),
            FieldValue::Array(array) => segment
                .parse::<usize>()
                .ok()
                .and_then(move |idx| array.items.get_mut(idx)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(v) => Some(*v),
            FieldValue::U8(v) => Some(*v != 0),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::U8(v) => Some(*v as i64),
            FieldValue::I32(v) => Some(*v as i64),
            FieldValue::U32(v) => Some(*v as i64),
            FieldValue::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            FieldValue::F32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            FieldValue::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut ArrayValue> {
        match self {
            FieldValue::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Byte payloads are stored either as a raw blob or as an array of `U8`.
    pub fn as_byte_vec(&self) -> Option<Vec<u8>> {
        match self {
            FieldValue::Bytes(v) => Some(v.clone()),
            FieldValue::Array(array) => array
                .items
                .iter()
                .map(|item| match item {
                    FieldValue::U8(b) => Some(*b),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }
}

/// A cross-record reference: `(file-origin tag, path id)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PPtr {
    pub file_id: i32,
    pub path_id: i64,
}

impl PPtr {
    pub const NULL: PPtr = PPtr {
        file_id: 0,
        path_id: 0,
    };

    pub fn new(file_id: i32, path_id: i64) -> Self {
        Self { file_id, path_id }
    }

    pub fn local(path_id: i64) -> Self {
        Self::new(0, path_id)
    }

    pub fn is_null(&self) -> bool {
        self.path_id == 0
    }

    pub fn from_value(value: &FieldValue) -> Option<PPtr> {
        let file_id = value.child("m_FileID")?.as_i64()?;
        let path_id = value.child("m_PathID")?.as_i64()?;
        Some(PPtr::new(file_id as i32, path_id))
    }

    pub fn to_value(&self) -> FieldValue {
        FieldValue::structure([
            ("m_FileID", FieldValue::I32(self.file_id)),
            ("m_PathID", FieldValue::I64(self.path_id)),
        ])
    }
}

/// The root of a record's field tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldTree {
    root: FieldValue,
}

impl Default for FieldTree {
    fn default() -> Self {
        Self {
            root: FieldValue::Struct(Vec::new()),
        }
    }
}

impl FieldTree {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            root: FieldValue::Struct(fields),
        }
    }

    pub fn from_pairs<'a>(fields: impl IntoIterator<Item = (&'a str, FieldValue)>) -> Self {
        Self {
            root: FieldValue::structure(fields),
        }
    }

    pub fn root(&self) -> &FieldValue {
        &self.root
    }

    pub fn fields(&self) -> &[Field] {
        match &self.root {
            FieldValue::Struct(fields) => fields,
            _ => &[],
        }
    }

    pub fn find(&self, path: &str) -> Option<&FieldValue> {
        path.split('/')
            .try_fold(&self.root, |node, segment| node.child(segment))
    }

    pub fn find_mut(&mut self, path: &str) -> Option<&mut FieldValue> {
        path.split('/')
            .try_fold(&mut self.root, |node, segment| node.child_mut(segment))
    }

    pub fn get(&self, path: &str) -> Result<&FieldValue, PatchError> {
        self.find(path)
            .ok_or_else(|| PatchError::MissingField(path.to_string()))
    }

    pub fn get_mut(&mut self, path: &str) -> Result<&mut FieldValue, PatchError> {
        self.find_mut(path)
            .ok_or_else(|| PatchError::MissingField(path.to_string()))
    }

    /// The record's `m_Name`, if it has one.
    pub fn name(&self) -> Option<&str> {
        self.find("m_Name").and_then(FieldValue::as_str)
    }

    pub fn bool(&self, path: &str) -> Result<bool, PatchError> {
        let value = self.get(path)?;
        value.as_bool().ok_or_else(|| mismatch(path, "bool", value))
    }

    pub fn i32(&self, path: &str) -> Result<i32, PatchError> {
        let value = self.get(path)?;
        value
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| mismatch(path, "i32", value))
    }

    pub fn u32(&self, path: &str) -> Result<u32, PatchError> {
        let value = self.get(path)?;
        value
            .as_i64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| mismatch(path, "u32", value))
    }

    pub fn i64(&self, path: &str) -> Result<i64, PatchError> {
        let value = self.get(path)?;
        value.as_i64().ok_or_else(|| mismatch(path, "integer", value))
    }

    pub fn f32(&self, path: &str) -> Result<f32, PatchError> {
        let value = self.get(path)?;
        value.as_f32().ok_or_else(|| mismatch(path, "f32", value))
    }

    pub fn str(&self, path: &str) -> Result<&str, PatchError> {
        let value = self.get(path)?;
        value.as_str().ok_or_else(|| mismatch(path, "string", value))
    }

    pub fn bytes(&self, path: &str) -> Result<Vec<u8>, PatchError> {
        let value = self.get(path)?;
        value
            .as_byte_vec()
            .ok_or_else(|| mismatch(path, "bytes", value))
    }

    pub fn pptr(&self, path: &str) -> Result<PPtr, PatchError> {
        let value = self.get(path)?;
        PPtr::from_value(value).ok_or_else(|| mismatch(path, "pointer", value))
    }

    pub fn vec3(&self, path: &str) -> Result<Vec3, PatchError> {
        Ok(Vec3::new(
            self.f32(&format!("{path}/x"))?,
            self.f32(&format!("{path}/y"))?,
            self.f32(&format!("{path}/z"))?,
        ))
    }

    pub fn quat(&self, path: &str) -> Result<Quat, PatchError> {
        Ok(Quat::from_xyzw(
            self.f32(&format!("{path}/x"))?,
            self.f32(&format!("{path}/y"))?,
            self.f32(&format!("{path}/z"))?,
            self.f32(&format!("{path}/w"))?,
        ))
    }

    /// Items of the array at `path`. A serialized vector's `Array` child is
    /// followed automatically.
    pub fn array(&self, path: &str) -> Result<&ArrayValue, PatchError> {
        let value = self.get(path)?;
        let value = match value {
            FieldValue::Struct(_) => value.child("Array").unwrap_or(value),
            _ => value,
        };
        value.as_array().ok_or_else(|| mismatch(path, "array", value))
    }

    pub fn array_mut(&mut self, path: &str) -> Result<&mut ArrayValue, PatchError> {
        let path = match self.get(path)? {
            FieldValue::Struct(_) => format!("{path}/Array"),
            _ => path.to_string(),
        };
        let value = self.get_mut(&path)?;
        let found = value.kind();
        match value {
            FieldValue::Array(array) => Ok(array),
            _ => Err(PatchError::FieldType {
                path,
                expected: "array",
                found,
            }),
        }
    }

    pub fn set_bool(&mut self, path: &str, v: bool) -> Result<(), PatchError> {
        let slot = self.get_mut(path)?;
        match slot {
            FieldValue::Bool(b) => *b = v,
            FieldValue::U8(b) => *b = v as u8,
            other => return Err(mismatch(path, "bool", other)),
        }
        Ok(())
    }

    /// Writes an integer into whichever integer width the field already has.
    pub fn set_integer(&mut self, path: &str, v: i64) -> Result<(), PatchError> {
        let slot = self.get_mut(path)?;
        let fits = match slot {
            FieldValue::U8(b) => u8::try_from(v).map(|v| *b = v).is_ok(),
            FieldValue::I32(b) => i32::try_from(v).map(|v| *b = v).is_ok(),
            FieldValue::U32(b) => u32::try_from(v).map(|v| *b = v).is_ok(),
            FieldValue::I64(b) => {
                *b = v;
                true
            }
            other => return Err(mismatch(path, "integer", other)),
        };
        if fits {
            Ok(())
        } else {
            Err(PatchError::message(format!(
                "value {v} does not fit field '{path}'"
            )))
        }
    }

    pub fn set_f32(&mut self, path: &str, v: f32) -> Result<(), PatchError> {
        match self.get_mut(path)? {
            FieldValue::F32(slot) => {
                *slot = v;
                Ok(())
            }
            other => Err(mismatch(path, "f32", other)),
        }
    }

    pub fn set_string(&mut self, path: &str, v: impl Into<String>) -> Result<(), PatchError> {
        match self.get_mut(path)? {
            FieldValue::String(slot) => {
                *slot = v.into();
                Ok(())
            }
            other => Err(mismatch(path, "string", other)),
        }
    }

    pub fn set_bytes(&mut self, path: &str, v: Vec<u8>) -> Result<(), PatchError> {
        match self.get_mut(path)? {
            FieldValue::Bytes(slot) => {
                *slot = v;
                Ok(())
            }
            FieldValue::Array(array) if matches!(*array.element, FieldValue::U8(_)) => {
                array.items = v.into_iter().map(FieldValue::U8).collect();
                Ok(())
            }
            other => Err(mismatch(path, "bytes", other)),
        }
    }

    pub fn set_pptr(&mut self, path: &str, ptr: PPtr) -> Result<(), PatchError> {
        self.set_integer(&format!("{path}/m_FileID"), ptr.file_id as i64)?;
        self.set_integer(&format!("{path}/m_PathID"), ptr.path_id)
    }

    pub fn set_vec3(&mut self, path: &str, v: Vec3) -> Result<(), PatchError> {
        self.set_f32(&format!("{path}/x"), v.x)?;
        self.set_f32(&format!("{path}/y"), v.y)?;
        self.set_f32(&format!("{path}/z"), v.z)
    }

    pub fn set_quat(&mut self, path: &str, q: Quat) -> Result<(), PatchError> {
        let [x, y, z, w] = q.to_array();
        self.set_f32(&format!("{path}/x"), x)?;
        self.set_f32(&format!("{path}/y"), y)?;
        self.set_f32(&format!("{path}/z"), z)?;
        self.set_f32(&format!("{path}/w"), w)
    }

    /// Every pointer in the tree, keyed by its field path.
    pub fn pointers(&self) -> Vec<(String, PPtr)> {
        let mut out = Vec::new();
        collect_pointers(&self.root, String::new(), &mut out);
        out
    }
}

fn collect_pointers(value: &FieldValue, path: String, out: &mut Vec<(String, PPtr)>) {
    if let Some(ptr) = PPtr::from_value(value) {
        out.push((path, ptr));
        return;
    }

    let join = |segment: &str| {
        if path.is_empty() {
            segment.to_string()
        } else {
            format!("{path}/{segment}")
        }
    };

    match value {
        FieldValue::Struct(fields) => {
            for field in fields {
                collect_pointers(&field.value, join(&field.name), out);
            }
        }
        FieldValue::Array(array) => {
            for (idx, item) in array.items.iter().enumerate() {
                collect_pointers(item, join(&idx.to_string()), out);
            }
        }
        _ => {}
    }
}

fn mismatch(path: &str, expected: &'static str, found: &FieldValue) -> PatchError {
    PatchError::FieldType {
        path: path.to_string(),
        expected,
        found: found.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game_object() -> FieldTree {
        FieldTree::from_pairs([
            (
                "m_Component",
                FieldValue::vector(
                    FieldValue::structure([("component", FieldValue::pptr(0, 0))]),
                    vec![
                        FieldValue::structure([("component", FieldValue::pptr(0, 72))]),
                        FieldValue::structure([("component", FieldValue::pptr(1, 90))]),
                    ],
                ),
            ),
            ("m_Layer", FieldValue::I32(0)),
            ("m_Name", FieldValue::String("uHair_h051h".into())),
            ("m_IsActive", FieldValue::U8(1)),
        ])
    }

    #[test]
    fn resolves_nested_paths_and_indices() {
        let tree = game_object();
        assert_eq!(tree.name(), Some("uHair_h051h"));
        assert_eq!(
            tree.pptr("m_Component/Array/1/component").unwrap(),
            PPtr::new(1, 90)
        );
        assert_eq!(tree.array("m_Component").unwrap().items.len(), 2);
        assert!(tree.bool("m_IsActive").unwrap());
        assert!(matches!(
            tree.get("m_Component/Array/2/component"),
            Err(PatchError::MissingField(_))
        ));
    }

    #[test]
    fn setters_keep_the_stored_kind() {
        let mut tree = game_object();
        tree.set_bool("m_IsActive", false).unwrap();
        assert_eq!(tree.find("m_IsActive"), Some(&FieldValue::U8(0)));

        tree.set_integer("m_Layer", 5).unwrap();
        assert_eq!(tree.i32("m_Layer").unwrap(), 5);
        assert!(tree.set_integer("m_Layer", i64::MAX).is_err());

        assert!(matches!(
            tree.set_f32("m_Name", 1.0),
            Err(PatchError::FieldType { expected: "f32", found: "string", .. })
        ));
    }

    #[test]
    fn array_prototype_survives_removal_of_every_item() {
        let mut tree = game_object();
        let components = tree.array_mut("m_Component").unwrap();
        components.items.clear();

        let mut fresh = (*components.element).clone();
        if let Some(slot) = fresh.child_mut("component") {
            *slot = FieldValue::pptr(0, 12);
        }
        components.items.push(fresh);

        assert_eq!(
            tree.pptr("m_Component/Array/0/component").unwrap(),
            PPtr::local(12)
        );
    }

    #[test]
    fn collects_every_pointer_with_its_path() {
        let pointers = game_object().pointers();
        assert_eq!(
            pointers,
            vec![
                ("m_Component/Array/0/component".to_string(), PPtr::local(72)),
                ("m_Component/Array/1/component".to_string(), PPtr::new(1, 90)),
            ]
        );
    }
}
