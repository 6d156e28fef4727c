//! JSON interchange for field trees, in the layout asset editors dump records as.
//!
//! Export is schema-free. Import is driven by a template tree: the template
//! decides field order and kinds, the JSON only supplies values.

use serde_json::{Map, Number, Value};

use super::{ArrayValue, Field, FieldTree, FieldValue};
use crate::error::PatchError;

pub fn to_json(tree: &FieldTree) -> Value {
    value_to_json(tree.root())
}

fn value_to_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Bool(v) => Value::Bool(*v),
        FieldValue::U8(v) => Value::from(*v),
        FieldValue::I32(v) => Value::from(*v),
        FieldValue::U32(v) => Value::from(*v),
        FieldValue::I64(v) => Value::from(*v),
        FieldValue::F32(v) => Number::from_f64(*v as f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(non_finite_name(*v).to_string())),
        FieldValue::String(v) => Value::String(v.clone()),
        FieldValue::Bytes(v) => Value::Array(v.iter().map(|b| Value::from(*b)).collect()),
        FieldValue::Array(array) => Value::Array(array.items.iter().map(value_to_json).collect()),
        FieldValue::Struct(fields) => {
            let mut map = Map::new();
            for field in fields {
                map.insert(field.name.clone(), value_to_json(&field.value));
            }
            Value::Object(map)
        }
    }
}

/// Builds a new tree shaped like `template` with values taken from `json`.
pub fn from_json(template: &FieldTree, json: &Value) -> Result<FieldTree, PatchError> {
    match import_value(template.root(), json, "")? {
        FieldValue::Struct(fields) => Ok(FieldTree::new(fields)),
        _ => Err(PatchError::Structural(
            "record root must be a structure".to_string(),
        )),
    }
}

fn import_value(
    template: &FieldValue,
    json: &Value,
    path: &str,
) -> Result<FieldValue, PatchError> {
    let bad = || PatchError::FieldType {
        path: path.to_string(),
        expected: template.kind(),
        found: json_kind(json),
    };

    let value = match template {
        FieldValue::Bool(_) => match json {
            Value::Bool(v) => FieldValue::Bool(*v),
            Value::Number(n) => FieldValue::Bool(n.as_u64().ok_or_else(bad)? != 0),
            _ => return Err(bad()),
        },
        // Editors dump byte-backed flags such as `m_Enabled` as booleans.
        FieldValue::U8(_) => match json {
            Value::Bool(v) => FieldValue::U8(*v as u8),
            _ => FieldValue::U8(
                integer(json)
                    .and_then(|v| u8::try_from(v).ok())
                    .ok_or_else(bad)?,
            ),
        },
        FieldValue::I32(_) => FieldValue::I32(
            integer(json)
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(bad)?,
        ),
        FieldValue::U32(_) => FieldValue::U32(
            integer(json)
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(bad)?,
        ),
        FieldValue::I64(_) => FieldValue::I64(integer(json).ok_or_else(bad)?),
        FieldValue::F32(_) => FieldValue::F32(float(json).ok_or_else(bad)?),
        FieldValue::String(_) => {
            FieldValue::String(json.as_str().ok_or_else(bad)?.to_string())
        }
        FieldValue::Bytes(_) => {
            let items = json.as_array().ok_or_else(bad)?;
            let bytes = items
                .iter()
                .map(|item| integer(item).and_then(|v| u8::try_from(v).ok()))
                .collect::<Option<Vec<u8>>>()
                .ok_or_else(bad)?;
            FieldValue::Bytes(bytes)
        }
        FieldValue::Array(array) => {
            let items = json.as_array().ok_or_else(bad)?;
            let items = items
                .iter()
                .enumerate()
                .map(|(idx, item)| {
                    import_value(&array.element, item, &join(path, &idx.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            FieldValue::Array(ArrayValue {
                element: array.element.clone(),
                items,
            })
        }
        FieldValue::Struct(fields) => {
            let object = json.as_object().ok_or_else(bad)?;
            let mut out = Vec::with_capacity(fields.len());
            for field in fields {
                let field_path = join(path, &field.name);
                let Some(item) = object.get(&field.name) else {
                    return Err(PatchError::MissingField(field_path));
                };
                out.push(Field::new(
                    field.name.clone(),
                    import_value(&field.value, item, &field_path)?,
                ));
            }
            FieldValue::Struct(out)
        }
    };

    Ok(value)
}

/// JSON has no literal for these, so they travel as strings.
fn non_finite_name(v: f32) -> &'static str {
    if v.is_nan() {
        "NaN"
    } else if v.is_sign_positive() {
        "Infinity"
    } else {
        "-Infinity"
    }
}

fn float(json: &Value) -> Option<f32> {
    match json {
        Value::String(s) => match s.as_str() {
            "NaN" => Some(f32::NAN),
            "Infinity" => Some(f32::INFINITY),
            "-Infinity" => Some(f32::NEG_INFINITY),
            _ => None,
        },
        _ => json.as_f64().map(|v| v as f32),
    }
}

fn integer(json: &Value) -> Option<i64> {
    json.as_i64()
        .or_else(|| json.as_u64().and_then(|v| i64::try_from(v).ok()))
}

fn join(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{path}/{segment}")
    }
}

fn json_kind(json: &Value) -> &'static str {
    match json {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
