use std::collections::HashMap;

use crate::error::{ModelError, Result};
use super::cursor::ByteCursor;

/// A single GGUF metadata value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
    Bool(bool),
    String(String),
    Array(Vec<MetadataValue>),
}

// GGUF value type IDs.
const TYPE_U8: u32 = 0;
const TYPE_I8: u32 = 1;
const TYPE_U16: u32 = 2;
const TYPE_I16: u32 = 3;
const TYPE_U32: u32 = 4;
const TYPE_I32: u32 = 5;
const TYPE_F32: u32 = 6;
const TYPE_BOOL: u32 = 7;
const TYPE_STRING: u32 = 8;
const TYPE_ARRAY: u32 = 9;
const TYPE_U64: u32 = 10;
const TYPE_I64: u32 = 11;
const TYPE_F64: u32 = 12;

/// Deepest array nesting accepted when reading metadata.
pub const MAX_ARRAY_DEPTH: usize = 2;

impl MetadataValue {
    fn type_name(&self) -> &'static str {
        match self {
            MetadataValue::U8(_) => "U8",
            MetadataValue::I8(_) => "I8",
            MetadataValue::U16(_) => "U16",
            MetadataValue::I16(_) => "I16",
            MetadataValue::U32(_) => "U32",
            MetadataValue::I32(_) => "I32",
            MetadataValue::U64(_) => "U64",
            MetadataValue::I64(_) => "I64",
            MetadataValue::F32(_) => "F32",
            MetadataValue::F64(_) => "F64",
            MetadataValue::Bool(_) => "Bool",
            MetadataValue::String(_) => "String",
            MetadataValue::Array(_) => "Array",
        }
    }

    fn type_id(&self) -> u32 {
        match self {
            MetadataValue::U8(_) => TYPE_U8,
            MetadataValue::I8(_) => TYPE_I8,
            MetadataValue::U16(_) => TYPE_U16,
            MetadataValue::I16(_) => TYPE_I16,
            MetadataValue::U32(_) => TYPE_U32,
            MetadataValue::I32(_) => TYPE_I32,
            MetadataValue::U64(_) => TYPE_U64,
            MetadataValue::I64(_) => TYPE_I64,
            MetadataValue::F32(_) => TYPE_F32,
            MetadataValue::F64(_) => TYPE_F64,
            MetadataValue::Bool(_) => TYPE_BOOL,
            MetadataValue::String(_) => TYPE_STRING,
            MetadataValue::Array(_) => TYPE_ARRAY,
        }
    }

    /// Widen any integer variant to i64.
    fn as_i64(&self) -> Option<i64> {
        match *self {
            MetadataValue::U8(v) => Some(v as i64),
            MetadataValue::I8(v) => Some(v as i64),
            MetadataValue::U16(v) => Some(v as i64),
            MetadataValue::I16(v) => Some(v as i64),
            MetadataValue::U32(v) => Some(v as i64),
            MetadataValue::I32(v) => Some(v as i64),
            MetadataValue::U64(v) => i64::try_from(v).ok(),
            MetadataValue::I64(v) => Some(v),
            _ => None,
        }
    }

    fn read(cursor: &mut ByteCursor<'_>, type_id: u32, depth: usize) -> Result<MetadataValue> {
        let value = match type_id {
            TYPE_U8 => MetadataValue::U8(cursor.read_u8()?),
            TYPE_I8 => MetadataValue::I8(cursor.read_u8()? as i8),
            TYPE_U16 => MetadataValue::U16(cursor.read_u16()?),
            TYPE_I16 => MetadataValue::I16(cursor.read_u16()? as i16),
            TYPE_U32 => MetadataValue::U32(cursor.read_u32()?),
            TYPE_I32 => MetadataValue::I32(cursor.read_u32()? as i32),
            TYPE_F32 => MetadataValue::F32(cursor.read_f32()?),
            TYPE_BOOL => MetadataValue::Bool(cursor.read_u8()? != 0),
            TYPE_STRING => MetadataValue::String(cursor.read_string()?),
            TYPE_ARRAY => {
                if depth >= MAX_ARRAY_DEPTH {
                    return Err(ModelError::Other(format!(
                        "metadata arrays nested deeper than {} levels",
                        MAX_ARRAY_DEPTH
                    )));
                }
                let elem_type = cursor.read_u32()?;
                let count = cursor.read_len()?;
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(MetadataValue::read(cursor, elem_type, depth + 1)?);
                }
                MetadataValue::Array(values)
            }
            TYPE_U64 => MetadataValue::U64(cursor.read_u64()?),
            TYPE_I64 => MetadataValue::I64(cursor.read_u64()? as i64),
            TYPE_F64 => MetadataValue::F64(cursor.read_f64()?),
            other => return Err(ModelError::UnsupportedGgufType(other)),
        };
        Ok(value)
    }

    /// Append the value payload (without its type ID) in GGUF encoding.
    fn write_payload(&self, out: &mut Vec<u8>) {
        match self {
            MetadataValue::U8(v) => out.push(*v),
            MetadataValue::I8(v) => out.push(*v as u8),
            MetadataValue::U16(v) => out.extend_from_slice(&v.to_le_bytes()),
            MetadataValue::I16(v) => out.extend_from_slice(&v.to_le_bytes()),
            MetadataValue::U32(v) => out.extend_from_slice(&v.to_le_bytes()),
            MetadataValue::I32(v) => out.extend_from_slice(&v.to_le_bytes()),
            MetadataValue::U64(v) => out.extend_from_slice(&v.to_le_bytes()),
            MetadataValue::I64(v) => out.extend_from_slice(&v.to_le_bytes()),
            MetadataValue::F32(v) => out.extend_from_slice(&v.to_le_bytes()),
            MetadataValue::F64(v) => out.extend_from_slice(&v.to_le_bytes()),
            MetadataValue::Bool(v) => out.push(*v as u8),
            MetadataValue::String(s) => write_string(out, s),
            MetadataValue::Array(values) => {
                // Empty arrays are written with U8 as a placeholder element type.
                let elem_type = values.first().map(|v| v.type_id()).unwrap_or(TYPE_U8);
                out.extend_from_slice(&elem_type.to_le_bytes());
                out.extend_from_slice(&(values.len() as u64).to_le_bytes());
                for v in values {
                    v.write_payload(out);
                }
            }
        }
    }
}

pub(crate) fn write_string(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u64).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

/// Collection of GGUF metadata key-value pairs.
#[derive(Debug, Clone, Default)]
pub struct GgufMetadata {
    pub entries: HashMap<String, MetadataValue>,
}

impl GgufMetadata {
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn require(&self, key: &str) -> Result<&MetadataValue> {
        self.entries
            .get(key)
            .ok_or_else(|| ModelError::MissingKey(key.to_string()))
    }

    fn mismatch(key: &str, expected: &str, got: &MetadataValue) -> ModelError {
        ModelError::TypeMismatch {
            key: key.to_string(),
            expected: expected.to_string(),
            got: got.type_name().to_string(),
        }
    }

    pub fn get_str(&self, key: &str) -> Result<&str> {
        match self.require(key)? {
            MetadataValue::String(s) => Ok(s.as_str()),
            other => Err(Self::mismatch(key, "String", other)),
        }
    }

    /// Any integer variant whose value fits in a u32.
    pub fn get_u32(&self, key: &str) -> Result<u32> {
        let value = self.require(key)?;
        value
            .as_i64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| Self::mismatch(key, "U32", value))
    }

    /// Any integer variant whose value fits in an i32.
    pub fn get_i32(&self, key: &str) -> Result<i32> {
        let value = self.require(key)?;
        value
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| Self::mismatch(key, "I32", value))
    }

    pub fn get_f32(&self, key: &str) -> Result<f32> {
        match self.require(key)? {
            MetadataValue::F32(v) => Ok(*v),
            MetadataValue::F64(v) => Ok(*v as f32),
            other => Err(Self::mismatch(key, "F32", other)),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        match self.require(key)? {
            MetadataValue::Bool(v) => Ok(*v),
            other => Err(Self::mismatch(key, "Bool", other)),
        }
    }

    /// Parse `n_kv` entries: GGUF string key, u32 value type ID, payload.
    pub fn parse_kv(cursor: &mut ByteCursor<'_>, n_kv: u64) -> Result<GgufMetadata> {
        let mut entries = HashMap::new();
        for _ in 0..n_kv {
            let key = cursor.read_string()?;
            let type_id = cursor.read_u32()?;
            let value = MetadataValue::read(cursor, type_id, 0)?;
            entries.insert(key, value);
        }
        Ok(GgufMetadata { entries })
    }

    /// Serialize all entries, sorted by key so output is deterministic.
    pub fn write_kv(&self, out: &mut Vec<u8>) {
        let mut keys: Vec<&String> = self.entries.keys().collect();
        keys.sort();
        for key in keys {
            let value = &self.entries[key];
            write_string(out, key);
            out.extend_from_slice(&value.type_id().to_le_bytes());
            value.write_payload(out);
        }
    }
}
