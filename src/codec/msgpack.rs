//! MessagePack codec adapter using `rmpv`.
//!
//! Encoding and decoding of argument/result payloads is delegated to the
//! rmp family's dynamic value type; this adapter pins the shape of each
//! payload to the [`TypeDesc`] the registry supplies. Records always encode
//! in map form (field name → value), never positionally.
//!
//! Timestamps use extended type `1`: the body is the millisecond offset
//! from the UNIX epoch as a big-endian signed integer in the smallest of
//! {1, 2, 4, 8} bytes that holds the value.

use std::io::Cursor;

use thiserror::Error;

use super::{TypeDesc, Value};

/// Extended-type tag for timestamp values.
pub const TIMESTAMP_EXT_TYPE: i8 = 1;

/// Argument payload decoding errors.
///
/// The variant name doubles as the Failure code when an argument fails to
/// decode, so the set of names here is part of the protocol surface.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// Bytes are not well-formed MessagePack.
    #[error("malformed MessagePack: {0}")]
    Syntax(String),

    /// Well-formed, but not the declared type.
    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// Timestamp extension body has an unsupported width.
    #[error("timestamp body must be 1, 2, 4 or 8 bytes, got {0}")]
    Timestamp(usize),
}

impl DecodeError {
    /// Stable kind name, used verbatim as a Failure code.
    pub fn kind_name(&self) -> &'static str {
        match self {
            DecodeError::Syntax(_) => "Syntax",
            DecodeError::TypeMismatch { .. } => "TypeMismatch",
            DecodeError::Timestamp(_) => "Timestamp",
        }
    }
}

/// Result payload encoding errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    /// The value does not inhabit the declared return type.
    #[error("value of kind {found} does not match the declared {expected} type")]
    TypeMismatch { expected: String, found: String },

    /// The MessagePack writer failed.
    #[error("MessagePack write failed: {0}")]
    Write(String),
}

/// Encode one value against its declared type.
pub fn encode_value(value: &Value, ty: &TypeDesc) -> Result<Vec<u8>, EncodeError> {
    if !ty.matches(value) {
        return Err(EncodeError::TypeMismatch {
            expected: ty.kind_name().to_string(),
            found: value.kind_name().to_string(),
        });
    }
    let raw = to_msgpack(value);
    let mut out = Vec::new();
    rmpv::encode::write_value(&mut out, &raw).map_err(|e| EncodeError::Write(e.to_string()))?;
    Ok(out)
}

/// Decode one payload against its declared type.
pub fn decode_value(bytes: &[u8], ty: &TypeDesc) -> Result<Value, DecodeError> {
    let mut cursor = Cursor::new(bytes);
    let raw = rmpv::decode::read_value(&mut cursor).map_err(|e| DecodeError::Syntax(e.to_string()))?;
    if (cursor.position() as usize) < bytes.len() {
        return Err(DecodeError::Syntax(format!(
            "{} trailing bytes after the value",
            bytes.len() - cursor.position() as usize
        )));
    }
    from_msgpack(raw, ty)
}

fn to_msgpack(value: &Value) -> rmpv::Value {
    match value {
        Value::Nil => rmpv::Value::Nil,
        Value::Boolean(b) => rmpv::Value::Boolean(*b),
        Value::Integer(n) => rmpv::Value::Integer((*n).into()),
        Value::Float(f) => rmpv::Value::F64(*f),
        Value::Text(s) => rmpv::Value::String(s.as_str().into()),
        Value::Blob(b) => rmpv::Value::Binary(b.clone()),
        Value::Timestamp(ms) => rmpv::Value::Ext(TIMESTAMP_EXT_TYPE, timestamp_bytes(*ms)),
        Value::Array(items) => rmpv::Value::Array(items.iter().map(to_msgpack).collect()),
        Value::Record(fields) => rmpv::Value::Map(
            fields
                .iter()
                .map(|(name, field)| (rmpv::Value::String(name.as_str().into()), to_msgpack(field)))
                .collect(),
        ),
    }
}

fn from_msgpack(raw: rmpv::Value, ty: &TypeDesc) -> Result<Value, DecodeError> {
    match ty {
        TypeDesc::Boolean => match raw {
            rmpv::Value::Boolean(b) => Ok(Value::Boolean(b)),
            other => Err(mismatch(ty, &other)),
        },
        TypeDesc::Integer => match raw {
            rmpv::Value::Integer(n) => n
                .as_i64()
                .map(Value::Integer)
                .ok_or_else(|| DecodeError::TypeMismatch {
                    expected: "integer".to_string(),
                    found: "integer out of 64-bit signed range".to_string(),
                }),
            other => Err(mismatch(ty, &other)),
        },
        TypeDesc::Float => match raw {
            rmpv::Value::F32(f) => Ok(Value::Float(f as f64)),
            rmpv::Value::F64(f) => Ok(Value::Float(f)),
            other => Err(mismatch(ty, &other)),
        },
        TypeDesc::Text => match raw {
            rmpv::Value::String(s) => match s.into_str() {
                Some(s) => Ok(Value::Text(s)),
                None => Err(DecodeError::TypeMismatch {
                    expected: "text".to_string(),
                    found: "string with invalid UTF-8".to_string(),
                }),
            },
            other => Err(mismatch(ty, &other)),
        },
        TypeDesc::Blob => match raw {
            rmpv::Value::Binary(b) => Ok(Value::Blob(b)),
            other => Err(mismatch(ty, &other)),
        },
        TypeDesc::Timestamp => match raw {
            rmpv::Value::Ext(TIMESTAMP_EXT_TYPE, data) => {
                timestamp_from_bytes(&data).map(Value::Timestamp)
            }
            other => Err(mismatch(ty, &other)),
        },
        TypeDesc::Array(elem) => match raw {
            rmpv::Value::Array(items) => items
                .into_iter()
                .map(|item| from_msgpack(item, elem))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Err(mismatch(ty, &other)),
        },
        TypeDesc::Record(fields) => match raw {
            rmpv::Value::Map(pairs) => {
                let mut entries: Vec<(String, rmpv::Value)> = Vec::with_capacity(pairs.len());
                for (key, field) in pairs {
                    match key {
                        rmpv::Value::String(s) => match s.into_str() {
                            Some(name) => entries.push((name, field)),
                            None => {
                                return Err(DecodeError::TypeMismatch {
                                    expected: "record".to_string(),
                                    found: "map key with invalid UTF-8".to_string(),
                                })
                            }
                        },
                        other => {
                            return Err(DecodeError::TypeMismatch {
                                expected: "record".to_string(),
                                found: format!("map with {} key", describe(&other)),
                            })
                        }
                    }
                }

                // Decode in declared field order; unknown fields are ignored.
                let mut record = Vec::with_capacity(fields.len());
                for (name, field_ty) in fields {
                    let position = entries.iter().position(|(entry_name, _)| entry_name == name);
                    let Some(position) = position else {
                        return Err(DecodeError::TypeMismatch {
                            expected: format!("record with field {name:?}"),
                            found: "map without it".to_string(),
                        });
                    };
                    let (_, field) = entries.swap_remove(position);
                    record.push((name.clone(), from_msgpack(field, field_ty)?));
                }
                Ok(Value::Record(record))
            }
            other => Err(mismatch(ty, &other)),
        },
    }
}

fn mismatch(expected: &TypeDesc, found: &rmpv::Value) -> DecodeError {
    DecodeError::TypeMismatch {
        expected: expected.kind_name().to_string(),
        found: describe(found).to_string(),
    }
}

fn describe(value: &rmpv::Value) -> String {
    match value {
        rmpv::Value::Nil => "nil".to_string(),
        rmpv::Value::Boolean(_) => "boolean".to_string(),
        rmpv::Value::Integer(_) => "integer".to_string(),
        rmpv::Value::F32(_) | rmpv::Value::F64(_) => "float".to_string(),
        rmpv::Value::String(_) => "string".to_string(),
        rmpv::Value::Binary(_) => "binary".to_string(),
        rmpv::Value::Array(_) => "array".to_string(),
        rmpv::Value::Map(_) => "map".to_string(),
        rmpv::Value::Ext(tag, _) => format!("extension type {tag}"),
    }
}

/// Millisecond offset as a big-endian signed integer in the smallest
/// supported width.
fn timestamp_bytes(ms: i64) -> Vec<u8> {
    if let Ok(v) = i8::try_from(ms) {
        v.to_be_bytes().to_vec()
    } else if let Ok(v) = i16::try_from(ms) {
        v.to_be_bytes().to_vec()
    } else if let Ok(v) = i32::try_from(ms) {
        v.to_be_bytes().to_vec()
    } else {
        ms.to_be_bytes().to_vec()
    }
}

fn timestamp_from_bytes(data: &[u8]) -> Result<i64, DecodeError> {
    match data.len() {
        1 => Ok(i8::from_be_bytes([data[0]]) as i64),
        2 => Ok(i16::from_be_bytes([data[0], data[1]]) as i64),
        4 => Ok(i32::from_be_bytes([data[0], data[1], data[2], data[3]]) as i64),
        8 => Ok(i64::from_be_bytes([
            data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
        ])),
        other => Err(DecodeError::Timestamp(other)),
    }
}
