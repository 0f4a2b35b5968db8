//! Static type descriptors supplied by the call registry.

use super::Value;

/// The declared type of one parameter, return value, array element, or
/// record field. The codec never guesses a type from bytes alone; every
/// decode is driven by one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDesc {
    Boolean,
    Integer,
    Float,
    Text,
    Blob,
    Timestamp,
    Array(Box<TypeDesc>),
    Record(Vec<(String, TypeDesc)>),
}

impl TypeDesc {
    pub fn kind_name(&self) -> &'static str {
        match self {
            TypeDesc::Boolean => "boolean",
            TypeDesc::Integer => "integer",
            TypeDesc::Float => "float",
            TypeDesc::Text => "text",
            TypeDesc::Blob => "blob",
            TypeDesc::Timestamp => "timestamp",
            TypeDesc::Array(_) => "array",
            TypeDesc::Record(_) => "record",
        }
    }

    /// Structural check that a value inhabits this type.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (TypeDesc::Boolean, Value::Boolean(_)) => true,
            (TypeDesc::Integer, Value::Integer(_)) => true,
            (TypeDesc::Float, Value::Float(_)) => true,
            (TypeDesc::Text, Value::Text(_)) => true,
            (TypeDesc::Blob, Value::Blob(_)) => true,
            (TypeDesc::Timestamp, Value::Timestamp(_)) => true,
            (TypeDesc::Array(elem), Value::Array(items)) => {
                items.iter().all(|item| elem.matches(item))
            }
            (TypeDesc::Record(fields), Value::Record(entries)) => {
                fields.len() == entries.len()
                    && fields.iter().all(|(name, ty)| {
                        entries
                            .iter()
                            .any(|(entry_name, entry)| entry_name == name && ty.matches(entry))
                    })
            }
            _ => false,
        }
    }
}
