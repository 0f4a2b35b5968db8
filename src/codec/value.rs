//! Dynamic argument and result values.
//!
//! Computations receive and return [`Value`]s; the wire form of each one is
//! a single MessagePack-encoded payload whose shape is pinned down by the
//! [`TypeDesc`](super::TypeDesc) the registry declared for that position.

/// A single argument or result value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
    /// Milliseconds since the UNIX epoch.
    Timestamp(i64),
    Array(Vec<Value>),
    /// Fields keep their declared order and encode in map form.
    Record(Vec<(String, Value)>),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
            Value::Timestamp(_) => "timestamp",
            Value::Array(_) => "array",
            Value::Record(_) => "record",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }

    /// Epoch-millisecond offset, when this is a timestamp.
    pub fn as_timestamp(&self) -> Option<i64> {
        match self {
            Value::Timestamp(ms) => Some(*ms),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a record field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Record(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_match_variant() {
        assert_eq!(Value::Integer(5).as_integer(), Some(5));
        assert_eq!(Value::Integer(5).as_float(), None);
        assert_eq!(Value::Text("x".into()).as_text(), Some("x"));
        assert_eq!(Value::Timestamp(1000).as_timestamp(), Some(1000));
        assert_eq!(Value::Boolean(true).as_bool(), Some(true));
    }

    #[test]
    fn test_record_field_lookup() {
        let record = Value::Record(vec![
            ("id".to_string(), Value::Integer(7)),
            ("label".to_string(), Value::Text("seven".into())),
        ]);
        assert_eq!(record.field("id"), Some(&Value::Integer(7)));
        assert_eq!(record.field("missing"), None);
        assert_eq!(Value::Nil.field("id"), None);
    }

    #[test]
    fn test_from_conversions() {
        assert_eq!(Value::from(3i32), Value::Integer(3));
        assert_eq!(Value::from("hi"), Value::Text("hi".to_string()));
        assert_eq!(
            Value::from(vec![Value::Integer(1)]),
            Value::Array(vec![Value::Integer(1)])
        );
    }
}
