use serde::{Deserialize, Serialize};
use std::fmt;

///
/// Value
///
/// Scalar payload carried by key snapshots and column modifications.
/// `None` is the sentinel for "not yet known" (e.g. a store-generated key
/// that has not been materialized); sentinel values never participate in
/// dependency discovery.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "<none>"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Blob(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

///
/// KeyValue
///
/// Closed key-snapshot shape: a candidate-key or foreign-key value captured
/// for dependency detection. Resolved once per foreign key at graph-build
/// time; no runtime type introspection.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum KeyValue {
    Scalar(Value),
    Composite(Vec<Value>),
    Bytes(Vec<u8>),
}

impl KeyValue {
    /// A snapshot is valid when every component is materialized.
    /// Invalid snapshots are excluded from predecessor and edge discovery.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Scalar(value) => !value.is_none(),
            Self::Composite(values) => !values.is_empty() && values.iter().all(|v| !v.is_none()),
            Self::Bytes(bytes) => !bytes.is_empty(),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(value) => write!(f, "{value}"),
            Self::Composite(values) => {
                write!(f, "(")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, ")")
            }
            Self::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

///
/// ValueSource
///
/// Which side of an entry's before/after image a snapshot reads from.
/// Original is used for deletes and updates moving away from a key;
/// Current for inserts and updates moving toward one.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum ValueSource {
    Current,
    Original,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_scalar_is_invalid() {
        assert!(!KeyValue::Scalar(Value::None).is_valid());
        assert!(KeyValue::Scalar(Value::Uint(1)).is_valid());
    }

    #[test]
    fn composite_with_any_sentinel_is_invalid() {
        let partial = KeyValue::Composite(vec![Value::Uint(1), Value::None]);
        assert!(!partial.is_valid());

        let full = KeyValue::Composite(vec![Value::Uint(1), Value::Text("a".to_string())]);
        assert!(full.is_valid());

        assert!(!KeyValue::Composite(Vec::new()).is_valid());
    }

    #[test]
    fn empty_bytes_are_invalid() {
        assert!(!KeyValue::Bytes(Vec::new()).is_valid());
        assert!(KeyValue::Bytes(vec![0x01]).is_valid());
    }
}
