//! Runtime value model for schema-conforming data
//!
//! Because schemas are compiled at run time, there is no per-schema nominal
//! Rust type to decode into. Instead, every schema-defined value is
//! represented as a [`Value`]: one generic sum type whose shape mirrors the
//! type-spec variants. Struct and union values are a single tagged-record
//! type, [`RecordValue`], keyed by wire field id; the per-type accessors
//! live on the linked spec's surface rather than on the value itself.
//!
//! Values are created and destroyed per encode/decode call. They own none of
//! the schema graph and only borrow type specifications for the duration of
//! one codec operation.

use std::collections::BTreeMap;

#[cfg(feature = "serde_impls")]
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// A value conforming to some linked type specification.
///
/// The correspondence between `Value` variants and spec variants is
/// structural: the codec checks conformance at encode time and reports
/// a mismatch error rather than panicking.
///
/// Two deliberate asymmetries:
///
/// * Enum values decode as the raw `i32` read from the wire, tagged with
///   the declaring enum's name. The raw value is *not* required to be one
///   of the declared named values (see the `strict_enum_decode` feature).
/// * Set and map values preserve insertion order as plain vectors, so that
///   round-trips are byte-deterministic and values containing doubles stay
///   comparable. Uniqueness of set members and map keys is the caller's
///   contract.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Byte(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Double(f64),
    String(String),
    Binary(Vec<u8>),
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
    /// A raw enum value tagged with the name of the enum that produced it
    Enum(String, i32),
    /// A struct or union value: present fields keyed by field id
    Record(RecordValue),
}

impl Value {
    /// Returns a short static name for the variant of this value, used in
    /// error messages reporting structural mismatches.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Byte(_) => "byte",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Binary(_) => "binary",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Enum(..) => "enum",
            Value::Record(_) => "record",
        }
    }
}

macro_rules! value_impl_from {
    ( $( $src:ty => $ctor:ident ),+ $(,)? ) => {
        $( impl From<$src> for Value {
            fn from(val: $src) -> Self {
                Value::$ctor(val)
            }
        }
        )+
    };
}

value_impl_from! {
    bool => Bool,
    i8 => Byte,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f64 => Double,
    String => String,
    Vec<u8> => Binary,
    RecordValue => Record,
}

impl From<&str> for Value {
    fn from(val: &str) -> Self {
        Value::String(val.to_owned())
    }
}

/// The set fields of one struct or union value, keyed by field id.
///
/// Field ids, not declaration order, identify members on the wire, so the
/// record is an id-indexed map. Name-based access goes through the linked
/// spec's [`RecordSurface`](crate::spec::RecordSurface).
#[derive(Clone, Debug, PartialEq, Default)]
pub struct RecordValue {
    fields: BTreeMap<i16, Value>,
}

impl RecordValue {
    /// Constructs an empty record with no fields set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the field with the given id, replacing any previous value
    pub fn set(&mut self, id: i16, value: Value) {
        self.fields.insert(id, value);
    }

    /// Builder-style variant of [`set`](Self::set)
    #[must_use]
    pub fn with(mut self, id: i16, value: Value) -> Self {
        self.set(id, value);
        self
    }

    /// Returns the value of the field with the given id, if set
    #[must_use]
    pub fn get(&self, id: i16) -> Option<&Value> {
        self.fields.get(&id)
    }

    /// Returns `true` if the field with the given id is set
    #[must_use]
    pub fn is_set(&self, id: i16) -> bool {
        self.fields.contains_key(&id)
    }

    /// Number of fields currently set
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if no fields are set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over `(field id, value)` pairs in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = (i16, &Value)> {
        self.fields.iter().map(|(id, v)| (*id, v))
    }
}

impl FromIterator<(i16, Value)> for RecordValue {
    fn from_iter<T: IntoIterator<Item = (i16, Value)>>(iter: T) -> Self {
        Self {
            fields: BTreeMap::from_iter(iter),
        }
    }
}

#[cfg(feature = "serde_impls")]
impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Byte(b) => serializer.serialize_i8(*b),
            Value::I16(n) => serializer.serialize_i16(*n),
            Value::I32(n) => serializer.serialize_i32(*n),
            Value::I64(n) => serializer.serialize_i64(*n),
            Value::Double(x) => serializer.serialize_f64(*x),
            Value::String(s) => serializer.serialize_str(s),
            Value::Binary(b) => serializer.serialize_bytes(b),
            Value::List(items) | Value::Set(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(pairs) => {
                let mut map = serializer.serialize_map(Some(pairs.len()))?;
                for (k, v) in pairs {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Value::Enum(_, raw) => serializer.serialize_i32(*raw),
            Value::Record(rec) => {
                let mut map = serializer.serialize_map(Some(rec.len()))?;
                for (id, v) in rec.iter() {
                    map.serialize_entry(&id, v)?;
                }
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_set_and_get() {
        let rec = RecordValue::new()
            .with(1, Value::from("hello"))
            .with(3, Value::from(42i32));
        assert_eq!(rec.get(1), Some(&Value::String("hello".to_owned())));
        assert_eq!(rec.get(2), None);
        assert!(rec.is_set(3));
        assert_eq!(rec.len(), 2);
    }

    #[test]
    fn record_iterates_in_id_order() {
        let rec = RecordValue::new()
            .with(7, Value::Bool(true))
            .with(2, Value::Bool(false));
        let ids: Vec<i16> = rec.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![2, 7]);
    }
}
