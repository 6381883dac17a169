//! The binary wire protocol codec
//!
//! Encodes and decodes [`Value`]s against linked type specifications, per
//! the fixed layout of the binary protocol:
//!
//! * primitives are fixed-width big-endian (bool and byte are one byte,
//!   doubles are 8-byte IEEE-754);
//! * string and binary are a 4-byte big-endian signed length followed by
//!   the raw bytes;
//! * lists and sets are an element-tag byte and a 4-byte count followed by
//!   the elements; maps add a second tag byte for values;
//! * structs and unions are a sequence of `(tag, field id, value)` triples
//!   in declared field order, terminated by a single stop byte.
//!
//! Decoding is the exact inverse, with forward-compatibility: a field id
//! absent from the spec is skipped by consuming a value of the declared
//! tag's shape. The codec touches no shared mutable state; any number of
//! threads may encode and decode against the same linked scope
//! concurrently.

pub mod error;
pub mod reader;

use cfg_if::cfg_if;

use crate::binary::error::{DecodeError, DecodeResult, EncodeError, EncodeResult};
use crate::binary::reader::BinReader;
use crate::scope::Scope;
use crate::spec::{tag, RecordSpec, TypeSpec};
use crate::target::Target;
use crate::value::{RecordValue, Value};

/// The binary protocol: a stateless codec over linked specs.
///
/// All methods are `&self` so that a protocol value can be shared freely;
/// the struct itself carries no state.
#[derive(Clone, Copy, Debug, Default)]
pub struct BinaryProtocol;

impl BinaryProtocol {
    /// Serializes `value` against `spec` into a fresh buffer.
    ///
    /// # Errors
    ///
    /// Fails when the value does not conform to the spec: a missing
    /// required field, an over- or under-populated union, or a structural
    /// mismatch.
    pub fn serialize_value(
        &self,
        scope: &Scope,
        spec: &TypeSpec,
        value: &Value,
    ) -> EncodeResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_value(scope, spec, value, &mut buf)?;
        Ok(buf)
    }

    /// Deserializes a value of the shape described by `spec` from `bytes`.
    ///
    /// Trailing bytes after the value are ignored; the envelope layer owns
    /// framing.
    pub fn deserialize_value(
        &self,
        scope: &Scope,
        spec: &TypeSpec,
        bytes: &[u8],
    ) -> DecodeResult<Value> {
        let mut reader = BinReader::new(bytes);
        self.read_value(scope, spec, &mut reader)
    }

    /// Appends the encoding of `value` to `buf`, returning the number of
    /// bytes written.
    pub fn write_value<T: Target>(
        &self,
        scope: &Scope,
        spec: &TypeSpec,
        value: &Value,
        buf: &mut T,
    ) -> EncodeResult<usize> {
        match (spec, value) {
            (TypeSpec::Bool, Value::Bool(b)) => Ok(buf.push_one(u8::from(*b))),
            (TypeSpec::Byte, Value::Byte(b)) => Ok(buf.push_one(*b as u8)),
            (TypeSpec::I16, Value::I16(n)) => Ok(buf.push_many(n.to_be_bytes())),
            (TypeSpec::I32, Value::I32(n)) => Ok(buf.push_many(n.to_be_bytes())),
            (TypeSpec::I64, Value::I64(n)) => Ok(buf.push_many(n.to_be_bytes())),
            (TypeSpec::Double, Value::Double(x)) => Ok(buf.push_many(x.to_be_bytes())),
            (TypeSpec::String, Value::String(s)) => Ok(write_len_prefixed(s.as_bytes(), buf)),
            (TypeSpec::Binary, Value::Binary(b)) => Ok(write_len_prefixed(b, buf)),
            (TypeSpec::List(elem), Value::List(items))
            | (TypeSpec::Set(elem), Value::Set(items)) => {
                let mut written = buf.push_one(elem.wire_tag(scope));
                written += buf.push_many((items.len() as i32).to_be_bytes());
                for item in items {
                    written += self.write_value(scope, elem, item, buf)?;
                }
                Ok(written)
            }
            (TypeSpec::Map(key, val), Value::Map(pairs)) => {
                let mut written = buf.push_one(key.wire_tag(scope));
                written += buf.push_one(val.wire_tag(scope));
                written += buf.push_many((pairs.len() as i32).to_be_bytes());
                for (k, v) in pairs {
                    written += self.write_value(scope, key, k, buf)?;
                    written += self.write_value(scope, val, v, buf)?;
                }
                Ok(written)
            }
            (TypeSpec::Ref(id), _) => self.write_value(scope, scope.spec(*id), value, buf),
            (TypeSpec::Typedef(td), _) => self.write_value(scope, &td.target, value, buf),
            (TypeSpec::Enum(es), Value::Enum(name, raw)) => {
                if *name != es.name {
                    return Err(mismatch(scope, spec, value));
                }
                Ok(buf.push_many(raw.to_be_bytes()))
            }
            // a raw integer is accepted wherever an enum is expected
            (TypeSpec::Enum(_), Value::I32(raw)) => Ok(buf.push_many(raw.to_be_bytes())),
            (TypeSpec::Struct(rs), _) => self.write_record(scope, rs, false, value, buf),
            (TypeSpec::Union(rs), _) => self.write_record(scope, rs, true, value, buf),
            (TypeSpec::Named(name), _) => unreachable!("unlinked reference to \"{}\"", name),
            _ => Err(mismatch(scope, spec, value)),
        }
    }

    fn write_record<T: Target>(
        &self,
        scope: &Scope,
        rs: &RecordSpec,
        is_union: bool,
        value: &Value,
        buf: &mut T,
    ) -> EncodeResult<usize> {
        let record = match value {
            Value::Record(record) => record,
            _ => return Err(mismatch_named(&rs.name, value)),
        };

        if is_union {
            let count = rs.fields.iter().filter(|f| record.is_set(f.id)).count();
            if count > 1 || (count == 0 && !rs.allow_empty) {
                return Err(EncodeError::UnionFieldCountInvalid {
                    owner: rs.name.clone(),
                    count,
                });
            }
        }

        let mut written = 0;
        for field in &rs.fields {
            // defaults never apply to unions: only the explicitly set
            // field is emitted
            let fallback = if is_union { None } else { field.default.as_ref() };
            match record.get(field.id).or(fallback) {
                Some(v) => {
                    written += buf.push_one(field.spec.wire_tag(scope));
                    written += buf.push_many(field.id.to_be_bytes());
                    written += self.write_value(scope, &field.spec, v, buf)?;
                }
                None if field.required => {
                    return Err(EncodeError::MissingRequiredField {
                        owner: rs.name.clone(),
                        field: field.name.clone(),
                    });
                }
                None => {}
            }
        }
        written += buf.push_one(tag::STOP);
        Ok(written)
    }

    /// Consumes one value of the shape described by `spec` from `reader`.
    ///
    /// Nesting is bounded by [`MAX_NESTING`]; deeper input fails with
    /// [`DecodeError::NestingTooDeep`] instead of exhausting the stack.
    pub fn read_value(
        &self,
        scope: &Scope,
        spec: &TypeSpec,
        reader: &mut BinReader<'_>,
    ) -> DecodeResult<Value> {
        self.read_nested(scope, spec, reader, 0)
    }

    fn read_nested(
        &self,
        scope: &Scope,
        spec: &TypeSpec,
        reader: &mut BinReader<'_>,
        depth: usize,
    ) -> DecodeResult<Value> {
        if depth > MAX_NESTING {
            return Err(DecodeError::NestingTooDeep { limit: MAX_NESTING });
        }
        match spec {
            TypeSpec::Bool => Ok(Value::Bool(reader.take_u8()? != 0)),
            TypeSpec::Byte => Ok(Value::Byte(reader.take_i8()?)),
            TypeSpec::I16 => Ok(Value::I16(reader.take_i16()?)),
            TypeSpec::I32 => Ok(Value::I32(reader.take_i32()?)),
            TypeSpec::I64 => Ok(Value::I64(reader.take_i64()?)),
            TypeSpec::Double => Ok(Value::Double(reader.take_f64()?)),
            TypeSpec::String => {
                let bytes = read_len_prefixed(reader)?;
                Ok(Value::String(String::from_utf8(bytes.to_vec())?))
            }
            TypeSpec::Binary => Ok(Value::Binary(read_len_prefixed(reader)?.to_vec())),
            TypeSpec::List(elem) | TypeSpec::Set(elem) => {
                let actual = reader.take_u8()?;
                let expected = elem.wire_tag(scope);
                if actual != expected {
                    return Err(DecodeError::FieldTypeMismatch {
                        context: format!("element of {}", spec.display_name(scope)),
                        expected,
                        actual,
                    });
                }
                let declared = reader.take_i32()?;
                let count = reader.checked_count(declared)?;
                let mut items = Vec::with_capacity(count.min(PREALLOC_LIMIT));
                for _ in 0..count {
                    items.push(self.read_nested(scope, elem, reader, depth + 1)?);
                }
                Ok(match spec {
                    TypeSpec::Set(_) => Value::Set(items),
                    _ => Value::List(items),
                })
            }
            TypeSpec::Map(key, val) => {
                let key_actual = reader.take_u8()?;
                let val_actual = reader.take_u8()?;
                let key_expected = key.wire_tag(scope);
                let val_expected = val.wire_tag(scope);
                if key_actual != key_expected || val_actual != val_expected {
                    let (expected, actual) = if key_actual != key_expected {
                        (key_expected, key_actual)
                    } else {
                        (val_expected, val_actual)
                    };
                    return Err(DecodeError::FieldTypeMismatch {
                        context: format!("entry of {}", spec.display_name(scope)),
                        expected,
                        actual,
                    });
                }
                let declared = reader.take_i32()?;
                let count = reader.checked_count(declared)?;
                let mut pairs = Vec::with_capacity(count.min(PREALLOC_LIMIT));
                for _ in 0..count {
                    let k = self.read_nested(scope, key, reader, depth + 1)?;
                    let v = self.read_nested(scope, val, reader, depth + 1)?;
                    pairs.push((k, v));
                }
                Ok(Value::Map(pairs))
            }
            TypeSpec::Ref(id) => self.read_nested(scope, scope.spec(*id), reader, depth + 1),
            TypeSpec::Typedef(td) => self.read_nested(scope, &td.target, reader, depth + 1),
            TypeSpec::Enum(es) => {
                let raw = reader.take_i32()?;
                cfg_if! {
                    if #[cfg(feature = "strict_enum_decode")] {
                        if !es.contains_value(raw) {
                            return Err(DecodeError::UnknownEnumValue {
                                enum_name: es.name.clone(),
                                value: raw,
                            });
                        }
                    }
                }
                Ok(Value::Enum(es.name.clone(), raw))
            }
            TypeSpec::Struct(rs) => self.read_record(scope, rs, false, reader, depth),
            TypeSpec::Union(rs) => self.read_record(scope, rs, true, reader, depth),
            TypeSpec::Named(name) => unreachable!("unlinked reference to \"{}\"", name),
        }
    }

    fn read_record(
        &self,
        scope: &Scope,
        rs: &RecordSpec,
        is_union: bool,
        reader: &mut BinReader<'_>,
        depth: usize,
    ) -> DecodeResult<Value> {
        let mut record = RecordValue::new();
        loop {
            let actual = reader.take_u8()?;
            if actual == tag::STOP {
                break;
            }
            let id = reader.take_i16()?;
            match rs.field_by_id(id) {
                Some(field) => {
                    let expected = field.spec.wire_tag(scope);
                    if actual != expected {
                        return Err(DecodeError::FieldTypeMismatch {
                            context: format!("field \"{}.{}\"", rs.name, field.name),
                            expected,
                            actual,
                        });
                    }
                    let value = self.read_nested(scope, &field.spec, reader, depth + 1)?;
                    record.set(id, value);
                }
                // unknown field: consume a value of the declared shape
                None => skip_value(reader, actual, depth + 1)?,
            }
        }

        if is_union {
            let count = record.len();
            if count > 1 || (count == 0 && !rs.allow_empty) {
                return Err(DecodeError::UnionFieldCountInvalid {
                    owner: rs.name.clone(),
                    count,
                });
            }
        } else {
            for field in &rs.fields {
                if !record.is_set(field.id) {
                    if let Some(default) = &field.default {
                        record.set(field.id, default.clone());
                    } else if field.required {
                        return Err(DecodeError::MissingRequiredField {
                            owner: rs.name.clone(),
                            field: field.name.clone(),
                        });
                    }
                }
            }
        }
        Ok(Value::Record(record))
    }
}

/// Upper bound on up-front `Vec` reservation from a wire-declared count;
/// larger collections grow as elements are actually read.
const PREALLOC_LIMIT: usize = 1 << 16;

/// Maximum nesting depth the decoder follows before rejecting the input.
/// Bounds stack growth on hostile buffers; every recursive step through a
/// container, record field, typedef, or reference counts one level.
pub const MAX_NESTING: usize = 64;

fn write_len_prefixed<T: Target>(bytes: &[u8], buf: &mut T) -> usize {
    buf.anticipate(4 + bytes.len());
    buf.push_many((bytes.len() as i32).to_be_bytes()) + buf.push_all(bytes)
}

fn read_len_prefixed<'a>(reader: &mut BinReader<'a>) -> DecodeResult<&'a [u8]> {
    let declared = reader.take_i32()?;
    let len = reader.checked_count(declared)?;
    reader.take(len)
}

fn mismatch(scope: &Scope, spec: &TypeSpec, value: &Value) -> EncodeError {
    EncodeError::ValueTypeMismatch {
        expected: spec.display_name(scope),
        actual: value.kind_name(),
    }
}

fn mismatch_named(name: &str, value: &Value) -> EncodeError {
    EncodeError::ValueTypeMismatch {
        expected: name.to_owned(),
        actual: value.kind_name(),
    }
}

/// Consumes and discards one value of the shape implied by `wire_tag`.
///
/// This is the forward-compatibility path: it lets a decoder built from an
/// older spec step over fields it does not know. Skipped values obey the
/// same [`MAX_NESTING`] bound as decoded ones.
fn skip_value(reader: &mut BinReader<'_>, wire_tag: u8, depth: usize) -> DecodeResult<()> {
    if depth > MAX_NESTING {
        return Err(DecodeError::NestingTooDeep { limit: MAX_NESTING });
    }
    match wire_tag {
        tag::BOOL | tag::BYTE => {
            reader.take(1)?;
        }
        tag::I16 => {
            reader.take(2)?;
        }
        tag::I32 => {
            reader.take(4)?;
        }
        tag::I64 | tag::DOUBLE => {
            reader.take(8)?;
        }
        tag::STRING => {
            read_len_prefixed(reader)?;
        }
        tag::STRUCT => loop {
            let t = reader.take_u8()?;
            if t == tag::STOP {
                break;
            }
            reader.take_i16()?;
            skip_value(reader, t, depth + 1)?;
        },
        tag::MAP => {
            let kt = reader.take_u8()?;
            let vt = reader.take_u8()?;
            let declared = reader.take_i32()?;
            let count = reader.checked_count(declared)?;
            for _ in 0..count {
                skip_value(reader, kt, depth + 1)?;
                skip_value(reader, vt, depth + 1)?;
            }
        }
        tag::SET | tag::LIST => {
            let et = reader.take_u8()?;
            let declared = reader.take_i32()?;
            let count = reader.checked_count(declared)?;
            for _ in 0..count {
                skip_value(reader, et, depth + 1)?;
            }
        }
        other => return Err(DecodeError::InvalidTypeTag(other)),
    }
    Ok(())
}

/// Serializes `value` against `spec` with the binary protocol.
///
/// # Errors
///
/// Propagates any [`EncodeError`] from the protocol.
pub fn dumps(scope: &Scope, spec: &TypeSpec, value: &Value) -> EncodeResult<Vec<u8>> {
    BinaryProtocol.serialize_value(scope, spec, value)
}

/// Deserializes a value of the shape described by `spec` with the binary
/// protocol.
///
/// # Errors
///
/// Propagates any [`DecodeError`] from the protocol.
pub fn loads(scope: &Scope, spec: &TypeSpec, bytes: &[u8]) -> DecodeResult<Value> {
    BinaryProtocol.deserialize_value(scope, spec, bytes)
}
