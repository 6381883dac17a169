//! Type specifications: the node kinds of the schema graph
//!
//! A [`TypeSpec`] describes one schema type's shape and wire behavior. The
//! compiler produces these nodes *unlinked*: every reference to a declared
//! type is held by name ([`TypeSpec::Named`]). The linker rewrites each name
//! into a direct arena reference ([`TypeSpec::Ref`]) and attaches the public
//! surface, after which the whole graph is immutable and safe for concurrent
//! read-only use.
//!
//! Recursive and mutually recursive types are representable without
//! unbounded size because the recursive edge always passes through a
//! [`SpecId`] index into the scope's arena, never through direct ownership.

pub mod compile;
pub mod link;
pub mod service;

use std::collections::HashMap;

use crate::scope::{Scope, SpecId};
use crate::value::Value;

/// Wire type tags of the binary protocol.
///
/// One byte per type, written before every struct field, container element
/// shape, and map key/value shape. `STOP` terminates a struct or union
/// field list.
pub mod tag {
    pub const STOP: u8 = 0;
    pub const BOOL: u8 = 2;
    pub const BYTE: u8 = 3;
    pub const DOUBLE: u8 = 4;
    pub const I16: u8 = 6;
    pub const I32: u8 = 8;
    pub const I64: u8 = 10;
    pub const STRING: u8 = 11;
    pub const STRUCT: u8 = 12;
    pub const MAP: u8 = 13;
    pub const SET: u8 = 14;
    pub const LIST: u8 = 15;

    lazy_static::lazy_static! {
        static ref TAG_NAMES: std::collections::HashMap<u8, &'static str> = {
            let mut names = std::collections::HashMap::new();
            names.insert(STOP, "stop");
            names.insert(BOOL, "bool");
            names.insert(BYTE, "byte");
            names.insert(DOUBLE, "double");
            names.insert(I16, "i16");
            names.insert(I32, "i32");
            names.insert(I64, "i64");
            names.insert(STRING, "string");
            names.insert(STRUCT, "struct");
            names.insert(MAP, "map");
            names.insert(SET, "set");
            names.insert(LIST, "list");
            names
        };
    }

    /// Human-readable name for a wire tag, for use in diagnostics
    #[must_use]
    pub fn name(tag: u8) -> &'static str {
        TAG_NAMES.get(&tag).copied().unwrap_or("invalid")
    }
}

/// A node in the type graph.
///
/// Primitives and containers are structural; `Named` and `Ref` are the
/// pre-link and post-link forms of a reference to a declared type living in
/// the scope arena; `Typedef`, `Enum`, `Struct`, and `Union` are the
/// declared nodes themselves. Exceptions compile to `Struct` nodes.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeSpec {
    Bool,
    Byte,
    I16,
    I32,
    I64,
    Double,
    String,
    Binary,
    List(Box<TypeSpec>),
    Set(Box<TypeSpec>),
    Map(Box<TypeSpec>, Box<TypeSpec>),
    /// Unresolved reference to a declared type; only present before linking
    Named(String),
    /// Resolved reference into the scope arena; only present after linking
    Ref(SpecId),
    Typedef(TypedefSpec),
    Enum(EnumSpec),
    Struct(RecordSpec),
    Union(RecordSpec),
}

impl TypeSpec {
    /// Returns the wire type tag this spec encodes with.
    ///
    /// Typedefs and references are resolved through the scope; an enum
    /// encodes as its raw `i32`.
    ///
    /// # Panics
    ///
    /// Panics if called on an unlinked spec still holding a `Named`
    /// reference. The codec only operates on linked graphs.
    #[must_use]
    pub fn wire_tag(&self, scope: &Scope) -> u8 {
        match self {
            TypeSpec::Bool => tag::BOOL,
            TypeSpec::Byte => tag::BYTE,
            TypeSpec::I16 => tag::I16,
            TypeSpec::I32 => tag::I32,
            TypeSpec::I64 => tag::I64,
            TypeSpec::Double => tag::DOUBLE,
            TypeSpec::String | TypeSpec::Binary => tag::STRING,
            TypeSpec::List(_) => tag::LIST,
            TypeSpec::Set(_) => tag::SET,
            TypeSpec::Map(..) => tag::MAP,
            TypeSpec::Named(name) => unreachable!("unlinked reference to \"{}\"", name),
            TypeSpec::Ref(id) => scope.spec(*id).wire_tag(scope),
            TypeSpec::Typedef(td) => td.target.wire_tag(scope),
            TypeSpec::Enum(_) => tag::I32,
            TypeSpec::Struct(_) | TypeSpec::Union(_) => tag::STRUCT,
        }
    }

    /// Display name for diagnostics: the declared name for named types,
    /// the structural shape otherwise.
    #[must_use]
    pub fn display_name(&self, scope: &Scope) -> String {
        match self {
            TypeSpec::Bool => "bool".to_owned(),
            TypeSpec::Byte => "byte".to_owned(),
            TypeSpec::I16 => "i16".to_owned(),
            TypeSpec::I32 => "i32".to_owned(),
            TypeSpec::I64 => "i64".to_owned(),
            TypeSpec::Double => "double".to_owned(),
            TypeSpec::String => "string".to_owned(),
            TypeSpec::Binary => "binary".to_owned(),
            TypeSpec::List(elem) => format!("list<{}>", elem.display_name(scope)),
            TypeSpec::Set(elem) => format!("set<{}>", elem.display_name(scope)),
            TypeSpec::Map(key, val) => format!(
                "map<{}, {}>",
                key.display_name(scope),
                val.display_name(scope)
            ),
            TypeSpec::Named(name) => name.clone(),
            TypeSpec::Ref(id) => scope.spec(*id).display_name(scope),
            TypeSpec::Typedef(td) => td.name.clone(),
            TypeSpec::Enum(es) => es.name.clone(),
            TypeSpec::Struct(rs) | TypeSpec::Union(rs) => rs.name.clone(),
        }
    }

    /// The name under which this spec was declared, if it is a declared
    /// (arena-resident) node.
    #[must_use]
    pub fn declared_name(&self) -> Option<&str> {
        match self {
            TypeSpec::Typedef(td) => Some(&td.name),
            TypeSpec::Enum(es) => Some(&es.name),
            TypeSpec::Struct(rs) | TypeSpec::Union(rs) => Some(&rs.name),
            _ => None,
        }
    }
}

/// One member of a struct or union.
///
/// A required field with no default must be present at encode time and must
/// be present (or decodable) at decode time; an absent optional field takes
/// its declared default, if any, on both sides.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSpec {
    pub id: i16,
    pub name: String,
    pub spec: TypeSpec,
    pub required: bool,
    pub default: Option<Value>,
}

/// The body shared by struct, exception, and union specs: a declared name
/// and an ordered field list.
///
/// Field ids are unique and non-negative within one record, and field names
/// are unique within one record; both invariants are enforced at compile
/// time. `allow_empty` is only meaningful for unions: a synthesized function
/// result union allows zero set fields (the void/no-exception reply), while
/// schema-declared unions require exactly one.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordSpec {
    pub name: String,
    pub fields: Vec<FieldSpec>,
    pub allow_empty: bool,
    surface: Option<RecordSurface>,
}

impl RecordSpec {
    /// Constructs an unlinked record spec. Field invariants are the
    /// compiler's responsibility; see [`compile`](crate::spec::compile).
    #[must_use]
    pub fn new(name: String, fields: Vec<FieldSpec>, allow_empty: bool) -> Self {
        Self {
            name,
            fields,
            allow_empty,
            surface: None,
        }
    }

    /// The surface attached by the linker, or `None` before linking
    #[must_use]
    pub fn surface(&self) -> Option<&RecordSurface> {
        self.surface.as_ref()
    }

    pub(crate) fn attach_surface(&mut self) {
        self.surface = Some(RecordSurface::build(&self.fields));
    }

    /// Looks up a field by wire id, via the surface when linked
    #[must_use]
    pub fn field_by_id(&self, id: i16) -> Option<&FieldSpec> {
        match &self.surface {
            Some(surface) => surface.by_id.get(&id).map(|&slot| &self.fields[slot]),
            None => self.fields.iter().find(|f| f.id == id),
        }
    }

    /// Looks up a field by declared name, via the surface when linked
    #[must_use]
    pub fn field_by_name(&self, name: &str) -> Option<&FieldSpec> {
        match &self.surface {
            Some(surface) => surface.by_name.get(name).map(|&slot| &self.fields[slot]),
            None => self.fields.iter().find(|f| f.name == name),
        }
    }

    /// Constructs an empty value conforming to this record
    #[must_use]
    pub fn new_value(&self) -> crate::value::RecordValue {
        crate::value::RecordValue::new()
    }
}

/// Accessor tables attached to a record spec at link time.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordSurface {
    by_id: HashMap<i16, usize>,
    by_name: HashMap<String, usize>,
}

impl RecordSurface {
    fn build(fields: &[FieldSpec]) -> Self {
        let mut by_id = HashMap::with_capacity(fields.len());
        let mut by_name = HashMap::with_capacity(fields.len());
        for (slot, field) in fields.iter().enumerate() {
            by_id.insert(field.id, slot);
            by_name.insert(field.name.clone(), slot);
        }
        Self { by_id, by_name }
    }
}

/// A declared enum: ordered named items over `i32` values.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumSpec {
    pub name: String,
    pub items: Vec<(String, i32)>,
    surface: Option<EnumSurface>,
}

impl EnumSpec {
    #[must_use]
    pub fn new(name: String, items: Vec<(String, i32)>) -> Self {
        Self {
            name,
            items,
            surface: None,
        }
    }

    pub(crate) fn attach_surface(&mut self) {
        self.surface = Some(EnumSurface::build(&self.items));
    }

    /// The surface attached by the linker, or `None` before linking
    #[must_use]
    pub fn surface(&self) -> Option<&EnumSurface> {
        self.surface.as_ref()
    }

    /// Returns `true` if `value` is one of the declared item values
    #[must_use]
    pub fn contains_value(&self, value: i32) -> bool {
        match &self.surface {
            Some(surface) => surface.by_value.contains_key(&value),
            None => self.items.iter().any(|(_, v)| *v == value),
        }
    }
}

/// Name/value lookup tables attached to an enum spec at link time.
///
/// Where several items share a value, the first declaration wins in the
/// value-to-name direction.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumSurface {
    by_name: HashMap<String, i32>,
    by_value: HashMap<i32, String>,
}

impl EnumSurface {
    fn build(items: &[(String, i32)]) -> Self {
        let mut by_name = HashMap::with_capacity(items.len());
        let mut by_value = HashMap::with_capacity(items.len());
        for (name, value) in items {
            by_name.insert(name.clone(), *value);
            by_value.entry(*value).or_insert_with(|| name.clone());
        }
        Self { by_name, by_value }
    }

    /// Declared value of the named item
    #[must_use]
    pub fn value_of(&self, name: &str) -> Option<i32> {
        self.by_name.get(name).copied()
    }

    /// Name of the item with the given value (first declaration wins)
    #[must_use]
    pub fn name_of(&self, value: i32) -> Option<&str> {
        self.by_value.get(&value).map(String::as_str)
    }
}

/// A declared typedef: a transparent alias. Encoding and decoding pass
/// straight through to the target type.
#[derive(Clone, Debug, PartialEq)]
pub struct TypedefSpec {
    pub name: String,
    pub target: Box<TypeSpec>,
}

impl TypedefSpec {
    #[must_use]
    pub fn new(name: String, target: TypeSpec) -> Self {
        Self {
            name,
            target: Box::new(target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_names_cover_all_wire_tags() {
        for t in [
            tag::STOP,
            tag::BOOL,
            tag::BYTE,
            tag::DOUBLE,
            tag::I16,
            tag::I32,
            tag::I64,
            tag::STRING,
            tag::STRUCT,
            tag::MAP,
            tag::SET,
            tag::LIST,
        ] {
            assert_ne!(tag::name(t), "invalid");
        }
        assert_eq!(tag::name(1), "invalid");
        assert_eq!(tag::name(16), "invalid");
    }

    #[test]
    fn enum_surface_first_declaration_wins() {
        let mut es = EnumSpec::new(
            "Status".to_owned(),
            vec![
                ("OK".to_owned(), 0),
                ("FINE".to_owned(), 0),
                ("BAD".to_owned(), 1),
            ],
        );
        es.attach_surface();
        let surface = es.surface().unwrap();
        assert_eq!(surface.name_of(0), Some("OK"));
        assert_eq!(surface.value_of("FINE"), Some(0));
        assert!(es.contains_value(1));
        assert!(!es.contains_value(2));
    }
}
