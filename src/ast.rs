//! Input contract for the schema compiler
//!
//! This crate never parses schema text. The lexer/parser is an external
//! collaborator that hands the compiler one node per declared item, in the
//! shapes defined here: names, kinds, nested type references (by name), and
//! for functions the parameter list, optional return type, exception list,
//! and oneway flag.
//!
//! Declaration order is irrelevant: all nested references are by name only,
//! so forward references are legal and resolved later by the linker.

use crate::value::Value;

/// A reference to a type as written in the schema.
///
/// Primitive and container shapes are structural; anything declared by name
/// (a struct, union, exception, enum, or typedef) stays a bare name until
/// link time.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeRefNode {
    Bool,
    Byte,
    I16,
    I32,
    I64,
    Double,
    String,
    Binary,
    List(Box<TypeRefNode>),
    Set(Box<TypeRefNode>),
    Map(Box<TypeRefNode>, Box<TypeRefNode>),
    Named(String),
}

impl TypeRefNode {
    /// Shorthand for a named reference
    #[must_use]
    pub fn named(name: &str) -> Self {
        TypeRefNode::Named(name.to_owned())
    }
}

/// One field of a struct, union, or exception, or one function parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldNode {
    pub id: i16,
    pub name: String,
    pub ty: TypeRefNode,
    /// Requiredness as written in the schema; `None` when unspecified,
    /// which compiles to optional.
    pub required: Option<bool>,
    pub default: Option<Value>,
}

impl FieldNode {
    /// Constructs a field with unspecified requiredness and no default
    #[must_use]
    pub fn new(id: i16, name: &str, ty: TypeRefNode) -> Self {
        Self {
            id,
            name: name.to_owned(),
            ty,
            required: None,
            default: None,
        }
    }

    /// Marks the field required
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = Some(true);
        self
    }

    /// Attaches a default value
    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Distinguishes the three record-shaped declarations.
///
/// Exceptions compile to plain structs; the distinction only matters for
/// the declaration kind reported in diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordNodeKind {
    Struct,
    Union,
    Exception,
}

/// A declared struct, union, or exception.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordNode {
    pub name: String,
    pub kind: RecordNodeKind,
    pub fields: Vec<FieldNode>,
}

impl RecordNode {
    #[must_use]
    pub fn new(name: &str, kind: RecordNodeKind, fields: Vec<FieldNode>) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            fields,
        }
    }
}

/// A declared enum: named items with explicit `i32` values.
///
/// Values need not be unique in the source schema.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumNode {
    pub name: String,
    pub items: Vec<(String, i32)>,
}

impl EnumNode {
    #[must_use]
    pub fn new(name: &str, items: Vec<(&str, i32)>) -> Self {
        Self {
            name: name.to_owned(),
            items: items
                .into_iter()
                .map(|(n, v)| (n.to_owned(), v))
                .collect(),
        }
    }
}

/// A declared typedef: an alias for another type reference.
#[derive(Clone, Debug, PartialEq)]
pub struct TypedefNode {
    pub name: String,
    pub target: TypeRefNode,
}

impl TypedefNode {
    #[must_use]
    pub fn new(name: &str, target: TypeRefNode) -> Self {
        Self {
            name: name.to_owned(),
            target,
        }
    }
}

/// A declared service function.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionNode {
    pub name: String,
    pub parameters: Vec<FieldNode>,
    /// `None` for void functions
    pub return_type: Option<TypeRefNode>,
    /// Declared exceptions; each keeps its schema-assigned field id
    pub exceptions: Vec<FieldNode>,
    pub oneway: bool,
}

impl FunctionNode {
    #[must_use]
    pub fn new(name: &str, parameters: Vec<FieldNode>, return_type: Option<TypeRefNode>) -> Self {
        Self {
            name: name.to_owned(),
            parameters,
            return_type,
            exceptions: Vec::new(),
            oneway: false,
        }
    }

    /// Attaches declared exceptions
    #[must_use]
    pub fn throws(mut self, exceptions: Vec<FieldNode>) -> Self {
        self.exceptions = exceptions;
        self
    }

    /// Marks the function oneway; compiling such a node always fails
    #[must_use]
    pub fn oneway(mut self) -> Self {
        self.oneway = true;
        self
    }
}

/// A declared service: an ordered function list plus an optional parent
/// named for single inheritance.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceNode {
    pub name: String,
    pub parent: Option<String>,
    pub functions: Vec<FunctionNode>,
}

impl ServiceNode {
    #[must_use]
    pub fn new(name: &str, functions: Vec<FunctionNode>) -> Self {
        Self {
            name: name.to_owned(),
            parent: None,
            functions,
        }
    }

    /// Names the parent service
    #[must_use]
    pub fn extends(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_owned());
        self
    }
}

/// One item of a parsed schema.
#[derive(Clone, Debug, PartialEq)]
pub enum DefinitionNode {
    Record(RecordNode),
    Enum(EnumNode),
    Typedef(TypedefNode),
    Service(ServiceNode),
}

/// A whole parsed schema: the flat list of declared items.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProgramNode {
    pub definitions: Vec<DefinitionNode>,
}

impl ProgramNode {
    #[must_use]
    pub fn new(definitions: Vec<DefinitionNode>) -> Self {
        Self { definitions }
    }
}
