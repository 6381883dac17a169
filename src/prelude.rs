//! Single-line import for the common compile-link-transcode workflow

pub use crate::ast::{
    DefinitionNode, EnumNode, FieldNode, FunctionNode, ProgramNode, RecordNode, RecordNodeKind,
    ServiceNode, TypeRefNode, TypedefNode,
};
pub use crate::binary::error::{DecodeError, DecodeResult, EncodeError, EncodeResult};
pub use crate::binary::{dumps, loads, BinaryProtocol};
pub use crate::error::{CompileError, CompileResult};
pub use crate::message::{deserialize_message, serialize_message, Message, MessageKind};
pub use crate::scope::Scope;
pub use crate::spec::compile::compile_program;
pub use crate::spec::TypeSpec;
pub use crate::value::{RecordValue, Value};
