//! Runtime model for compiling IDL schemas and transcoding values
//!
//! # Overview
//!
//! This library turns parsed interface-definition schemas into linked,
//! immutable type specifications at run time, and encodes and decodes
//! values against those specifications with the binary wire protocol. No
//! code generation is involved: a schema that first becomes available
//! while the program is already running compiles into the same spec graph,
//! and produces the same bytes, as one known ahead of time.
//!
//! Construction is split into two passes over a shared [`Scope`]. The
//! *compile* pass maps each parsed declaration into an unlinked
//! specification, performing only the checks that need no cross-references:
//! field id sign and uniqueness, duplicate names, unsupported constructs.
//! The *link* pass then resolves every name into an arena index, tolerating
//! arbitrarily cyclic and forward references, and attaches the public
//! surfaces (field tables, enum value maps, service function tables) that
//! make the linked graph cheap to query.
//!
//! Values travel as the generic [`Value`] sum type rather than per-schema
//! Rust structs, since the schema is not known at compile time. The
//! [`BinaryProtocol`] codec checks conformance between a value and its spec
//! at encode time and reports structured errors on both encode and decode;
//! it never panics on untrusted input.
//!
//! # Background
//!
//! The wire format is the classic tagged binary protocol used by
//! cross-language RPC systems: big-endian fixed-width integers,
//! length-prefixed strings, tag-prefixed containers, and field-id-keyed
//! structs terminated by a stop byte. Readers tolerate fields they do not
//! know, which is what lets two peers built from different revisions of
//! the same schema interoperate. On top of the value layer, the
//! [`message`] module frames payloads in the strict versioned envelope
//! that carries a function name, a sequence id, and a message kind.
//!
//! Service declarations compile into callable surfaces: each function gets
//! a synthesized argument struct and result union registered in the same
//! arena as user-declared types, so request and response payloads are
//! encoded with the one codec path used for everything else.

pub mod ast;
pub mod binary;
pub mod error;
pub mod message;
pub mod prelude;
pub mod scope;
pub mod spec;
pub mod target;
pub mod value;

pub use crate::binary::error::{DecodeError, DecodeResult, EncodeError, EncodeResult};
pub use crate::binary::reader::BinReader;
pub use crate::binary::{dumps, loads, BinaryProtocol, MAX_NESTING};
pub use crate::error::{CompileError, CompileResult, NameKind};
pub use crate::message::{
    deserialize_message, serialize_message, Message, MessageKind, VERSION_1, VERSION_MASK,
};
pub use crate::scope::{Scope, ServiceId, SpecId};
pub use crate::spec::compile::compile_program;
pub use crate::spec::service::{ServiceFunction, ServiceSpec, ServiceSurface};
pub use crate::spec::{
    EnumSpec, EnumSurface, FieldSpec, RecordSpec, RecordSurface, TypeSpec, TypedefSpec,
};
pub use crate::target::{ByteCounter, Target};
pub use crate::value::{RecordValue, Value};

pub use ::lazy_static::lazy_static;
