//! Errors reported while compiling and linking schema definitions
//!
//! Every failure in the compile/link pipeline is reported synchronously to
//! the caller as a [`CompileError`]; nothing is retried or recovered
//! internally. A failed compile or link leaves the [`Scope`] it was run
//! against partially populated and unusable, and callers are expected to
//! discard it.
//!
//! [`Scope`]: crate::scope::Scope

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Classifies the namespace in which a [`CompileError::DuplicateName`]
/// collision occurred.
///
/// Collisions are detected independently per namespace: a service and a
/// struct may share a name, but two structs (or two functions within one
/// service) may not.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameKind {
    /// Declared types: structs, unions, exceptions, enums, and typedefs
    Type,
    /// Declared services
    Service,
    /// Functions within a single service's own declaration list
    Function,
    /// Fields within a single struct or union
    Field,
}

impl Display for NameKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NameKind::Type => write!(f, "type"),
            NameKind::Service => write!(f, "service"),
            NameKind::Function => write!(f, "function"),
            NameKind::Field => write!(f, "field"),
        }
    }
}

/// Enumerated error type for failures detected while turning an AST into
/// an unlinked spec graph, or while linking that graph against a scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompileError {
    /// A name was declared more than once within the same namespace.
    DuplicateName { kind: NameKind, name: String },
    /// Two fields of one struct or union share a field id.
    DuplicateFieldId { owner: String, id: i16 },
    /// A field id was declared with a negative value.
    NegativeFieldId { owner: String, id: i16 },
    /// A function was declared `oneway`; fire-and-forget functions are
    /// rejected at compile time, unconditionally.
    OnewayUnsupported { service: String, function: String },
    /// A name referenced by a spec (a field type, a container element
    /// type, or a service parent) was not found in scope at link time.
    UnknownReference { name: String },
    /// A service's parent chain loops back on itself. Type cycles are
    /// legal; inheritance cycles are not.
    CircularInheritance { name: String },
}

impl Display for CompileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::DuplicateName { kind, name } => {
                write!(f, "{} name \"{}\" is already taken", kind, name)
            }
            CompileError::DuplicateFieldId { owner, id } => {
                write!(f, "duplicate field id {} in \"{}\"", id, owner)
            }
            CompileError::NegativeFieldId { owner, id } => {
                write!(f, "negative field id {} in \"{}\"", id, owner)
            }
            CompileError::OnewayUnsupported { service, function } => {
                write!(
                    f,
                    "function \"{}.{}\" is oneway; oneway functions are not supported",
                    service, function
                )
            }
            CompileError::UnknownReference { name } => {
                write!(f, "unknown reference to \"{}\"", name)
            }
            CompileError::CircularInheritance { name } => {
                write!(f, "service inheritance cycle through \"{}\"", name)
            }
        }
    }
}

impl Error for CompileError {}

/// Type alias for `Result` with an error type of [`CompileError`]
///
/// Returned by every compile and link operation in this crate.
pub type CompileResult<T> = std::result::Result<T, CompileError>;
