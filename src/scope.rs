//! The name registry threaded through compilation and linking
//!
//! A [`Scope`] owns two arenas: one for declared types and one for declared
//! services. Every spec is assigned a stable index at creation time
//! ([`SpecId`] / [`ServiceId`]); unlinked references are held as names and
//! resolved to indices during linking, so recursive type graphs never need
//! ownership cycles.
//!
//! Names are write-once: re-declaring a name in the same namespace fails
//! with a duplicate-name error. There is no process-wide registry; the
//! caller owns the scope and passes it into every compile and link call.
//! After a successful link the scope doubles as the compiled-schema handle
//! and is read-only from then on.

use std::collections::HashMap;

use crate::error::{CompileError, CompileResult, NameKind};
use crate::spec::service::ServiceSpec;
use crate::spec::TypeSpec;

/// Stable index of a type spec in its scope's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SpecId(pub(crate) usize);

/// Stable index of a service spec in its scope's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ServiceId(pub(crate) usize);

/// Per-node resolution state, tracked outside the node itself so that the
/// linker can move a node out of the arena while resolving its children.
///
/// `Resolving` marks a node whose link call is still on the stack. Type
/// nodes skip it (type cycles are legal and short-circuit on `Resolved`);
/// service nodes use it to reject inheritance cycles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LinkState {
    Unresolved,
    Resolving,
    Resolved,
}

/// Registry mapping declared names to specs, live during compilation and
/// linking and retained read-only afterwards.
#[derive(Debug, Default)]
pub struct Scope {
    types: Vec<TypeSpec>,
    type_names: HashMap<String, SpecId>,
    type_state: Vec<LinkState>,
    services: Vec<ServiceSpec>,
    service_names: HashMap<String, ServiceId>,
    service_state: Vec<LinkState>,
}

impl Scope {
    /// Constructs an empty scope
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a declared type under its own name.
    ///
    /// # Errors
    ///
    /// Fails with [`CompileError::DuplicateName`] if the name is already
    /// taken in the type namespace.
    pub fn declare_type(&mut self, spec: TypeSpec) -> CompileResult<SpecId> {
        let name = spec
            .declared_name()
            .unwrap_or_else(|| unreachable!("only declared nodes enter the arena by name"))
            .to_owned();
        if self.type_names.contains_key(&name) {
            return Err(CompileError::DuplicateName {
                kind: NameKind::Type,
                name,
            });
        }
        let id = self.add_synthetic_type(spec);
        self.type_names.insert(name, id);
        Ok(id)
    }

    /// Adds a synthesized type spec (a function's argument struct or result
    /// union) to the arena without claiming a name. Synthesized specs can
    /// never collide with schema-declared names.
    pub fn add_synthetic_type(&mut self, spec: TypeSpec) -> SpecId {
        let id = SpecId(self.types.len());
        self.types.push(spec);
        self.type_state.push(LinkState::Unresolved);
        id
    }

    /// Registers a declared service under its own name.
    ///
    /// # Errors
    ///
    /// Fails with [`CompileError::DuplicateName`] if the name is already
    /// taken in the service namespace.
    pub fn declare_service(&mut self, spec: ServiceSpec) -> CompileResult<ServiceId> {
        let name = spec.name.clone();
        if self.service_names.contains_key(&name) {
            return Err(CompileError::DuplicateName {
                kind: NameKind::Service,
                name,
            });
        }
        let id = ServiceId(self.services.len());
        self.services.push(spec);
        self.service_state.push(LinkState::Unresolved);
        self.service_names.insert(name, id);
        Ok(id)
    }

    /// Looks up a declared type by name
    #[must_use]
    pub fn lookup_type(&self, name: &str) -> Option<SpecId> {
        self.type_names.get(name).copied()
    }

    /// Looks up a declared service by name
    #[must_use]
    pub fn lookup_service(&self, name: &str) -> Option<ServiceId> {
        self.service_names.get(name).copied()
    }

    /// Borrows the type spec at the given arena index
    #[must_use]
    pub fn spec(&self, id: SpecId) -> &TypeSpec {
        &self.types[id.0]
    }

    /// Borrows the service spec at the given arena index
    #[must_use]
    pub fn service(&self, id: ServiceId) -> &ServiceSpec {
        &self.services[id.0]
    }

    /// Number of type specs in the arena, synthesized ones included
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Number of declared services
    #[must_use]
    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    pub(crate) fn type_state(&self, id: SpecId) -> LinkState {
        self.type_state[id.0]
    }

    pub(crate) fn mark_type_resolved(&mut self, id: SpecId) {
        self.type_state[id.0] = LinkState::Resolved;
    }

    pub(crate) fn service_state(&self, id: ServiceId) -> LinkState {
        self.service_state[id.0]
    }

    pub(crate) fn mark_service_resolving(&mut self, id: ServiceId) {
        self.service_state[id.0] = LinkState::Resolving;
    }

    pub(crate) fn mark_service_resolved(&mut self, id: ServiceId) {
        self.service_state[id.0] = LinkState::Resolved;
    }

    /// Moves a type node out of the arena, leaving a placeholder, so the
    /// linker can mutate it while still resolving siblings through `self`.
    pub(crate) fn take_type(&mut self, id: SpecId) -> TypeSpec {
        std::mem::replace(&mut self.types[id.0], TypeSpec::Bool)
    }

    pub(crate) fn restore_type(&mut self, id: SpecId, spec: TypeSpec) {
        self.types[id.0] = spec;
    }

    pub(crate) fn take_service(&mut self, id: ServiceId) -> ServiceSpec {
        std::mem::replace(&mut self.services[id.0], ServiceSpec::placeholder())
    }

    pub(crate) fn restore_service(&mut self, id: ServiceId, spec: ServiceSpec) {
        self.services[id.0] = spec;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NameKind;
    use crate::spec::{RecordSpec, TypeSpec};

    fn empty_struct(name: &str) -> TypeSpec {
        TypeSpec::Struct(RecordSpec::new(name.to_owned(), Vec::new(), false))
    }

    #[test]
    fn declare_and_lookup() {
        let mut scope = Scope::new();
        let id = scope.declare_type(empty_struct("Ping")).unwrap();
        assert_eq!(scope.lookup_type("Ping"), Some(id));
        assert_eq!(scope.lookup_type("Pong"), None);
    }

    #[test]
    fn duplicate_type_name_rejected() {
        let mut scope = Scope::new();
        scope.declare_type(empty_struct("Ping")).unwrap();
        let err = scope.declare_type(empty_struct("Ping")).unwrap_err();
        assert_eq!(
            err,
            CompileError::DuplicateName {
                kind: NameKind::Type,
                name: "Ping".to_owned()
            }
        );
    }

    #[test]
    fn synthetic_types_claim_no_name() {
        let mut scope = Scope::new();
        scope.add_synthetic_type(empty_struct("Svc_f_request"));
        assert_eq!(scope.lookup_type("Svc_f_request"), None);
        // a user type of the same name still declares cleanly
        scope.declare_type(empty_struct("Svc_f_request")).unwrap();
    }
}
