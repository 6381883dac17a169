//! Second pass: resolving names into direct references
//!
//! Linking walks every node of the graph exactly once, guarded by the
//! per-node resolution state held in the [`Scope`]. The state is flipped to
//! resolved *before* descending into children, so a cyclic type graph
//! simply re-enters a node that short-circuits immediately; cycles are the
//! expected case, not an error.
//!
//! For each node the linker rewrites every [`TypeSpec::Named`] leaf into a
//! [`TypeSpec::Ref`] arena index (failing with an unknown-reference error
//! for undeclared names), then builds and attaches the node's public
//! surface. Linking a service first resolves and links its parent, then
//! links each function's argument and result specs, then composes the
//! service surface from the parent's surface and its own functions.

use crate::error::{CompileError, CompileResult};
use crate::scope::{LinkState, Scope, ServiceId, SpecId};
use crate::spec::service::{ServiceParent, ServiceSurface};
use crate::spec::TypeSpec;

impl Scope {
    /// Links every declared type and service in this scope.
    ///
    /// Idempotent: nodes linked by an earlier call are skipped. After a
    /// successful return the graph is fully resolved and immutable.
    ///
    /// # Errors
    ///
    /// Fails with [`CompileError::UnknownReference`] when a referenced type
    /// or parent service was never declared. The scope must then be
    /// discarded.
    pub fn link(&mut self) -> CompileResult<()> {
        for index in 0..self.type_count() {
            self.link_type(SpecId(index))?;
        }
        for index in 0..self.service_count() {
            self.link_service(ServiceId(index))?;
        }
        Ok(())
    }

    /// Links one type node and, transitively, everything it references.
    pub(crate) fn link_type(&mut self, id: SpecId) -> CompileResult<()> {
        if self.type_state(id) == LinkState::Resolved {
            return Ok(());
        }
        // mark before descending: re-entry through a cycle must no-op
        self.mark_type_resolved(id);

        let mut spec = self.take_type(id);
        let result = self.resolve_nested(&mut spec);
        if result.is_ok() {
            match &mut spec {
                TypeSpec::Struct(rs) | TypeSpec::Union(rs) => rs.attach_surface(),
                TypeSpec::Enum(es) => es.attach_surface(),
                _ => {}
            }
        }
        self.restore_type(id, spec);
        result
    }

    /// Rewrites every named reference reachable inside `spec` into an
    /// arena index, linking referenced nodes along the way.
    fn resolve_nested(&mut self, spec: &mut TypeSpec) -> CompileResult<()> {
        match spec {
            TypeSpec::Bool
            | TypeSpec::Byte
            | TypeSpec::I16
            | TypeSpec::I32
            | TypeSpec::I64
            | TypeSpec::Double
            | TypeSpec::String
            | TypeSpec::Binary
            | TypeSpec::Ref(_)
            | TypeSpec::Enum(_) => Ok(()),
            TypeSpec::List(elem) | TypeSpec::Set(elem) => self.resolve_nested(elem),
            TypeSpec::Map(key, val) => {
                self.resolve_nested(key)?;
                self.resolve_nested(val)
            }
            TypeSpec::Typedef(td) => self.resolve_nested(&mut td.target),
            TypeSpec::Struct(rs) | TypeSpec::Union(rs) => {
                for field in &mut rs.fields {
                    self.resolve_nested(&mut field.spec)?;
                }
                Ok(())
            }
            TypeSpec::Named(name) => {
                let id = self
                    .lookup_type(name)
                    .ok_or_else(|| CompileError::UnknownReference { name: name.clone() })?;
                self.link_type(id)?;
                *spec = TypeSpec::Ref(id);
                Ok(())
            }
        }
    }

    /// Links one service: parent first, then each function's synthesized
    /// argument and result specs, then the composed surface.
    ///
    /// Unlike type nodes, a service node is marked `Resolving` while its
    /// link call is on the stack: reaching a `Resolving` parent means the
    /// inheritance chain loops, which is rejected rather than tolerated.
    pub(crate) fn link_service(&mut self, id: ServiceId) -> CompileResult<()> {
        if self.service_state(id) == LinkState::Resolved {
            return Ok(());
        }
        self.mark_service_resolving(id);

        let mut service = self.take_service(id);
        let result = (|| -> CompileResult<()> {
            if let Some(ServiceParent::Named(parent_name)) = &service.parent {
                let parent_id = self.lookup_service(parent_name).ok_or_else(|| {
                    CompileError::UnknownReference {
                        name: parent_name.clone(),
                    }
                })?;
                if self.service_state(parent_id) == LinkState::Resolving {
                    return Err(CompileError::CircularInheritance {
                        name: parent_name.clone(),
                    });
                }
                self.link_service(parent_id)?;
                service.parent = Some(ServiceParent::Resolved(parent_id));
            }
            for func in &mut service.functions {
                self.link_type(func.args)?;
                self.link_type(func.result)?;
                func.attach_surface();
            }
            Ok(())
        })();

        if result.is_ok() {
            let own = service
                .functions
                .iter()
                .filter_map(|f| f.surface().cloned())
                .collect();
            let parent_surface = service
                .parent_id()
                .and_then(|pid| self.service(pid).surface());
            let surface = ServiceSurface::compose(own, parent_surface);
            service.attach_surface(surface);
        }
        self.restore_service(id, service);
        if result.is_ok() {
            self.mark_service_resolved(id);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{
        FieldNode, FunctionNode, RecordNode, RecordNodeKind, ServiceNode, TypeRefNode,
    };
    use crate::spec::compile::{compile_record, compile_service};
    use crate::spec::{FieldSpec, RecordSpec};

    fn record(name: &str, fields: Vec<FieldNode>) -> RecordNode {
        RecordNode::new(name, RecordNodeKind::Struct, fields)
    }

    #[test]
    fn self_referential_struct_links() {
        let mut scope = Scope::new();
        compile_record(
            &mut scope,
            &record("Node", vec![FieldNode::new(1, "next", TypeRefNode::named("Node"))]),
        )
        .unwrap();
        scope.link().unwrap();

        let id = scope.lookup_type("Node").unwrap();
        match scope.spec(id) {
            TypeSpec::Struct(rs) => {
                assert_eq!(rs.fields[0].spec, TypeSpec::Ref(id));
                assert!(rs.surface().is_some());
            }
            other => panic!("expected struct, got {other:?}"),
        }
    }

    #[test]
    fn mutually_recursive_structs_link() {
        let mut scope = Scope::new();
        compile_record(
            &mut scope,
            &record("A", vec![FieldNode::new(1, "b", TypeRefNode::named("B"))]),
        )
        .unwrap();
        compile_record(
            &mut scope,
            &record(
                "B",
                vec![FieldNode::new(
                    1,
                    "others",
                    TypeRefNode::List(Box::new(TypeRefNode::named("A"))),
                )],
            ),
        )
        .unwrap();
        scope.link().unwrap();

        let a = scope.lookup_type("A").unwrap();
        let b = scope.lookup_type("B").unwrap();
        match scope.spec(b) {
            TypeSpec::Struct(rs) => match &rs.fields[0].spec {
                TypeSpec::List(elem) => assert_eq!(**elem, TypeSpec::Ref(a)),
                other => panic!("expected list, got {other:?}"),
            },
            other => panic!("expected struct, got {other:?}"),
        }
    }

    #[test]
    fn forward_reference_is_legal() {
        let mut scope = Scope::new();
        // "Pong" is declared after the struct that references it
        compile_record(
            &mut scope,
            &record("Holder", vec![FieldNode::new(1, "pong", TypeRefNode::named("Pong"))]),
        )
        .unwrap();
        compile_record(&mut scope, &record("Pong", vec![])).unwrap();
        scope.link().unwrap();
    }

    #[test]
    fn unknown_type_reference_fails() {
        let mut scope = Scope::new();
        compile_record(
            &mut scope,
            &record("Bad", vec![FieldNode::new(1, "x", TypeRefNode::named("Missing"))]),
        )
        .unwrap();
        let err = scope.link().unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownReference {
                name: "Missing".to_owned()
            }
        );
    }

    #[test]
    fn unknown_parent_service_fails() {
        let mut scope = Scope::new();
        compile_service(
            &mut scope,
            &ServiceNode::new("Child", vec![]).extends("Ghost"),
        )
        .unwrap();
        let err = scope.link().unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownReference {
                name: "Ghost".to_owned()
            }
        );
    }

    #[test]
    fn service_surface_composes_over_parent_chain() {
        let mut scope = Scope::new();
        compile_service(
            &mut scope,
            &ServiceNode::new(
                "Base",
                vec![
                    FunctionNode::new("ping", vec![], None),
                    FunctionNode::new("stats", vec![], None),
                ],
            ),
        )
        .unwrap();
        compile_service(
            &mut scope,
            &ServiceNode::new("Child", vec![FunctionNode::new("ping", vec![], None)])
                .extends("Base"),
        )
        .unwrap();
        scope.link().unwrap();

        let child = scope.service(scope.lookup_service("Child").unwrap());
        let child_own_ping = child.functions[0].args;
        let surface = child.surface().unwrap();
        // child's own ping shadows Base.ping
        assert_eq!(surface.function("ping").unwrap().request, child_own_ping);
        // Base.stats is inherited
        assert!(surface.function("stats").is_some());
        assert_eq!(surface.functions().len(), 2);
    }

    #[test]
    fn mutual_parent_cycle_rejected() {
        let mut scope = Scope::new();
        compile_service(
            &mut scope,
            &ServiceNode::new("A", vec![FunctionNode::new("alpha", vec![], None)]).extends("B"),
        )
        .unwrap();
        compile_service(
            &mut scope,
            &ServiceNode::new("B", vec![]).extends("A"),
        )
        .unwrap();
        let err = scope.link().unwrap_err();
        assert!(matches!(err, CompileError::CircularInheritance { .. }));
    }

    #[test]
    fn self_extension_rejected() {
        let mut scope = Scope::new();
        compile_service(
            &mut scope,
            &ServiceNode::new("Loop", vec![]).extends("Loop"),
        )
        .unwrap();
        let err = scope.link().unwrap_err();
        assert_eq!(
            err,
            CompileError::CircularInheritance {
                name: "Loop".to_owned()
            }
        );
    }

    #[test]
    fn linking_is_idempotent() {
        let mut scope = Scope::new();
        compile_record(&mut scope, &record("Ping", vec![])).unwrap();
        scope.link().unwrap();
        let before = scope.spec(scope.lookup_type("Ping").unwrap()).clone();
        scope.link().unwrap();
        assert_eq!(scope.spec(scope.lookup_type("Ping").unwrap()), &before);
    }

    #[test]
    fn unlinked_record_resolves_fields_linearly() {
        // field lookups must work pre-link as well (no surface yet)
        let rs = RecordSpec::new(
            "Plain".to_owned(),
            vec![FieldSpec {
                id: 4,
                name: "x".to_owned(),
                spec: TypeSpec::I32,
                required: false,
                default: None,
            }],
            false,
        );
        assert!(rs.field_by_id(4).is_some());
        assert!(rs.field_by_name("x").is_some());
        assert!(rs.field_by_id(5).is_none());
    }
}
