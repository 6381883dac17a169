//! First pass: AST nodes into an unlinked spec graph
//!
//! Compilation performs no name lookups at all. Every produced spec holds
//! nested and parent types by name only, so declaration order inside the
//! schema is irrelevant and forward references are legal; resolution is the
//! linker's job.
//!
//! What *is* checked here, eagerly and before any linking: field id
//! uniqueness and sign, field name uniqueness, duplicate function names
//! within one service's own list, and the unconditional rejection of
//! `oneway` functions.

use std::collections::HashSet;

use crate::ast::{
    DefinitionNode, EnumNode, FieldNode, FunctionNode, ProgramNode, RecordNode, ServiceNode,
    TypeRefNode, TypedefNode,
};
use crate::error::{CompileError, CompileResult, NameKind};
use crate::scope::{Scope, ServiceId, SpecId};
use crate::spec::service::{FunctionSpec, ServiceSpec};
use crate::spec::{EnumSpec, FieldSpec, RecordSpec, TypeSpec, TypedefSpec};

/// Compiles every definition of a parsed schema into `scope`.
///
/// # Errors
///
/// Propagates the first compile error encountered; the scope is then in a
/// partially populated state and must be discarded.
pub fn compile_program(scope: &mut Scope, program: &ProgramNode) -> CompileResult<()> {
    for definition in &program.definitions {
        match definition {
            DefinitionNode::Record(node) => {
                compile_record(scope, node)?;
            }
            DefinitionNode::Enum(node) => {
                compile_enum(scope, node)?;
            }
            DefinitionNode::Typedef(node) => {
                compile_typedef(scope, node)?;
            }
            DefinitionNode::Service(node) => {
                compile_service(scope, node)?;
            }
        }
    }
    Ok(())
}

/// Maps an AST type reference onto an unlinked [`TypeSpec`]. Named
/// references stay names.
fn type_spec_of(node: &TypeRefNode) -> TypeSpec {
    match node {
        TypeRefNode::Bool => TypeSpec::Bool,
        TypeRefNode::Byte => TypeSpec::Byte,
        TypeRefNode::I16 => TypeSpec::I16,
        TypeRefNode::I32 => TypeSpec::I32,
        TypeRefNode::I64 => TypeSpec::I64,
        TypeRefNode::Double => TypeSpec::Double,
        TypeRefNode::String => TypeSpec::String,
        TypeRefNode::Binary => TypeSpec::Binary,
        TypeRefNode::List(elem) => TypeSpec::List(Box::new(type_spec_of(elem))),
        TypeRefNode::Set(elem) => TypeSpec::Set(Box::new(type_spec_of(elem))),
        TypeRefNode::Map(key, val) => {
            TypeSpec::Map(Box::new(type_spec_of(key)), Box::new(type_spec_of(val)))
        }
        TypeRefNode::Named(name) => TypeSpec::Named(name.clone()),
    }
}

/// Compiles a field list, enforcing the record invariants: ids unique and
/// non-negative, names unique. Requiredness left unspecified in the schema
/// compiles to optional.
fn compile_fields(owner: &str, nodes: &[FieldNode]) -> CompileResult<Vec<FieldSpec>> {
    let mut seen_ids = HashSet::with_capacity(nodes.len());
    let mut seen_names = HashSet::with_capacity(nodes.len());
    let mut fields = Vec::with_capacity(nodes.len());

    for node in nodes {
        if node.id < 0 {
            return Err(CompileError::NegativeFieldId {
                owner: owner.to_owned(),
                id: node.id,
            });
        }
        if !seen_ids.insert(node.id) {
            return Err(CompileError::DuplicateFieldId {
                owner: owner.to_owned(),
                id: node.id,
            });
        }
        if !seen_names.insert(node.name.as_str()) {
            return Err(CompileError::DuplicateName {
                kind: NameKind::Field,
                name: node.name.clone(),
            });
        }
        fields.push(FieldSpec {
            id: node.id,
            name: node.name.clone(),
            spec: type_spec_of(&node.ty),
            required: node.required.unwrap_or(false),
            default: node.default.clone(),
        });
    }
    Ok(fields)
}

/// Compiles a struct, union, or exception declaration.
///
/// Exceptions compile to plain structs. Schema-declared unions never allow
/// zero set fields; only synthesized function results do.
pub fn compile_record(scope: &mut Scope, node: &RecordNode) -> CompileResult<SpecId> {
    let fields = compile_fields(&node.name, &node.fields)?;
    let record = RecordSpec::new(node.name.clone(), fields, false);
    let spec = match node.kind {
        crate::ast::RecordNodeKind::Union => TypeSpec::Union(record),
        _ => TypeSpec::Struct(record),
    };
    scope.declare_type(spec)
}

/// Compiles an enum declaration.
pub fn compile_enum(scope: &mut Scope, node: &EnumNode) -> CompileResult<SpecId> {
    let spec = TypeSpec::Enum(EnumSpec::new(node.name.clone(), node.items.clone()));
    scope.declare_type(spec)
}

/// Compiles a typedef declaration.
pub fn compile_typedef(scope: &mut Scope, node: &TypedefNode) -> CompileResult<SpecId> {
    let spec = TypeSpec::Typedef(TypedefSpec::new(
        node.name.clone(),
        type_spec_of(&node.target),
    ));
    scope.declare_type(spec)
}

/// Compiles one function: rejects oneway, synthesizes the argument struct
/// and result union, and registers both in the arena.
fn compile_function(
    scope: &mut Scope,
    service_name: &str,
    node: &FunctionNode,
) -> CompileResult<FunctionSpec> {
    if node.oneway {
        return Err(CompileError::OnewayUnsupported {
            service: service_name.to_owned(),
            function: node.name.clone(),
        });
    }

    let args_name = format!("{}_{}_request", service_name, node.name);
    let args_fields = compile_fields(&args_name, &node.parameters)?;
    let args = scope.add_synthetic_type(TypeSpec::Struct(RecordSpec::new(
        args_name, args_fields, false,
    )));

    let result_name = format!("{}_{}_response", service_name, node.name);
    let mut result_fields = Vec::with_capacity(node.exceptions.len() + 1);
    if let Some(return_type) = &node.return_type {
        result_fields.push(FieldSpec {
            id: 0,
            name: "success".to_owned(),
            spec: type_spec_of(return_type),
            required: false,
            default: None,
        });
    }
    for exc in compile_fields(&result_name, &node.exceptions)? {
        result_fields.push(exc);
    }
    // the void/no-exception reply is an empty result union
    let result = scope.add_synthetic_type(TypeSpec::Union(RecordSpec::new(
        result_name,
        result_fields,
        true,
    )));

    Ok(FunctionSpec::new(node.name.clone(), args, result))
}

/// Compiles a service declaration, checking for duplicate function names
/// within the service's own list only; inherited names are not consulted.
pub fn compile_service(scope: &mut Scope, node: &ServiceNode) -> CompileResult<ServiceId> {
    let mut names = HashSet::with_capacity(node.functions.len());
    let mut functions = Vec::with_capacity(node.functions.len());

    for func in &node.functions {
        if !names.insert(func.name.as_str()) {
            return Err(CompileError::DuplicateName {
                kind: NameKind::Function,
                name: format!("{}.{}", node.name, func.name),
            });
        }
        functions.push(compile_function(scope, &node.name, func)?);
    }

    scope.declare_service(ServiceSpec::new(
        node.name.clone(),
        functions,
        node.parent.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FieldNode, RecordNodeKind};

    fn ping_service(functions: Vec<FunctionNode>) -> ServiceNode {
        ServiceNode::new("Ping", functions)
    }

    #[test]
    fn duplicate_field_id_rejected() {
        let node = RecordNode::new(
            "Pair",
            RecordNodeKind::Struct,
            vec![
                FieldNode::new(1, "left", TypeRefNode::I32),
                FieldNode::new(1, "right", TypeRefNode::I32),
            ],
        );
        let err = compile_record(&mut Scope::new(), &node).unwrap_err();
        assert_eq!(
            err,
            CompileError::DuplicateFieldId {
                owner: "Pair".to_owned(),
                id: 1
            }
        );
    }

    #[test]
    fn negative_field_id_rejected() {
        let node = RecordNode::new(
            "Neg",
            RecordNodeKind::Struct,
            vec![FieldNode::new(-3, "bad", TypeRefNode::Bool)],
        );
        let err = compile_record(&mut Scope::new(), &node).unwrap_err();
        assert_eq!(
            err,
            CompileError::NegativeFieldId {
                owner: "Neg".to_owned(),
                id: -3
            }
        );
    }

    #[test]
    fn duplicate_field_name_rejected() {
        let node = RecordNode::new(
            "Twice",
            RecordNodeKind::Struct,
            vec![
                FieldNode::new(1, "x", TypeRefNode::I32),
                FieldNode::new(2, "x", TypeRefNode::I32),
            ],
        );
        let err = compile_record(&mut Scope::new(), &node).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateName { .. }));
    }

    #[test]
    fn oneway_function_rejected() {
        let node = ping_service(vec![FunctionNode::new("fire", vec![], None).oneway()]);
        let err = compile_service(&mut Scope::new(), &node).unwrap_err();
        assert_eq!(
            err,
            CompileError::OnewayUnsupported {
                service: "Ping".to_owned(),
                function: "fire".to_owned()
            }
        );
    }

    #[test]
    fn duplicate_function_name_rejected() {
        let node = ping_service(vec![
            FunctionNode::new("ping", vec![], None),
            FunctionNode::new("ping", vec![], None),
        ]);
        let err = compile_service(&mut Scope::new(), &node).unwrap_err();
        assert!(matches!(
            err,
            CompileError::DuplicateName {
                kind: NameKind::Function,
                ..
            }
        ));
    }

    #[test]
    fn function_synthesizes_request_and_response() {
        let mut scope = Scope::new();
        let node = ping_service(vec![FunctionNode::new(
            "ping",
            vec![FieldNode::new(1, "name", TypeRefNode::String)],
            Some(TypeRefNode::named("Pong")),
        )
        .throws(vec![FieldNode::new(
            1,
            "timeout",
            TypeRefNode::named("TimeoutError"),
        )])]);
        let sid = compile_service(&mut scope, &node).unwrap();
        let service = scope.service(sid);
        assert_eq!(service.functions.len(), 1);

        let func = &service.functions[0];
        match scope.spec(func.args) {
            TypeSpec::Struct(rs) => {
                assert_eq!(rs.name, "Ping_ping_request");
                assert_eq!(rs.fields.len(), 1);
                // parameters default to optional
                assert!(!rs.fields[0].required);
            }
            other => panic!("expected struct args spec, got {other:?}"),
        }
        match scope.spec(func.result) {
            TypeSpec::Union(rs) => {
                assert_eq!(rs.name, "Ping_ping_response");
                assert!(rs.allow_empty);
                assert_eq!(rs.fields[0].id, 0);
                assert_eq!(rs.fields[0].name, "success");
                assert_eq!(rs.fields[1].name, "timeout");
                assert_eq!(rs.fields[1].id, 1);
            }
            other => panic!("expected union result spec, got {other:?}"),
        }
    }

    #[test]
    fn void_function_result_has_no_success_field() {
        let mut scope = Scope::new();
        let node = ping_service(vec![FunctionNode::new("nudge", vec![], None)]);
        let sid = compile_service(&mut scope, &node).unwrap();
        let func = &scope.service(sid).functions[0];
        match scope.spec(func.result) {
            TypeSpec::Union(rs) => {
                assert!(rs.fields.is_empty());
                assert!(rs.allow_empty);
            }
            other => panic!("expected union result spec, got {other:?}"),
        }
    }
}
