//! Service and function specifications
//!
//! A service is an ordered list of functions plus an optional single parent
//! forming an inheritance chain. Inheritance is modeled as explicit
//! composition rather than any class hierarchy: the linked surface of a
//! service is its own callable descriptors unioned over its ancestor chain,
//! with lookup preferring the most specific scope.
//!
//! Each function owns two synthesized type specs, registered in the scope
//! arena at compile time: an argument struct holding the parameters, and a
//! result union holding the return value at field id 0 (named `success`)
//! alongside one field per declared exception.

use crate::scope::{ServiceId, SpecId};

/// Reference to a service's parent: by name before linking, by arena index
/// afterwards.
#[derive(Clone, Debug, PartialEq)]
pub enum ServiceParent {
    Named(String),
    Resolved(ServiceId),
}

/// Specification of a single function on a service.
///
/// `args` and `result` are arena indices of the synthesized request struct
/// and response union. The surface, attached at link time, is the callable
/// descriptor handed to transport layers.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionSpec {
    pub name: String,
    pub args: SpecId,
    pub result: SpecId,
    surface: Option<ServiceFunction>,
}

impl FunctionSpec {
    #[must_use]
    pub fn new(name: String, args: SpecId, result: SpecId) -> Self {
        Self {
            name,
            args,
            result,
            surface: None,
        }
    }

    /// The callable descriptor attached by the linker, or `None` before
    /// linking
    #[must_use]
    pub fn surface(&self) -> Option<&ServiceFunction> {
        self.surface.as_ref()
    }

    pub(crate) fn attach_surface(&mut self) {
        self.surface = Some(ServiceFunction {
            name: self.name.clone(),
            request: self.args,
            result: self.result,
        });
    }
}

/// One callable descriptor on a linked service surface: the function name
/// and the arena indices of its request and response specs.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceFunction {
    pub name: String,
    pub request: SpecId,
    pub result: SpecId,
}

/// Specification of a single service.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceSpec {
    pub name: String,
    pub functions: Vec<FunctionSpec>,
    pub parent: Option<ServiceParent>,
    surface: Option<ServiceSurface>,
}

impl ServiceSpec {
    #[must_use]
    pub fn new(name: String, functions: Vec<FunctionSpec>, parent: Option<String>) -> Self {
        Self {
            name,
            functions,
            parent: parent.map(ServiceParent::Named),
            surface: None,
        }
    }

    /// Placeholder used while the linker holds the real node
    pub(crate) fn placeholder() -> Self {
        Self {
            name: String::new(),
            functions: Vec::new(),
            parent: None,
            surface: None,
        }
    }

    /// The composed callable table attached by the linker, or `None`
    /// before linking
    #[must_use]
    pub fn surface(&self) -> Option<&ServiceSurface> {
        self.surface.as_ref()
    }

    pub(crate) fn attach_surface(&mut self, surface: ServiceSurface) {
        self.surface = Some(surface);
    }

    /// Parent service id, once linked
    #[must_use]
    pub fn parent_id(&self) -> Option<ServiceId> {
        match self.parent {
            Some(ServiceParent::Resolved(id)) => Some(id),
            _ => None,
        }
    }
}

/// The externally consumable representation of a linked service: one
/// callable descriptor per function, own functions first, then inherited
/// functions not shadowed by a more specific declaration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ServiceSurface {
    functions: Vec<ServiceFunction>,
}

impl ServiceSurface {
    /// Composes a surface from a service's own linked functions and its
    /// parent's surface. An own function shadows an inherited function of
    /// the same name.
    #[must_use]
    pub(crate) fn compose(own: Vec<ServiceFunction>, parent: Option<&ServiceSurface>) -> Self {
        let mut functions = own;
        if let Some(parent) = parent {
            for inherited in &parent.functions {
                if !functions.iter().any(|f| f.name == inherited.name) {
                    functions.push(inherited.clone());
                }
            }
        }
        Self { functions }
    }

    /// Looks up a callable by name, preferring the most specific scope
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&ServiceFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// All callables, own functions before inherited ones
    #[must_use]
    pub fn functions(&self) -> &[ServiceFunction] {
        &self.functions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::SpecId;

    fn descriptor(name: &str, slot: usize) -> ServiceFunction {
        ServiceFunction {
            name: name.to_owned(),
            request: SpecId(slot),
            result: SpecId(slot + 1),
        }
    }

    #[test]
    fn compose_prefers_own_functions() {
        let parent = ServiceSurface::compose(
            vec![descriptor("ping", 0), descriptor("stats", 2)],
            None,
        );
        let child = ServiceSurface::compose(vec![descriptor("ping", 4)], Some(&parent));

        let ping = child.function("ping").unwrap();
        assert_eq!(ping.request, SpecId(4));
        // inherited, unshadowed function still reachable
        assert!(child.function("stats").is_some());
        assert_eq!(child.functions().len(), 2);
    }
}
