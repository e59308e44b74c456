//! Resolution contexts: where in the schema graph a node is being resolved.

use openapiv3::{ReferenceOr, Schema};

use crate::utils::{dasherize, singularize};

/// A schema node as found in the document: either inline or a `$ref`.
#[derive(Debug, Clone, Copy)]
pub enum SchemaNode<'a> {
    Reference(&'a str),
    Item(&'a Schema),
}

impl<'a> From<&'a ReferenceOr<Schema>> for SchemaNode<'a> {
    fn from(node: &'a ReferenceOr<Schema>) -> Self {
        match node {
            ReferenceOr::Reference { reference } => Self::Reference(reference),
            ReferenceOr::Item(schema) => Self::Item(schema),
        }
    }
}

impl<'a> From<&'a ReferenceOr<Box<Schema>>> for SchemaNode<'a> {
    fn from(node: &'a ReferenceOr<Box<Schema>>) -> Self {
        match node {
            ReferenceOr::Reference { reference } => Self::Reference(reference),
            ReferenceOr::Item(schema) => Self::Item(schema.as_ref()),
        }
    }
}

/// Whether a context names a top-level type or sits inside another one.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'c, 'a> {
    Root,
    Nested(&'c Context<'c, 'a>),
}

/// The node being resolved, its computed name and its position.
#[derive(Debug, Clone)]
pub struct Context<'c, 'a> {
    name: String,
    node: Option<SchemaNode<'a>>,
    scope: Scope<'c, 'a>,
}

impl<'c, 'a> Context<'c, 'a> {
    /// A top-level context. The name is dasherized.
    pub fn root(name: &str, node: Option<SchemaNode<'a>>) -> Self {
        Self {
            name: dasherize(name),
            node,
            scope: Scope::Root,
        }
    }

    /// The context a `$ref` points at: named after the reference basename and
    /// reset to root so the target is cached under its own name.
    pub fn dereference(reference: &str, node: Option<SchemaNode<'a>>) -> Self {
        Self::root(reference_basename(reference), node)
    }

    /// A named child, e.g. an object property: `parent-name` + `-` + `name`.
    pub fn property<'d>(&'d self, name: &str, node: Option<SchemaNode<'a>>) -> Context<'d, 'a> {
        let suffix = dasherize(name);
        let name = if suffix.is_empty() {
            self.name.clone()
        } else if self.name.is_empty() {
            suffix
        } else {
            format!("{}-{}", self.name, suffix)
        };
        Context {
            name,
            node,
            scope: Scope::Nested(self),
        }
    }

    /// The element of an array: named after the singular of the parent.
    pub fn element<'d>(&'d self, node: Option<SchemaNode<'a>>) -> Context<'d, 'a> {
        let singular = singularize(&self.name);
        let name = if singular == self.name {
            format!("{}-item", self.name)
        } else {
            singular
        };
        Context {
            name,
            node,
            scope: Scope::Nested(self),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node(&self) -> Option<SchemaNode<'a>> {
        self.node
    }

    pub fn is_root(&self) -> bool {
        matches!(self.scope, Scope::Root)
    }

    pub fn parent(&self) -> Option<&Context<'c, 'a>> {
        match self.scope {
            Scope::Root => None,
            Scope::Nested(parent) => Some(parent),
        }
    }

    /// Number of enclosing contexts.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(parent) = current {
            depth += 1;
            current = parent.parent();
        }
        depth
    }
}

/// Last path segment of a reference, e.g. `Pet` for `#/components/schemas/Pet`.
pub fn reference_basename(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_context() {
        let ctx = Context::root("NewPet", None);
        assert_eq!(ctx.name(), "new-pet");
        assert!(ctx.is_root());
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn test_child_contexts_join_names() {
        let root = Context::root("Pet", None);
        let owner = root.property("ownerInfo", None);
        let address = owner.property("address", None);
        assert_eq!(owner.name(), "pet-owner-info");
        assert_eq!(address.name(), "pet-owner-info-address");
        assert!(!address.is_root());
        assert_eq!(address.depth(), 2);
        assert_eq!(address.parent().map(Context::name), Some("pet-owner-info"));
    }

    #[test]
    fn test_element_context_singularizes() {
        let root = Context::root("Pets", None);
        assert_eq!(root.element(None).name(), "pet");

        let status = Context::root("Status", None);
        assert_eq!(status.element(None).name(), "status-item");
    }

    #[test]
    fn test_dereference_resets_to_root() {
        let ctx = Context::dereference("#/components/schemas/PetOwner", None);
        assert_eq!(ctx.name(), "pet-owner");
        assert!(ctx.is_root());
        assert_eq!(reference_basename("Pet"), "Pet");
    }
}
