//! The Type Model: everything the resolver produces and the generators consume.
//!
//! Descriptors are created once per resolution pass and never mutated
//! afterwards. Types reference each other through [`TypeId`]s into a
//! [`TypeArena`], which keeps ownership acyclic for recursive schemas.

pub mod operation;
pub mod types;

pub use operation::{
    ControllerDescriptor, HttpMethod, OperationDescriptor, ParameterDescriptor,
    ParameterLocation, RequestDescriptor, ResponseDescriptor,
};
pub use types::{
    sort_properties, Constraints, PrimitiveKind, PropertyDescriptor, TypeArena, TypeDescriptor,
    TypeId, TypeKind,
};

/// Output of one resolution pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecDescriptor {
    pub title: String,
    pub version: String,
    pub arena: TypeArena,
    /// Named (cached) types, sorted by name
    pub named: Vec<TypeId>,
    /// Controllers, sorted by name
    pub controllers: Vec<ControllerDescriptor>,
}

impl SpecDescriptor {
    pub fn get(&self, id: TypeId) -> Option<&TypeDescriptor> {
        self.arena.get(id)
    }

    /// Named types in output order.
    pub fn types(&self) -> impl Iterator<Item = (TypeId, &TypeDescriptor)> {
        self.named.iter().map(move |&id| (id, &self.arena[id]))
    }

    /// Look up a named type by its dasherized name.
    pub fn find(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types()
            .find(|(_, descriptor)| descriptor.name == name)
            .map(|(_, descriptor)| descriptor)
    }

    pub fn controller(&self, name: &str) -> Option<&ControllerDescriptor> {
        self.controllers
            .iter()
            .find(|controller| controller.name == name)
    }

    pub fn operations(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.controllers
            .iter()
            .flat_map(|controller| controller.operations.iter())
    }
}
